/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Immutable inbound-adjacency snapshots.
//!
//! A [`GraphSnapshot`] stores, for each page, the ordered list of its
//! _inbound_ neighbors in compressed sparse-row form, together with the
//! out-degree of every page and its inverse. It is built once, validated,
//! and never mutated during a run.

use thiserror::Error;

/// The input description of a page.
///
/// The display name of a page is not part of the record: it belongs to
/// whoever parsed the input, and is index-aligned with the records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRecord {
    /// The number of outbound links of the page (0 if dangling).
    pub out_degree: usize,
    /// The indices of the pages linking to this page, in insertion order.
    /// Repeated indices represent multiple links.
    pub inbound: Vec<usize>,
}

impl PageRecord {
    pub fn new(out_degree: usize, inbound: impl IntoIterator<Item = usize>) -> Self {
        Self {
            out_degree,
            inbound: inbound.into_iter().collect(),
        }
    }
}

/// Errors detected while building a [`GraphSnapshot`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The page collection is empty.
    #[error("The graph has no pages")]
    NoPages,

    /// An inbound neighbor refers to a nonexistent page.
    #[error("Page {page} has inbound neighbor {neighbor}, but there are only {num_pages} pages")]
    NeighborOutOfRange {
        page: usize,
        neighbor: usize,
        num_pages: usize,
    },

    /// An inbound neighbor declares no outbound links.
    #[error("Page {page} has inbound neighbor {neighbor}, which has out-degree 0")]
    DanglingNeighbor { page: usize, neighbor: usize },

    /// A page occurs in inbound lists more often than its out-degree allows.
    #[error("Page {page} declares out-degree {declared}, but occurs {seen} times in inbound lists")]
    OutDegreeTooSmall {
        page: usize,
        declared: usize,
        seen: usize,
    },

    /// An arc refers to a nonexistent page.
    #[error("Arc {source_page} -> {target_page} is out of range for {num_pages} pages")]
    ArcOutOfRange {
        source_page: usize,
        target_page: usize,
        num_pages: usize,
    },
}

/// An immutable view of the inbound adjacency of a graph.
///
/// The inbound neighbors of page `i` are `inbound[offsets[i]..offsets[i +
/// 1]]`, in the order in which they were provided.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    offsets: Box<[usize]>,
    inbound: Box<[usize]>,
    out_degrees: Box<[usize]>,
    inv_out_degrees: Box<[f64]>,
    dangling: Box<[usize]>,
}

impl GraphSnapshot {
    /// Creates a snapshot from its parts, without any check.
    ///
    /// # Safety
    ///
    /// `offsets` must be monotone, start at zero, end at `inbound.len()` and
    /// have length `out_degrees.len() + 1`; every index in `inbound` must be
    /// smaller than `out_degrees.len()` and refer to a page with nonzero
    /// out-degree.
    pub unsafe fn from_parts(
        offsets: Box<[usize]>,
        inbound: Box<[usize]>,
        out_degrees: Box<[usize]>,
    ) -> Self {
        let inv_out_degrees = out_degrees
            .iter()
            .map(|&d| if d == 0 { 0.0 } else { 1.0 / d as f64 })
            .collect();
        let dangling = out_degrees
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();
        Self {
            offsets,
            inbound,
            out_degrees,
            inv_out_degrees,
            dangling,
        }
    }

    /// Builds a snapshot from page records, validating them.
    ///
    /// The position of a record in the iteration order is the index of the
    /// page. Declared out-degrees are authoritative: a page may occur in
    /// inbound lists fewer times than its out-degree (its remaining links
    /// point outside the collection, and a warning is logged), but never
    /// more, as its outbound weights would then sum to more than one.
    pub fn from_pages<'a>(
        pages: impl IntoIterator<Item = &'a PageRecord>,
    ) -> Result<Self, SnapshotError> {
        let pages = pages.into_iter().collect::<Vec<_>>();
        let num_pages = pages.len();
        if num_pages == 0 {
            return Err(SnapshotError::NoPages);
        }

        let out_degrees: Box<[usize]> = pages.iter().map(|p| p.out_degree).collect();
        let mut offsets = Vec::with_capacity(num_pages + 1);
        offsets.push(0);
        let mut inbound = Vec::with_capacity(pages.iter().map(|p| p.inbound.len()).sum());
        let mut occurrences = vec![0_usize; num_pages];

        for (page, record) in pages.iter().enumerate() {
            for &neighbor in &record.inbound {
                if neighbor >= num_pages {
                    return Err(SnapshotError::NeighborOutOfRange {
                        page,
                        neighbor,
                        num_pages,
                    });
                }
                if out_degrees[neighbor] == 0 {
                    return Err(SnapshotError::DanglingNeighbor { page, neighbor });
                }
                occurrences[neighbor] += 1;
                inbound.push(neighbor);
            }
            offsets.push(inbound.len());
        }

        let mut unused = 0;
        for (page, (&seen, &declared)) in occurrences.iter().zip(out_degrees.iter()).enumerate() {
            if seen > declared {
                return Err(SnapshotError::OutDegreeTooSmall {
                    page,
                    declared,
                    seen,
                });
            }
            if seen < declared {
                unused += 1;
            }
        }
        if unused != 0 {
            log::warn!(
                "{} page(s) declare more outbound links than their inbound occurrences",
                unused
            );
        }

        // SAFETY: we checked all neighbors and occurrences above
        Ok(unsafe { Self::from_parts(offsets.into(), inbound.into(), out_degrees) })
    }

    /// Builds a snapshot from a list of `(source, target)` arcs.
    ///
    /// Out-degrees are derived from the arcs, and inbound lists follow the
    /// order of the arcs. Pages without arcs are isolated (and dangling).
    pub fn from_arcs(
        num_pages: usize,
        arcs: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, SnapshotError> {
        if num_pages == 0 {
            return Err(SnapshotError::NoPages);
        }
        let arcs = arcs.into_iter().collect::<Vec<_>>();

        let mut out_degrees = vec![0_usize; num_pages];
        let mut in_degrees = vec![0_usize; num_pages];
        for &(source_page, target_page) in &arcs {
            if source_page >= num_pages || target_page >= num_pages {
                return Err(SnapshotError::ArcOutOfRange {
                    source_page,
                    target_page,
                    num_pages,
                });
            }
            out_degrees[source_page] += 1;
            in_degrees[target_page] += 1;
        }

        // Counting sort by target, stable with respect to the arc order
        let mut offsets = Vec::with_capacity(num_pages + 1);
        let mut acc = 0;
        offsets.push(acc);
        for d in &in_degrees {
            acc += d;
            offsets.push(acc);
        }
        let mut cursor = offsets[..num_pages].to_vec();
        let mut inbound = vec![0_usize; arcs.len()];
        for &(source, target) in &arcs {
            inbound[cursor[target]] = source;
            cursor[target] += 1;
        }

        // SAFETY: out-degrees are derived from the same arcs
        Ok(unsafe { Self::from_parts(offsets.into(), inbound.into(), out_degrees.into()) })
    }

    /// Returns the number of pages.
    #[inline(always)]
    pub fn num_pages(&self) -> usize {
        self.out_degrees.len()
    }

    /// Returns the number of inbound occurrences, that is, of arcs.
    #[inline(always)]
    pub fn num_arcs(&self) -> usize {
        self.inbound.len()
    }

    /// Returns the inbound neighbors of a page, in insertion order.
    #[inline(always)]
    pub fn inbound(&self, page: usize) -> &[usize] {
        &self.inbound[self.offsets[page]..self.offsets[page + 1]]
    }

    #[inline(always)]
    pub fn in_degree(&self, page: usize) -> usize {
        self.offsets[page + 1] - self.offsets[page]
    }

    #[inline(always)]
    pub fn out_degree(&self, page: usize) -> usize {
        self.out_degrees[page]
    }

    /// Returns the inverse of the out-degree of a page, or zero for
    /// dangling pages.
    #[inline(always)]
    pub fn inv_out_degree(&self, page: usize) -> f64 {
        self.inv_out_degrees[page]
    }

    #[inline(always)]
    pub fn is_dangling(&self, page: usize) -> bool {
        self.out_degrees[page] == 0
    }

    /// Returns the dangling pages, in increasing order.
    pub fn dangling(&self) -> &[usize] {
        &self.dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_arcs_keeps_arc_order() {
        let g = GraphSnapshot::from_arcs(4, [(2, 0), (1, 0), (2, 0), (0, 3), (3, 1)]).unwrap();
        assert_eq!(g.num_pages(), 4);
        assert_eq!(g.num_arcs(), 5);
        assert_eq!(g.inbound(0), &[2, 1, 2]);
        assert_eq!(g.inbound(1), &[3]);
        assert!(g.inbound(2).is_empty());
        assert_eq!(g.inbound(3), &[0]);
        assert_eq!(g.out_degree(2), 2);
        assert_eq!(g.inv_out_degree(2), 0.5);
        assert!(g.dangling().is_empty());
    }

    #[test]
    fn test_dangling() {
        let g = GraphSnapshot::from_arcs(3, [(0, 1), (0, 2)]).unwrap();
        assert_eq!(g.dangling(), &[1, 2]);
        assert!(!g.is_dangling(0));
        assert!(g.is_dangling(1));
        assert_eq!(g.inv_out_degree(1), 0.0);
        assert_eq!(g.in_degree(0), 0);
        assert_eq!(g.in_degree(2), 1);
    }

    #[test]
    fn test_from_pages() {
        let pages = [
            PageRecord::new(1, [1]),
            PageRecord::new(2, [0, 2]),
            PageRecord::new(1, [1]),
        ];
        let g = GraphSnapshot::from_pages(&pages).unwrap();
        assert_eq!(g.inbound(1), &[0, 2]);
        assert_eq!(g.out_degree(1), 2);
        assert!(g.dangling().is_empty());
    }

    #[test]
    fn test_from_pages_errors() {
        assert_eq!(
            GraphSnapshot::from_pages(&[]).unwrap_err(),
            SnapshotError::NoPages
        );
        assert_eq!(
            GraphSnapshot::from_pages(&[PageRecord::new(1, [1]), PageRecord::new(1, [3])])
                .unwrap_err(),
            SnapshotError::NeighborOutOfRange {
                page: 1,
                neighbor: 3,
                num_pages: 2
            }
        );
        assert_eq!(
            GraphSnapshot::from_pages(&[PageRecord::new(0, []), PageRecord::new(1, [0])])
                .unwrap_err(),
            SnapshotError::DanglingNeighbor {
                page: 1,
                neighbor: 0
            }
        );
    }

    #[test]
    fn test_from_pages_rejects_overused_out_degree() {
        // Page 0 declares one outbound link but feeds both pages
        let pages = [PageRecord::new(1, [0, 1]), PageRecord::new(1, [0])];
        assert_eq!(
            GraphSnapshot::from_pages(&pages).unwrap_err(),
            SnapshotError::OutDegreeTooSmall {
                page: 0,
                declared: 1,
                seen: 2
            }
        );
    }

    #[test]
    fn test_from_pages_accepts_unused_out_degree() {
        // Page 1 links to a page outside the collection
        let pages = [PageRecord::new(1, [1]), PageRecord::new(2, [0])];
        let g = GraphSnapshot::from_pages(&pages).unwrap();
        assert_eq!(g.inv_out_degree(1), 0.5);
    }

    #[test]
    fn test_from_arcs_errors() {
        assert_eq!(
            GraphSnapshot::from_arcs(0, []).unwrap_err(),
            SnapshotError::NoPages
        );
        assert_eq!(
            GraphSnapshot::from_arcs(3, [(0, 1), (1, 3)]).unwrap_err(),
            SnapshotError::ArcOutOfRange {
                source_page: 1,
                target_page: 3,
                num_pages: 3
            }
        );
        assert_eq!(
            GraphSnapshot::from_arcs(3, [(5, 0)]).unwrap_err(),
            SnapshotError::ArcOutOfRange {
                source_page: 5,
                target_page: 0,
                num_pages: 3
            }
        );
    }
}
