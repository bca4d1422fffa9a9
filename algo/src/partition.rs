/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Static assignment of pages to workers.
//!
//! A [`PartitionTable`] is computed once before the iteration loop and maps
//! every worker to the (sorted) indices of the pages it is responsible for.
//! Whatever the [policy](Partitioning), every page index appears in exactly
//! one partition, which is what makes unsynchronized writes into the rank
//! buffer sound.

use dary_heap::QuaternaryHeap;
use std::cmp::Reverse;

use crate::graph::GraphSnapshot;

/// How pages are distributed among workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partitioning {
    /// Half-open index ranges of ⌈*n* / *w*⌉ pages; the last partition
    /// may be shorter. Since no range is empty, there might be fewer than
    /// *w* partitions (e.g., 5 pages on 4 workers yield 2, 2, and 1 pages).
    /// This is the default.
    #[default]
    Contiguous,
    /// Page *i* is assigned to worker *i* mod *w*.
    RoundRobin,
    /// Greedy balancing of the number of inbound arcs: pages, in decreasing
    /// in-degree order, go to the worker with the smallest load so far. Use
    /// this policy when a few hub pages concentrate most arcs.
    EdgeBalanced,
}

impl std::fmt::Display for Partitioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partitioning::Contiguous => f.write_str("contiguous"),
            Partitioning::RoundRobin => f.write_str("round robin"),
            Partitioning::EdgeBalanced => f.write_str("edge balanced"),
        }
    }
}

/// The assignment of page indices to workers.
#[derive(Debug, Clone)]
pub struct PartitionTable {
    parts: Box<[Box<[usize]>]>,
    num_pages: usize,
}

impl PartitionTable {
    /// Computes the partition table of a snapshot.
    ///
    /// The number of partitions is `num_workers` clamped to the interval
    /// [1 . . *n*], and it is further reduced to ⌈*n* / ⌈*n* / *w*⌉⌉ by
    /// [contiguous partitioning](Partitioning::Contiguous). No partition is
    /// empty.
    pub fn new(snapshot: &GraphSnapshot, num_workers: usize, partitioning: Partitioning) -> Self {
        let n = snapshot.num_pages();
        let w = num_workers.min(n).max(1);

        let parts: Vec<Vec<usize>> = match partitioning {
            Partitioning::Contiguous => {
                let chunk = n.div_ceil(w);
                (0..n.div_ceil(chunk))
                    .map(|i| (i * chunk..((i + 1) * chunk).min(n)).collect())
                    .collect()
            }
            Partitioning::RoundRobin => (0..w).map(|i| (i..n).step_by(w).collect()).collect(),
            Partitioning::EdgeBalanced => {
                let mut pages = (0..n).collect::<Vec<_>>();
                pages.sort_by_key(|&i| Reverse(snapshot.in_degree(i)));

                let mut parts = vec![Vec::new(); w];
                // (load, worker) pairs; ties go to the lowest worker
                let mut heap = (0..w)
                    .map(|i| Reverse((0_usize, i)))
                    .collect::<QuaternaryHeap<_>>();
                for page in pages {
                    if let Some(Reverse((load, worker))) = heap.pop() {
                        parts[worker].push(page);
                        heap.push(Reverse((load + snapshot.in_degree(page) + 1, worker)));
                    }
                }
                for part in parts.iter_mut() {
                    part.sort_unstable();
                }
                parts
            }
        };

        Self {
            parts: parts.into_iter().map(Vec::into_boxed_slice).collect(),
            num_pages: n,
        }
    }

    /// Returns the number of partitions, that is, of workers.
    #[inline(always)]
    pub fn num_workers(&self) -> usize {
        self.parts.len()
    }

    #[inline(always)]
    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    /// Returns the sorted page indices assigned to a worker.
    #[inline(always)]
    pub fn part(&self, worker: usize) -> &[usize] {
        &self.parts[worker]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.parts.iter().map(|p| &**p)
    }

    /// Returns the worker a page is assigned to, if the page exists.
    pub fn owner_of(&self, page: usize) -> Option<usize> {
        self.parts
            .iter()
            .position(|p| p.binary_search(&page).is_ok())
    }

    /// Returns, for each worker, the number of inbound arcs of its pages.
    pub fn loads(&self, snapshot: &GraphSnapshot) -> Vec<usize> {
        self.parts
            .iter()
            .map(|p| p.iter().map(|&i| snapshot.in_degree(i)).sum())
            .collect()
    }
}
