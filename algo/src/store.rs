/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Double-buffered rank vectors.
//!
//! A [`RankStore`] owns two rank vectors of the same length. At any time
//! one of them plays the role of the _previous_ approximation (read by
//! everybody during a pass) and the other one the role of the _current_
//! approximation (written, at disjoint indices, by the workers). Roles are
//! exchanged by [`swap`](RankStore::swap), which flips an index and never
//! copies data.

use rayon::prelude::*;
use sync_cell_slice::{SyncCell, SyncSlice};

use crate::graph::GraphSnapshot;
use crate::rank::DanglingPolicy;

const RAYON_MIN_LEN: usize = 1024;

#[derive(Debug, Clone)]
pub struct RankStore {
    buffers: [Box<[f64]>; 2],
    previous: usize,
}

impl RankStore {
    /// Creates a store with both buffers filled with 1/*n*.
    pub fn new(n: usize) -> Self {
        let uniform = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        Self {
            buffers: [
                vec![uniform; n].into_boxed_slice(),
                vec![uniform; n].into_boxed_slice(),
            ],
            previous: 0,
        }
    }

    /// Creates a store ready for the first pass over a snapshot.
    ///
    /// Both buffers start from the uniform vector. With the
    /// [pinned](DanglingPolicy::Pinned) policy dangling pages are set to the
    /// jump probability (1 − *d*) / *n* in both buffers, and stay there.
    ///
    /// If `prime` is true, the previous buffer is refined by one step of the
    /// update rule applied to the uniform vector, which usually saves an
    /// iteration.
    pub fn initialize(
        snapshot: &GraphSnapshot,
        damping: f64,
        policy: DanglingPolicy,
        prime: bool,
    ) -> Self {
        let n = snapshot.num_pages();
        let mut store = Self::new(n);
        let inv_n = 1.0 / n as f64;
        let jump = (1.0 - damping) / n as f64;

        if policy == DanglingPolicy::Pinned {
            for &i in snapshot.dangling() {
                store.buffers[0][i] = jump;
                store.buffers[1][i] = jump;
            }
        }

        if prime {
            // Mass of dangling pages in the uniform vector
            let dangling_share = match policy {
                DanglingPolicy::Pinned => 0.0,
                DanglingPolicy::Uniform => snapshot.dangling().len() as f64 * inv_n * inv_n,
            };
            store.buffers[store.previous]
                .par_iter_mut()
                .with_min_len(RAYON_MIN_LEN)
                .enumerate()
                .filter(|&(i, _)| policy == DanglingPolicy::Uniform || !snapshot.is_dangling(i))
                .for_each(|(i, r)| {
                    let sigma: f64 = snapshot
                        .inbound(i)
                        .iter()
                        .map(|&q| inv_n * snapshot.inv_out_degree(q))
                        .sum();
                    *r = jump + damping * (sigma + dangling_share);
                });
        }

        store
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exchanges the roles of the two buffers.
    #[inline(always)]
    pub fn swap(&mut self) {
        self.previous ^= 1;
    }

    /// Returns the index (0 or 1) of the buffer currently playing the
    /// previous role.
    #[inline(always)]
    pub fn previous_index(&self) -> usize {
        self.previous
    }

    pub fn previous(&self) -> &[f64] {
        &self.buffers[self.previous]
    }

    pub fn current(&self) -> &[f64] {
        &self.buffers[self.previous ^ 1]
    }

    /// Returns both buffers as shareable slices of cells, in storage order,
    /// and a mutable reference to the index of the previous buffer.
    ///
    /// Writes through the cells are unsynchronized: callers must guarantee
    /// that no cell is written while it is being read or written by another
    /// thread.
    pub fn sync_views(&mut self) -> ([&[SyncCell<f64>]; 2], &mut usize) {
        let [a, b] = &mut self.buffers;
        ([a.as_sync_slice(), b.as_sync_slice()], &mut self.previous)
    }

    /// Consumes the store, returning the buffer currently playing the
    /// current role.
    pub fn into_current(self) -> Box<[f64]> {
        let [a, b] = self.buffers;
        if self.previous == 0 { b } else { a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap() {
        let mut s = RankStore::new(4);
        assert_eq!(s.previous_index(), 0);
        {
            let ([a, _], _) = s.sync_views();
            unsafe { a[1].set(0.5) };
        }
        assert_eq!(s.previous()[1], 0.5);
        assert_eq!(s.current()[1], 0.25);
        s.swap();
        assert_eq!(s.previous()[1], 0.25);
        assert_eq!(s.current()[1], 0.5);
        assert_eq!(&*s.into_current(), &[0.25, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_pinned_initialization() {
        // 0 → 1, 0 → 2
        let g = GraphSnapshot::from_arcs(3, [(0, 1), (0, 2)]).unwrap();
        let s = RankStore::initialize(&g, 0.85, DanglingPolicy::Pinned, true);
        let jump = (1.0 - 0.85) / 3.0;
        for buffer in [s.previous(), s.current()] {
            assert_eq!(buffer[1], jump);
            assert_eq!(buffer[2], jump);
        }
        // No inbound arcs: priming yields the jump probability
        assert_eq!(s.previous()[0], jump);
        assert_eq!(s.current()[0], 1.0 / 3.0);
    }

    #[test]
    fn test_uniform_priming_is_stochastic() {
        let g = GraphSnapshot::from_arcs(5, [(0, 1), (0, 2), (1, 2), (2, 0), (3, 0)]).unwrap();
        let s = RankStore::initialize(&g, 0.85, DanglingPolicy::Uniform, true);
        let sum: f64 = s.previous().iter().sum();
        assert!((sum - 1.0).abs() < 1E-12, "sum = {sum}");
    }
}
