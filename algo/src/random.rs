/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::graph::{GraphSnapshot, SnapshotError};

/// Provides a sequential implementation of Erdös-Rényi random graphs.
///
/// The Erdös-Rényi random graph model is a simple model for generating random
/// graphs. It is parameterized by the number of nodes `n` and the probability
/// `p` of an arc between any two nodes. In this implementation, loops are never
/// included.
///
/// Note that the time required to enumerate the arcs is quadratic in `n`.
#[derive(Debug, Clone)]
pub struct ErdosRenyi {
    n: usize,
    p: f64,
    seed: u64,
}

impl ErdosRenyi {
    /// Creates a new Erdös-Rényi random graph, given the number of
    /// nodes, the probability of an edge between any two nodes, and a
    /// seed for the [pseudorandom number generator](SmallRng).
    pub fn new(n: usize, p: f64, seed: u64) -> Self {
        assert!((0.0..=1.0).contains(&p), "p must be in [0..1]");
        Self { n, p, seed }
    }

    pub fn num_nodes(&self) -> usize {
        self.n
    }

    /// Returns the arcs of the graph, sorted by source and then by target.
    ///
    /// The same seed always yields the same arcs.
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        (0..self.n).flat_map(move |x| {
            (0..self.n)
                .filter(|&y| y != x && rng.random_bool(self.p))
                .map(|y| (x, y))
                .collect::<Vec<_>>()
        })
    }

    /// Builds the [snapshot](GraphSnapshot) of the graph.
    pub fn snapshot(&self) -> Result<GraphSnapshot, SnapshotError> {
        GraphSnapshot::from_arcs(self.n, self.arcs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_er() {
        let g = ErdosRenyi::new(10, 0.3, 0);
        let arcs = g.arcs().collect::<Vec<_>>();
        assert_eq!(arcs, g.arcs().collect::<Vec<_>>());
        assert!(arcs.iter().all(|&(x, y)| x != y && x < 10 && y < 10));
        assert!(arcs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_extremes() {
        assert_eq!(ErdosRenyi::new(5, 0.0, 1).arcs().count(), 0);
        assert_eq!(ErdosRenyi::new(5, 1.0, 1).arcs().count(), 20);
        let g = ErdosRenyi::new(5, 1.0, 1).snapshot().unwrap();
        assert!(g.dangling().is_empty());
        assert_eq!(g.in_degree(3), 4);
    }
}
