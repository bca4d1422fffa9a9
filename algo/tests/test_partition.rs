/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use parrank::partition::{PartitionTable, Partitioning};
use parrank::random::ErdosRenyi;

const PARTITIONINGS: [Partitioning; 3] = [
    Partitioning::Contiguous,
    Partitioning::RoundRobin,
    Partitioning::EdgeBalanced,
];

#[test]
fn test_disjoint_cover() {
    let g = ErdosRenyi::new(37, 0.1, 0).snapshot().unwrap();
    let n = g.num_pages();
    for partitioning in PARTITIONINGS {
        for num_workers in 1..=n + 3 {
            let table = PartitionTable::new(&g, num_workers, partitioning);
            let expected = match partitioning {
                Partitioning::Contiguous => n.div_ceil(n.div_ceil(num_workers.min(n))),
                _ => num_workers.min(n),
            };
            assert_eq!(table.num_workers(), expected, "{partitioning}");
            assert_eq!(table.num_pages(), n);
            assert!(
                table.iter().all(|part| !part.is_empty()),
                "{partitioning}: empty partition with {num_workers} workers"
            );

            let mut seen = vec![false; n];
            for (worker, part) in table.iter().enumerate() {
                assert!(part.windows(2).all(|w| w[0] < w[1]));
                for &page in part {
                    assert!(!seen[page], "{partitioning}: page {page} assigned twice");
                    seen[page] = true;
                    assert_eq!(table.owner_of(page), Some(worker));
                }
            }
            assert!(seen.into_iter().all(|s| s), "{partitioning}: missing pages");
        }
    }
}

#[test]
fn test_contiguous_sizes() {
    let g = ErdosRenyi::new(100, 0.0, 0).snapshot().unwrap();
    for num_workers in 1..=100 {
        let table = PartitionTable::new(&g, num_workers, Partitioning::Contiguous);
        let chunk = 100_usize.div_ceil(num_workers);
        for part in table.iter() {
            assert!(part.len() <= chunk);
        }
        assert_eq!(table.part(0).len(), chunk);
    }
}

#[test]
fn test_round_robin_balance() {
    let g = ErdosRenyi::new(50, 0.0, 0).snapshot().unwrap();
    for num_workers in 1..=50 {
        let table = PartitionTable::new(&g, num_workers, Partitioning::RoundRobin);
        let sizes = table.iter().map(<[usize]>::len).collect::<Vec<_>>();
        let min = sizes.iter().copied().min().unwrap();
        let max = sizes.iter().copied().max().unwrap();
        assert!(max - min <= 1, "{sizes:?}");
    }
}

#[test]
fn test_edge_balanced_loads() {
    let g = ErdosRenyi::new(400, 0.02, 1).snapshot().unwrap();
    let max_load = (0..g.num_pages()).map(|i| g.in_degree(i) + 1).max().unwrap();
    for num_workers in [2, 3, 8] {
        let table = PartitionTable::new(&g, num_workers, Partitioning::EdgeBalanced);
        // Each page weighs its in-degree plus one
        let loads = table
            .loads(&g)
            .into_iter()
            .zip(table.iter())
            .map(|(arcs, part)| arcs + part.len())
            .collect::<Vec<_>>();
        let min = loads.iter().copied().min().unwrap();
        let max = loads.iter().copied().max().unwrap();
        // Greedy assignment to the least loaded worker
        assert!(max - min <= max_load, "{loads:?}");
    }
}
