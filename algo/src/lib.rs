/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unconditional_recursion)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]
#![deny(unused_doc_comments)]

pub mod active;
pub mod barrier;
pub mod graph;
pub mod partition;
pub mod random;
pub mod rank;
pub mod store;

pub mod prelude {
    pub use crate::graph::{GraphSnapshot, PageRecord, SnapshotError};
    pub use crate::partition::{PartitionTable, Partitioning};
    pub use crate::rank::{DanglingPolicy, PageRank, PageRankError, Ranking, compute_ranks, preds};
}
