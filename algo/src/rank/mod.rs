/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Ranking algorithms.

pub mod pagerank;
pub use pagerank::{
    DanglingPolicy, PageRank, PageRankError, Ranking, compute_ranks, preds,
};
