/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Parallel damped power-method PageRank.
//!
//! This implementation keeps two rank vectors (the _previous_ and the
//! _current_ approximation) and a fixed pool of worker threads. At each
//! iteration every worker recomputes, from the previous vector, the rank of
//! the pages it has been statically assigned, writing into the current
//! vector; then the roles of the two vectors are exchanged.
//!
//! # The formula
//!
//! If we denote with *n* the number of pages, with *d* the damping factor
//! and with *j* = (1 − *d*) / *n* the _jump probability_, the rank of a page
//! *i* at iteration *t* + 1 is
//!
//! > *xᵢ*⁽*ᵗ* ⁺ ¹⁾ = *j* + *d* ∑_(*q* → *i*) *x_q*⁽*ᵗ*⁾ / outdeg(*q*)
//!
//! where the sum ranges over the inbound neighbors of *i*, with multiplicity.
//! The sum is evaluated in the order in which the inbound neighbors were
//! provided.
//!
//! Dangling pages (pages without outbound links) are handled following a
//! [`DanglingPolicy`]:
//!
//! - [`Pinned`](DanglingPolicy::Pinned) (the default): the rank of a
//!   dangling page is fixed at *j* for the whole computation, and dangling
//!   pages are never recomputed. The resulting vector is not stochastic in
//!   general.
//! - [`Uniform`](DanglingPolicy::Uniform): the rank *D* accumulated by
//!   dangling pages at the previous iteration is spread uniformly, adding
//!   *d* *D* / *n* to every page. The rank vector sums to one at every
//!   iteration.
//!
//! # Parallelism
//!
//! Pages are assigned to workers once, by a [`PartitionTable`]; thus, every
//! index of the current vector is written by exactly one worker, and no
//! per-element synchronization is necessary. The rank vectors are shared
//! among threads via [`SyncCell`].
//!
//! The calling thread acts as coordinator. Workers and coordinator meet
//! twice per iteration at a [`PhaseBarrier`]:
//!
//! 1. the coordinator exchanges the roles of the vectors, resets the
//!    per-worker accumulators and publishes the round;
//! 2. first rendezvous: the workers run their pass, each accumulating the
//!    squared differences of its pages in a private, cache-padded slot;
//! 3. second rendezvous: the coordinator sums the slots and decides whether
//!    to continue.
//!
//! Workers are spawned once per run and joined at the end. If a worker
//! panics the barrier is aborted, so that nobody waits forever, and
//! [`run`](PageRank::run) returns [`PageRankError::WorkerPanicked`].
//!
//! # Stopping Criteria
//!
//! The [`run`](PageRank::run) method accepts a composable [`Predicate`] that
//! is evaluated by the coordinator after each iteration. The predicate
//! receives the current iteration number and the squared 𝓁₂ norm of the
//! difference between the last two approximations. If that norm is not
//! finite the run stops with [`PageRankError::NonFiniteNorm`], whatever the
//! predicate.
//!
//! [`SyncCell`]: sync_cell_slice::SyncCell

pub mod preds {
    //! Predicates implementing stopping conditions.
    //!
    //! The implementation of [PageRank](super::PageRank) requires a
    //! [predicate](Predicate) to stop the algorithm. This module provides a few
    //! such predicates: they evaluate to true if the computation should be
    //! stopped.
    //!
    //! You can combine the predicates using the `and` and `or` methods provided
    //! by the [`Predicate`] trait.
    //!
    //! # Examples
    //! ```
    //! # fn main() -> Result<(), Box<dyn std::error::Error>> {
    //! use predicates::prelude::*;
    //! use parrank::rank::preds::{L2Norm, MaxIter};
    //!
    //! let mut predicate = L2Norm::try_from(1E-10)?.boxed();
    //! predicate = predicate.or(MaxIter::from(100)).boxed();
    //! #     Ok(())
    //! # }
    //! ```

    use anyhow::ensure;
    use predicates::{Predicate, reflection::PredicateReflection};
    use std::fmt::Display;

    #[doc(hidden)]
    /// This structure is passed to stopping predicates to provide the
    /// information that is needed to evaluate them.
    #[derive(Debug)]
    pub struct PredParams {
        pub iteration: usize,
        pub norm_delta_sq: f64,
    }

    /// Stops after at most the provided number of iterations.
    #[derive(Debug, Clone)]
    pub struct MaxIter {
        max_iter: usize,
    }

    impl MaxIter {
        pub const DEFAULT_MAX_ITER: usize = usize::MAX;
    }

    impl From<usize> for MaxIter {
        fn from(max_iter: usize) -> Self {
            MaxIter { max_iter }
        }
    }

    impl Default for MaxIter {
        fn default() -> Self {
            Self::from(Self::DEFAULT_MAX_ITER)
        }
    }

    impl Display for MaxIter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_fmt(format_args!("(max iter: {})", self.max_iter))
        }
    }

    impl PredicateReflection for MaxIter {}

    impl Predicate<PredParams> for MaxIter {
        fn eval(&self, pred_params: &PredParams) -> bool {
            pred_params.iteration >= self.max_iter
        }
    }

    /// Stops when the 𝓁₂ norm of the difference between successive
    /// approximations is at most a given threshold ε.
    ///
    /// The comparison is performed between squares, so no square root is
    /// ever computed.
    #[derive(Debug, Clone)]
    pub struct L2Norm {
        threshold: f64,
    }

    impl L2Norm {
        pub const DEFAULT_THRESHOLD: f64 = 1E-8;

        pub fn threshold(&self) -> f64 {
            self.threshold
        }
    }

    impl TryFrom<Option<f64>> for L2Norm {
        type Error = anyhow::Error;
        fn try_from(threshold: Option<f64>) -> anyhow::Result<Self> {
            Ok(match threshold {
                Some(threshold) => {
                    ensure!(!threshold.is_nan());
                    ensure!(threshold > 0.0, "The threshold must be positive");
                    L2Norm { threshold }
                }
                None => Self::default(),
            })
        }
    }

    impl TryFrom<f64> for L2Norm {
        type Error = anyhow::Error;
        fn try_from(threshold: f64) -> anyhow::Result<Self> {
            Some(threshold).try_into()
        }
    }

    impl Default for L2Norm {
        fn default() -> Self {
            L2Norm {
                threshold: Self::DEFAULT_THRESHOLD,
            }
        }
    }

    impl Display for L2Norm {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_fmt(format_args!("(norm: {})", self.threshold))
        }
    }

    impl PredicateReflection for L2Norm {}
    impl Predicate<PredParams> for L2Norm {
        fn eval(&self, pred_params: &PredParams) -> bool {
            pred_params.norm_delta_sq <= self.threshold * self.threshold
        }
    }
}

/// Selects how dangling pages are handled.
///
/// See the [module-level documentation](self) for the mathematical details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DanglingPolicy {
    /// Dangling pages keep the jump probability as rank and are never
    /// recomputed. This is the default.
    #[default]
    Pinned,
    /// The rank of dangling pages is redistributed uniformly to all pages at
    /// each iteration.
    Uniform,
}

impl std::fmt::Display for DanglingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DanglingPolicy::Pinned => f.write_str("pinned"),
            DanglingPolicy::Uniform => f.write_str("uniform"),
        }
    }
}

/// Errors reported by a PageRank computation.
#[derive(Error, Debug)]
pub enum PageRankError {
    /// The input graph is malformed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("The damping factor must be in (0 . . 1), got {0}")]
    InvalidDamping(f64),

    #[error("The number of workers must be positive")]
    NoWorkers,

    /// A worker thread could not be created.
    #[error("Could not spawn worker {worker}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    /// Some workers panicked during the computation.
    #[error("Worker(s) {workers:?} panicked")]
    WorkerPanicked { workers: Vec<usize> },

    /// The ranks overflowed, which happens only on graphs whose outbound
    /// weights do not sum to at most one.
    #[error("The norm delta is not finite at iteration {iteration}")]
    NonFiniteNorm { iteration: usize },

    /// The phase barrier was aborted without a worker failure.
    #[error(transparent)]
    Aborted(#[from] Aborted),
}

/// The result of a completed computation.
#[derive(Debug, Clone)]
pub struct Ranking {
    /// The rank of each page, by index.
    pub rank: Box<[f64]>,
    /// The number of iterations performed.
    pub iterations: usize,
    /// The squared 𝓁₂ norm of the difference between the last two
    /// approximations.
    pub norm_delta_sq: f64,
}

/// Computes PageRank on a page collection, stopping when the 𝓁₂ norm of the
/// difference between successive approximations is at most
/// [`L2Norm::DEFAULT_THRESHOLD`](preds::L2Norm::DEFAULT_THRESHOLD).
///
/// The computation uses `num_workers` worker threads (but never more than
/// the number of pages), the [contiguous](Partitioning::Contiguous)
/// partitioning and the [pinned](DanglingPolicy::Pinned) dangling policy.
///
/// Invalid parameters and malformed input are reported before any thread
/// is started.
///
/// # Examples
///
/// ```
/// use parrank::graph::PageRecord;
/// use parrank::rank::compute_ranks;
///
/// // A → B, B → A
/// let pages = [PageRecord::new(1, [1]), PageRecord::new(1, [0])];
/// let ranking = compute_ranks(&pages, 2, 0.85)?;
/// assert!((ranking.rank[0] - 0.5).abs() < 1E-8);
/// assert!((ranking.rank[1] - 0.5).abs() < 1E-8);
/// # Ok::<(), parrank::rank::PageRankError>(())
/// ```
pub fn compute_ranks(
    pages: &[PageRecord],
    num_workers: usize,
    damping: f64,
) -> Result<Ranking, PageRankError> {
    if !(damping > 0.0 && damping < 1.0) {
        return Err(PageRankError::InvalidDamping(damping));
    }
    if num_workers == 0 {
        return Err(PageRankError::NoWorkers);
    }
    let snapshot = GraphSnapshot::from_pages(pages)?;
    let mut pr = PageRank::new(&snapshot);
    pr.damping(damping).num_workers(num_workers);
    pr.run(preds::L2Norm::default())?;
    Ok(pr.into_ranking())
}

use crossbeam_utils::CachePadded;
use dsi_progress_logger::{ProgressLog, no_logging};
use kahan::KahanSum;
use predicates::Predicate;
use std::sync::{Mutex, MutexGuard, PoisonError};
use sync_cell_slice::SyncCell;
use thiserror::Error;

use crate::active::ActiveSet;
use crate::barrier::{Aborted, PhaseBarrier};
use crate::graph::{GraphSnapshot, PageRecord, SnapshotError};
use crate::partition::{PartitionTable, Partitioning};
use crate::store::RankStore;

/// What the coordinator publishes before each pass.
#[derive(Debug, Clone, Copy)]
struct Round {
    /// Index of the buffer playing the previous role.
    previous: usize,
    /// Rank of dangling pages in the previous buffer.
    dangling_mass: f64,
    stop: bool,
}

/// What a worker leaves in its slot after each pass.
#[derive(Debug, Clone, Copy, Default)]
struct Partial {
    norm_delta_sq: f64,
    dangling_mass: f64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The state shared by the coordinator and the workers during a run.
struct Context<'a> {
    snapshot: &'a GraphSnapshot,
    damping: f64,
    jump: f64,
    inv_n: f64,
    policy: DanglingPolicy,
    views: [&'a [SyncCell<f64>]; 2],
    barrier: &'a PhaseBarrier,
    round: &'a Mutex<Round>,
    slots: &'a [CachePadded<Mutex<Partial>>],
}

impl Context<'_> {
    /// The body of a worker thread.
    fn work(&self, worker: usize, part: &[usize]) {
        let _guard = self.barrier.abort_on_panic();

        let mut active = ActiveSet::new(part.iter().copied());
        if self.policy == DanglingPolicy::Pinned {
            let pinned = active.prune(|i| self.snapshot.is_dangling(i));
            log::debug!(
                "Worker {}: {} active pages, {} pinned",
                worker,
                active.len(),
                pinned
            );
        }

        loop {
            if self.barrier.wait().is_err() {
                return;
            }
            let round = *lock(self.round);
            if round.stop {
                return;
            }
            let partial = self.pass(&active, round);
            *lock(&self.slots[worker]) = partial;
            if self.barrier.wait().is_err() {
                return;
            }
        }
    }

    /// Recomputes the rank of the active pages of a worker.
    fn pass(&self, active: &ActiveSet, round: Round) -> Partial {
        let prev = self.views[round.previous];
        let curr = self.views[round.previous ^ 1];
        let dangling_share = match self.policy {
            DanglingPolicy::Pinned => 0.0,
            DanglingPolicy::Uniform => round.dangling_mass * self.inv_n,
        };

        let mut norm_delta_sq: KahanSum<f64> = KahanSum::new();
        let mut dangling_mass: KahanSum<f64> = KahanSum::new();

        for i in active.iter() {
            // SAFETY: during a pass the previous buffer is only read, and
            // index i of the current buffer belongs to this worker only.
            unsafe {
                let mut sigma = 0.0;
                for &q in self.snapshot.inbound(i) {
                    sigma += prev[q].get() * self.snapshot.inv_out_degree(q);
                }
                let new_rank = self.jump + self.damping * (sigma + dangling_share);

                let delta = new_rank - prev[i].get();
                norm_delta_sq += delta * delta;
                if self.snapshot.is_dangling(i) {
                    dangling_mass += new_rank;
                }

                curr[i].set(new_rank);
            }
        }

        Partial {
            norm_delta_sq: norm_delta_sq.sum(),
            dangling_mass: dangling_mass.sum(),
        }
    }
}

/// Computes PageRank using the damped power method on a pool of worker
/// threads.
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run). After completion the rank vector is available via the
/// [`rank`](Self::rank) method.
///
/// # Examples
///
/// ```
/// use parrank::graph::GraphSnapshot;
/// use parrank::rank::{DanglingPolicy, PageRank, preds};
///
/// // 0 → 1, 0 → 2, 1 → 2, 2 → 0, 3 → 0; page 4 is dangling
/// let g = GraphSnapshot::from_arcs(5, [(0, 1), (0, 2), (1, 2), (2, 0), (3, 0)])?;
///
/// let mut pr = PageRank::new(&g);
/// pr.damping(0.85)
///     .num_workers(2)
///     .dangling_policy(DanglingPolicy::Uniform);
/// pr.run(preds::L2Norm::try_from(1E-12).unwrap())?;
///
/// assert_eq!(pr.rank().len(), 5);
/// assert!((pr.rank().iter().sum::<f64>() - 1.0).abs() < 1E-9);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PageRank<'a> {
    snapshot: &'a GraphSnapshot,
    damping: f64,
    num_workers: usize,
    partitioning: Partitioning,
    dangling_policy: DanglingPolicy,
    prime: bool,

    rank: Box<[f64]>,
    iteration: usize,
    norm_delta_sq: f64,
    norm_history: Vec<f64>,
}

impl std::fmt::Debug for PageRank<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRank")
            .field("damping", &self.damping)
            .field("num_workers", &self.num_workers)
            .field("partitioning", &self.partitioning)
            .field("dangling_policy", &self.dangling_policy)
            .field("prime", &self.prime)
            .field("norm_delta_sq", &self.norm_delta_sq)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

impl<'a> PageRank<'a> {
    /// Creates a new PageRank computation on a snapshot.
    ///
    /// Defaults are damping factor 0.85, as many workers as available cores,
    /// [contiguous](Partitioning::Contiguous) partitioning,
    /// [pinned](DanglingPolicy::Pinned) dangling pages and priming.
    pub fn new(snapshot: &'a GraphSnapshot) -> Self {
        let n = snapshot.num_pages();
        Self {
            snapshot,
            damping: 0.85,
            num_workers: num_cpus::get().max(1),
            partitioning: Partitioning::default(),
            dangling_policy: DanglingPolicy::default(),
            prime: true,
            rank: vec![0.0; n].into_boxed_slice(),
            iteration: 0,
            norm_delta_sq: f64::INFINITY,
            norm_history: Vec::new(),
        }
    }

    /// Sets the damping factor *d*.
    ///
    /// # Panics
    ///
    /// Panics if `damping` is not in the interval (0 . . 1).
    pub fn damping(&mut self, damping: f64) -> &mut Self {
        assert!(
            damping > 0.0 && damping < 1.0,
            "The damping factor must be in (0 . . 1), got {damping}"
        );
        self.damping = damping;
        self
    }

    /// Sets the requested number of workers.
    ///
    /// The actual number of workers will be at most the number of pages.
    ///
    /// # Panics
    ///
    /// Panics if `num_workers` is zero.
    pub fn num_workers(&mut self, num_workers: usize) -> &mut Self {
        assert!(num_workers > 0, "The number of workers must be positive");
        self.num_workers = num_workers;
        self
    }

    /// Sets the [partitioning policy](Partitioning).
    pub fn partitioning(&mut self, partitioning: Partitioning) -> &mut Self {
        self.partitioning = partitioning;
        self
    }

    /// Sets the [dangling policy](DanglingPolicy).
    pub fn dangling_policy(&mut self, dangling_policy: DanglingPolicy) -> &mut Self {
        self.dangling_policy = dangling_policy;
        self
    }

    /// Sets whether the starting vector is refined by one update step applied
    /// to the uniform vector.
    pub fn prime(&mut self, prime: bool) -> &mut Self {
        self.prime = prime;
        self
    }

    /// Returns the rank vector.
    ///
    /// After calling [`run`](Self::run), this contains the computed PageRank
    /// values.
    pub fn rank(&self) -> &[f64] {
        &self.rank
    }

    /// Returns the number of iterations performed by the last call to
    /// [`run`](Self::run).
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Returns the squared 𝓁₂ norm of the difference between the last two
    /// approximations.
    pub fn norm_delta_sq(&self) -> f64 {
        self.norm_delta_sq
    }

    /// Returns the 𝓁₂ norm of the difference between the last two
    /// approximations.
    pub fn norm_delta(&self) -> f64 {
        self.norm_delta_sq.sqrt()
    }

    /// Returns the squared norm delta of each iteration of the last run.
    pub fn norm_history(&self) -> &[f64] {
        &self.norm_history
    }

    pub fn into_ranking(self) -> Ranking {
        Ranking {
            rank: self.rank,
            iterations: self.iteration,
            norm_delta_sq: self.norm_delta_sq,
        }
    }

    /// Runs the PageRank computation until the given predicate is satisfied.
    pub fn run(&mut self, predicate: impl Predicate<preds::PredParams>) -> Result<(), PageRankError> {
        self.run_with_logging(predicate, no_logging![])
    }

    /// Runs the PageRank computation until the given predicate is satisfied,
    /// logging progress.
    ///
    /// `pl` is a [`ProgressLog`] updated once per iteration. Its options will
    /// be preserved, making thus possible to customize the logs.
    pub fn run_with_logging(
        &mut self,
        predicate: impl Predicate<preds::PredParams>,
        pl: &mut impl ProgressLog,
    ) -> Result<(), PageRankError> {
        let n = self.snapshot.num_pages();
        self.iteration = 0;
        self.norm_delta_sq = f64::INFINITY;
        self.norm_history.clear();

        log::info!("Dangling policy: {}", self.dangling_policy);
        log::info!("Damping: {}", self.damping);
        log::info!("Partitioning: {}", self.partitioning);
        log::info!("Stopping criterion: {}", predicate);

        if n == 1 {
            // The only stochastic vector is a fixed point
            log::info!("Single page: nothing to iterate");
            self.rank = vec![1.0].into_boxed_slice();
            self.norm_delta_sq = 0.0;
            return Ok(());
        }

        let table = PartitionTable::new(self.snapshot, self.num_workers, self.partitioning);
        let num_workers = table.num_workers();
        log::info!("Workers: {}", num_workers);
        log::debug!(
            "Inbound arcs per worker: {:?}",
            table.loads(self.snapshot)
        );
        log::info!("{} dangling pages", self.snapshot.dangling().len());

        pl.info(format_args!("Initializing rank vectors..."));
        let mut store = RankStore::initialize(
            self.snapshot,
            self.damping,
            self.dangling_policy,
            self.prime,
        );
        let dangling_mass = match self.dangling_policy {
            DanglingPolicy::Pinned => 0.0,
            DanglingPolicy::Uniform => self
                .snapshot
                .dangling()
                .iter()
                .map(|&i| store.previous()[i])
                .sum(),
        };

        let barrier = PhaseBarrier::new(num_workers + 1);
        let slots = (0..num_workers)
            .map(|_| CachePadded::new(Mutex::new(Partial::default())))
            .collect::<Box<[_]>>();
        let (views, previous) = store.sync_views();
        let round = Mutex::new(Round {
            previous: *previous,
            dangling_mass,
            stop: false,
        });
        let ctx = Context {
            snapshot: self.snapshot,
            damping: self.damping,
            jump: (1.0 - self.damping) / n as f64,
            inv_n: 1.0 / n as f64,
            policy: self.dangling_policy,
            views,
            barrier: &barrier,
            round: &round,
            slots: &slots,
        };

        pl.item_name("iteration");
        pl.expected_updates(None);
        pl.start(format!(
            "Computing PageRank (damping={}, workers={num_workers})...",
            self.damping
        ));

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(num_workers);
            for (worker, part) in table.iter().enumerate() {
                let ctx = &ctx;
                match std::thread::Builder::new()
                    .name(format!("pagerank-{worker}"))
                    .spawn_scoped(scope, move || ctx.work(worker, part))
                {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        // Already-spawned workers will find the barrier broken
                        barrier.abort();
                        return Err(PageRankError::Spawn { worker, source });
                    }
                }
            }

            let outcome = self.coordinate(&ctx, previous, dangling_mass, &predicate, pl);

            let failed = handles
                .into_iter()
                .enumerate()
                .filter_map(|(worker, handle)| handle.join().is_err().then_some(worker))
                .collect::<Vec<_>>();
            if !failed.is_empty() {
                return Err(PageRankError::WorkerPanicked { workers: failed });
            }
            outcome
        })?;

        pl.done();

        self.rank = store.into_current();

        log::info!(
            "Completed after {} iteration(s), norm delta = {}",
            self.iteration,
            self.norm_delta()
        );

        Ok(())
    }

    /// The coordinator side of the iteration protocol.
    fn coordinate(
        &mut self,
        ctx: &Context<'_>,
        previous: &mut usize,
        mut dangling_mass: f64,
        predicate: &impl Predicate<preds::PredParams>,
        pl: &mut impl ProgressLog,
    ) -> Result<(), PageRankError> {
        let _guard = ctx.barrier.abort_on_panic();
        let mut outcome = Ok(());

        loop {
            // Swap: the vector written by the last pass becomes the previous one
            if self.iteration > 0 {
                *previous ^= 1;
            }
            for slot in ctx.slots {
                *lock(slot) = Partial::default();
            }
            *lock(ctx.round) = Round {
                previous: *previous,
                dangling_mass,
                stop: false,
            };

            // Compute
            ctx.barrier.wait()?;
            ctx.barrier.wait()?;

            // Reduce
            let mut norm_delta_sq: KahanSum<f64> = KahanSum::new();
            let mut next_dangling_mass: KahanSum<f64> = KahanSum::new();
            for slot in ctx.slots {
                let partial = *lock(slot);
                norm_delta_sq += partial.norm_delta_sq;
                next_dangling_mass += partial.dangling_mass;
            }
            if ctx.policy == DanglingPolicy::Uniform {
                dangling_mass = next_dangling_mass.sum();
            }

            self.norm_delta_sq = norm_delta_sq.sum();
            self.norm_history.push(self.norm_delta_sq);
            self.iteration += 1;

            log::debug!(
                "Iteration {}: squared norm delta = {}",
                self.iteration,
                self.norm_delta_sq
            );

            pl.update_and_display();

            if !self.norm_delta_sq.is_finite() {
                log::error!(
                    "Iteration {}: squared norm delta is {}, stopping",
                    self.iteration,
                    self.norm_delta_sq
                );
                outcome = Err(PageRankError::NonFiniteNorm {
                    iteration: self.iteration,
                });
                break;
            }

            if predicate.eval(&preds::PredParams {
                iteration: self.iteration,
                norm_delta_sq: self.norm_delta_sq,
            }) {
                break;
            }
        }

        lock(ctx.round).stop = true;
        ctx.barrier.wait()?;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_norm_compares_squares() {
        let p = preds::L2Norm::try_from(1E-3).unwrap();
        assert!(p.eval(&preds::PredParams {
            iteration: 1,
            norm_delta_sq: 1E-6,
        }));
        assert!(!p.eval(&preds::PredParams {
            iteration: 1,
            norm_delta_sq: 1.1E-6,
        }));
        assert!(preds::L2Norm::try_from(0.0).is_err());
        assert!(preds::L2Norm::try_from(f64::NAN).is_err());
        assert_eq!(
            preds::L2Norm::try_from(None).unwrap().threshold(),
            preds::L2Norm::DEFAULT_THRESHOLD
        );
    }

    #[test]
    fn test_compute_ranks_rejects_parameters() {
        let pages = [PageRecord::new(1, [1]), PageRecord::new(1, [0])];
        assert!(matches!(
            compute_ranks(&pages, 1, 1.0),
            Err(PageRankError::InvalidDamping(_))
        ));
        assert!(matches!(
            compute_ranks(&pages, 1, f64::NAN),
            Err(PageRankError::InvalidDamping(_))
        ));
        assert!(matches!(
            compute_ranks(&pages, 0, 0.85),
            Err(PageRankError::NoWorkers)
        ));
        assert!(matches!(
            compute_ranks(&[], 1, 0.85),
            Err(PageRankError::Snapshot(SnapshotError::NoPages))
        ));
    }

    #[test]
    #[should_panic(expected = "The damping factor must be in (0 . . 1)")]
    fn test_damping_setter_panics() {
        let g = GraphSnapshot::from_arcs(2, [(0, 1)]).unwrap();
        PageRank::new(&g).damping(0.0);
    }

    #[test]
    fn test_history_matches_iterations() {
        let g = GraphSnapshot::from_arcs(4, [(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)]).unwrap();
        let mut pr = PageRank::new(&g);
        pr.num_workers(3);
        pr.run(preds::L2Norm::default()).unwrap();
        assert_eq!(pr.norm_history().len(), pr.iterations());
        assert_eq!(pr.norm_history().last().copied(), Some(pr.norm_delta_sq()));
        assert!(pr.norm_delta() <= preds::L2Norm::DEFAULT_THRESHOLD);
    }
}
