/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::arcs::{ArcList, read_arcs};
use crate::{ArcsArgs, GlobalArgs, NumThreadsArg, create_parent_dir};
use anyhow::{Context, Result, ensure};
use clap::{Args, ValueEnum};
use dsi_progress_logger::{ProgressLog, progress_logger};
use parrank::prelude::*;
use parrank::rank::preds::{L2Norm, MaxIter};
use predicates::prelude::*;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

/// How dangling pages are handled.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliDanglingPolicy {
    /// Dangling pages keep rank (1 − d) / n and are never recomputed.
    #[default]
    Pinned,
    /// The rank of dangling pages is spread uniformly at each iteration.
    Uniform,
}

impl From<CliDanglingPolicy> for DanglingPolicy {
    fn from(p: CliDanglingPolicy) -> Self {
        match p {
            CliDanglingPolicy::Pinned => DanglingPolicy::Pinned,
            CliDanglingPolicy::Uniform => DanglingPolicy::Uniform,
        }
    }
}

/// How pages are assigned to workers.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliPartitioning {
    /// Consecutive ranges of pages.
    #[default]
    Contiguous,
    /// Page i goes to worker i mod w.
    RoundRobin,
    /// Balance the number of inbound arcs per worker.
    EdgeBalanced,
}

impl From<CliPartitioning> for Partitioning {
    fn from(p: CliPartitioning) -> Self {
        match p {
            CliPartitioning::Contiguous => Partitioning::Contiguous,
            CliPartitioning::RoundRobin => Partitioning::RoundRobin,
            CliPartitioning::EdgeBalanced => Partitioning::EdgeBalanced,
        }
    }
}

#[derive(Args, Debug)]
pub struct CliArgs {
    /// The file containing the arcs; if missing, arcs are read from
    /// standard input.
    pub input: Option<PathBuf>,

    #[arg(short, long)]
    /// Where to write the ranks; if missing, they are written to standard
    /// output.
    pub output: Option<PathBuf>,

    #[arg(long)]
    /// The number of pages; pages with larger index than every arc endpoint
    /// are isolated (requires --exact).
    pub num_pages: Option<usize>,

    #[arg(short, long, default_value_t = 0.85)]
    /// The damping factor d (must be in the interval (0 . . 1)).
    pub damping: f64,

    #[arg(short, long, default_value_t = L2Norm::DEFAULT_THRESHOLD)]
    /// Stop when the ℓ₂ norm of the difference between successive
    /// approximations is at most this threshold.
    pub epsilon: f64,

    #[arg(long)]
    /// Maximum number of iterations.
    pub max_iter: Option<usize>,

    #[arg(long, value_enum, default_value_t = CliDanglingPolicy::Pinned)]
    /// How dangling pages are handled.
    pub dangling: CliDanglingPolicy,

    #[arg(long, value_enum, default_value_t = CliPartitioning::Contiguous)]
    /// How pages are assigned to workers.
    pub partitioning: CliPartitioning,

    #[arg(long)]
    /// Start from the uniform vector instead of refining it with one
    /// update step.
    pub no_prime: bool,

    #[arg(long, default_value_t = 4)]
    /// Decimal digits of the printed ranks.
    pub precision: usize,

    #[clap(flatten)]
    pub arcs_args: ArcsArgs,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        args.damping > 0.0 && args.damping < 1.0,
        "The damping factor must be in (0 . . 1), got {}",
        args.damping
    );

    let list = match &args.input {
        Some(path) => {
            log::info!("Reading arcs from {}", path.display());
            let file = std::fs::File::open(path)
                .with_context(|| format!("Could not open {}", path.display()))?;
            read_arcs(
                &global_args,
                &args.arcs_args,
                args.num_pages,
                BufReader::new(file),
            )?
        }
        None => {
            log::info!("Reading arcs from standard input...");
            read_arcs(
                &global_args,
                &args.arcs_args,
                args.num_pages,
                std::io::stdin().lock(),
            )?
        }
    };

    let ranking = pagerank(&global_args, &args, &list)?;

    match &args.output {
        Some(path) => {
            create_parent_dir(path)?;
            let file = std::fs::File::create(path)
                .with_context(|| format!("Could not create {}", path.display()))?;
            log::info!("Writing ranks to {}", path.display());
            write_ranks(BufWriter::new(file), &list, &ranking, args.precision)
                .with_context(|| format!("Could not write ranks to {}", path.display()))
        }
        None => write_ranks(
            BufWriter::new(std::io::stdout().lock()),
            &list,
            &ranking,
            args.precision,
        )
        .context("Could not write ranks to standard output"),
    }
}

/// Builds the snapshot of an arc list and computes its ranks.
pub fn pagerank(global_args: &GlobalArgs, args: &CliArgs, list: &ArcList) -> Result<Ranking> {
    let snapshot = GraphSnapshot::from_arcs(list.num_pages, list.arcs.iter().copied())?;

    let mut predicate = L2Norm::try_from(args.epsilon)?.boxed();
    if let Some(max_iter) = args.max_iter {
        predicate = predicate.or(MaxIter::from(max_iter)).boxed();
    }

    let mut pl = progress_logger![];
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let mut pr = PageRank::new(&snapshot);
    pr.damping(args.damping)
        .num_workers(args.num_threads.num_threads)
        .dangling_policy(args.dangling.into())
        .partitioning(args.partitioning.into())
        .prime(!args.no_prime);
    pr.run_with_logging(predicate, &mut pl)?;

    Ok(pr.into_ranking())
}

/// Writes one `name rank` line per page, in page order.
pub fn write_ranks(
    mut out: impl Write,
    list: &ArcList,
    ranking: &Ranking,
    precision: usize,
) -> std::io::Result<()> {
    for (page, rank) in ranking.rank.iter().enumerate() {
        writeln!(out, "{} {rank:.precision$}", list.name(page))?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_ranks() -> Result<()> {
        let list = ArcList {
            num_pages: 2,
            arcs: vec![(0, 1), (1, 0)],
            labels: Some(vec!["home".to_owned(), "about".to_owned()]),
        };
        let ranking = Ranking {
            rank: vec![0.5, 0.5].into_boxed_slice(),
            iterations: 1,
            norm_delta_sq: 0.0,
        };
        let mut out = Vec::new();
        write_ranks(&mut out, &list, &ranking, 4)?;
        assert_eq!(String::from_utf8(out)?, "home 0.5000\nabout 0.5000\n");
        Ok(())
    }
}
