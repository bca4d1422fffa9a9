/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Reading arc lists.

use crate::{ArcsArgs, GlobalArgs};
use anyhow::{Context, Result, bail, ensure};
use dsi_progress_logger::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;

/// An arc list read from a text source.
#[derive(Debug, Clone, Default)]
pub struct ArcList {
    /// The number of pages.
    pub num_pages: usize,
    /// The arcs, as (source, target) pairs of page indices, in input order.
    pub arcs: Vec<(usize, usize)>,
    /// The label of each page, if the input used labels.
    pub labels: Option<Vec<String>>,
}

impl ArcList {
    /// Returns the display name of a page: its label, or its index.
    ///
    /// Labels are borrowed; only indices are formatted.
    pub fn name(&self, page: usize) -> Cow<'_, str> {
        match &self.labels {
            Some(labels) => Cow::Borrowed(labels[page].as_str()),
            None => Cow::Owned(page.to_string()),
        }
    }
}

/// Reads an arc list.
///
/// Each line contains a source and a target, in the columns and with the
/// separator specified by `arcs_args`. Unless `arcs_args.exact` is set,
/// the columns contain labels that are mapped to consecutive page indices in
/// order of appearance; otherwise, they contain page indices.
///
/// In the exact case the number of pages is `num_pages` if provided (it must
/// exceed every index), otherwise the largest index plus one.
pub fn read_arcs(
    global_args: &GlobalArgs,
    arcs_args: &ArcsArgs,
    num_pages: Option<usize>,
    reader: impl BufRead,
) -> Result<ArcList> {
    ensure!(
        arcs_args.exact || num_pages.is_none(),
        "The number of pages can be specified only with --exact"
    );

    let mut pl = ProgressLogger::default();
    pl.item_name("arc").expected_updates(arcs_args.max_arcs);
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }
    pl.start("Reading arcs...");

    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut names: Vec<String> = Vec::new();
    let mut index = |label: &str| -> usize {
        if let Some(&page) = labels.get(label) {
            return page;
        }
        let page = names.len();
        labels.insert(label.to_owned(), page);
        names.push(label.to_owned());
        page
    };

    let biggest_column = arcs_args.source_column.max(arcs_args.target_column);
    let mut arcs = Vec::new();
    let mut max_page = None;

    let mut lines = reader.lines().enumerate();
    for _ in 0..arcs_args.lines_to_skip {
        lines.next();
    }

    for (line_num, line) in lines {
        if arcs_args.max_arcs.is_some_and(|max_arcs| arcs.len() >= max_arcs) {
            break;
        }
        let line = line.with_context(|| format!("Could not read line {}", line_num + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(arcs_args.line_comment_symbol) {
            continue;
        }

        let columns = trimmed.split(arcs_args.separator).collect::<Vec<_>>();
        if columns.len() <= biggest_column {
            log::warn!(
                "Line {}: {:?} does not have enough columns: got {} columns but expected at least {} columns separated by {:?} (you can change the separator using the --separator option)",
                line_num + 1,
                line,
                columns.len(),
                biggest_column + 1,
                arcs_args.separator,
            );
            continue;
        }
        let source = columns[arcs_args.source_column].trim();
        let target = columns[arcs_args.target_column].trim();

        let arc = if arcs_args.exact {
            let parse = |value: &str, what: &str| {
                value.parse::<usize>().with_context(|| {
                    format!(
                        "Could not parse {what} {value:?} at line {} as a page index",
                        line_num + 1
                    )
                })
            };
            (parse(source, "source")?, parse(target, "target")?)
        } else {
            (index(source), index(target))
        };

        max_page = max_page.max(Some(arc.0.max(arc.1)));
        arcs.push(arc);
        pl.light_update();
    }
    pl.done();

    let num_pages = if arcs_args.exact {
        match (num_pages, max_page) {
            (Some(num_pages), Some(max_page)) if max_page >= num_pages => bail!(
                "Page index {max_page} is out of range for {num_pages} pages"
            ),
            (Some(num_pages), _) => num_pages,
            (None, Some(max_page)) => max_page + 1,
            (None, None) => 0,
        }
    } else {
        names.len()
    };

    log::info!("Read {} arcs on {} pages", arcs.len(), num_pages);

    Ok(ArcList {
        num_pages,
        arcs,
        labels: (!arcs_args.exact).then_some(names),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arcs_args(exact: bool) -> ArcsArgs {
        ArcsArgs {
            line_comment_symbol: '#',
            lines_to_skip: 0,
            max_arcs: None,
            separator: '\t',
            source_column: 0,
            target_column: 1,
            exact,
        }
    }

    fn global_args() -> GlobalArgs {
        GlobalArgs { log_interval: None }
    }

    #[test]
    fn test_labels() -> Result<()> {
        let input = "# comment\nfoo\tbar\nbar\tfoo\n\nbaz\tfoo\n";
        let list = read_arcs(&global_args(), &arcs_args(false), None, input.as_bytes())?;
        assert_eq!(list.num_pages, 3);
        assert_eq!(list.arcs, vec![(0, 1), (1, 0), (2, 0)]);
        assert_eq!(list.name(0), "foo");
        assert_eq!(list.name(2), "baz");
        assert!(matches!(list.name(1), Cow::Borrowed("bar")));
        Ok(())
    }

    #[test]
    fn test_exact() -> Result<()> {
        let input = "0\t3\n3\t1\n";
        let list = read_arcs(&global_args(), &arcs_args(true), None, input.as_bytes())?;
        assert_eq!(list.num_pages, 4);
        assert_eq!(list.arcs, vec![(0, 3), (3, 1)]);
        assert!(list.labels.is_none());
        assert_eq!(list.name(3), "3");

        let list = read_arcs(&global_args(), &arcs_args(true), Some(10), input.as_bytes())?;
        assert_eq!(list.num_pages, 10);
        assert!(read_arcs(&global_args(), &arcs_args(true), Some(3), input.as_bytes()).is_err());
        Ok(())
    }

    #[test]
    fn test_exact_rejects_labels() {
        let input = "0\tx\n";
        assert!(read_arcs(&global_args(), &arcs_args(true), None, input.as_bytes()).is_err());
    }

    #[test]
    fn test_num_pages_requires_exact() {
        assert!(read_arcs(&global_args(), &arcs_args(false), Some(3), "".as_bytes()).is_err());
    }

    #[test]
    fn test_skip_and_max() -> Result<()> {
        let input = "source\ttarget\na\tb\nb\tc\nc\ta\n";
        let mut args = arcs_args(false);
        args.lines_to_skip = 1;
        args.max_arcs = Some(2);
        let list = read_arcs(&global_args(), &args, None, input.as_bytes())?;
        assert_eq!(list.arcs, vec![(0, 1), (1, 2)]);
        assert_eq!(list.num_pages, 3);
        Ok(())
    }

    #[test]
    fn test_short_lines_are_skipped() -> Result<()> {
        let input = "a b\na\tb\n";
        let list = read_arcs(&global_args(), &arcs_args(false), None, input.as_bytes())?;
        assert_eq!(list.arcs, vec![(0, 1)]);
        assert_eq!(list.name(0), "a");
        Ok(())
    }
}
