/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// A set of page indices still to be recomputed by a worker.
///
/// Indices are stored contiguously; removal moves the last index into the
/// freed slot, so it takes constant time but does not preserve order.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    pages: Vec<usize>,
}

impl ActiveSet {
    pub fn new(pages: impl IntoIterator<Item = usize>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Removes the page at the given position, returning it.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is out of bounds.
    #[inline(always)]
    pub fn swap_remove(&mut self, pos: usize) -> usize {
        self.pages.swap_remove(pos)
    }

    /// Removes all pages for which `pred` returns true, returning how many
    /// were removed.
    pub fn prune(&mut self, mut pred: impl FnMut(usize) -> bool) -> usize {
        let before = self.pages.len();
        let mut pos = 0;
        while pos < self.pages.len() {
            if pred(self.pages[pos]) {
                // The moved-in page must be examined too
                self.swap_remove(pos);
            } else {
                pos += 1;
            }
        }
        before - self.pages.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.pages
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune() {
        let mut s = ActiveSet::new(0..10);
        assert_eq!(s.prune(|i| i % 3 == 0), 4);
        assert_eq!(s.len(), 6);
        let mut left = s.as_slice().to_vec();
        left.sort_unstable();
        assert_eq!(left, vec![1, 2, 4, 5, 7, 8]);
    }

    #[test]
    fn test_prune_all_and_none() {
        let mut s = ActiveSet::new([4, 5, 6]);
        assert_eq!(s.prune(|_| false), 0);
        assert_eq!(s.prune(|_| true), 3);
        assert!(s.is_empty());
    }

    #[test]
    fn test_swap_remove() {
        let mut s = ActiveSet::new([7, 8, 9]);
        assert_eq!(s.swap_remove(0), 7);
        assert_eq!(s.as_slice(), &[9, 8]);
    }
}
