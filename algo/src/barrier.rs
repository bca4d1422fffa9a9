/*
 * SPDX-FileCopyrightText: 2026 The parrank developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A reusable barrier that can be broken.
//!
//! [`std::sync::Barrier`] has no way to release waiting threads if one of
//! the parties will never arrive, which is exactly what happens when a
//! worker panics. A [`PhaseBarrier`] can be [aborted](PhaseBarrier::abort):
//! all threads currently waiting, and all threads calling
//! [`wait`](PhaseBarrier::wait) afterwards, receive an [`Aborted`] error.
//!
//! Since the state is protected by a mutex, everything a thread wrote before
//! calling [`wait`](PhaseBarrier::wait) is visible to every other thread
//! after its own call returns.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// The error returned by the waits of an aborted [`PhaseBarrier`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("The barrier was aborted")]
pub struct Aborted;

#[derive(Debug)]
struct State {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

#[derive(Debug)]
pub struct PhaseBarrier {
    parties: usize,
    state: Mutex<State>,
    cvar: Condvar,
}

impl PhaseBarrier {
    /// Creates a barrier for the given number of parties.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is zero.
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "A barrier needs at least one party");
        Self {
            parties,
            state: Mutex::new(State {
                arrived: 0,
                generation: 0,
                aborted: false,
            }),
            cvar: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    // No code panics while holding the lock, but a poisoned lock must not
    // hide an abort.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until all parties have called this method.
    ///
    /// Returns `Ok(true)` for exactly one of the parties (the last one to
    /// arrive), `Ok(false)` for the others, and `Err(Aborted)` if the barrier
    /// has been or gets aborted.
    pub fn wait(&self) -> Result<bool, Aborted> {
        let mut state = self.lock();
        if state.aborted {
            return Err(Aborted);
        }
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return Ok(true);
        }
        let generation = state.generation;
        let state = self
            .cvar
            .wait_while(state, |s| s.generation == generation && !s.aborted)
            .unwrap_or_else(PoisonError::into_inner);
        // A phase completed before the abort still counts
        if state.generation != generation {
            Ok(false)
        } else {
            Err(Aborted)
        }
    }

    /// Breaks the barrier, releasing all current and future waiters with an
    /// error.
    pub fn abort(&self) {
        let mut state = self.lock();
        state.aborted = true;
        self.cvar.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// Returns a guard that aborts the barrier if dropped during a panic.
    pub fn abort_on_panic(&self) -> AbortOnPanic<'_> {
        AbortOnPanic(self)
    }
}

/// Aborts a [`PhaseBarrier`] when dropped while the current thread is
/// unwinding.
#[derive(Debug)]
pub struct AbortOnPanic<'a>(&'a PhaseBarrier);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!(
                "Thread {:?} panicked, aborting the barrier",
                std::thread::current().name().unwrap_or("<unnamed>")
            );
            self.0.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_phases() {
        let barrier = PhaseBarrier::new(4);
        let leaders = AtomicUsize::new(0);
        let counter = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for phase in 0..10 {
                        counter.fetch_add(1, Ordering::Relaxed);
                        if barrier.wait().unwrap() {
                            leaders.fetch_add(1, Ordering::Relaxed);
                        }
                        // Everybody has incremented for this phase
                        assert!(counter.load(Ordering::Relaxed) >= 4 * (phase + 1));
                        barrier.wait().unwrap();
                    }
                });
            }
        });
        assert_eq!(leaders.load(Ordering::Relaxed), 10);
        assert_eq!(counter.load(Ordering::Relaxed), 40);
    }

    #[test]
    fn test_abort_releases_waiters() {
        let barrier = PhaseBarrier::new(3);
        std::thread::scope(|s| {
            let waiters = (0..2)
                .map(|_| s.spawn(|| barrier.wait()))
                .collect::<Vec<_>>();
            barrier.abort();
            for w in waiters {
                assert_eq!(w.join().unwrap(), Err(Aborted));
            }
        });
        assert!(barrier.is_aborted());
        assert_eq!(barrier.wait(), Err(Aborted));
    }

    #[test]
    fn test_abort_on_panic() {
        let barrier = PhaseBarrier::new(2);
        std::thread::scope(|s| {
            let failing = s.spawn(|| {
                let _guard = barrier.abort_on_panic();
                panic!("worker failure");
            });
            assert_eq!(barrier.wait(), Err(Aborted));
            assert!(failing.join().is_err());
        });
    }

    #[test]
    fn test_guard_is_silent_without_panic() {
        let barrier = PhaseBarrier::new(1);
        {
            let _guard = barrier.abort_on_panic();
        }
        assert_eq!(barrier.wait(), Ok(true));
    }
}
