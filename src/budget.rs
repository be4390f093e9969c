//! Time-bounded pattern matching.
//!
//! Predicate fragments and MERGE headers come straight from user input, so
//! every match against them goes through a [`MatchBudget`]. The elapsed time
//! is measured once the match returns; a match cannot be interrupted, and
//! `regex` guarantees it runs in time linear in the haystack. A match whose
//! running time reached the budget is reported as [`MatchTimeout`] instead
//! of a result; callers decide whether that fails a fragment or a statement.

use regex::{Captures, Regex};
use std::time::{Duration, Instant};

use crate::error::MatchTimeout;

/// Per-match time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchBudget {
    limit: Duration,
}

impl MatchBudget {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn is_match(&self, pattern: &Regex, haystack: &str) -> Result<bool, MatchTimeout> {
        self.timed(|| pattern.is_match(haystack))
    }

    pub fn captures<'h>(
        &self,
        pattern: &Regex,
        haystack: &'h str,
    ) -> Result<Option<Captures<'h>>, MatchTimeout> {
        self.timed(|| pattern.captures(haystack))
    }

    /// Start a deadline covering several steps of one operation.
    pub fn deadline(&self) -> Deadline {
        Deadline {
            started: Instant::now(),
            limit: self.limit,
        }
    }

    /// Run `f`, then report whether it overran.
    fn timed<T>(&self, f: impl FnOnce() -> T) -> Result<T, MatchTimeout> {
        let deadline = self.deadline();
        let value = f();
        deadline.check()?;
        Ok(value)
    }
}

impl Default for MatchBudget {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

/// A running budget, checked between steps of an iterative scan.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    /// `Err` once the elapsed time reaches the limit. A zero limit is always
    /// exhausted.
    pub fn check(&self) -> Result<(), MatchTimeout> {
        if self.started.elapsed() >= self.limit {
            return Err(MatchTimeout {
                limit_ms: self.limit.as_millis() as u64,
            });
        }
        Ok(())
    }
}
