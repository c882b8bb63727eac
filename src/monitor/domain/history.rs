//! Time-ordered observation series for one endpoint.

use super::CheckResult;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Append-only, time-bounded sequence of observations.
///
/// Entries are kept in non-decreasing timestamp order, so eviction only ever
/// removes from the front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySeries {
    entries: VecDeque<CheckResult>,
}

impl HistorySeries {
    /// Creates an empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Adds an observation at its ordered position.
    ///
    /// Results normally arrive in order and are pushed to the back. A result
    /// older than the current tail (an on-demand probe that started before a
    /// concurrently recorded one) is inserted after every entry with an equal
    /// or earlier timestamp.
    pub fn push(&mut self, result: CheckResult) {
        let in_order = self
            .entries
            .back()
            .is_none_or(|last| last.timestamp() <= result.timestamp());
        if in_order {
            self.entries.push_back(result);
            return;
        }

        let position = self
            .entries
            .partition_point(|entry| entry.timestamp() <= result.timestamp());
        self.entries.insert(position, result);
    }

    /// Removes every entry older than `cutoff` and returns how many went.
    pub fn trim_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        while self
            .entries
            .front()
            .is_some_and(|entry| entry.timestamp() < cutoff)
        {
            self.entries.pop_front();
            removed += 1;
        }
        removed
    }

    /// Returns the most recent observation.
    #[must_use]
    pub fn latest(&self) -> Option<&CheckResult> {
        self.entries.back()
    }

    /// Iterates observations oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CheckResult> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Returns the number of retained observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the series holds no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the observations out, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<CheckResult> {
        self.entries.iter().cloned().collect()
    }
}

impl FromIterator<CheckResult> for HistorySeries {
    fn from_iter<T: IntoIterator<Item = CheckResult>>(iter: T) -> Self {
        let mut entries: Vec<CheckResult> = iter.into_iter().collect();
        entries.sort_by_key(CheckResult::timestamp);
        Self {
            entries: entries.into(),
        }
    }
}
