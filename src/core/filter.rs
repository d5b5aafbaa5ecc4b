// PRISM - core/filter.rs
//
// Narrowing of log entries before acting on them.
// All active criteria are AND-combined.
// Core layer: pure logic, no I/O.

use crate::core::model::{EventStatus, LogEntry};
use crate::util::error::FilterError;
use regex::Regex;

/// Entry filter. An empty filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Subject regex (unanchored). Entries without a subject never match.
    pub subject: Option<Regex>,

    /// Exact sender address. None = any sender.
    pub sender: Option<String>,

    /// Event statuses to keep (empty = all).
    pub statuses: Vec<EventStatus>,
}

impl EntryFilter {
    /// Returns true if no criteria are active.
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.sender.is_none() && self.statuses.is_empty()
    }

    /// Set the subject pattern, compiling it. An empty pattern clears it.
    pub fn set_subject_regex(&mut self, pattern: &str) -> Result<(), FilterError> {
        if pattern.is_empty() {
            self.subject = None;
            return Ok(());
        }
        let regex = Regex::new(pattern).map_err(|e| FilterError::InvalidRegex {
            pattern: pattern.to_string(),
            source: e,
        })?;
        self.subject = Some(regex);
        Ok(())
    }

    /// Keep only entries whose status is one of `statuses`, given in the
    /// export's spelling ("DELIVERED", "Quarantined", ...). Empty = all.
    pub fn set_statuses<I, S>(&mut self, statuses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.statuses = statuses
            .into_iter()
            .map(|s| EventStatus::from_export(s.as_ref().trim()))
            .collect();
    }

    /// Check a single entry against every active criterion.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(ref pattern) = self.subject {
            if !entry.subject_matches(pattern) {
                return false;
            }
        }

        if let Some(ref sender) = self.sender {
            if entry.sender != *sender {
                return false;
            }
        }

        self.statuses.is_empty() || self.statuses.contains(&entry.event_status)
    }

    /// Keep matching entries, preserving order.
    pub fn apply(&self, entries: Vec<LogEntry>) -> Vec<LogEntry> {
        if self.is_empty() {
            return entries;
        }
        let before = entries.len();
        let kept: Vec<LogEntry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        tracing::debug!(before, after = kept.len(), "Entry filter applied");
        kept
    }
}
