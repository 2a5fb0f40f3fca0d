//! Anti-cheat report aggregation and ban threshold policy
//!
//! Reports are keyed by friend code. A record is banned the first time its
//! report count is strictly greater than the ban threshold; the transition
//! happens at most once per record.

use crate::models::SuspicionRecord;
use crate::protocol::{parse_report, ParseError};
use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Result of submitting one raw anti-cheat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Malformed input; no state changed
    Discarded(ParseError),
    /// Stored, no ban transition
    Recorded { report_count: u32 },
    /// This report pushed the record over the threshold
    Banned(SuspicionRecord),
}

#[derive(Debug, Default)]
pub struct ReportAggregator {
    records: HashMap<String, SuspicionRecord>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, raw: &str, ban_threshold: u32) -> ReportOutcome {
        self.submit_at(raw, ban_threshold, Utc::now())
    }

    pub fn submit_at(&mut self, raw: &str, ban_threshold: u32, now: DateTime<Utc>) -> ReportOutcome {
        let report = match parse_report(raw) {
            Ok(r) => r,
            Err(e) => return ReportOutcome::Discarded(e),
        };

        let record = match self.records.entry(report.friend_code.clone()) {
            Entry::Occupied(slot) => {
                let existing = slot.into_mut();
                existing.absorb(report, now);
                existing
            }
            Entry::Vacant(slot) => slot.insert(SuspicionRecord::from_report(report, now)),
        };

        if record.report_count > ban_threshold && !record.banned {
            record.banned = true;
            return ReportOutcome::Banned(record.clone());
        }

        ReportOutcome::Recorded {
            report_count: record.report_count,
        }
    }

    /// Drop non-banned records whose last report is older than `ttl`.
    /// Returns how many were removed.
    pub fn prune_idle(&mut self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, r| r.banned || now.signed_duration_since(r.last_seen) <= ttl);
        before - self.records.len()
    }

    pub fn get(&self, friend_code: &str) -> Option<&SuspicionRecord> {
        self.records.get(friend_code)
    }

    pub fn banned_count(&self) -> usize {
        self.records.values().filter(|r| r.banned).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
