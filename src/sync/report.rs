//! Sync pass bookkeeping.

use crate::error::Error;
use crate::stream::merge::MergeOutcome;

/// How one stream fared during a sync pass.
#[derive(Debug)]
pub enum StreamStatus {
    /// The feed was fetched and merged.
    Merged(MergeOutcome),
    /// The stream has no feed URL.
    NoFeed,
    /// The stream could not be synced; other streams were unaffected.
    Failed(Error),
}

#[derive(Debug)]
pub struct StreamOutcome {
    pub category: String,
    pub stream: String,
    pub status: StreamStatus,
}

/// Totals across every stream in a sync pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<StreamOutcome>,
    pub streams_synced: u64,
    pub streams_skipped: u64,
    pub streams_failed: u64,
    pub items_added: u64,
    pub items_discarded: u64,
    pub download_failures: u64,
    pub anomalies: u64,
    pub streams_resumed: u64,
}

impl SyncReport {
    /// Record the outcome of one stream.
    pub fn record(&mut self, outcome: StreamOutcome) {
        match &outcome.status {
            StreamStatus::Merged(merge) => {
                self.streams_synced += 1;
                self.items_added += merge.added as u64;
                self.items_discarded += merge.discarded as u64;
                self.download_failures += merge.failures.len() as u64;
                self.anomalies += merge.anomalies.len() as u64;
                if merge.resumed.is_some() {
                    self.streams_resumed += 1;
                }
            }
            StreamStatus::NoFeed => self.streams_skipped += 1,
            StreamStatus::Failed(_) => self.streams_failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Fold another report into this one.
    pub fn extend(&mut self, other: SyncReport) {
        for outcome in other.outcomes {
            self.record(outcome);
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = (&StreamOutcome, &Error)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            StreamStatus::Failed(e) => Some((o, e)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.streams_failed > 0
    }
}
