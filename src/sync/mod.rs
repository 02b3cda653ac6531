//! Sync passes: fetch each stream's feed and merge the new entries.

pub mod coordinator;
pub mod report;

pub use coordinator::SyncCoordinator;
pub use report::{StreamOutcome, StreamStatus, SyncReport};
