//! Streams and their on-disk state.
//!
//! A stream directory holds `info.txt` with the current item, plus either a
//! `queue.txt` (linked and manual streams) or the media files themselves
//! (downloaded streams).

pub mod engine;
pub mod files;
pub mod info;
pub mod item;
pub mod merge;
pub mod queue;

pub use engine::{Advance, Reconciliation, StreamEngine};
pub use info::StreamRecord;
pub use item::{Cursor, Item, Locator, Mark, StreamKind};
pub use merge::{Anomaly, MergeOutcome};
pub use queue::QueueEntry;
