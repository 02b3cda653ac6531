//! Feed module.
//!
//! Provides:
//! - Feed entry types
//! - RSS/Atom parsing
//! - The feed source used during synchronization

pub mod parser;
pub mod source;
pub mod types;

pub use parser::parse_feed;
pub use source::{FeedSource, HttpFeedSource};
pub use types::{Enclosure, FeedEntry};
