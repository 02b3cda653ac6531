//! autocon - chronological consumption tracking for media streams.
//!
//! Media is organized as categories of streams. Each stream walks its items
//! oldest-first and remembers the current one in a plain `info.txt`.
//!
//! # Features
//!
//! - Downloaded streams: media files named `date;name.ext`
//! - Linked streams: a `queue.txt` of dated URLs
//! - Manual streams: a `queue.txt` of physically owned items
//! - RSS/Atom sync that appends new entries without reordering manual edits
//! - Per-stream item cap
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use autocon::{CategoryTree, Config, StreamEngine};
//!
//! fn main() -> autocon::Result<()> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let engine = StreamEngine::new(&config);
//!     let tree = CategoryTree::scan(config.root())?;
//!
//!     let stream = tree.find_stream("Podcasts", "Daily")?;
//!     let advance = engine.advance(&stream.dir)?;
//!     println!("{:?}", advance.current);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod feed;
pub mod fs;
pub mod opener;
pub mod output;
pub mod stream;
pub mod sync;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use fs::{CategoryTree, StreamHandle};
pub use stream::{Cursor, Item, StreamEngine, StreamKind, StreamRecord};
pub use sync::{SyncCoordinator, SyncReport};
