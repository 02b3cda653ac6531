//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;
use crate::stream::item::StreamKind;

/// Chronological media consumption tracker CLI.
#[derive(Parser, Debug)]
#[command(
    name = "autocon",
    version,
    about = "Track chronological consumption of media streams",
    long_about = "Keeps categories of streams (downloaded files, linked pages, physical items) \
                  and walks each one oldest-first.\n\n\
                  Feeds are synced into per-stream queues without disturbing manual edits."
)]
pub struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true, env = "AUTOCON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Content root holding the category directories.
    #[arg(short, long, global = true, env = "AUTOCON_ROOT")]
    pub root: Option<PathBuf>,

    /// Maximum number of items a stream may hold after a sync.
    #[arg(long, global = true)]
    pub item_limit: Option<usize>,

    /// Hide download progress information.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List categories and streams with their current items.
    List {
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a stream's state and pending count.
    Show(StreamArgs),

    /// Mark the current item as done and move to the next one.
    Complete(StreamArgs),

    /// Open the current item's file or link.
    Open(StreamArgs),

    /// Record how far into the current item you are.
    Progress {
        #[command(flatten)]
        stream: StreamArgs,

        /// Free-form progress text, for example a timestamp.
        text: String,
    },

    /// Change or clear a stream's feed URL.
    SetFeed {
        #[command(flatten)]
        stream: StreamArgs,

        /// New feed URL. Omit to clear.
        url: Option<String>,
    },

    /// List the items after the current one.
    Pending {
        #[command(flatten)]
        stream: StreamArgs,

        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Bring cursors in line with the files on disk.
    Reconcile {
        /// Only this category.
        category: Option<String>,

        /// Only this stream of the category.
        stream: Option<String>,
    },

    /// Fetch feeds and merge new entries.
    Sync {
        /// Only sync this category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Create a category.
    AddCategory {
        name: String,
    },

    /// Rename a category.
    RenameCategory {
        old: String,
        new: String,
    },

    /// Rename a stream and/or move it to another category.
    MoveStream {
        #[command(flatten)]
        stream: StreamArgs,

        /// Category to move the stream to. Defaults to its current one.
        #[arg(long)]
        to: Option<String>,

        /// New stream name. Defaults to its current one.
        #[arg(long)]
        name: Option<String>,
    },

    /// Create a stream in an existing category.
    AddStream {
        category: String,
        name: String,

        /// Kind of stream.
        #[arg(long, short, value_enum)]
        kind: StreamKindArg,

        /// Feed URL to sync from.
        #[arg(long)]
        feed: Option<String>,
    },
}

/// Identifies one stream.
#[derive(clap::Args, Debug, Clone)]
pub struct StreamArgs {
    /// Category name.
    pub category: String,

    /// Stream name.
    pub stream: String,
}

/// CLI stream kind argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StreamKindArg {
    /// Media files downloaded from the feed.
    Downloaded,
    /// Links opened in the browser.
    Linked,
    /// Physically owned items.
    Manual,
}

impl From<StreamKindArg> for StreamKind {
    fn from(arg: StreamKindArg) -> Self {
        match arg {
            StreamKindArg::Downloaded => StreamKind::Downloaded,
            StreamKindArg::Linked => StreamKind::Linked,
            StreamKindArg::Manual => StreamKind::Manual,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.library.root = root.clone();
        }

        if let Some(limit) = self.item_limit {
            config.sync.item_limit = limit;
        }

        if self.quiet {
            config.sync.show_downloads = false;
        }
    }
}
