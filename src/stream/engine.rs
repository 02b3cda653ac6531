//! Per-stream state machine.
//!
//! A stream is either empty (not started or exhausted) or positioned at a
//! current item. Completing the current item moves to the next one in
//! consumption order: the next media file on disk for downloaded streams,
//! the front of `queue.txt` for linked and manual ones.

use std::path::Path;

use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::opener::{OpenTarget, Opener};
use crate::stream::files::{files_after, item_for_file, scan_media_files};
use crate::stream::info::{self, StreamRecord};
use crate::stream::item::{Cursor, Item, Locator, StreamKind};
use crate::stream::queue::{self, QueueEntry, QUEUE_FILE};

/// Result of completing the current item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advance {
    pub previous: Option<Item>,
    pub current: Option<Item>,
}

/// Result of checking a stream's cursor against its directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reconciliation {
    InSync,
    /// The current media file is gone; the cursor moved on.
    CurrentMissing {
        missing: Item,
        current: Option<Item>,
    },
    /// An exhausted stream had new items and now points at the first.
    Resumed { current: Item },
}

/// Operations on a single stream directory.
#[derive(Debug, Clone)]
pub struct StreamEngine {
    pub(crate) item_limit: usize,
    pub(crate) max_download_failures: u32,
}

impl StreamEngine {
    pub fn new(config: &Config) -> Self {
        Self::with_limits(config.sync.item_limit, config.sync.max_download_failures)
    }

    pub fn with_limits(item_limit: usize, max_download_failures: u32) -> Self {
        Self {
            item_limit,
            max_download_failures,
        }
    }

    /// Load the stream's record.
    pub fn load(&self, stream_dir: &Path) -> Result<StreamRecord> {
        info::load(stream_dir)
    }

    /// Complete the current item and move to the next one.
    pub fn advance(&self, stream_dir: &Path) -> Result<Advance> {
        let mut record = info::load(stream_dir)?;
        let kind = record.kind();
        let previous = record.cursor().current().cloned();

        let next = match kind {
            StreamKind::Downloaded => {
                let files = scan_media_files(stream_dir)?;
                files_after(files, record.cursor())
                    .into_iter()
                    .next()
                    .map(item_for_file)
            }
            StreamKind::Linked | StreamKind::Manual => {
                queue::pop_front(&stream_dir.join(QUEUE_FILE), kind)?
                    .map(|(front, _)| front.into_item(kind))
            }
        };

        let cursor = match (next, record.cursor()) {
            (Some(item), _) => Cursor::At(item),
            (None, Cursor::At(item)) => Cursor::Exhausted(item.mark()),
            (None, unchanged) => unchanged.clone(),
        };
        *record.cursor_mut() = cursor;
        info::save(stream_dir, &record)?;

        let current = record.cursor().current().cloned();
        match &current {
            Some(item) => tracing::info!(
                "{}: now at {} ({})",
                stream_dir.display(),
                item.name,
                item.date
            ),
            None => tracing::info!("{}: reached the end of the stream", stream_dir.display()),
        }

        Ok(Advance { previous, current })
    }

    /// Hand the current item to the operating system.
    ///
    /// Manual items are physical and have nothing to open, so `None` is
    /// returned for them. Opener failures are logged only.
    pub fn open(&self, stream_dir: &Path, opener: &dyn Opener) -> Result<Option<OpenTarget>> {
        let record = info::load(stream_dir)?;
        let item = record
            .cursor()
            .current()
            .ok_or_else(|| Error::NoCurrentItem(stream_dir.to_path_buf()))?;

        let target = match &item.locator {
            Locator::Extension(_) => match item.file_name() {
                Some(file_name) => OpenTarget::File(stream_dir.join(file_name)),
                None => return Ok(None),
            },
            Locator::Url(url) => OpenTarget::Url(url.clone()),
            Locator::Author(_) => return Ok(None),
        };

        if let Err(e) = opener.open(&target) {
            tracing::warn!("Failed to open {}: {}", target, e);
        }

        Ok(Some(target))
    }

    /// Rewrite the progress marker of the current item.
    pub fn set_progress(&self, stream_dir: &Path, text: &str) -> Result<Item> {
        let mut record = info::load(stream_dir)?;
        if record.kind() == StreamKind::Manual {
            return Err(Error::ProgressNotTracked(stream_dir.to_path_buf()));
        }

        let progress = text.replace(['\r', '\n'], " ").trim().to_string();
        let item = record
            .cursor_mut()
            .current_mut()
            .ok_or_else(|| Error::NoCurrentItem(stream_dir.to_path_buf()))?;
        item.progress = if progress.is_empty() {
            None
        } else {
            Some(progress)
        };
        let item = item.clone();

        info::save(stream_dir, &record)?;
        Ok(item)
    }

    /// Change or clear the stream's feed URL.
    pub fn set_feed_url(&self, stream_dir: &Path, url: Option<&str>) -> Result<()> {
        let mut record = info::load(stream_dir)?;

        let url = match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(u) => Some(Url::parse(u)?.to_string()),
            None => None,
        };

        if !record.set_feed_url(url) {
            return Err(Error::FeedNotSupported(stream_dir.to_path_buf()));
        }

        info::save(stream_dir, &record)
    }

    /// Items after the current one, in the order they will be reached.
    pub fn pending(&self, stream_dir: &Path) -> Result<Vec<QueueEntry>> {
        let record = info::load(stream_dir)?;
        self.pending_for(stream_dir, &record)
    }

    pub(crate) fn pending_for(
        &self,
        stream_dir: &Path,
        record: &StreamRecord,
    ) -> Result<Vec<QueueEntry>> {
        match record.kind() {
            StreamKind::Downloaded => {
                let files = scan_media_files(stream_dir)?;
                Ok(files_after(files, record.cursor())
                    .into_iter()
                    .map(|f| QueueEntry::new(f.date, f.name, Some(f.extension)))
                    .collect())
            }
            kind => queue::load(&stream_dir.join(QUEUE_FILE), kind),
        }
    }

    /// Bring the cursor in line with what is on disk.
    pub fn reconcile(&self, stream_dir: &Path) -> Result<Reconciliation> {
        let mut record = info::load(stream_dir)?;

        match record.cursor().clone() {
            Cursor::At(item) if record.kind() == StreamKind::Downloaded => {
                let present = item
                    .file_name()
                    .map(|name| stream_dir.join(name).is_file())
                    .unwrap_or(false);
                if present {
                    return Ok(Reconciliation::InSync);
                }

                tracing::warn!(
                    "{}: current file for '{}' is missing",
                    stream_dir.display(),
                    item.name
                );
                let next = files_after(scan_media_files(stream_dir)?, record.cursor())
                    .into_iter()
                    .next()
                    .map(item_for_file);
                *record.cursor_mut() = match &next {
                    Some(next) => Cursor::At(next.clone()),
                    None => Cursor::Exhausted(item.mark()),
                };
                info::save(stream_dir, &record)?;

                Ok(Reconciliation::CurrentMissing {
                    missing: item,
                    current: next,
                })
            }
            Cursor::Exhausted(_) => {
                if self.pending_for(stream_dir, &record)?.is_empty() {
                    return Ok(Reconciliation::InSync);
                }
                match self.advance(stream_dir)?.current {
                    Some(current) => Ok(Reconciliation::Resumed { current }),
                    None => Ok(Reconciliation::InSync),
                }
            }
            _ => Ok(Reconciliation::InSync),
        }
    }
}
