//! Media files of downloaded streams.

use std::path::Path;

use crate::error::Result;
use crate::fs::naming::MediaFileName;
use crate::stream::item::{Cursor, Item, Locator};

/// Scan a stream directory for media files, in consumption order.
///
/// State files, hidden files and anything not named `date;name.ext` are
/// skipped.
pub fn scan_media_files(dir: &Path) -> Result<Vec<MediaFileName>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };

        match MediaFileName::parse(file_name) {
            Some(parsed) => files.push(parsed),
            None => tracing::debug!("Ignoring {}", file_name),
        }
    }

    files.sort();
    Ok(files)
}

/// The position of the cursor expressed as a media file, if known.
pub(crate) fn cursor_file(cursor: &Cursor) -> Option<MediaFileName> {
    match cursor {
        Cursor::NotStarted => None,
        Cursor::At(item) => Some(MediaFileName {
            date: item.date,
            name: item.name.clone(),
            extension: item.locator.as_str().to_string(),
        }),
        Cursor::Exhausted(mark) => match mark.date {
            Some(date) => Some(MediaFileName {
                date,
                name: mark.name.clone(),
                extension: mark.locator.clone(),
            }),
            None => {
                tracing::warn!(
                    "Exhausted stream has no last date, treating every file as unconsumed"
                );
                None
            }
        },
    }
}

/// Files strictly after the cursor. Files at or before it are consumed.
pub fn files_after(files: Vec<MediaFileName>, cursor: &Cursor) -> Vec<MediaFileName> {
    match cursor_file(cursor) {
        Some(position) => files.into_iter().filter(|f| *f > position).collect(),
        None => files,
    }
}

/// The current item for a media file.
pub fn item_for_file(file: MediaFileName) -> Item {
    Item::new(file.date, file.name, Locator::Extension(file.extension))
}
