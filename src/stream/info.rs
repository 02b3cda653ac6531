//! The per-stream state file (`info.txt`).
//!
//! Downloaded and linked streams use seven lines:
//!
//! ```text
//! downloaded            type tag
//! https://feed.url      feed URL, empty when there is none
//! 2021-03-01            current item date
//! Episode 4             current item name
//! mp3                   extension (downloaded) or URL (linked)
//! 12:30                 progress, empty when unset
//!                       mandatory blank line
//! ```
//!
//! Manual streams use six: type tag, a blank line, date, name, author and the
//! mandatory blank line.
//!
//! A fresh stream stores the date `1000-01-01` with empty item lines. An
//! exhausted stream stores `9000-01-01`, keeps the last consumed name and
//! locator, and (downloaded/linked only) puts the last consumed date on the
//! progress line.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::fs::atomic::write_atomic;
use crate::stream::item::{
    format_date, parse_date, Cursor, Item, Locator, Mark, StreamKind, EXHAUSTED_DATE,
    NOT_STARTED_DATE,
};

/// File name of the state file inside a stream directory.
pub const INFO_FILE: &str = "info.txt";

const FEED_LINES: usize = 7;
const MANUAL_LINES: usize = 6;

/// Everything persisted about a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamRecord {
    Downloaded {
        feed_url: Option<String>,
        cursor: Cursor,
    },
    Linked {
        feed_url: Option<String>,
        cursor: Cursor,
    },
    Manual {
        cursor: Cursor,
    },
}

impl StreamRecord {
    /// A fresh record. Manual streams drop the feed URL.
    pub fn new(kind: StreamKind, feed_url: Option<String>) -> Self {
        let cursor = Cursor::NotStarted;
        match kind {
            StreamKind::Downloaded => StreamRecord::Downloaded { feed_url, cursor },
            StreamKind::Linked => StreamRecord::Linked { feed_url, cursor },
            StreamKind::Manual => StreamRecord::Manual { cursor },
        }
    }

    pub fn kind(&self) -> StreamKind {
        match self {
            StreamRecord::Downloaded { .. } => StreamKind::Downloaded,
            StreamRecord::Linked { .. } => StreamKind::Linked,
            StreamRecord::Manual { .. } => StreamKind::Manual,
        }
    }

    pub fn feed_url(&self) -> Option<&str> {
        match self {
            StreamRecord::Downloaded { feed_url, .. } | StreamRecord::Linked { feed_url, .. } => {
                feed_url.as_deref()
            }
            StreamRecord::Manual { .. } => None,
        }
    }

    /// Returns `false` for manual streams, which cannot hold a feed.
    pub fn set_feed_url(&mut self, url: Option<String>) -> bool {
        match self {
            StreamRecord::Downloaded { feed_url, .. } | StreamRecord::Linked { feed_url, .. } => {
                *feed_url = url;
                true
            }
            StreamRecord::Manual { .. } => false,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        match self {
            StreamRecord::Downloaded { cursor, .. }
            | StreamRecord::Linked { cursor, .. }
            | StreamRecord::Manual { cursor } => cursor,
        }
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        match self {
            StreamRecord::Downloaded { cursor, .. }
            | StreamRecord::Linked { cursor, .. }
            | StreamRecord::Manual { cursor } => cursor,
        }
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> Error {
    Error::MalformedInfoFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn optional(line: &str) -> Option<String> {
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Parse `info.txt` contents.
pub fn parse(path: &Path, content: &str) -> Result<StreamRecord> {
    let body = content
        .strip_suffix('\n')
        .ok_or_else(|| malformed(path, "last line is not terminated"))?;
    let lines: Vec<&str> = body
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect();

    let kind: StreamKind = lines[0]
        .parse()
        .map_err(|reason: String| malformed(path, reason))?;

    let expected = if kind == StreamKind::Manual {
        MANUAL_LINES
    } else {
        FEED_LINES
    };
    if lines.len() != expected {
        return Err(malformed(
            path,
            format!(
                "{} streams have {} lines, found {}",
                kind,
                expected,
                lines.len()
            ),
        ));
    }
    if !lines[expected - 1].is_empty() {
        return Err(malformed(path, "missing trailing blank line"));
    }

    let (date, name, locator) = (lines[2], lines[3], lines[4]);

    match kind {
        StreamKind::Downloaded | StreamKind::Linked => {
            let progress = lines[5];
            let cursor = parse_cursor(path, kind, date, name, locator, Some(progress))?;
            Ok(match kind {
                StreamKind::Downloaded => StreamRecord::Downloaded {
                    feed_url: optional(lines[1]),
                    cursor,
                },
                _ => StreamRecord::Linked {
                    feed_url: optional(lines[1]),
                    cursor,
                },
            })
        }
        StreamKind::Manual => {
            if !lines[1].is_empty() {
                return Err(malformed(path, "manual streams have no feed line"));
            }
            let cursor = parse_cursor(path, kind, date, name, locator, None)?;
            Ok(StreamRecord::Manual { cursor })
        }
    }
}

fn parse_cursor(
    path: &Path,
    kind: StreamKind,
    date: &str,
    name: &str,
    locator: &str,
    progress: Option<&str>,
) -> Result<Cursor> {
    let progress = progress.unwrap_or_default();

    match date {
        NOT_STARTED_DATE => {
            if !name.is_empty() || !locator.is_empty() || !progress.is_empty() {
                return Err(malformed(path, "fresh stream must have empty item lines"));
            }
            Ok(Cursor::NotStarted)
        }
        EXHAUSTED_DATE => {
            let last_date = if progress.is_empty() {
                None
            } else {
                Some(parse_date(progress).ok_or_else(|| {
                    malformed(path, format!("invalid last consumed date '{}'", progress))
                })?)
            };
            Ok(Cursor::Exhausted(Mark {
                date: last_date,
                name: name.to_string(),
                locator: locator.to_string(),
            }))
        }
        _ => {
            let date = parse_date(date)
                .ok_or_else(|| malformed(path, format!("invalid date '{}'", date)))?;
            let mut item = Item::new(date, name, Locator::for_kind(kind, locator));
            item.progress = optional(progress);
            Ok(Cursor::At(item))
        }
    }
}

/// Serialize a record into the fixed line layout.
pub fn serialize(record: &StreamRecord) -> String {
    let kind = record.kind();

    let (date, name, locator, progress) = match record.cursor() {
        Cursor::NotStarted => (
            NOT_STARTED_DATE.to_string(),
            String::new(),
            String::new(),
            String::new(),
        ),
        Cursor::At(item) => (
            format_date(item.date),
            item.name.clone(),
            item.locator.as_str().to_string(),
            item.progress.clone().unwrap_or_default(),
        ),
        Cursor::Exhausted(mark) => (
            EXHAUSTED_DATE.to_string(),
            mark.name.clone(),
            mark.locator.clone(),
            mark.date.map(format_date).unwrap_or_default(),
        ),
    };

    let mut lines = vec![kind.tag().to_string()];
    lines.push(record.feed_url().unwrap_or_default().to_string());
    lines.push(date);
    lines.push(name);
    lines.push(locator);
    if kind != StreamKind::Manual {
        lines.push(progress);
    }
    lines.push(String::new());

    lines.iter().map(|line| format!("{}\n", line)).collect()
}

/// Load the record of the stream at `stream_dir`.
pub fn load(stream_dir: &Path) -> Result<StreamRecord> {
    let path = stream_dir.join(INFO_FILE);
    let content = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::MissingInfoFile(path.clone())
        } else {
            Error::Io(e)
        }
    })?;
    parse(&path, &content)
}

/// Atomically rewrite the record of the stream at `stream_dir`.
pub fn save(stream_dir: &Path, record: &StreamRecord) -> Result<()> {
    write_atomic(&stream_dir.join(INFO_FILE), &serialize(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOWNLOADED: &str = "downloaded\nhttps://example.com/feed.xml\n2021-03-01\nEpisode 4\nmp3\n12:30\n\n";
    const LINKED_FRESH: &str = "linked\n\n1000-01-01\n\n\n\n\n";
    const LINKED_EXHAUSTED: &str = "linked\n\n9000-01-01\nLast video\nhttps://v/1\n2020-06-01\n\n";
    const MANUAL: &str = "manual\n\n1950-10-16\nThe Lion, the Witch and the Wardrobe\nC. S. Lewis\n\n";
    const MANUAL_EXHAUSTED: &str = "manual\n\n9000-01-01\nPrince Caspian\nC. S. Lewis\n\n";

    fn round_trip(content: &str) -> String {
        serialize(&parse(Path::new(INFO_FILE), content).unwrap())
    }

    #[test]
    fn test_round_trip_every_layout() {
        for content in [DOWNLOADED, LINKED_FRESH, LINKED_EXHAUSTED, MANUAL, MANUAL_EXHAUSTED] {
            assert_eq!(round_trip(content), content);
        }
    }

    #[test]
    fn test_parse_downloaded() {
        let record = parse(Path::new(INFO_FILE), DOWNLOADED).unwrap();
        assert_eq!(record.kind(), StreamKind::Downloaded);
        assert_eq!(record.feed_url(), Some("https://example.com/feed.xml"));

        let item = record.cursor().current().unwrap();
        assert_eq!(item.name, "Episode 4");
        assert_eq!(item.locator, Locator::Extension("mp3".into()));
        assert_eq!(item.progress.as_deref(), Some("12:30"));
    }

    #[test]
    fn test_parse_exhausted_keeps_last_position() {
        let record = parse(Path::new(INFO_FILE), LINKED_EXHAUSTED).unwrap();
        assert_eq!(
            record.cursor().position(),
            Some((parse_date("2020-06-01").unwrap(), "Last video"))
        );
        assert!(record.cursor().is_empty());
    }

    #[test]
    fn test_manual_has_no_feed() {
        let mut record = parse(Path::new(INFO_FILE), MANUAL).unwrap();
        assert_eq!(record.feed_url(), None);
        assert!(!record.set_feed_url(Some("https://x".into())));
        assert_eq!(
            record.cursor().current().unwrap().locator,
            Locator::Author("C. S. Lewis".into())
        );
    }

    #[test]
    fn test_rejects_wrong_line_count() {
        // Legacy layout without the progress line
        let err = parse(
            Path::new(INFO_FILE),
            "linked\n\n2020-01-01\nA\nhttps://a\n\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedInfoFile { .. }));
    }

    #[test]
    fn test_rejects_missing_blank_line() {
        let err = parse(Path::new(INFO_FILE), "manual\n\n2020-01-01\nA\nB\nextra\n").unwrap_err();
        assert!(matches!(err, Error::MalformedInfoFile { .. }));

        let err = parse(Path::new(INFO_FILE), "manual\n\n2020-01-01\nA\nB\n").unwrap_err();
        assert!(matches!(err, Error::MalformedInfoFile { .. }));
    }

    #[test]
    fn test_rejects_unknown_type_and_bad_date() {
        assert!(parse(Path::new(INFO_FILE), "podcast\n\n\n\n\n\n\n").is_err());
        assert!(parse(Path::new(INFO_FILE), "linked\n\nyesterday\nA\nu\n\n\n").is_err());
        assert!(parse(Path::new(INFO_FILE), "").is_err());
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingInfoFile(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let record = StreamRecord::new(StreamKind::Downloaded, Some("https://f".into()));
        save(dir.path(), &record).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join(INFO_FILE)).unwrap(),
            "downloaded\nhttps://f\n1000-01-01\n\n\n\n\n"
        );
        assert_eq!(load(dir.path()).unwrap(), record);
    }
}
