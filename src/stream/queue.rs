//! The pending-items log (`queue.txt`) of linked and manual streams.
//!
//! One record per line, `date;name;url` for linked streams and `date;name`
//! or `date;name;author` for manual ones. File order is queue order and is
//! never re-sorted here.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::fs::atomic::write_atomic;
use crate::fs::naming::FIELD_SEPARATOR;
use crate::stream::item::{format_date, parse_date, Item, Locator, StreamKind};

/// File name of the queue inside a stream directory.
pub const QUEUE_FILE: &str = "queue.txt";

/// One pending item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub date: NaiveDate,
    pub name: String,
    /// URL for linked entries, optional author for manual ones.
    pub locator: Option<String>,
}

impl QueueEntry {
    pub fn new(date: NaiveDate, name: impl Into<String>, locator: Option<String>) -> Self {
        Self {
            date,
            name: name.into(),
            locator,
        }
    }

    /// Identity used when matching against feed entries.
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.name.as_str())
    }

    /// Turn the entry into the current item of a stream of `kind`.
    pub fn into_item(self, kind: StreamKind) -> Item {
        let locator = Locator::for_kind(kind, self.locator.unwrap_or_default());
        Item::new(self.date, self.name, locator)
    }

    fn to_line(&self) -> String {
        let mut line = format!("{}{}{}", format_date(self.date), FIELD_SEPARATOR, self.name);
        if let Some(locator) = &self.locator {
            line.push(FIELD_SEPARATOR);
            line.push_str(locator);
        }
        line
    }
}

/// Parse a single queue line.
fn parse_line(kind: StreamKind, line: &str) -> std::result::Result<QueueEntry, String> {
    let fields: Vec<&str> = line.splitn(3, FIELD_SEPARATOR).collect();

    let (date, name, locator) = match (kind, fields.as_slice()) {
        (StreamKind::Linked, [date, name, url]) => {
            if url.is_empty() {
                return Err("missing url".to_string());
            }
            (*date, *name, Some(url.to_string()))
        }
        (StreamKind::Linked, _) => {
            return Err(format!("expected 3 fields, found {}", fields.len()));
        }
        (StreamKind::Manual, [date, name]) => (*date, *name, None),
        (StreamKind::Manual, [date, name, author]) => (*date, *name, Some(author.to_string())),
        (StreamKind::Manual, _) => {
            return Err(format!("expected 2 or 3 fields, found {}", fields.len()));
        }
        (StreamKind::Downloaded, _) => {
            return Err("downloaded streams have no queue".to_string());
        }
    };

    let date = parse_date(date).ok_or_else(|| format!("invalid date '{}'", date))?;
    Ok(QueueEntry::new(date, name, locator))
}

/// Parse queue file contents. Blank lines are skipped.
pub fn parse(path: &Path, kind: StreamKind, content: &str) -> Result<Vec<QueueEntry>> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            parse_line(kind, line).map_err(|reason| Error::MalformedRecord {
                path: path.to_path_buf(),
                line: line_no,
                reason,
            })
        })
        .collect()
}

/// Serialize entries, one terminated line each.
pub fn serialize(entries: &[QueueEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}\n", entry.to_line()))
        .collect()
}

/// Load the queue. A missing file is an empty queue.
pub fn load(path: &Path, kind: StreamKind) -> Result<Vec<QueueEntry>> {
    match fs::read_to_string(path) {
        Ok(content) => parse(path, kind, &content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Replace the whole queue atomically.
pub fn save(path: &Path, entries: &[QueueEntry]) -> Result<()> {
    write_atomic(path, &serialize(entries))
}

/// Append entries after the existing ones and return the full queue.
pub fn append(path: &Path, kind: StreamKind, entries: &[QueueEntry]) -> Result<Vec<QueueEntry>> {
    let mut queue = load(path, kind)?;
    if entries.is_empty() {
        return Ok(queue);
    }
    queue.extend_from_slice(entries);
    save(path, &queue)?;
    Ok(queue)
}

/// Remove and return the first entry along with what remains.
pub fn pop_front(path: &Path, kind: StreamKind) -> Result<Option<(QueueEntry, Vec<QueueEntry>)>> {
    let mut queue = load(path, kind)?;
    if queue.is_empty() {
        return Ok(None);
    }
    let front = queue.remove(0);
    save(path, &queue)?;
    Ok(Some((front, queue)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_parse_linked() {
        let content = "2020-01-01;A;https://example.com/a\n\n2020-01-02;B;https://example.com/b?x=1;y=2\n";
        let entries = parse(Path::new("queue.txt"), StreamKind::Linked, content).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "A");
        // URLs may carry the separator
        assert_eq!(
            entries[1].locator.as_deref(),
            Some("https://example.com/b?x=1;y=2")
        );
    }

    #[test]
    fn test_parse_manual_with_and_without_author() {
        let content = "1950-10-16;The Lion, the Witch and the Wardrobe;C. S. Lewis\n1951-01-01;Prince Caspian\n";
        let entries = parse(Path::new("queue.txt"), StreamKind::Manual, content).unwrap();

        assert_eq!(entries[0].locator.as_deref(), Some("C. S. Lewis"));
        assert_eq!(entries[1].locator, None);
        assert_eq!(entries[1].date, date("1951-01-01"));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let content = "2020-01-01;A;https://a\n2020-01-02;missing url\n";
        let err = parse(Path::new("queue.txt"), StreamKind::Linked, content).unwrap_err();
        match err {
            Error::MalformedRecord { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let err = parse(Path::new("q"), StreamKind::Manual, "Jan 1st;Title\n").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
    }

    #[test]
    fn test_serialize_keeps_order() {
        let entries = vec![
            QueueEntry::new(date("2021-01-01"), "Later", None),
            QueueEntry::new(date("1999-01-01"), "Earlier", Some("Someone".into())),
        ];
        assert_eq!(
            serialize(&entries),
            "2021-01-01;Later\n1999-01-01;Earlier;Someone\n"
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = load(&dir.path().join(QUEUE_FILE), StreamKind::Linked).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_append_and_pop_front() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(QUEUE_FILE);
        std::fs::write(&path, "2020-01-01;A;urlA\n").unwrap();

        let queue = append(
            &path,
            StreamKind::Linked,
            &[QueueEntry::new(date("2019-01-01"), "B", Some("urlB".into()))],
        )
        .unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "2020-01-01;A;urlA\n2019-01-01;B;urlB\n"
        );

        let (front, rest) = pop_front(&path, StreamKind::Linked).unwrap().unwrap();
        assert_eq!(front.name, "A");
        assert_eq!(rest.len(), 1);

        let (front, rest) = pop_front(&path, StreamKind::Linked).unwrap().unwrap();
        assert_eq!(front.name, "B");
        assert!(rest.is_empty());

        assert!(pop_front(&path, StreamKind::Linked).unwrap().is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
