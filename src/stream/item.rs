//! Item, stream kind and cursor representation.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

/// Date format used in every state file and media file name.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date line of a stream that has not been started.
pub const NOT_STARTED_DATE: &str = "1000-01-01";

/// Date line of a stream whose known items have all been consumed.
pub const EXHAUSTED_DATE: &str = "9000-01-01";

/// Parse a `YYYY-MM-DD` date, rejecting anything not in canonical form.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Format a date the way state files store it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// How a stream's items reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Media files stored in the stream directory.
    Downloaded,
    /// Externally hosted items opened by URL.
    Linked,
    /// Physically owned items tracked by hand.
    Manual,
}

impl StreamKind {
    /// The tag written on the first line of `info.txt`.
    pub fn tag(&self) -> &'static str {
        match self {
            StreamKind::Downloaded => "downloaded",
            StreamKind::Linked => "linked",
            StreamKind::Manual => "manual",
        }
    }

    /// Whether the stream keeps its pending items in `queue.txt`.
    pub fn uses_queue(&self) -> bool {
        !matches!(self, StreamKind::Downloaded)
    }

    /// Whether the stream can be fed from a feed URL.
    pub fn accepts_feed(&self) -> bool {
        !matches!(self, StreamKind::Manual)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for StreamKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "downloaded" => Ok(StreamKind::Downloaded),
            "linked" => Ok(StreamKind::Linked),
            "manual" => Ok(StreamKind::Manual),
            _ => Err(format!("Unknown stream type: {}", s)),
        }
    }
}

/// Where an item can be found. The variant always matches the stream kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Locator {
    /// File extension, without the leading dot.
    Extension(String),
    Url(String),
    Author(String),
}

impl Locator {
    /// Build the locator variant a stream of `kind` uses.
    pub fn for_kind(kind: StreamKind, value: impl Into<String>) -> Self {
        let value = value.into();
        match kind {
            StreamKind::Downloaded => Locator::Extension(value),
            StreamKind::Linked => Locator::Url(value),
            StreamKind::Manual => Locator::Author(value),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locator::Extension(s) | Locator::Url(s) | Locator::Author(s) => s,
        }
    }
}

/// A single piece of media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub date: NaiveDate,
    pub name: String,
    pub locator: Locator,
    /// Free-form position marker such as `1:23:45`. Never set for manual items.
    pub progress: Option<String>,
}

impl Item {
    pub fn new(date: NaiveDate, name: impl Into<String>, locator: Locator) -> Self {
        Self {
            date,
            name: name.into(),
            locator,
            progress: None,
        }
    }

    /// Media file name for downloaded items: `date;name.extension`.
    pub fn file_name(&self) -> Option<String> {
        match &self.locator {
            Locator::Extension(ext) => Some(format!(
                "{};{}.{}",
                format_date(self.date),
                self.name,
                ext
            )),
            _ => None,
        }
    }

    /// Remember this item once it has been consumed.
    pub fn mark(&self) -> Mark {
        Mark {
            date: Some(self.date),
            name: self.name.clone(),
            locator: self.locator.as_str().to_string(),
        }
    }
}

/// The last consumed item of an exhausted stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mark {
    /// Unknown for manual streams, whose layout has nowhere to keep it.
    pub date: Option<NaiveDate>,
    pub name: String,
    pub locator: String,
}

/// Position of a stream within its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "item", rename_all = "snake_case")]
pub enum Cursor {
    NotStarted,
    At(Item),
    Exhausted(Mark),
}

impl Cursor {
    /// True when there is no current item.
    pub fn is_empty(&self) -> bool {
        !matches!(self, Cursor::At(_))
    }

    pub fn current(&self) -> Option<&Item> {
        match self {
            Cursor::At(item) => Some(item),
            _ => None,
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut Item> {
        match self {
            Cursor::At(item) => Some(item),
            _ => None,
        }
    }

    /// The `(date, name)` of the last item the cursor has reached, if known.
    pub fn position(&self) -> Option<(NaiveDate, &str)> {
        match self {
            Cursor::NotStarted => None,
            Cursor::At(item) => Some((item.date, item.name.as_str())),
            Cursor::Exhausted(mark) => mark.date.map(|date| (date, mark.name.as_str())),
        }
    }

    /// Date used to order streams against each other. Fresh streams sort
    /// first and exhausted ones last.
    pub fn sort_date(&self) -> NaiveDate {
        match self {
            Cursor::NotStarted => parse_date(NOT_STARTED_DATE).unwrap_or(NaiveDate::MIN),
            Cursor::At(item) => item.date,
            Cursor::Exhausted(_) => parse_date(EXHAUSTED_DATE).unwrap_or(NaiveDate::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_parse_date_is_strict() {
        assert!(parse_date("2021-03-01").is_some());
        assert!(parse_date("2021-3-1").is_none());
        assert!(parse_date("2021-02-30").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_sentinel_dates_format_back() {
        assert_eq!(format_date(date(NOT_STARTED_DATE)), NOT_STARTED_DATE);
        assert_eq!(format_date(date(EXHAUSTED_DATE)), EXHAUSTED_DATE);
    }

    #[test]
    fn test_stream_kind_tags() {
        for kind in [StreamKind::Downloaded, StreamKind::Linked, StreamKind::Manual] {
            assert_eq!(kind.tag().parse::<StreamKind>().unwrap(), kind);
        }
        assert!("podcast".parse::<StreamKind>().is_err());
    }

    #[test]
    fn test_file_name_only_for_downloaded() {
        let item = Item::new(
            date("2021-03-01"),
            "Episode 4",
            Locator::Extension("mp3".into()),
        );
        assert_eq!(item.file_name().unwrap(), "2021-03-01;Episode 4.mp3");

        let linked = Item::new(date("2021-03-01"), "Video", Locator::Url("https://x".into()));
        assert!(linked.file_name().is_none());
    }

    #[test]
    fn test_cursor_ordering_dates() {
        let item = Item::new(date("2020-05-05"), "A", Locator::Author("Me".into()));
        let at = Cursor::At(item.clone());
        let done = Cursor::Exhausted(item.mark());

        assert!(Cursor::NotStarted.sort_date() < at.sort_date());
        assert!(at.sort_date() < done.sort_date());
        assert_eq!(done.position(), Some((date("2020-05-05"), "A")));
        assert!(done.is_empty());
        assert!(!at.is_empty());
    }
}
