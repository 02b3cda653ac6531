//! Item and file name generation and parsing.

use std::cmp::Ordering;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use url::Url;

use crate::error::{Error, Result};
use crate::stream::item::{format_date, parse_date, StreamKind};

/// Field separator in queue records and media file names.
pub const FIELD_SEPARATOR: char = ';';

/// Extension used when none can be worked out.
const FALLBACK_EXTENSION: &str = "bin";

/// Longest extension we take from a URL path.
const MAX_EXTENSION_LEN: usize = 5;

fn media_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2});(.+)\.([A-Za-z0-9]+)$").expect("media file pattern")
    })
}

/// A media file of a downloaded stream, split into its parts.
///
/// Files order by their full name, so same-day releases keep the order a
/// directory listing sorted by name shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFileName {
    pub date: NaiveDate,
    pub name: String,
    pub extension: String,
}

impl MediaFileName {
    /// Parse `date;name.extension`. Returns `None` for anything else.
    pub fn parse(file_name: &str) -> Option<Self> {
        if file_name.starts_with('.') {
            return None;
        }
        let captures = media_file_pattern().captures(file_name)?;
        Some(Self {
            date: parse_date(captures.get(1)?.as_str())?,
            name: captures.get(2)?.as_str().to_string(),
            extension: captures.get(3)?.as_str().to_string(),
        })
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}{}{}.{}",
            format_date(self.date),
            FIELD_SEPARATOR,
            self.name,
            self.extension
        )
    }
}

impl Ord for MediaFileName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file_name().cmp(&other.file_name())
    }
}

impl PartialOrd for MediaFileName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Make a feed title safe to store for a stream of `kind`.
///
/// Queue records only need the separator and line breaks replaced. Media
/// file names additionally lose path separators and characters that are
/// invalid on common filesystems.
pub fn sanitize_item_name(kind: StreamKind, title: &str) -> String {
    let sanitized: String = title
        .trim()
        .chars()
        .map(|c| match c {
            FIELD_SEPARATOR => '_',
            c if c.is_control() => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'
                if kind == StreamKind::Downloaded =>
            {
                '_'
            }
            c => c,
        })
        .collect();

    if kind == StreamKind::Downloaded {
        // A leading dot would hide the file from the scanner
        let sanitized = match sanitized.strip_prefix('.') {
            Some(rest) => format!("_{}", rest),
            None => sanitized,
        };
        if sanitized.is_empty() {
            return "untitled".to_string();
        }
        return sanitized;
    }

    sanitized
}

/// Validate a category or stream directory name.
pub fn sanitize_path_component(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::InvalidName("name cannot be empty".to_string()));
    }

    if name == "." || name.contains("..") {
        return Err(Error::InvalidName(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(Error::InvalidName(format!(
            "Path separators not allowed in name: '{}'",
            name
        )));
    }

    if name.starts_with('.') {
        return Err(Error::InvalidName(format!(
            "Hidden names are not allowed: '{}'",
            name
        )));
    }

    Ok(name.to_string())
}

/// Pick the extension for a downloaded file.
///
/// The URL path wins; the enclosure MIME type is the fallback.
pub fn extension_for_download(url: &str, mime_type: Option<&str>) -> String {
    if let Some(ext) = extension_from_url(url) {
        return ext;
    }

    mime_type
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;

    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    Some(ext.to_string())
}

/// Hidden name for an in-progress download in the stream directory.
pub fn temp_download_name() -> String {
    format!(".{}.part", uuid::Uuid::new_v4())
}
