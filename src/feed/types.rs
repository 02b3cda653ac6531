//! Feed entry types.

use chrono::NaiveDate;
use serde::Serialize;

/// Media attached to a feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: Option<String>,
}

/// One entry of a fetched feed, in the order the feed lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    /// Publication date in UTC.
    pub date: NaiveDate,
    pub title: String,
    /// Page the entry points at.
    pub link: Option<String>,
    pub enclosure: Option<Enclosure>,
    pub author: Option<String>,
}

impl FeedEntry {
    pub fn new(date: NaiveDate, title: impl Into<String>) -> Self {
        Self {
            date,
            title: title.into(),
            link: None,
            enclosure: None,
            author: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_enclosure(mut self, url: impl Into<String>, mime_type: Option<&str>) -> Self {
        self.enclosure = Some(Enclosure {
            url: url.into(),
            mime_type: mime_type.map(str::to_string),
        });
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// URL a linked stream should open: the page link, else the media itself.
    pub fn open_url(&self) -> Option<&str> {
        self.link
            .as_deref()
            .or_else(|| self.enclosure.as_ref().map(|e| e.url.as_str()))
    }
}
