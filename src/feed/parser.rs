//! RSS 2.0 and Atom parsing.

use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::feed::types::{Enclosure, FeedEntry};

/// Fields collected while inside an `<item>` or `<entry>`.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    dc_date: Option<String>,
    link: Option<String>,
    enclosure: Option<Enclosure>,
    author: Option<String>,
}

impl RawEntry {
    fn on_text(&mut self, element: &str, parent: Option<&str>, text: &str) {
        if text.is_empty() {
            return;
        }
        let in_entry = matches!(parent, Some("item") | Some("entry"));
        let text = Some(text.to_string());

        match element {
            "title" if in_entry => self.title = text,
            "pubDate" => self.pub_date = text,
            "published" => self.published = text,
            "updated" => self.updated = text,
            "date" => self.dc_date = text,
            "link" if in_entry => self.link = text,
            "author" if in_entry => self.author = text,
            "creator" if self.author.is_none() => self.author = text,
            "name" if parent == Some("author") => self.author = text,
            _ => {}
        }
    }

    fn on_attributes(&mut self, element: &str, e: &BytesStart) -> Result<(), String> {
        match element {
            "enclosure" => {
                let url = attribute(e, "url")?;
                if let Some(url) = url {
                    self.enclosure = Some(Enclosure {
                        url,
                        mime_type: attribute(e, "type")?,
                    });
                }
            }
            "link" => {
                let Some(href) = attribute(e, "href")? else {
                    return Ok(());
                };
                let rel = attribute(e, "rel")?.unwrap_or_else(|| "alternate".to_string());
                match rel.as_str() {
                    "enclosure" => {
                        self.enclosure = Some(Enclosure {
                            url: href,
                            mime_type: attribute(e, "type")?,
                        });
                    }
                    "alternate" if self.link.is_none() => self.link = Some(href),
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Finish the entry. Entries without a usable date are dropped.
    fn finish(self) -> Option<FeedEntry> {
        let date = self
            .pub_date
            .as_deref()
            .and_then(parse_rfc2822)
            .or_else(|| self.published.as_deref().and_then(parse_rfc3339))
            .or_else(|| self.updated.as_deref().and_then(parse_rfc3339))
            .or_else(|| self.dc_date.as_deref().and_then(parse_rfc3339));

        let Some(date) = date else {
            tracing::warn!(
                "Skipping feed entry without a usable date: {}",
                self.title.as_deref().unwrap_or("untitled")
            );
            return None;
        };

        Some(FeedEntry {
            date,
            title: self.title.unwrap_or_default(),
            link: self.link,
            enclosure: self.enclosure,
            author: self.author,
        })
    }
}

fn parse_rfc2822(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc2822(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

fn parse_rfc3339(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart, key: &str) -> Result<Option<String>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn is_entry(name: &str) -> bool {
    name == "item" || name == "entry"
}

/// Parse an RSS or Atom document into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<RawEntry> = None;
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if is_entry(&name) {
                    current = Some(RawEntry::default());
                } else if let Some(entry) = current.as_mut() {
                    entry.on_attributes(&name, &e)?;
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                if let Some(entry) = current.as_mut() {
                    entry.on_attributes(&local_name(&e), &e)?;
                }
            }
            Ok(Event::Text(t)) => {
                let unescaped = t.unescape().map_err(|err| err.to_string())?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(c)) => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(_)) => {
                let name = path.pop().unwrap_or_default();
                if is_entry(&name) {
                    if let Some(entry) = current.take().and_then(RawEntry::finish) {
                        entries.push(entry);
                    }
                } else if let Some(entry) = current.as_mut() {
                    let parent = path.last().map(String::as_str);
                    entry.on_text(&name, parent, text.trim());
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    Ok(entries)
}
