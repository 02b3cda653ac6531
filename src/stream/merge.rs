//! Merging fetched feed entries into a stream.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::feed::{Enclosure, FeedEntry};
use crate::fs::naming::{extension_for_download, sanitize_item_name, temp_download_name, MediaFileName};
use crate::stream::engine::StreamEngine;
use crate::stream::files::{cursor_file, scan_media_files};
use crate::stream::info::{self, StreamRecord};
use crate::stream::item::{Cursor, Item, StreamKind};
use crate::stream::queue::{self, QueueEntry, QUEUE_FILE};

/// Something about a merge worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// The feed has the watermark's name under another date.
    NameDateCollision {
        name: String,
        local_date: NaiveDate,
        feed_date: NaiveDate,
    },
    /// A linked entry has nothing to open.
    MissingLink { name: String, date: NaiveDate },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::NameDateCollision {
                name,
                local_date,
                feed_date,
            } => write!(
                f,
                "'{}' is stored as {} but the feed dates it {}; not added",
                name, local_date, feed_date
            ),
            Anomaly::MissingLink { name, date } => {
                write!(f, "'{}' ({}) has no link; not added", name, date)
            }
        }
    }
}

/// What a merge did to one stream.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Items added to the queue or downloaded.
    pub added: usize,
    /// Items dropped because of the item cap.
    pub discarded: usize,
    /// Per-item download failures.
    pub failures: Vec<Error>,
    pub anomalies: Vec<Anomaly>,
    /// Set when an exhausted stream moved to a newly added item.
    pub resumed: Option<Item>,
}

/// A fetched entry with the name it would be stored under.
struct Candidate<'a> {
    date: NaiveDate,
    name: String,
    entry: &'a FeedEntry,
}

type Key = (NaiveDate, String);

/// Feed entries in chronological order.
///
/// Feeds usually list newest first, so the list is reversed before a stable
/// sort by date; entries sharing a day keep their reversed feed order.
fn chronological(kind: StreamKind, entries: &[FeedEntry]) -> Vec<Candidate<'_>> {
    let mut candidates: Vec<Candidate<'_>> = entries
        .iter()
        .rev()
        .map(|entry| Candidate {
            date: entry.date,
            name: sanitize_item_name(kind, &entry.title),
            entry,
        })
        .collect();
    candidates.sort_by_key(|c| c.date);
    candidates
}

/// Pick the candidates that are genuinely new.
///
/// An exact `(date, name)` match of the watermark is authoritative: only what
/// follows it is new. Without one, entries dated after the watermark are new,
/// as are same-day entries not already stored. An entry carrying the
/// watermark's name under another date is reported instead of guessed at.
fn select_new<'a>(
    candidates: Vec<Candidate<'a>>,
    watermark: Option<&Key>,
    known: &HashSet<Key>,
    anomalies: &mut Vec<Anomaly>,
) -> Vec<Candidate<'a>> {
    let exact = watermark.and_then(|(date, name)| {
        candidates
            .iter()
            .rposition(|c| c.date == *date && c.name == *name)
    });

    let mut seen: HashSet<Key> = HashSet::new();
    let mut selected = Vec::new();

    for (index, candidate) in candidates.into_iter().enumerate() {
        let key = (candidate.date, candidate.name.clone());
        if known.contains(&key) || !seen.insert(key) {
            continue;
        }

        let is_new = match (watermark, exact) {
            (None, _) => true,
            (Some(_), Some(position)) => index > position,
            (Some((date, name)), None) => {
                if candidate.name == *name {
                    anomalies.push(Anomaly::NameDateCollision {
                        name: name.clone(),
                        local_date: *date,
                        feed_date: candidate.date,
                    });
                    false
                } else {
                    candidate.date >= *date
                }
            }
        };

        if is_new {
            selected.push(candidate);
        }
    }

    selected
}

fn cursor_key(cursor: &Cursor) -> Option<Key> {
    cursor.position().map(|(date, name)| (date, name.to_string()))
}

impl StreamEngine {
    /// Merge fetched entries into the stream at `stream_dir`.
    ///
    /// Linked and manual streams get new entries appended to `queue.txt`;
    /// downloaded streams get new media files. Pre-existing queue order is
    /// never changed and repeated merges of the same entries add nothing.
    pub async fn merge_feed_results(
        &self,
        stream_dir: &Path,
        entries: &[FeedEntry],
        downloader: &dyn Downloader,
    ) -> Result<MergeOutcome> {
        let record = info::load(stream_dir)?;
        let kind = record.kind();
        let candidates = chronological(kind, entries);
        let mut outcome = MergeOutcome::default();

        match kind {
            StreamKind::Linked | StreamKind::Manual => {
                self.merge_into_queue(stream_dir, &record, candidates, &mut outcome)?;
            }
            StreamKind::Downloaded => {
                self.merge_into_files(stream_dir, &record, candidates, downloader, &mut outcome)
                    .await?;
            }
        }

        if outcome.added > 0 && matches!(record.cursor(), Cursor::Exhausted(_)) {
            outcome.resumed = self.advance(stream_dir)?.current;
        }

        for anomaly in &outcome.anomalies {
            tracing::warn!("{}: {}", stream_dir.display(), anomaly);
        }
        tracing::info!(
            "{}: {} new, {} discarded, {} failed",
            stream_dir.display(),
            outcome.added,
            outcome.discarded,
            outcome.failures.len()
        );

        Ok(outcome)
    }

    fn merge_into_queue(
        &self,
        stream_dir: &Path,
        record: &StreamRecord,
        candidates: Vec<Candidate<'_>>,
        outcome: &mut MergeOutcome,
    ) -> Result<()> {
        let kind = record.kind();
        let path = stream_dir.join(QUEUE_FILE);
        let mut queue = queue::load(&path, kind)?;

        let watermark = queue
            .last()
            .map(|e| (e.date, e.name.clone()))
            .or_else(|| cursor_key(record.cursor()));
        let mut known: HashSet<Key> = queue.iter().map(|e| (e.date, e.name.clone())).collect();
        known.extend(cursor_key(record.cursor()));

        let selected = select_new(candidates, watermark.as_ref(), &known, &mut outcome.anomalies);

        let mut new_entries = Vec::with_capacity(selected.len());
        for candidate in selected {
            let locator = match kind {
                StreamKind::Linked => match candidate.entry.open_url() {
                    Some(url) => Some(url.to_string()),
                    None => {
                        outcome.anomalies.push(Anomaly::MissingLink {
                            name: candidate.name,
                            date: candidate.date,
                        });
                        continue;
                    }
                },
                _ => candidate
                    .entry
                    .author
                    .as_deref()
                    .map(|a| a.replace(['\r', '\n'], " ")),
            };
            new_entries.push(QueueEntry::new(candidate.date, candidate.name, locator));
        }

        outcome.added = new_entries.len();

        // The cap also applies to queues that were already over it
        if queue.len() + new_entries.len() <= self.item_limit {
            queue::append(&path, kind, &new_entries)?;
            return Ok(());
        }

        queue.extend(new_entries);
        let excess = queue.len() - self.item_limit;
        queue.drain(..excess);
        outcome.discarded = excess;
        tracing::info!(
            "{}: item limit {} reached, dropped {} oldest entries",
            stream_dir.display(),
            self.item_limit,
            excess
        );
        queue::save(&path, &queue)
    }

    async fn merge_into_files(
        &self,
        stream_dir: &Path,
        record: &StreamRecord,
        candidates: Vec<Candidate<'_>>,
        downloader: &dyn Downloader,
        outcome: &mut MergeOutcome,
    ) -> Result<()> {
        let files = scan_media_files(stream_dir)?;

        let watermark = files
            .last()
            .cloned()
            .max(cursor_file(record.cursor()))
            .map(|f| (f.date, f.name));
        let mut known: HashSet<Key> = files.iter().map(|f| (f.date, f.name.clone())).collect();
        known.extend(cursor_key(record.cursor()));

        let mut selected =
            select_new(candidates, watermark.as_ref(), &known, &mut outcome.anomalies);

        // Pull the oldest new items first, up to the cap
        let capacity = self.item_limit.saturating_sub(files.len());
        if selected.len() > capacity {
            outcome.discarded = selected.len() - capacity;
            selected.truncate(capacity);
            tracing::info!(
                "{}: item limit {} reached, skipping {} new items",
                stream_dir.display(),
                self.item_limit,
                outcome.discarded
            );
        }

        let total = selected.len();
        let mut failures = 0u32;
        for (index, candidate) in selected.into_iter().enumerate() {
            tracing::info!(
                "Downloading '{}' ({}/{})",
                candidate.name,
                index + 1,
                total
            );

            match download_candidate(stream_dir, &candidate, downloader).await {
                Ok(file) => {
                    tracing::debug!("Saved {}", file.file_name());
                    outcome.added += 1;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    outcome.failures.push(e);
                    failures += 1;
                    if failures >= self.max_download_failures {
                        tracing::warn!(
                            "{}: giving up after {} failed downloads",
                            stream_dir.display(),
                            failures
                        );
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Download one entry into the stream directory under its final name.
///
/// The body goes to a hidden temp file first and is renamed into place, so
/// an interrupted download never shows up as an item.
async fn download_candidate(
    stream_dir: &Path,
    candidate: &Candidate<'_>,
    downloader: &dyn Downloader,
) -> Result<MediaFileName> {
    let failed = |reason: String| Error::DownloadFailed {
        item: candidate.name.clone(),
        reason,
    };

    let Some(Enclosure { url, mime_type }) = candidate.entry.enclosure.as_ref() else {
        return Err(failed("entry has no media enclosure".to_string()));
    };

    let file = MediaFileName {
        date: candidate.date,
        name: candidate.name.clone(),
        extension: extension_for_download(url, mime_type.as_deref()),
    };
    let final_path = stream_dir.join(file.file_name());
    let temp_path = stream_dir.join(temp_download_name());

    if let Err(e) = downloader.download(url, &temp_path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(failed(e.to_string()));
    }

    tokio::fs::rename(&temp_path, &final_path)
        .await
        .map_err(|e| failed(e.to_string()))?;

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::item::parse_date;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn engine() -> StreamEngine {
        StreamEngine::with_limits(1_000_000, 3)
    }

    fn stream(kind: StreamKind) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        info::save(dir.path(), &StreamRecord::new(kind, Some("https://f".into()))).unwrap();
        dir
    }

    fn linked(d: &str, title: &str) -> FeedEntry {
        FeedEntry::new(date(d), title).with_link(format!("https://example.com/{}", title))
    }

    fn podcast(d: &str, title: &str) -> FeedEntry {
        FeedEntry::new(date(d), title)
            .with_enclosure(format!("https://cdn.example.com/{}.mp3", title), None)
    }

    fn queue_names(dir: &Path) -> Vec<String> {
        queue::load(&dir.join(QUEUE_FILE), StreamKind::Linked)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    /// Writes the URL as the file body; fails for URLs containing "broken".
    #[derive(Default)]
    struct FakeDownloader {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, url: &str, dest: &Path) -> Result<()> {
            self.requested.lock().unwrap().push(url.to_string());
            if url.contains("broken") {
                return Err(Error::DownloadFailed {
                    item: url.to_string(),
                    reason: "HTTP 404".to_string(),
                });
            }
            fs::write(dest, url)?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_newest_first_feed_is_appended_oldest_first() {
        let dir = stream(StreamKind::Linked);
        let entries = vec![linked("2021-03-01", "X"), linked("2021-02-01", "Y")];

        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(queue_names(dir.path()), vec!["Y", "X"]);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let dir = stream(StreamKind::Linked);
        let entries = vec![
            linked("2021-03-02", "C"),
            linked("2021-03-01", "B"),
            linked("2021-03-01", "A"),
        ];
        let downloader = FakeDownloader::default();

        engine()
            .merge_feed_results(dir.path(), &entries, &downloader)
            .await
            .unwrap();
        let second = engine()
            .merge_feed_results(dir.path(), &entries, &downloader)
            .await
            .unwrap();

        assert_eq!(second.added, 0);
        assert_eq!(queue_names(dir.path()), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_merge_preserves_hand_edited_order() {
        let dir = stream(StreamKind::Linked);
        fs::write(
            dir.path().join(QUEUE_FILE),
            "2021-01-05;Later first;https://l\n2021-01-01;Earlier second;https://e\n",
        )
        .unwrap();

        // The last line is the watermark
        let entries = vec![
            linked("2021-01-10", "New"),
            linked("2021-01-05", "Later first"),
            linked("2021-01-01", "Earlier second"),
        ];
        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(
            queue_names(dir.path()),
            vec!["Later first", "Earlier second", "New"]
        );
    }

    #[tokio::test]
    async fn test_same_day_releases_matched_by_name() {
        let dir = stream(StreamKind::Linked);
        fs::write(dir.path().join(QUEUE_FILE), "2021-03-01;Part 1;https://p1\n").unwrap();

        let entries = vec![linked("2021-03-01", "Part 2"), linked("2021-03-01", "Part 1")];
        engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(queue_names(dir.path()), vec!["Part 1", "Part 2"]);
    }

    #[tokio::test]
    async fn test_watermark_from_current_item_when_queue_empty() {
        let dir = stream(StreamKind::Linked);
        fs::write(dir.path().join(QUEUE_FILE), "2021-02-01;B;https://b\n").unwrap();
        engine().advance(dir.path()).unwrap();

        let entries = vec![
            linked("2021-03-01", "C"),
            linked("2021-02-01", "B"),
            linked("2021-01-01", "A"),
        ];
        engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(queue_names(dir.path()), vec!["C"]);
    }

    #[tokio::test]
    async fn test_name_date_collision_is_reported() {
        let dir = stream(StreamKind::Linked);
        fs::write(dir.path().join(QUEUE_FILE), "2021-02-01;Pilot;https://p\n").unwrap();

        let entries = vec![linked("2021-03-01", "Next"), linked("2021-02-03", "Pilot")];
        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.added, 1);
        assert!(matches!(
            outcome.anomalies.as_slice(),
            [Anomaly::NameDateCollision { name, .. }] if name == "Pilot"
        ));
        assert_eq!(queue_names(dir.path()), vec!["Pilot", "Next"]);
    }

    #[tokio::test]
    async fn test_names_are_sanitized() {
        let dir = stream(StreamKind::Linked);
        let entries = vec![linked("2021-03-01", "Q&A; part 1")];
        engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(queue_names(dir.path()), vec!["Q&A_ part 1"]);

        // Matching uses the sanitized name, so a re-merge adds nothing
        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();
        assert_eq!(outcome.added, 0);
    }

    #[tokio::test]
    async fn test_queue_cap_drops_oldest() {
        let dir = stream(StreamKind::Linked);
        fs::write(dir.path().join(QUEUE_FILE), "2021-01-01;Old;https://o\n").unwrap();

        let entries = vec![
            linked("2021-01-04", "D"),
            linked("2021-01-03", "C"),
            linked("2021-01-02", "B"),
        ];
        let outcome = StreamEngine::with_limits(2, 3)
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.discarded, 2);
        assert_eq!(queue_names(dir.path()), vec!["C", "D"]);
    }

    #[tokio::test]
    async fn test_queue_cap_applies_without_new_entries() {
        let dir = stream(StreamKind::Linked);
        fs::write(
            dir.path().join(QUEUE_FILE),
            "2021-01-01;A;https://a\n2021-01-02;B;https://b\n2021-01-03;C;https://c\n",
        )
        .unwrap();

        let entries = vec![linked("2021-01-03", "C")];
        let outcome = StreamEngine::with_limits(2, 3)
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.discarded, 1);
        assert_eq!(queue_names(dir.path()), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_manual_merge_uses_author() {
        let dir = stream(StreamKind::Manual);
        let entries = vec![FeedEntry::new(date("2021-03-01"), "Book").with_author("Writer")];
        engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        let queue = queue::load(&dir.path().join(QUEUE_FILE), StreamKind::Manual).unwrap();
        assert_eq!(queue[0].locator.as_deref(), Some("Writer"));
    }

    #[tokio::test]
    async fn test_linked_entry_without_link() {
        let dir = stream(StreamKind::Linked);
        let entries = vec![FeedEntry::new(date("2021-03-01"), "Nowhere")];
        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.added, 0);
        assert!(matches!(
            outcome.anomalies.as_slice(),
            [Anomaly::MissingLink { .. }]
        ));
    }

    #[tokio::test]
    async fn test_downloads_new_files() {
        let dir = stream(StreamKind::Downloaded);
        fs::write(dir.path().join("2021-03-01;Ep 1.mp3"), b"x").unwrap();

        let entries = vec![
            podcast("2021-03-03", "Ep 3"),
            podcast("2021-03-02", "Ep 2"),
            podcast("2021-03-01", "Ep 1"),
        ];
        let downloader = FakeDownloader::default();
        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &downloader)
            .await
            .unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(
            *downloader.requested.lock().unwrap(),
            vec![
                "https://cdn.example.com/Ep 2.mp3".to_string(),
                "https://cdn.example.com/Ep 3.mp3".to_string()
            ]
        );
        let names: Vec<_> = scan_media_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.file_name())
            .collect();
        assert_eq!(
            names,
            vec!["2021-03-01;Ep 1.mp3", "2021-03-02;Ep 2.mp3", "2021-03-03;Ep 3.mp3"]
        );

        // Nothing new the second time
        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &downloader)
            .await
            .unwrap();
        assert_eq!(outcome.added, 0);
    }

    #[tokio::test]
    async fn test_download_failures_are_per_item() {
        let dir = stream(StreamKind::Downloaded);
        let entries = vec![
            podcast("2021-03-03", "Ep 3"),
            podcast("2021-03-02", "broken"),
            podcast("2021-03-01", "Ep 1"),
        ];

        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.added, 2);
        assert!(matches!(
            outcome.failures.as_slice(),
            [Error::DownloadFailed { item, .. }] if item == "broken"
        ));
        // No partial or temp files left behind
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_download_gives_up_after_max_failures() {
        let dir = stream(StreamKind::Downloaded);
        let entries = vec![
            podcast("2021-03-04", "Ep 4"),
            podcast("2021-03-03", "broken 3"),
            podcast("2021-03-02", "broken 2"),
            podcast("2021-03-01", "broken 1"),
        ];

        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 3);
        assert_eq!(outcome.added, 0);
    }

    #[tokio::test]
    async fn test_download_cap_bounds_new_files() {
        let dir = stream(StreamKind::Downloaded);
        fs::write(dir.path().join("2021-03-01;Ep 1.mp3"), b"x").unwrap();

        let entries = vec![
            podcast("2021-03-04", "Ep 4"),
            podcast("2021-03-03", "Ep 3"),
            podcast("2021-03-02", "Ep 2"),
        ];
        let outcome = StreamEngine::with_limits(2, 3)
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.discarded, 2);
        let files = scan_media_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].name, "Ep 2");
    }

    #[tokio::test]
    async fn test_exhausted_stream_resumes_after_merge() {
        let dir = stream(StreamKind::Downloaded);
        fs::write(dir.path().join("2021-03-01;Ep 1.mp3"), b"x").unwrap();
        engine().advance(dir.path()).unwrap();
        // Consume Ep 1 and delete it
        engine().advance(dir.path()).unwrap();
        fs::remove_file(dir.path().join("2021-03-01;Ep 1.mp3")).unwrap();

        let entries = vec![podcast("2021-03-02", "Ep 2"), podcast("2021-03-01", "Ep 1")];
        let outcome = engine()
            .merge_feed_results(dir.path(), &entries, &FakeDownloader::default())
            .await
            .unwrap();

        // The consumed episode is not fetched again
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.resumed.unwrap().name, "Ep 2");
        let record = info::load(dir.path()).unwrap();
        assert_eq!(record.cursor().current().unwrap().name, "Ep 2");
    }
}
