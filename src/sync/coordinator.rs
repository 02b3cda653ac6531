//! Sync pass over the content root.

use crate::config::Config;
use crate::download::Downloader;
use crate::error::Result;
use crate::feed::FeedSource;
use crate::fs::tree::{Category, CategoryTree, StreamHandle};
use crate::output::progress::create_item_bar;
use crate::stream::engine::StreamEngine;
use crate::stream::merge::MergeOutcome;
use crate::sync::report::{StreamOutcome, StreamStatus, SyncReport};

/// Fetches every stream's feed and merges the results, one stream at a time.
pub struct SyncCoordinator<'a> {
    engine: StreamEngine,
    feeds: &'a dyn FeedSource,
    downloader: &'a dyn Downloader,
    show_progress: bool,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(config: &Config, feeds: &'a dyn FeedSource, downloader: &'a dyn Downloader) -> Self {
        Self {
            engine: StreamEngine::new(config),
            feeds,
            downloader,
            show_progress: config.sync.show_downloads,
        }
    }

    /// Sync every stream of every category.
    pub async fn sync_all(&self, tree: &CategoryTree) -> SyncReport {
        let mut report = SyncReport::default();
        for category in tree.categories() {
            report.extend(self.sync_category(category).await);
        }
        report
    }

    /// Sync the streams of one category. A failing stream is recorded and
    /// the pass moves on.
    pub async fn sync_category(&self, category: &Category) -> SyncReport {
        let mut report = SyncReport::default();
        if category.streams.is_empty() {
            return report;
        }

        tracing::info!(
            "Syncing category {} ({} streams)",
            category.name,
            category.streams.len()
        );

        let bar = self
            .show_progress
            .then(|| create_item_bar(category.streams.len() as u64, &category.name));

        for stream in &category.streams {
            if let Some(bar) = &bar {
                bar.set_message(stream.name.clone());
            }

            let status = match self.sync_stream(stream).await {
                Ok(Some(merge)) => StreamStatus::Merged(merge),
                Ok(None) => StreamStatus::NoFeed,
                Err(e) => {
                    tracing::warn!("Failed to sync {}/{}: {}", stream.category, stream.name, e);
                    StreamStatus::Failed(e)
                }
            };
            report.record(StreamOutcome {
                category: stream.category.clone(),
                stream: stream.name.clone(),
                status,
            });

            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        report
    }

    /// Fetch and merge one stream. `None` when it has no feed.
    async fn sync_stream(&self, stream: &StreamHandle) -> Result<Option<MergeOutcome>> {
        let record = self.engine.load(&stream.dir)?;
        let Some(url) = record.feed_url() else {
            tracing::debug!("{}/{} has no feed", stream.category, stream.name);
            return Ok(None);
        };

        let entries = self.feeds.fetch(url).await?;
        let outcome = self
            .engine
            .merge_feed_results(&stream.dir, &entries, self.downloader)
            .await?;
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::feed::FeedEntry;
    use crate::fs::tree::{create_category, create_stream};
    use crate::stream::item::{parse_date, StreamKind};
    use crate::stream::queue::{self, QUEUE_FILE};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;

    /// Serves canned entries; unknown URLs are unreachable.
    struct FakeFeeds {
        feeds: HashMap<String, Vec<FeedEntry>>,
    }

    #[async_trait]
    impl FeedSource for FakeFeeds {
        async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>> {
            self.feeds
                .get(url)
                .cloned()
                .ok_or_else(|| Error::FeedUnreachable {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                })
        }
    }

    struct NoDownloads;

    #[async_trait]
    impl Downloader for NoDownloads {
        async fn download(&self, url: &str, _dest: &Path) -> Result<()> {
            Err(Error::DownloadFailed {
                item: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.sync.show_downloads = false;
        config
    }

    fn entry(date: &str, title: &str) -> FeedEntry {
        FeedEntry::new(parse_date(date).unwrap(), title)
            .with_link(format!("https://example.com/{}", title))
    }

    fn queue_len(dir: &Path) -> usize {
        queue::load(&dir.join(QUEUE_FILE), StreamKind::Linked)
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn test_unreachable_feed_does_not_stop_the_pass() {
        let root = tempfile::tempdir().unwrap();
        create_category(root.path(), "Shows").unwrap();
        let s1 = create_stream(root.path(), "Shows", "S1", StreamKind::Linked, Some("https://one.example/"))
            .unwrap();
        let s2 = create_stream(root.path(), "Shows", "S2", StreamKind::Linked, Some("https://two.example/"))
            .unwrap();
        let s3 = create_stream(root.path(), "Shows", "S3", StreamKind::Linked, Some("https://three.example/"))
            .unwrap();

        let feeds = FakeFeeds {
            feeds: HashMap::from([
                ("https://one.example/".to_string(), vec![entry("2021-01-01", "a")]),
                (
                    "https://three.example/".to_string(),
                    vec![entry("2021-01-02", "c"), entry("2021-01-01", "b")],
                ),
            ]),
        };

        let config = config();
        let coordinator = SyncCoordinator::new(&config, &feeds, &NoDownloads);
        let tree = CategoryTree::scan(root.path()).unwrap();
        let report = coordinator.sync_all(&tree).await;

        assert_eq!(report.streams_synced, 2);
        assert_eq!(report.streams_failed, 1);
        assert_eq!(report.items_added, 3);
        let (failed, error) = report.failed().next().unwrap();
        assert_eq!(failed.stream, "S2");
        assert!(matches!(error, Error::FeedUnreachable { .. }));

        assert_eq!(queue_len(&s1.dir), 1);
        assert_eq!(queue_len(&s2.dir), 0);
        assert_eq!(queue_len(&s3.dir), 2);
    }

    #[test]
    fn test_streams_without_feed_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        create_category(root.path(), "Books").unwrap();
        create_stream(root.path(), "Books", "Shelf", StreamKind::Manual, None).unwrap();
        // A directory without info.txt is reported, not fatal
        std::fs::create_dir(root.path().join("Books/Loose")).unwrap();

        let feeds = FakeFeeds {
            feeds: HashMap::new(),
        };
        let config = config();
        let coordinator = SyncCoordinator::new(&config, &feeds, &NoDownloads);
        let tree = CategoryTree::scan(root.path()).unwrap();
        let report = tokio_test::block_on(coordinator.sync_category(tree.category("Books").unwrap()));

        assert_eq!(report.streams_skipped, 1);
        assert_eq!(report.streams_failed, 1);
        assert!(matches!(
            report.failed().next().unwrap().1,
            Error::MissingInfoFile(_)
        ));
    }
}
