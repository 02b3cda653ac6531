//! Feed retrieval.

use async_trait::async_trait;
use url::Url;

use crate::api::HttpClient;
use crate::error::{Error, Result};
use crate::feed::parser::parse_feed;
use crate::feed::types::FeedEntry;

/// Something that can turn a feed URL into entries.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse a feed. Fails with [`Error::FeedUnreachable`].
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>>;
}

/// Reads feeds over HTTP(S), or from disk for `file://` URLs.
pub struct HttpFeedSource {
    client: HttpClient,
}

impl HttpFeedSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    async fn read(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)?;

        if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|_| Error::Config(format!("Not a local path: {}", url)))?;
            return Ok(tokio::fs::read_to_string(path).await?);
        }

        self.client.get_text(url).await
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let unreachable = |reason: String| Error::FeedUnreachable {
            url: url.to_string(),
            reason,
        };

        let body = self.read(url).await.map_err(|e| unreachable(e.to_string()))?;
        let entries = parse_feed(&body).map_err(unreachable)?;

        tracing::debug!("Fetched {} entries from {}", entries.len(), url);
        Ok(entries)
    }
}
