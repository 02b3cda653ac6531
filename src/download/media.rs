//! Media file downloading.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::api::HttpClient;
use crate::error::{Error, Result};
use crate::output::progress::create_download_bar;

/// Minimum file size to show progress bar (20 MB).
const PROGRESS_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Something that can fetch a URL into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Write the body of `url` to `dest`, creating or truncating it.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Streams HTTP responses to disk.
pub struct HttpDownloader {
    client: HttpClient,
    show_progress: bool,
}

impl HttpDownloader {
    pub fn new(client: HttpClient, show_progress: bool) -> Self {
        Self {
            client,
            show_progress,
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.client.get(url).await?;

        let content_length = response.content_length();
        let show_progress =
            self.show_progress && content_length.map(|l| l > PROGRESS_THRESHOLD).unwrap_or(false);

        let progress = show_progress.then(|| create_download_bar(content_length.unwrap_or(0)));

        // Stream to file
        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::DownloadFailed {
                item: url.to_string(),
                reason: format!("Stream error: {}", e),
            })?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(ref pb) = progress {
                pb.set_position(downloaded);
            }
        }

        file.flush().await?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        tracing::debug!("Downloaded {} bytes from {}", downloaded, url);
        Ok(())
    }
}
