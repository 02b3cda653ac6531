//! Shared HTTP client for feed fetches and media downloads.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::config::Config;
use crate::error::{Error, Result};

/// Thin wrapper around a configured reqwest client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client with a user agent and a timeout.
    ///
    /// The timeout bounds connecting and whole feed fetches. Media bodies
    /// may take longer, so downloads are only bounded while connecting.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Build a client from the `[sync]` section of the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.sync.user_agent,
            Duration::from_secs(config.sync.fetch_timeout_secs),
        )
    }

    /// Make a GET request, turning non-success statuses into errors.
    pub async fn get(&self, url: &str) -> Result<Response> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);

        Ok(response.error_for_status()?)
    }

    /// GET a URL and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.sync.fetch_timeout_secs = 5;

        let client = HttpClient::from_config(&config).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(5));
    }
}
