use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use veranda_core::FeedFetcher;

/// HTTP feed downloader with a hard request timeout. A timed-out or
/// failed download surfaces as an ordinary error and counts as one
/// sync failure upstream.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        debug!(url, bytes = body.len(), "Feed downloaded");
        Ok(body)
    }
}
