use async_trait::async_trait;

/// Calendar feed download seam. Implementations must bound the request
/// with a timeout; a timeout surfaces as an ordinary error here and is
/// treated as a retryable sync failure upstream.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}
