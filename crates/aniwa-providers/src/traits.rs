//! Collaborator traits — the seams the episode scheduler talks through.
//!
//! Production code uses the HTTP implementations in this crate; tests plug in
//! in-memory fakes.

use async_trait::async_trait;

use crate::jikan::AnimeInfo;
use crate::ProviderError;

/// Anime metadata search.
#[async_trait]
pub trait AnimeSearch: Send + Sync {
    /// Search by title. Results are ordered by relevance, best match first.
    async fn search(&self, query: &str) -> Result<Vec<AnimeInfo>, ProviderError>;

    /// Best match for a title, or `ProviderError::NoResults`.
    async fn best_match(&self, query: &str) -> Result<AnimeInfo, ProviderError> {
        self.search(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoResults(query.to_string()))
    }

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

/// Downloads raw bytes (images, thumbnails).
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}
