//! HTTP collaborators for Aniwa.
//!
//! # Architecture
//!
//! - [`traits::AnimeSearch`] — anime metadata lookup by title
//! - [`traits::MediaFetcher`] — raw byte download (artwork, thumbnails)
//! - [`jikan::JikanClient`] — `AnimeSearch` over the Jikan (MyAnimeList) v4 API
//! - [`media::HttpFetcher`] — `MediaFetcher` over plain HTTP GET
//! - [`version`] — latest WhatsApp Web protocol version lookup

pub mod jikan;
pub mod media;
pub mod traits;
pub mod version;

pub use jikan::{AnimeImages, AnimeInfo, ImageSet, JikanClient};
pub use media::HttpFetcher;
pub use traits::{AnimeSearch, MediaFetcher};
pub use version::{fetch_latest_version, ProtocolVersion, VersionLookup};

/// Errors raised by HTTP collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("no results for \"{0}\"")]
    NoResults(String),
}
