//! Jikan v4 client — unofficial MyAnimeList REST API.
//!
//! Only the anime search endpoint is used:
//! `GET {api_base}/anime?q=<title>` → `{"data": [ {mal_id, url, title, title_english, images} ]}`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::traits::AnimeSearch;
use crate::ProviderError;

// ─────────────────────────────────────────────
// Response types
// ─────────────────────────────────────────────

/// One image format (JPEG) in three sizes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

/// Artwork of an anime.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimeImages {
    pub jpg: ImageSet,
}

/// Search hit — the subset of the Jikan anime resource Aniwa uses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimeInfo {
    pub mal_id: u64,
    /// MyAnimeList page of the anime.
    pub url: String,
    pub title: String,
    pub title_english: Option<String>,
    pub images: AnimeImages,
}

impl AnimeInfo {
    /// English title when available, otherwise the default title.
    pub fn display_title(&self) -> &str {
        self.title_english
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.title)
    }

    /// Best artwork URL: large, then standard, then small; empty when none exist.
    pub fn image_url(&self) -> &str {
        let jpg = &self.images.jpg;
        [&jpg.large_image_url, &jpg.image_url, &jpg.small_image_url]
            .into_iter()
            .filter_map(|u| u.as_deref())
            .find(|u| !u.is_empty())
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<AnimeInfo>,
}

// ─────────────────────────────────────────────
// JikanClient
// ─────────────────────────────────────────────

/// `AnimeSearch` over the Jikan API.
#[derive(Clone, Debug)]
pub struct JikanClient {
    client: reqwest::Client,
    api_base: String,
}

impl JikanClient {
    /// Create a client for the given API base (e.g. `"https://api.jikan.moe/v4"`).
    pub fn new(api_base: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/anime", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl AnimeSearch for JikanClient {
    async fn search(&self, query: &str) -> Result<Vec<AnimeInfo>, ProviderError> {
        let url = self.search_url();
        debug!(query = %query, "searching anime");

        let response = self.client.get(&url).query(&[("q", query)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, body = %body, "anime search failed");
            return Err(ProviderError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response.json().await?;
        debug!(query = %query, hits = parsed.data.len(), "anime search done");
        Ok(parsed.data)
    }

    fn display_name(&self) -> &str {
        "Jikan"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
