//! Plain HTTP media download.

use async_trait::async_trait;
use tracing::debug;

use crate::traits::MediaFetcher;
use crate::ProviderError;

/// `MediaFetcher` over HTTP GET.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        debug!(url = %url, size = bytes.len(), "downloaded media");
        Ok(bytes.to_vec())
    }
}
