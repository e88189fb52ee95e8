//! Latest WhatsApp Web protocol version lookup.
//!
//! The Baileys project publishes the version WhatsApp Web currently speaks as
//! `{"version": [major, minor, patch]}`. The lookup never fails: when the
//! document can't be fetched the bundled default is used and the error is
//! reported alongside.

use std::fmt;

use serde::Deserialize;
use tracing::{debug, warn};

/// Version bundled with this build, used when the lookup fails.
pub const DEFAULT_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion([2, 3000, 1_015_901_307]);

/// A WhatsApp Web protocol version triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolVersion(pub [u32; 3]);

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}.{b}.{c}")
    }
}

/// Result of a version lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionLookup {
    pub version: ProtocolVersion,
    /// Whether `version` came from the published document.
    pub is_latest: bool,
    /// Why the lookup fell back to the default.
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionDocument {
    version: [u32; 3],
}

/// Fetch the latest protocol version, falling back to [`DEFAULT_PROTOCOL_VERSION`].
pub async fn fetch_latest_version(url: &str) -> VersionLookup {
    match try_fetch(url).await {
        Ok(version) => {
            debug!(version = %version, "fetched latest protocol version");
            VersionLookup {
                version,
                is_latest: true,
                error: None,
            }
        }
        Err(e) => {
            warn!(error = %e, fallback = %DEFAULT_PROTOCOL_VERSION, "protocol version lookup failed");
            VersionLookup {
                version: DEFAULT_PROTOCOL_VERSION,
                is_latest: false,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn try_fetch(url: &str) -> anyhow::Result<ProtocolVersion> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;
    let doc: VersionDocument = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(ProtocolVersion(doc.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_display() {
        assert_eq!(ProtocolVersion([2, 3000, 7]).to_string(), "2.3000.7");
    }

    #[tokio::test]
    async fn test_fetch_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/baileys-version.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "version": [2, 3000, 1023223821] })),
            )
            .mount(&server)
            .await;

        let lookup = fetch_latest_version(&format!("{}/baileys-version.json", server.uri())).await;
        assert!(lookup.is_latest);
        assert!(lookup.error.is_none());
        assert_eq!(lookup.version, ProtocolVersion([2, 3000, 1023223821]));
    }

    #[tokio::test]
    async fn test_fetch_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let lookup = fetch_latest_version(&server.uri()).await;
        assert!(!lookup.is_latest);
        assert!(lookup.error.is_some());
        assert_eq!(lookup.version, DEFAULT_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_fetch_malformed_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "v": 1 })))
            .mount(&server)
            .await;

        let lookup = fetch_latest_version(&server.uri()).await;
        assert_eq!(lookup.version, DEFAULT_PROTOCOL_VERSION);
    }
}
