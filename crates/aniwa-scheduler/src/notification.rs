//! Notification payloads for an aired episode.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

use aniwa_core::types::{ExternalAdReply, OutgoingImage, TrackedAnime};
use aniwa_providers::AnimeInfo;

/// Title of the reference card under each notification.
pub const REFERENCE_CARD_TITLE: &str = "MyAnimeList";

/// Caption: episode and title, plus the external links when there are any.
pub fn build_caption(ep: u32, title: &str, links: &[String]) -> String {
    let links_block = if links.is_empty() {
        String::new()
    } else {
        format!(
            "\n\n*External Links:*\n{}\n\n*Note:* It might take some time for this episode to appear on one of the external links.",
            links.join("\n")
        )
    };
    format!("Episode {ep} of the anime {title} has just been aired. {links_block}")
}

/// Image message for one aired episode. The same payload goes to every subscriber.
pub fn build_notification(
    entry: &TrackedAnime,
    info: &AnimeInfo,
    image: Vec<u8>,
    logo: Vec<u8>,
) -> OutgoingImage {
    let title = info.display_title();
    OutgoingImage {
        jpeg_thumbnail: B64.encode(&image),
        image,
        caption: build_caption(entry.ep, title, &entry.links),
        external_ad_reply: Some(ExternalAdReply {
            title: REFERENCE_CARD_TITLE.to_string(),
            thumbnail: logo,
            media_type: 1,
            body: title.to_string(),
            source_url: info.url.clone(),
        }),
    }
}

/// Outcome of one fan-out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchReport {
    /// Subscribers that received the message.
    pub sent: Vec<String>,
    /// Subscribers whose send failed, with the error.
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
