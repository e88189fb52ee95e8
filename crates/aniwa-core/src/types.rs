//! Core types for Aniwa.
//!
//! Three families live here:
//! - tracked anime entries (what the "today" store holds)
//! - inbound WhatsApp payloads as forwarded by the Baileys bridge (calls, messages)
//! - the outbound image message the episode notifier sends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Tracked anime
// ─────────────────────────────────────────────

/// Recurring broadcast slot of an anime, as published by its airing schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastData {
    /// Local wall-clock time in the broadcast timezone, e.g. `"23:30"` or `"9:5"`.
    pub time: String,
    /// Broadcast timezone: numeric offset (`"+9"`, `"+09:00"`) or IANA name (`"Asia/Tokyo"`).
    pub timezone: String,
}

/// One anime episode expected to air today, plus the chats subscribed to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAnime {
    /// Title used for the metadata search and as the scheduling key.
    pub title: String,
    /// Episode number that is about to air.
    pub ep: u32,
    /// When the episode airs.
    pub broadcast_data: BroadcastData,
    /// Streaming / external links appended to the notification caption.
    #[serde(default)]
    pub links: Vec<String>,
    /// Subscriber chat IDs (JIDs) that receive the notification.
    #[serde(default)]
    pub registered: Vec<String>,
    /// Whether the episode has been announced as delayed (suppresses notifications).
    #[serde(default)]
    pub delayed: bool,
}

impl TrackedAnime {
    /// Create an entry with no links and no subscribers.
    pub fn new(
        title: impl Into<String>,
        ep: u32,
        time: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            ep,
            broadcast_data: BroadcastData {
                time: time.into(),
                timezone: timezone.into(),
            },
            links: Vec::new(),
            registered: Vec::new(),
            delayed: false,
        }
    }
}

// ─────────────────────────────────────────────
// Inbound WhatsApp payloads
// ─────────────────────────────────────────────

/// Lifecycle status of a call offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Offer,
    Ringing,
    Timeout,
    Reject,
    Accept,
    Terminate,
    #[serde(other)]
    Unknown,
}

/// An inbound call notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    /// Call identifier.
    pub id: String,
    /// Chat the call belongs to.
    pub chat_id: String,
    /// Caller JID.
    pub from: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_jid: Option<String>,
    #[serde(default)]
    pub is_video: bool,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offline: bool,
}

/// Addressing information of a WhatsApp message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageKey {
    /// Chat JID (user or group).
    pub remote_jid: Option<String>,
    /// Whether the bot itself sent the message.
    pub from_me: bool,
    /// Message identifier.
    pub id: Option<String>,
    /// Sender inside a group chat.
    pub participant: Option<String>,
}

/// An inbound WhatsApp message, kept close to the wire shape.
///
/// The `message` body stays as raw JSON: interpreting it is the job of the
/// command-dispatch layer, not of the client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebMessage {
    pub key: MessageKey,
    pub message: Option<serde_json::Value>,
    pub push_name: Option<String>,
    pub message_timestamp: Option<i64>,
}

impl WebMessage {
    /// Chat JID the message arrived in.
    pub fn chat_id(&self) -> Option<&str> {
        self.key.remote_jid.as_deref()
    }

    /// Sender JID: the group participant when present, otherwise the chat.
    pub fn sender(&self) -> Option<&str> {
        self.key
            .participant
            .as_deref()
            .or(self.key.remote_jid.as_deref())
    }

    /// Plain text of the message, if it carries any.
    ///
    /// Looks at conversation text, extended text, and media captions.
    pub fn text(&self) -> Option<&str> {
        let body = self.message.as_ref()?;
        body.get("conversation")
            .and_then(|v| v.as_str())
            .or_else(|| body.pointer("/extendedTextMessage/text").and_then(|v| v.as_str()))
            .or_else(|| body.pointer("/imageMessage/caption").and_then(|v| v.as_str()))
            .or_else(|| body.pointer("/videoMessage/caption").and_then(|v| v.as_str()))
    }
}

// ─────────────────────────────────────────────
// Outbound image message
// ─────────────────────────────────────────────

/// Reference "card" shown under a message, linking back to the source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAdReply {
    pub title: String,
    /// Card thumbnail, raw bytes (base64-encoded on the wire).
    #[serde(skip)]
    pub thumbnail: Vec<u8>,
    pub media_type: u8,
    pub body: String,
    pub source_url: String,
}

/// An image-with-caption message.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingImage {
    /// Image bytes.
    pub image: Vec<u8>,
    /// Base64 JPEG thumbnail.
    pub jpeg_thumbnail: String,
    pub caption: String,
    pub external_ad_reply: Option<ExternalAdReply>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tracked_anime_defaults() {
        let raw = json!({
            "title": "X",
            "ep": 5,
            "broadcast_data": { "time": "9:5", "timezone": "+9" }
        });
        let anime: TrackedAnime = serde_json::from_value(raw).unwrap();
        assert_eq!(anime.title, "X");
        assert_eq!(anime.ep, 5);
        assert_eq!(anime.broadcast_data.time, "9:5");
        assert!(anime.links.is_empty());
        assert!(anime.registered.is_empty());
        assert!(!anime.delayed);
    }

    #[test]
    fn test_tracked_anime_new() {
        let anime = TrackedAnime::new("Frieren", 12, "23:00", "Asia/Tokyo");
        assert_eq!(anime.broadcast_data.timezone, "Asia/Tokyo");
        assert!(!anime.delayed);
    }

    #[test]
    fn test_call_event_from_bridge() {
        let raw = json!({
            "id": "CALL1",
            "chatId": "111@s.whatsapp.net",
            "from": "111@s.whatsapp.net",
            "isVideo": true,
            "status": "offer",
            "date": "2024-01-01T00:00:00Z"
        });
        let call: CallEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(call.status, CallStatus::Offer);
        assert!(call.is_video);
        assert!(!call.is_group);
        assert!(call.date.is_some());
    }

    #[test]
    fn test_call_status_unknown() {
        let status: CallStatus = serde_json::from_str("\"something-new\"").unwrap();
        assert_eq!(status, CallStatus::Unknown);
    }

    #[test]
    fn test_web_message_text_conversation() {
        let msg: WebMessage = serde_json::from_value(json!({
            "key": { "remoteJid": "111@s.whatsapp.net", "fromMe": false, "id": "ABC" },
            "message": { "conversation": "!help" },
            "pushName": "Rin"
        }))
        .unwrap();
        assert_eq!(msg.text(), Some("!help"));
        assert_eq!(msg.chat_id(), Some("111@s.whatsapp.net"));
        assert_eq!(msg.sender(), Some("111@s.whatsapp.net"));
    }

    #[test]
    fn test_web_message_text_extended_and_caption() {
        let ext: WebMessage = serde_json::from_value(json!({
            "key": { "remoteJid": "g@g.us", "participant": "222@s.whatsapp.net" },
            "message": { "extendedTextMessage": { "text": "hello" } }
        }))
        .unwrap();
        assert_eq!(ext.text(), Some("hello"));
        assert_eq!(ext.sender(), Some("222@s.whatsapp.net"));

        let img: WebMessage = serde_json::from_value(json!({
            "message": { "imageMessage": { "caption": "look" } }
        }))
        .unwrap();
        assert_eq!(img.text(), Some("look"));
    }

    #[test]
    fn test_web_message_without_body() {
        let msg = WebMessage::default();
        assert!(msg.text().is_none());
        assert!(msg.chat_id().is_none());
    }
}
