//! Baileys bridge transport — WebSocket client to a Node.js process that speaks
//! the WhatsApp Web protocol.
//!
//! Frames (JSON text over WebSocket, default `ws://localhost:3001`):
//! - out `{"type":"init","version":[a,b,c],"creds":{..},"keys":{..},"printQr":true,"qrTimeoutMs":60000}`
//! - in  `{"type":"events","events":{"connection.update":{..},"creds.update":{..},..}}`
//! - out `{"type":"send","to":"<jid>","image":"<b64>","jpegThumbnail":"<b64>","caption":"..","contextInfo":{..}}`
//! - in  `{"type":"sent","to":"<jid>"}` / `{"type":"error","error":".."}`
//!
//! A socket that drops without a `close` update is reported as a transient close.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use futures_util::stream::{SplitSink, Stream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use aniwa_core::config::WhatsAppConfig;
use aniwa_core::session::AuthState;
use aniwa_core::types::OutgoingImage;
use aniwa_providers::ProtocolVersion;

use crate::transport::{
    ConnectionState, ConnectionUpdate, EventBatch, Transport, TransportError, TransportFactory,
    TransportSession,
};

// ─────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────

/// Default bridge WebSocket URL.
const DEFAULT_BRIDGE_URL: &str = "ws://localhost:3001";

/// Event batches buffered between the socket reader and the relay.
const EVENT_BUFFER: usize = 64;

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;
type WsSink = SplitSink<WsStream, WsMessage>;

// ─────────────────────────────────────────────
// Frames
// ─────────────────────────────────────────────

/// Inbound bridge frame.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum BridgeFrame {
    Events {
        events: EventBatch,
    },
    Sent {
        #[serde(default)]
        to: String,
    },
    Error {
        #[serde(default)]
        error: String,
    },
    #[serde(other)]
    Other,
}

fn init_frame(auth: &AuthState, version: ProtocolVersion, print_qr: bool, qr_timeout_ms: u64) -> Value {
    json!({
        "type": "init",
        "version": version.0,
        "creds": auth.creds,
        "keys": auth.keys,
        "printQr": print_qr,
        "qrTimeoutMs": qr_timeout_ms,
    })
}

fn send_frame(jid: &str, image: &OutgoingImage) -> Result<Value, TransportError> {
    let mut frame = json!({
        "type": "send",
        "to": jid,
        "image": B64.encode(&image.image),
        "jpegThumbnail": image.jpeg_thumbnail,
        "caption": image.caption,
    });

    if let Some(card) = &image.external_ad_reply {
        let mut reply = serde_json::to_value(card)?;
        reply["thumbnail"] = Value::String(B64.encode(&card.thumbnail));
        frame["contextInfo"] = json!({ "externalAdReply": reply });
    }

    Ok(frame)
}

// ─────────────────────────────────────────────
// BridgeFactory
// ─────────────────────────────────────────────

/// Creates bridge sessions, one WebSocket connection each.
#[derive(Clone, Debug)]
pub struct BridgeFactory {
    url: String,
    print_qr: bool,
    qr_timeout_ms: u64,
}

impl BridgeFactory {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            url: if url.is_empty() {
                DEFAULT_BRIDGE_URL.to_string()
            } else {
                url
            },
            print_qr: true,
            qr_timeout_ms: 60_000,
        }
    }

    pub fn from_config(cfg: &WhatsAppConfig) -> Self {
        Self {
            print_qr: cfg.print_qr,
            qr_timeout_ms: cfg.qr_timeout_ms,
            ..Self::new(cfg.bridge_url.clone())
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransportFactory for BridgeFactory {
    async fn create(
        &self,
        auth: AuthState,
        version: ProtocolVersion,
    ) -> Result<TransportSession, TransportError> {
        debug!(url = %self.url, "connecting to whatsapp bridge");
        let (ws_stream, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| TransportError::Connect(format!("{}: {e}", self.url)))?;
        info!(url = %self.url, "connected to whatsapp bridge");

        let (mut write, read) = ws_stream.split();
        let init = init_frame(&auth, version, self.print_qr, self.qr_timeout_ms);
        write.send(WsMessage::text(init.to_string())).await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reader = tokio::spawn(read_frames(read, tx));

        Ok(TransportSession {
            handle: Arc::new(BridgeTransport {
                sink: Mutex::new(Some(write)),
                reader: Mutex::new(Some(reader)),
            }),
            events: rx,
        })
    }
}

/// Forward event frames until the socket ends, then make sure a close is reported.
async fn read_frames<S>(mut read: S, tx: mpsc::Sender<EventBatch>)
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut saw_close = false;

    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(WsMessage::Text(t)) => t.to_string(),
            Ok(WsMessage::Close(_)) => {
                info!("whatsapp bridge closed connection");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "whatsapp bridge read error");
                break;
            }
        };

        match serde_json::from_str::<BridgeFrame>(&text) {
            Ok(BridgeFrame::Events { events }) => {
                let closing = events
                    .connection_update
                    .as_ref()
                    .is_some_and(|u| u.connection == Some(ConnectionState::Close));
                saw_close |= closing;
                if tx.send(events).await.is_err() {
                    debug!("event receiver dropped, stopping bridge reader");
                    return;
                }
                if closing {
                    return;
                }
            }
            Ok(BridgeFrame::Sent { to }) => debug!(to = %to, "bridge confirmed send"),
            Ok(BridgeFrame::Error { error }) => error!(error = %error, "whatsapp bridge error"),
            Ok(BridgeFrame::Other) => debug!("ignoring unknown bridge frame"),
            Err(e) => warn!(error = %e, "unparseable bridge frame"),
        }
    }

    if !saw_close {
        let _ = tx
            .send(EventBatch::connection(ConnectionUpdate::closed(None)))
            .await;
    }
}

// ─────────────────────────────────────────────
// BridgeTransport
// ─────────────────────────────────────────────

/// Send half of a bridge session.
pub struct BridgeTransport {
    sink: Mutex<Option<WsSink>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn send_image(&self, jid: &str, image: &OutgoingImage) -> Result<(), TransportError> {
        let frame = send_frame(jid, image)?.to_string();

        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(WsMessage::text(frame)).await?;
        debug!(to = %jid, "image frame sent to bridge");
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(WsMessage::Close(None)).await;
        }
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aniwa_core::types::ExternalAdReply;
    use tokio::net::TcpListener;

    fn image_with_card() -> OutgoingImage {
        OutgoingImage {
            image: vec![0xFF, 0xD8],
            jpeg_thumbnail: "thumb".into(),
            caption: "Episode 5 of the anime X has just been aired. ".into(),
            external_ad_reply: Some(ExternalAdReply {
                title: "MyAnimeList".into(),
                thumbnail: vec![1, 2, 3],
                media_type: 1,
                body: "X".into(),
                source_url: "https://myanimelist.net/anime/1".into(),
            }),
        }
    }

    #[test]
    fn test_default_url() {
        assert_eq!(BridgeFactory::new("").url(), "ws://localhost:3001");
        assert_eq!(BridgeFactory::new("ws://bridge:9000").url(), "ws://bridge:9000");
    }

    #[test]
    fn test_from_config() {
        let cfg = WhatsAppConfig {
            print_qr: false,
            qr_timeout_ms: 5000,
            ..Default::default()
        };
        let factory = BridgeFactory::from_config(&cfg);
        assert!(!factory.print_qr);
        assert_eq!(factory.qr_timeout_ms, 5000);
        assert_eq!(factory.url(), cfg.bridge_url);
    }

    #[test]
    fn test_init_frame() {
        let auth = AuthState {
            creds: Some(json!({ "me": { "id": "1" } })),
            keys: [("pre-key-1".to_string(), json!({ "k": 1 }))].into_iter().collect(),
        };
        let frame = init_frame(&auth, ProtocolVersion([2, 3000, 5]), true, 60_000);
        assert_eq!(frame["type"], "init");
        assert_eq!(frame["version"], json!([2, 3000, 5]));
        assert_eq!(frame["creds"]["me"]["id"], "1");
        assert_eq!(frame["keys"]["pre-key-1"]["k"], 1);
        assert_eq!(frame["qrTimeoutMs"], 60_000);
    }

    #[test]
    fn test_send_frame_with_card() {
        let frame = send_frame("111@s.whatsapp.net", &image_with_card()).unwrap();
        assert_eq!(frame["type"], "send");
        assert_eq!(frame["to"], "111@s.whatsapp.net");
        assert_eq!(frame["image"], B64.encode([0xFF, 0xD8]));
        assert_eq!(frame["jpegThumbnail"], "thumb");
        let reply = &frame["contextInfo"]["externalAdReply"];
        assert_eq!(reply["title"], "MyAnimeList");
        assert_eq!(reply["mediaType"], 1);
        assert_eq!(reply["sourceUrl"], "https://myanimelist.net/anime/1");
        assert_eq!(reply["thumbnail"], B64.encode([1, 2, 3]));
    }

    #[test]
    fn test_send_frame_without_card() {
        let mut image = image_with_card();
        image.external_ad_reply = None;
        let frame = send_frame("111@s.whatsapp.net", &image).unwrap();
        assert!(frame.get("contextInfo").is_none());
    }

    #[test]
    fn test_parse_frames() {
        let frame: BridgeFrame = serde_json::from_str(
            r#"{"type":"events","events":{"connection.update":{"connection":"open"}}}"#,
        )
        .unwrap();
        assert!(matches!(frame, BridgeFrame::Events { .. }));

        let frame: BridgeFrame = serde_json::from_str(r#"{"type":"error","error":"boom"}"#).unwrap();
        assert!(matches!(frame, BridgeFrame::Error { error } if error == "boom"));

        let frame: BridgeFrame = serde_json::from_str(r#"{"type":"status","status":"x"}"#).unwrap();
        assert!(matches!(frame, BridgeFrame::Other));
    }

    #[tokio::test]
    async fn test_unreachable_bridge() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let factory = BridgeFactory::new(format!("ws://{addr}"));
        let result = factory.create(AuthState::default(), ProtocolVersion([2, 3000, 1])).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn test_session_against_local_bridge() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let init = ws.next().await.unwrap().unwrap();
            let init: Value = serde_json::from_str(init.to_text().unwrap()).unwrap();

            let open = json!({ "type": "events", "events": { "connection.update": { "connection": "open" } } });
            ws.send(WsMessage::text(open.to_string())).await.unwrap();
            ws.send(WsMessage::text(r#"{"type":"error","error":"ignored"}"#)).await.unwrap();

            let send = ws.next().await.unwrap().unwrap();
            let send: Value = serde_json::from_str(send.to_text().unwrap()).unwrap();

            ws.close(None).await.unwrap();
            (init, send)
        });

        let factory = BridgeFactory::new(format!("ws://{addr}"));
        let mut session = factory
            .create(AuthState::default(), ProtocolVersion([2, 3000, 9]))
            .await
            .unwrap();

        let batch = session.events.recv().await.unwrap();
        assert_eq!(batch.connection_update.unwrap().connection, Some(ConnectionState::Open));

        session
            .handle
            .send_image("111@s.whatsapp.net", &image_with_card())
            .await
            .unwrap();

        // Bridge hangs up without a close update: a synthetic transient close follows.
        let batch = session.events.recv().await.unwrap();
        let update = batch.connection_update.unwrap();
        assert_eq!(update.connection, Some(ConnectionState::Close));
        assert!(update.disconnect_reason().is_none());

        let (init, send) = server.await.unwrap();
        assert_eq!(init["type"], "init");
        assert_eq!(init["version"], json!([2, 3000, 9]));
        assert!(init["creds"].is_null());
        assert_eq!(send["to"], "111@s.whatsapp.net");

        session.handle.close().await.unwrap();
        session.handle.close().await.unwrap();
    }
}
