//! Push channel client: the persistent WebSocket feed from the live-session
//! backend.
//!
//! ## Design
//! - One socket, one reader: frames decode into `PushEvent`s and go out on an
//!   ordered mpsc, so delivery order survives all the way to the dispatcher.
//! - Outgoing traffic is the fire-and-forget `analyze_comment` request the
//!   comment ingest emits; it shares the socket via `select!`.
//! - The channel is trusted: unknown events and malformed payloads are
//!   logged and dropped, never fatal. Only losing the socket ends the task.
//!
//! Frame format, both directions: `{"event": "<name>", "data": <payload>}`.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::error::DeskError;
use crate::{Comment, Reply};

/// A decoded event from the push channel, in delivery order.
#[derive(Debug, Clone)]
pub enum PushEvent {
    NewComment(Comment),
    AiReply(Reply),
    SystemMsg(String),
}

// ---------------------------------------------------------------------------
// Frame codec
// ---------------------------------------------------------------------------

/// Decode one inbound text frame. `None` means the frame is not for us —
/// unknown event name or a payload that doesn't match its schema.
pub fn parse_frame(text: &str) -> Option<PushEvent> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let event = value.get("event")?.as_str()?;
    let data = value.get("data")?;

    match event {
        "new_comment" => serde_json::from_value::<Comment>(data.clone())
            .ok()
            .map(PushEvent::NewComment),
        "ai_reply" => serde_json::from_value::<Reply>(data.clone())
            .ok()
            .map(PushEvent::AiReply),
        "system_msg" => data
            .get("msg")
            .and_then(|m| m.as_str())
            .map(|m| PushEvent::SystemMsg(m.to_string())),
        _ => None,
    }
}

/// Encode the outgoing analysis request for a freshly ingested comment.
pub fn analyze_frame(comment: &Comment) -> String {
    serde_json::json!({
        "event": "analyze_comment",
        "data": comment,
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Client loop
// ---------------------------------------------------------------------------

/// Connect to the push channel and bridge it to in-process channels.
///
/// Inbound frames fan out on `events_tx`; comments received on `analyze_rx`
/// are sent upstream as `analyze_comment` frames. Runs until the socket
/// closes or either side of the bridge goes away.
pub async fn run_channel(
    url: String,
    events_tx: mpsc::UnboundedSender<PushEvent>,
    mut analyze_rx: mpsc::UnboundedReceiver<Comment>,
) -> Result<(), DeskError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .map_err(|e| DeskError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;
    info!(%url, "push channel connected");

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let mut analyze_open = true;

    loop {
        tokio::select! {
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        match parse_frame(&text) {
                            Some(event) => {
                                if events_tx.send(event).is_err() {
                                    // Dispatcher is gone; nothing left to feed.
                                    break;
                                }
                            }
                            None => debug!(frame = %text, "dropping unrecognized frame"),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("push channel closed by backend");
                        break;
                    }
                    Some(Ok(_)) => {} // ping/pong/binary — nothing to do
                    Some(Err(e)) => {
                        warn!(error = %e, "push channel read error");
                        break;
                    }
                }
            }
            // Once the ingest side drops its sender this branch must stop
            // polling: recv() on the drained channel is instantly ready with
            // None forever, which would spin the loop.
            request = analyze_rx.recv(), if analyze_open => {
                match request {
                    Some(comment) => {
                        let frame = analyze_frame(&comment);
                        if ws_sink.send(WsMessage::Text(frame)).await.is_err() {
                            warn!("push channel write failed, disconnecting");
                            break;
                        }
                    }
                    None => {
                        debug!("analysis sender dropped, inbound only from here");
                        analyze_open = false;
                    }
                }
            }
        }
    }

    Ok(())
}
