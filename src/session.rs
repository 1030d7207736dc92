//! Session controller: start/stop the live session against the backend.
//!
//! Thin by design — one GET per operation, a `live` flag for the UI toggle,
//! and a notice per outcome. The push channel's lifetime belongs to the
//! backend session, not to this controller, and stopping never touches the
//! audio queue.

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::DeskError;
use crate::Notice;

/// What the session endpoints answer: `{"status": "success"|..., "msg"?: "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Turn a backend answer into an outcome: the display message on success,
/// a refusal error otherwise.
pub fn interpret(response: ApiResponse) -> Result<String, DeskError> {
    if response.status == "success" {
        Ok(response.msg.unwrap_or_else(|| "ok".to_string()))
    } else {
        Err(DeskError::Refused(
            response.msg.unwrap_or(response.status),
        ))
    }
}

/// Issues start/stop requests and tracks the button-enablement state.
pub struct SessionController {
    client: reqwest::Client,
    base_url: String,
    live: bool,
    notice_tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl SessionController {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        SessionController {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            live: false,
            notice_tx: None,
        }
    }

    /// Route outcome notices to the notification collaborator.
    pub fn with_notices(mut self, tx: mpsc::UnboundedSender<Notice>) -> Self {
        self.notice_tx = Some(tx);
        self
    }

    /// Whether a live session is currently running (drives button state).
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Start the live session. On failure `live` is left unchanged.
    pub async fn start(&mut self) -> Result<(), DeskError> {
        match self.call("/live/start").await.and_then(interpret) {
            Ok(msg) => {
                self.live = true;
                info!(%msg, "live session started");
                self.notify(Notice::info(msg));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to start live session");
                self.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Stop the live session. On failure `live` is left unchanged; queued
    /// audio keeps draining either way.
    pub async fn stop(&mut self) -> Result<(), DeskError> {
        match self.call("/live/stop").await.and_then(interpret) {
            Ok(msg) => {
                self.live = false;
                info!(%msg, "live session stopped");
                self.notify(Notice::info(msg));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to stop live session");
                self.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn call(&self, path: &str) -> Result<ApiResponse, DeskError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DeskError::Session {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(DeskError::Session {
                url,
                detail: format!("HTTP {}", response.status()),
            });
        }

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| DeskError::Session {
                url,
                detail: format!("bad response body: {}", e),
            })
    }

    fn notify(&self, notice: Notice) {
        if let Some(tx) = &self.notice_tx {
            let _ = tx.send(notice);
        }
    }
}
