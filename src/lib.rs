//! Realtime dashboard core for a live-stream AI co-host.
//!
//! ## Design
//! - One dispatcher task owns a [`Dashboard`] and consumes an ordered stream
//!   of [`channel::PushEvent`]s; handlers run synchronously, so every state
//!   field has a single writer.
//! - Display goes through the [`render::Renderer`] seam; audio goes to the
//!   [`playback::AudioScheduler`] over an mpsc; analysis requests and toast
//!   notices leave on fire-and-forget channels. The core never blocks on a
//!   collaborator.
//! - The backend push channel is trusted: malformed payloads are logged and
//!   skipped, never raised.

pub mod audio;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod playback;
pub mod render;
pub mod session;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use channel::PushEvent;
use filter::{visible_under, FilterMode};
use playback::PlaybackRequest;
use render::{BlockId, Renderer};

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// A viewer comment as delivered by the push channel. Immutable once
/// received; `timestamp` is display-ready and never parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub user: String,
    pub content: String,
    pub timestamp: String,
}

/// An AI-generated reply, correlated to a comment by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub user: String,
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// Severity of an operator-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient toast for the notification collaborator.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice { text: text.into(), level: NoticeLevel::Info }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Notice { text: text.into(), level: NoticeLevel::Warning }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice { text: text.into(), level: NoticeLevel::Error }
    }
}

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// Counters and filter selection for one loaded dashboard.
///
/// Counters are monotone non-decreasing except through
/// [`Dashboard::reset_counters`], which zeroes all four in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    pub comment_count: u64,
    pub reply_count: u64,
    pub voice_count: u64,
    pub viewer_count: u64,
    pub filter: FilterMode,
}

impl DashboardState {
    pub fn new(filter: FilterMode) -> Self {
        DashboardState {
            comment_count: 0,
            reply_count: 0,
            voice_count: 0,
            viewer_count: 0,
            filter,
        }
    }
}

/// Cosmetic placeholder for the viewer-count display: monotone in `current`
/// and bounded by 60 until real telemetry exceeds it. Nothing downstream
/// reads it back; real audience data should replace it.
pub fn estimate_viewers(current: u64) -> u64 {
    use rand::Rng;
    current.max(rand::thread_rng().gen_range(10..=60))
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// The event-pipeline core: ingests comments and replies, keeps the rendered
/// list consistent with the active filter, and feeds the playback scheduler.
///
/// Owned by exactly one task; construct on session open, drop on teardown.
pub struct Dashboard<R: Renderer> {
    state: DashboardState,
    renderer: R,
    /// (block, answered tag), newest first — mirrors the rendered list.
    blocks: Vec<(BlockId, bool)>,
    next_block: u64,
    max_blocks: usize,
    audio_tx: mpsc::UnboundedSender<PlaybackRequest>,
    analyze_tx: Option<mpsc::UnboundedSender<Comment>>,
    notice_tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl<R: Renderer> Dashboard<R> {
    pub fn new(
        renderer: R,
        audio_tx: mpsc::UnboundedSender<PlaybackRequest>,
        filter: FilterMode,
        max_blocks: usize,
    ) -> Self {
        Dashboard {
            state: DashboardState::new(filter),
            renderer,
            blocks: Vec::new(),
            next_block: 0,
            max_blocks: max_blocks.max(1),
            audio_tx,
            analyze_tx: None,
            notice_tx: None,
        }
    }

    /// Route ingested comments to the analysis backend (fire-and-forget).
    pub fn with_analyze(mut self, tx: mpsc::UnboundedSender<Comment>) -> Self {
        self.analyze_tx = Some(tx);
        self
    }

    /// Route notices to the notification collaborator.
    pub fn with_notices(mut self, tx: mpsc::UnboundedSender<Notice>) -> Self {
        self.notice_tx = Some(tx);
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Rendered blocks, newest first, with their answered tags.
    pub fn blocks(&self) -> &[(BlockId, bool)] {
        &self.blocks
    }

    /// Dispatch one push-channel event to its handler.
    pub fn on_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::NewComment(comment) => self.on_comment(comment),
            PushEvent::AiReply(reply) => self.on_reply(reply),
            PushEvent::SystemMsg(msg) => self.on_system_msg(msg),
        }
    }

    // -----------------------------------------------------------------------
    // Ingest handlers
    // -----------------------------------------------------------------------

    /// Ingest one viewer comment.
    pub fn on_comment(&mut self, comment: Comment) {
        if comment.user.is_empty() || comment.content.is_empty() {
            debug!("skipping comment with empty user or content");
            return;
        }

        self.state.comment_count += 1;
        self.state.viewer_count = estimate_viewers(self.state.viewer_count);

        let id = self.insert_block(false, |renderer, id| {
            renderer.render_comment(id, &comment);
        });
        debug!(block = id.0, user = %comment.user, "comment rendered");

        if let Some(tx) = &self.analyze_tx {
            let _ = tx.send(comment);
        }
    }

    /// Ingest one AI reply and queue its speech.
    pub fn on_reply(&mut self, reply: Reply) {
        if reply.user.is_empty() || reply.content.is_empty() {
            debug!("skipping reply with empty user or content");
            return;
        }

        self.state.reply_count += 1;
        if reply.audio_url.is_some() {
            self.state.voice_count += 1;
        }

        let request = PlaybackRequest {
            text: reply.content.clone(),
            voice_style: None,
            audio_url: reply.audio_url.clone(),
        };

        let id = self.insert_block(true, |renderer, id| {
            renderer.render_reply(id, &reply);
        });
        debug!(block = id.0, "reply rendered");

        let _ = self.audio_tx.send(request);
    }

    /// Forward a backend system message to the notification collaborator.
    pub fn on_system_msg(&mut self, msg: String) {
        self.notify(Notice::info(msg));
    }

    /// Submit a manual voice check through the playback queue.
    pub fn test_voice(&mut self, text: impl Into<String>, style: impl Into<String>) {
        let _ = self.audio_tx.send(PlaybackRequest {
            text: text.into(),
            voice_style: Some(style.into()),
            audio_url: None,
        });
    }

    // -----------------------------------------------------------------------
    // Filtering
    // -----------------------------------------------------------------------

    /// Change the active filter and reconcile visibility.
    pub fn set_filter(&mut self, mode: FilterMode) {
        self.state.filter = mode;
        self.apply_filter(mode);
    }

    /// Recompute visibility of every rendered block under `mode`. Idempotent.
    pub fn apply_filter(&mut self, mode: FilterMode) {
        for (id, answered) in &self.blocks {
            self.renderer.set_visibility(*id, visible_under(mode, *answered));
        }
    }

    // -----------------------------------------------------------------------
    // Counters
    // -----------------------------------------------------------------------

    /// Zero all four counters in one step.
    pub fn reset_counters(&mut self) {
        self.state.comment_count = 0;
        self.state.reply_count = 0;
        self.state.voice_count = 0;
        self.state.viewer_count = 0;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Render a block at the head of the list, tag it, evict past the cap,
    /// and re-apply the active filter so visibility is right before the
    /// caller returns.
    fn insert_block(&mut self, answered: bool, render: impl FnOnce(&mut R, BlockId)) -> BlockId {
        if self.blocks.is_empty() {
            self.renderer.remove_placeholder();
        }

        let id = BlockId(self.next_block);
        self.next_block += 1;

        render(&mut self.renderer, id);
        self.blocks.insert(0, (id, answered));

        while self.blocks.len() > self.max_blocks {
            if let Some((evicted, _)) = self.blocks.pop() {
                self.renderer.remove_element(evicted);
            }
        }

        self.apply_filter(self.state.filter);
        id
    }

    fn notify(&self, notice: Notice) {
        if let Some(tx) = &self.notice_tx {
            let _ = tx.send(notice);
        }
    }
}
