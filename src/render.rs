//! Output seam for the dashboard.
//!
//! ## Design
//! - The core never touches a display directly; it calls through `Renderer`,
//!   which mirrors the operations a DOM list container supports: insert a
//!   comment/reply block, toggle visibility, remove a block, drop the
//!   empty-list placeholder.
//! - Block identity is allocated by the dashboard (`BlockId`), so renderers
//!   stay stateless about ordering.
//! - `TermRenderer` is the shipped implementation for the terminal binary;
//!   `RecordingRenderer` captures every call for headless assertions.

use colored::*;
use std::collections::HashMap;

use crate::{Comment, Reply};

/// Identity of one rendered block, allocated by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

/// Display capability the dashboard core depends on.
pub trait Renderer {
    /// Insert a viewer comment block at the head of the list.
    fn render_comment(&mut self, id: BlockId, comment: &Comment);
    /// Insert an AI reply block at the head of the list.
    fn render_reply(&mut self, id: BlockId, reply: &Reply);
    /// Show or hide an existing block.
    fn set_visibility(&mut self, id: BlockId, visible: bool);
    /// Remove a block entirely (bounded-growth eviction).
    fn remove_element(&mut self, id: BlockId);
    /// Drop the "no comments yet" placeholder, if the display has one.
    fn remove_placeholder(&mut self);
}

// ---------------------------------------------------------------------------
// Terminal renderer
// ---------------------------------------------------------------------------

/// Renders blocks as colored terminal lines.
///
/// A terminal scrollback is append-only, so visibility toggles and removals
/// are bookkeeping no-ops here; filtering still governs what the core asks
/// to be shown, and the event stream itself is the record.
#[derive(Debug, Default)]
pub struct TermRenderer;

impl TermRenderer {
    pub fn new() -> Self {
        TermRenderer
    }
}

impl Renderer for TermRenderer {
    fn render_comment(&mut self, _id: BlockId, comment: &Comment) {
        println!(
            "{} {} {}",
            comment.timestamp.dimmed(),
            format!("{}:", comment.user).bright_yellow(),
            comment.content
        );
    }

    fn render_reply(&mut self, _id: BlockId, reply: &Reply) {
        let voice_mark = if reply.audio_url.is_some() { " ♪" } else { "" };
        println!(
            "{} {} {}{}",
            reply.timestamp.dimmed(),
            format!("{}:", reply.user).bright_cyan().bold(),
            reply.content.bright_white(),
            voice_mark.bright_magenta()
        );
    }

    fn set_visibility(&mut self, _id: BlockId, _visible: bool) {}

    fn remove_element(&mut self, _id: BlockId) {}

    fn remove_placeholder(&mut self) {}
}

// ---------------------------------------------------------------------------
// Recording renderer
// ---------------------------------------------------------------------------

/// What kind of block a recorded entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Comment,
    Reply,
}

/// Captures every render call for headless inspection.
///
/// Blocks are stored head-first, matching the most-recent-first list the
/// dashboard maintains.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// (id, kind, rendered text), newest first.
    pub blocks: Vec<(BlockId, BlockKind, String)>,
    /// Current visibility per block; present once `set_visibility` ran.
    pub visibility: HashMap<BlockId, bool>,
    /// How many times the placeholder was removed.
    pub placeholder_removals: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids currently visible, newest first.
    pub fn visible_ids(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|(id, _, _)| self.visibility.get(id).copied().unwrap_or(true))
            .map(|(id, _, _)| *id)
            .collect()
    }

    pub fn is_visible(&self, id: BlockId) -> bool {
        self.visibility.get(&id).copied().unwrap_or(true)
    }

    pub fn kind_of(&self, id: BlockId) -> Option<BlockKind> {
        self.blocks
            .iter()
            .find(|(bid, _, _)| *bid == id)
            .map(|(_, kind, _)| *kind)
    }
}

impl Renderer for RecordingRenderer {
    fn render_comment(&mut self, id: BlockId, comment: &Comment) {
        self.blocks.insert(
            0,
            (
                id,
                BlockKind::Comment,
                format!("{} {}: {}", comment.timestamp, comment.user, comment.content),
            ),
        );
    }

    fn render_reply(&mut self, id: BlockId, reply: &Reply) {
        self.blocks.insert(
            0,
            (
                id,
                BlockKind::Reply,
                format!("{} {}: {}", reply.timestamp, reply.user, reply.content),
            ),
        );
    }

    fn set_visibility(&mut self, id: BlockId, visible: bool) {
        self.visibility.insert(id, visible);
    }

    fn remove_element(&mut self, id: BlockId) {
        self.blocks.retain(|(bid, _, _)| *bid != id);
        self.visibility.remove(&id);
    }

    fn remove_placeholder(&mut self) {
        self.placeholder_removals += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(user: &str, content: &str) -> Comment {
        Comment {
            user: user.to_string(),
            content: content.to_string(),
            timestamp: "12:00:00".to_string(),
        }
    }

    fn reply(content: &str) -> Reply {
        Reply {
            user: "AI助手".to_string(),
            content: content.to_string(),
            timestamp: "12:00:01".to_string(),
            audio_url: None,
        }
    }

    #[test]
    fn test_recording_renderer_inserts_at_head() {
        let mut r = RecordingRenderer::new();
        r.render_comment(BlockId(1), &comment("a", "first"));
        r.render_comment(BlockId(2), &comment("b", "second"));
        assert_eq!(r.blocks[0].0, BlockId(2));
        assert_eq!(r.blocks[1].0, BlockId(1));
    }

    #[test]
    fn test_recording_renderer_tracks_kinds() {
        let mut r = RecordingRenderer::new();
        r.render_comment(BlockId(1), &comment("a", "q"));
        r.render_reply(BlockId(2), &reply("a"));
        assert_eq!(r.kind_of(BlockId(1)), Some(BlockKind::Comment));
        assert_eq!(r.kind_of(BlockId(2)), Some(BlockKind::Reply));
    }

    #[test]
    fn test_recording_renderer_visibility_defaults_true() {
        let mut r = RecordingRenderer::new();
        r.render_comment(BlockId(1), &comment("a", "q"));
        assert!(r.is_visible(BlockId(1)));
        assert_eq!(r.visible_ids(), vec![BlockId(1)]);
    }

    #[test]
    fn test_recording_renderer_set_visibility() {
        let mut r = RecordingRenderer::new();
        r.render_comment(BlockId(1), &comment("a", "q"));
        r.set_visibility(BlockId(1), false);
        assert!(!r.is_visible(BlockId(1)));
        assert!(r.visible_ids().is_empty());
    }

    #[test]
    fn test_recording_renderer_remove_element() {
        let mut r = RecordingRenderer::new();
        r.render_comment(BlockId(1), &comment("a", "q"));
        r.render_comment(BlockId(2), &comment("b", "w"));
        r.remove_element(BlockId(1));
        assert_eq!(r.blocks.len(), 1);
        assert_eq!(r.blocks[0].0, BlockId(2));
    }

    #[test]
    fn test_term_renderer_calls_do_not_panic() {
        let mut r = TermRenderer::new();
        r.render_comment(BlockId(1), &comment("观众42", "这个产品怎么用？"));
        r.render_reply(BlockId(2), &reply("感谢您的提问！"));
        r.set_visibility(BlockId(1), false);
        r.remove_element(BlockId(1));
        r.remove_placeholder();
    }
}
