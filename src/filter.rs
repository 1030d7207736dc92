//! Tri-state visibility filter for the comment/reply list.
//!
//! The only datum the filter reads is the block's `answered` tag — viewer
//! comments carry `answered = false`, AI replies carry `answered = true`.
//! Visibility is a pure function of (mode, tag), so re-applying the same mode
//! is always a no-op.

use serde::{Deserialize, Serialize};

/// Which rendered blocks are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    All,
    Answered,
    Unanswered,
}

impl FilterMode {
    /// Parse a user-supplied mode name, case-insensitively.
    pub fn from_str_loose(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "answered" => Ok(FilterMode::Answered),
            "unanswered" => Ok(FilterMode::Unanswered),
            _ => Err(format!("Unknown filter mode: {}", s)),
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::All => write!(f, "all"),
            FilterMode::Answered => write!(f, "answered"),
            FilterMode::Unanswered => write!(f, "unanswered"),
        }
    }
}

/// Whether a block with the given `answered` tag is visible under `mode`.
pub fn visible_under(mode: FilterMode, answered: bool) -> bool {
    match mode {
        FilterMode::All => true,
        FilterMode::Answered => answered,
        FilterMode::Unanswered => !answered,
    }
}
