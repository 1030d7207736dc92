//! Crate-level error type for network-facing operations.

use thiserror::Error;

/// Errors surfaced by the session controller, push channel client, and
/// configuration loader.
///
/// Ingest and playback faults are deliberately absent: those are recovered
/// in place (logged and skipped / advanced past) and never propagate.
#[derive(Debug, Error)]
pub enum DeskError {
    /// A TCP/WebSocket/HTTP connection could not be established.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The session backend replied with a transport-level failure.
    #[error("session request to {url} failed: {detail}")]
    Session { url: String, detail: String },

    /// The session backend answered but refused the operation.
    #[error("session backend refused: {0}")]
    Refused(String),

    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_connect() {
        let e = DeskError::Connect {
            url: "ws://127.0.0.1:5000/push".to_string(),
            detail: "refused".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "connection failed to ws://127.0.0.1:5000/push: refused"
        );
    }

    #[test]
    fn test_display_refused_carries_backend_message() {
        let e = DeskError::Refused("请先登录".to_string());
        assert!(e.to_string().contains("请先登录"));
    }

    #[test]
    fn test_is_std_error() {
        fn takes_err(_: &dyn std::error::Error) {}
        takes_err(&DeskError::Config("bad toml".to_string()));
    }
}
