use clap::Parser;
use std::path::PathBuf;

use crate::config::DeskConfig;

#[derive(Parser)]
#[command(name = "livedesk")]
#[command(version = "0.3.2")]
#[command(about = "Operator dashboard for a live-stream AI co-host")]
pub struct Args {
    /// Path to a TOML config file (defaults apply if absent)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Session backend base URL (overrides config)
    #[arg(long)]
    pub server: Option<String>,

    /// Push channel WebSocket URL (overrides config)
    #[arg(long)]
    pub channel: Option<String>,

    /// Playback volume, 0-100 (overrides config)
    #[arg(long)]
    pub volume: Option<u8>,

    /// Initial comment filter: all, answered, unanswered (overrides config)
    #[arg(long)]
    pub filter: Option<String>,

    /// Speak the given text once through the playback path, then exit
    #[arg(long)]
    pub test_voice: Option<String>,

    /// Voice style for --test-voice
    #[arg(long, default_value = "narrator")]
    pub voice_style: String,
}

/// Layer CLI flags over a loaded config. Flags win; anything unset keeps
/// the config value.
pub fn apply_overrides(args: &Args, mut config: DeskConfig) -> DeskConfig {
    if let Some(server) = &args.server {
        config.server_url = server.clone();
    }
    if let Some(channel) = &args.channel {
        config.channel_url = channel.clone();
    }
    if let Some(volume) = args.volume {
        config.volume = volume.min(100);
    }
    if let Some(filter) = &args.filter {
        config.filter = filter.clone();
    }
    config
}
