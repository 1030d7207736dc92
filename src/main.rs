use clap::Parser;
use colored::*;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use livedesk::channel::{run_channel, PushEvent};
use livedesk::cli::{apply_overrides, Args};
use livedesk::config::DeskConfig;
use livedesk::filter::FilterMode;
use livedesk::playback::{AudioScheduler, FetchSink, PlaybackRequest, VolumeControl};
use livedesk::render::TermRenderer;
use livedesk::session::SessionController;
use livedesk::{Comment, Dashboard, Notice, NoticeLevel};

// ---------------------------------------------------------------------------
// Terminal output
// ---------------------------------------------------------------------------

fn print_banner(config: &DeskConfig, filter: FilterMode) {
    println!("{}", "LIVEDESK OPERATOR DASHBOARD".bright_cyan().bold());
    println!(
        "{}: {}",
        "Backend".bright_yellow(),
        config.server_url.bright_white()
    );
    println!(
        "{}: {}",
        "Channel".bright_yellow(),
        config.channel_url.bright_white()
    );
    println!("{}: {}", "Volume".bright_yellow(), config.volume);
    println!("{}: {}", "Filter".bright_yellow(), filter);
    println!("{}", "=".repeat(50).bright_blue());
    println!("{}", "Waiting for comments...".dimmed());
    println!();
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => eprintln!("{}", format!("  [i] {}", notice.text).bright_green()),
        NoticeLevel::Warning => eprintln!("{}", format!("  [!] {}", notice.text).bright_yellow()),
        NoticeLevel::Error => eprintln!("{}", format!("  [x] {}", notice.text).bright_red()),
    }
}

fn print_summary(state: &livedesk::DashboardState, played: u64, failed: u64) {
    println!("\n{}", "=".repeat(50).bright_blue());
    println!("Session over. {} comments, {} replies.", state.comment_count, state.reply_count);
    println!("Played {} audio items ({} failed).", played, failed);
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = DeskConfig::load(args.config.as_deref())?;
    let config = apply_overrides(&args, config);

    let filter = FilterMode::from_str_loose(&config.filter)
        .map_err(|e| format!("Invalid filter: {}", e))?;
    let volume = VolumeControl::new(config.volume);

    // One-shot voice check: play the line through the real playback path
    // and exit without touching the backend.
    if let Some(text) = args.test_voice {
        let mut scheduler =
            AudioScheduler::new(FetchSink::new(reqwest::Client::new()), volume);
        scheduler
            .enqueue(PlaybackRequest {
                text,
                voice_style: Some(args.voice_style),
                audio_url: None,
            })
            .await;
        println!(
            "{}",
            format!("Voice test done ({} failed).", scheduler.failed()).bright_green()
        );
        return Ok(());
    }

    print_banner(&config, filter);

    // Wiring: push channel -> dispatcher -> {renderer, scheduler, notices}.
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<PushEvent>();
    let (analyze_tx, analyze_rx) = mpsc::unbounded_channel::<Comment>();
    let (audio_tx, audio_rx) = mpsc::unbounded_channel::<PlaybackRequest>();
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<Notice>();

    let scheduler = AudioScheduler::new(FetchSink::new(reqwest::Client::new()), volume);
    let scheduler_handle = tokio::spawn(scheduler.run(audio_rx));

    let channel_url = config.channel_url.clone();
    let channel_notice_tx = notice_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = run_channel(channel_url, events_tx, analyze_rx).await {
            warn!(error = %e, "push channel task ended");
            let _ = channel_notice_tx.send(Notice::error(e.to_string()));
        }
    });

    tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            print_notice(&notice);
        }
    });

    let mut dashboard = Dashboard::new(TermRenderer::new(), audio_tx, filter, config.max_blocks)
        .with_analyze(analyze_tx)
        .with_notices(notice_tx.clone());

    let mut session = SessionController::new(reqwest::Client::new(), &config.server_url)
        .with_notices(notice_tx.clone());
    if session.start().await.is_err() {
        // The channel may still deliver; keep the dashboard up and let the
        // operator read the error notice.
        warn!("continuing without a confirmed live session");
    }

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(event) => dashboard.on_event(event),
                    None => {
                        info!("event stream ended, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", "Stopping live session...".bright_yellow());
                break;
            }
        }
    }

    if session.is_live() {
        let _ = session.stop().await;
    }

    // Closing the dashboard drops the audio sender; the scheduler drains
    // whatever is still queued before reporting.
    let state = dashboard.state().clone();
    drop(dashboard);
    let scheduler = scheduler_handle.await?;
    print_summary(&state, scheduler.played(), scheduler.failed());

    Ok(())
}
