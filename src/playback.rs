//! Sequential audio playback: FIFO queue, single in-flight playback, forward
//! progress on failure.
//!
//! ## Design
//! - `AudioScheduler` owns a `VecDeque` of requests and an `AudioSink`. The
//!   sink is the opaque media seam — fetching/decoding/outputting audio lives
//!   behind it, the scheduler only sequences.
//! - One task drives the scheduler (the `run` pump reading an mpsc). Bursts
//!   of replies accumulate in the channel and queue in arrival order, so at
//!   most one playback is ever in flight.
//! - A failed playback counts as a completed one: log, bump `failed`, keep
//!   draining. Nothing may strand the scheduler in the playing state.
//! - Volume is read from the shared `VolumeControl` at the moment each
//!   playback starts. A change never touches a playback in progress.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Playback request
// ---------------------------------------------------------------------------

/// One unit of speech to play.
///
/// Created when an AI reply arrives or the operator fires a test-voice
/// action; owned by the scheduler queue until dequeued; dropped once its
/// playback completes or irrecoverably fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Errors a sink can report for a single playback attempt.
///
/// All of them are recovered by advancing the queue; none propagate.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The audio resource could not be fetched.
    #[error("audio resource unreachable at {url}: {detail}")]
    Unreachable { url: String, detail: String },

    /// The server answered with a non-2xx status for the audio resource.
    #[error("HTTP {status} fetching audio from {url}")]
    Http { status: u16, url: String },

    /// A `data:` URL payload could not be decoded.
    #[error("bad data URL: {0}")]
    BadDataUrl(String),

    /// The fetched bytes could not be decoded as audio.
    #[error("audio decode failed: {0}")]
    Decode(String),

    /// The output device rejected or aborted the playback.
    #[error("audio output failed: {0}")]
    Output(String),
}

/// The opaque media seam: plays one request to completion at the given gain.
pub trait AudioSink {
    fn play(
        &mut self,
        request: PlaybackRequest,
        gain: f32,
    ) -> impl Future<Output = Result<(), PlaybackError>> + Send;
}

// ---------------------------------------------------------------------------
// Volume control
// ---------------------------------------------------------------------------

/// Shared handle on the operator's volume slider (0–100).
///
/// Cloneable across tasks; the scheduler samples it when a playback starts.
#[derive(Debug, Clone)]
pub struct VolumeControl(Arc<AtomicU8>);

impl VolumeControl {
    pub fn new(level: u8) -> Self {
        VolumeControl(Arc::new(AtomicU8::new(level.min(100))))
    }

    /// Current slider value, 0–100.
    pub fn level(&self) -> u8 {
        self.0.load(Ordering::SeqCst)
    }

    /// Move the slider. Values above 100 are clamped.
    pub fn set(&self, level: u8) {
        self.0.store(level.min(100), Ordering::SeqCst);
    }

    /// Slider value mapped linearly to a 0.0–1.0 gain.
    pub fn gain(&self) -> f32 {
        f32::from(self.level()) / 100.0
    }
}

impl Default for VolumeControl {
    fn default() -> Self {
        VolumeControl::new(80)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// FIFO playback scheduler; at most one playback in flight.
pub struct AudioScheduler<S: AudioSink> {
    queue: VecDeque<PlaybackRequest>,
    playing: Arc<AtomicBool>,
    sink: S,
    volume: VolumeControl,
    played: u64,
    failed: u64,
}

impl<S: AudioSink> AudioScheduler<S> {
    pub fn new(sink: S, volume: VolumeControl) -> Self {
        AudioScheduler {
            queue: VecDeque::new(),
            playing: Arc::new(AtomicBool::new(false)),
            sink,
            volume,
            played: 0,
            failed: 0,
        }
    }

    /// True while a playback is in flight.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Shared view of the playing flag, for state snapshots from other tasks.
    pub fn playing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.playing)
    }

    /// Requests waiting behind the current playback.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Playbacks finished so far, successes and failures both.
    pub fn played(&self) -> u64 {
        self.played
    }

    /// Playbacks that ended in a sink error.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Append to the tail; if idle, start draining immediately.
    pub async fn enqueue(&mut self, request: PlaybackRequest) {
        self.queue.push_back(request);
        if !self.is_playing() {
            self.advance().await;
        }
    }

    /// Drain the queue head-first. Terminal state is idle with an empty queue.
    async fn advance(&mut self) {
        while let Some(request) = self.queue.pop_front() {
            self.playing.store(true, Ordering::SeqCst);
            // Slider is sampled now; later changes only affect later playbacks.
            let gain = self.volume.gain();
            if let Err(e) = self.sink.play(request, gain).await {
                self.failed += 1;
                warn!(error = %e, "playback failed, advancing to next item");
            }
            self.played += 1;
        }
        self.playing.store(false, Ordering::SeqCst);
    }

    /// Pump loop: feed the scheduler from an ordered channel until it closes,
    /// draining everything queued. Returns the scheduler for final stats.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PlaybackRequest>) -> Self {
        while let Some(request) = rx.recv().await {
            self.enqueue(request).await;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Fetch sink
// ---------------------------------------------------------------------------

/// Sink that resolves the request's audio resource and speaks it.
///
/// `data:` URLs are decoded locally; `http(s)` URLs are fetched with the
/// shared client. The bytes are then decoded to samples, scaled by the
/// sampled gain, and played through the default output device on a blocking
/// thread. Requests without an audio resource complete immediately.
pub struct FetchSink {
    client: reqwest::Client,
}

impl FetchSink {
    pub fn new(client: reqwest::Client) -> Self {
        FetchSink { client }
    }
}

/// Decode the payload of a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, PlaybackError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| PlaybackError::BadDataUrl("missing data: scheme".to_string()))?;
    let (_mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| PlaybackError::BadDataUrl("not base64-encoded".to_string()))?;
    BASE64
        .decode(payload)
        .map_err(|e| PlaybackError::BadDataUrl(e.to_string()))
}

impl AudioSink for FetchSink {
    fn play(
        &mut self,
        request: PlaybackRequest,
        gain: f32,
    ) -> impl Future<Output = Result<(), PlaybackError>> + Send {
        let client = self.client.clone();
        async move {
            let Some(url) = request.audio_url else {
                debug!(text = %request.text, "no audio resource attached, completing immediately");
                return Ok(());
            };

            let bytes = if url.starts_with("data:") {
                decode_data_url(&url)?
            } else {
                let response = client.get(&url).send().await.map_err(|e| {
                    PlaybackError::Unreachable {
                        url: url.clone(),
                        detail: e.to_string(),
                    }
                })?;
                if !response.status().is_success() {
                    return Err(PlaybackError::Http {
                        status: response.status().as_u16(),
                        url,
                    });
                }
                response
                    .bytes()
                    .await
                    .map_err(|e| PlaybackError::Unreachable {
                        url: url.clone(),
                        detail: e.to_string(),
                    })?
                    .to_vec()
            };

            debug!(bytes = bytes.len(), gain, "decoding audio resource");
            // Decode and device output are CPU/device-bound; keep them off
            // the async runtime.
            tokio::task::spawn_blocking(move || {
                let (mut samples, sample_rate) = crate::audio::decode_to_mono(bytes)?;
                crate::audio::apply_gain(&mut samples, gain);
                crate::audio::play_samples(samples, sample_rate)
            })
            .await
            .map_err(|e| PlaybackError::Output(e.to_string()))??;
            Ok(())
        }
    }
}
