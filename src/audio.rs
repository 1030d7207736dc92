//! Audio decode and output: compressed bytes in, speaker playback out.
//!
//! ## Design
//! - `decode_to_mono` probes the container with symphonia, decodes every
//!   packet to f32, and downmixes to mono. Corrupt packets are skipped, a
//!   stream with nothing decodable is an error.
//! - `apply_gain` scales the decoded samples; this is where the volume
//!   slider actually lands.
//! - `play_samples` drives the default cpal output device and blocks until
//!   the buffer drains, so it must run on a blocking thread, never on the
//!   async runtime.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::error;

use crate::playback::PlaybackError;

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode an in-memory audio resource to mono f32 samples.
///
/// Returns the samples and their source sample rate. Multi-channel audio is
/// averaged down to one channel.
pub fn decode_to_mono(bytes: Vec<u8>) -> Result<(Vec<f32>, u32), PlaybackError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::Decode(format!("unrecognized audio container: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| PlaybackError::Decode("no audio track".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| PlaybackError::Decode("unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PlaybackError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // A corrupt packet loses a few frames, not the whole playback.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(PlaybackError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        if channels <= 1 {
            samples.extend_from_slice(buf.samples());
        } else {
            for frame in buf.samples().chunks_exact(channels) {
                samples.push(frame.iter().sum::<f32>() / channels as f32);
            }
        }
    }

    if samples.is_empty() {
        return Err(PlaybackError::Decode("no decodable audio".to_string()));
    }
    Ok((samples, sample_rate))
}

/// Scale samples by the slider-derived gain (clamped to 0.0–1.0).
pub fn apply_gain(samples: &mut [f32], gain: f32) {
    let gain = gain.clamp(0.0, 1.0);
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

struct OutputBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}

/// Play mono samples through the default output device, blocking until done.
pub fn play_samples(samples: Vec<f32>, sample_rate: u32) -> Result<(), PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::Output("no default output device".to_string()))?;

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let buffer = Arc::new(Mutex::new(OutputBuffer {
        samples,
        position: 0,
        finished: false,
    }));
    let callback_buffer = Arc::clone(&buffer);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut buf = match callback_buffer.lock() {
                    Ok(b) => b,
                    Err(_) => return,
                };
                for sample in data.iter_mut() {
                    if buf.position < buf.samples.len() {
                        *sample = buf.samples[buf.position];
                        buf.position += 1;
                    } else {
                        *sample = 0.0;
                        buf.finished = true;
                    }
                }
            },
            move |err| {
                error!(error = %err, "audio output stream error");
            },
            None,
        )
        .map_err(|e| PlaybackError::Output(format!("failed to build output stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| PlaybackError::Output(format!("failed to start output stream: {}", e)))?;

    loop {
        std::thread::sleep(std::time::Duration::from_millis(10));
        let buf = buffer
            .lock()
            .map_err(|e| PlaybackError::Output(format!("output buffer lock poisoned: {}", e)))?;
        if buf.finished {
            break;
        }
    }

    drop(stream);
    Ok(())
}
