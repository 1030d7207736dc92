//! Tests for the playback scheduler — FIFO order under bursts, single
//! playback in flight, and forward progress when the sink fails.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use tokio::sync::mpsc;

use livedesk::playback::{
    AudioScheduler, AudioSink, PlaybackError, PlaybackRequest, VolumeControl,
};

fn req(text: &str) -> PlaybackRequest {
    PlaybackRequest {
        text: text.to_string(),
        voice_style: None,
        audio_url: None,
    }
}

/// Sink that sleeps per playback and tracks how many are in flight at once.
struct SlowSink {
    log: Arc<Mutex<Vec<String>>>,
    inflight: Arc<AtomicUsize>,
    max_inflight: Arc<AtomicUsize>,
    delay: Duration,
}

impl SlowSink {
    fn new(delay: Duration) -> Self {
        SlowSink {
            log: Arc::new(Mutex::new(Vec::new())),
            inflight: Arc::new(AtomicUsize::new(0)),
            max_inflight: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }
}

impl AudioSink for SlowSink {
    fn play(
        &mut self,
        request: PlaybackRequest,
        _gain: f32,
    ) -> impl Future<Output = Result<(), PlaybackError>> + Send {
        let log = Arc::clone(&self.log);
        let inflight = Arc::clone(&self.inflight);
        let max_inflight = Arc::clone(&self.max_inflight);
        let delay = self.delay;
        async move {
            let now = inflight.fetch_add(1, Ordering::SeqCst) + 1;
            max_inflight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            log.lock().unwrap().push(request.text);
            inflight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

/// Sink that fails every playback whose text is in the deny list.
struct FlakySink {
    log: Arc<Mutex<Vec<String>>>,
    fail_texts: Vec<String>,
}

impl AudioSink for FlakySink {
    fn play(
        &mut self,
        request: PlaybackRequest,
        _gain: f32,
    ) -> impl Future<Output = Result<(), PlaybackError>> + Send {
        let log = Arc::clone(&self.log);
        let fail = self.fail_texts.contains(&request.text);
        async move {
            log.lock().unwrap().push(request.text);
            if fail {
                Err(PlaybackError::Unreachable {
                    url: "test://audio".to_string(),
                    detail: "scripted failure".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Burst handling
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_burst_plays_in_arrival_order() {
    let sink = SlowSink::new(Duration::from_millis(500));
    let log = Arc::clone(&sink.log);
    let scheduler = AudioScheduler::new(sink, VolumeControl::new(100));

    let (tx, rx) = mpsc::unbounded_channel();
    // All five arrive before the first playback can finish.
    for t in ["r1", "r2", "r3", "r4", "r5"] {
        tx.send(req(t)).unwrap();
    }
    drop(tx);

    let scheduler = scheduler.run(rx).await;
    assert_eq!(
        *log.lock().unwrap(),
        vec!["r1", "r2", "r3", "r4", "r5"]
    );
    assert_eq!(scheduler.played(), 5);
    assert!(!scheduler.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_burst_never_overlaps_playbacks() {
    let sink = SlowSink::new(Duration::from_millis(200));
    let max_inflight = Arc::clone(&sink.max_inflight);
    let scheduler = AudioScheduler::new(sink, VolumeControl::new(100));

    let (tx, rx) = mpsc::unbounded_channel();
    for i in 0..10 {
        tx.send(req(&format!("r{}", i))).unwrap();
    }
    drop(tx);

    scheduler.run(rx).await;
    assert_eq!(max_inflight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_items_sent_mid_playback_queue_behind() {
    let sink = SlowSink::new(Duration::from_millis(300));
    let log = Arc::clone(&sink.log);
    let scheduler = AudioScheduler::new(sink, VolumeControl::new(100));

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(scheduler.run(rx));

    tx.send(req("first")).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    // The first playback is mid-flight; these must wait their turn.
    tx.send(req("second")).unwrap();
    tx.send(req("third")).unwrap();
    drop(tx);

    let scheduler = handle.await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    assert_eq!(scheduler.played(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_playing_flag_tracks_in_flight_playback() {
    let sink = SlowSink::new(Duration::from_millis(300));
    let scheduler = AudioScheduler::new(sink, VolumeControl::new(100));
    let playing = scheduler.playing_flag();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(scheduler.run(rx));

    assert!(!playing.load(Ordering::SeqCst));
    tx.send(req("only")).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(playing.load(Ordering::SeqCst));

    drop(tx);
    handle.await.unwrap();
    assert!(!playing.load(Ordering::SeqCst));
}

// ---------------------------------------------------------------------------
// Liveness under failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failure_does_not_stall_queue() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = FlakySink {
        log: Arc::clone(&log),
        fail_texts: vec!["bad1".to_string(), "bad2".to_string()],
    };
    let scheduler = AudioScheduler::new(sink, VolumeControl::new(100));

    let (tx, rx) = mpsc::unbounded_channel();
    for t in ["ok1", "bad1", "ok2", "bad2", "ok3"] {
        tx.send(req(t)).unwrap();
    }
    drop(tx);

    let scheduler = scheduler.run(rx).await;
    assert_eq!(
        *log.lock().unwrap(),
        vec!["ok1", "bad1", "ok2", "bad2", "ok3"]
    );
    assert_eq!(scheduler.played(), 5);
    assert_eq!(scheduler.failed(), 2);
    assert!(!scheduler.is_playing());
}

#[tokio::test]
async fn test_leading_failure_still_reaches_tail() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = FlakySink {
        log: Arc::clone(&log),
        fail_texts: vec!["bad".to_string()],
    };
    let scheduler = AudioScheduler::new(sink, VolumeControl::new(100));

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(req("bad")).unwrap();
    tx.send(req("tail")).unwrap();
    drop(tx);

    let scheduler = scheduler.run(rx).await;
    assert_eq!(log.lock().unwrap().last().unwrap(), "tail");
    assert_eq!(scheduler.failed(), 1);
}

// ---------------------------------------------------------------------------
// Volume sampling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_volume_change_applies_to_later_playbacks_only() {
    struct GainSink {
        gains: Arc<Mutex<Vec<f32>>>,
    }
    impl AudioSink for GainSink {
        fn play(
            &mut self,
            _request: PlaybackRequest,
            gain: f32,
        ) -> impl Future<Output = Result<(), PlaybackError>> + Send {
            let gains = Arc::clone(&self.gains);
            async move {
                gains.lock().unwrap().push(gain);
                Ok(())
            }
        }
    }

    let gains = Arc::new(Mutex::new(Vec::new()));
    let volume = VolumeControl::new(80);
    let mut scheduler = AudioScheduler::new(
        GainSink {
            gains: Arc::clone(&gains),
        },
        volume.clone(),
    );

    scheduler.enqueue(req("a")).await;
    volume.set(40);
    scheduler.enqueue(req("b")).await;

    let gains = gains.lock().unwrap();
    assert!((gains[0] - 0.8).abs() < 1e-6);
    assert!((gains[1] - 0.4).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// FIFO holds under arbitrary failure patterns
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_fifo_order_with_random_failures(mask in proptest::collection::vec(any::<bool>(), 1..20)) {
        let texts: Vec<String> = (0..mask.len()).map(|i| format!("item{}", i)).collect();
        let fail_texts: Vec<String> = texts
            .iter()
            .zip(&mask)
            .filter(|(_, fail)| **fail)
            .map(|(t, _)| t.clone())
            .collect();
        let expected_failures = fail_texts.len() as u64;

        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = FlakySink {
            log: Arc::clone(&log),
            fail_texts,
        };
        let scheduler = AudioScheduler::new(sink, VolumeControl::new(100));

        let (tx, rx) = mpsc::unbounded_channel();
        for t in &texts {
            tx.send(req(t)).unwrap();
        }
        drop(tx);

        let scheduler = tokio_test::block_on(scheduler.run(rx));
        prop_assert_eq!(&*log.lock().unwrap(), &texts);
        prop_assert_eq!(scheduler.played(), texts.len() as u64);
        prop_assert_eq!(scheduler.failed(), expected_failures);
        prop_assert!(!scheduler.is_playing());
    }
}
