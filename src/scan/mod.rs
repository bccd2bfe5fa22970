//! Capture/decode loop.
//!
//! A scheduler thread owns the frame source and ticks at the configured
//! interval. Each captured frame is handed to a decode worker; while a decode
//! is in flight further ticks are skipped, so decodes never overlap. A
//! successful decode opens a cooldown window during which nothing is captured,
//! and the resulting `ScanEvent` is delivered to the caller's callback on the
//! worker thread, never on the scheduler.
//!
//! States: `Idle` → `Capturing` (tick fires, nothing in flight);
//! `Capturing` → `Idle` (no frame, no payload, or decode error);
//! `Capturing` → `CoolingDown` (payload found); `CoolingDown` → `Idle`
//! (window elapsed); any state → `Stopped`.

pub(crate) mod signal;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::decode::Decoder;
use crate::frame::Frame;
use crate::ingest::FrameSource;

use self::signal::{InFlightGuard, StopSignal};

/// Lower bound on the capture interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(333);
/// Quiet period after each detection.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);
/// Upper bound on both the interval and the cooldown.
pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    pub interval: Duration,
    pub cooldown: Duration,
}

impl ScanConfig {
    /// Interval below [`MIN_INTERVAL`] is raised to it; both values are
    /// capped at [`MAX_WINDOW`].
    pub fn new(interval: Duration, cooldown: Duration) -> Self {
        Self {
            interval: interval.clamp(MIN_INTERVAL, MAX_WINDOW),
            cooldown: cooldown.min(MAX_WINDOW),
        }
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self::new(interval, DEFAULT_COOLDOWN)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL, DEFAULT_COOLDOWN)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ScanState {
    Idle = 0,
    Capturing = 1,
    CoolingDown = 2,
    Stopped = 3,
}

impl ScanState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ScanState::Idle,
            1 => ScanState::Capturing,
            2 => ScanState::CoolingDown,
            _ => ScanState::Stopped,
        }
    }
}

/// A debounced detection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanEvent {
    pub text: String,
    pub timestamp: SystemTime,
    /// Monotonic detection time, taken before the cooldown window opens.
    #[serde(skip)]
    pub detected_at: Instant,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub ticks: u64,
    pub frames: u64,
    pub decodes: u64,
    pub events: u64,
    /// Ticks skipped because a decode was still in flight.
    pub skipped_in_flight: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    frames: AtomicU64,
    decodes: AtomicU64,
    events: AtomicU64,
    skipped_in_flight: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ScanStats {
        ScanStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            decodes: self.decodes.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            skipped_in_flight: self.skipped_in_flight.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct Shared {
    stop: StopSignal,
    in_flight: Arc<AtomicBool>,
    state: AtomicU8,
    cooldown_until: Mutex<Option<Instant>>,
    counters: Counters,
}

impl Shared {
    fn new() -> Self {
        Self {
            stop: StopSignal::default(),
            in_flight: Arc::new(AtomicBool::new(false)),
            state: AtomicU8::new(ScanState::Idle as u8),
            cooldown_until: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    fn set_state(&self, state: ScanState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn cooldown_remaining(&self) -> Option<Duration> {
        let until = *self.cooldown_until.lock().unwrap_or_else(|p| p.into_inner());
        until.and_then(|until| until.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    fn begin_cooldown(&self, window: Duration) {
        let mut until = self.cooldown_until.lock().unwrap_or_else(|p| p.into_inner());
        *until = Some(Instant::now() + window.min(MAX_WINDOW));
    }
}

struct DecodeJob {
    frame: Frame,
    _slot: InFlightGuard,
}

/// A frame source and decoder ready to be driven.
pub struct ScanLoop {
    source: Box<dyn FrameSource>,
    decoder: Arc<dyn Decoder>,
}

impl ScanLoop {
    pub fn new(source: Box<dyn FrameSource>, decoder: Arc<dyn Decoder>) -> Self {
        Self { source, decoder }
    }

    /// Start scanning in the background. `on_event` runs once per detection
    /// on the decode worker thread.
    ///
    /// `on_event` must not stop the returned handle: `stop` joins the thread
    /// the callback runs on.
    pub fn start<F>(self, config: ScanConfig, on_event: F) -> Result<ScanHandle>
    where
        F: FnMut(ScanEvent) + Send + 'static,
    {
        if !self.source.is_open() {
            return Err(anyhow!("frame source {} is not open", self.source.describe()));
        }
        let config = ScanConfig::new(config.interval, config.cooldown);
        let shared = Arc::new(Shared::new());
        let (job_tx, job_rx) = mpsc::sync_channel::<DecodeJob>(1);

        let worker = {
            let shared = shared.clone();
            let decoder = self.decoder.clone();
            std::thread::Builder::new()
                .name("qr-decode".into())
                .spawn(move || run_worker(job_rx, decoder, config, shared, on_event))
                .context("spawn decode worker")?
        };

        let description = self.source.describe();
        let scheduler = {
            let shared = shared.clone();
            let source = self.source;
            std::thread::Builder::new()
                .name("qr-scan".into())
                .spawn(move || run_scheduler(source, job_tx, config, shared))
        };
        let scheduler = match scheduler {
            Ok(join) => join,
            Err(err) => {
                shared.stop.trigger();
                let _ = worker.join();
                return Err(anyhow!("spawn scan scheduler: {}", err));
            }
        };

        log::info!(
            "scan loop started on {} (interval {:?}, cooldown {:?}, decoder {})",
            description,
            config.interval,
            config.cooldown,
            self.decoder.name()
        );
        Ok(ScanHandle {
            shared,
            scheduler: Some(scheduler),
            worker: Some(worker),
            source: None,
        })
    }
}

/// Running scan loop. Dropping the handle stops the loop.
pub struct ScanHandle {
    shared: Arc<Shared>,
    scheduler: Option<JoinHandle<Box<dyn FrameSource>>>,
    worker: Option<JoinHandle<()>>,
    source: Option<Box<dyn FrameSource>>,
}

impl ScanHandle {
    /// Stop the loop and wait for both threads. No callback runs after this
    /// returns. Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        self.shared.stop.trigger();
        let mut panicked = None;
        if let Some(join) = self.scheduler.take() {
            match join.join() {
                Ok(source) => self.source = Some(source),
                Err(_) => panicked = Some("scan scheduler thread panicked"),
            }
        }
        if let Some(join) = self.worker.take() {
            if join.join().is_err() {
                panicked = panicked.or(Some("decode worker thread panicked"));
            }
        }
        self.shared.set_state(ScanState::Stopped);
        match panicked {
            Some(msg) => Err(anyhow!(msg)),
            None => Ok(()),
        }
    }

    /// Stop, then hand the frame source back for reuse or a device switch.
    pub fn into_source(mut self) -> Result<Box<dyn FrameSource>> {
        self.stop()?;
        self.source
            .take()
            .ok_or_else(|| anyhow!("frame source was lost with the scan scheduler"))
    }

    pub fn state(&self) -> ScanState {
        ScanState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_decoding(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some() && !self.shared.stop.is_set()
    }

    pub fn stats(&self) -> ScanStats {
        self.shared.counters.snapshot()
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("scan loop shutdown: {}", err);
        }
    }
}

fn run_scheduler(
    mut source: Box<dyn FrameSource>,
    jobs: SyncSender<DecodeJob>,
    config: ScanConfig,
    shared: Arc<Shared>,
) -> Box<dyn FrameSource> {
    let counters = &shared.counters;
    while !shared.stop.is_set() {
        if let Some(left) = shared.cooldown_remaining() {
            if shared.stop.wait(left) {
                break;
            }
            shared.set_state(ScanState::Idle);
            continue;
        }

        let tick = Instant::now();
        counters.ticks.fetch_add(1, Ordering::Relaxed);
        match InFlightGuard::try_acquire(&shared.in_flight) {
            None => {
                counters.skipped_in_flight.fetch_add(1, Ordering::Relaxed);
            }
            // A decode may have finished between the cooldown check and the
            // acquire; its window is visible once the slot is ours.
            Some(slot) if shared.cooldown_remaining().is_some() => {
                drop(slot);
                continue;
            }
            Some(slot) => {
                shared.set_state(ScanState::Capturing);
                match source.get_frame() {
                    Ok(Some(frame)) => {
                        counters.frames.fetch_add(1, Ordering::Relaxed);
                        if jobs.send(DecodeJob { frame, _slot: slot }).is_err() {
                            log::error!("decode worker is gone; stopping scan loop");
                            break;
                        }
                    }
                    Ok(None) => {
                        drop(slot);
                        shared.set_state(ScanState::Idle);
                    }
                    Err(err) => {
                        drop(slot);
                        log::debug!("capture from {} failed: {:#}", source.describe(), err);
                        shared.set_state(ScanState::Idle);
                    }
                }
            }
        }

        let spent = tick.elapsed();
        if spent < config.interval && shared.stop.wait(config.interval - spent) {
            break;
        }
    }
    drop(jobs);
    shared.set_state(ScanState::Stopped);
    log::info!("scan loop stopped ({})", source.describe());
    source
}

fn run_worker<F>(
    jobs: Receiver<DecodeJob>,
    decoder: Arc<dyn Decoder>,
    config: ScanConfig,
    shared: Arc<Shared>,
    mut on_event: F,
) where
    F: FnMut(ScanEvent),
{
    for job in jobs {
        shared.counters.decodes.fetch_add(1, Ordering::Relaxed);
        let DecodeJob { frame, _slot } = job;
        let outcome = catch_unwind(AssertUnwindSafe(|| decoder.decode(&frame)));
        let text = match outcome {
            Ok(Ok(result)) => result.into_payload(),
            Ok(Err(err)) => {
                log::debug!("decode failed: {:#}", err);
                None
            }
            Err(_) => {
                log::warn!("decoder {} panicked; frame skipped", decoder.name());
                None
            }
        };

        let Some(text) = text else {
            if !shared.stop.is_set() {
                shared.set_state(ScanState::Idle);
            }
            continue;
        };

        let event = ScanEvent {
            text,
            timestamp: SystemTime::now(),
            detected_at: Instant::now(),
        };
        // The window is recorded before the slot is released so the next
        // tick already sees it.
        shared.begin_cooldown(config.cooldown);
        shared.set_state(ScanState::CoolingDown);
        drop(_slot);

        shared.counters.events.fetch_add(1, Ordering::Relaxed);
        log::debug!("detection ({} bytes)", event.text.len());
        if shared.stop.is_set() {
            continue;
        }
        on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_clamped_to_floor() {
        let cfg = ScanConfig::new(Duration::from_millis(1), DEFAULT_COOLDOWN);
        assert_eq!(cfg.interval, MIN_INTERVAL);
        let cfg = ScanConfig::with_interval(Duration::from_millis(500));
        assert_eq!(cfg.interval, Duration::from_millis(500));
        assert_eq!(cfg.cooldown, DEFAULT_COOLDOWN);
    }

    #[test]
    fn oversized_windows_are_capped() {
        let cfg = ScanConfig::new(Duration::MAX, Duration::MAX);
        assert_eq!(cfg.interval, MAX_WINDOW);
        assert_eq!(cfg.cooldown, MAX_WINDOW);
    }

    #[test]
    fn huge_cooldown_does_not_overflow_deadline() {
        let shared = Shared::new();
        shared.begin_cooldown(Duration::MAX);
        let left = shared.cooldown_remaining().expect("cooling down");
        assert!(left <= MAX_WINDOW);
    }

    #[test]
    fn state_round_trips_through_atomic() {
        for state in [
            ScanState::Idle,
            ScanState::Capturing,
            ScanState::CoolingDown,
            ScanState::Stopped,
        ] {
            assert_eq!(ScanState::from_u8(state as u8), state);
        }
    }
}
