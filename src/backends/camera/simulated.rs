// SPDX-License-Identifier: GPL-3.0-only

//! Scriptable camera backend
//!
//! Stands in for real hardware in the CLI demo and in tests. Each call to
//! [`SimulatedCamera::acquire`] consumes the next scripted outcome (or the
//! default one when the script is empty). Every stream it hands out is
//! accounted for in a shared [`StreamLedger`], so callers can check that no
//! stream outlives its flow.

use super::{
    AcquireError, AcquireResult, MediaDevices, MediaStream, PreviewReceiver, PreviewSender,
    Resolution, StreamConstraints, VideoFrame,
};
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What a single acquisition attempt does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Hand out a stream
    Grant,
    /// Fail with the given error
    Fail(AcquireError),
}

/// Whether granted streams ever decode a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePolicy {
    /// A synthetic frame of this size is available as soon as the stream opens
    Immediate(Resolution),
    /// The stream opens but never decodes a frame
    Never,
}

#[derive(Debug, Default)]
struct LedgerCounters {
    open: AtomicUsize,
    peak: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    attempts: AtomicUsize,
}

/// Shared bookkeeping of streams handed out by a [`SimulatedCamera`]
#[derive(Debug, Clone, Default)]
pub struct StreamLedger {
    counters: Arc<LedgerCounters>,
}

impl StreamLedger {
    /// Streams currently open
    pub fn open_streams(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    /// Highest number of streams that were open at the same time
    pub fn peak_open(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Total streams granted
    pub fn acquisitions(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    /// Total streams stopped
    pub fn releases(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Total acquisition attempts, granted or not
    pub fn attempts(&self) -> usize {
        self.counters.attempts.load(Ordering::SeqCst)
    }

    fn record_attempt(&self) {
        self.counters.attempts.fetch_add(1, Ordering::SeqCst);
    }

    fn record_open(&self) {
        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(open, Ordering::SeqCst);
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn record_release(&self) {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Simulated camera device
pub struct SimulatedCamera {
    supported: bool,
    script: RefCell<VecDeque<AttemptOutcome>>,
    default_outcome: AttemptOutcome,
    frames: FramePolicy,
    delay: Duration,
    ledger: StreamLedger,
    requests: RefCell<Vec<StreamConstraints>>,
}

impl SimulatedCamera {
    /// A working front camera delivering 640x480 frames
    pub fn new() -> Self {
        Self {
            supported: true,
            script: RefCell::new(VecDeque::new()),
            default_outcome: AttemptOutcome::Grant,
            frames: FramePolicy::Immediate(Resolution::new(640, 480)),
            delay: Duration::ZERO,
            ledger: StreamLedger::default(),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Report the camera API as missing
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Queue outcomes for the next acquisition attempts
    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = AttemptOutcome>) -> Self {
        self.script.borrow_mut().extend(outcomes);
        self
    }

    /// Outcome used once the script runs out
    pub fn with_default(mut self, outcome: AttemptOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    pub fn with_frames(mut self, frames: FramePolicy) -> Self {
        self.frames = frames;
        self
    }

    /// Suspend every acquisition for `delay` before resolving
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Append outcomes after construction (e.g. between retries)
    pub fn push_outcomes(&self, outcomes: impl IntoIterator<Item = AttemptOutcome>) {
        self.script.borrow_mut().extend(outcomes);
    }

    pub fn ledger(&self) -> StreamLedger {
        self.ledger.clone()
    }

    /// Constraints of every acquisition attempt so far, in order
    pub fn requests(&self) -> Vec<StreamConstraints> {
        self.requests.borrow().clone()
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl MediaDevices for SimulatedCamera {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> AcquireResult<Box<dyn MediaStream>> {
        self.ledger.record_attempt();
        self.requests.borrow_mut().push(constraints.clone());
        let outcome = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone());

        debug!(constraints = %constraints, outcome = ?outcome, "Simulated acquisition");

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if !self.supported {
            return Err(AcquireError::NotSupported);
        }

        match outcome {
            AttemptOutcome::Grant => {
                let stream = SimulatedStream::open(self.frames, self.ledger.clone());
                info!(stream = %stream.id, "Simulated stream opened");
                Ok(Box::new(stream))
            }
            AttemptOutcome::Fail(err) => Err(err),
        }
    }
}

struct SimulatedTrack {
    label: String,
    live: bool,
}

/// Stream handed out by [`SimulatedCamera`]
pub struct SimulatedStream {
    id: String,
    tracks: Vec<SimulatedTrack>,
    feed: PreviewSender,
    ledger: StreamLedger,
    stopped: bool,
}

impl SimulatedStream {
    fn open(frames: FramePolicy, ledger: StreamLedger) -> Self {
        let first = match frames {
            FramePolicy::Immediate(size) => Some(synthetic_frame(size)),
            FramePolicy::Never => None,
        };
        let (feed, _) = tokio::sync::watch::channel(first);
        ledger.record_open();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks: vec![SimulatedTrack {
                label: "Simulated Camera".to_string(),
                live: true,
            }],
            feed,
            ledger,
            stopped: false,
        }
    }
}

impl MediaStream for SimulatedStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.live).count()
    }

    fn preview(&self) -> PreviewReceiver {
        self.feed.subscribe()
    }

    fn stop_all_tracks(&mut self) {
        for track in &mut self.tracks {
            if track.live {
                debug!(stream = %self.id, track = %track.label, "Stopping track");
                track.live = false;
            }
        }
        self.feed.send_replace(None);
        if !self.stopped {
            self.stopped = true;
            self.ledger.record_release();
        }
    }
}

/// Diagonal RGBA gradient used as the simulated camera image
pub fn synthetic_frame(size: Resolution) -> VideoFrame {
    let mut data = Vec::with_capacity(size.pixel_count() * 4);
    let w = size.width.max(1);
    let h = size.height.max(1);
    for y in 0..size.height {
        for x in 0..size.width {
            data.push((x * 255 / w) as u8);
            data.push((y * 255 / h) as u8);
            data.push(((x + y) * 255 / (w + h)) as u8);
            data.push(255);
        }
    }

    VideoFrame {
        width: size.width,
        height: size.height,
        data: Arc::from(data.into_boxed_slice()),
        captured_at: Instant::now(),
    }
}
