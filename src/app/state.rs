// SPDX-License-Identifier: GPL-3.0-only

//! Capture state machine
//!
//! [`transition`] is a pure function from the current [`CaptureState`] and an
//! [`Event`] to the next state plus an ordered list of [`Effect`]s. The
//! controller performs the effects against real (or simulated) hardware and
//! feeds the results back in as new events.
//!
//! ```text
//!            open                 frame ready / timeout        capture
//!   Idle ───────────▶ Starting ─────────────────────▶ Live ───────────▶ Captured
//!    ▲                   │                              │                   │
//!    │ close             │ all levels failed            │ encode failed     │ retake
//!    │                   ▼                              ▼                   │
//!    └────────────── Error ◀────────────────────────────┘                   │
//!                        │ retry (open)                                     │
//!                        └──────────────▶ Starting ◀────────────────────────┘
//! ```
//!
//! Every acquisition is tagged with an epoch. `open` and `close` bump it, and
//! results carrying an older epoch are discarded; a stream from a stale
//! acquisition is stopped as soon as it arrives. An `open` that finds a stale
//! request still outstanding moves to `Starting` and acquires once that
//! request resolves, so only one request is ever in flight.

use crate::backends::camera::{AcquireError, ConstraintLevel, Resolution};
use crate::errors::CaptureError;

/// Lifecycle phase of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No camera, nothing captured
    #[default]
    Idle,
    /// Acquisition or frame readiness pending
    Starting,
    /// Preview running
    Live,
    /// Last attempt failed; see [`CaptureState::error`]
    Error,
    /// A still was handed to the host (or one existed at mount)
    Captured,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Starting => write!(f, "starting"),
            Phase::Live => write!(f, "live"),
            Phase::Error => write!(f, "error"),
            Phase::Captured => write!(f, "captured"),
        }
    }
}

/// Identifier of a [`crate::backends::camera::MediaHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

/// Complete controller state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureState {
    pub phase: Phase,
    /// Error shown to the user, if any
    pub error: Option<CaptureError>,
    /// Open media handle
    pub handle: Option<HandleId>,
    /// Constraint level currently being tried or in use
    pub level: Option<ConstraintLevel>,
    /// Whether an acquisition request is outstanding
    pub acquiring: bool,
    /// An `open` arrived while a superseded request was still outstanding;
    /// acquisition starts once that request resolves
    pub reopen_pending: bool,
    pub epoch: u64,
}

impl CaptureState {
    /// State for a host that already has a picture
    pub fn showing_existing() -> Self {
        Self {
            phase: Phase::Captured,
            ..Self::default()
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User or auto-start asked for the camera
    Open { supported: bool },
    /// An acquisition resolved with a stream
    Acquired {
        epoch: u64,
        level: ConstraintLevel,
        handle: HandleId,
    },
    /// An acquisition failed
    AcquireFailed {
        epoch: u64,
        level: ConstraintLevel,
        error: AcquireError,
    },
    /// First frame decoded
    FrameReady { epoch: u64 },
    /// Readiness fallback timer fired
    ReadinessTimedOut { epoch: u64 },
    /// Capture requested; carries the decoded frame dimensions, if any
    Capture { frame: Option<Resolution> },
    /// The snapshot was encoded and is ready for the host
    Encoded,
    /// The snapshot could not be rasterized or encoded
    EncodeFailed { message: String },
    /// Release the camera (explicit close, unmount, navigation)
    Close,
    /// Discard the picture and start over
    Retake { supported: bool },
}

/// Side effects requested by a transition, performed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Request a stream at `level`
    Acquire { epoch: u64, level: ConstraintLevel },
    /// Show the stream on the render surface
    AttachRenderer(HandleId),
    /// Wait for the first frame, bounded by the readiness timeout
    ArmReadinessTimer { epoch: u64 },
    /// Stop every track of the handle
    StopTracks(HandleId),
    /// Remove the stream from the render surface
    DetachRenderer,
    /// Rasterize and encode the current frame
    Snapshot(Resolution),
    /// Hand the encoded still to the host
    EmitImage,
    /// Tell the host its picture was discarded
    ClearImage,
}

/// Result of [`transition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: CaptureState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &CaptureState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }
}

/// Compute the next state and effects for `event`
pub fn transition(state: &CaptureState, event: Event) -> Transition {
    match event {
        Event::Open { supported } => open(state, supported),
        Event::Acquired {
            epoch,
            level,
            handle,
        } => acquired(state, epoch, level, handle),
        Event::AcquireFailed {
            epoch,
            level,
            error,
        } => acquire_failed(state, epoch, level, error),
        Event::FrameReady { epoch } | Event::ReadinessTimedOut { epoch } => {
            if epoch == state.epoch && state.phase == Phase::Starting && state.handle.is_some() {
                let mut next = state.clone();
                next.phase = Phase::Live;
                Transition {
                    state: next,
                    effects: Vec::new(),
                }
            } else {
                Transition::unchanged(state)
            }
        }
        Event::Capture { frame } => capture(state, frame),
        Event::Encoded => {
            if state.phase != Phase::Live {
                return Transition::unchanged(state);
            }
            let mut next = state.clone();
            let mut effects = vec![Effect::EmitImage];
            release(&mut next, &mut effects);
            next.phase = Phase::Captured;
            next.error = None;
            next.level = None;
            next.epoch += 1;
            Transition {
                state: next,
                effects,
            }
        }
        Event::EncodeFailed { message } => {
            if state.phase != Phase::Live {
                return Transition::unchanged(state);
            }
            let mut next = state.clone();
            let mut effects = Vec::new();
            release(&mut next, &mut effects);
            next.phase = Phase::Error;
            next.error = Some(CaptureError::Unknown(message));
            next.level = None;
            next.epoch += 1;
            Transition {
                state: next,
                effects,
            }
        }
        Event::Close => close(state),
        Event::Retake { supported } => {
            let closed = close(state);
            let opened = open(&closed.state, supported);
            let mut effects = vec![Effect::ClearImage];
            effects.extend(closed.effects);
            effects.extend(opened.effects);
            Transition {
                state: opened.state,
                effects,
            }
        }
    }
}

/// Move the open handle (if any) into release effects
fn release(next: &mut CaptureState, effects: &mut Vec<Effect>) {
    if let Some(handle) = next.handle.take() {
        effects.push(Effect::StopTracks(handle));
        effects.push(Effect::DetachRenderer);
    }
}

fn open(state: &CaptureState, supported: bool) -> Transition {
    if matches!(state.phase, Phase::Starting | Phase::Live) {
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    let mut effects = Vec::new();
    release(&mut next, &mut effects);
    next.epoch += 1;

    if !supported {
        next.phase = Phase::Error;
        next.error = Some(CaptureError::Unsupported);
        next.level = None;
        next.reopen_pending = false;
    } else if state.acquiring {
        // One request at a time: wait for the superseded one to resolve
        next.phase = Phase::Starting;
        next.error = None;
        next.level = Some(ConstraintLevel::first());
        next.reopen_pending = true;
    } else {
        let level = ConstraintLevel::first();
        next.phase = Phase::Starting;
        next.error = None;
        next.level = Some(level);
        next.acquiring = true;
        effects.push(Effect::Acquire {
            epoch: next.epoch,
            level,
        });
    }

    Transition {
        state: next,
        effects,
    }
}

/// Issue the acquisition deferred by an `open` that found a request in flight
fn resume_reopen(next: &mut CaptureState, effects: &mut Vec<Effect>) {
    if !next.reopen_pending || next.phase != Phase::Starting {
        return;
    }
    let level = ConstraintLevel::first();
    next.reopen_pending = false;
    next.acquiring = true;
    next.level = Some(level);
    effects.push(Effect::Acquire {
        epoch: next.epoch,
        level,
    });
}

fn acquired(
    state: &CaptureState,
    epoch: u64,
    level: ConstraintLevel,
    handle: HandleId,
) -> Transition {
    let mut next = state.clone();
    next.acquiring = false;

    if epoch != state.epoch || state.phase != Phase::Starting || state.handle.is_some() {
        // Nobody wants this stream any more
        let mut effects = vec![Effect::StopTracks(handle)];
        resume_reopen(&mut next, &mut effects);
        return Transition {
            state: next,
            effects,
        };
    }

    next.handle = Some(handle);
    next.level = Some(level);
    Transition {
        state: next,
        effects: vec![
            Effect::AttachRenderer(handle),
            Effect::ArmReadinessTimer { epoch },
        ],
    }
}

fn acquire_failed(
    state: &CaptureState,
    epoch: u64,
    level: ConstraintLevel,
    error: AcquireError,
) -> Transition {
    let mut next = state.clone();
    next.acquiring = false;

    if epoch != state.epoch || state.phase != Phase::Starting {
        let mut effects = Vec::new();
        resume_reopen(&mut next, &mut effects);
        return Transition {
            state: next,
            effects,
        };
    }

    if error.is_negotiation_failure()
        && let Some(looser) = level.next()
    {
        next.level = Some(looser);
        next.acquiring = true;
        return Transition {
            state: next,
            effects: vec![Effect::Acquire {
                epoch,
                level: looser,
            }],
        };
    }

    let mut effects = Vec::new();
    release(&mut next, &mut effects);
    next.phase = Phase::Error;
    next.error = Some(CaptureError::from_acquire(error));
    next.level = None;
    Transition {
        state: next,
        effects,
    }
}

fn capture(state: &CaptureState, frame: Option<Resolution>) -> Transition {
    if state.phase != Phase::Live {
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    match frame {
        Some(size) if !size.is_empty() => {
            next.error = None;
            Transition {
                state: next,
                effects: vec![Effect::Snapshot(size)],
            }
        }
        _ => {
            next.error = Some(CaptureError::CaptureNotReady);
            Transition {
                state: next,
                effects: Vec::new(),
            }
        }
    }
}

fn close(state: &CaptureState) -> Transition {
    let mut next = state.clone();
    let mut effects = Vec::new();
    release(&mut next, &mut effects);
    next.phase = Phase::Idle;
    next.error = None;
    next.level = None;
    next.reopen_pending = false;
    next.epoch += 1;
    Transition {
        state: next,
        effects,
    }
}
