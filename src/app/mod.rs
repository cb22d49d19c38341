// SPDX-License-Identifier: MPL-2.0

//! Profile picture step and its camera capture controller
//!
//! # Architecture
//!
//! - `state`: Pure capture state machine (phases, events, effects)
//! - `controller`: Drives the state machine against camera capabilities
//! - `camera_preview`: Headless render surface for the live preview
//! - `step`: Host-side form fields, upload alternative and validation
//!
//! # Main Types
//!
//! - `CaptureController`: Owns the camera while previewing, emits the selfie
//! - `ProfileStep`: Receives `profilePic` updates from the controller

mod camera_preview;
mod controller;
mod state;
mod step;

pub use camera_preview::PreviewSurface;
pub use controller::{CaptureController, CaptureOutcome, FieldSink, FieldUpdate};
pub use state::{CaptureState, Effect, Event, HandleId, Phase, Transition, transition};
pub use step::{ProfileStep, StepErrors};
