// SPDX-License-Identifier: MPL-2.0

//! Profile Camera - live selfie capture for the profile completion wizard
//!
//! This library provides the camera capture controller behind the
//! "Profile Picture (Selfie)" step: acquiring a camera stream with constraint
//! fallback, previewing it, capturing a still as a JPEG data URI, and making
//! sure the camera is released whenever it is not actively previewing.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Capture state machine, controller and the host step
//! - [`backends`]: Camera capability traits and a simulated camera
//! - [`pipelines`]: Still processing and JPEG encoding
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let camera = SimulatedCamera::new();
//! let controller = CaptureController::new(
//!     camera,
//!     PreviewSurface::new(),
//!     Config::default(),
//!     None,
//!     |update| println!("{} updated", update.name),
//! );
//! controller.on_mount().await;
//! controller.capture()?;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;

// Re-export commonly used types
pub use app::{CaptureController, CaptureOutcome, FieldUpdate, Phase, PreviewSurface, ProfileStep};
pub use config::Config;
pub use constants::ResolutionPreset;
pub use errors::{CaptureError, CaptureResult};
