// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! The capture controller never touches hardware directly. It talks to three
//! capabilities that a platform layer provides:
//!
//! ```text
//! ┌──────────────────────┐
//! │  CaptureController   │  ← state machine driver
//! └──────────┬───────────┘
//!            │
//!     ┌──────┴───────┐
//!     ▼              ▼
//! ┌──────────┐  ┌──────────────┐
//! │ Media    │  │ Render       │
//! │ Devices  │  │ Surface      │
//! └────┬─────┘  └──────────────┘
//!      │ acquire
//!      ▼
//! ┌──────────┐
//! │ Media    │  ← tracks + preview feed
//! │ Stream   │
//! └──────────┘
//! ```
//!
//! [`simulated`] provides a scriptable implementation used by the CLI demo
//! and by tests.

pub mod simulated;
pub mod types;

pub use types::*;

use async_trait::async_trait;
use image::RgbaImage;
use tracing::{debug, warn};

/// Device capability used to open camera streams
///
/// Implementations run on the UI thread, hence `?Send`.
#[async_trait(?Send)]
pub trait MediaDevices {
    /// Whether the platform exposes a camera API at all
    fn is_supported(&self) -> bool;

    /// Acquire a stream matching `constraints`
    ///
    /// May suspend while the platform negotiates permission and hardware.
    ///
    /// # Returns
    /// * `Ok(stream)` - Stream opened, every track live
    /// * `Err(AcquireError::Overconstrained)` - A looser request may succeed
    /// * `Err(AcquireError)` - Any other failure
    async fn acquire(&self, constraints: &StreamConstraints)
    -> AcquireResult<Box<dyn MediaStream>>;
}

/// An acquired camera stream
pub trait MediaStream {
    /// Platform identifier of the stream
    fn id(&self) -> &str;

    /// Number of tracks that are still live
    fn live_tracks(&self) -> usize;

    /// Subscribe to the latest decoded frame
    fn preview(&self) -> PreviewReceiver;

    /// Stop every constituent track. Must be synchronous and idempotent.
    fn stop_all_tracks(&mut self);
}

/// Surface that displays a live stream and can rasterize its current frame
pub trait RenderSurface {
    /// Start displaying the given preview feed
    fn attach(&mut self, preview: PreviewReceiver);

    /// Stop displaying; idempotent
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Native dimensions of the currently decoded frame, if any
    fn frame_dimensions(&self) -> Option<Resolution>;

    /// Draw the current frame into an off-screen raster of `size`
    fn rasterize(&self, size: Resolution) -> Option<RgbaImage>;
}

/// Opaque ownership token for an acquired stream
///
/// The controller holds at most one of these. [`MediaHandle::release`] stops
/// every track; dropping an unreleased handle releases it as well and logs,
/// since that path means a flow forgot to close the camera.
pub struct MediaHandle {
    id: u64,
    level: ConstraintLevel,
    stream: Box<dyn MediaStream>,
    released: bool,
}

impl MediaHandle {
    pub fn new(id: u64, level: ConstraintLevel, stream: Box<dyn MediaStream>) -> Self {
        Self {
            id,
            level,
            stream,
            released: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Constraint level the stream was acquired with
    pub fn level(&self) -> ConstraintLevel {
        self.level
    }

    pub fn stream_id(&self) -> &str {
        self.stream.id()
    }

    pub fn preview(&self) -> PreviewReceiver {
        self.stream.preview()
    }

    /// Stop every track of the stream
    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.released {
            return;
        }
        debug!(
            handle = self.id,
            stream = %self.stream.id(),
            tracks = self.stream.live_tracks(),
            "Stopping stream tracks"
        );
        self.stream.stop_all_tracks();
        self.released = true;
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!(handle = self.id, "Media handle dropped while open, releasing");
            self.stop();
        }
    }
}

impl std::fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHandle")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("stream", &self.stream.id())
            .field("released", &self.released)
            .finish()
    }
}
