// SPDX-License-Identifier: GPL-3.0-only

//! Camera capture controller
//!
//! Drives the pure state machine in [`super::state`] against a
//! [`MediaDevices`] implementation and a [`RenderSurface`]. The controller is
//! single-threaded: every method takes `&self`, state lives in `RefCell`s, and
//! no borrow is held across an await, so a host may issue overlapping calls
//! (an `open` while another `open` is suspended, a `teardown` while acquiring)
//! from one task. The state machine rejects or discards whatever would
//! otherwise race for the camera.

use super::state::{CaptureState, Effect, Event, HandleId, Phase, transition};
use crate::backends::camera::{
    ConstraintLevel, MediaDevices, MediaHandle, PreviewReceiver, RenderSurface, Resolution,
    StreamConstraints,
};
use crate::config::Config;
use crate::constants::fields;
use crate::errors::{CaptureError, CaptureResult};
use crate::pipelines::photo::{CapturedImage, PhotoPipeline};
use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Field/value pair sent to the host form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub name: String,
    pub value: String,
}

impl FieldUpdate {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Update of the picture field
    pub fn profile_pic(value: impl Into<String>) -> Self {
        Self::new(fields::PROFILE_PIC, value)
    }
}

/// Host callback receiving field updates
pub type FieldSink = Box<dyn FnMut(FieldUpdate)>;

/// Result of a successful [`CaptureController::capture`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A still of this size was handed to the host
    Captured(Resolution),
    /// The controller was not live; nothing happened
    Ignored,
}

/// Asynchronous work requested by effects
enum Pending {
    Acquire { epoch: u64, level: ConstraintLevel },
    AwaitReadiness {
        epoch: u64,
        feed: Option<PreviewReceiver>,
    },
}

/// Camera capture controller for the profile picture step
pub struct CaptureController<D: MediaDevices, S: RenderSurface> {
    devices: D,
    surface: RefCell<S>,
    config: Config,
    pipeline: PhotoPipeline,
    state: RefCell<CaptureState>,
    /// The single open stream, if any
    handle: RefCell<Option<MediaHandle>>,
    next_handle_id: Cell<u64>,
    sink: RefCell<FieldSink>,
}

impl<D: MediaDevices, S: RenderSurface> CaptureController<D, S> {
    /// Create a controller for a mounting host step
    ///
    /// # Arguments
    /// * `existing_image` - Picture the host already holds; when present the
    ///   controller starts in captured display mode and leaves the camera off
    /// * `sink` - Receives `profilePic` updates
    pub fn new(
        devices: D,
        surface: S,
        config: Config,
        existing_image: Option<&str>,
        sink: impl FnMut(FieldUpdate) + 'static,
    ) -> Self {
        let state = match existing_image {
            Some(image) if !image.is_empty() => CaptureState::showing_existing(),
            _ => CaptureState::default(),
        };

        Self {
            devices,
            surface: RefCell::new(surface),
            pipeline: PhotoPipeline::new(&config),
            config,
            state: RefCell::new(state),
            handle: RefCell::new(None),
            next_handle_id: Cell::new(0),
            sink: RefCell::new(Box::new(sink)),
        }
    }

    /// Auto-start policy: open the camera unless a picture is already shown
    pub async fn on_mount(&self) {
        if self.phase() == Phase::Idle {
            info!("No existing picture, starting camera");
            self.open().await;
        } else {
            info!(phase = %self.phase(), "Existing picture, camera stays off");
        }
    }

    /// Request the camera, trying looser constraints on negotiation failures
    ///
    /// Ignored while another acquisition is outstanding or the preview is live.
    pub async fn open(&self) {
        let supported = self.devices.is_supported();
        let effects = self.dispatch(Event::Open { supported });
        self.drive(effects).await;
    }

    /// Release the camera and return to idle. Idempotent.
    pub fn close(&self) {
        let effects = self.dispatch(Event::Close);
        let pending = self.apply(effects, &mut None);
        debug_assert!(pending.is_empty());
    }

    /// Unmount path: force-release whatever is open
    pub fn teardown(&self) {
        info!(phase = %self.phase(), "Tearing down capture controller");
        self.close();
    }

    /// Capture the current frame and hand it to the host
    ///
    /// # Returns
    /// * `Ok(CaptureOutcome::Captured)` - Still emitted, camera released
    /// * `Ok(CaptureOutcome::Ignored)` - Not live, nothing changed
    /// * `Err(CaptureError::CaptureNotReady)` - No decoded frame yet, still live
    /// * `Err(CaptureError::Unknown)` - Encoding failed, camera released
    pub fn capture(&self) -> CaptureResult<CaptureOutcome> {
        let before = self.phase();
        let frame = self.surface.borrow().frame_dimensions();
        let effects = self.dispatch(Event::Capture { frame });
        let pending = self.apply(effects, &mut None);
        debug_assert!(pending.is_empty());

        let state = self.state.borrow();
        match (before, state.phase, frame) {
            (Phase::Live, Phase::Captured, Some(size)) => Ok(CaptureOutcome::Captured(size)),
            (Phase::Live, _, _) => Err(state
                .error
                .clone()
                .unwrap_or(CaptureError::CaptureNotReady)),
            _ => {
                debug!(phase = %before, "Capture ignored, preview not live");
                Ok(CaptureOutcome::Ignored)
            }
        }
    }

    /// Discard the current picture, close, and open again
    pub async fn retake(&self) {
        let supported = self.devices.is_supported();
        let effects = self.dispatch(Event::Retake { supported });
        self.drive(effects).await;
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    /// Snapshot of the full state
    pub fn state(&self) -> CaptureState {
        self.state.borrow().clone()
    }

    pub fn error(&self) -> Option<CaptureError> {
        self.state.borrow().error.clone()
    }

    pub fn has_open_handle(&self) -> bool {
        self.handle.borrow().is_some()
    }

    /// Constraint level of the open stream
    pub fn active_level(&self) -> Option<ConstraintLevel> {
        self.handle.borrow().as_ref().map(|h| h.level())
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub fn surface(&self) -> Ref<'_, S> {
        self.surface.borrow()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Text shown under the preview
    pub fn status_message(&self) -> String {
        let state = self.state.borrow();
        if let Some(err) = &state.error {
            return format!("{} ({})", err.remediation(), err.retry_label());
        }
        match state.phase {
            Phase::Idle => "Camera is off".to_string(),
            Phase::Starting => "Starting camera...".to_string(),
            Phase::Live => "Position your face in the frame".to_string(),
            Phase::Captured => "Photo captured".to_string(),
            Phase::Error => "Camera error".to_string(),
        }
    }

    /// Feed an event through the state machine and store the result
    fn dispatch(&self, event: Event) -> Vec<Effect> {
        debug!(event = ?event, "Dispatching capture event");
        let mut state = self.state.borrow_mut();
        let next = transition(&state, event);

        if next.state.phase != state.phase {
            info!(from = %state.phase, to = %next.state.phase, "Capture phase changed");
        }
        if next.state.error != state.error
            && let Some(err) = &next.state.error
        {
            warn!(error = %err, "Capture error");
        }

        *state = next.state;
        next.effects
    }

    /// Run effects to completion, performing asynchronous work as it comes up
    async fn drive(&self, effects: Vec<Effect>) {
        let mut incoming: Option<MediaHandle> = None;
        let mut work: VecDeque<Pending> = self.apply(effects, &mut incoming).into();

        while let Some(item) = work.pop_front() {
            let event = match item {
                Pending::Acquire { epoch, level } => {
                    let constraints = StreamConstraints::for_level(level, &self.config);
                    info!(constraints = %constraints, level = %level, "Requesting camera stream");

                    match self.devices.acquire(&constraints).await {
                        Ok(stream) => {
                            let id = self.next_handle_id.get() + 1;
                            self.next_handle_id.set(id);
                            let handle = MediaHandle::new(id, level, stream);
                            info!(
                                handle = id,
                                stream = %handle.stream_id(),
                                level = %level,
                                "Camera stream acquired"
                            );
                            incoming = Some(handle);
                            Event::Acquired {
                                epoch,
                                level,
                                handle: HandleId(id),
                            }
                        }
                        Err(error) => {
                            warn!(level = %level, error = %error, "Camera acquisition failed");
                            Event::AcquireFailed {
                                epoch,
                                level,
                                error,
                            }
                        }
                    }
                }
                Pending::AwaitReadiness { epoch, feed } => {
                    if self.wait_for_first_frame(feed).await {
                        Event::FrameReady { epoch }
                    } else {
                        Event::ReadinessTimedOut { epoch }
                    }
                }
            };

            let effects = self.dispatch(event);
            work.extend(self.apply(effects, &mut incoming));

            if let Some(orphan) = incoming.take() {
                warn!(handle = orphan.id(), "Acquired stream was not claimed, releasing");
                orphan.release();
            }
        }
    }

    /// Perform the synchronous effects; return the asynchronous ones
    ///
    /// `incoming` holds a freshly acquired stream until an effect either
    /// attaches it or stops it.
    fn apply(&self, effects: Vec<Effect>, incoming: &mut Option<MediaHandle>) -> Vec<Pending> {
        let mut queue: VecDeque<Effect> = effects.into();
        let mut pending = Vec::new();
        let mut still: Option<CapturedImage> = None;

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Acquire { epoch, level } => pending.push(Pending::Acquire { epoch, level }),
                Effect::AttachRenderer(id) => self.attach(id, incoming),
                Effect::ArmReadinessTimer { epoch } => {
                    let feed = self.handle.borrow().as_ref().map(|h| h.preview());
                    pending.push(Pending::AwaitReadiness { epoch, feed });
                }
                Effect::StopTracks(id) => self.stop(id, incoming),
                Effect::DetachRenderer => self.surface.borrow_mut().detach(),
                Effect::Snapshot(size) => {
                    let raster = self.surface.borrow().rasterize(size);
                    let event = match raster {
                        // Frame vanished between the size check and the raster
                        None => Event::Capture { frame: None },
                        Some(raster) => match self.pipeline.capture(&raster) {
                            Ok(image) => {
                                still = Some(image);
                                Event::Encoded
                            }
                            Err(e) => Event::EncodeFailed {
                                message: e.to_string(),
                            },
                        },
                    };
                    queue.extend(self.dispatch(event));
                }
                Effect::EmitImage => {
                    if let Some(image) = still.take() {
                        info!(
                            width = image.width,
                            height = image.height,
                            bytes = image.data.len(),
                            captured_at = %image.captured_at,
                            "Handing captured picture to host"
                        );
                        self.emit(FieldUpdate::profile_pic(image.to_data_uri()));
                    }
                }
                Effect::ClearImage => self.emit(FieldUpdate::profile_pic("")),
            }
        }

        pending
    }

    fn attach(&self, id: HandleId, incoming: &mut Option<MediaHandle>) {
        let Some(handle) = incoming.take_if(|h| h.id() == id.0) else {
            warn!(handle = id.0, "Attach requested for unknown stream");
            return;
        };

        let mut slot = self.handle.borrow_mut();
        if let Some(previous) = slot.take() {
            warn!(handle = previous.id(), "Replacing an open stream, releasing it first");
            previous.release();
        }
        self.surface.borrow_mut().attach(handle.preview());
        debug!(handle = id.0, "Stream attached to preview");
        *slot = Some(handle);
    }

    fn stop(&self, id: HandleId, incoming: &mut Option<MediaHandle>) {
        if let Some(handle) = incoming.take_if(|h| h.id() == id.0) {
            debug!(handle = id.0, "Releasing stale stream");
            handle.release();
            return;
        }

        let released = self.handle.borrow_mut().take_if(|h| h.id() == id.0);
        match released {
            Some(handle) => {
                info!(handle = id.0, "Releasing camera stream");
                handle.release();
            }
            None => debug!(handle = id.0, "Stream already released"),
        }
    }

    /// Wait for the first decoded frame, bounded by the readiness timeout
    async fn wait_for_first_frame(&self, feed: Option<PreviewReceiver>) -> bool {
        let Some(mut feed) = feed else {
            return false;
        };
        let timeout = self.config.readiness_timeout();

        let ready = tokio::time::timeout(
            timeout,
            feed.wait_for(|frame| frame.as_ref().is_some_and(|f| !f.is_empty())),
        )
        .await;

        match ready {
            Ok(Ok(_)) => {
                debug!("First preview frame decoded");
                true
            }
            Ok(Err(_)) => {
                debug!("Preview feed closed before first frame");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.readiness_timeout_ms,
                    "No frame-ready signal, going live on timeout"
                );
                false
            }
        }
    }

    fn emit(&self, update: FieldUpdate) {
        debug!(field = %update.name, bytes = update.value.len(), "Field update");
        let mut sink = self.sink.borrow_mut();
        (*sink)(update);
    }
}

impl<D: MediaDevices, S: RenderSurface> Drop for CaptureController<D, S> {
    fn drop(&mut self) {
        if self.handle.get_mut().is_some() {
            self.teardown();
        }
    }
}
