// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture controller against a simulated camera

use profile_camera::backends::camera::simulated::{AttemptOutcome, FramePolicy, SimulatedCamera};
use image::RgbaImage;
use profile_camera::backends::camera::{
    AcquireError, ConstraintLevel, FacingMode, PreviewReceiver, RenderSurface, Resolution,
};
use profile_camera::pipelines::photo::decode_data_uri;
use profile_camera::{
    CaptureController, CaptureError, CaptureOutcome, Config, FieldUpdate, Phase, PreviewSurface,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

type Controller = CaptureController<SimulatedCamera, PreviewSurface>;
type Updates = Rc<RefCell<Vec<FieldUpdate>>>;

fn fast_config() -> Config {
    Config {
        readiness_timeout_ms: 20,
        ..Config::default()
    }
}

fn controller_with(camera: SimulatedCamera, existing: Option<&str>) -> (Controller, Updates) {
    let updates: Updates = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&updates);
    let controller = CaptureController::new(
        camera,
        PreviewSurface::new(),
        fast_config(),
        existing,
        move |update| sink.borrow_mut().push(update),
    );
    (controller, updates)
}

fn denied() -> AttemptOutcome {
    AttemptOutcome::Fail(AcquireError::NotAllowed("Permission denied".to_string()))
}

fn overconstrained() -> AttemptOutcome {
    AttemptOutcome::Fail(AcquireError::Overconstrained("width".to_string()))
}

#[tokio::test]
async fn test_mount_opens_camera_and_goes_live() {
    let camera = SimulatedCamera::new();
    let ledger = camera.ledger();
    let (controller, updates) = controller_with(camera, None);

    controller.on_mount().await;

    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(controller.error(), None);
    assert!(controller.has_open_handle());
    assert!(controller.surface().is_attached());
    assert_eq!(
        controller.active_level(),
        Some(ConstraintLevel::FacingAndResolution)
    );
    assert_eq!(ledger.open_streams(), 1);
    assert!(updates.borrow().is_empty());

    let request = &controller.devices().requests()[0];
    assert_eq!(request.facing, Some(FacingMode::User));
    assert_eq!(request.resolution, Some(Resolution::new(1280, 720)));
}

#[tokio::test]
async fn test_capture_emits_jpeg_and_releases_camera() {
    let camera = SimulatedCamera::new().with_frames(FramePolicy::Immediate(Resolution::new(64, 48)));
    let ledger = camera.ledger();
    let (controller, updates) = controller_with(camera, None);
    controller.on_mount().await;

    let outcome = controller.capture().unwrap();

    assert_eq!(outcome, CaptureOutcome::Captured(Resolution::new(64, 48)));
    assert_eq!(controller.phase(), Phase::Captured);
    assert!(!controller.has_open_handle());
    assert!(!controller.surface().is_attached());
    assert_eq!(ledger.open_streams(), 0);
    assert_eq!(ledger.releases(), 1);

    let updates = updates.borrow();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].name, "profilePic");
    let (mime, bytes) = decode_data_uri(&updates[0].value).unwrap();
    assert_eq!(mime, "image/jpeg");
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
}

#[tokio::test]
async fn test_overconstrained_falls_back_to_facing_only() {
    let camera = SimulatedCamera::new().with_outcomes([overconstrained(), AttemptOutcome::Grant]);
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);

    controller.on_mount().await;

    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(controller.active_level(), Some(ConstraintLevel::FacingOnly));

    let requests = controller.devices().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].level, ConstraintLevel::FacingOnly);
    assert_eq!(requests[1].facing, Some(FacingMode::User));
    assert_eq!(requests[1].resolution, None);
    assert_eq!(ledger.open_streams(), 1);
}

#[tokio::test]
async fn test_every_level_overconstrained_is_unknown_error() {
    let camera = SimulatedCamera::new().with_default(overconstrained());
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);

    controller.on_mount().await;

    assert_eq!(controller.phase(), Phase::Error);
    assert!(matches!(controller.error(), Some(CaptureError::Unknown(_))));
    let requests = controller.devices().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].level, ConstraintLevel::AnyCamera);
    assert_eq!(requests[2].facing, None);
    assert_eq!(ledger.acquisitions(), 0);
}

#[tokio::test]
async fn test_permission_denied_does_not_fall_back() {
    let camera = SimulatedCamera::new().with_outcomes([denied()]);
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);

    controller.on_mount().await;

    assert_eq!(controller.phase(), Phase::Error);
    assert_eq!(controller.error(), Some(CaptureError::PermissionDenied));
    assert!(controller.status_message().contains("Try Again"));
    assert_eq!(ledger.attempts(), 1);
    assert_eq!(ledger.open_streams(), 0);
}

#[tokio::test]
async fn test_retry_after_error_starts_from_first_level() {
    let camera = SimulatedCamera::new().with_outcomes([overconstrained(), denied()]);
    let (controller, _) = controller_with(camera, None);

    controller.on_mount().await;
    assert_eq!(controller.error(), Some(CaptureError::PermissionDenied));

    controller.open().await;

    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(controller.error(), None);
    let requests = controller.devices().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].level, ConstraintLevel::FacingAndResolution);
}

#[tokio::test]
async fn test_acquire_errors_map_to_user_errors() {
    let cases = [
        (AcquireError::NotFound, CaptureError::DeviceNotFound),
        (
            AcquireError::NotReadable("in use".to_string()),
            CaptureError::DeviceBusy,
        ),
        (AcquireError::NotSupported, CaptureError::Unsupported),
    ];

    for (failure, expected) in cases {
        let camera = SimulatedCamera::new().with_default(AttemptOutcome::Fail(failure));
        let (controller, _) = controller_with(camera, None);
        controller.on_mount().await;
        assert_eq!(controller.phase(), Phase::Error);
        assert_eq!(controller.error(), Some(expected));
    }
}

#[tokio::test]
async fn test_unsupported_environment_never_acquires() {
    let camera = SimulatedCamera::new().unsupported();
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);

    controller.on_mount().await;

    assert_eq!(controller.phase(), Phase::Error);
    assert_eq!(controller.error(), Some(CaptureError::Unsupported));
    assert_eq!(ledger.attempts(), 0);
}

#[tokio::test]
async fn test_goes_live_on_timeout_without_frames() {
    let camera = SimulatedCamera::new().with_frames(FramePolicy::Never);
    let ledger = camera.ledger();
    let (controller, updates) = controller_with(camera, None);

    controller.on_mount().await;
    assert_eq!(controller.phase(), Phase::Live);

    assert_eq!(controller.capture(), Err(CaptureError::CaptureNotReady));
    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(controller.error(), Some(CaptureError::CaptureNotReady));
    assert!(controller.status_message().contains("(Capture)"));
    assert!(controller.has_open_handle());
    assert_eq!(ledger.open_streams(), 1);
    assert!(updates.borrow().is_empty());

    controller.teardown();
    assert_eq!(ledger.open_streams(), 0);
}

#[tokio::test]
async fn test_zero_sized_frame_is_not_ready() {
    let camera = SimulatedCamera::new().with_frames(FramePolicy::Immediate(Resolution::new(0, 0)));
    let (controller, updates) = controller_with(camera, None);

    controller.on_mount().await;
    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(controller.surface().frame_dimensions(), Some(Resolution::new(0, 0)));

    assert_eq!(controller.capture(), Err(CaptureError::CaptureNotReady));
    assert_eq!(controller.phase(), Phase::Live);
    assert!(updates.borrow().is_empty());
}

/// Reports a frame size but loses the frame before it can be drawn
#[derive(Default)]
struct VanishingFrameSurface {
    feed: Option<PreviewReceiver>,
}

impl RenderSurface for VanishingFrameSurface {
    fn attach(&mut self, preview: PreviewReceiver) {
        self.feed = Some(preview);
    }

    fn detach(&mut self) {
        self.feed = None;
    }

    fn is_attached(&self) -> bool {
        self.feed.is_some()
    }

    fn frame_dimensions(&self) -> Option<Resolution> {
        self.feed.as_ref().map(|_| Resolution::new(640, 480))
    }

    fn rasterize(&self, _size: Resolution) -> Option<RgbaImage> {
        None
    }
}

#[tokio::test]
async fn test_frame_lost_before_raster_is_not_ready() {
    let camera = SimulatedCamera::new();
    let ledger = camera.ledger();
    let updates: Updates = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&updates);
    let controller = CaptureController::new(
        camera,
        VanishingFrameSurface::default(),
        fast_config(),
        None,
        move |update| sink.borrow_mut().push(update),
    );

    controller.on_mount().await;
    assert_eq!(controller.phase(), Phase::Live);

    assert_eq!(controller.capture(), Err(CaptureError::CaptureNotReady));
    assert_eq!(controller.phase(), Phase::Live);
    assert!(controller.has_open_handle());
    assert!(controller.surface().is_attached());
    assert_eq!(ledger.open_streams(), 1);
    assert!(updates.borrow().is_empty());
}

#[tokio::test]
async fn test_capture_outside_live_is_ignored() {
    let camera = SimulatedCamera::new().with_default(denied());
    let (controller, updates) = controller_with(camera, None);

    assert_eq!(controller.capture(), Ok(CaptureOutcome::Ignored));
    assert_eq!(controller.phase(), Phase::Idle);

    controller.on_mount().await;
    assert_eq!(controller.capture(), Ok(CaptureOutcome::Ignored));
    assert_eq!(controller.phase(), Phase::Error);
    assert_eq!(controller.error(), Some(CaptureError::PermissionDenied));
    assert!(updates.borrow().is_empty());
}

#[tokio::test]
async fn test_retake_clears_picture_and_reopens() {
    let camera = SimulatedCamera::new();
    let ledger = camera.ledger();
    let (controller, updates) = controller_with(camera, None);
    controller.on_mount().await;
    controller.capture().unwrap();

    controller.retake().await;

    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(ledger.acquisitions(), 2);
    assert_eq!(ledger.open_streams(), 1);
    assert_eq!(ledger.peak_open(), 1);

    let updates = updates.borrow();
    assert_eq!(updates.len(), 2);
    assert!(!updates[0].value.is_empty());
    assert_eq!(updates[1], FieldUpdate::profile_pic(""));
}

#[tokio::test]
async fn test_existing_picture_keeps_camera_off() {
    let camera = SimulatedCamera::new();
    let ledger = camera.ledger();
    let (controller, updates) = controller_with(camera, Some("data:image/png;base64,AAAA"));

    controller.on_mount().await;

    assert_eq!(controller.phase(), Phase::Captured);
    assert_eq!(ledger.attempts(), 0);
    assert_eq!(controller.capture(), Ok(CaptureOutcome::Ignored));

    controller.retake().await;
    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(*updates.borrow(), vec![FieldUpdate::profile_pic("")]);
}

#[tokio::test]
async fn test_teardown_while_starting_releases_late_stream() {
    let camera = SimulatedCamera::new().with_delay(Duration::from_millis(30));
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);

    tokio::join!(controller.on_mount(), async {
        tokio::task::yield_now().await;
        assert_eq!(controller.phase(), Phase::Starting);
        controller.teardown();
    });

    assert_eq!(controller.phase(), Phase::Idle);
    assert!(!controller.has_open_handle());
    assert!(!controller.surface().is_attached());
    assert_eq!(ledger.acquisitions(), 1);
    assert_eq!(ledger.releases(), 1);
    assert_eq!(ledger.open_streams(), 0);

    controller.open().await;
    assert_eq!(controller.phase(), Phase::Live);
}

#[tokio::test]
async fn test_open_rejected_while_acquisition_outstanding() {
    let camera = SimulatedCamera::new().with_delay(Duration::from_millis(20));
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);

    tokio::join!(controller.open(), controller.open());

    assert_eq!(ledger.attempts(), 1);
    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(ledger.peak_open(), 1);

}

#[tokio::test]
async fn test_reopen_after_close_waits_for_pending_request() {
    let camera = SimulatedCamera::new().with_delay(Duration::from_millis(20));
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);

    tokio::join!(controller.open(), async {
        tokio::task::yield_now().await;
        controller.close();
        controller.open().await;
        assert_eq!(controller.phase(), Phase::Starting);
        assert_eq!(ledger.attempts(), 1);
    });

    assert_eq!(controller.phase(), Phase::Live);
    assert_eq!(controller.error(), None);
    assert_eq!(ledger.attempts(), 2);
    assert_eq!(ledger.acquisitions(), 2);
    assert_eq!(ledger.releases(), 1);
    assert_eq!(ledger.open_streams(), 1);
    assert_eq!(ledger.peak_open(), 1);
}

#[tokio::test]
async fn test_open_while_live_is_noop() {
    let camera = SimulatedCamera::new();
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);
    controller.on_mount().await;

    controller.open().await;

    assert_eq!(ledger.attempts(), 1);
    assert_eq!(controller.phase(), Phase::Live);
}

#[tokio::test]
async fn test_teardown_from_every_phase_is_safe() {
    let camera = SimulatedCamera::new().with_outcomes([denied()]);
    let ledger = camera.ledger();
    let (controller, _) = controller_with(camera, None);

    controller.teardown();
    assert_eq!(controller.phase(), Phase::Idle);

    controller.on_mount().await;
    assert_eq!(controller.phase(), Phase::Error);
    controller.teardown();
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.error(), None);

    controller.open().await;
    assert_eq!(controller.phase(), Phase::Live);
    controller.teardown();
    controller.teardown();
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(ledger.open_streams(), 0);
}

#[tokio::test]
async fn test_dropping_controller_releases_camera() {
    let camera = SimulatedCamera::new();
    let ledger = camera.ledger();
    {
        let (controller, _) = controller_with(camera, None);
        controller.on_mount().await;
        assert_eq!(ledger.open_streams(), 1);
    }
    assert_eq!(ledger.open_streams(), 0);
    assert_eq!(ledger.releases(), 1);
}

#[tokio::test]
async fn test_mirrored_capture() {
    let updates: Updates = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&updates);
    let config = Config {
        mirror_capture: true,
        ..fast_config()
    };
    let controller = CaptureController::new(
        SimulatedCamera::new(),
        PreviewSurface::new(),
        config,
        None,
        move |update| sink.borrow_mut().push(update),
    );

    controller.on_mount().await;
    assert_eq!(
        controller.capture(),
        Ok(CaptureOutcome::Captured(Resolution::new(640, 480)))
    );
    assert_eq!(updates.borrow().len(), 1);
}
