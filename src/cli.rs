// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the selfie step
//!
//! `simulate` mounts the step against a [`SimulatedCamera`] so the whole
//! open, preview, capture and release cycle can be exercised without hardware.

use chrono::Local;
use clap::ValueEnum;
use profile_camera::backends::camera::simulated::{AttemptOutcome, FramePolicy, SimulatedCamera};
use profile_camera::backends::camera::{AcquireError, MediaDevices};
use profile_camera::constants::capture;
use profile_camera::{CaptureController, CaptureOutcome, Config, Phase, PreviewSurface, ProfileStep};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Behaviour of the simulated camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Camera granted on the first attempt
    Happy,
    /// First constraint set rejected, looser one granted
    Fallback,
    /// User denies permission
    Denied,
    /// Camera held by another application
    Busy,
    /// No camera attached
    Missing,
    /// No camera API at all
    Unsupported,
    /// Stream opens but never delivers a frame
    NoFrames,
}

impl Scenario {
    fn camera(self) -> SimulatedCamera {
        let camera = SimulatedCamera::new();
        match self {
            Scenario::Happy => camera,
            Scenario::Fallback => camera.with_outcomes([
                AttemptOutcome::Fail(AcquireError::Overconstrained("width".to_string())),
                AttemptOutcome::Grant,
            ]),
            Scenario::Denied => camera.with_default(AttemptOutcome::Fail(AcquireError::NotAllowed(
                "Permission denied by user".to_string(),
            ))),
            Scenario::Busy => camera.with_default(AttemptOutcome::Fail(AcquireError::NotReadable(
                "Could not start video source".to_string(),
            ))),
            Scenario::Missing => camera.with_default(AttemptOutcome::Fail(AcquireError::NotFound)),
            Scenario::Unsupported => camera.unsupported(),
            Scenario::NoFrames => camera.with_frames(FramePolicy::Never),
        }
    }
}

/// Mount the step, capture a selfie and save whatever picture the step ends up with
pub fn simulate(
    config: Config,
    scenario: Scenario,
    output: Option<PathBuf>,
    existing: Option<PathBuf>,
    retake: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let step = Rc::new(RefCell::new(ProfileStep::new()));
    if let Some(path) = &existing {
        step.borrow_mut().upload_file(path)?;
        println!("Existing picture: {}", path.display());
    }

    let camera = scenario.camera();
    let ledger = camera.ledger();
    let existing_image = step.borrow().existing_image().map(str::to_string);
    let sink_step = Rc::clone(&step);
    let controller = CaptureController::new(
        camera,
        PreviewSurface::new(),
        config,
        existing_image.as_deref(),
        move |update| {
            sink_step.borrow_mut().apply(update);
        },
    );

    println!("Scenario: {:?}", scenario);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        controller.on_mount().await;
        print_status(&controller);

        if retake && controller.phase() == Phase::Captured {
            println!("Retaking...");
            controller.retake().await;
            print_status(&controller);
        }

        match controller.capture() {
            Ok(CaptureOutcome::Captured(size)) => println!("Captured {}", size),
            Ok(CaptureOutcome::Ignored) => println!("Nothing to capture"),
            Err(err) => println!("Capture failed: {}", err),
        }
        print_status(&controller);
    });

    controller.teardown();

    match step.borrow().picture()? {
        Some((mime, bytes)) => {
            let path = output.unwrap_or_else(|| default_output_path(&mime));
            std::fs::write(&path, &bytes)?;
            println!("Picture saved: {} ({}, {} bytes)", path.display(), mime, bytes.len());
        }
        None => println!("No picture"),
    }

    println!(
        "Streams: {} attempts, {} acquired, {} released, {} open, peak {}",
        ledger.attempts(),
        ledger.acquisitions(),
        ledger.releases(),
        ledger.open_streams(),
        ledger.peak_open()
    );

    Ok(())
}

/// Print the effective configuration
pub fn print_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = Config::default_path() {
        println!("# {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn print_status<D: MediaDevices>(controller: &CaptureController<D, PreviewSurface>) {
    println!("[{}] {}", controller.phase(), controller.status_message());
}

fn default_output_path(mime: &str) -> PathBuf {
    let extension = match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    };
    let filename = format!(
        "{}_{}.{}",
        capture::FILENAME_PREFIX,
        Local::now().format("%Y%m%d_%H%M%S"),
        extension
    );
    Path::new(".").join(filename)
}
