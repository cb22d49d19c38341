// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture controller
//!
//! [`CaptureError`] is the taxonomy surfaced to the host step. Every variant is
//! recoverable by the user (retry or retake); none of them propagate as a
//! fault out of the controller.

use crate::backends::camera::AcquireError;
use std::fmt;

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Result type alias using ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced to the host step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Camera API is not available on this device
    Unsupported,
    /// User or platform refused camera access
    PermissionDenied,
    /// No camera present
    DeviceNotFound,
    /// Camera is held by another process
    DeviceBusy,
    /// Any other acquisition or capture failure
    Unknown(String),
    /// Capture requested before a frame was decoded
    CaptureNotReady,
}

impl CaptureError {
    /// Classify a backend acquisition failure
    pub fn from_acquire(err: AcquireError) -> Self {
        match err {
            AcquireError::NotSupported => CaptureError::Unsupported,
            AcquireError::NotAllowed(_) => CaptureError::PermissionDenied,
            AcquireError::NotFound => CaptureError::DeviceNotFound,
            AcquireError::NotReadable(_) => CaptureError::DeviceBusy,
            AcquireError::Overconstrained(constraint) => CaptureError::Unknown(format!(
                "no camera satisfies the requested constraints ({})",
                constraint
            )),
            AcquireError::Other(msg) => CaptureError::Unknown(msg),
        }
    }

    /// Text shown under the preview telling the user what to do next
    pub fn remediation(&self) -> &'static str {
        match self {
            CaptureError::Unsupported => {
                "Camera is not supported on this device. Try a different browser or device."
            }
            CaptureError::PermissionDenied => {
                "Camera access was denied. Allow camera permissions and try again."
            }
            CaptureError::DeviceNotFound => "No camera was found. Connect a camera and try again.",
            CaptureError::DeviceBusy => {
                "The camera is in use by another application. Close it and try again."
            }
            CaptureError::Unknown(_) => "The camera could not be started. Please try again.",
            CaptureError::CaptureNotReady => {
                "The camera is still warming up. Wait a moment and capture again."
            }
        }
    }

    /// Label of the retry affordance shown next to the message
    pub fn retry_label(&self) -> &'static str {
        match self {
            CaptureError::CaptureNotReady => "Capture",
            _ => "Try Again",
        }
    }
}

/// Photo processing and encoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    /// Frame buffer is smaller than its dimensions claim
    InvalidFrame(String),
    /// Encoding failed
    EncodingFailed(String),
    /// Data URI could not be parsed
    InvalidDataUri(String),
    /// Uploaded file is unreadable or not an image
    UploadFailed(String),
}

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read or written
    Io(String),
    /// Config file is not valid JSON for [`crate::config::Config`]
    Parse(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Unsupported => write!(f, "Camera not supported"),
            CaptureError::PermissionDenied => write!(f, "Camera permission denied"),
            CaptureError::DeviceNotFound => write!(f, "No camera found"),
            CaptureError::DeviceBusy => write!(f, "Camera is busy"),
            CaptureError::Unknown(msg) => write!(f, "Camera error: {}", msg),
            CaptureError::CaptureNotReady => write!(f, "Camera stream not ready"),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::InvalidDataUri(msg) => write!(f, "Invalid data URI: {}", msg),
            PhotoError::UploadFailed(msg) => write!(f, "Upload failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Configuration I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Configuration parse error: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}
impl std::error::Error for PhotoError {}
impl std::error::Error for ConfigError {}

impl From<AcquireError> for CaptureError {
    fn from(err: AcquireError) -> Self {
        CaptureError::from_acquire(err)
    }
}

impl From<PhotoError> for CaptureError {
    fn from(err: PhotoError) -> Self {
        CaptureError::Unknown(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::UploadFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_classification() {
        assert_eq!(
            CaptureError::from_acquire(AcquireError::NotAllowed("denied".into())),
            CaptureError::PermissionDenied
        );
        assert_eq!(
            CaptureError::from_acquire(AcquireError::NotFound),
            CaptureError::DeviceNotFound
        );
        assert_eq!(
            CaptureError::from_acquire(AcquireError::NotReadable("in use".into())),
            CaptureError::DeviceBusy
        );
        assert_eq!(
            CaptureError::from_acquire(AcquireError::NotSupported),
            CaptureError::Unsupported
        );
        match CaptureError::from_acquire(AcquireError::Other("boom".into())) {
            CaptureError::Unknown(msg) => assert_eq!(msg, "boom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_every_error_has_remediation() {
        let all = [
            CaptureError::Unsupported,
            CaptureError::PermissionDenied,
            CaptureError::DeviceNotFound,
            CaptureError::DeviceBusy,
            CaptureError::Unknown("x".into()),
            CaptureError::CaptureNotReady,
        ];
        for err in all {
            assert!(!err.remediation().is_empty(), "{:?} has no remediation", err);
            assert!(!err.retry_label().is_empty());
        }
    }
}
