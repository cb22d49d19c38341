// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera (selfie)
    #[default]
    User,
    /// Rear camera
    Environment,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// Frame or capture size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero (no decodable frame yet)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Constraint levels tried in order when opening the camera
///
/// Each level is looser than the previous one. The next level is only tried
/// when the device reports a negotiation failure for the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintLevel {
    /// Preferred facing mode plus the target resolution
    FacingAndResolution,
    /// Preferred facing mode only
    FacingOnly,
    /// Any camera the device offers
    AnyCamera,
}

impl ConstraintLevel {
    /// All levels, strictest first
    pub const ALL: [ConstraintLevel; 3] = [
        ConstraintLevel::FacingAndResolution,
        ConstraintLevel::FacingOnly,
        ConstraintLevel::AnyCamera,
    ];

    pub fn first() -> Self {
        ConstraintLevel::FacingAndResolution
    }

    /// The next looser level, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            ConstraintLevel::FacingAndResolution => Some(ConstraintLevel::FacingOnly),
            ConstraintLevel::FacingOnly => Some(ConstraintLevel::AnyCamera),
            ConstraintLevel::AnyCamera => None,
        }
    }
}

impl std::fmt::Display for ConstraintLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintLevel::FacingAndResolution => write!(f, "facing+resolution"),
            ConstraintLevel::FacingOnly => write!(f, "facing"),
            ConstraintLevel::AnyCamera => write!(f, "any"),
        }
    }
}

/// Concrete constraints handed to [`super::MediaDevices::acquire`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub level: ConstraintLevel,
    pub facing: Option<FacingMode>,
    /// Ideal (not exact) resolution
    pub resolution: Option<Resolution>,
}

impl StreamConstraints {
    /// Build the constraints for a level from the user configuration
    pub fn for_level(level: ConstraintLevel, config: &Config) -> Self {
        match level {
            ConstraintLevel::FacingAndResolution => Self {
                level,
                facing: Some(config.facing),
                resolution: Some(config.target_resolution),
            },
            ConstraintLevel::FacingOnly => Self {
                level,
                facing: Some(config.facing),
                resolution: None,
            },
            ConstraintLevel::AnyCamera => Self {
                level,
                facing: None,
                resolution: None,
            },
        }
    }
}

impl std::fmt::Display for StreamConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.facing, self.resolution) {
            (Some(facing), Some(res)) => write!(f, "{} @ {}", facing, res),
            (Some(facing), None) => write!(f, "{}", facing),
            _ => write!(f, "any camera"),
        }
    }
}

/// A decoded preview frame (RGBA, tightly packed)
#[derive(Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    /// Timestamp when frame was decoded
    pub captured_at: Instant,
}

impl VideoFrame {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.resolution().is_empty() || self.data.is_empty()
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Latest-frame feed of a stream; `None` until the first frame decodes
pub type PreviewReceiver = tokio::sync::watch::Receiver<Option<VideoFrame>>;

/// Producer side of a [`PreviewReceiver`]
pub type PreviewSender = tokio::sync::watch::Sender<Option<VideoFrame>>;

/// Result type for acquisition
pub type AcquireResult<T> = Result<T, AcquireError>;

/// Failures reported by the device while acquiring a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    /// Camera API missing on this platform
    NotSupported,
    /// Permission refused by the user or policy
    NotAllowed(String),
    /// No camera present
    NotFound,
    /// Hardware present but could not be read (held by another process)
    NotReadable(String),
    /// No camera satisfies the named constraint
    Overconstrained(String),
    /// Anything else
    Other(String),
}

impl AcquireError {
    /// Whether a looser constraint level may succeed where this one failed
    pub fn is_negotiation_failure(&self) -> bool {
        matches!(self, AcquireError::Overconstrained(_))
    }
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquireError::NotSupported => write!(f, "Camera API not supported"),
            AcquireError::NotAllowed(msg) => write!(f, "Permission denied: {}", msg),
            AcquireError::NotFound => write!(f, "No camera device found"),
            AcquireError::NotReadable(msg) => write!(f, "Device not readable: {}", msg),
            AcquireError::Overconstrained(constraint) => {
                write!(f, "Constraint not satisfiable: {}", constraint)
            }
            AcquireError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for AcquireError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_levels_loosen() {
        let config = Config::default();
        let strict = StreamConstraints::for_level(ConstraintLevel::FacingAndResolution, &config);
        assert_eq!(strict.facing, Some(config.facing));
        assert_eq!(strict.resolution, Some(config.target_resolution));

        let facing = StreamConstraints::for_level(ConstraintLevel::FacingOnly, &config);
        assert!(facing.facing.is_some());
        assert!(facing.resolution.is_none());

        let any = StreamConstraints::for_level(ConstraintLevel::AnyCamera, &config);
        assert!(any.facing.is_none());
        assert!(any.resolution.is_none());
    }

    #[test]
    fn test_level_sequence() {
        let mut level = Some(ConstraintLevel::first());
        let mut seen = Vec::new();
        while let Some(l) = level {
            seen.push(l);
            level = l.next();
        }
        assert_eq!(seen, ConstraintLevel::ALL);
    }

    #[test]
    fn test_only_overconstrained_is_negotiable() {
        assert!(AcquireError::Overconstrained("width".into()).is_negotiation_failure());
        assert!(!AcquireError::NotFound.is_negotiation_failure());
        assert!(!AcquireError::NotAllowed("x".into()).is_negotiation_failure());
        assert!(!AcquireError::Other("x".into()).is_negotiation_failure());
    }

    #[test]
    fn test_empty_resolution() {
        assert!(Resolution::new(0, 0).is_empty());
        assert!(Resolution::new(640, 0).is_empty());
        assert!(!Resolution::new(640, 480).is_empty());
    }
}
