// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use crate::backends::camera::Resolution;

/// Target resolution presets for the first acquisition attempt
///
/// The resolution is only a preference. Devices that cannot honour it make
/// the controller fall back to a facing-only request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPreset {
    /// 640x480
    Vga,
    /// 1280x720 (default)
    #[default]
    Hd,
    /// 1920x1080
    FullHd,
}

impl ResolutionPreset {
    /// Get all preset variants for UI iteration
    pub const ALL: [ResolutionPreset; 3] = [
        ResolutionPreset::Vga,
        ResolutionPreset::Hd,
        ResolutionPreset::FullHd,
    ];

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            ResolutionPreset::Vga => "VGA",
            ResolutionPreset::Hd => "HD",
            ResolutionPreset::FullHd => "Full HD",
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            ResolutionPreset::Vga => Resolution::new(640, 480),
            ResolutionPreset::Hd => Resolution::new(1280, 720),
            ResolutionPreset::FullHd => Resolution::new(1920, 1080),
        }
    }
}

/// Host form field names
pub mod fields {
    /// Field receiving the captured selfie as a data URI
    pub const PROFILE_PIC: &str = "profilePic";

    pub const NAME: &str = "name";

    pub const GENDER: &str = "gender";

    /// Accepted values for [`GENDER`]
    pub const GENDER_OPTIONS: &[&str] = &["male", "female", "other"];
}

/// Timing constants
pub mod timing {
    /// Go live after this long even if no frame-ready signal arrived
    pub const READINESS_FALLBACK_MS: u64 = 1000;
}

/// Capture output constants
pub mod capture {
    /// MIME type of captured stills
    pub const MIME_TYPE: &str = "image/jpeg";

    /// Prefix of the filename the CLI writes captures to
    pub const FILENAME_PREFIX: &str = "selfie";

    /// Largest upload accepted as a profile picture (10 MiB)
    pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
}
