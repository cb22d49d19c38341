// SPDX-License-Identifier: GPL-3.0-only

//! Profile picture wizard step (host side)
//!
//! Owns the step's form fields. The capture controller writes `profilePic`
//! through [`ProfileStep::apply`]; the user can alternatively upload a file.

use super::controller::FieldUpdate;
use crate::constants::{capture, fields};
use crate::errors::PhotoError;
use crate::pipelines::photo::{decode_data_uri, encode_data_uri};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Validation messages keyed by field name
pub type StepErrors = BTreeMap<&'static str, &'static str>;

/// Fields of the "Profile Picture (Selfie)" step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileStep {
    profile_pic: String,
    name: String,
    gender: String,
}

impl ProfileStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step reopened with a picture captured earlier
    pub fn with_picture(data_uri: impl Into<String>) -> Self {
        Self {
            profile_pic: data_uri.into(),
            ..Self::default()
        }
    }

    /// Apply an update from the controller or the form; false for unknown fields
    pub fn apply(&mut self, update: FieldUpdate) -> bool {
        let slot = match update.name.as_str() {
            fields::PROFILE_PIC => &mut self.profile_pic,
            fields::NAME => &mut self.name,
            fields::GENDER => &mut self.gender,
            other => {
                warn!(field = other, "Ignoring update of unknown field");
                return false;
            }
        };
        debug!(field = %update.name, "Field updated");
        *slot = update.value;
        true
    }

    pub fn profile_pic(&self) -> &str {
        &self.profile_pic
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }

    /// Picture handed to the controller at mount, if any
    pub fn existing_image(&self) -> Option<&str> {
        (!self.profile_pic.is_empty()).then_some(self.profile_pic.as_str())
    }

    /// Decoded picture as `(mime, bytes)`
    pub fn picture(&self) -> Result<Option<(String, Vec<u8>)>, PhotoError> {
        self.existing_image().map(decode_data_uri).transpose()
    }

    /// Use an image file as the profile picture instead of the camera
    pub fn upload_file(&mut self, path: &Path) -> Result<(), PhotoError> {
        let size = std::fs::metadata(path)?.len();
        if size > capture::MAX_UPLOAD_BYTES {
            return Err(PhotoError::UploadFailed(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                size,
                capture::MAX_UPLOAD_BYTES
            )));
        }

        let bytes = std::fs::read(path)?;
        let format = image::guess_format(&bytes).map_err(|e| {
            PhotoError::UploadFailed(format!("{} is not an image: {}", path.display(), e))
        })?;

        info!(path = %path.display(), format = ?format, bytes = bytes.len(), "Profile picture uploaded");
        self.profile_pic = encode_data_uri(format.to_mime_type(), &bytes);
        Ok(())
    }

    /// Check the step before moving on
    pub fn validate(&self) -> StepErrors {
        let mut errors = StepErrors::new();

        if self.profile_pic.is_empty() {
            errors.insert(fields::PROFILE_PIC, "Profile picture is required");
        }
        if self.name.trim().is_empty() {
            errors.insert(fields::NAME, "Name is required");
        }
        if self.gender.is_empty() {
            errors.insert(fields::GENDER, "Gender is required");
        } else if !fields::GENDER_OPTIONS.contains(&self.gender.as_str()) {
            errors.insert(fields::GENDER, "Select a valid gender");
        }

        errors
    }
}
