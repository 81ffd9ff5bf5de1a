use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{GeocodeError, GeolocationError, StoreError};
use crate::config::ConfigError;
use crate::image_processing::ImageProcessingError;
use crate::validation::ErrorMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Busy,
    Storage,
    NotFound,
    Location,
    LocationPermissionDenied,
    Timeout,
    Geocoding,
    ImageFormatUnsupported,
    ImageTooLarge,
    ImageProcessing,
    Configuration,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Busy => "BUSY",
            Self::Storage => "STORAGE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::Timeout => "TIMEOUT",
            Self::Geocoding => "GEOCODING_ERROR",
            Self::ImageFormatUnsupported => "IMAGE_FORMAT_UNSUPPORTED",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::ImageProcessing => "IMAGE_PROCESSING_ERROR",
            Self::Configuration => "CONFIG_ERROR",
        }
    }

    /// Whether trying the same action again can succeed without the user
    /// changing anything.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Busy | Self::Storage | Self::Location | Self::Timeout | Self::Geocoding
        )
    }
}

/// Everything an editor operation can fail with. None of these end the
/// editing session; the snapshot stays consistent and editable.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(ErrorMap),

    #[error("a save is already in progress")]
    Busy,

    #[error("persisting profile failed: {0}")]
    Persistence(#[source] StoreError),

    #[error("loading profile failed: {0}")]
    Load(#[source] StoreError),

    #[error("location detection failed: {0}")]
    Location(#[from] GeolocationError),

    #[error("geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("image rejected: {0}")]
    Image(#[from] ImageProcessingError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl EditorError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Busy => ErrorKind::Busy,
            Self::Persistence(_) => ErrorKind::Storage,
            Self::Load(StoreError::NotFound) => ErrorKind::NotFound,
            Self::Load(_) => ErrorKind::Storage,
            Self::Location(GeolocationError::PermissionDenied) => ErrorKind::LocationPermissionDenied,
            Self::Location(GeolocationError::Timeout) => ErrorKind::Timeout,
            Self::Location(GeolocationError::PositionUnavailable) => ErrorKind::Location,
            Self::Geocode(_) => ErrorKind::Geocoding,
            Self::Image(
                ImageProcessingError::UnsupportedMediaType { .. } | ImageProcessingError::UnsupportedFormat,
            ) => ErrorKind::ImageFormatUnsupported,
            Self::Image(
                ImageProcessingError::InputTooLarge { .. } | ImageProcessingError::ImageTooLarge { .. },
            ) => ErrorKind::ImageTooLarge,
            Self::Image(_) => ErrorKind::ImageProcessing,
            Self::Config(_) => ErrorKind::Configuration,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Per-field messages, when this is a validation failure.
    #[must_use]
    pub fn field_errors(&self) -> Option<&ErrorMap> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation => "Please fix the highlighted fields before saving.".into(),
            ErrorKind::Busy => "A save is already in progress. Please wait for it to finish.".into(),
            ErrorKind::Storage => "Unable to save your changes. Your edits are kept, please try again.".into(),
            ErrorKind::NotFound => "The saved profile could not be found.".into(),
            ErrorKind::Location => {
                "Unable to determine your location. Please check your GPS settings.".into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Location access is required. Please enable location permissions in Settings.".into()
            }
            ErrorKind::Timeout => "Location detection timed out. Please try again.".into(),
            ErrorKind::Geocoding => {
                "Unable to find coordinates for this address. Please check the address fields.".into()
            }
            ErrorKind::ImageFormatUnsupported => {
                "This file is not a supported image. Please use JPEG, PNG, or WebP.".into()
            }
            ErrorKind::ImageTooLarge => "The image is too large. Please choose a smaller one.".into(),
            ErrorKind::ImageProcessing => {
                "Unable to process the image. Please try a different file.".into()
            }
            ErrorKind::Configuration => "The editor is misconfigured.".into(),
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
