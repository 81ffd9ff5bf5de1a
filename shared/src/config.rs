//! Editor configuration, loadable from JSON. Every section falls back to
//! its defaults when omitted.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shell::GeocoderConfig;
use crate::coordinates::{GeolocationOptions, MapViewport};
use crate::image_processing::ProcessingConfig;

pub const MAX_GEOLOCATION_TIMEOUT_MS: u64 = 120_000;
pub const MAX_MAP_SPAN_DEG: f64 = 90.0;
pub const MAX_GEOCODER_JITTER_DEG: f64 = 1.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub geolocation: GeolocationOptions,
    pub map: MapViewport,
    pub geocoding: GeocoderConfig,
    pub image: ProcessingConfig,
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = self.geolocation.timeout_ms;
        if timeout == 0 || timeout > MAX_GEOLOCATION_TIMEOUT_MS {
            return Err(invalid(
                "geolocation.timeoutMs",
                format!("{timeout} not in 1..={MAX_GEOLOCATION_TIMEOUT_MS}"),
            ));
        }

        for (field, span) in [
            ("map.latSpanDeg", self.map.lat_span_deg),
            ("map.lngSpanDeg", self.map.lng_span_deg),
        ] {
            if !(span.is_finite() && span > 0.0 && span <= MAX_MAP_SPAN_DEG) {
                return Err(invalid(field, format!("{span} not in (0, {MAX_MAP_SPAN_DEG}]")));
            }
        }

        let jitter = self.geocoding.jitter_deg;
        if !(jitter.is_finite() && (0.0..=MAX_GEOCODER_JITTER_DEG).contains(&jitter)) {
            return Err(invalid(
                "geocoding.jitterDeg",
                format!("{jitter} not in [0, {MAX_GEOCODER_JITTER_DEG}]"),
            ));
        }

        if self.image.preview_size == 0 {
            return Err(invalid("image.previewSize", "must be positive".into()));
        }
        if self.image.max_concurrent_ops == 0 {
            return Err(invalid("image.maxConcurrentOps", "must be positive".into()));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
