//! Reconciles the four coordinate sources into one lat/lng pair.
//!
//! Every path here produces a whole [`GeoPoint`] (or `None`), which the
//! editor then applies through a single entry point.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{GeoPoint, LocationSection};

pub const DEFAULT_GEOLOCATION_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_GEOLOCATION_MAX_AGE_MS: u64 = 60_000;

/// Options passed to the host's one-shot position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeolocationOptions {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    /// How old a cached fix may be and still be accepted.
    pub maximum_age_ms: u64,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: DEFAULT_GEOLOCATION_TIMEOUT_MS,
            maximum_age_ms: DEFAULT_GEOLOCATION_MAX_AGE_MS,
        }
    }
}

impl GeolocationOptions {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// The map surface the user can click on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapViewport {
    /// Used as the click origin while the profile has no coordinates yet.
    pub default_center: GeoPoint,
    /// Degrees of latitude covered by the full viewport height.
    pub lat_span_deg: f64,
    /// Degrees of longitude covered by the full viewport width.
    pub lng_span_deg: f64,
}

impl Default for MapViewport {
    fn default() -> Self {
        Self {
            default_center: new_york(),
            lat_span_deg: 0.02,
            lng_span_deg: 0.02,
        }
    }
}

pub(crate) const fn new_york() -> GeoPoint {
    GeoPoint::new_unchecked(40.7128, -74.0060)
}

impl MapViewport {
    #[must_use]
    pub fn center_for(&self, current: Option<GeoPoint>) -> GeoPoint {
        current.unwrap_or(self.default_center)
    }

    /// Translates a click at normalized `(x, y)` (origin top-left) into a
    /// coordinate relative to `center`. The same pixel gives a different
    /// point for a different center.
    #[must_use]
    pub fn click_to_point(&self, center: GeoPoint, x: f64, y: f64) -> GeoPoint {
        let x = clamp_unit(x);
        let y = clamp_unit(y);

        let lat = (center.lat() + (0.5 - y) * self.lat_span_deg).clamp(-90.0, 90.0);
        let lng = wrap_longitude(center.lng() + (x - 0.5) * self.lng_span_deg);

        GeoPoint::new(lat, lng).unwrap_or(center)
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.5
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 to -180; either is the same meridian.
    wrapped.clamp(-180.0, 180.0)
}

/// Parses the two manual inputs on commit. Anything that is not a usable
/// number clears the pair; validation then reports it as missing.
#[must_use]
pub fn parse_manual(latitude: &str, longitude: &str) -> Option<GeoPoint> {
    let lat = latitude.trim().parse::<f64>().ok()?;
    let lng = longitude.trim().parse::<f64>().ok()?;
    GeoPoint::new(lat, lng).ok()
}

/// Address text handed to the geocoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressQuery(String);

impl AddressQuery {
    /// Street, city, state and ZIP joined by ", ", skipping blanks. `None`
    /// when there is nothing to look up.
    #[must_use]
    pub fn from_location(location: &LocationSection) -> Option<Self> {
        let parts: Vec<&str> = [
            location.street.as_str(),
            location.city.as_str(),
            location.state.as_str(),
            location.zip_code.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(Self(parts.join(", ")))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
