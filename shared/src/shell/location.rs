use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::capabilities::{GeocodeError, GeolocationError};
use crate::coordinates::{new_york, AddressQuery, GeolocationOptions};
use crate::model::GeoPoint;

/// One-shot device position request.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self, options: GeolocationOptions) -> Result<GeoPoint, GeolocationError>;
}

/// Answers every request with the same result after an optional delay.
#[derive(Debug, Clone)]
pub struct FixedGeolocation {
    result: Result<GeoPoint, GeolocationError>,
    delay: Duration,
}

impl FixedGeolocation {
    #[must_use]
    pub fn at(point: GeoPoint) -> Self {
        Self {
            result: Ok(point),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn failing(error: GeolocationError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl GeolocationProvider for FixedGeolocation {
    async fn current_position(&self, options: GeolocationOptions) -> Result<GeoPoint, GeolocationError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        debug!(high_accuracy = options.high_accuracy, "fixed position served");
        self.result.clone()
    }
}

// ============================================================================
// Geocoding
// ============================================================================

/// Address text to coordinate lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &AddressQuery) -> Result<GeoPoint, GeocodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeocoderConfig {
    /// Point the simulated lookups cluster around.
    pub reference: GeoPoint,
    /// Maximum offset in degrees on each axis.
    pub jitter_deg: f64,
    /// Fixed seed for reproducible lookups.
    pub seed: Option<u64>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            reference: new_york(),
            jitter_deg: 0.01,
            seed: None,
        }
    }
}

/// Stand-in geocoder: returns a plausible point near the configured
/// reference for any non-empty address.
pub struct SimulatedGeocoder {
    config: GeocoderConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedGeocoder {
    #[must_use]
    pub fn new(config: GeocoderConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    fn offset(&self) -> (f64, f64) {
        let jitter = self.config.jitter_deg.abs();
        if jitter == 0.0 || !jitter.is_finite() {
            return (0.0, 0.0);
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter))
    }
}

#[async_trait]
impl Geocoder for SimulatedGeocoder {
    #[instrument(skip(self), fields(address = query.as_str()))]
    async fn geocode(&self, query: &AddressQuery) -> Result<GeoPoint, GeocodeError> {
        if query.as_str().trim().is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }
        let (dlat, dlng) = self.offset();
        let reference = self.config.reference;
        let lat = (reference.lat() + dlat).clamp(-90.0, 90.0);
        let lng = (reference.lng() + dlng).clamp(-180.0, 180.0);
        GeoPoint::new(lat, lng).map_err(|e| GeocodeError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationSection;

    fn query(street: &str) -> AddressQuery {
        let location = LocationSection {
            street: street.into(),
            ..LocationSection::default()
        };
        AddressQuery::from_location(&location).unwrap()
    }

    #[tokio::test]
    async fn fixed_geolocation_returns_configured_result() {
        let p = GeoPoint::new(51.5, -0.12).unwrap();
        let ok = FixedGeolocation::at(p);
        assert_eq!(ok.current_position(GeolocationOptions::default()).await, Ok(p));

        let denied = FixedGeolocation::failing(GeolocationError::PermissionDenied);
        assert_eq!(
            denied.current_position(GeolocationOptions::default()).await,
            Err(GeolocationError::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn simulated_geocoder_stays_near_reference() {
        let config = GeocoderConfig {
            seed: Some(7),
            ..GeocoderConfig::default()
        };
        let geocoder = SimulatedGeocoder::new(config);
        for _ in 0..20 {
            let p = geocoder.geocode(&query("123 Main St")).await.unwrap();
            assert!((p.lat() - config.reference.lat()).abs() <= config.jitter_deg + 1e-12);
            assert!((p.lng() - config.reference.lng()).abs() <= config.jitter_deg + 1e-12);
        }
    }

    #[tokio::test]
    async fn seeded_geocoders_agree() {
        let config = GeocoderConfig {
            seed: Some(42),
            ..GeocoderConfig::default()
        };
        let a = SimulatedGeocoder::new(config);
        let b = SimulatedGeocoder::new(config);
        assert_eq!(a.geocode(&query("1 Elm")).await, b.geocode(&query("1 Elm")).await);
    }

    #[tokio::test]
    async fn zero_jitter_returns_reference() {
        let config = GeocoderConfig {
            jitter_deg: 0.0,
            ..GeocoderConfig::default()
        };
        let p = SimulatedGeocoder::new(config).geocode(&query("x")).await.unwrap();
        assert_eq!(p, config.reference);
    }
}
