use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinates::{AddressQuery, GeolocationOptions};
use crate::model::GeoPoint;

// ============================================================================
// Device position
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("location request timed out")]
    Timeout,
}

/// One-shot position request. The shell is expected to give up after
/// `options.timeout_ms` and answer [`GeolocationError::Timeout`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationOperation {
    pub options: GeolocationOptions,
}

impl Operation for GeolocationOperation {
    type Output = Result<GeoPoint, GeolocationError>;
}

pub struct Geolocation<Ev> {
    context: CapabilityContext<GeolocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Geolocation<Ev> {
    type Operation = GeolocationOperation;
    type MappedSelf<MappedEv> = Geolocation<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geolocation::new(self.context.map_event(f))
    }
}

impl<Ev> Geolocation<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<GeolocationOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn current_position<F>(&self, options: GeolocationOptions, callback: F)
    where
        F: FnOnce(Result<GeoPoint, GeolocationError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(GeolocationOperation { options }).await;
            ctx.update_app(callback(result));
        });
    }
}

// ============================================================================
// Geocoding
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeocodeError {
    #[error("address is empty")]
    EmptyAddress,

    #[error("no match for address")]
    NoMatch,

    #[error("geocoding failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeOperation {
    pub query: AddressQuery,
}

impl Operation for GeocodeOperation {
    type Output = Result<GeoPoint, GeocodeError>;
}

pub struct Geocoding<Ev> {
    context: CapabilityContext<GeocodeOperation, Ev>,
}

impl<Ev> Capability<Ev> for Geocoding<Ev> {
    type Operation = GeocodeOperation;
    type MappedSelf<MappedEv> = Geocoding<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geocoding::new(self.context.map_event(f))
    }
}

impl<Ev> Geocoding<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<GeocodeOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn geocode<F>(&self, query: AddressQuery, callback: F)
    where
        F: FnOnce(Result<GeoPoint, GeocodeError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(GeocodeOperation { query }).await;
            ctx.update_app(callback(result));
        });
    }
}
