//! Crux capabilities the editor core talks to the shell through.
//!
//! Every host service is a request/response operation: the core emits an
//! [`Effect`], the shell performs it and resolves the request, and the
//! answer comes back into [`crate::App::update`] as an [`Event`].

mod image;
mod location;
mod prompt;
mod store;

pub use self::image::{DecodeOperation, ImageDecode};
pub use self::location::{
    GeocodeError, GeocodeOperation, Geocoding, Geolocation, GeolocationError, GeolocationOperation,
};
pub use self::prompt::{Confirm, ConfirmOperation};
pub use self::store::{SaveKind, Store, StoreError, StoreOperation, StoreOutput, StoreResult};

pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub store: Store<Event>,
    pub geolocation: Geolocation<Event>,
    pub geocoding: Geocoding<Event>,
    pub image_decode: ImageDecode<Event>,
    pub confirm: Confirm<Event>,
}
