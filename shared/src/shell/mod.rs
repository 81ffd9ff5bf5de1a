//! In-process host for the editor core.
//!
//! [`SimulatedShell`] does what a platform shell does in production: it
//! pushes [`Event`]s into the [`Core`], performs every [`Effect`] with the
//! injected [`Services`] and resolves the request with the outcome. Tests and
//! tooling drive the whole editor through it.

mod location;
mod prompt;
mod store;

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use crux_core::Core;
use tracing::{debug, instrument};

pub use self::location::{FixedGeolocation, Geocoder, GeocoderConfig, GeolocationProvider, SimulatedGeocoder};
pub use self::prompt::{ConfirmationPrompt, StaticPrompt};
pub use self::store::{InMemoryProfileStore, JsonFileProfileStore, ProfileStore};

use crate::app::App;
use crate::capabilities::{Effect, GeolocationError, StoreOperation, StoreOutput, StoreResult};
use crate::config::{ConfigError, EditorConfig};
use crate::event::Event;
use crate::image_processing::{ImageProcessingError, ImageProcessor};
use crate::model::{GeoPoint, ImageSelection, PreviewRef, ProfileSnapshot};
use crate::view::ViewModel;

/// Turns a user-selected file into a displayable preview.
#[async_trait]
pub trait ImageDecoder: Send + Sync {
    async fn decode(&self, image: &ImageSelection) -> Result<PreviewRef, ImageProcessingError>;
}

/// Host implementations behind each capability.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn ProfileStore>,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub geocoder: Arc<dyn Geocoder>,
    pub decoder: Arc<dyn ImageDecoder>,
    pub prompt: Arc<dyn ConfirmationPrompt>,
}

impl Services {
    /// In-process stand-ins: memory store seeded with `initial`, a device
    /// that reports `device_position`, a simulated geocoder, the real image
    /// processor and a prompt that always confirms.
    pub fn simulated(initial: ProfileSnapshot, device_position: GeoPoint, config: &EditorConfig) -> Self {
        Self {
            store: Arc::new(InMemoryProfileStore::new(initial)),
            geolocation: Arc::new(FixedGeolocation::at(device_position)),
            geocoder: Arc::new(SimulatedGeocoder::new(config.geocoding)),
            decoder: Arc::new(ImageProcessor::new(config.image.clone())),
            prompt: Arc::new(StaticPrompt::accepting()),
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_geolocation(mut self, geolocation: Arc<dyn GeolocationProvider>) -> Self {
        self.geolocation = geolocation;
        self
    }

    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        self.prompt = prompt;
        self
    }
}

pub struct SimulatedShell {
    core: Core<Effect, App>,
    services: Services,
}

impl SimulatedShell {
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self {
            core: Core::new::<crate::capabilities::Capabilities>(),
            services,
        }
    }

    /// Applies `config`, then loads the stored profile. A failed load leaves
    /// an empty form with an error notice.
    #[instrument(skip_all)]
    pub async fn open(services: Services, config: &EditorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let shell = Self::new(services);
        shell.dispatch(Event::Configure(Box::new(config.clone()))).await;
        shell.dispatch(Event::Open).await;
        Ok(shell)
    }

    /// Runs `event` and every effect that follows from it to completion.
    ///
    /// The core is never locked across an `.await`, so events dispatched from
    /// another task are processed while this one waits on a service.
    #[instrument(skip_all, fields(event = event.name()))]
    pub async fn dispatch(&self, event: Event) {
        let mut queue = VecDeque::from(self.core.process_event(event));
        while let Some(effect) = queue.pop_front() {
            queue.extend(self.perform(effect).await);
        }
    }

    #[must_use]
    pub fn view(&self) -> ViewModel {
        self.core.view()
    }

    async fn perform(&self, effect: Effect) -> Vec<Effect> {
        match effect {
            Effect::Render(_) => Vec::new(),
            Effect::Store(mut request) => {
                let output = self.store(&request.operation).await;
                self.core.resolve(&mut request, output)
            }
            Effect::Geolocation(mut request) => {
                let options = request.operation.options;
                debug!(timeout_ms = options.timeout_ms, "requesting device position");
                // Providers are trusted to honour the timeout, but not relied on.
                let output = tokio::time::timeout(
                    options.timeout(),
                    self.services.geolocation.current_position(options),
                )
                .await
                .unwrap_or(Err(GeolocationError::Timeout));
                self.core.resolve(&mut request, output)
            }
            Effect::Geocoding(mut request) => {
                let output = self.services.geocoder.geocode(&request.operation.query).await;
                self.core.resolve(&mut request, output)
            }
            Effect::ImageDecode(mut request) => {
                let output = self.services.decoder.decode(&request.operation.selection).await;
                self.core.resolve(&mut request, output)
            }
            Effect::Confirm(mut request) => {
                let output = self.services.prompt.confirm(&request.operation.message).await;
                self.core.resolve(&mut request, output)
            }
        }
    }

    async fn store(&self, operation: &StoreOperation) -> StoreResult {
        match operation {
            StoreOperation::Load => {
                let snapshot = self.services.store.load().await?;
                Ok(StoreOutput::Loaded(Box::new(snapshot)))
            }
            StoreOperation::Save { kind, snapshot } => {
                self.services.store.persist(*kind, snapshot).await?;
                Ok(StoreOutput::Saved)
            }
        }
    }
}

impl std::fmt::Debug for SimulatedShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedShell").finish_non_exhaustive()
    }
}
