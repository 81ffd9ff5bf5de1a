//! The Crux app: routes every [`Event`] into the [`ProfileEditor`] model and
//! asks the shell, through [`Capabilities`], for whatever the event needs.
//! Answers come back as the response variants of [`Event`].

use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, GeocodeError, SaveKind};
use crate::coordinates::AddressQuery;
use crate::editor::ProfileEditor;
use crate::error::EditorError;
use crate::event::Event;
use crate::image_processing::DecodeRequest;
use crate::view::{NoticeKind, ViewModel};

pub const RESET_CONFIRMATION_MESSAGE: &str = "Discard all unsaved changes and reload the saved profile?";

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = ProfileEditor;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut ProfileEditor, caps: &Capabilities) {
        debug!(event = event.name(), revision = model.revision(), "update");

        match event {
            // --- Lifecycle ---
            Event::Configure(config) => match config.validate() {
                Ok(()) => model.configure(&config),
                Err(e) => {
                    warn!(error = %e, "configuration rejected");
                    model.notify(&EditorError::Config(e), NoticeKind::Error);
                }
            },
            Event::Open => caps.store.load(|result| Event::Loaded(Box::new(result))),
            Event::Loaded(result) => match *result {
                Ok(snapshot) => model.load(snapshot),
                Err(e) => {
                    warn!(error = %e, "profile load failed");
                    model.notify(&EditorError::Load(e), NoticeKind::Error);
                }
            },

            // --- Form edits ---
            Event::FieldEdited(edit) => model.apply_field_change(edit),
            Event::MultiSelectToggled { field, id, included } => {
                model.apply_multi_select_toggle(field, &id, included);
            }
            Event::CoordinatesChanged(point) => model.apply_coordinate_change(point),
            Event::ManualCoordinatesCommitted { latitude, longitude } => {
                model.apply_manual_coordinates(&latitude, &longitude);
            }
            Event::MapClicked { x, y } => model.apply_map_click(x, y),

            // --- Coordinates from the shell ---
            Event::DetectLocation => {
                caps.geolocation
                    .current_position(model.geolocation_options(), Event::LocationDetected);
            }
            Event::LocationDetected(Ok(point)) => {
                info!(lat = point.lat(), lng = point.lng(), "position detected");
                model.apply_coordinate_change(Some(point));
            }
            Event::LocationDetected(Err(e)) => {
                warn!(error = %e, "location detection failed");
                model.notify(&EditorError::Location(e), NoticeKind::Warning);
            }
            Event::GeocodeAddress => match AddressQuery::from_location(&model.snapshot().location) {
                Some(query) => caps.geocoding.geocode(query, Event::AddressGeocoded),
                None => model.notify(&EditorError::Geocode(GeocodeError::EmptyAddress), NoticeKind::Warning),
            },
            Event::AddressGeocoded(Ok(point)) => model.apply_coordinate_change(Some(point)),
            Event::AddressGeocoded(Err(e)) => {
                warn!(error = %e, "geocoding failed");
                model.notify(&EditorError::Geocode(e), NoticeKind::Warning);
            }

            // --- Image ---
            Event::ImageSelected(selection) => match model.begin_image_change(selection.map(|s| *s)) {
                Ok(Some(DecodeRequest { seq, selection })) => {
                    caps.image_decode.decode(selection, move |result| Event::ImageDecoded {
                        seq,
                        result: Box::new(result),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "image rejected");
                    model.notify(&e, NoticeKind::Error);
                }
            },
            Event::ImageDecoded { seq, result } => {
                if let Err(e) = model.complete_image_decode(seq, *result) {
                    warn!(seq, error = %e, "image decode failed");
                    model.notify(&e, NoticeKind::Error);
                }
            }

            // --- Save ---
            Event::Save => start_save(SaveKind::Publish, model, caps),
            Event::SaveDraft => start_save(SaveKind::Draft, model, caps),
            Event::SaveCompleted(result) => {
                if let Err(e) = model.complete_save(result) {
                    debug!(error = %e, "save did not complete");
                }
            }

            // --- Reset ---
            Event::Reset => {
                if model.is_saving() {
                    model.notify(&EditorError::Busy, NoticeKind::Warning);
                } else {
                    caps.confirm.ask(RESET_CONFIRMATION_MESSAGE, Event::ResetConfirmed);
                }
            }
            Event::ResetConfirmed(false) => debug!("reset declined"),
            Event::ResetConfirmed(true) => caps.store.load(|result| Event::ResetLoaded(Box::new(result))),
            Event::ResetLoaded(result) => match *result {
                Ok(snapshot) => {
                    if let Err(e) = model.complete_reset(snapshot) {
                        model.notify(&e, NoticeKind::Warning);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "reload for reset failed");
                    model.notify(&EditorError::Load(e), NoticeKind::Error);
                }
            },

            Event::NoticeDismissed => model.dismiss_notice(),
        }

        caps.render.render();
    }

    fn view(&self, model: &ProfileEditor) -> ViewModel {
        model.view()
    }
}

fn start_save(kind: SaveKind, model: &mut ProfileEditor, caps: &Capabilities) {
    match model.begin_save(kind) {
        Ok(snapshot) => caps.store.save(kind, snapshot, Event::SaveCompleted),
        Err(e @ EditorError::Busy) => model.notify(&e, NoticeKind::Warning),
        Err(e) => model.notify(&e, NoticeKind::Error),
    }
}
