//! The profile form state machine, used as the app's model.
//!
//! [`ProfileEditor`] is the only writer of the snapshot. It is synchronous:
//! anything that has to wait on the shell is split into a `begin_*` step that
//! decides whether the request goes out and a `complete_*` step that applies
//! the answer, so edits keep flowing while the shell works.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capabilities::{SaveKind, StoreError};
use crate::config::EditorConfig;
use crate::coordinates::{parse_manual, GeolocationOptions, MapViewport};
use crate::error::EditorError;
use crate::event::{CredentialField, FieldEdit, IdentityField, LocationField, MultiSelectField, TextField};
use crate::image_processing::{DecodeRequest, ImagePreviewPipeline, ImageProcessingError};
use crate::model::{
    Clock, GeoPoint, ImageSelection, PreviewRef, ProfileImage, ProfileSnapshot, SaveMetadata, SystemClock,
    UnixTimeMs,
};
use crate::multiselect::MultiSelectFieldController;
use crate::validation::{self, ErrorMap, FieldKey};
use crate::view::{last_saved_text, CompletionSummary, Notice, NoticeKind, NoticeView, PreviewView, ViewModel};

#[derive(Debug, Clone, Copy)]
struct PendingSave {
    kind: SaveKind,
    revision: u64,
}

pub struct ProfileEditor {
    snapshot: ProfileSnapshot,
    image: Option<ProfileImage>,
    images: ImagePreviewPipeline,
    errors: ErrorMap,
    has_changes: bool,
    last_saved: Option<UnixTimeMs>,
    // Bumped on every accepted mutation.
    revision: u64,
    pending: Option<PendingSave>,
    notice: Option<Notice>,
    viewport: MapViewport,
    geolocation: GeolocationOptions,
    clock: Arc<dyn Clock>,
}

impl Default for ProfileEditor {
    fn default() -> Self {
        Self::new(ProfileSnapshot::default(), MapViewport::default())
    }
}

impl ProfileEditor {
    #[must_use]
    pub fn new(snapshot: ProfileSnapshot, viewport: MapViewport) -> Self {
        Self {
            snapshot,
            image: None,
            images: ImagePreviewPipeline::default(),
            errors: ErrorMap::new(),
            has_changes: false,
            last_saved: None,
            revision: 0,
            pending: None,
            notice: None,
            viewport,
            geolocation: GeolocationOptions::default(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn configure(&mut self, config: &EditorConfig) {
        self.viewport = config.map;
        self.geolocation = config.geolocation;
    }

    // --- Accessors ---

    #[must_use]
    pub fn snapshot(&self) -> &ProfileSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    #[must_use]
    pub fn image(&self) -> Option<&ProfileImage> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.has_changes
    }

    #[must_use]
    pub const fn last_saved(&self) -> Option<UnixTimeMs> {
        self.last_saved
    }

    #[must_use]
    pub const fn is_saving(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn is_decoding_image(&self) -> bool {
        self.images.is_decoding()
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub const fn metadata(&self) -> SaveMetadata {
        SaveMetadata {
            has_changes: self.has_changes,
            last_saved: self.last_saved,
        }
    }

    #[must_use]
    pub fn map_center(&self) -> GeoPoint {
        self.viewport.center_for(self.snapshot.location.coordinates)
    }

    #[must_use]
    pub const fn geolocation_options(&self) -> GeolocationOptions {
        self.geolocation
    }

    #[must_use]
    pub fn now(&self) -> UnixTimeMs {
        self.clock.now()
    }

    // --- Edits ---

    pub fn apply_field_change(&mut self, edit: FieldEdit) {
        let key = edit.key();
        match edit {
            FieldEdit::Text { field, value } => *self.text_slot(field) = value,
            FieldEdit::PharmacyType { value } => self.snapshot.identity.pharmacy_type = value,
            FieldEdit::PrimaryCertification { value } => {
                self.snapshot.credentials.primary_certification = value;
            }
            FieldEdit::YearsInBusiness { value } => self.snapshot.credentials.years_in_business = value,
            FieldEdit::CertificationExpiry { value } => {
                self.snapshot.credentials.certification_expiry = value;
            }
        }
        self.mark_changed(Some(key));
    }

    /// Returns `false` when `id` is not a member of the field's enumeration,
    /// in which case nothing changes.
    pub fn apply_multi_select_toggle(&mut self, field: MultiSelectField, id: &str, included: bool) -> bool {
        if !MultiSelectFieldController::recognizes(field, id) {
            debug!(%field, id, "toggle with unknown id ignored");
            return false;
        }
        MultiSelectFieldController::toggle(&mut self.snapshot.credentials, field, id, included);
        self.mark_changed(Some(field.key()));
        true
    }

    /// Single entry point for every coordinate source. The pair is written
    /// whole: either both halves or none.
    pub fn apply_coordinate_change(&mut self, point: Option<GeoPoint>) {
        self.snapshot.location.coordinates = point;
        self.mark_changed(Some(FieldKey::Coordinates));
    }

    /// Anything that is not a usable number clears the pair.
    pub fn apply_manual_coordinates(&mut self, latitude: &str, longitude: &str) {
        self.apply_coordinate_change(parse_manual(latitude, longitude));
    }

    pub fn apply_map_click(&mut self, x: f64, y: f64) {
        let point = self.viewport.click_to_point(self.map_center(), x, y);
        self.apply_coordinate_change(Some(point));
    }

    /// Direct image change. Supersedes any decode still in flight.
    pub fn apply_image_change(&mut self, image: Option<ProfileImage>) {
        self.images.cancel();
        self.image = image;
        self.mark_changed(None);
    }

    fn text_slot(&mut self, field: TextField) -> &mut String {
        let s = &mut self.snapshot;
        match field {
            TextField::Identity(f) => match f {
                IdentityField::Name => &mut s.identity.name,
                IdentityField::LicenseNumber => &mut s.identity.license_number,
                IdentityField::Phone => &mut s.identity.phone,
                IdentityField::Email => &mut s.identity.email,
                IdentityField::OperatingHours => &mut s.identity.operating_hours,
                IdentityField::Description => &mut s.identity.description,
                IdentityField::Website => &mut s.identity.website,
                IdentityField::EmergencyContact => &mut s.identity.emergency_contact,
            },
            TextField::Location(f) => match f {
                LocationField::Street => &mut s.location.street,
                LocationField::City => &mut s.location.city,
                LocationField::State => &mut s.location.state,
                LocationField::ZipCode => &mut s.location.zip_code,
                LocationField::Country => &mut s.location.country,
            },
            TextField::Credential(f) => match f {
                CredentialField::DeaNumber => &mut s.credentials.dea_number,
                CredentialField::NpiNumber => &mut s.credentials.npi_number,
                CredentialField::TaxId => &mut s.credentials.tax_id,
                CredentialField::CertificationNumber => &mut s.credentials.certification_number,
                CredentialField::SpecialNotes => &mut s.credentials.special_notes,
            },
        }
    }

    // Only the touched key is cleared; other errors wait for their own edit
    // or the next full pass.
    fn mark_changed(&mut self, key: Option<FieldKey>) {
        self.revision += 1;
        self.has_changes = true;
        if let Some(key) = key {
            self.errors.clear_field(key);
        }
    }

    /// Full validation pass; replaces the error map.
    pub fn validate_all(&mut self) -> &ErrorMap {
        self.errors = validation::validate(&self.snapshot);
        &self.errors
    }

    // --- Image ---

    /// Removal applies at once. An accepted file only hands out a decode
    /// request; the image changes when [`Self::complete_image_decode`] gets
    /// the matching result.
    pub fn begin_image_change(
        &mut self,
        selection: Option<ImageSelection>,
    ) -> Result<Option<DecodeRequest>, EditorError> {
        match self.images.select(selection)? {
            Some(request) => {
                debug!(seq = request.seq, selection = ?request.selection, "image decode requested");
                Ok(Some(request))
            }
            None => {
                self.image = None;
                self.mark_changed(None);
                Ok(None)
            }
        }
    }

    /// Returns `Ok(false)` for a result that was superseded by a newer
    /// selection, a removal or a reset.
    pub fn complete_image_decode(
        &mut self,
        seq: u64,
        result: Result<PreviewRef, ImageProcessingError>,
    ) -> Result<bool, EditorError> {
        match self.images.finish(seq, result) {
            None => {
                debug!(seq, "stale image decode dropped");
                Ok(false)
            }
            Some(Ok(image)) => {
                self.image = Some(image);
                self.mark_changed(None);
                Ok(true)
            }
            Some(Err(e)) => Err(e.into()),
        }
    }

    // --- Save lifecycle ---

    /// Lets a save through or refuses it. A publish runs full validation
    /// first and fails without side effects beyond the refreshed error map.
    /// Only one save may be in flight. Returns what has to be persisted.
    pub fn begin_save(&mut self, kind: SaveKind) -> Result<ProfileSnapshot, EditorError> {
        if let Some(pending) = &self.pending {
            debug!(in_flight = pending.kind.as_str(), requested = kind.as_str(), "save rejected, busy");
            return Err(EditorError::Busy);
        }

        if kind == SaveKind::Publish && !self.validate_all().is_empty() {
            info!(errors = self.errors.len(), "save blocked by validation");
            return Err(EditorError::Validation(self.errors.clone()));
        }

        self.pending = Some(PendingSave {
            kind,
            revision: self.revision,
        });
        debug!(kind = kind.as_str(), revision = self.revision, "save started");
        Ok(self.snapshot.clone())
    }

    /// Applies the store's answer. Edits made while the save was in flight
    /// keep the editor dirty. Returns the save time on success.
    pub fn complete_save(&mut self, result: Result<(), StoreError>) -> Result<UnixTimeMs, EditorError> {
        let Some(pending) = self.pending.take() else {
            warn!("save completion without a save in flight ignored");
            return Err(EditorError::Persistence(StoreError::UnexpectedResponse(
                "no save in flight".into(),
            )));
        };
        let now = self.now();

        match result {
            Ok(()) => {
                self.last_saved = Some(now);
                self.has_changes = self.revision != pending.revision;
                let message = match pending.kind {
                    SaveKind::Publish => "Profile saved",
                    SaveKind::Draft => "Draft saved",
                };
                self.notice = Some(Notice::new(message, NoticeKind::Success, now));
                info!(
                    kind = pending.kind.as_str(),
                    still_dirty = self.has_changes,
                    "save completed"
                );
                Ok(now)
            }
            Err(e) => {
                warn!(kind = pending.kind.as_str(), error = %e, "save failed");
                let err = EditorError::Persistence(e);
                self.notify(&err, NoticeKind::Error);
                Err(err)
            }
        }
    }

    // --- Load and reset ---

    /// Starts editing a freshly loaded profile.
    pub fn load(&mut self, snapshot: ProfileSnapshot) {
        self.replace_with(snapshot);
        info!(revision = self.revision, "profile loaded");
    }

    /// Replaces all local state with a freshly loaded snapshot. Refused
    /// while a save is in flight.
    pub fn complete_reset(&mut self, reloaded: ProfileSnapshot) -> Result<(), EditorError> {
        if self.is_saving() {
            return Err(EditorError::Busy);
        }
        self.replace_with(reloaded);
        info!(revision = self.revision, "profile reset to stored version");
        Ok(())
    }

    fn replace_with(&mut self, snapshot: ProfileSnapshot) {
        self.snapshot = snapshot;
        self.images.cancel();
        self.image = None;
        self.errors.clear();
        self.notice = None;
        self.has_changes = false;
        self.revision += 1;
    }

    // --- Notices ---

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// Raises the user-facing message for `err`.
    pub fn notify(&mut self, err: &EditorError, kind: NoticeKind) {
        self.notice = Some(Notice::new(err.user_facing_message(), kind, self.now()));
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // --- View ---

    #[must_use]
    pub fn view(&self) -> ViewModel {
        self.view_at(self.now())
    }

    #[must_use]
    pub fn view_at(&self, now: UnixTimeMs) -> ViewModel {
        let is_saving = self.is_saving();
        ViewModel {
            snapshot: self.snapshot.clone(),
            errors: self.errors.clone(),
            has_changes: self.has_changes,
            last_saved: self.last_saved,
            last_saved_text: last_saved_text(self.last_saved, now),
            is_saving,
            is_decoding_image: self.is_decoding_image(),
            preview: self.image.as_ref().map(|img| PreviewView::from(&img.preview)),
            map_center: self.map_center(),
            notice: self
                .notice
                .as_ref()
                .filter(|n| !n.is_expired(now))
                .map(NoticeView::from),
            can_save: !is_saving,
            can_reset: !is_saving,
            completion: CompletionSummary::of(&self.snapshot),
        }
    }
}

impl fmt::Debug for ProfileEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileEditor")
            .field("revision", &self.revision)
            .field("has_changes", &self.has_changes)
            .field("errors", &self.errors.len())
            .field("is_saving", &self.is_saving())
            .field("images", &self.images)
            .finish_non_exhaustive()
    }
}
