use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::capabilities::{GeocodeError, GeolocationError, StoreError};
use crate::config::EditorConfig;
use crate::image_processing::ImageProcessingError;
use crate::model::{Certification, GeoPoint, ImageSelection, PharmacyType, PreviewRef, ProfileSnapshot};
use crate::validation::FieldKey;

// --- Typed field identifiers, one closed set per section ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityField {
    Name,
    LicenseNumber,
    Phone,
    Email,
    OperatingHours,
    Description,
    Website,
    EmergencyContact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationField {
    Street,
    City,
    State,
    ZipCode,
    Country,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialField {
    DeaNumber,
    NpiNumber,
    TaxId,
    CertificationNumber,
    SpecialNotes,
}

/// Any free-text field of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "section", content = "field", rename_all = "camelCase")]
pub enum TextField {
    Identity(IdentityField),
    Location(LocationField),
    Credential(CredentialField),
}

impl TextField {
    #[must_use]
    pub const fn key(self) -> FieldKey {
        match self {
            TextField::Identity(f) => match f {
                IdentityField::Name => FieldKey::Name,
                IdentityField::LicenseNumber => FieldKey::LicenseNumber,
                IdentityField::Phone => FieldKey::Phone,
                IdentityField::Email => FieldKey::Email,
                IdentityField::OperatingHours => FieldKey::OperatingHours,
                IdentityField::Description => FieldKey::Description,
                IdentityField::Website => FieldKey::Website,
                IdentityField::EmergencyContact => FieldKey::EmergencyContact,
            },
            TextField::Location(f) => match f {
                LocationField::Street => FieldKey::Street,
                LocationField::City => FieldKey::City,
                LocationField::State => FieldKey::State,
                LocationField::ZipCode => FieldKey::ZipCode,
                LocationField::Country => FieldKey::Country,
            },
            TextField::Credential(f) => match f {
                CredentialField::DeaNumber => FieldKey::DeaNumber,
                CredentialField::NpiNumber => FieldKey::NpiNumber,
                CredentialField::TaxId => FieldKey::TaxId,
                CredentialField::CertificationNumber => FieldKey::CertificationNumber,
                CredentialField::SpecialNotes => FieldKey::SpecialNotes,
            },
        }
    }
}

impl From<IdentityField> for TextField {
    fn from(f: IdentityField) -> Self {
        TextField::Identity(f)
    }
}

impl From<LocationField> for TextField {
    fn from(f: LocationField) -> Self {
        TextField::Location(f)
    }
}

impl From<CredentialField> for TextField {
    fn from(f: CredentialField) -> Self {
        TextField::Credential(f)
    }
}

/// A single-field edit with a value of the right type for that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldEdit {
    Text { field: TextField, value: String },
    PharmacyType { value: PharmacyType },
    PrimaryCertification { value: Certification },
    YearsInBusiness { value: u32 },
    CertificationExpiry { value: Option<NaiveDate> },
}

impl FieldEdit {
    pub fn text(field: impl Into<TextField>, value: impl Into<String>) -> Self {
        FieldEdit::Text {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The error-map entry this edit touches.
    #[must_use]
    pub const fn key(&self) -> FieldKey {
        match self {
            FieldEdit::Text { field, .. } => field.key(),
            FieldEdit::PharmacyType { .. } => FieldKey::PharmacyType,
            FieldEdit::PrimaryCertification { .. } => FieldKey::PrimaryCertification,
            FieldEdit::YearsInBusiness { .. } => FieldKey::YearsInBusiness,
            FieldEdit::CertificationExpiry { .. } => FieldKey::CertificationExpiry,
        }
    }
}

/// The two multi-valued fields of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MultiSelectField {
    AcceptedInsurance,
    SpecialServices,
}

impl MultiSelectField {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            MultiSelectField::AcceptedInsurance => "acceptedInsurance",
            MultiSelectField::SpecialServices => "specialServices",
        }
    }

    #[must_use]
    pub const fn key(self) -> FieldKey {
        match self {
            MultiSelectField::AcceptedInsurance => FieldKey::AcceptedInsurance,
            MultiSelectField::SpecialServices => FieldKey::SpecialServices,
        }
    }
}

impl fmt::Display for MultiSelectField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a multi-valued field: {0}")]
pub struct NotMultiSelect(pub String);

impl FromStr for MultiSelectField {
    type Err = NotMultiSelect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acceptedInsurance" => Ok(MultiSelectField::AcceptedInsurance),
            "specialServices" => Ok(MultiSelectField::SpecialServices),
            other => Err(NotMultiSelect(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    // --- Lifecycle ---
    Configure(Box<EditorConfig>),
    Open,

    // --- Form edits ---
    FieldEdited(FieldEdit),
    MultiSelectToggled {
        field: MultiSelectField,
        id: String,
        included: bool,
    },
    CoordinatesChanged(Option<GeoPoint>),
    ManualCoordinatesCommitted {
        latitude: String,
        longitude: String,
    },
    MapClicked {
        x: f64,
        y: f64,
    },
    DetectLocation,
    GeocodeAddress,
    ImageSelected(Option<Box<ImageSelection>>),

    // --- Commands ---
    Save,
    SaveDraft,
    Reset,
    NoticeDismissed,

    // --- Capability responses ---
    Loaded(Box<Result<ProfileSnapshot, StoreError>>),
    SaveCompleted(Result<(), StoreError>),
    ResetConfirmed(bool),
    ResetLoaded(Box<Result<ProfileSnapshot, StoreError>>),
    LocationDetected(Result<GeoPoint, GeolocationError>),
    AddressGeocoded(Result<GeoPoint, GeocodeError>),
    ImageDecoded {
        seq: u64,
        result: Box<Result<PreviewRef, ImageProcessingError>>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Event::Configure(_) => "configure",
            Event::Open => "open",
            Event::FieldEdited(_) => "field_edited",
            Event::MultiSelectToggled { .. } => "multi_select_toggled",
            Event::CoordinatesChanged(_) => "coordinates_changed",
            Event::ManualCoordinatesCommitted { .. } => "manual_coordinates_committed",
            Event::MapClicked { .. } => "map_clicked",
            Event::DetectLocation => "detect_location",
            Event::GeocodeAddress => "geocode_address",
            Event::ImageSelected(_) => "image_selected",
            Event::Save => "save",
            Event::SaveDraft => "save_draft",
            Event::Reset => "reset",
            Event::NoticeDismissed => "notice_dismissed",
            Event::Loaded(_) => "loaded",
            Event::SaveCompleted(_) => "save_completed",
            Event::ResetConfirmed(_) => "reset_confirmed",
            Event::ResetLoaded(_) => "reset_loaded",
            Event::LocationDetected(_) => "location_detected",
            Event::AddressGeocoded(_) => "address_geocoded",
            Event::ImageDecoded { .. } => "image_decoded",
        }
    }

    /// Convenience for shells that hold a plain selection.
    #[must_use]
    pub fn image_selected(selection: Option<ImageSelection>) -> Self {
        Event::ImageSelected(selection.map(Box::new))
    }
}
