use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Explicit timestamp unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(get_current_time_ms())
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn elapsed_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[must_use]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Source of "now" for save timestamps and notices.
pub trait Clock: Send + Sync {
    fn now(&self) -> UnixTimeMs;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixTimeMs {
        UnixTimeMs::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: UnixTimeMs) -> Self {
        Self {
            now_ms: AtomicU64::new(start.0),
        }
    }

    pub fn set(&self, at: UnixTimeMs) {
        self.now_ms.store(at.0, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixTimeMs {
        UnixTimeMs(self.now_ms.load(Ordering::SeqCst))
    }
}

// --- Coordinates ---

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("coordinate is not a finite number: lat={lat}, lng={lng}")]
    NotFinite { lat: f64, lng: f64 },
    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(f64),
    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(f64),
}

/// Validated lat/lng pair. A profile either has both halves or neither.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint", into = "RawGeoPoint")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(CoordinateError::NotFinite { lat, lng });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// For compile-time constants that are known to be in range.
    pub(crate) const fn new_unchecked(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }
}

#[derive(Serialize, Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = CoordinateError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl From<GeoPoint> for RawGeoPoint {
    fn from(p: GeoPoint) -> Self {
        Self {
            latitude: p.lat,
            longitude: p.lng,
        }
    }
}

// --- Closed enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PharmacyType {
    #[default]
    Retail,
    Hospital,
    Clinical,
    Specialty,
    Compounding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Certification {
    #[default]
    Nabp,
    Achc,
    Pcab,
    Urac,
}

/// Implements the wire id <-> variant mapping for a closed enumeration.
macro_rules! closed_enum_ids {
    ($name:ident { $($variant:ident => $id:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub const fn id(self) -> &'static str {
                match self {
                    $($name::$variant => $id),+
                }
            }

            #[must_use]
            pub fn from_id(id: &str) -> Option<Self> {
                match id {
                    $($id => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.id())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceProvider {
    Medicare,
    Medicaid,
    BlueCrossBlueShield,
    Aetna,
    Cigna,
    UnitedHealthcare,
    Humana,
    KaiserPermanente,
    Tricare,
    ExpressScripts,
}

closed_enum_ids!(InsuranceProvider {
    Medicare => "medicare",
    Medicaid => "medicaid",
    BlueCrossBlueShield => "blue_cross_blue_shield",
    Aetna => "aetna",
    Cigna => "cigna",
    UnitedHealthcare => "united_healthcare",
    Humana => "humana",
    KaiserPermanente => "kaiser_permanente",
    Tricare => "tricare",
    ExpressScripts => "express_scripts",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialService {
    Delivery,
    Compounding,
    Immunizations,
    MedicationTherapyManagement,
    DriveThru,
    TwentyFourHour,
    DurableMedicalEquipment,
    SpecialtyMedications,
    BloodPressureScreening,
    MedicationSynchronization,
}

closed_enum_ids!(SpecialService {
    Delivery => "delivery",
    Compounding => "compounding",
    Immunizations => "immunizations",
    MedicationTherapyManagement => "medication_therapy_management",
    DriveThru => "drive_thru",
    TwentyFourHour => "twenty_four_hour",
    DurableMedicalEquipment => "durable_medical_equipment",
    SpecialtyMedications => "specialty_medications",
    BloodPressureScreening => "blood_pressure_screening",
    MedicationSynchronization => "medication_synchronization",
});

// --- Snapshot ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentitySection {
    pub name: String,
    pub license_number: String,
    #[serde(rename = "type")]
    pub pharmacy_type: PharmacyType,
    pub phone: String,
    pub email: String,
    pub operating_hours: String,
    pub description: String,
    pub website: String,
    pub emergency_contact: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationSection {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialSection {
    pub dea_number: String,
    pub npi_number: String,
    pub tax_id: String,
    pub years_in_business: u32,
    pub primary_certification: Certification,
    pub certification_number: String,
    pub certification_expiry: Option<NaiveDate>,
    pub accepted_insurance: BTreeSet<InsuranceProvider>,
    pub special_services: BTreeSet<SpecialService>,
    pub special_notes: String,
}

/// The persisted pharmacy profile being edited.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSnapshot {
    pub identity: IdentitySection,
    pub location: LocationSection,
    pub credentials: CredentialSection,
}

// --- Media ---

/// Raw image picked by the user. Holds the bytes so an uploader can use them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSelection {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl ImageSelection {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

// Don't dump image bytes into logs.
impl fmt::Debug for ImageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSelection")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Decoded, displayable preview of a selected image.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRef {
    pub id: Uuid,
    pub media_type: String,
    pub width: u32,
    pub height: u32,
    pub encoded: Bytes,
}

impl fmt::Debug for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewRef")
            .field("id", &self.id)
            .field("media_type", &self.media_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size_bytes", &self.encoded.len())
            .finish()
    }
}

/// Profile picture as held by the editor; never part of the persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    pub source: ImageSelection,
    pub preview: PreviewRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMetadata {
    pub has_changes: bool,
    pub last_saved: Option<UnixTimeMs>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_rejects_nan_and_infinity() {
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
    }

    #[test]
    fn geo_point_deserialization_validates() {
        let ok: GeoPoint = serde_json::from_str(r#"{"latitude":40.7128,"longitude":-74.006}"#).unwrap();
        assert_eq!(ok, GeoPoint::new(40.7128, -74.006).unwrap());

        let bad = serde_json::from_str::<GeoPoint>(r#"{"latitude":140.0,"longitude":0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let mut snapshot = ProfileSnapshot::default();
        snapshot.identity.license_number = "PH-1".into();
        snapshot.credentials.special_services.insert(SpecialService::Delivery);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["identity"]["licenseNumber"], "PH-1");
        assert_eq!(json["identity"]["type"], "retail");
        assert_eq!(json["credentials"]["specialServices"][0], "delivery");
    }

    #[test]
    fn closed_enum_ids_round_trip() {
        for provider in InsuranceProvider::ALL {
            assert_eq!(InsuranceProvider::from_id(provider.id()), Some(*provider));
        }
        assert_eq!(SpecialService::from_id("delivery"), Some(SpecialService::Delivery));
        assert_eq!(SpecialService::from_id("teleportation"), None);
    }

    #[test]
    fn image_selection_debug_hides_bytes() {
        let sel = ImageSelection::new("logo.png", "image/png", vec![1u8, 2, 3]);
        let debug = format!("{sel:?}");
        assert!(debug.contains("size_bytes: 3"));
        assert!(!debug.contains("[1, 2, 3]"));
    }

    #[test]
    fn media_type_check_is_case_insensitive() {
        assert!(ImageSelection::new("a", "IMAGE/JPEG", Vec::new()).is_image());
        assert!(!ImageSelection::new("a", "application/pdf", Vec::new()).is_image());
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(UnixTimeMs(1_000));
        clock.advance_ms(500);
        assert_eq!(clock.now(), UnixTimeMs(1_500));
    }
}
