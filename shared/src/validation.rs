//! Field validation for the profile form.
//!
//! [`validate`] is a pure function of the snapshot. Each rule only looks at
//! its own field, so the resulting [`ErrorMap`] does not depend on the order
//! in which keys are checked.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::ProfileSnapshot;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
// ASCII digits only; `\d` would also accept other Unicode digits.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([0-9]{3}\) [0-9]{3}-[0-9]{4}$").expect("valid phone regex"));

pub const EMAIL_FORMAT_MESSAGE: &str = "Please enter a valid email address";
pub const PHONE_FORMAT_MESSAGE: &str = "Phone number must be in the format (555) 123-4567";
pub const COORDINATES_REQUIRED_MESSAGE: &str = "Location coordinates are required";

/// Error-map key. One per snapshot field, plus a combined key for the
/// coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    Name,
    LicenseNumber,
    #[serde(rename = "type")]
    PharmacyType,
    Phone,
    Email,
    OperatingHours,
    Description,
    Website,
    EmergencyContact,
    Street,
    City,
    State,
    ZipCode,
    Country,
    Coordinates,
    DeaNumber,
    NpiNumber,
    TaxId,
    YearsInBusiness,
    PrimaryCertification,
    CertificationNumber,
    CertificationExpiry,
    AcceptedInsurance,
    SpecialServices,
    SpecialNotes,
}

impl FieldKey {
    /// Keys that carry at least one rule.
    pub const VALIDATED: [FieldKey; 9] = [
        FieldKey::Name,
        FieldKey::LicenseNumber,
        FieldKey::Phone,
        FieldKey::Email,
        FieldKey::Street,
        FieldKey::City,
        FieldKey::State,
        FieldKey::ZipCode,
        FieldKey::Coordinates,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            FieldKey::Name => "Pharmacy name",
            FieldKey::LicenseNumber => "License number",
            FieldKey::PharmacyType => "Pharmacy type",
            FieldKey::Phone => "Phone number",
            FieldKey::Email => "Email",
            FieldKey::OperatingHours => "Operating hours",
            FieldKey::Description => "Description",
            FieldKey::Website => "Website",
            FieldKey::EmergencyContact => "Emergency contact",
            FieldKey::Street => "Street address",
            FieldKey::City => "City",
            FieldKey::State => "State",
            FieldKey::ZipCode => "ZIP code",
            FieldKey::Country => "Country",
            FieldKey::Coordinates => "Coordinates",
            FieldKey::DeaNumber => "DEA number",
            FieldKey::NpiNumber => "NPI number",
            FieldKey::TaxId => "Tax ID",
            FieldKey::YearsInBusiness => "Years in business",
            FieldKey::PrimaryCertification => "Primary certification",
            FieldKey::CertificationNumber => "Certification number",
            FieldKey::CertificationExpiry => "Certification expiry",
            FieldKey::AcceptedInsurance => "Accepted insurance",
            FieldKey::SpecialServices => "Special services",
            FieldKey::SpecialNotes => "Special notes",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field -> message. A key being present means the field currently fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<FieldKey, String>);

impl ErrorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: FieldKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn insert(&mut self, key: FieldKey, message: impl Into<String>) {
        self.0.insert(key, message.into());
    }

    /// Returns whether an entry was removed.
    pub fn clear_field(&mut self, key: FieldKey) -> bool {
        self.0.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Runs every rule against the snapshot.
#[must_use]
pub fn validate(snapshot: &ProfileSnapshot) -> ErrorMap {
    validate_keys(snapshot, FieldKey::VALIDATED)
}

/// Runs the rules for `keys` in the given order.
pub fn validate_keys(snapshot: &ProfileSnapshot, keys: impl IntoIterator<Item = FieldKey>) -> ErrorMap {
    let mut errors = ErrorMap::new();
    for key in keys {
        if let Some(message) = validate_field(snapshot, key) {
            errors.insert(key, message);
        }
    }
    errors
}

/// The message for `key`, or `None` when it passes. Fields without rules
/// always pass.
#[must_use]
pub fn validate_field(snapshot: &ProfileSnapshot, key: FieldKey) -> Option<String> {
    let identity = &snapshot.identity;
    let location = &snapshot.location;

    match key {
        FieldKey::Name => required(key, &identity.name),
        FieldKey::LicenseNumber => required(key, &identity.license_number),
        FieldKey::Street => required(key, &location.street),
        FieldKey::City => required(key, &location.city),
        FieldKey::State => required(key, &location.state),
        FieldKey::ZipCode => required(key, &location.zip_code),
        FieldKey::Email => required(key, &identity.email).or_else(|| {
            (!is_valid_email(&identity.email)).then(|| EMAIL_FORMAT_MESSAGE.to_string())
        }),
        FieldKey::Phone => required(key, &identity.phone).or_else(|| {
            (!is_valid_phone(&identity.phone)).then(|| PHONE_FORMAT_MESSAGE.to_string())
        }),
        FieldKey::Coordinates => location
            .coordinates
            .is_none()
            .then(|| COORDINATES_REQUIRED_MESSAGE.to_string()),
        _ => None,
    }
}

fn required(key: FieldKey, value: &str) -> Option<String> {
    value
        .trim()
        .is_empty()
        .then(|| format!("{} is required", key.label()))
}

/// Checks the value exactly as stored; surrounding whitespace fails.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Strict `(DDD) DDD-DDDD` on the raw value; international formats are
/// rejected on purpose.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}
