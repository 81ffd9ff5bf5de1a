//! Read-only projection handed to renderers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{GeoPoint, PreviewRef, ProfileSnapshot, UnixTimeMs};
use crate::validation::ErrorMap;

pub const NEVER_SAVED_TEXT: &str = "Never";

// --- Notices ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

/// Transient message for the user (save result, detection failure, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    pub created_at: UnixTimeMs,
    pub duration_ms: u64,
}

impl Notice {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: NoticeKind, now: UnixTimeMs) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at: now,
            duration_ms: kind.default_duration_ms(),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: UnixTimeMs) -> bool {
        now.elapsed_since(self.created_at) > self.duration_ms
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeView {
    pub message: String,
    pub kind: NoticeKind,
    pub duration_ms: u64,
}

impl From<&Notice> for NoticeView {
    fn from(n: &Notice) -> Self {
        Self {
            message: n.message.clone(),
            kind: n.kind,
            duration_ms: n.duration_ms,
        }
    }
}

// --- Relative time ---

/// "Just now", "5m ago", "3d ago", ... for `then` seen from `now`.
#[must_use]
pub fn format_time_ago(then: UnixTimeMs, now: UnixTimeMs) -> String {
    // Clock skew can put `then` slightly ahead of `now`.
    let secs = now.elapsed_since(then) / 1000;
    if secs < 5 {
        return "Just now".into();
    }
    if secs < 60 {
        return format!("{secs}s ago");
    }

    let mins = secs / 60;
    if mins < 60 {
        return format!("{mins}m ago");
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    match days {
        0..=6 => format!("{days}d ago"),
        7..=29 => format!("{}w ago", days / 7),
        30..=364 => format!("{}mo ago", days / 30),
        _ => format!("{}y ago", days / 365),
    }
}

#[must_use]
pub fn last_saved_text(last_saved: Option<UnixTimeMs>, now: UnixTimeMs) -> String {
    last_saved.map_or_else(|| NEVER_SAVED_TEXT.to_string(), |t| format_time_ago(t, now))
}

// --- Completion ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionCompletion {
    pub filled: usize,
    pub total: usize,
}

impl SectionCompletion {
    fn count(checks: &[bool]) -> Self {
        Self {
            filled: checks.iter().filter(|&&c| c).count(),
            total: checks.len(),
        }
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.filled == self.total
    }
}

/// How many fields of each panel carry a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub identity: SectionCompletion,
    pub location: SectionCompletion,
    pub credentials: SectionCompletion,
}

fn filled(s: &str) -> bool {
    !s.trim().is_empty()
}

impl CompletionSummary {
    #[must_use]
    pub fn of(snapshot: &ProfileSnapshot) -> Self {
        let id = &snapshot.identity;
        let loc = &snapshot.location;
        let cred = &snapshot.credentials;

        Self {
            identity: SectionCompletion::count(&[
                filled(&id.name),
                filled(&id.license_number),
                filled(&id.phone),
                filled(&id.email),
                filled(&id.operating_hours),
                filled(&id.description),
                filled(&id.website),
                filled(&id.emergency_contact),
            ]),
            location: SectionCompletion::count(&[
                filled(&loc.street),
                filled(&loc.city),
                filled(&loc.state),
                filled(&loc.zip_code),
                filled(&loc.country),
                loc.coordinates.is_some(),
            ]),
            credentials: SectionCompletion::count(&[
                filled(&cred.dea_number),
                filled(&cred.npi_number),
                filled(&cred.tax_id),
                cred.years_in_business > 0,
                filled(&cred.certification_number),
                cred.certification_expiry.is_some(),
                !cred.accepted_insurance.is_empty(),
                !cred.special_services.is_empty(),
                filled(&cred.special_notes),
            ]),
        }
    }
}

// --- View model ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewView {
    pub id: Uuid,
    pub media_type: String,
    pub width: u32,
    pub height: u32,
}

impl From<&PreviewRef> for PreviewView {
    fn from(p: &PreviewRef) -> Self {
        Self {
            id: p.id,
            media_type: p.media_type.clone(),
            width: p.width,
            height: p.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub snapshot: ProfileSnapshot,
    pub errors: ErrorMap,
    pub has_changes: bool,
    pub last_saved: Option<UnixTimeMs>,
    pub last_saved_text: String,
    pub is_saving: bool,
    /// A picked file is still being turned into a preview.
    pub is_decoding_image: bool,
    pub preview: Option<PreviewView>,
    pub map_center: GeoPoint,
    pub notice: Option<NoticeView>,
    pub can_save: bool,
    pub can_reset: bool,
    pub completion: CompletionSummary,
}
