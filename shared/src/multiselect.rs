//! Membership toggles for the multi-valued credential fields.

use std::collections::BTreeSet;

use tracing::debug;

use crate::event::MultiSelectField;
use crate::model::{CredentialSection, InsuranceProvider, SpecialService};

/// Adds or removes `item`. Returns whether membership changed.
pub fn toggle<T: Ord>(set: &mut BTreeSet<T>, item: T, included: bool) -> bool {
    if included {
        set.insert(item)
    } else {
        set.remove(&item)
    }
}

pub struct MultiSelectFieldController;

impl MultiSelectFieldController {
    /// Toggles the identifier `id` in `field`. Identifiers outside the
    /// field's enumeration leave the section untouched. Returns whether
    /// membership changed.
    pub fn toggle(
        credentials: &mut CredentialSection,
        field: MultiSelectField,
        id: &str,
        included: bool,
    ) -> bool {
        match field {
            MultiSelectField::AcceptedInsurance => match InsuranceProvider::from_id(id) {
                Some(provider) => toggle(&mut credentials.accepted_insurance, provider, included),
                None => {
                    debug!(field = %field, id, "unknown insurance provider ignored");
                    false
                }
            },
            MultiSelectField::SpecialServices => match SpecialService::from_id(id) {
                Some(service) => toggle(&mut credentials.special_services, service, included),
                None => {
                    debug!(field = %field, id, "unknown special service ignored");
                    false
                }
            },
        }
    }

    /// Whether `id` belongs to the enumeration behind `field`.
    #[must_use]
    pub fn recognizes(field: MultiSelectField, id: &str) -> bool {
        match field {
            MultiSelectField::AcceptedInsurance => InsuranceProvider::from_id(id).is_some(),
            MultiSelectField::SpecialServices => SpecialService::from_id(id).is_some(),
        }
    }

    /// String-keyed variant for renderers that only know field names. Any
    /// name outside `acceptedInsurance`/`specialServices` is a no-op.
    pub fn toggle_by_name(
        credentials: &mut CredentialSection,
        field_name: &str,
        id: &str,
        included: bool,
    ) -> bool {
        match field_name.parse::<MultiSelectField>() {
            Ok(field) => Self::toggle(credentials, field, id, included),
            Err(e) => {
                debug!(error = %e, "toggle on non multi-valued field ignored");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn add_then_remove_restores_membership() {
        let mut creds = CredentialSection::default();
        creds.special_services.insert(SpecialService::Immunizations);
        let before = creds.special_services.clone();

        assert!(MultiSelectFieldController::toggle(
            &mut creds,
            MultiSelectField::SpecialServices,
            "delivery",
            true
        ));
        assert!(creds.special_services.contains(&SpecialService::Delivery));

        assert!(MultiSelectFieldController::toggle(
            &mut creds,
            MultiSelectField::SpecialServices,
            "delivery",
            false
        ));
        assert_eq!(creds.special_services, before);
    }

    #[test]
    fn repeated_add_is_idempotent() {
        let mut creds = CredentialSection::default();
        let field = MultiSelectField::AcceptedInsurance;
        assert!(MultiSelectFieldController::toggle(&mut creds, field, "aetna", true));
        assert!(!MultiSelectFieldController::toggle(&mut creds, field, "aetna", true));
        assert_eq!(creds.accepted_insurance.len(), 1);
    }

    #[test]
    fn removing_absent_id_is_noop() {
        let mut creds = CredentialSection::default();
        assert!(!MultiSelectFieldController::toggle(
            &mut creds,
            MultiSelectField::AcceptedInsurance,
            "cigna",
            false
        ));
        assert!(creds.accepted_insurance.is_empty());
    }

    #[test]
    fn unknown_ids_and_fields_are_ignored() {
        let mut creds = CredentialSection::default();
        let before = creds.clone();

        assert!(!MultiSelectFieldController::toggle(
            &mut creds,
            MultiSelectField::SpecialServices,
            "aetna",
            true
        ));
        assert!(!MultiSelectFieldController::toggle_by_name(&mut creds, "name", "delivery", true));
        assert!(!MultiSelectFieldController::toggle_by_name(&mut creds, "taxId", "x", true));
        assert_eq!(creds, before);
    }

    #[test]
    fn recognizes_only_ids_of_the_named_field() {
        assert!(MultiSelectFieldController::recognizes(MultiSelectField::AcceptedInsurance, "tricare"));
        assert!(!MultiSelectFieldController::recognizes(MultiSelectField::AcceptedInsurance, "delivery"));
        assert!(MultiSelectFieldController::recognizes(MultiSelectField::SpecialServices, "drive_thru"));
    }

    #[test]
    fn toggle_by_name_targets_only_named_field() {
        let mut creds = CredentialSection::default();
        creds.accepted_insurance.insert(InsuranceProvider::Medicare);

        assert!(MultiSelectFieldController::toggle_by_name(
            &mut creds,
            "specialServices",
            "compounding",
            true
        ));
        assert_eq!(creds.accepted_insurance.len(), 1);
        assert!(creds.special_services.contains(&SpecialService::Compounding));
    }

    proptest! {
        #[test]
        fn final_membership_follows_last_toggle(
            ops in proptest::collection::vec((0usize..SpecialService::ALL.len(), any::<bool>()), 0..40),
        ) {
            let mut creds = CredentialSection::default();
            let mut expected = BTreeSet::new();
            for (idx, included) in ops {
                let service = SpecialService::ALL[idx];
                MultiSelectFieldController::toggle(
                    &mut creds,
                    MultiSelectField::SpecialServices,
                    service.id(),
                    included,
                );
                if included { expected.insert(service); } else { expected.remove(&service); }
            }
            prop_assert_eq!(creds.special_services, expected);
            prop_assert!(creds.accepted_insurance.is_empty());
        }
    }
}
