//! Input checks shared by template authoring and the edit coordinator.

use crate::error::ProtocolError;
use crate::frequency;
use crate::models::*;

pub fn validate_activity(activity: &ActivityDefinition) -> Result<(), ProtocolError> {
    validate_category(&activity.category, &activity.sub_category)?;
    frequency::validate(&activity.frequency)
}

pub fn validate_draft(draft: &ActivityDraft) -> Result<(), ProtocolError> {
    validate_category(&draft.category, &draft.sub_category)?;
    frequency::validate(&draft.frequency)
}

fn validate_category(category: &ActivityCategory, sub_category: &str) -> Result<(), ProtocolError> {
    match category {
        ActivityCategory::Custom(label) => {
            if label.trim().is_empty() {
                return Err(ProtocolError::Validation(
                    "custom category needs a name".into(),
                ));
            }
        }
        fixed => {
            let allowed = subcategories_for(fixed);
            if !sub_category.is_empty() && !allowed.contains(&sub_category) {
                return Err(ProtocolError::Validation(format!(
                    "'{sub_category}' is not a {} sub-category (expected one of: {})",
                    fixed.label(),
                    allowed.join(", ")
                )));
            }
        }
    }
    Ok(())
}

pub fn validate_template_name(name: &str) -> Result<(), ProtocolError> {
    if name.trim().is_empty() {
        return Err(ProtocolError::Validation("template name is required".into()));
    }
    Ok(())
}

pub fn validate_patient_id(patient_id: &str) -> Result<(), ProtocolError> {
    if patient_id.trim().is_empty() {
        return Err(ProtocolError::Validation("patient id is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::FrequencyRule;
    use crate::models::enums::IntervalUnit;
    use std::collections::BTreeSet;

    #[test]
    fn fixed_category_sub_category_comes_from_catalogue() {
        let ok = ActivityDraft::new(ActivityCategory::Diet, "Hydration", FrequencyRule::Daily);
        assert!(validate_draft(&ok).is_ok());

        let unknown = ActivityDraft::new(ActivityCategory::Diet, "Cardio", FrequencyRule::Daily);
        assert!(matches!(validate_draft(&unknown), Err(ProtocolError::Validation(_))));

        let unset = ActivityDraft::new(ActivityCategory::Rest, "", FrequencyRule::Daily);
        assert!(validate_draft(&unset).is_ok());
    }

    #[test]
    fn custom_category_needs_a_label() {
        let blank =
            ActivityDraft::new(ActivityCategory::Custom("  ".into()), "", FrequencyRule::Daily);
        assert!(validate_draft(&blank).is_err());

        let yoga = ActivityCategory::Custom("Yoga".into());
        let named = ActivityDraft::new(yoga, "anything", FrequencyRule::Daily);
        assert!(validate_draft(&named).is_ok());
    }

    #[test]
    fn rule_problems_surface_as_validation_errors() {
        let empty_days = ActivityDraft::new(
            ActivityCategory::Medication,
            "Oral",
            FrequencyRule::ManualDates { start_month: 1, days_of_month: BTreeSet::new() },
        );
        assert!(matches!(validate_draft(&empty_days), Err(ProtocolError::Validation(_))));

        let zero = ActivityDraft::new(
            ActivityCategory::Medication,
            "Oral",
            FrequencyRule::Interval { every_n: 0, unit: IntervalUnit::Hours },
        );
        assert!(validate_draft(&zero).is_err());
    }

    #[test]
    fn names_and_patients_must_be_present() {
        assert!(validate_template_name("Knee Recovery").is_ok());
        assert!(validate_template_name(" ").is_err());
        assert!(validate_patient_id("").is_err());
        assert!(validate_patient_id("p-1").is_ok());
    }
}
