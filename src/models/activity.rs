use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DoctorActionKind, PatientActionKind};
use crate::db::DatabaseError;
use crate::frequency::FrequencyRule;

// ═══════════════════════════════════════════
// Category — fixed set plus free-text custom
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Exercise,
    Consultation,
    Physiotherapy,
    Medication,
    Diet,
    Rest,
    Custom(String),
}

impl ActivityCategory {
    /// Storage key; custom categories keep their label in a separate column.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exercise => "exercise",
            Self::Consultation => "consultation",
            Self::Physiotherapy => "physiotherapy",
            Self::Medication => "medication",
            Self::Diet => "diet",
            Self::Rest => "rest",
            Self::Custom(_) => "custom",
        }
    }

    pub fn custom_label(&self) -> Option<&str> {
        match self {
            Self::Custom(label) => Some(label.as_str()),
            _ => None,
        }
    }

    /// Display label shown in protocol builders and timelines.
    pub fn label(&self) -> &str {
        match self {
            Self::Exercise => "Exercise",
            Self::Consultation => "Consultation",
            Self::Physiotherapy => "Physiotherapy",
            Self::Medication => "Medication",
            Self::Diet => "Diet",
            Self::Rest => "Rest",
            Self::Custom(label) => label.as_str(),
        }
    }

    pub fn from_storage(kind: &str, custom: Option<String>) -> Result<Self, DatabaseError> {
        match kind {
            "exercise" => Ok(Self::Exercise),
            "consultation" => Ok(Self::Consultation),
            "physiotherapy" => Ok(Self::Physiotherapy),
            "medication" => Ok(Self::Medication),
            "diet" => Ok(Self::Diet),
            "rest" => Ok(Self::Rest),
            "custom" => Ok(Self::Custom(custom.unwrap_or_default())),
            _ => Err(DatabaseError::InvalidEnum {
                field: "ActivityCategory".into(),
                value: kind.into(),
            }),
        }
    }
}

/// Allowed sub-categories for a fixed category. Custom categories are free text
/// and return an empty slice.
pub fn subcategories_for(category: &ActivityCategory) -> &'static [&'static str] {
    match category {
        ActivityCategory::Exercise => &[
            "Strength", "Mobility", "Cardio", "Balance", "Stretching", "Other",
        ],
        ActivityCategory::Consultation => &[
            "In person", "Video call", "Phone call", "Follow-up", "Other",
        ],
        ActivityCategory::Physiotherapy => &[
            "Manual therapy", "Electrotherapy", "Hydrotherapy", "Home program", "Other",
        ],
        ActivityCategory::Medication => &[
            "Oral", "Topical", "Injection", "Inhaled", "Other",
        ],
        ActivityCategory::Diet => &[
            "Meal plan", "Hydration", "Supplement", "Restriction", "Other",
        ],
        ActivityCategory::Rest => &[
            "Sleep", "Immobilisation", "Ice", "Elevation", "Other",
        ],
        ActivityCategory::Custom(_) => &[],
    }
}

// ═══════════════════════════════════════════
// Activity definitions
// ═══════════════════════════════════════════

/// One clinical activity inside a template or an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    pub id: Uuid,
    pub position: u32,
    pub category: ActivityCategory,
    pub sub_category: String,
    pub frequency: FrequencyRule,
    pub duration_minutes: Option<u32>,
    pub description: String,
    pub instructions: String,
    pub patient_action: PatientActionKind,
    pub doctor_action: DoctorActionKind,
    pub media_ref: Option<String>,
}

/// Authoring input for a new activity. Also the export shape: every structural
/// field, no server-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    pub category: ActivityCategory,
    #[serde(default)]
    pub sub_category: String,
    pub frequency: FrequencyRule,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "default_patient_action")]
    pub patient_action: PatientActionKind,
    #[serde(default = "default_doctor_action")]
    pub doctor_action: DoctorActionKind,
    #[serde(default)]
    pub media_ref: Option<String>,
}

fn default_patient_action() -> PatientActionKind {
    PatientActionKind::MarkDone
}

fn default_doctor_action() -> DoctorActionKind {
    DoctorActionKind::None
}

impl ActivityDraft {
    pub fn new(category: ActivityCategory, sub_category: &str, frequency: FrequencyRule) -> Self {
        Self {
            category,
            sub_category: sub_category.into(),
            frequency,
            duration_minutes: None,
            description: String::new(),
            instructions: String::new(),
            patient_action: default_patient_action(),
            doctor_action: default_doctor_action(),
            media_ref: None,
        }
    }

    pub fn into_definition(self, id: Uuid, position: u32) -> ActivityDefinition {
        ActivityDefinition {
            id,
            position,
            category: self.category,
            sub_category: self.sub_category,
            frequency: self.frequency,
            duration_minutes: self.duration_minutes,
            description: self.description,
            instructions: self.instructions,
            patient_action: self.patient_action,
            doctor_action: self.doctor_action,
            media_ref: self.media_ref,
        }
    }
}

impl ActivityDefinition {
    pub fn to_draft(&self) -> ActivityDraft {
        ActivityDraft {
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            frequency: self.frequency.clone(),
            duration_minutes: self.duration_minutes,
            description: self.description.clone(),
            instructions: self.instructions.clone(),
            patient_action: self.patient_action,
            doctor_action: self.doctor_action,
            media_ref: self.media_ref.clone(),
        }
    }
}

/// Partial update for an activity. `None` leaves a field untouched; the
/// nested options clear a value when set to `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(default)]
    pub category: Option<ActivityCategory>,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub frequency: Option<FrequencyRule>,
    #[serde(default)]
    pub duration_minutes: Option<Option<u32>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub patient_action: Option<PatientActionKind>,
    #[serde(default)]
    pub doctor_action: Option<DoctorActionKind>,
    #[serde(default)]
    pub media_ref: Option<Option<String>>,
}

impl ActivityPatch {
    pub fn frequency(rule: FrequencyRule) -> Self {
        Self {
            frequency: Some(rule),
            ..Self::default()
        }
    }

    /// Applies the patch. Returns true when the recurrence rule changed.
    pub fn apply_to(&self, activity: &mut ActivityDefinition) -> bool {
        if let Some(ref category) = self.category {
            activity.category = category.clone();
        }
        if let Some(ref sub) = self.sub_category {
            activity.sub_category = sub.clone();
        }
        if let Some(duration) = self.duration_minutes {
            activity.duration_minutes = duration;
        }
        if let Some(ref description) = self.description {
            activity.description = description.clone();
        }
        if let Some(ref instructions) = self.instructions {
            activity.instructions = instructions.clone();
        }
        if let Some(action) = self.patient_action {
            activity.patient_action = action;
        }
        if let Some(action) = self.doctor_action {
            activity.doctor_action = action;
        }
        if let Some(ref media) = self.media_ref {
            activity.media_ref = media.clone();
        }

        match self.frequency {
            Some(ref rule) if *rule != activity.frequency => {
                activity.frequency = rule.clone();
                true
            }
            _ => false,
        }
    }
}

/// Instance-local copy of an activity. `anchor_date` is the date its current
/// rule is expanded from: the instance start date, or the day the rule was
/// last changed. Removed activities stay with `active = false`.
///
/// `sequence_index` is fixed when the activity joins the instance and is
/// never reused, so it stays unique after reorders and removals. The
/// timeline orders same-day entries by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceActivity {
    #[serde(flatten)]
    pub definition: ActivityDefinition,
    pub sequence_index: u32,
    pub anchor_date: NaiveDate,
    pub active: bool,
}
