//! JSON documents for moving protocols between systems.
//!
//! Documents carry structure only: store-assigned ids and creation
//! timestamps are left out, so exporting an imported template yields the
//! same document again.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::ProtocolStore;
use crate::error::ProtocolError;
use crate::materializer::load_instance;
use crate::models::enums::*;
use crate::models::*;
use crate::templates;
use crate::validation::{validate_draft, validate_patient_id};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub format_version: u32,
    pub name: String,
    /// In sequence order.
    pub activities: Vec<ActivityDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDocument {
    pub format_version: u32,
    pub name: String,
    pub patient_id: String,
    pub template_version: u32,
    pub start_date: NaiveDate,
    pub horizon: NaiveDate,
    pub status: InstanceStatus,
    pub activities: Vec<InstanceActivityDocument>,
    pub occurrences: Vec<OccurrenceDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceActivityDocument {
    #[serde(flatten)]
    pub activity: ActivityDraft,
    pub position: u32,
    pub sequence_index: u32,
    pub anchor_date: NaiveDate,
    pub active: bool,
}

/// Occurrence row; `activity` indexes into the document's activity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceDocument {
    pub activity: usize,
    pub due_date: NaiveDate,
    pub status: OccurrenceStatus,
    pub origin: OccurrenceOrigin,
    pub daily_count: u32,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub completion_note: Option<String>,
}

pub fn template_document(template: &ProtocolTemplate) -> TemplateDocument {
    let mut ordered: Vec<&ActivityDefinition> = template.activities.iter().collect();
    ordered.sort_by_key(|a| a.position);
    TemplateDocument {
        format_version: FORMAT_VERSION,
        name: template.name.clone(),
        activities: ordered.into_iter().map(ActivityDefinition::to_draft).collect(),
    }
}

pub fn export_template<S: ProtocolStore>(
    store: &S,
    id: &Uuid,
    version: Option<u32>,
) -> Result<TemplateDocument, ProtocolError> {
    let template = templates::get_template(store, id, version)?;
    Ok(template_document(&template))
}

pub fn parse_template_document(json: &str) -> Result<TemplateDocument, ProtocolError> {
    let document: TemplateDocument = serde_json::from_str(json)?;
    check_format(document.format_version)?;
    Ok(document)
}

/// Creates a new template (version 1, fresh ids) from a document.
pub fn import_template<S: ProtocolStore>(
    store: &S,
    json: &str,
    now: NaiveDateTime,
) -> Result<ProtocolTemplate, ProtocolError> {
    let document = parse_template_document(json)?;
    let template = templates::create_template(store, &document.name, document.activities, now)?;
    tracing::info!(template_id = %template.id, "Protocol template imported");
    Ok(template)
}

pub fn export_instance<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
) -> Result<InstanceDocument, ProtocolError> {
    let instance = load_instance(store, instance_id)?;
    let occurrences = store.list_occurrences(instance_id)?;
    instance_document(&instance, &occurrences)
}

pub fn instance_document(
    instance: &ProtocolInstance,
    occurrences: &[Occurrence],
) -> Result<InstanceDocument, ProtocolError> {
    let activities: Vec<InstanceActivityDocument> = instance
        .activities
        .iter()
        .map(|a| InstanceActivityDocument {
            activity: a.definition.to_draft(),
            position: a.definition.position,
            sequence_index: a.sequence_index,
            anchor_date: a.anchor_date,
            active: a.active,
        })
        .collect();

    let mut occurrences = occurrences
        .iter()
        .map(|occ| {
            let index = instance
                .activities
                .iter()
                .position(|a| a.definition.id == occ.activity_id)
                .ok_or_else(|| ProtocolError::not_found("activity", occ.activity_id))?;
            Ok(OccurrenceDocument {
                activity: index,
                due_date: occ.due_date,
                status: occ.status,
                origin: occ.origin,
                daily_count: occ.daily_count,
                completed_at: occ.completed_at,
                completion_note: occ.completion_note.clone(),
            })
        })
        .collect::<Result<Vec<_>, ProtocolError>>()?;
    // Store order falls back to ids; documents must not depend on them.
    occurrences.sort_by(|a, b| {
        (a.due_date, a.activity, a.completed_at, &a.completion_note).cmp(&(
            b.due_date,
            b.activity,
            b.completed_at,
            &b.completion_note,
        ))
    });

    Ok(InstanceDocument {
        format_version: FORMAT_VERSION,
        name: instance.name.clone(),
        patient_id: instance.patient_id.clone(),
        template_version: instance.template_version,
        start_date: instance.start_date,
        horizon: instance.horizon,
        status: instance.status,
        activities,
        occurrences,
    })
}

/// Parses an instance document and checks its occurrence references.
pub fn parse_instance_document(json: &str) -> Result<InstanceDocument, ProtocolError> {
    let document: InstanceDocument = serde_json::from_str(json)?;
    check_format(document.format_version)?;
    if let Some(bad) = document
        .occurrences
        .iter()
        .find(|o| o.activity >= document.activities.len())
    {
        return Err(ProtocolError::Validation(format!(
            "occurrence on {} references activity {} of {}",
            bad.due_date,
            bad.activity,
            document.activities.len()
        )));
    }
    Ok(document)
}

/// Recreates an exported instance for `template_id` at the document's
/// template version. The instance, its activities and its occurrences get
/// fresh ids; everything else, outcomes included, is kept as exported.
pub fn import_instance<S: ProtocolStore>(
    store: &S,
    json: &str,
    template_id: &Uuid,
    now: NaiveDateTime,
) -> Result<ProtocolInstance, ProtocolError> {
    let document = parse_instance_document(json)?;
    validate_patient_id(&document.patient_id)?;
    check_instance_activities(&document.activities)?;
    check_schedule_keys(&document.occurrences)?;
    let template = templates::get_template(store, template_id, Some(document.template_version))?;

    let instance_id = Uuid::new_v4();
    let activities: Vec<InstanceActivity> = document
        .activities
        .into_iter()
        .map(|a| InstanceActivity {
            definition: a.activity.into_definition(Uuid::new_v4(), a.position),
            sequence_index: a.sequence_index,
            anchor_date: a.anchor_date,
            active: a.active,
        })
        .collect();

    let occurrences: Vec<Occurrence> = document
        .occurrences
        .into_iter()
        .map(|o| Occurrence {
            id: Uuid::new_v4(),
            instance_id,
            activity_id: activities[o.activity].definition.id,
            due_date: o.due_date,
            status: o.status,
            origin: o.origin,
            daily_count: o.daily_count,
            completed_at: o.completed_at,
            completion_note: o.completion_note,
        })
        .collect();

    let instance = ProtocolInstance {
        id: instance_id,
        patient_id: document.patient_id.trim().to_string(),
        template_id: template.id,
        template_version: template.version,
        name: document.name,
        start_date: document.start_date,
        horizon: document.horizon,
        status: document.status,
        revision: 0,
        materialized_seq: 0,
        created_at: now,
        activities,
    };

    let (stored, inserted) = store.create_instance(&instance, &occurrences)?;
    tracing::info!(
        instance_id = %stored.id,
        template_id = %template.id,
        occurrences = inserted,
        "Protocol instance imported"
    );
    Ok(stored)
}

fn check_instance_activities(activities: &[InstanceActivityDocument]) -> Result<(), ProtocolError> {
    let mut indices = HashSet::new();
    let mut positions = HashSet::new();
    for activity in activities {
        validate_draft(&activity.activity)?;
        if !indices.insert(activity.sequence_index) {
            return Err(ProtocolError::Validation(format!(
                "sequence index {} is used twice",
                activity.sequence_index
            )));
        }
        if activity.active && !positions.insert(activity.position) {
            return Err(ProtocolError::Validation(format!(
                "position {} is used twice",
                activity.position
            )));
        }
    }
    Ok(())
}

/// Scheduled occurrences are unique per (activity, due date).
fn check_schedule_keys(occurrences: &[OccurrenceDocument]) -> Result<(), ProtocolError> {
    let mut keys = HashSet::new();
    for occ in occurrences.iter().filter(|o| o.origin == OccurrenceOrigin::Scheduled) {
        if !keys.insert((occ.activity, occ.due_date)) {
            return Err(ProtocolError::Validation(format!(
                "activity {} is scheduled twice on {}",
                occ.activity, occ.due_date
            )));
        }
    }
    Ok(())
}

pub fn to_json<T: Serialize>(document: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string_pretty(document)?)
}

fn check_format(version: u32) -> Result<(), ProtocolError> {
    if version != FORMAT_VERSION {
        return Err(ProtocolError::Validation(format!(
            "unsupported document format {version} (expected {FORMAT_VERSION})"
        )));
    }
    Ok(())
}
