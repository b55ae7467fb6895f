//! Protocol template store — authoring and versioning of reusable protocols.
//!
//! A template version is never modified once written. Every structural
//! change produces version N+1, so instances pinned to version N keep
//! exactly the definition they were materialized from.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::db::ProtocolStore;
use crate::error::ProtocolError;
use crate::models::*;
use crate::validation::{validate_activity, validate_draft, validate_template_name};

/// Creates version 1 of a new template. Activity ids are assigned here and
/// stay stable across all later versions.
pub fn create_template<S: ProtocolStore>(
    store: &S,
    name: &str,
    drafts: Vec<ActivityDraft>,
    now: NaiveDateTime,
) -> Result<ProtocolTemplate, ProtocolError> {
    validate_template_name(name)?;
    for draft in &drafts {
        validate_draft(draft)?;
    }

    let activities = drafts
        .into_iter()
        .enumerate()
        .map(|(i, draft)| draft.into_definition(Uuid::new_v4(), i as u32))
        .collect();

    let template = ProtocolTemplate {
        id: Uuid::new_v4(),
        version: 1,
        name: name.trim().to_string(),
        activities,
        created_at: now,
    };
    store.save_template_version(&template)?;

    tracing::info!(
        template_id = %template.id,
        activities = template.activities.len(),
        "Protocol template created"
    );
    Ok(template)
}

/// Fetches a version (latest when `None`), failing with `NotFound`.
pub fn get_template<S: ProtocolStore>(
    store: &S,
    id: &Uuid,
    version: Option<u32>,
) -> Result<ProtocolTemplate, ProtocolError> {
    store.get_template(id, version)?.ok_or_else(|| match version {
        Some(v) => ProtocolError::not_found("protocol template", format!("{id}@{v}")),
        None => ProtocolError::not_found("protocol template", id),
    })
}

pub fn list_templates<S: ProtocolStore>(store: &S) -> Result<Vec<TemplateSummary>, ProtocolError> {
    store.list_templates()
}

/// Loads the latest version and checks it against the caller's token.
pub(crate) fn load_for_edit<S: ProtocolStore>(
    store: &S,
    id: &Uuid,
    expected_version: u32,
) -> Result<ProtocolTemplate, ProtocolError> {
    let current = get_template(store, id, None)?;
    if current.version != expected_version {
        tracing::warn!(
            template_id = %id,
            expected = expected_version,
            actual = current.version,
            "Stale template version"
        );
        return Err(ProtocolError::conflict(
            "protocol template",
            id,
            i64::from(expected_version),
            i64::from(current.version),
        ));
    }
    Ok(current)
}

/// Writes `activities` and `name` as the version after `current`.
pub(crate) fn save_next_version<S: ProtocolStore>(
    store: &S,
    current: &ProtocolTemplate,
    name: String,
    activities: Vec<ActivityDefinition>,
    now: NaiveDateTime,
) -> Result<ProtocolTemplate, ProtocolError> {
    validate_template_name(&name)?;
    for activity in &activities {
        validate_activity(activity)?;
    }

    let next = ProtocolTemplate {
        id: current.id,
        version: current.version + 1,
        name,
        activities,
        created_at: now,
    };
    store.save_template_version(&next)?;

    tracing::info!(
        template_id = %next.id,
        version = next.version,
        "Protocol template version written"
    );
    Ok(next)
}

pub fn rename_template<S: ProtocolStore>(
    store: &S,
    id: &Uuid,
    expected_version: u32,
    name: &str,
    now: NaiveDateTime,
) -> Result<ProtocolTemplate, ProtocolError> {
    let current = load_for_edit(store, id, expected_version)?;
    let activities = current.activities.clone();
    save_next_version(store, &current, name.trim().to_string(), activities, now)
}
