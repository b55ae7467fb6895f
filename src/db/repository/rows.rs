//! Column parsing shared by the entity repositories.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::error::ProtocolError;
use crate::frequency::FrequencyRule;
use crate::models::enums::*;
use crate::models::*;

pub(super) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(super) const ACTIVITY_COLUMNS: &str =
    "activity_id, position, category, custom_category, sub_category, frequency,
     duration_minutes, description, instructions, patient_action, doctor_action, media_ref";

pub(super) fn parse_uuid(column: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::MalformedValue {
        column: column.into(),
        reason: e.to_string(),
    })
}

pub(super) fn parse_date(column: &str, value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| DatabaseError::MalformedValue {
        column: column.into(),
        reason: e.to_string(),
    })
}

pub(super) fn parse_timestamp(column: &str, value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| {
        DatabaseError::MalformedValue {
            column: column.into(),
            reason: e.to_string(),
        }
    })
}

pub(super) fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

// Internal row type for activity mapping (template and instance tables share
// the leading columns).
pub(super) struct ActivityRow {
    id: String,
    position: u32,
    category: String,
    custom_category: Option<String>,
    sub_category: String,
    frequency: String,
    duration_minutes: Option<u32>,
    description: String,
    instructions: String,
    patient_action: String,
    doctor_action: String,
    media_ref: Option<String>,
}

pub(super) fn activity_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<ActivityRow, rusqlite::Error> {
    Ok(ActivityRow {
        id: row.get(0)?,
        position: row.get(1)?,
        category: row.get(2)?,
        custom_category: row.get(3)?,
        sub_category: row.get(4)?,
        frequency: row.get(5)?,
        duration_minutes: row.get(6)?,
        description: row.get(7)?,
        instructions: row.get(8)?,
        patient_action: row.get(9)?,
        doctor_action: row.get(10)?,
        media_ref: row.get(11)?,
    })
}

pub(super) fn activity_from_row(row: ActivityRow) -> Result<ActivityDefinition, ProtocolError> {
    let frequency: FrequencyRule = serde_json::from_str(&row.frequency)?;
    Ok(ActivityDefinition {
        id: parse_uuid("activity_id", &row.id)?,
        position: row.position,
        category: ActivityCategory::from_storage(&row.category, row.custom_category)?,
        sub_category: row.sub_category,
        frequency,
        duration_minutes: row.duration_minutes,
        description: row.description,
        instructions: row.instructions,
        patient_action: PatientActionKind::from_str(&row.patient_action)?,
        doctor_action: DoctorActionKind::from_str(&row.doctor_action)?,
        media_ref: row.media_ref,
    })
}

pub(super) const OCCURRENCE_COLUMNS: &str =
    "id, instance_id, activity_id, due_date, status, origin, daily_count,
     completed_at, completion_note";

// Internal row type for Occurrence mapping
pub(super) struct OccurrenceRow {
    id: String,
    instance_id: String,
    activity_id: String,
    due_date: String,
    status: String,
    origin: String,
    daily_count: u32,
    completed_at: Option<String>,
    completion_note: Option<String>,
}

pub(super) fn occurrence_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<OccurrenceRow, rusqlite::Error> {
    Ok(OccurrenceRow {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        activity_id: row.get(2)?,
        due_date: row.get(3)?,
        status: row.get(4)?,
        origin: row.get(5)?,
        daily_count: row.get(6)?,
        completed_at: row.get(7)?,
        completion_note: row.get(8)?,
    })
}

pub(super) fn occurrence_from_row(row: OccurrenceRow) -> Result<Occurrence, DatabaseError> {
    Ok(Occurrence {
        id: parse_uuid("id", &row.id)?,
        instance_id: parse_uuid("instance_id", &row.instance_id)?,
        activity_id: parse_uuid("activity_id", &row.activity_id)?,
        due_date: parse_date("due_date", &row.due_date)?,
        status: OccurrenceStatus::from_str(&row.status)?,
        origin: OccurrenceOrigin::from_str(&row.origin)?,
        daily_count: row.daily_count,
        completed_at: row
            .completed_at
            .as_deref()
            .map(|s| parse_timestamp("completed_at", s))
            .transpose()?,
        completion_note: row.completion_note,
    })
}

/// Inserts an occurrence unless a scheduled row already holds its
/// (instance, activity, due date) key. Returns whether a row was written.
pub(super) fn insert_occurrence_if_absent(
    conn: &Connection,
    occ: &Occurrence,
) -> Result<bool, DatabaseError> {
    let written = conn.execute(
        "INSERT OR IGNORE INTO occurrences (id, instance_id, activity_id, due_date, status,
         origin, daily_count, completed_at, completion_note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            occ.id.to_string(),
            occ.instance_id.to_string(),
            occ.activity_id.to_string(),
            occ.due_date.to_string(),
            occ.status.as_str(),
            occ.origin.as_str(),
            occ.daily_count,
            occ.completed_at.as_ref().map(format_timestamp),
            occ.completion_note,
        ],
    )?;
    Ok(written > 0)
}
