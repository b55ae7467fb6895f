use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::rows::*;
use crate::db::DatabaseError;
use crate::error::ProtocolError;
use crate::models::enums::*;
use crate::models::*;

pub fn get_occurrence(conn: &Connection, id: &Uuid) -> Result<Option<Occurrence>, ProtocolError> {
    let sql = format!("SELECT {OCCURRENCE_COLUMNS} FROM occurrences WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| Ok(occurrence_row_from_rusqlite(row)))
        .optional()?;

    match row {
        Some(row) => Ok(Some(occurrence_from_row(row?)?)),
        None => Ok(None),
    }
}

/// Every occurrence of an instance, cancelled ones included, by due date.
pub fn list_occurrences(
    conn: &Connection,
    instance_id: &Uuid,
) -> Result<Vec<Occurrence>, ProtocolError> {
    let sql = format!(
        "SELECT {OCCURRENCE_COLUMNS} FROM occurrences
         WHERE instance_id = ?1
         ORDER BY due_date, activity_id, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![instance_id.to_string()], |row| {
        Ok(occurrence_row_from_rusqlite(row))
    })?;

    let mut occurrences = Vec::new();
    for row in rows {
        occurrences.push(occurrence_from_row(row??)?);
    }
    Ok(occurrences)
}

/// Moves a pending occurrence to its terminal outcome. The pending-status
/// guard sits in the UPDATE itself, so two racing outcomes cannot both land.
pub fn record_outcome(
    conn: &Connection,
    occurrence_id: &Uuid,
    outcome: &OccurrenceOutcome,
) -> Result<Occurrence, ProtocolError> {
    let id = occurrence_id.to_string();
    let updated = conn.execute(
        "UPDATE occurrences SET status = ?2, completed_at = ?3, completion_note = ?4
         WHERE id = ?1 AND status = 'pending'",
        params![
            id,
            outcome.status.as_str(),
            format_timestamp(&outcome.completed_at),
            outcome.note,
        ],
    )?;

    if updated == 0 {
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM occurrences WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        return match status {
            None => Err(ProtocolError::not_found("occurrence", &id)),
            Some(status) => Err(ProtocolError::State(format!(
                "occurrence {id} is already {} and cannot change",
                OccurrenceStatus::from_str(&status)?.as_str()
            ))),
        };
    }

    get_occurrence(conn, occurrence_id)?.ok_or_else(|| ProtocolError::not_found("occurrence", &id))
}

pub fn insert_on_demand(conn: &Connection, occ: &Occurrence) -> Result<(), ProtocolError> {
    if !insert_occurrence_if_absent(conn, occ)? {
        return Err(DatabaseError::ConstraintViolation(format!(
            "occurrence {} already exists",
            occ.id
        ))
        .into());
    }
    Ok(())
}
