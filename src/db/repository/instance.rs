use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::rows::*;
use super::{ChangeOutcome, InstanceChange, SweepAction};
use crate::error::ProtocolError;
use crate::models::enums::*;
use crate::models::*;

const INSTANCE_COLUMNS: &str =
    "seq, id, patient_id, template_id, template_version, name, start_date, horizon,
     status, revision, created_at";

/// Stores a freshly materialized instance with its activity copies and
/// occurrences in one transaction. Returns the instance with its
/// materialization sequence assigned.
pub fn insert_instance(
    conn: &Connection,
    instance: &ProtocolInstance,
    occurrences: &[Occurrence],
) -> Result<(ProtocolInstance, usize), ProtocolError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO protocol_instances (id, patient_id, template_id, template_version, name,
         start_date, horizon, status, revision, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            instance.id.to_string(),
            instance.patient_id,
            instance.template_id.to_string(),
            instance.template_version,
            instance.name,
            instance.start_date.to_string(),
            instance.horizon.to_string(),
            instance.status.as_str(),
            instance.revision,
            format_timestamp(&instance.created_at),
        ],
    )?;
    let seq = tx.last_insert_rowid();

    for activity in &instance.activities {
        upsert_instance_activity(&tx, &instance.id, activity)?;
    }

    let mut inserted = 0;
    for occ in occurrences {
        if insert_occurrence_if_absent(&tx, occ)? {
            inserted += 1;
        }
    }

    tx.commit()?;

    let mut stored = instance.clone();
    stored.materialized_seq = seq;
    Ok((stored, inserted))
}

fn upsert_instance_activity(
    conn: &Connection,
    instance_id: &Uuid,
    activity: &InstanceActivity,
) -> Result<(), ProtocolError> {
    let def = &activity.definition;
    conn.execute(
        "INSERT INTO instance_activities (instance_id, activity_id, position, active, anchor_date,
         category, custom_category, sub_category, frequency, duration_minutes, description,
         instructions, patient_action, doctor_action, media_ref, sequence_index)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         ON CONFLICT(instance_id, activity_id) DO UPDATE SET
            position = excluded.position,
            active = excluded.active,
            anchor_date = excluded.anchor_date,
            category = excluded.category,
            custom_category = excluded.custom_category,
            sub_category = excluded.sub_category,
            frequency = excluded.frequency,
            duration_minutes = excluded.duration_minutes,
            description = excluded.description,
            instructions = excluded.instructions,
            patient_action = excluded.patient_action,
            doctor_action = excluded.doctor_action,
            media_ref = excluded.media_ref",
        params![
            instance_id.to_string(),
            def.id.to_string(),
            def.position,
            activity.active as i32,
            activity.anchor_date.to_string(),
            def.category.as_str(),
            def.category.custom_label(),
            def.sub_category,
            serde_json::to_string(&def.frequency)?,
            def.duration_minutes,
            def.description,
            def.instructions,
            def.patient_action.as_str(),
            def.doctor_action.as_str(),
            def.media_ref,
            activity.sequence_index,
        ],
    )?;
    Ok(())
}

pub fn get_instance(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<ProtocolInstance>, ProtocolError> {
    let sql = format!("SELECT {INSTANCE_COLUMNS} FROM protocol_instances WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| Ok(instance_row_from_rusqlite(row)))
        .optional()?;

    match row {
        Some(row) => Ok(Some(instance_from_row(conn, row?)?)),
        None => Ok(None),
    }
}

/// A patient's instances in materialization order, restricted to `statuses`.
pub fn list_instances(
    conn: &Connection,
    patient_id: &str,
    statuses: &[InstanceStatus],
) -> Result<Vec<ProtocolInstance>, ProtocolError> {
    let sql = format!(
        "SELECT {INSTANCE_COLUMNS} FROM protocol_instances WHERE patient_id = ?1 ORDER BY seq"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id], |row| Ok(instance_row_from_rusqlite(row)))?;

    let mut instances = Vec::new();
    for row in rows {
        let row = row??;
        let instance = instance_from_row(conn, row)?;
        if statuses.contains(&instance.status) {
            instances.push(instance);
        }
    }
    Ok(instances)
}

/// Applies a versioned change set atomically. Any failure rolls the whole
/// change back.
pub fn apply_instance_change(
    conn: &Connection,
    change: &InstanceChange,
) -> Result<ChangeOutcome, ProtocolError> {
    let id = change.instance_id.to_string();
    let tx = conn.unchecked_transaction()?;

    let current: Option<i64> = tx
        .query_row(
            "SELECT revision FROM protocol_instances WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(current) = current else {
        return Err(ProtocolError::not_found("protocol instance", &id));
    };
    if current != change.expected_revision {
        return Err(ProtocolError::conflict(
            "protocol instance",
            &id,
            change.expected_revision,
            current,
        ));
    }

    let updated = tx.execute(
        "UPDATE protocol_instances
         SET revision = revision + 1,
             horizon = CASE WHEN ?3 IS NOT NULL AND ?3 > horizon THEN ?3 ELSE horizon END,
             status = COALESCE(?4, status)
         WHERE id = ?1 AND revision = ?2",
        params![
            id,
            change.expected_revision,
            change.horizon.map(|d| d.to_string()),
            change.status.map(|s| s.as_str()),
        ],
    )?;
    if updated == 0 {
        return Err(ProtocolError::conflict(
            "protocol instance",
            &id,
            change.expected_revision,
            current,
        ));
    }

    for activity in &change.activities {
        upsert_instance_activity(&tx, &change.instance_id, activity)?;
    }

    let mut discarded = 0;
    let mut cancelled = 0;
    for sweep in &change.sweeps {
        let activity_id = sweep.activity_id.map(|a| a.to_string());
        let from = sweep.from.to_string();
        match sweep.action {
            SweepAction::Discard => {
                discarded += tx.execute(
                    "DELETE FROM occurrences
                     WHERE instance_id = ?1 AND status = 'pending' AND origin = 'scheduled'
                       AND due_date >= ?2 AND (?3 IS NULL OR activity_id = ?3)",
                    params![id, from, activity_id],
                )?;
            }
            SweepAction::Cancel => {
                cancelled += tx.execute(
                    "UPDATE occurrences SET status = 'cancelled'
                     WHERE instance_id = ?1 AND status = 'pending'
                       AND due_date >= ?2 AND (?3 IS NULL OR activity_id = ?3)",
                    params![id, from, activity_id],
                )?;
            }
        }
    }

    let mut inserted = 0;
    for occ in &change.new_occurrences {
        if insert_occurrence_if_absent(&tx, occ)? {
            inserted += 1;
        }
    }

    tx.commit()?;

    let instance = get_instance(conn, &change.instance_id)?
        .ok_or_else(|| ProtocolError::not_found("protocol instance", &id))?;

    Ok(ChangeOutcome {
        instance,
        inserted,
        discarded,
        cancelled,
    })
}

// Internal row type for ProtocolInstance mapping
struct InstanceRow {
    seq: i64,
    id: String,
    patient_id: String,
    template_id: String,
    template_version: u32,
    name: String,
    start_date: String,
    horizon: String,
    status: String,
    revision: i64,
    created_at: String,
}

fn instance_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<InstanceRow, rusqlite::Error> {
    Ok(InstanceRow {
        seq: row.get(0)?,
        id: row.get(1)?,
        patient_id: row.get(2)?,
        template_id: row.get(3)?,
        template_version: row.get(4)?,
        name: row.get(5)?,
        start_date: row.get(6)?,
        horizon: row.get(7)?,
        status: row.get(8)?,
        revision: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn instance_from_row(
    conn: &Connection,
    row: InstanceRow,
) -> Result<ProtocolInstance, ProtocolError> {
    let id = parse_uuid("id", &row.id)?;
    Ok(ProtocolInstance {
        id,
        patient_id: row.patient_id,
        template_id: parse_uuid("template_id", &row.template_id)?,
        template_version: row.template_version,
        name: row.name,
        start_date: parse_date("start_date", &row.start_date)?,
        horizon: parse_date("horizon", &row.horizon)?,
        status: row.status.parse::<InstanceStatus>()?,
        revision: row.revision,
        materialized_seq: row.seq,
        created_at: parse_timestamp("created_at", &row.created_at)?,
        activities: fetch_instance_activities(conn, &id)?,
    })
}

/// Active activities first (by position), then retired ones.
fn fetch_instance_activities(
    conn: &Connection,
    instance_id: &Uuid,
) -> Result<Vec<InstanceActivity>, ProtocolError> {
    let sql = format!(
        "SELECT {ACTIVITY_COLUMNS}, sequence_index, active, anchor_date
         FROM instance_activities
         WHERE instance_id = ?1
         ORDER BY active DESC, position, sequence_index"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![instance_id.to_string()], |row| {
        Ok((
            activity_row_from_rusqlite(row)?,
            row.get::<_, u32>(12)?,
            row.get::<_, i32>(13)?,
            row.get::<_, String>(14)?,
        ))
    })?;

    let mut activities = Vec::new();
    for row in rows {
        let (activity, sequence_index, active, anchor_date) = row?;
        activities.push(InstanceActivity {
            definition: activity_from_row(activity)?,
            sequence_index,
            anchor_date: parse_date("anchor_date", &anchor_date)?,
            active: active != 0,
        });
    }
    Ok(activities)
}
