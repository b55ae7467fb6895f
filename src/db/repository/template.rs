use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::rows::*;
use crate::error::ProtocolError;
use crate::models::*;

/// Writes a new template version. The version must directly follow the
/// latest stored one, otherwise the write is rejected as a conflict.
pub fn insert_template_version(
    conn: &Connection,
    template: &ProtocolTemplate,
) -> Result<(), ProtocolError> {
    let tx = conn.unchecked_transaction()?;

    let latest = latest_template_version(&tx, &template.id)?.unwrap_or(0);
    let expected = template.version.saturating_sub(1);
    if latest != expected {
        return Err(ProtocolError::conflict(
            "protocol template",
            template.id,
            i64::from(expected),
            i64::from(latest),
        ));
    }

    tx.execute(
        "INSERT INTO protocol_templates (id, version, name, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            template.id.to_string(),
            template.version,
            template.name,
            format_timestamp(&template.created_at),
        ],
    )?;

    for activity in &template.activities {
        tx.execute(
            "INSERT INTO template_activities (template_id, template_version, activity_id, position,
             category, custom_category, sub_category, frequency, duration_minutes, description,
             instructions, patient_action, doctor_action, media_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                template.id.to_string(),
                template.version,
                activity.id.to_string(),
                activity.position,
                activity.category.as_str(),
                activity.category.custom_label(),
                activity.sub_category,
                serde_json::to_string(&activity.frequency)?,
                activity.duration_minutes,
                activity.description,
                activity.instructions,
                activity.patient_action.as_str(),
                activity.doctor_action.as_str(),
                activity.media_ref,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

pub fn latest_template_version(conn: &Connection, id: &Uuid) -> Result<Option<u32>, ProtocolError> {
    let version = conn.query_row(
        "SELECT MAX(version) FROM protocol_templates WHERE id = ?1",
        params![id.to_string()],
        |row| row.get::<_, Option<u32>>(0),
    )?;
    Ok(version)
}

/// Fetches one template version; `None` selects the latest.
pub fn get_template(
    conn: &Connection,
    id: &Uuid,
    version: Option<u32>,
) -> Result<Option<ProtocolTemplate>, ProtocolError> {
    let version = match version {
        Some(v) => v,
        None => match latest_template_version(conn, id)? {
            Some(v) => v,
            None => return Ok(None),
        },
    };

    let header = conn
        .query_row(
            "SELECT name, created_at FROM protocol_templates WHERE id = ?1 AND version = ?2",
            params![id.to_string(), version],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((name, created_at)) = header else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM template_activities
         WHERE template_id = ?1 AND template_version = ?2
         ORDER BY position"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![id.to_string(), version], |row| {
        Ok(activity_row_from_rusqlite(row))
    })?;

    let mut activities = Vec::new();
    for row in rows {
        activities.push(activity_from_row(row??)?);
    }

    Ok(Some(ProtocolTemplate {
        id: *id,
        version,
        name,
        activities,
        created_at: parse_timestamp("created_at", &created_at)?,
    }))
}

/// Latest version of every template, by name.
pub fn list_templates(conn: &Connection) -> Result<Vec<TemplateSummary>, ProtocolError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.version, t.name, t.created_at,
                (SELECT COUNT(*) FROM template_activities a
                 WHERE a.template_id = t.id AND a.template_version = t.version) AS activity_count
         FROM protocol_templates t
         WHERE t.version = (SELECT MAX(version) FROM protocol_templates WHERE id = t.id)
         ORDER BY t.name COLLATE NOCASE, t.id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, u32>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, u32>(4)?,
        ))
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        let (id, version, name, created_at, activity_count) = row?;
        summaries.push(TemplateSummary {
            id: parse_uuid("id", &id)?,
            version,
            name,
            activity_count,
            created_at: parse_timestamp("created_at", &created_at)?,
        });
    }
    Ok(summaries)
}
