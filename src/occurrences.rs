//! Completion events: the only path by which an occurrence reaches a
//! terminal status.

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::db::ProtocolStore;
use crate::error::ProtocolError;
use crate::frequency::FrequencyRule;
use crate::materializer::load_instance;
use crate::models::enums::{InstanceStatus, OccurrenceOrigin, OccurrenceStatus};
use crate::models::*;

/// Records a patient's or doctor's outcome for a pending occurrence.
///
/// Only `Completed` and `Skipped` are accepted, and only while the owning
/// instance is active. An occurrence that already has an outcome (or was
/// cancelled) is rejected with `State`.
pub fn record_outcome<S: ProtocolStore>(
    store: &S,
    occurrence_id: &Uuid,
    outcome: &OccurrenceOutcome,
) -> Result<Occurrence, ProtocolError> {
    if !matches!(outcome.status, OccurrenceStatus::Completed | OccurrenceStatus::Skipped) {
        return Err(ProtocolError::Validation(format!(
            "'{}' is not a recordable outcome",
            outcome.status.as_str()
        )));
    }

    let occurrence = store
        .get_occurrence(occurrence_id)?
        .ok_or_else(|| ProtocolError::not_found("occurrence", occurrence_id))?;
    ensure_active(store, &occurrence.instance_id)?;

    let updated = store.record_outcome(occurrence_id, outcome)?;
    tracing::info!(
        occurrence_id = %updated.id,
        instance_id = %updated.instance_id,
        status = updated.status.as_str(),
        "Occurrence outcome recorded"
    );
    Ok(updated)
}

/// Logs an ad-hoc completion for an as-needed activity. Several may be
/// logged on the same day.
pub fn record_as_needed<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
    activity_id: &Uuid,
    date: NaiveDate,
    completed_at: NaiveDateTime,
    note: Option<String>,
) -> Result<Occurrence, ProtocolError> {
    let instance = ensure_active(store, instance_id)?;
    let activity = instance
        .activity(activity_id)
        .filter(|a| a.active)
        .ok_or_else(|| ProtocolError::not_found("activity", activity_id))?;
    if activity.definition.frequency != FrequencyRule::AsNeeded {
        return Err(ProtocolError::Validation(format!(
            "activity {activity_id} is scheduled; record outcomes on its occurrences instead"
        )));
    }

    let occurrence = Occurrence {
        id: Uuid::new_v4(),
        instance_id: *instance_id,
        activity_id: *activity_id,
        due_date: date,
        status: OccurrenceStatus::Completed,
        origin: OccurrenceOrigin::OnDemand,
        daily_count: 1,
        completed_at: Some(completed_at),
        completion_note: note,
    };
    store.insert_on_demand(&occurrence)?;

    tracing::info!(
        occurrence_id = %occurrence.id,
        instance_id = %instance_id,
        date = %date,
        "As-needed occurrence logged"
    );
    Ok(occurrence)
}

fn ensure_active<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
) -> Result<ProtocolInstance, ProtocolError> {
    let instance = load_instance(store, instance_id)?;
    if instance.status != InstanceStatus::Active {
        return Err(ProtocolError::State(format!(
            "protocol instance {instance_id} is {}; outcomes are closed",
            instance.status.as_str()
        )));
    }
    Ok(instance)
}
