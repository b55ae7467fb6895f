use chrono::NaiveDate;

use super::types::*;
use crate::db::ProtocolStore;
use crate::error::ProtocolError;
use crate::frequency;
use crate::models::enums::{InstanceStatus, OccurrenceStatus};
use crate::models::*;

/// Instance statuses the options ask for. Active is always included.
pub(super) fn wanted_statuses(options: &TimelineOptions) -> Vec<InstanceStatus> {
    let mut statuses = vec![InstanceStatus::Active];
    if options.include_completed_instances {
        statuses.push(InstanceStatus::Completed);
    }
    if options.include_cancelled_instances {
        statuses.push(InstanceStatus::Cancelled);
    }
    statuses
}

pub(super) fn fetch_instances<S: ProtocolStore>(
    store: &S,
    patient_id: &str,
    options: &TimelineOptions,
) -> Result<Vec<ProtocolInstance>, ProtocolError> {
    store.list_instances(patient_id, &wanted_statuses(options))
}

/// Visible entries of one instance within the option's date bounds.
pub(super) fn fetch_instance_entries<S: ProtocolStore>(
    store: &S,
    instance: &ProtocolInstance,
    as_of: NaiveDate,
    options: &TimelineOptions,
) -> Result<Vec<TimelineEntry>, ProtocolError> {
    let occurrences = store.list_occurrences(&instance.id)?;

    let mut entries = Vec::with_capacity(occurrences.len());
    for occ in occurrences {
        if !within_bounds(occ.due_date, options) {
            continue;
        }
        let Some(status) = derive_status(&occ, as_of) else {
            continue;
        };
        let Some(activity) = instance.activity(&occ.activity_id) else {
            tracing::warn!(
                occurrence_id = %occ.id,
                activity_id = %occ.activity_id,
                "Occurrence without activity, skipped"
            );
            continue;
        };
        entries.push(to_entry(instance, activity, occ, status));
    }
    Ok(entries)
}

/// Derived display status; `None` for cancelled occurrences, which the
/// timeline hides.
pub fn derive_status(occurrence: &Occurrence, as_of: NaiveDate) -> Option<DerivedStatus> {
    match occurrence.status {
        OccurrenceStatus::Completed => Some(DerivedStatus::Completed),
        OccurrenceStatus::Skipped => Some(DerivedStatus::Skipped),
        OccurrenceStatus::Cancelled => None,
        OccurrenceStatus::Pending if occurrence.due_date < as_of => Some(DerivedStatus::Overdue),
        OccurrenceStatus::Pending => Some(DerivedStatus::Pending),
    }
}

fn within_bounds(date: NaiveDate, options: &TimelineOptions) -> bool {
    options.date_from.map_or(true, |from| date >= from)
        && options.date_to.map_or(true, |to| date <= to)
}

fn to_entry(
    instance: &ProtocolInstance,
    activity: &InstanceActivity,
    occ: Occurrence,
    status: DerivedStatus,
) -> TimelineEntry {
    let def = &activity.definition;
    TimelineEntry {
        occurrence_id: occ.id,
        instance_id: instance.id,
        instance_name: instance.name.clone(),
        activity_id: def.id,
        category: def.category.clone(),
        sub_category: def.sub_category.clone(),
        description: def.description.clone(),
        frequency: frequency::describe(&def.frequency),
        due_date: occ.due_date,
        status,
        status_label: status.label().to_string(),
        origin: occ.origin,
        daily_count: occ.daily_count,
        duration_minutes: def.duration_minutes,
        patient_action: def.patient_action,
        doctor_action: def.doctor_action,
        completed_at: occ.completed_at,
        completion_note: occ.completion_note,
        instance_seq: instance.materialized_seq,
        sequence_index: activity.sequence_index,
        position: def.position,
    }
}
