//! Schedule materializer — turns a pinned template version into a patient
//! instance with concrete, dated occurrences, and owns the instance lifecycle.
//!
//! Occurrence generation is keyed on (instance, activity, due date), so
//! re-running an expansion over a window that was already materialized
//! writes nothing new.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{ChangeOutcome, InstanceChange, PendingSweep, ProtocolStore, SweepAction};
use crate::error::ProtocolError;
use crate::frequency;
use crate::models::enums::InstanceStatus;
use crate::models::*;
use crate::templates;
use crate::timeline::{derive_status, DerivedStatus};
use crate::validation::validate_patient_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeRequest {
    pub template_id: Uuid,
    pub version: u32,
    pub patient_id: String,
    /// Anchor for every relative rule. Past dates are accepted.
    pub start_date: NaiveDate,
    pub horizon: NaiveDate,
}

/// Completion summary for one instance, statuses derived as of a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceProgress {
    pub instance_id: Uuid,
    pub total: u32,
    pub pending: u32,
    pub overdue: u32,
    pub completed: u32,
    pub skipped: u32,
    pub cancelled: u32,
    /// Completed share of non-cancelled occurrences, 0.0 when there are none.
    pub completion_ratio: f64,
}

/// Snapshots the template version into a new instance and expands every
/// activity from `start_date` to `horizon`.
pub fn materialize<S: ProtocolStore>(
    store: &S,
    request: &MaterializeRequest,
    now: NaiveDateTime,
) -> Result<ProtocolInstance, ProtocolError> {
    validate_patient_id(&request.patient_id)?;
    let template = templates::get_template(store, &request.template_id, Some(request.version))?;

    let instance_id = Uuid::new_v4();
    let activities: Vec<InstanceActivity> = template
        .activities
        .iter()
        .map(|definition| InstanceActivity {
            definition: definition.clone(),
            sequence_index: definition.position,
            anchor_date: request.start_date,
            active: true,
        })
        .collect();

    let occurrences: Vec<Occurrence> = activities
        .iter()
        .flat_map(|activity| expand_activity(instance_id, activity, request.horizon))
        .collect();

    let instance = ProtocolInstance {
        id: instance_id,
        patient_id: request.patient_id.trim().to_string(),
        template_id: template.id,
        template_version: template.version,
        name: template.name.clone(),
        start_date: request.start_date,
        horizon: request.horizon,
        status: InstanceStatus::Active,
        revision: 0,
        materialized_seq: 0,
        created_at: now,
        activities,
    };

    let (stored, inserted) = store.create_instance(&instance, &occurrences)?;
    tracing::info!(
        instance_id = %stored.id,
        template_id = %template.id,
        version = template.version,
        occurrences = inserted,
        "Protocol instance materialized"
    );
    Ok(stored)
}

/// Occurrences for one activity from its anchor through `horizon`.
pub(crate) fn expand_activity(
    instance_id: Uuid,
    activity: &InstanceActivity,
    horizon: NaiveDate,
) -> Vec<Occurrence> {
    let def = &activity.definition;
    let count = frequency::daily_count(&def.frequency);
    let dates = frequency::expand(&def.frequency, activity.anchor_date, horizon);
    tracing::debug!(activity_id = %def.id, dates = dates.len(), "Expanded activity");
    dates
        .into_iter()
        .map(|due| Occurrence::scheduled(instance_id, def.id, due, count))
        .collect()
}

/// Re-expands every active activity through `new_horizon`. Keys that already
/// exist are skipped, so repeated or concurrent runs converge on the same rows.
pub fn extend_window<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
    expected_revision: i64,
    new_horizon: NaiveDate,
) -> Result<ChangeOutcome, ProtocolError> {
    let instance = load_instance(store, instance_id)?;
    ensure_editable(&instance)?;

    let horizon = new_horizon.max(instance.horizon);
    let mut change = InstanceChange::new(&instance);
    change.expected_revision = expected_revision;
    change.horizon = Some(horizon);
    for activity in instance.active_activities() {
        change
            .new_occurrences
            .extend(expand_activity(instance.id, activity, horizon));
    }

    let outcome = store.apply_instance_change(&change)?;
    tracing::info!(
        instance_id = %instance.id,
        horizon = %outcome.instance.horizon,
        inserted = outcome.inserted,
        "Materialization window extended"
    );
    Ok(outcome)
}

/// Marks an instance completed. Pending occurrences due after `today` are
/// cancelled; everything up to today stays as it is.
pub fn complete_instance<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
    expected_revision: i64,
    today: NaiveDate,
) -> Result<ProtocolInstance, ProtocolError> {
    close_instance(store, instance_id, expected_revision, today, InstanceStatus::Completed)
}

/// Cancels an instance. Pending occurrences due after `today` are removed;
/// history up to today stays queryable.
pub fn cancel_instance<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
    expected_revision: i64,
    today: NaiveDate,
) -> Result<ProtocolInstance, ProtocolError> {
    close_instance(store, instance_id, expected_revision, today, InstanceStatus::Cancelled)
}

fn close_instance<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
    expected_revision: i64,
    today: NaiveDate,
    status: InstanceStatus,
) -> Result<ProtocolInstance, ProtocolError> {
    let instance = load_instance(store, instance_id)?;
    ensure_editable(&instance)?;

    let Some(tomorrow) = today.succ_opt() else {
        return Err(ProtocolError::Validation(format!("{today} has no following day")));
    };
    let action = match status {
        InstanceStatus::Cancelled => SweepAction::Discard,
        _ => SweepAction::Cancel,
    };

    let mut change = InstanceChange::new(&instance);
    change.expected_revision = expected_revision;
    change.status = Some(status);
    change.sweeps.push(PendingSweep {
        activity_id: None,
        from: tomorrow,
        action,
    });

    let outcome = store.apply_instance_change(&change)?;
    tracing::info!(
        instance_id = %instance.id,
        status = status.as_str(),
        removed = outcome.discarded,
        cancelled = outcome.cancelled,
        "Protocol instance closed"
    );
    Ok(outcome.instance)
}

pub fn instance_progress<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
    as_of: NaiveDate,
) -> Result<InstanceProgress, ProtocolError> {
    load_instance(store, instance_id)?;
    let occurrences = store.list_occurrences(instance_id)?;

    let mut progress = InstanceProgress {
        instance_id: *instance_id,
        total: occurrences.len() as u32,
        pending: 0,
        overdue: 0,
        completed: 0,
        skipped: 0,
        cancelled: 0,
        completion_ratio: 0.0,
    };

    for occ in &occurrences {
        match derive_status(occ, as_of) {
            Some(DerivedStatus::Pending) => progress.pending += 1,
            Some(DerivedStatus::Overdue) => progress.overdue += 1,
            Some(DerivedStatus::Completed) => progress.completed += 1,
            Some(DerivedStatus::Skipped) => progress.skipped += 1,
            None => progress.cancelled += 1,
        }
    }

    let live = progress.total - progress.cancelled;
    if live > 0 {
        progress.completion_ratio = f64::from(progress.completed) / f64::from(live);
    }
    Ok(progress)
}

pub(crate) fn load_instance<S: ProtocolStore>(
    store: &S,
    instance_id: &Uuid,
) -> Result<ProtocolInstance, ProtocolError> {
    store
        .get_instance(instance_id)?
        .ok_or_else(|| ProtocolError::not_found("protocol instance", instance_id))
}

pub(crate) fn ensure_editable(instance: &ProtocolInstance) -> Result<(), ProtocolError> {
    if !instance.status.is_editable() {
        return Err(ProtocolError::State(format!(
            "protocol instance {} is {} and can no longer change",
            instance.id,
            instance.status.as_str()
        )));
    }
    Ok(())
}
