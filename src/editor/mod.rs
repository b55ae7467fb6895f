//! Edit coordinator — structural edits to templates and running instances.
//!
//! Template edits never touch existing rows: they write the next version.
//! Instance edits mutate the instance's own activity copies and reconcile
//! its occurrences in one revision-guarded change. Occurrences that already
//! have an outcome, or are due before the edit date, are never rewritten.
//! On an instance that has not started yet, changes take effect from its
//! start date.

mod sequence;

pub use sequence::ActivitySequence;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{ChangeOutcome, InstanceChange, PendingSweep, ProtocolStore, SweepAction};
use crate::error::ProtocolError;
use crate::materializer::{ensure_editable, expand_activity, load_instance};
use crate::models::*;
use crate::templates;

/// What an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EditTarget {
    Template(Uuid),
    Instance(Uuid),
}

/// Result of an edit: the new template version, or the changed instance.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Edited {
    Template(ProtocolTemplate),
    Instance(ChangeOutcome),
}

impl Edited {
    /// Token to send with the next edit of the same target.
    pub fn token(&self) -> i64 {
        match self {
            Self::Template(template) => i64::from(template.version),
            Self::Instance(outcome) => outcome.instance.revision,
        }
    }
}

/// Moves the activity at position `from` to position `to`.
pub fn reorder_activities<S: ProtocolStore>(
    store: &S,
    target: EditTarget,
    expected: i64,
    from: usize,
    to: usize,
    now: NaiveDateTime,
) -> Result<Edited, ProtocolError> {
    match target {
        EditTarget::Template(id) => edit_template(store, &id, expected, now, |sequence| {
            sequence.reorder(from, to)
        }),
        EditTarget::Instance(id) => {
            let instance = load_for_edit(store, &id, expected)?;
            let sequence = active_sequence(&instance).reorder(from, to)?;

            let mut change = InstanceChange::new(&instance);
            change.activities = resequenced(&instance, &sequence);
            apply(store, &change, "reorder")
        }
    }
}

/// Patches one activity. On an instance, a rule change replaces the
/// activity's pending occurrences from the edit date onward with ones
/// expanded from the new rule.
pub fn update_activity<S: ProtocolStore>(
    store: &S,
    target: EditTarget,
    expected: i64,
    activity_id: &Uuid,
    patch: &ActivityPatch,
    now: NaiveDateTime,
) -> Result<Edited, ProtocolError> {
    match target {
        EditTarget::Template(id) => edit_template(store, &id, expected, now, |sequence| {
            sequence.update(activity_id, patch).map(|(next, _)| next)
        }),
        EditTarget::Instance(id) => {
            let instance = load_for_edit(store, &id, expected)?;
            let effective = effective_from(&instance, now);
            let (sequence, rule_changed) =
                active_sequence(&instance).update(activity_id, patch)?;

            let mut activity = instance_activity(&instance, activity_id)?;
            if let Some(definition) = sequence.get(activity_id) {
                activity.definition = definition.clone();
            }

            let mut change = InstanceChange::new(&instance);
            if rule_changed {
                activity.anchor_date = effective;
                change.sweeps.push(PendingSweep {
                    activity_id: Some(*activity_id),
                    from: effective,
                    action: SweepAction::Discard,
                });
                change.new_occurrences =
                    expand_activity(instance.id, &activity, instance.horizon);
            }
            change.activities.push(activity);
            apply(store, &change, "update")
        }
    }
}

/// Removes an activity. On an instance it is retired rather than deleted:
/// pending occurrences from the edit date onward are cancelled and its
/// history stays queryable.
pub fn delete_activity<S: ProtocolStore>(
    store: &S,
    target: EditTarget,
    expected: i64,
    activity_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Edited, ProtocolError> {
    match target {
        EditTarget::Template(id) => edit_template(store, &id, expected, now, |sequence| {
            sequence.remove(activity_id).map(|(next, _)| next)
        }),
        EditTarget::Instance(id) => {
            let instance = load_for_edit(store, &id, expected)?;
            let (sequence, _) = active_sequence(&instance).remove(activity_id)?;

            let mut retired = instance_activity(&instance, activity_id)?;
            retired.active = false;

            let mut change = InstanceChange::new(&instance);
            change.activities = resequenced(&instance, &sequence);
            change.activities.push(retired);
            change.sweeps.push(PendingSweep {
                activity_id: Some(*activity_id),
                from: effective_from(&instance, now),
                action: SweepAction::Cancel,
            });
            apply(store, &change, "delete")
        }
    }
}

/// Appends a new activity. On an instance it is expanded from the edit date
/// (or the start date, if later) to the current horizon.
pub fn add_activity<S: ProtocolStore>(
    store: &S,
    target: EditTarget,
    expected: i64,
    draft: ActivityDraft,
    now: NaiveDateTime,
) -> Result<Edited, ProtocolError> {
    let activity_id = Uuid::new_v4();
    match target {
        EditTarget::Template(id) => edit_template(store, &id, expected, now, |sequence| {
            sequence.add(activity_id, draft)
        }),
        EditTarget::Instance(id) => {
            let instance = load_for_edit(store, &id, expected)?;
            let sequence = active_sequence(&instance).add(activity_id, draft)?;

            let definition = sequence
                .get(&activity_id)
                .cloned()
                .ok_or_else(|| ProtocolError::not_found("activity", activity_id))?;
            let added = InstanceActivity {
                definition,
                sequence_index: instance.next_sequence_index(),
                anchor_date: effective_from(&instance, now),
                active: true,
            };

            let mut change = InstanceChange::new(&instance);
            change.new_occurrences = expand_activity(instance.id, &added, instance.horizon);
            change.activities.push(added);
            apply(store, &change, "add")
        }
    }
}

fn edit_template<S, F>(
    store: &S,
    id: &Uuid,
    expected: i64,
    now: NaiveDateTime,
    transition: F,
) -> Result<Edited, ProtocolError>
where
    S: ProtocolStore,
    F: FnOnce(ActivitySequence) -> Result<ActivitySequence, ProtocolError>,
{
    let expected_version = u32::try_from(expected)
        .map_err(|_| ProtocolError::Validation(format!("invalid template version {expected}")))?;
    let current = templates::load_for_edit(store, id, expected_version)?;
    let sequence = transition(ActivitySequence::new(current.activities.clone()))?;
    let next = templates::save_next_version(
        store,
        &current,
        current.name.clone(),
        sequence.into_vec(),
        now,
    )?;
    Ok(Edited::Template(next))
}

fn load_for_edit<S: ProtocolStore>(
    store: &S,
    id: &Uuid,
    expected_revision: i64,
) -> Result<ProtocolInstance, ProtocolError> {
    let instance = load_instance(store, id)?;
    ensure_editable(&instance)?;
    if instance.revision != expected_revision {
        tracing::warn!(
            instance_id = %id,
            expected = expected_revision,
            actual = instance.revision,
            "Stale instance revision"
        );
        return Err(ProtocolError::conflict(
            "protocol instance",
            id,
            expected_revision,
            instance.revision,
        ));
    }
    Ok(instance)
}

/// First date an instance edit applies to.
fn effective_from(instance: &ProtocolInstance, now: NaiveDateTime) -> NaiveDate {
    now.date().max(instance.start_date)
}

fn active_sequence(instance: &ProtocolInstance) -> ActivitySequence {
    ActivitySequence::new(
        instance
            .active_activities()
            .into_iter()
            .map(|a| a.definition.clone())
            .collect(),
    )
}

/// Instance activity copies carrying the positions from `sequence`.
fn resequenced(instance: &ProtocolInstance, sequence: &ActivitySequence) -> Vec<InstanceActivity> {
    sequence
        .as_slice()
        .iter()
        .filter_map(|definition| {
            instance.activity(&definition.id).map(|stored| InstanceActivity {
                definition: definition.clone(),
                sequence_index: stored.sequence_index,
                anchor_date: stored.anchor_date,
                active: stored.active,
            })
        })
        .collect()
}

fn instance_activity(
    instance: &ProtocolInstance,
    activity_id: &Uuid,
) -> Result<InstanceActivity, ProtocolError> {
    instance
        .activity(activity_id)
        .cloned()
        .ok_or_else(|| ProtocolError::not_found("activity", activity_id))
}

fn apply<S: ProtocolStore>(
    store: &S,
    change: &InstanceChange,
    operation: &str,
) -> Result<Edited, ProtocolError> {
    let outcome = store.apply_instance_change(change)?;
    tracing::info!(
        instance_id = %change.instance_id,
        operation,
        revision = outcome.instance.revision,
        inserted = outcome.inserted,
        discarded = outcome.discarded,
        cancelled = outcome.cancelled,
        "Instance edited"
    );
    Ok(Edited::Instance(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteProtocolStore;
    use crate::frequency::FrequencyRule;
    use crate::materializer::{cancel_instance, extend_window, materialize, MaterializeRequest};
    use crate::models::enums::{InstanceStatus, IntervalUnit, OccurrenceStatus};
    use crate::timeline::{build_timeline, TimelineOptions};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate) -> NaiveDateTime {
        day.and_hms_opt(10, 0, 0).unwrap()
    }

    fn setup(
        drafts: Vec<ActivityDraft>,
        start: NaiveDate,
        horizon: NaiveDate,
    ) -> (SqliteProtocolStore, ProtocolTemplate, ProtocolInstance) {
        let store = SqliteProtocolStore::open_in_memory().unwrap();
        let template =
            templates::create_template(&store, "Knee Recovery", drafts, at(start)).unwrap();
        let instance = materialize(
            &store,
            &MaterializeRequest {
                template_id: template.id,
                version: 1,
                patient_id: "patient-1".into(),
                start_date: start,
                horizon,
            },
            at(start),
        )
        .unwrap();
        (store, template, instance)
    }

    fn daily_exercise() -> ActivityDraft {
        ActivityDraft::new(ActivityCategory::Exercise, "Mobility", FrequencyRule::Daily)
    }

    fn daily_rest() -> ActivityDraft {
        ActivityDraft::new(ActivityCategory::Rest, "Ice", FrequencyRule::Daily)
    }

    fn weekly_consult() -> ActivityDraft {
        ActivityDraft::new(ActivityCategory::Consultation, "Follow-up", FrequencyRule::Weekly)
    }

    fn complete(store: &SqliteProtocolStore, occurrence: &Occurrence) {
        store
            .record_outcome(
                &occurrence.id,
                &OccurrenceOutcome {
                    status: OccurrenceStatus::Completed,
                    completed_at: at(occurrence.due_date),
                    note: None,
                },
            )
            .unwrap();
    }

    fn instance_outcome(edited: Edited) -> ChangeOutcome {
        match edited {
            Edited::Instance(outcome) => outcome,
            Edited::Template(_) => panic!("expected an instance edit"),
        }
    }

    fn template_version(edited: Edited) -> ProtocolTemplate {
        match edited {
            Edited::Template(template) => template,
            Edited::Instance(_) => panic!("expected a template edit"),
        }
    }

    fn pending_dates(
        store: &SqliteProtocolStore,
        instance_id: &Uuid,
        activity: &Uuid,
    ) -> Vec<NaiveDate> {
        store
            .list_occurrences(instance_id)
            .unwrap()
            .into_iter()
            .filter(|o| o.activity_id == *activity && o.status == OccurrenceStatus::Pending)
            .map(|o| o.due_date)
            .collect()
    }

    #[test]
    fn frequency_edit_keeps_completed_and_replaces_pending() {
        let (store, template, instance) =
            setup(vec![daily_exercise()], date(2026, 3, 1), date(2026, 3, 5));
        let activity_id = template.activities[0].id;
        let before = store.list_occurrences(&instance.id).unwrap();
        assert_eq!(before.len(), 5);
        complete(&store, &before[0]);
        complete(&store, &before[1]);

        let patch = ActivityPatch::frequency(FrequencyRule::Interval {
            every_n: 2,
            unit: IntervalUnit::Days,
        });
        let edited = update_activity(
            &store,
            EditTarget::Instance(instance.id),
            instance.revision,
            &activity_id,
            &patch,
            at(date(2026, 3, 3)),
        )
        .unwrap();
        let outcome = instance_outcome(edited);
        assert_eq!(outcome.discarded, 3);
        assert_eq!(outcome.inserted, 2);

        let after = store.list_occurrences(&instance.id).unwrap();
        let completed: Vec<Uuid> = after
            .iter()
            .filter(|o| o.status == OccurrenceStatus::Completed)
            .map(|o| o.id)
            .collect();
        assert_eq!(completed, vec![before[0].id, before[1].id]);

        assert_eq!(
            pending_dates(&store, &instance.id, &activity_id),
            vec![date(2026, 3, 3), date(2026, 3, 5)]
        );
        assert!(after
            .iter()
            .filter(|o| o.status == OccurrenceStatus::Pending)
            .all(|o| before.iter().all(|b| b.id != o.id)));

        let stored = store.get_instance(&instance.id).unwrap().unwrap();
        assert_eq!(stored.activities[0].anchor_date, date(2026, 3, 3));
    }

    #[test]
    fn non_rule_update_leaves_occurrences_alone() {
        let (store, template, instance) =
            setup(vec![daily_exercise()], date(2026, 3, 1), date(2026, 3, 5));
        let patch = ActivityPatch {
            instructions: Some("Use the resistance band".into()),
            ..ActivityPatch::default()
        };
        let edited = update_activity(
            &store,
            EditTarget::Instance(instance.id),
            0,
            &template.activities[0].id,
            &patch,
            at(date(2026, 3, 2)),
        )
        .unwrap();
        let outcome = instance_outcome(edited);
        assert_eq!(outcome.discarded, 0);
        assert_eq!(outcome.inserted, 0);

        let activity = &outcome.instance.activities[0];
        assert_eq!(activity.definition.instructions, "Use the resistance band");
        assert_eq!(activity.anchor_date, date(2026, 3, 1));
    }

    #[test]
    fn edits_before_start_take_effect_from_start_date() {
        let start = date(2026, 3, 10);
        let (store, template, instance) =
            setup(vec![daily_exercise()], start, date(2026, 3, 20));
        let activity_id = template.activities[0].id;

        let patch = ActivityPatch::frequency(FrequencyRule::Interval {
            every_n: 2,
            unit: IntervalUnit::Days,
        });
        let edited = update_activity(
            &store,
            EditTarget::Instance(instance.id),
            instance.revision,
            &activity_id,
            &patch,
            at(date(2026, 3, 1)),
        )
        .unwrap();
        let outcome = instance_outcome(edited);
        assert_eq!(outcome.discarded, 11);
        assert_eq!(outcome.instance.activities[0].anchor_date, start);
        assert_eq!(
            pending_dates(&store, &instance.id, &activity_id),
            vec![
                date(2026, 3, 10),
                date(2026, 3, 12),
                date(2026, 3, 14),
                date(2026, 3, 16),
                date(2026, 3, 18),
                date(2026, 3, 20),
            ]
        );

        let edited = add_activity(
            &store,
            EditTarget::Instance(instance.id),
            outcome.instance.revision,
            weekly_consult(),
            at(date(2026, 3, 1)),
        )
        .unwrap();
        let outcome = instance_outcome(edited);
        let added = &outcome.instance.active_activities()[1];
        assert_eq!(added.anchor_date, start);
        assert_eq!(
            pending_dates(&store, &instance.id, &added.definition.id),
            vec![date(2026, 3, 10), date(2026, 3, 17)]
        );

        assert!(store
            .list_occurrences(&instance.id)
            .unwrap()
            .iter()
            .all(|o| o.due_date >= start));
    }

    #[test]
    fn delete_with_one_completed_leaves_one_visible() {
        let (store, template, instance) =
            setup(vec![daily_exercise()], date(2026, 3, 1), date(2026, 3, 5));
        let before = store.list_occurrences(&instance.id).unwrap();
        complete(&store, &before[0]);

        let edited = delete_activity(
            &store,
            EditTarget::Instance(instance.id),
            instance.revision,
            &template.activities[0].id,
            at(date(2026, 3, 2)),
        )
        .unwrap();
        let outcome = instance_outcome(edited);
        assert_eq!(outcome.cancelled, 4);
        assert!(outcome.instance.active_activities().is_empty());
        assert!(!outcome.instance.activities[0].active);

        // Cancelled rows stay stored for audit.
        assert_eq!(store.list_occurrences(&instance.id).unwrap().len(), 5);

        let options = TimelineOptions::default();
        let timeline = build_timeline(&store, "patient-1", date(2026, 3, 2), &options).unwrap();
        let visible: usize = timeline.days.iter().map(|d| d.entries.len()).sum();
        assert_eq!(visible, 1);
    }

    #[test]
    fn deleted_activity_keeps_its_place_on_earlier_days() {
        let (store, template, instance) =
            setup(vec![daily_exercise(), daily_rest()], date(2026, 3, 1), date(2026, 3, 5));
        let exercise = template.activities[0].id;
        let rest = template.activities[1].id;
        let first_day = store
            .list_occurrences(&instance.id)
            .unwrap()
            .into_iter()
            .find(|o| o.activity_id == exercise && o.due_date == date(2026, 3, 1))
            .unwrap();
        complete(&store, &first_day);

        let edited = delete_activity(
            &store,
            EditTarget::Instance(instance.id),
            instance.revision,
            &exercise,
            at(date(2026, 3, 2)),
        )
        .unwrap();
        let outcome = instance_outcome(edited);

        // Rest moved up to position 0; the retired copy keeps its own index.
        let stored = &outcome.instance;
        assert_eq!(stored.activity(&rest).unwrap().definition.position, 0);
        assert_eq!(stored.activity(&rest).unwrap().sequence_index, 1);
        assert_eq!(stored.activity(&exercise).unwrap().sequence_index, 0);

        let options = TimelineOptions::default();
        for _ in 0..10 {
            let timeline =
                build_timeline(&store, "patient-1", date(2026, 3, 2), &options).unwrap();
            let order: Vec<Uuid> = timeline.days[0].entries.iter().map(|e| e.activity_id).collect();
            assert_eq!(timeline.days[0].date, date(2026, 3, 1));
            assert_eq!(order, vec![exercise, rest]);
        }

        let edited = add_activity(
            &store,
            EditTarget::Instance(instance.id),
            outcome.instance.revision,
            weekly_consult(),
            at(date(2026, 3, 2)),
        )
        .unwrap();
        let added = instance_outcome(edited).instance.active_activities()[1].clone();
        assert_eq!(added.definition.position, 1);
        assert_eq!(added.sequence_index, 2);
    }

    #[test]
    fn retired_activity_is_not_re_expanded() {
        let (store, template, instance) =
            setup(vec![daily_exercise(), weekly_consult()], date(2026, 3, 1), date(2026, 3, 7));
        let edited = delete_activity(
            &store,
            EditTarget::Instance(instance.id),
            0,
            &template.activities[0].id,
            at(date(2026, 3, 1)),
        )
        .unwrap();
        let revision = instance_outcome(edited).instance.revision;

        let extended = extend_window(&store, &instance.id, revision, date(2026, 3, 14)).unwrap();
        // Only the weekly consultation on Mar 8
        assert_eq!(extended.inserted, 1);
        assert_eq!(extended.instance.active_activities()[0].definition.position, 0);
    }

    #[test]
    fn add_expands_from_edit_date() {
        let (store, _, instance) =
            setup(vec![weekly_consult()], date(2026, 3, 1), date(2026, 3, 10));
        let edited = add_activity(
            &store,
            EditTarget::Instance(instance.id),
            0,
            daily_exercise(),
            at(date(2026, 3, 6)),
        )
        .unwrap();
        let outcome = instance_outcome(edited);
        // Mar 6..=10
        assert_eq!(outcome.inserted, 5);
        let added = &outcome.instance.active_activities()[1];
        assert_eq!(added.definition.position, 1);
        assert_eq!(added.anchor_date, date(2026, 3, 6));
    }

    #[test]
    fn reorder_on_instance_only_moves_positions() {
        let (store, template, instance) =
            setup(vec![daily_exercise(), weekly_consult()], date(2026, 3, 1), date(2026, 3, 7));
        let count = store.list_occurrences(&instance.id).unwrap().len();

        let edited = reorder_activities(
            &store,
            EditTarget::Instance(instance.id),
            0,
            1,
            0,
            at(date(2026, 3, 2)),
        )
        .unwrap();
        let outcome = instance_outcome(edited);
        let order: Vec<Uuid> = outcome
            .instance
            .active_activities()
            .iter()
            .map(|a| a.definition.id)
            .collect();
        assert_eq!(order, vec![template.activities[1].id, template.activities[0].id]);
        assert_eq!(store.list_occurrences(&instance.id).unwrap().len(), count);
    }

    #[test]
    fn template_edits_write_new_versions_and_leave_instances() {
        let (store, template, instance) =
            setup(vec![daily_exercise(), weekly_consult()], date(2026, 3, 1), date(2026, 3, 7));
        let target = EditTarget::Template(template.id);
        let now = at(date(2026, 3, 2));

        let v2 = template_version(reorder_activities(&store, target, 1, 0, 1, now).unwrap());
        assert_eq!(v2.version, 2);
        assert_eq!(v2.activities[0].id, template.activities[1].id);

        let weekly = ActivityPatch::frequency(FrequencyRule::Weekly);
        let v3 = template_version(
            update_activity(&store, target, 2, &template.activities[0].id, &weekly, now).unwrap(),
        );
        assert_eq!(v3.version, 3);

        let v4 = template_version(
            delete_activity(&store, target, 3, &template.activities[1].id, now).unwrap(),
        );
        assert_eq!(v4.activities.len(), 1);
        assert_eq!(v4.activities[0].position, 0);

        let v5 = template_version(add_activity(&store, target, 4, daily_exercise(), now).unwrap());
        assert_eq!(v5.version, 5);
        assert_eq!(v5.activities.len(), 2);

        let v1 = templates::get_template(&store, &template.id, Some(1)).unwrap();
        assert_eq!(v1, template);
        let unchanged = store.get_instance(&instance.id).unwrap().unwrap();
        assert_eq!(unchanged, instance);
    }

    #[test]
    fn stale_tokens_conflict() {
        let (store, template, instance) =
            setup(vec![daily_exercise()], date(2026, 3, 1), date(2026, 3, 7));
        let now = at(date(2026, 3, 2));

        let target = EditTarget::Template(template.id);
        let err = reorder_activities(&store, target, 2, 0, 0, now).unwrap_err();
        assert!(err.is_conflict());

        let target = EditTarget::Instance(instance.id);
        let err = add_activity(&store, target, 3, weekly_consult(), now).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get_instance(&instance.id).unwrap().unwrap().activities.len(), 1);
    }

    #[test]
    fn closed_instance_rejects_edits() {
        let (store, _, instance) =
            setup(vec![daily_exercise()], date(2026, 3, 1), date(2026, 3, 7));
        let closed = cancel_instance(&store, &instance.id, 0, date(2026, 3, 2)).unwrap();
        assert_eq!(closed.status, InstanceStatus::Cancelled);

        let err = add_activity(
            &store,
            EditTarget::Instance(instance.id),
            closed.revision,
            weekly_consult(),
            at(date(2026, 3, 3)),
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::State(_)));
    }

    #[test]
    fn invalid_edit_writes_nothing() {
        let (store, template, instance) =
            setup(vec![daily_exercise()], date(2026, 3, 1), date(2026, 3, 7));
        let activity_id = template.activities[0].id;
        let now = at(date(2026, 3, 2));
        let bad = ActivityPatch::frequency(FrequencyRule::Interval {
            every_n: 0,
            unit: IntervalUnit::Days,
        });

        let target = EditTarget::Instance(instance.id);
        let err = update_activity(&store, target, 0, &activity_id, &bad, now).unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
        assert_eq!(store.get_instance(&instance.id).unwrap().unwrap().revision, 0);

        let target = EditTarget::Template(template.id);
        let err = update_activity(&store, target, 1, &activity_id, &bad, now).unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
        assert_eq!(templates::get_template(&store, &template.id, None).unwrap().version, 1);
    }
}
