use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::fetch::*;
use super::types::*;
use crate::db::ProtocolStore;
use crate::error::ProtocolError;
use crate::models::enums::TimelineOrder;

type EntryKey = (NaiveDate, i64, u32, Option<NaiveDateTime>, Uuid);

/// Sort key for entries sharing a date: instance materialization order,
/// then the activity's sequence index. Only on-demand rows can repeat an
/// activity within a day; those follow their completion time.
fn entry_key(entry: &TimelineEntry) -> EntryKey {
    (
        entry.due_date,
        entry.instance_seq,
        entry.sequence_index,
        entry.completed_at,
        entry.occurrence_id,
    )
}

pub(super) fn sort_entries(entries: &mut [TimelineEntry]) {
    entries.sort_by_key(entry_key);
}

/// Groups sorted entries into one `TimelineDay` per due date. With
/// `MostRecentFirst` the days are reversed; entries within a day keep
/// their tie-break order.
pub(super) fn group_by_day(entries: Vec<TimelineEntry>, order: TimelineOrder) -> Vec<TimelineDay> {
    let mut days: Vec<TimelineDay> = Vec::new();
    for entry in entries {
        match days.last_mut() {
            Some(day) if day.date == entry.due_date => day.entries.push(entry),
            _ => days.push(TimelineDay {
                date: entry.due_date,
                entries: vec![entry],
            }),
        }
    }

    if order == TimelineOrder::MostRecentFirst {
        days.reverse();
    }
    days
}

pub(super) fn count_statuses(days: &[TimelineDay]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for entry in days.iter().flat_map(|d| &d.entries) {
        match entry.status {
            DerivedStatus::Pending => counts.pending += 1,
            DerivedStatus::Overdue => counts.overdue += 1,
            DerivedStatus::Completed => counts.completed += 1,
            DerivedStatus::Skipped => counts.skipped += 1,
        }
    }
    counts
}

pub(super) fn date_range(days: &[TimelineDay]) -> DateRange {
    let dates = days.iter().map(|d| d.date);
    DateRange {
        earliest: dates.clone().min(),
        latest: dates.max(),
    }
}

/// Top-level assembly: merges every selected instance of a patient into one
/// day-grouped timeline with derived statuses, in a single call.
pub fn build_timeline<S: ProtocolStore>(
    store: &S,
    patient_id: &str,
    as_of: NaiveDate,
    options: &TimelineOptions,
) -> Result<TimelineData, ProtocolError> {
    let instances = fetch_instances(store, patient_id, options)?;

    let mut entries = Vec::new();
    let mut summaries = Vec::with_capacity(instances.len());
    for instance in &instances {
        let instance_entries = fetch_instance_entries(store, instance, as_of, options)?;
        summaries.push(InstanceSummary {
            id: instance.id,
            name: instance.name.clone(),
            status: instance.status,
            template_version: instance.template_version,
            start_date: instance.start_date,
            entry_count: instance_entries.len() as u32,
        });
        entries.extend(instance_entries);
    }

    sort_entries(&mut entries);
    let days = group_by_day(entries, options.order);

    tracing::debug!(
        patient_id,
        instances = summaries.len(),
        days = days.len(),
        "Timeline assembled"
    );

    Ok(TimelineData {
        patient_id: patient_id.to_string(),
        as_of,
        date_range: date_range(&days),
        status_counts: count_statuses(&days),
        days,
        instances: summaries,
    })
}
