use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::*;
use crate::models::ActivityCategory;

/// Display status of an occurrence as of a given date. Only `Completed` and
/// `Skipped` are stored as-is; `Overdue` is always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedStatus {
    Pending,
    Overdue,
    Completed,
    Skipped,
}

impl DerivedStatus {
    /// Label shown on the patient timeline.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Assigned",
            Self::Overdue => "Overdue",
            Self::Completed => "Completed",
            Self::Skipped => "Skipped",
        }
    }
}

/// One occurrence on the merged timeline, with its activity details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub occurrence_id: Uuid,
    pub instance_id: Uuid,
    pub instance_name: String,
    pub activity_id: Uuid,
    pub category: ActivityCategory,
    pub sub_category: String,
    pub description: String,
    pub frequency: String,
    pub due_date: NaiveDate,
    pub status: DerivedStatus,
    pub status_label: String,
    pub origin: OccurrenceOrigin,
    pub daily_count: u32,
    pub duration_minutes: Option<u32>,
    pub patient_action: PatientActionKind,
    pub doctor_action: DoctorActionKind,
    pub completed_at: Option<NaiveDateTime>,
    pub completion_note: Option<String>,
    /// Materialization order of the owning instance.
    pub instance_seq: i64,
    /// Index the activity was given when it joined the instance.
    pub sequence_index: u32,
    /// Current display position in the instance's activity list.
    pub position: u32,
}

/// Filter and ordering parameters sent by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineOptions {
    pub order: TimelineOrder,
    pub include_completed_instances: bool,
    pub include_cancelled_instances: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            order: TimelineOrder::Chronological,
            include_completed_instances: false,
            include_cancelled_instances: false,
            date_from: None,
            date_to: None,
        }
    }
}

/// All entries due on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineDay {
    pub date: NaiveDate,
    pub entries: Vec<TimelineEntry>,
}

/// Complete timeline data — single response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineData {
    pub patient_id: String,
    pub as_of: NaiveDate,
    pub days: Vec<TimelineDay>,
    pub date_range: DateRange,
    pub status_counts: StatusCounts,
    pub instances: Vec<InstanceSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u32,
    pub overdue: u32,
    pub completed: u32,
    pub skipped: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: Uuid,
    pub name: String,
    pub status: InstanceStatus,
    pub template_version: u32,
    pub start_date: NaiveDate,
    pub entry_count: u32,
}
