use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{OccurrenceOrigin, OccurrenceStatus};

/// One dated instantiation of an activity within an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub activity_id: Uuid,
    pub due_date: NaiveDate,
    pub status: OccurrenceStatus,
    pub origin: OccurrenceOrigin,
    /// Expected repetitions on `due_date` (sub-day rules collapse into one row).
    pub daily_count: u32,
    pub completed_at: Option<NaiveDateTime>,
    pub completion_note: Option<String>,
}

impl Occurrence {
    pub fn scheduled(
        instance_id: Uuid,
        activity_id: Uuid,
        due_date: NaiveDate,
        daily_count: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance_id,
            activity_id,
            due_date,
            status: OccurrenceStatus::Pending,
            origin: OccurrenceOrigin::Scheduled,
            daily_count,
            completed_at: None,
            completion_note: None,
        }
    }
}

/// Terminal outcome reported by the patient/doctor action layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceOutcome {
    pub status: OccurrenceStatus,
    pub completed_at: NaiveDateTime,
    #[serde(default)]
    pub note: Option<String>,
}
