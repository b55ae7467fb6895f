use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::activity::{ActivityDefinition, InstanceActivity};
use super::enums::InstanceStatus;

/// One immutable version of a reusable protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolTemplate {
    pub id: Uuid,
    pub version: u32,
    pub name: String,
    pub activities: Vec<ActivityDefinition>,
    pub created_at: NaiveDateTime,
}

/// Latest-version listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: Uuid,
    pub version: u32,
    pub name: String,
    pub activity_count: u32,
    pub created_at: NaiveDateTime,
}

/// Id and version handed back to template authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub id: Uuid,
    pub version: u32,
}

impl ProtocolTemplate {
    pub fn reference(&self) -> TemplateRef {
        TemplateRef {
            id: self.id,
            version: self.version,
        }
    }
}

/// A template applied to one patient from a start date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolInstance {
    pub id: Uuid,
    pub patient_id: String,
    pub template_id: Uuid,
    pub template_version: u32,
    pub name: String,
    pub start_date: NaiveDate,
    /// Last date occurrences have been generated for.
    pub horizon: NaiveDate,
    pub status: InstanceStatus,
    /// Optimistic concurrency token, bumped by every write.
    pub revision: i64,
    /// Store-assigned materialization order, used for timeline tie-breaks.
    pub materialized_seq: i64,
    pub created_at: NaiveDateTime,
    pub activities: Vec<InstanceActivity>,
}

impl ProtocolInstance {
    /// Active activities in sequence order.
    pub fn active_activities(&self) -> Vec<&InstanceActivity> {
        let mut active: Vec<&InstanceActivity> =
            self.activities.iter().filter(|a| a.active).collect();
        active.sort_by_key(|a| a.definition.position);
        active
    }

    pub fn activity(&self, id: &Uuid) -> Option<&InstanceActivity> {
        self.activities.iter().find(|a| a.definition.id == *id)
    }

    /// Sequence index for an activity joining the instance now. Retired
    /// activities keep theirs, so indices are never handed out twice.
    pub fn next_sequence_index(&self) -> u32 {
        self.activities
            .iter()
            .map(|a| a.sequence_index + 1)
            .max()
            .unwrap_or(0)
    }
}
