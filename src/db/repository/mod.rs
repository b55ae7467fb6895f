//! Repository layer — the persistence contract for templates, instances and
//! occurrences, plus its SQLite implementation.
//!
//! Scheduling logic only talks to [`ProtocolStore`]; every write goes through
//! a version or revision precondition and commits atomically.

mod instance;
mod occurrence;
mod rows;
mod template;

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use super::sqlite::{open_database, open_memory_database};
use crate::error::ProtocolError;
use crate::models::enums::InstanceStatus;
use crate::models::*;

/// What to do with pending occurrences on or after a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    /// Remove the rows outright (future pending rows being regenerated).
    Discard,
    /// Keep the rows for audit, marked cancelled.
    Cancel,
}

/// Pending occurrences with `due_date >= from`, for one activity or (with
/// `activity_id = None`) the whole instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSweep {
    pub activity_id: Option<Uuid>,
    pub from: NaiveDate,
    pub action: SweepAction,
}

/// A single atomic write against one instance.
#[derive(Debug, Clone)]
pub struct InstanceChange {
    pub instance_id: Uuid,
    pub expected_revision: i64,
    /// Activity rows to insert or overwrite.
    pub activities: Vec<InstanceActivity>,
    /// Applied before `new_occurrences` are inserted.
    pub sweeps: Vec<PendingSweep>,
    /// Inserted unless the (instance, activity, due date) key already exists.
    pub new_occurrences: Vec<Occurrence>,
    /// Raises the materialized horizon; never lowers it.
    pub horizon: Option<NaiveDate>,
    pub status: Option<InstanceStatus>,
}

impl InstanceChange {
    pub fn new(instance: &ProtocolInstance) -> Self {
        Self {
            instance_id: instance.id,
            expected_revision: instance.revision,
            activities: Vec::new(),
            sweeps: Vec::new(),
            new_occurrences: Vec::new(),
            horizon: None,
            status: None,
        }
    }
}

/// Result of an applied change, with row counts for logging and callers.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeOutcome {
    pub instance: ProtocolInstance,
    pub inserted: usize,
    pub discarded: usize,
    pub cancelled: usize,
}

/// Persistence contract for the scheduling engine.
pub trait ProtocolStore {
    /// Writes `template` as a new version; rejects with `Conflict` unless
    /// `template.version` is exactly one past the latest stored version.
    fn save_template_version(&self, template: &ProtocolTemplate) -> Result<(), ProtocolError>;

    /// Fetches a template version, or the latest when `version` is `None`.
    fn get_template(
        &self,
        id: &Uuid,
        version: Option<u32>,
    ) -> Result<Option<ProtocolTemplate>, ProtocolError>;

    fn list_templates(&self) -> Result<Vec<TemplateSummary>, ProtocolError>;

    /// Stores a new instance with its first occurrences. Returns the stored
    /// instance (materialization sequence assigned) and the occurrence count written.
    fn create_instance(
        &self,
        instance: &ProtocolInstance,
        occurrences: &[Occurrence],
    ) -> Result<(ProtocolInstance, usize), ProtocolError>;

    fn get_instance(&self, id: &Uuid) -> Result<Option<ProtocolInstance>, ProtocolError>;

    fn list_instances(
        &self,
        patient_id: &str,
        statuses: &[InstanceStatus],
    ) -> Result<Vec<ProtocolInstance>, ProtocolError>;

    /// Applies `change` if the instance revision still matches; `Conflict` otherwise.
    fn apply_instance_change(
        &self,
        change: &InstanceChange,
    ) -> Result<ChangeOutcome, ProtocolError>;

    fn get_occurrence(&self, id: &Uuid) -> Result<Option<Occurrence>, ProtocolError>;

    fn list_occurrences(&self, instance_id: &Uuid) -> Result<Vec<Occurrence>, ProtocolError>;

    /// Moves a pending occurrence to a terminal status; `State` if it is not pending.
    fn record_outcome(
        &self,
        occurrence_id: &Uuid,
        outcome: &OccurrenceOutcome,
    ) -> Result<Occurrence, ProtocolError>;

    fn insert_on_demand(&self, occurrence: &Occurrence) -> Result<(), ProtocolError>;
}

/// SQLite-backed protocol store.
pub struct SqliteProtocolStore {
    conn: Connection,
}

impl SqliteProtocolStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, ProtocolError> {
        Ok(Self::new(open_database(path)?))
    }

    /// In-memory store (for testing)
    pub fn open_in_memory() -> Result<Self, ProtocolError> {
        Ok(Self::new(open_memory_database()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ProtocolStore for SqliteProtocolStore {
    fn save_template_version(&self, template: &ProtocolTemplate) -> Result<(), ProtocolError> {
        template::insert_template_version(&self.conn, template)
    }

    fn get_template(
        &self,
        id: &Uuid,
        version: Option<u32>,
    ) -> Result<Option<ProtocolTemplate>, ProtocolError> {
        template::get_template(&self.conn, id, version)
    }

    fn list_templates(&self) -> Result<Vec<TemplateSummary>, ProtocolError> {
        template::list_templates(&self.conn)
    }

    fn create_instance(
        &self,
        instance: &ProtocolInstance,
        occurrences: &[Occurrence],
    ) -> Result<(ProtocolInstance, usize), ProtocolError> {
        instance::insert_instance(&self.conn, instance, occurrences)
    }

    fn get_instance(&self, id: &Uuid) -> Result<Option<ProtocolInstance>, ProtocolError> {
        instance::get_instance(&self.conn, id)
    }

    fn list_instances(
        &self,
        patient_id: &str,
        statuses: &[InstanceStatus],
    ) -> Result<Vec<ProtocolInstance>, ProtocolError> {
        instance::list_instances(&self.conn, patient_id, statuses)
    }

    fn apply_instance_change(
        &self,
        change: &InstanceChange,
    ) -> Result<ChangeOutcome, ProtocolError> {
        instance::apply_instance_change(&self.conn, change)
    }

    fn get_occurrence(&self, id: &Uuid) -> Result<Option<Occurrence>, ProtocolError> {
        occurrence::get_occurrence(&self.conn, id)
    }

    fn list_occurrences(&self, instance_id: &Uuid) -> Result<Vec<Occurrence>, ProtocolError> {
        occurrence::list_occurrences(&self.conn, instance_id)
    }

    fn record_outcome(
        &self,
        occurrence_id: &Uuid,
        outcome: &OccurrenceOutcome,
    ) -> Result<Occurrence, ProtocolError> {
        occurrence::record_outcome(&self.conn, occurrence_id, outcome)
    }

    fn insert_on_demand(&self, occurrence: &Occurrence) -> Result<(), ProtocolError> {
        occurrence::insert_on_demand(&self.conn, occurrence)
    }
}
