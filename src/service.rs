//! Service facade — the protocol API as typed request/response calls.
//!
//! Transport (REST routing, auth, pagination) lives outside this crate; a
//! handler deserializes one of the request types below and calls the
//! matching method. All dates not given by the caller come from the
//! service clock.

use std::path::Path;

use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::db::{ChangeOutcome, ProtocolStore, SqliteProtocolStore};
use crate::editor::{self, EditTarget, Edited};
use crate::error::ProtocolError;
use crate::export::{self, InstanceDocument, TemplateDocument};
use crate::materializer::{self, InstanceProgress, MaterializeRequest};
use crate::models::enums::{InstanceStatus, OccurrenceStatus};
use crate::models::*;
use crate::occurrences;
use crate::templates;
use crate::timeline::{self, TimelineData, TimelineOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub activities: Vec<ActivityDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstanceRequest {
    pub template_id: Uuid,
    pub version: u32,
    pub patient_id: String,
    pub start_date: NaiveDate,
    /// Defaults to today plus the configured horizon.
    #[serde(default)]
    pub horizon: Option<NaiveDate>,
}

/// One structural edit, as sent by the protocol builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditCommand {
    Reorder { from: usize, to: usize },
    Update { activity_id: Uuid, patch: ActivityPatch },
    Delete { activity_id: Uuid },
    Add { activity: ActivityDraft },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRequest {
    pub target: EditTarget,
    /// Template version or instance revision the edit was prepared against.
    pub expected: i64,
    pub command: EditCommand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRequest {
    pub status: OccurrenceStatus,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsNeededRequest {
    pub instance_id: Uuid,
    pub activity_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub note: Option<String>,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub struct ProtocolService<S: ProtocolStore> {
    store: S,
    config: SchedulerConfig,
    clock: fn() -> NaiveDateTime,
}

impl ProtocolService<SqliteProtocolStore> {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: &Path, config: SchedulerConfig) -> Result<Self, ProtocolError> {
        Ok(Self::new(SqliteProtocolStore::open(path)?, config))
    }
}

impl<S: ProtocolStore> ProtocolService<S> {
    pub fn new(store: S, config: SchedulerConfig) -> Self {
        Self {
            store,
            config,
            clock: local_now,
        }
    }

    /// Replaces the wall clock (for testing)
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    // ── Templates ──────────────────────────────────────────────────────

    pub fn create_template(
        &self,
        request: CreateTemplateRequest,
    ) -> Result<TemplateRef, ProtocolError> {
        let template =
            templates::create_template(&self.store, &request.name, request.activities, self.now())?;
        Ok(template.reference())
    }

    pub fn get_template(
        &self,
        id: &Uuid,
        version: Option<u32>,
    ) -> Result<ProtocolTemplate, ProtocolError> {
        templates::get_template(&self.store, id, version)
    }

    pub fn list_templates(&self) -> Result<Vec<TemplateSummary>, ProtocolError> {
        templates::list_templates(&self.store)
    }

    /// Applies one edit to the latest template version, producing the next.
    pub fn update_template(
        &self,
        id: &Uuid,
        expected_version: u32,
        command: EditCommand,
    ) -> Result<TemplateRef, ProtocolError> {
        let edited = self.edit(EditRequest {
            target: EditTarget::Template(*id),
            expected: i64::from(expected_version),
            command,
        })?;
        match edited {
            Edited::Template(template) => Ok(template.reference()),
            Edited::Instance(outcome) => Err(ProtocolError::State(format!(
                "edit of template {id} changed instance {}",
                outcome.instance.id
            ))),
        }
    }

    pub fn rename_template(
        &self,
        id: &Uuid,
        expected_version: u32,
        name: &str,
    ) -> Result<TemplateRef, ProtocolError> {
        let template =
            templates::rename_template(&self.store, id, expected_version, name, self.now())?;
        Ok(template.reference())
    }

    /// Dispatches an edit to a template or an instance.
    pub fn edit(&self, request: EditRequest) -> Result<Edited, ProtocolError> {
        let now = self.now();
        let EditRequest { target, expected, command } = request;
        match command {
            EditCommand::Reorder { from, to } => {
                editor::reorder_activities(&self.store, target, expected, from, to, now)
            }
            EditCommand::Update { activity_id, patch } => {
                editor::update_activity(&self.store, target, expected, &activity_id, &patch, now)
            }
            EditCommand::Delete { activity_id } => {
                editor::delete_activity(&self.store, target, expected, &activity_id, now)
            }
            EditCommand::Add { activity } => {
                editor::add_activity(&self.store, target, expected, activity, now)
            }
        }
    }

    // ── Instances ──────────────────────────────────────────────────────

    pub fn create_instance(
        &self,
        request: CreateInstanceRequest,
    ) -> Result<ProtocolInstance, ProtocolError> {
        let now = self.now();
        let horizon = match request.horizon {
            Some(horizon) => horizon,
            None => self.default_horizon(now.date())?,
        };
        materializer::materialize(
            &self.store,
            &MaterializeRequest {
                template_id: request.template_id,
                version: request.version,
                patient_id: request.patient_id,
                start_date: request.start_date,
                horizon,
            },
            now,
        )
    }

    fn default_horizon(&self, today: NaiveDate) -> Result<NaiveDate, ProtocolError> {
        today
            .checked_add_days(Days::new(u64::from(self.config.horizon_days)))
            .ok_or_else(|| {
                ProtocolError::Validation(format!(
                    "horizon of {} days from {today} is out of range",
                    self.config.horizon_days
                ))
            })
    }

    pub fn get_instance(&self, id: &Uuid) -> Result<ProtocolInstance, ProtocolError> {
        materializer::load_instance(&self.store, id)
    }

    pub fn list_instances(
        &self,
        patient_id: &str,
        statuses: &[InstanceStatus],
    ) -> Result<Vec<ProtocolInstance>, ProtocolError> {
        self.store.list_instances(patient_id, statuses)
    }

    pub fn extend_instance(
        &self,
        id: &Uuid,
        expected_revision: i64,
        new_horizon: NaiveDate,
    ) -> Result<ChangeOutcome, ProtocolError> {
        materializer::extend_window(&self.store, id, expected_revision, new_horizon)
    }

    pub fn complete_instance(
        &self,
        id: &Uuid,
        expected_revision: i64,
    ) -> Result<ProtocolInstance, ProtocolError> {
        materializer::complete_instance(&self.store, id, expected_revision, self.now().date())
    }

    pub fn cancel_instance(
        &self,
        id: &Uuid,
        expected_revision: i64,
    ) -> Result<ProtocolInstance, ProtocolError> {
        materializer::cancel_instance(&self.store, id, expected_revision, self.now().date())
    }

    pub fn instance_progress(&self, id: &Uuid) -> Result<InstanceProgress, ProtocolError> {
        materializer::instance_progress(&self.store, id, self.now().date())
    }

    // ── Occurrences ────────────────────────────────────────────────────

    pub fn list_occurrences(&self, instance_id: &Uuid) -> Result<Vec<Occurrence>, ProtocolError> {
        self.store.list_occurrences(instance_id)
    }

    pub fn record_outcome(
        &self,
        occurrence_id: &Uuid,
        request: OutcomeRequest,
    ) -> Result<Occurrence, ProtocolError> {
        let outcome = OccurrenceOutcome {
            status: request.status,
            completed_at: request.completed_at.unwrap_or_else(|| self.now()),
            note: request.note,
        };
        occurrences::record_outcome(&self.store, occurrence_id, &outcome)
    }

    pub fn record_as_needed(&self, request: AsNeededRequest) -> Result<Occurrence, ProtocolError> {
        let completed_at = request.completed_at.unwrap_or_else(|| self.now());
        occurrences::record_as_needed(
            &self.store,
            &request.instance_id,
            &request.activity_id,
            request.date,
            completed_at,
            request.note,
        )
    }

    // ── Timeline ───────────────────────────────────────────────────────

    /// Merged timeline as of `as_of`. Without options, ordering and instance
    /// selection follow the scheduler config.
    pub fn timeline(
        &self,
        patient_id: &str,
        as_of: NaiveDate,
        options: Option<TimelineOptions>,
    ) -> Result<TimelineData, ProtocolError> {
        let options = options.unwrap_or_else(|| TimelineOptions {
            order: self.config.timeline_order,
            include_completed_instances: self.config.include_completed_instances,
            ..TimelineOptions::default()
        });
        timeline::build_timeline(&self.store, patient_id, as_of, &options)
    }

    // ── Export ─────────────────────────────────────────────────────────

    pub fn export_template(
        &self,
        id: &Uuid,
        version: Option<u32>,
    ) -> Result<TemplateDocument, ProtocolError> {
        export::export_template(&self.store, id, version)
    }

    pub fn import_template(&self, json: &str) -> Result<TemplateRef, ProtocolError> {
        Ok(export::import_template(&self.store, json, self.now())?.reference())
    }

    pub fn export_instance(&self, id: &Uuid) -> Result<InstanceDocument, ProtocolError> {
        export::export_instance(&self.store, id)
    }

    /// Recreates an exported instance under the local template `template_id`.
    pub fn import_instance(
        &self,
        template_id: &Uuid,
        json: &str,
    ) -> Result<ProtocolInstance, ProtocolError> {
        export::import_instance(&self.store, json, template_id, self.now())
    }
}
