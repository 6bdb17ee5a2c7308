// src/workflow.rs

//! Booking write path: validate, check for conflicts, then persist or wait
//! for an explicit override decision. Every successful write is followed by a
//! full reload of the agenda from the backend.
//!
//! The conflict check is an optimistic pre-check against this session's
//! snapshot. Two clients can still book the same slot; the backend keeps the
//! last write.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use serde_json::Value;

use crate::backend::AgendaBackend;
use crate::conflict::{self, ConflictRecord};
use crate::error::{AgendaError, ValidationError};
use crate::models::{Appointment, AppointmentDraft, AppointmentKind, AppointmentStatus};
use crate::normalize;
use crate::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Paging {
            page_size: 100,
            max_pages: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    Validating,
    ConflictCheck,
    Persisting,
    AwaitingOverrideDecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Saved { id: String },
    /// Nothing was persisted; resolve with override or cancel.
    Conflict { conflict: ConflictRecord },
}

#[derive(Debug)]
struct PendingOverride {
    candidate: Appointment,
    editing: bool,
    conflict: ConflictRecord,
}

/// Checks required fields and builds the candidate appointment.
///
/// Missing kind, duration and status fall back to Consultation, the kind's
/// default duration and Pending. A new draft gets a placeholder id.
pub fn validate(draft: &AppointmentDraft) -> Result<Appointment, ValidationError> {
    let mut fields = Vec::new();

    let patient_id = draft
        .patient_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if patient_id.is_none() {
        fields.push("patient_id");
    }
    let date = time::parse_date(draft.date.trim()).ok();
    if date.is_none() {
        fields.push("date");
    }
    let start_time = draft.start_time.trim();
    if !time::is_valid_time(start_time) {
        fields.push("start_time");
    }
    if draft.duration_minutes == Some(0) {
        fields.push("duration_minutes");
    }

    let (Some(patient_id), Some(date), true) = (patient_id, date, fields.is_empty()) else {
        return Err(ValidationError { fields });
    };

    let kind = draft.kind.unwrap_or(AppointmentKind::Consultation);
    Ok(Appointment {
        id: draft.id.clone().unwrap_or_else(normalize::placeholder_id),
        patient_id: patient_id.to_string(),
        practitioner_id: draft
            .practitioner_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        kind,
        date,
        start_time: start_time.to_string(),
        duration_minutes: draft.duration_minutes.unwrap_or_else(|| kind.default_duration()),
        status: draft.status.unwrap_or(AppointmentStatus::Pending),
        notes: draft.notes.clone().filter(|n| !n.trim().is_empty()),
    })
}

/// One page session: the appointment snapshot plus the booking state machine.
pub struct SchedulingWorkflow {
    backend: Arc<dyn AgendaBackend>,
    paging: Paging,
    appointments: Vec<Appointment>,
    stale: bool,
    state: WorkflowState,
    pending: Option<PendingOverride>,
}

impl SchedulingWorkflow {
    pub fn new(backend: Arc<dyn AgendaBackend>, paging: Paging) -> Self {
        Self {
            backend,
            paging,
            appointments: Vec::new(),
            stale: true,
            state: WorkflowState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// True before the first load and after a failed reload.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn pending_conflict(&self) -> Option<&ConflictRecord> {
        self.pending.as_ref().map(|p| &p.conflict)
    }

    fn enter(&mut self, next: WorkflowState) {
        tracing::trace!(from = ?self.state, to = ?next, "workflow transition");
        self.state = next;
    }

    /// Replaces the snapshot with every page the backend returns.
    ///
    /// On failure the old snapshot is kept and marked stale.
    pub async fn refresh(&mut self) -> Result<usize, AgendaError> {
        let today = Local::now().date_naive();
        let Paging {
            page_size,
            max_pages,
        } = self.paging;

        let mut fresh: Vec<Appointment> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut previous: Option<Value> = None;

        for page in 0..max_pages {
            let offset = page.saturating_mul(page_size);
            let raw = match self.backend.list_appointments(page_size, offset).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, "agenda refresh failed");
                    self.stale = true;
                    return Err(e.into());
                }
            };

            // a backend that ignores offset keeps sending the same page;
            // id-less records get fresh placeholder ids, so compare raw pages
            if previous.as_ref() == Some(&raw) {
                tracing::debug!(page, "backend repeated a page, stopping");
                break;
            }
            previous = Some(raw.clone());

            let batch = normalize::normalize_appointments(raw, today);
            let len = batch.len();

            if len > 0 && batch.iter().all(|a| seen.contains(&a.id)) {
                break;
            }
            seen.extend(batch.iter().map(|a| a.id.clone()));
            fresh.extend(batch);

            // short page, or a backend that ignores limit and sent everything
            if len != page_size as usize {
                break;
            }
        }

        self.appointments = fresh;
        self.stale = false;
        tracing::info!(count = self.appointments.len(), "agenda refreshed");
        Ok(self.appointments.len())
    }

    /// Submits a new draft, or an edit when `draft.id` is set.
    ///
    /// A submission made while a conflict awaits a decision discards that
    /// pending draft first.
    pub async fn submit(&mut self, draft: AppointmentDraft) -> Result<SubmitOutcome, AgendaError> {
        if let Some(discarded) = self.pending.take() {
            tracing::debug!(
                appointment_id = %discarded.candidate.id,
                "new submission replaces pending override decision"
            );
        }

        self.enter(WorkflowState::Validating);
        let candidate = match validate(&draft) {
            Ok(c) => c,
            Err(e) => {
                self.enter(WorkflowState::Idle);
                return Err(e.into());
            }
        };

        if self.stale {
            if let Err(e) = self.refresh().await {
                self.enter(WorkflowState::Idle);
                return Err(e);
            }
        }

        self.enter(WorkflowState::ConflictCheck);
        let editing = draft.id.is_some();
        let found = conflict::detect_conflict(&candidate, &self.appointments, draft.id.as_deref());

        match found {
            Some(conflict) => {
                tracing::debug!(
                    existing = %conflict.existing.id,
                    overlap_minutes = conflict.overlap_minutes,
                    severity = ?conflict.severity,
                    "conflict detected, awaiting decision"
                );
                self.pending = Some(PendingOverride {
                    candidate,
                    editing,
                    conflict: conflict.clone(),
                });
                self.enter(WorkflowState::AwaitingOverrideDecision);
                Ok(SubmitOutcome::Conflict { conflict })
            }
            None => self.persist(candidate, editing).await,
        }
    }

    /// Persists the pending draft as-is; the conflict is not re-checked.
    pub async fn override_conflict(&mut self) -> Result<SubmitOutcome, AgendaError> {
        let pending = self.pending.take().ok_or(AgendaError::NoPendingDecision)?;
        tracing::info!(
            appointment_id = %pending.candidate.id,
            existing = %pending.conflict.existing.id,
            "conflict overridden"
        );
        self.persist(pending.candidate, pending.editing).await
    }

    /// Drops the pending draft without persisting it and returns it.
    pub fn cancel_override(&mut self) -> Result<Appointment, AgendaError> {
        let pending = self.pending.take().ok_or(AgendaError::NoPendingDecision)?;
        self.enter(WorkflowState::Idle);
        tracing::debug!(appointment_id = %pending.candidate.id, "override cancelled");
        Ok(pending.candidate)
    }

    /// Deletes without any conflict check, then reloads.
    pub async fn delete(&mut self, id: &str) -> Result<(), AgendaError> {
        self.pending = None;
        self.enter(WorkflowState::Persisting);

        let result = self.backend.delete_appointment(id).await;
        if let Err(e) = result {
            tracing::warn!(appointment_id = %id, error = %e, "delete failed");
            self.enter(WorkflowState::Idle);
            return Err(e.into());
        }
        tracing::info!(appointment_id = %id, "appointment deleted");

        self.reload_after_write().await;
        self.enter(WorkflowState::Idle);
        Ok(())
    }

    async fn persist(&mut self, candidate: Appointment, editing: bool) -> Result<SubmitOutcome, AgendaError> {
        self.enter(WorkflowState::Persisting);
        let payload = candidate.to_payload();

        let result = if editing {
            self.backend
                .update_appointment(&candidate.id, &payload)
                .await
                .map(|()| candidate.id.clone())
        } else {
            self.backend
                .create_appointment(&payload)
                .await
                .map(|res| normalize::created_id(&res).unwrap_or_else(normalize::placeholder_id))
        };

        let id = match result {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "saving appointment failed");
                self.enter(WorkflowState::Idle);
                return Err(e.into());
            }
        };
        tracing::info!(appointment_id = %id, editing, "appointment saved");

        self.reload_after_write().await;
        self.enter(WorkflowState::Idle);
        Ok(SubmitOutcome::Saved { id })
    }

    /// The write already succeeded, so a failed reload only leaves the
    /// snapshot stale; the next submission reloads before checking.
    async fn reload_after_write(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "reload after write failed, agenda is stale");
        }
    }
}
