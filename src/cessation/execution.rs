//! Cessation Execution Orchestrator (FR41, FR43, FR135). Coordinates the
//! permanent, one-way termination of the system: final deliberation
//! recording, the terminal `cessation.executed` event, and the dual-channel
//! cessation flag — in that strict order (spec §4.4; ADR-3).
//!
//! CRITICAL: `execute_cessation` is irreversible. Once it returns `Ok`, the
//! cessation event is durable and the flag is set; no further event may be
//! accepted (enforced by [`crate::halt::HaltGate`] consulting the flag on
//! every subsequent `is_halted()` call).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AccountabilityError, IntegrityError, WriteError};
use crate::event::{
    ArchonDeliberation, CessationDeliberationPayload, CessationExecutedPayload, DeliberationRecordingFailedPayload,
    Event, EventPayload, VoteCounts,
};
use crate::halt::{HaltChecker, HaltGate};
use crate::store::cessation_flag_store::CessationFlagDetails;
use crate::store::{CessationFlagStore, EventLog, FlagChannel};
use crate::writer::EventWriter;

const CESSATION_AGENT_ID: &str = "SYSTEM:CESSATION";
const ERROR_CODE_WRITE_FAILED: &str = "WRITE_FAILED";
const ERROR_CODE_COMPLETE_FAILURE: &str = "COMPLETE_FAILURE";

/// What happened when recording the final deliberation (FR135). A failure
/// that itself gets successfully recorded is *not* an error — the failure
/// event becomes the final event and cessation does not proceed, per
/// "if recording fails, that failure IS the final event."
pub enum DeliberationOutcome {
    Recorded(Event),
    FailureRecorded(Event),
}

/// Records the final, pre-cessation deliberation of all 72 Archons (FR135),
/// falling back to a failure event if recording the deliberation itself
/// fails, and halting the process if even the failure event cannot be
/// written (CT-13).
pub struct FinalDeliberationService {
    writer: Arc<EventWriter>,
    halt_gate: Arc<HaltGate>,
}

impl FinalDeliberationService {
    pub fn new(writer: Arc<EventWriter>, halt_gate: Arc<HaltGate>) -> Self {
        Self { writer, halt_gate }
    }

    pub async fn record_and_proceed(
        &self,
        deliberation_id: Uuid,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        archon_deliberations: Vec<ArchonDeliberation>,
    ) -> Result<DeliberationOutcome, AccountabilityError> {
        let vote_counts = VoteCounts::tally(&archon_deliberations);
        let dissent_percentage = crate::event::dissent_percentage(vote_counts);
        let duration_seconds = (ended_at - started_at).num_seconds();
        let archon_count = archon_deliberations.len();

        let payload = CessationDeliberationPayload {
            deliberation_id,
            deliberation_started_at: started_at,
            deliberation_ended_at: ended_at,
            vote_recorded_at: Utc::now(),
            duration_seconds,
            archon_deliberations,
            vote_counts,
            dissent_percentage,
        }
        .validated()?;

        match self
            .writer
            .write_event(EventPayload::CessationDeliberation(payload.clone()), CESSATION_AGENT_ID, payload.vote_recorded_at)
            .await
        {
            Ok(event) => {
                tracing::info!(
                    deliberation_id = %deliberation_id,
                    archon_count,
                    dissent_percentage,
                    "final deliberation recorded"
                );
                Ok(DeliberationOutcome::Recorded(event))
            }
            Err(write_err) => {
                tracing::error!(deliberation_id = %deliberation_id, error = %write_err, "final deliberation recording failed");
                self.record_failure(deliberation_id, started_at, write_err.to_string(), archon_count).await
            }
        }
    }

    async fn record_failure(
        &self,
        deliberation_id: Uuid,
        attempted_at: DateTime<Utc>,
        error_message: String,
        partial_archon_count: usize,
    ) -> Result<DeliberationOutcome, AccountabilityError> {
        let failed_at = Utc::now();
        let failure_payload = DeliberationRecordingFailedPayload {
            deliberation_id,
            attempted_at,
            failed_at,
            error_code: ERROR_CODE_WRITE_FAILED.to_string(),
            error_message,
            retry_count: 0,
            partial_archon_count,
        };

        match self
            .writer
            .write_event(
                EventPayload::CessationDeliberationRecordingFailed(failure_payload.clone()),
                CESSATION_AGENT_ID,
                failed_at,
            )
            .await
        {
            Ok(event) => {
                // The failure event is now the final event; nothing further
                // should be accepted until a human intervenes.
                let alarm_reason = format!(
                    "FR135: deliberation recording failed and the failure event is now final — {}",
                    failure_payload.error_message
                );
                tracing::error!(deliberation_id = %deliberation_id, reason = %alarm_reason, "halting: deliberation failure event recorded");
                self.halt_gate.raise_alarm(alarm_reason);
                Ok(DeliberationOutcome::FailureRecorded(event))
            }
            Err(second_err) => {
                let alarm_reason = format!(
                    "FR135 VIOLATED: complete deliberation recording failure — {second_err}"
                );
                tracing::error!(target: "integrity", deliberation_id = %deliberation_id, reason = %alarm_reason, "halting: complete deliberation recording failure");
                self.halt_gate.raise_alarm(alarm_reason);
                Err(IntegrityError::DeliberationRecordingCompleteFailure {
                    error_code: ERROR_CODE_COMPLETE_FAILURE.to_string(),
                    error_message: second_err.to_string(),
                }
                .into())
            }
        }
    }
}

/// What `execute_cessation_with_deliberation` actually accomplished.
pub enum CessationOutcome {
    /// Cessation executed; the system is now permanently terminated.
    Executed(Event),
    /// The deliberation failed to record and its failure event is now the
    /// final event. Cessation was NOT executed.
    DeliberationFailed(Event),
}

pub struct CessationExecutionOrchestrator {
    writer: Arc<EventWriter>,
    event_log: Arc<dyn EventLog>,
    cessation_flags: Arc<dyn CessationFlagStore>,
    halt_checker: Arc<dyn HaltChecker>,
    final_deliberation: Arc<FinalDeliberationService>,
}

impl CessationExecutionOrchestrator {
    pub fn new(
        writer: Arc<EventWriter>,
        event_log: Arc<dyn EventLog>,
        cessation_flags: Arc<dyn CessationFlagStore>,
        halt_checker: Arc<dyn HaltChecker>,
        final_deliberation: Arc<FinalDeliberationService>,
    ) -> Self {
        Self { writer, event_log, cessation_flags, halt_checker, final_deliberation }
    }

    async fn halt_check(&self) -> Result<(), AccountabilityError> {
        if self.halt_checker.is_halted().await {
            let reason = self.halt_checker.halt_reason().await.unwrap_or_default();
            tracing::error!(target: "integrity", reason = %reason, "cessation execution rejected: system halted");
            return Err(IntegrityError::SystemHalted(reason).into());
        }
        Ok(())
    }

    /// Step 2+3+4 of FR43: write the terminal cessation event, then set the
    /// dual-channel flag. Order matters — the event is the source of truth;
    /// if writing it fails, no flag is set; if the flag fails afterward, the
    /// event still stands and human intervention sets the flag.
    pub async fn execute_cessation(&self, triggering_event_id: Uuid, reason: String) -> Result<Event, AccountabilityError> {
        self.halt_check().await?;

        let head = self
            .event_log
            .head()
            .await
            .map_err(|e| WriteError::CessationExecutionError(e.0))?
            .ok_or_else(|| WriteError::CessationExecutionError("cannot execute cessation: event log is empty".to_string()))?;

        let execution_timestamp = Utc::now();
        let payload = CessationExecutedPayload::new(
            Uuid::new_v4(),
            execution_timestamp,
            head.sequence,
            head.content_hash,
            reason.clone(),
            triggering_event_id,
        );

        let cessation_event = self
            .writer
            .write_event(EventPayload::CessationExecuted(payload), CESSATION_AGENT_ID, execution_timestamp)
            .await?;

        let details = CessationFlagDetails {
            triggering_event_id,
            set_at: execution_timestamp,
            reason,
        };

        for channel in [FlagChannel::Fast, FlagChannel::Durable] {
            self.cessation_flags.set(channel, details.clone()).await.map_err(|_| {
                tracing::error!(
                    event_id = %cessation_event.event_id,
                    channel = ?channel,
                    "cessation flag channel failed to set after event write — HUMAN INTERVENTION REQUIRED"
                );
                WriteError::CessationExecutionError(format!(
                    "cessation event {} written but flag channel {channel:?} failed to set — \
                     HUMAN INTERVENTION REQUIRED",
                    cessation_event.event_id
                ))
            })?;
        }

        tracing::error!(
            event_id = %cessation_event.event_id,
            triggering_event_id = %triggering_event_id,
            "cessation executed: system is now permanently terminated"
        );
        Ok(cessation_event)
    }

    /// Record the final deliberation (FR135), then execute cessation only if
    /// that recording succeeded.
    pub async fn execute_cessation_with_deliberation(
        &self,
        deliberation_id: Uuid,
        deliberation_started_at: DateTime<Utc>,
        deliberation_ended_at: DateTime<Utc>,
        archon_deliberations: Vec<ArchonDeliberation>,
        triggering_event_id: Uuid,
        reason: String,
    ) -> Result<CessationOutcome, AccountabilityError> {
        self.halt_check().await?;

        match self
            .final_deliberation
            .record_and_proceed(deliberation_id, deliberation_started_at, deliberation_ended_at, archon_deliberations)
            .await?
        {
            DeliberationOutcome::FailureRecorded(event) => Ok(CessationOutcome::DeliberationFailed(event)),
            DeliberationOutcome::Recorded(_) => {
                self.execute_cessation(triggering_event_id, reason).await.map(CessationOutcome::Executed)
            }
        }
    }
}
