//! Cessation Consideration Service (FR32). Automatic trigger when
//! unacknowledged breaches exceed the 90-day threshold, plus the Conclave's
//! decision on each triggered consideration.
//!
//! Per SPEC_FULL.md §4.4: unlike the Breach Service, this service is
//! idempotent at the trigger boundary — `check_and_trigger_cessation`
//! returns `Ok(None)` rather than an error both when a consideration is
//! already active and when the count is at or below threshold. The
//! `ServiceError::CessationAlreadyTriggered` / `ServiceError::BelowThreshold`
//! variants exist for API-layer callers that want strict duplicate
//! detection; this service never raises them itself.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AccountabilityError, ServiceError, ValidationError};
use crate::event::{CessationConsiderationPayload, CessationDecisionChoice, CessationDecisionPayload, EventPayload};
use crate::halt::HaltChecker;
use crate::store::cessation_store::{BreachCountStatus, CESSATION_THRESHOLD, CESSATION_WINDOW_DAYS, WARNING_THRESHOLD};
use crate::store::CessationStore;
use crate::writer::EventWriter;
use crate::breach::BreachService;

const CESSATION_SYSTEM_AGENT_ID: &str = "cessation_system";

pub struct CessationConsiderationService {
    breaches: Arc<BreachService>,
    considerations: Arc<dyn CessationStore>,
    writer: Arc<EventWriter>,
    halt_checker: Arc<dyn HaltChecker>,
}

impl CessationConsiderationService {
    pub fn new(
        breaches: Arc<BreachService>,
        considerations: Arc<dyn CessationStore>,
        writer: Arc<EventWriter>,
        halt_checker: Arc<dyn HaltChecker>,
    ) -> Self {
        Self { breaches, considerations, writer, halt_checker }
    }

    async fn halt_check(&self) -> Result<(), AccountabilityError> {
        if self.halt_checker.is_halted().await {
            let reason = self.halt_checker.halt_reason().await.unwrap_or_default();
            tracing::error!(target: "integrity", reason = %reason, "cessation consideration service rejected: system halted");
            return Err(crate::error::IntegrityError::SystemHalted(reason).into());
        }
        Ok(())
    }

    /// Check the 90-day unacknowledged-breach count against the FR32
    /// threshold and trigger a consideration if exceeded. Designed to be
    /// called periodically; idempotent — `None` means either a consideration
    /// is already active or the count does not exceed the threshold.
    pub async fn check_and_trigger_cessation(
        &self,
    ) -> Result<Option<CessationConsiderationPayload>, AccountabilityError> {
        self.halt_check().await?;

        if self
            .considerations
            .active_consideration()
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?
            .is_some()
        {
            tracing::info!("cessation consideration check skipped: a consideration is already active");
            return Ok(None);
        }

        let count = self
            .breaches
            .count_unacknowledged_in_window(i64::from(CESSATION_WINDOW_DAYS))
            .await?;

        if count <= CESSATION_THRESHOLD {
            return Ok(None);
        }

        let breaches = self
            .breaches
            .get_unacknowledged_in_window(i64::from(CESSATION_WINDOW_DAYS))
            .await?;
        let breach_ids: Vec<Uuid> = breaches.iter().map(|b| b.breach_id).collect();

        let trigger_timestamp = Utc::now();
        let payload = CessationConsiderationPayload {
            consideration_id: Uuid::new_v4(),
            trigger_timestamp,
            breach_count: count,
            window_days: CESSATION_WINDOW_DAYS,
            unacknowledged_breach_ids: breach_ids,
            agenda_placement_reason: format!(
                "FR32: >{CESSATION_THRESHOLD} unacknowledged breaches in {CESSATION_WINDOW_DAYS} days"
            ),
        };

        self.writer
            .write_event(EventPayload::CessationConsideration(payload.clone()), CESSATION_SYSTEM_AGENT_ID, trigger_timestamp)
            .await?;

        self.considerations
            .save_consideration(payload.clone())
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?;

        tracing::warn!(
            consideration_id = %payload.consideration_id,
            breach_count = payload.breach_count,
            "cessation consideration triggered: unacknowledged breaches exceeded threshold"
        );
        Ok(Some(payload))
    }

    /// Record the Conclave's decision on a consideration (FR32). At most one
    /// decision per consideration.
    pub async fn record_decision(
        &self,
        consideration_id: Uuid,
        decision: CessationDecisionChoice,
        decided_by: String,
        rationale: String,
    ) -> Result<CessationDecisionPayload, AccountabilityError> {
        self.halt_check().await?;

        if self
            .considerations
            .get_consideration(consideration_id)
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?
            .is_none()
        {
            tracing::warn!(consideration_id = %consideration_id, "decision rejected: consideration not found");
            return Err(ServiceError::CessationConsiderationNotFound(consideration_id).into());
        }

        if self
            .considerations
            .get_decision_for_consideration(consideration_id)
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?
            .is_some()
        {
            tracing::warn!(consideration_id = %consideration_id, "decision rejected: already recorded");
            return Err(ServiceError::InvalidCessationDecision {
                consideration_id,
                reason: "decision already recorded".to_string(),
            }
            .into());
        }

        let decided_by = decided_by.trim().to_string();
        if decided_by.is_empty() {
            tracing::warn!(consideration_id = %consideration_id, "decision rejected: empty attribution");
            return Err(ValidationError::InvalidCessationInput("decided_by cannot be empty".to_string()).into());
        }
        let rationale = rationale.trim().to_string();
        if rationale.is_empty() {
            tracing::warn!(consideration_id = %consideration_id, "decision rejected: empty rationale");
            return Err(ValidationError::InvalidCessationInput("rationale cannot be empty".to_string()).into());
        }

        let decision_timestamp = Utc::now();
        let payload = CessationDecisionPayload {
            decision_id: Uuid::new_v4(),
            consideration_id,
            decision,
            decision_timestamp,
            decided_by,
            rationale,
        };

        self.writer
            .write_event(EventPayload::CessationDecision(payload.clone()), CESSATION_SYSTEM_AGENT_ID, decision_timestamp)
            .await?;

        self.considerations
            .save_decision(payload.clone())
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?;

        tracing::info!(
            consideration_id = %consideration_id,
            decision = ?payload.decision,
            "cessation consideration decided"
        );
        Ok(payload)
    }

    /// Current unacknowledged-breach count vs. the cessation threshold,
    /// with trajectory (FR32 visibility surface).
    pub async fn get_breach_count_status(&self) -> Result<BreachCountStatus, AccountabilityError> {
        self.halt_check().await?;

        let breaches = self
            .breaches
            .get_unacknowledged_in_window(i64::from(CESSATION_WINDOW_DAYS))
            .await?;
        let timestamps: Vec<_> = breaches.iter().map(|b| b.detection_timestamp).collect();
        let breach_ids: Vec<Uuid> = breaches.iter().map(|b| b.breach_id).collect();

        Ok(BreachCountStatus::from_breach_timestamps(
            &timestamps,
            breach_ids,
            CESSATION_WINDOW_DAYS,
            CESSATION_THRESHOLD,
            WARNING_THRESHOLD,
            Utc::now(),
        ))
    }

    /// `"CRITICAL"` / `"WARNING"` / `None`, mirroring the dashboard alert
    /// banding of [`BreachCountStatus::urgency_level`] but as a standalone
    /// query that doesn't require computing trajectory.
    pub async fn get_breach_alert_status(&self) -> Result<Option<&'static str>, AccountabilityError> {
        self.halt_check().await?;

        let count = self
            .breaches
            .count_unacknowledged_in_window(i64::from(CESSATION_WINDOW_DAYS))
            .await?;

        if count > CESSATION_THRESHOLD {
            Ok(Some("CRITICAL"))
        } else if count >= WARNING_THRESHOLD {
            Ok(Some("WARNING"))
        } else {
            Ok(None)
        }
    }

    pub async fn is_cessation_consideration_active(&self) -> Result<bool, AccountabilityError> {
        self.halt_check().await?;
        Ok(self
            .considerations
            .active_consideration()
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?
            .is_some())
    }

    pub async fn get_active_consideration(&self) -> Result<Option<CessationConsiderationPayload>, AccountabilityError> {
        self.halt_check().await?;
        Ok(self
            .considerations
            .active_consideration()
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?)
    }
}
