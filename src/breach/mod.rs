//! Breach Service (FR30, FR31). Declaration, acknowledgment, and escalation
//! of constitutional breaches, plus the queries the escalation dashboard and
//! the Cessation Consideration Service run over them.
//!
//! Golden Rules carried from the original service: HALT CHECK FIRST on every
//! operation (CT-11), WITNESS EVERYTHING (CT-12, via the [`EventWriter`]),
//! FAIL LOUD (no silently-swallowed breach detection).

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AccountabilityError, ServiceError, ValidationError};
use crate::event::{
    BreachAcknowledgedPayload, BreachDeclaredPayload, BreachEscalatedPayload, BreachSeverity,
    BreachType, EventPayload, ResponseChoice,
};
use crate::halt::HaltChecker;
use crate::store::breach_store::BreachFilter;
use crate::store::escalation_store::{PendingEscalation, ESCALATION_THRESHOLD_DAYS};
use crate::store::{BreachStore, EscalationStore};
use crate::writer::EventWriter;

const BREACH_DECLARATION_SYSTEM_AGENT_ID: &str = "breach_declaration_system";
const ESCALATION_SYSTEM_AGENT_ID: &str = "escalation_system";

pub struct BreachService {
    breaches: Arc<dyn BreachStore>,
    escalations: Arc<dyn EscalationStore>,
    writer: Arc<EventWriter>,
    halt_checker: Arc<dyn HaltChecker>,
}

impl BreachService {
    pub fn new(
        breaches: Arc<dyn BreachStore>,
        escalations: Arc<dyn EscalationStore>,
        writer: Arc<EventWriter>,
        halt_checker: Arc<dyn HaltChecker>,
    ) -> Self {
        Self { breaches, escalations, writer, halt_checker }
    }

    async fn halt_check(&self) -> Result<(), AccountabilityError> {
        if self.halt_checker.is_halted().await {
            let reason = self.halt_checker.halt_reason().await.unwrap_or_default();
            tracing::error!(target: "integrity", reason = %reason, "breach service rejected: system halted");
            return Err(crate::error::IntegrityError::SystemHalted(reason).into());
        }
        Ok(())
    }

    /// Declare a constitutional breach (FR30).
    pub async fn declare_breach(
        &self,
        breach_type: BreachType,
        violated_requirement: String,
        severity: BreachSeverity,
        details: serde_json::Value,
        source_event_id: Option<Uuid>,
    ) -> Result<BreachDeclaredPayload, AccountabilityError> {
        self.halt_check().await?;

        if violated_requirement.trim().is_empty() {
            tracing::warn!("breach declaration rejected: violated_requirement empty");
            return Err(ValidationError::EmptyField("violated_requirement").into());
        }

        let breach_id = Uuid::new_v4();
        let detection_timestamp = Utc::now();
        let payload = BreachDeclaredPayload {
            breach_id,
            breach_type,
            violated_requirement,
            severity,
            detection_timestamp,
            details,
            source_event_id,
        };

        self.writer
            .write_event(
                EventPayload::BreachDeclared(payload.clone()),
                BREACH_DECLARATION_SYSTEM_AGENT_ID,
                detection_timestamp,
            )
            .await?;

        self.breaches
            .save(payload.clone())
            .await
            .map_err(|e| crate::error::WriteError::BreachDeclarationError(e.0))?;

        tracing::info!(breach_id = %breach_id, breach_type = ?breach_type, severity = ?severity, "breach declared");
        Ok(payload)
    }

    /// Acknowledge a breach, stopping its 7-day escalation timer (FR31).
    /// Acknowledging a breach that has already escalated is allowed —
    /// escalation only places the breach on the Conclave agenda, it does
    /// not foreclose acknowledgment.
    pub async fn acknowledge_breach(
        &self,
        breach_id: Uuid,
        acknowledged_by: String,
        response_choice: ResponseChoice,
    ) -> Result<BreachAcknowledgedPayload, AccountabilityError> {
        self.halt_check().await?;

        let acknowledged_by = acknowledged_by.trim().to_string();
        if acknowledged_by.is_empty() {
            tracing::warn!(breach_id = %breach_id, "acknowledgment rejected: empty attribution");
            return Err(ValidationError::InvalidAcknowledgment("acknowledged_by cannot be empty".to_string()).into());
        }

        let breach = self
            .breaches
            .get_by_id(breach_id)
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
            .ok_or_else(|| {
                tracing::warn!(breach_id = %breach_id, "acknowledgment rejected: breach not found");
                ServiceError::BreachNotFound(breach_id)
            })?;
        let _ = breach;

        if self
            .escalations
            .get_acknowledgment_for_breach(breach_id)
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
            .is_some()
        {
            tracing::warn!(breach_id = %breach_id, "acknowledgment rejected: already acknowledged");
            return Err(ServiceError::BreachAlreadyAcknowledged(breach_id).into());
        }

        let acknowledgment_timestamp = Utc::now();
        let payload = BreachAcknowledgedPayload {
            acknowledgment_id: Uuid::new_v4(),
            breach_id,
            acknowledged_by,
            acknowledgment_timestamp,
            response_choice,
        };

        self.writer
            .write_event(
                EventPayload::BreachAcknowledged(payload.clone()),
                ESCALATION_SYSTEM_AGENT_ID,
                acknowledgment_timestamp,
            )
            .await?;

        self.escalations
            .save_acknowledgment(payload.clone())
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?;

        tracing::info!(breach_id = %breach_id, response_choice = ?response_choice, "breach acknowledged");
        Ok(payload)
    }

    /// Escalate a breach to the Conclave agenda (FR31). Idempotent against
    /// double escalation.
    pub async fn escalate_breach(&self, breach_id: Uuid) -> Result<BreachEscalatedPayload, AccountabilityError> {
        self.halt_check().await?;

        let breach = self
            .breaches
            .get_by_id(breach_id)
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
            .ok_or_else(|| {
                tracing::warn!(breach_id = %breach_id, "escalation rejected: breach not found");
                ServiceError::BreachNotFound(breach_id)
            })?;

        if self
            .escalations
            .get_escalation_for_breach(breach_id)
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
            .is_some()
        {
            tracing::warn!(breach_id = %breach_id, "escalation rejected: already escalated");
            return Err(ServiceError::BreachAlreadyEscalated(breach_id).into());
        }

        let now = Utc::now();
        let days_since_breach = (now - breach.detection_timestamp).num_days();
        let payload = BreachEscalatedPayload {
            escalation_id: Uuid::new_v4(),
            breach_id,
            breach_type: breach.breach_type,
            escalation_timestamp: now,
            days_since_breach,
            agenda_placement_reason: format!(
                "7-day unacknowledged breach per FR31 (actual: {days_since_breach} days)"
            ),
        };

        self.writer
            .write_event(EventPayload::BreachEscalated(payload.clone()), ESCALATION_SYSTEM_AGENT_ID, now)
            .await?;

        self.escalations
            .save_escalation(payload.clone())
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?;

        tracing::info!(breach_id = %breach_id, days_since_breach, "breach escalated to Conclave agenda");
        Ok(payload)
    }

    /// Escalate every unacknowledged, unescalated breach past the 7-day
    /// threshold. Returns the escalations created.
    pub async fn check_and_escalate_breaches(&self) -> Result<Vec<BreachEscalatedPayload>, AccountabilityError> {
        self.halt_check().await?;

        let all = self
            .breaches
            .filter(&BreachFilter::default())
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?;

        let now = Utc::now();
        let mut escalated = Vec::new();
        for breach in all {
            let already_acknowledged = self
                .escalations
                .get_acknowledgment_for_breach(breach.breach_id)
                .await
                .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
                .is_some();
            let already_escalated = self
                .escalations
                .get_escalation_for_breach(breach.breach_id)
                .await
                .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
                .is_some();
            let overdue = (now - breach.detection_timestamp).num_hours() >= ESCALATION_THRESHOLD_DAYS * 24;

            if !already_acknowledged && !already_escalated && overdue {
                escalated.push(self.escalate_breach(breach.breach_id).await?);
            }
        }
        tracing::info!(escalated_count = escalated.len(), "escalation sweep complete");
        Ok(escalated)
    }

    /// Breaches approaching (or past) their 7-day escalation deadline,
    /// most urgent first.
    pub async fn get_pending_escalations(&self) -> Result<Vec<PendingEscalation>, AccountabilityError> {
        self.halt_check().await?;

        let all = self
            .breaches
            .filter(&BreachFilter::default())
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?;
        let now = Utc::now();

        let mut pending = Vec::new();
        for breach in all {
            let acknowledged = self
                .escalations
                .get_acknowledgment_for_breach(breach.breach_id)
                .await
                .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
                .is_some();
            let escalated = self
                .escalations
                .get_escalation_for_breach(breach.breach_id)
                .await
                .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
                .is_some();
            if !acknowledged && !escalated {
                pending.push(PendingEscalation::from_breach(
                    breach.breach_id,
                    breach.breach_type,
                    breach.detection_timestamp,
                    now,
                ));
            }
        }
        pending.sort_by_key(|p| p.hours_remaining);
        Ok(pending)
    }

    /// The escalation timer state for a single breach (SPEC_FULL.md
    /// supplement — the original exposes this only as part of the pending
    /// list; single-breach lookup is useful for a breach detail view).
    pub async fn get_escalation_timer(&self, breach_id: Uuid) -> Result<PendingEscalation, AccountabilityError> {
        self.halt_check().await?;
        let breach = self
            .breaches
            .get_by_id(breach_id)
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
            .ok_or(ServiceError::BreachNotFound(breach_id))?;

        if self
            .escalations
            .get_acknowledgment_for_breach(breach_id)
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
            .is_some()
            || self
                .escalations
                .get_escalation_for_breach(breach_id)
                .await
                .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
                .is_some()
        {
            return Err(ServiceError::EscalationTimerNotStarted(breach_id).into());
        }

        Ok(PendingEscalation::from_breach(breach_id, breach.breach_type, breach.detection_timestamp, Utc::now()))
    }

    /// Breaches matching `filter` (FR30 query surface).
    pub async fn filter_breaches(&self, filter: &BreachFilter) -> Result<Vec<BreachDeclaredPayload>, AccountabilityError> {
        self.halt_check().await?;
        Ok(self
            .breaches
            .filter(filter)
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?)
    }

    /// Unacknowledged breaches within the last `window_days` (FR32 input).
    pub async fn get_unacknowledged_in_window(
        &self,
        window_days: i64,
    ) -> Result<Vec<BreachDeclaredPayload>, AccountabilityError> {
        self.halt_check().await?;
        let since = Utc::now() - chrono::Duration::days(window_days);
        let candidates = self
            .breaches
            .filter(&BreachFilter { since: Some(since), ..Default::default() })
            .await
            .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?;

        let mut unacknowledged = Vec::new();
        for breach in candidates {
            let acknowledged = self
                .escalations
                .get_acknowledgment_for_breach(breach.breach_id)
                .await
                .map_err(|e| crate::error::WriteError::BreachQueryError(e.0))?
                .is_some();
            if !acknowledged {
                unacknowledged.push(breach);
            }
        }
        Ok(unacknowledged)
    }

    pub async fn count_unacknowledged_in_window(&self, window_days: i64) -> Result<usize, AccountabilityError> {
        Ok(self.get_unacknowledged_in_window(window_days).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CessationFlagStore, InMemoryBreachStore, InMemoryCessationFlagStore, InMemoryEscalationStore, InMemoryEventLog};
    use crate::witness::HmacWitness;
    use crate::halt::HaltGate;

    async fn service() -> BreachService {
        let log: Arc<dyn crate::store::EventLog> = Arc::new(InMemoryEventLog::new());
        let witness: Arc<dyn crate::witness::Witness> = Arc::new(HmacWitness::new("witness-1", b"key".to_vec()));
        let flags: Arc<dyn CessationFlagStore> = Arc::new(InMemoryCessationFlagStore::new());
        let halt_gate: Arc<dyn HaltChecker> = Arc::new(HaltGate::new(flags));
        let writer = Arc::new(EventWriter::new(
            log,
            witness,
            Arc::new(HaltGate::new(Arc::new(InMemoryCessationFlagStore::new()))),
        ));
        writer.verify_startup().await.unwrap();
        BreachService::new(
            Arc::new(InMemoryBreachStore::new()),
            Arc::new(InMemoryEscalationStore::new()),
            writer,
            halt_gate,
        )
    }

    #[tokio::test]
    async fn declare_then_acknowledge_stops_escalation() {
        let svc = service().await;
        let breach = svc
            .declare_breach(
                BreachType::HashMismatch,
                "FR82".to_string(),
                BreachSeverity::Critical,
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();

        svc.acknowledge_breach(breach.breach_id, "archon-1".to_string(), ResponseChoice::Corrective)
            .await
            .unwrap();

        let result = svc
            .acknowledge_breach(breach.breach_id, "archon-2".to_string(), ResponseChoice::Corrective)
            .await;
        assert!(matches!(result, Err(AccountabilityError::Service(ServiceError::BreachAlreadyAcknowledged(_)))));
    }

    #[tokio::test]
    async fn acknowledging_an_escalated_breach_still_succeeds() {
        let svc = service().await;
        let breach = svc
            .declare_breach(
                BreachType::TimingViolation,
                "FR31".to_string(),
                BreachSeverity::Medium,
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();

        svc.escalate_breach(breach.breach_id).await.unwrap();
        let ack = svc
            .acknowledge_breach(breach.breach_id, "archon-1".to_string(), ResponseChoice::Dismiss)
            .await;
        assert!(ack.is_ok());
    }

    #[tokio::test]
    async fn double_escalation_is_rejected() {
        let svc = service().await;
        let breach = svc
            .declare_breach(
                BreachType::QuorumViolation,
                "FR31".to_string(),
                BreachSeverity::High,
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();

        svc.escalate_breach(breach.breach_id).await.unwrap();
        let result = svc.escalate_breach(breach.breach_id).await;
        assert!(matches!(result, Err(AccountabilityError::Service(ServiceError::BreachAlreadyEscalated(_)))));
    }
}
