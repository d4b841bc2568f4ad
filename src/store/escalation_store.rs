//! Escalation repository (FR31). Tracks at most one acknowledgment and at
//! most one escalation per breach, and the pending-escalation query used to
//! surface breaches approaching the 7-day deadline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event::{BreachAcknowledgedPayload, BreachEscalatedPayload, BreachType};
use crate::store::StoreError;

/// Escalation threshold per FR31: a breach unacknowledged for this many days
/// escalates to the Conclave agenda.
pub const ESCALATION_THRESHOLD_DAYS: i64 = 7;

/// A breach approaching (or past) its 7-day escalation deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEscalation {
    pub breach_id: Uuid,
    pub breach_type: BreachType,
    pub detection_timestamp: DateTime<Utc>,
    pub days_remaining: i64,
    pub hours_remaining: i64,
}

impl PendingEscalation {
    pub fn from_breach(
        breach_id: Uuid,
        breach_type: BreachType,
        detection_timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let age = now - detection_timestamp;
        let remaining = chrono::Duration::days(ESCALATION_THRESHOLD_DAYS) - age;
        let hours_remaining = remaining.num_hours();
        let days_remaining = remaining.num_days();
        Self { breach_id, breach_type, detection_timestamp, days_remaining, hours_remaining }
    }

    pub fn is_overdue(&self) -> bool {
        self.hours_remaining < 0
    }

    pub fn is_urgent(&self) -> bool {
        (0..24).contains(&self.hours_remaining)
    }

    /// "OVERDUE" / "URGENT" / "WARNING" / "PENDING", mirroring the escalation
    /// dashboard's urgency banding.
    pub fn urgency_level(&self) -> &'static str {
        if self.is_overdue() {
            "OVERDUE"
        } else if self.hours_remaining < 24 {
            "URGENT"
        } else if self.hours_remaining < 72 {
            "WARNING"
        } else {
            "PENDING"
        }
    }
}

#[async_trait]
pub trait EscalationStore: Send + Sync {
    async fn save_acknowledgment(&self, ack: BreachAcknowledgedPayload) -> Result<(), StoreError>;

    async fn get_acknowledgment_for_breach(
        &self,
        breach_id: Uuid,
    ) -> Result<Option<BreachAcknowledgedPayload>, StoreError>;

    async fn save_escalation(&self, escalation: BreachEscalatedPayload) -> Result<(), StoreError>;

    async fn get_escalation_for_breach(
        &self,
        breach_id: Uuid,
    ) -> Result<Option<BreachEscalatedPayload>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryEscalationStore {
    acknowledgments: RwLock<HashMap<Uuid, BreachAcknowledgedPayload>>,
    escalations: RwLock<HashMap<Uuid, BreachEscalatedPayload>>,
}

impl InMemoryEscalationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EscalationStore for InMemoryEscalationStore {
    async fn save_acknowledgment(&self, ack: BreachAcknowledgedPayload) -> Result<(), StoreError> {
        let mut acks = self.acknowledgments.write().await;
        if acks.contains_key(&ack.breach_id) {
            return Err(StoreError(format!("breach {} already acknowledged", ack.breach_id)));
        }
        acks.insert(ack.breach_id, ack);
        Ok(())
    }

    async fn get_acknowledgment_for_breach(
        &self,
        breach_id: Uuid,
    ) -> Result<Option<BreachAcknowledgedPayload>, StoreError> {
        Ok(self.acknowledgments.read().await.get(&breach_id).cloned())
    }

    async fn save_escalation(&self, escalation: BreachEscalatedPayload) -> Result<(), StoreError> {
        let mut escalations = self.escalations.write().await;
        if escalations.contains_key(&escalation.breach_id) {
            return Err(StoreError(format!(
                "breach {} already escalated",
                escalation.breach_id
            )));
        }
        escalations.insert(escalation.breach_id, escalation);
        Ok(())
    }

    async fn get_escalation_for_breach(
        &self,
        breach_id: Uuid,
    ) -> Result<Option<BreachEscalatedPayload>, StoreError> {
        Ok(self.escalations.read().await.get(&breach_id).cloned())
    }
}
