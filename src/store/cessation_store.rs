//! Cessation consideration repository (FR32). Tracks considerations and the
//! at-most-one decision recorded against each, plus the breach-count status
//! model used to surface trajectory toward the cessation threshold.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event::{CessationConsiderationPayload, CessationDecisionPayload};
use crate::store::StoreError;

/// >10 unacknowledged breaches in the window triggers cessation consideration
/// (FR32): 11 or more.
pub const CESSATION_THRESHOLD: usize = 10;
/// Early-alert threshold, reached before the cessation threshold itself.
pub const WARNING_THRESHOLD: usize = 8;
/// Rolling window size for the cessation-trigger count (FR32).
pub const CESSATION_WINDOW_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachTrajectory {
    Increasing,
    Stable,
    Decreasing,
}

/// Visibility into the unacknowledged-breach count relative to the
/// cessation threshold (FR32), not itself persisted — computed on demand
/// from the breach/escalation stores.
#[derive(Debug, Clone, PartialEq)]
pub struct BreachCountStatus {
    pub current_count: usize,
    pub window_days: u32,
    pub threshold: usize,
    pub warning_threshold: usize,
    pub breach_ids: Vec<Uuid>,
    pub trajectory: BreachTrajectory,
    pub calculated_at: DateTime<Utc>,
}

impl BreachCountStatus {
    pub fn is_above_threshold(&self) -> bool {
        self.current_count > self.threshold
    }

    pub fn is_at_warning(&self) -> bool {
        self.current_count >= self.warning_threshold
    }

    pub fn urgency_level(&self) -> &'static str {
        if self.is_above_threshold() {
            "CRITICAL"
        } else if self.is_at_warning() {
            "WARNING"
        } else {
            "NORMAL"
        }
    }

    /// Additional breaches needed to exceed the threshold; 0 if already over.
    pub fn breaches_until_threshold(&self) -> usize {
        (self.threshold + 1).saturating_sub(self.current_count)
    }

    /// Compares the count in the newer half of the window against the older
    /// half (tolerance of 2, to absorb minor fluctuations) to classify trend.
    pub fn from_breach_timestamps(
        detection_timestamps: &[DateTime<Utc>],
        breach_ids: Vec<Uuid>,
        window_days: u32,
        threshold: usize,
        warning_threshold: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let midpoint = now - chrono::Duration::days(i64::from(window_days) / 2);
        let recent_count = detection_timestamps.iter().filter(|ts| **ts > midpoint).count();
        let older_count = detection_timestamps.len() - recent_count;

        let trajectory = if recent_count > older_count + 2 {
            BreachTrajectory::Increasing
        } else if older_count > recent_count + 2 {
            BreachTrajectory::Decreasing
        } else {
            BreachTrajectory::Stable
        };

        Self {
            current_count: detection_timestamps.len(),
            window_days,
            threshold,
            warning_threshold,
            breach_ids,
            trajectory,
            calculated_at: now,
        }
    }
}

#[async_trait]
pub trait CessationStore: Send + Sync {
    async fn save_consideration(&self, consideration: CessationConsiderationPayload) -> Result<(), StoreError>;

    async fn get_consideration(
        &self,
        consideration_id: Uuid,
    ) -> Result<Option<CessationConsiderationPayload>, StoreError>;

    /// The most recently triggered consideration without a recorded
    /// decision, or `None` if every consideration has been decided.
    async fn active_consideration(&self) -> Result<Option<CessationConsiderationPayload>, StoreError>;

    async fn save_decision(&self, decision: CessationDecisionPayload) -> Result<(), StoreError>;

    async fn get_decision_for_consideration(
        &self,
        consideration_id: Uuid,
    ) -> Result<Option<CessationDecisionPayload>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryCessationStore {
    considerations: RwLock<Vec<CessationConsiderationPayload>>,
    decisions: RwLock<HashMap<Uuid, CessationDecisionPayload>>,
}

impl InMemoryCessationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CessationStore for InMemoryCessationStore {
    async fn save_consideration(&self, consideration: CessationConsiderationPayload) -> Result<(), StoreError> {
        self.considerations.write().await.push(consideration);
        Ok(())
    }

    async fn get_consideration(
        &self,
        consideration_id: Uuid,
    ) -> Result<Option<CessationConsiderationPayload>, StoreError> {
        Ok(self
            .considerations
            .read()
            .await
            .iter()
            .find(|c| c.consideration_id == consideration_id)
            .cloned())
    }

    async fn active_consideration(&self) -> Result<Option<CessationConsiderationPayload>, StoreError> {
        let considerations = self.considerations.read().await;
        let decisions = self.decisions.read().await;
        Ok(considerations
            .iter()
            .rev()
            .find(|c| !decisions.contains_key(&c.consideration_id))
            .cloned())
    }

    async fn save_decision(&self, decision: CessationDecisionPayload) -> Result<(), StoreError> {
        let mut decisions = self.decisions.write().await;
        if decisions.contains_key(&decision.consideration_id) {
            return Err(StoreError(format!(
                "consideration {} already decided",
                decision.consideration_id
            )));
        }
        decisions.insert(decision.consideration_id, decision);
        Ok(())
    }

    async fn get_decision_for_consideration(
        &self,
        consideration_id: Uuid,
    ) -> Result<Option<CessationDecisionPayload>, StoreError> {
        Ok(self.decisions.read().await.get(&consideration_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_threshold_requires_strictly_more_than_ten() {
        let status = BreachCountStatus {
            current_count: 10,
            window_days: CESSATION_WINDOW_DAYS,
            threshold: CESSATION_THRESHOLD,
            warning_threshold: WARNING_THRESHOLD,
            breach_ids: vec![],
            trajectory: BreachTrajectory::Stable,
            calculated_at: Utc::now(),
        };
        assert!(!status.is_above_threshold());
        assert_eq!(status.breaches_until_threshold(), 1);
    }

    #[tokio::test]
    async fn second_decision_for_same_consideration_is_rejected() {
        let store = InMemoryCessationStore::new();
        let consideration_id = Uuid::new_v4();
        let decision = |id: Uuid| CessationDecisionPayload {
            decision_id: Uuid::new_v4(),
            consideration_id: id,
            decision: crate::event::CessationDecisionChoice::DeferReview,
            decision_timestamp: Utc::now(),
            decided_by: "conclave".to_string(),
            rationale: "needs more data".to_string(),
        };
        store.save_decision(decision(consideration_id)).await.unwrap();
        assert!(store.save_decision(decision(consideration_id)).await.is_err());
    }
}
