//! Breach repository (FR30). Append-only registry of declared breaches plus
//! the type/date-range queries the Breach Service and Cessation Consideration
//! Service run over it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event::{BreachDeclaredPayload, BreachType};
use crate::store::StoreError;

/// A filter over declared breaches. `None` on a field means "any".
#[derive(Debug, Clone, Default)]
pub struct BreachFilter {
    pub breach_type: Option<BreachType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BreachStore: Send + Sync {
    async fn save(&self, breach: BreachDeclaredPayload) -> Result<(), StoreError>;

    async fn get_by_id(&self, breach_id: Uuid) -> Result<Option<BreachDeclaredPayload>, StoreError>;

    /// All breaches matching `filter`, in declaration order. The four
    /// independent filter axes of the original (by type, by date range, by
    /// type-and-date, unfiltered) collapse into one dispatch over the
    /// optional fields here.
    async fn filter(&self, filter: &BreachFilter) -> Result<Vec<BreachDeclaredPayload>, StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;
}

#[derive(Default)]
pub struct InMemoryBreachStore {
    breaches: RwLock<Vec<BreachDeclaredPayload>>,
}

impl InMemoryBreachStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BreachStore for InMemoryBreachStore {
    async fn save(&self, breach: BreachDeclaredPayload) -> Result<(), StoreError> {
        let mut breaches = self.breaches.write().await;
        if breaches.iter().any(|b| b.breach_id == breach.breach_id) {
            return Err(StoreError(format!("duplicate breach_id {}", breach.breach_id)));
        }
        breaches.push(breach);
        Ok(())
    }

    async fn get_by_id(&self, breach_id: Uuid) -> Result<Option<BreachDeclaredPayload>, StoreError> {
        Ok(self
            .breaches
            .read()
            .await
            .iter()
            .find(|b| b.breach_id == breach_id)
            .cloned())
    }

    async fn filter(&self, filter: &BreachFilter) -> Result<Vec<BreachDeclaredPayload>, StoreError> {
        Ok(self
            .breaches
            .read()
            .await
            .iter()
            .filter(|b| filter.breach_type.map_or(true, |t| b.breach_type == t))
            .filter(|b| filter.since.map_or(true, |since| b.detection_timestamp >= since))
            .filter(|b| filter.until.map_or(true, |until| b.detection_timestamp <= until))
            .cloned()
            .collect())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.breaches.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::BreachSeverity;

    fn breach(breach_type: BreachType, ts: DateTime<Utc>) -> BreachDeclaredPayload {
        BreachDeclaredPayload {
            breach_id: Uuid::new_v4(),
            breach_type,
            violated_requirement: "FR30".to_string(),
            severity: BreachSeverity::Medium,
            detection_timestamp: ts,
            details: serde_json::json!({}),
            source_event_id: None,
        }
    }

    #[tokio::test]
    async fn filter_by_type_only_matches_that_type() {
        let store = InMemoryBreachStore::new();
        store.save(breach(BreachType::HashMismatch, Utc::now())).await.unwrap();
        store.save(breach(BreachType::TimingViolation, Utc::now())).await.unwrap();

        let found = store
            .filter(&BreachFilter { breach_type: Some(BreachType::HashMismatch), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].breach_type, BreachType::HashMismatch);
    }

    #[tokio::test]
    async fn duplicate_breach_id_is_rejected() {
        let store = InMemoryBreachStore::new();
        let b = breach(BreachType::HashMismatch, Utc::now());
        store.save(b.clone()).await.unwrap();
        assert!(store.save(b).await.is_err());
    }
}
