//! Dissent metrics repository (FR12, NFR-023). Records a dissent-percentage
//! sample per vote tally and answers the rolling-average / below-threshold
//! queries the Dissent Health Service builds alerts from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::StoreError;

/// NFR-023 default: alert if rolling average dissent drops below 10% over a
/// 30-day window.
pub const DEFAULT_DISSENT_THRESHOLD: f64 = 10.0;
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct DissentSample {
    pub output_id: Uuid,
    pub dissent_percentage: f64,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait DissentMetricsStore: Send + Sync {
    async fn record_vote_dissent(&self, output_id: Uuid, dissent_percentage: f64) -> Result<(), StoreError>;

    /// Samples recorded within the last `days` days, most recent last.
    async fn history(&self, days: i64) -> Result<Vec<DissentSample>, StoreError>;

    /// Mean dissent percentage over the last `days` days; `0.0` if no
    /// samples fall in the window (matching the original's empty-window
    /// convention rather than propagating a divide-by-zero).
    async fn rolling_average(&self, days: i64) -> Result<f64, StoreError> {
        let samples = self.history(days).await?;
        if samples.is_empty() {
            return Ok(0.0);
        }
        let sum: f64 = samples.iter().map(|s| s.dissent_percentage).sum();
        Ok(sum / samples.len() as f64)
    }

    async fn is_below_threshold(&self, threshold: f64, days: i64) -> Result<bool, StoreError> {
        Ok(self.rolling_average(days).await? < threshold)
    }
}

#[derive(Default)]
pub struct InMemoryDissentMetricsStore {
    samples: RwLock<Vec<DissentSample>>,
}

impl InMemoryDissentMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DissentMetricsStore for InMemoryDissentMetricsStore {
    async fn record_vote_dissent(&self, output_id: Uuid, dissent_percentage: f64) -> Result<(), StoreError> {
        self.samples.write().await.push(DissentSample {
            output_id,
            dissent_percentage,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    async fn history(&self, days: i64) -> Result<Vec<DissentSample>, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        Ok(self
            .samples
            .read()
            .await
            .iter()
            .filter(|s| s.recorded_at >= cutoff)
            .cloned()
            .collect())
    }
}
