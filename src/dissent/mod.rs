//! Dissent Health Service (FR12, NFR-023). Tracks per-vote dissent
//! percentages and alerts when the rolling average drops below threshold —
//! a low-dissent streak is a proxy for groupthink, not a positive signal.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AccountabilityError, IntegrityError};
use crate::halt::HaltChecker;
use crate::store::dissent_store::{DEFAULT_DISSENT_THRESHOLD, DEFAULT_PERIOD_DAYS};
use crate::store::DissentMetricsStore;

#[derive(Debug, Clone, PartialEq)]
pub struct DissentHealthStatus {
    pub rolling_average: f64,
    pub period_days: i64,
    pub record_count: usize,
    pub is_healthy: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DissentAlert {
    pub threshold: f64,
    pub actual_average: f64,
    pub period_days: i64,
    pub alert_type: &'static str,
}

pub struct DissentHealthService {
    halt_checker: Arc<dyn HaltChecker>,
    metrics: Arc<dyn DissentMetricsStore>,
}

impl DissentHealthService {
    pub fn new(halt_checker: Arc<dyn HaltChecker>, metrics: Arc<dyn DissentMetricsStore>) -> Self {
        Self { halt_checker, metrics }
    }

    async fn halt_check(&self) -> Result<(), AccountabilityError> {
        if self.halt_checker.is_halted().await {
            let reason = self.halt_checker.halt_reason().await.unwrap_or_default();
            tracing::error!(target: "integrity", reason = %reason, "dissent health service rejected: system halted");
            return Err(IntegrityError::SystemHalted(reason).into());
        }
        Ok(())
    }

    pub async fn record_dissent(&self, output_id: Uuid, dissent_percentage: f64) -> Result<(), AccountabilityError> {
        self.halt_check().await?;
        self.metrics
            .record_vote_dissent(output_id, dissent_percentage)
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?;
        tracing::info!(output_id = %output_id, dissent_percentage, "vote dissent recorded");
        Ok(())
    }

    pub async fn get_health_status(&self, days: i64, threshold: f64) -> Result<DissentHealthStatus, AccountabilityError> {
        self.halt_check().await?;
        let rolling_average = self
            .metrics
            .rolling_average(days)
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?;
        let history = self
            .metrics
            .history(days)
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?;
        let is_below = self
            .metrics
            .is_below_threshold(threshold, days)
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?;

        Ok(DissentHealthStatus {
            rolling_average,
            period_days: days,
            record_count: history.len(),
            is_healthy: !is_below,
        })
    }

    /// `Some(alert)` per NFR-023 if the rolling average has dropped below
    /// `threshold` over `days`; `None` if dissent is healthy.
    pub async fn check_alert_condition(&self, threshold: f64, days: i64) -> Result<Option<DissentAlert>, AccountabilityError> {
        self.halt_check().await?;

        let is_below = self
            .metrics
            .is_below_threshold(threshold, days)
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?;
        if !is_below {
            return Ok(None);
        }

        let actual_average = self
            .metrics
            .rolling_average(days)
            .await
            .map_err(|e| crate::error::WriteError::CessationExecutionError(e.0))?;

        tracing::warn!(threshold, actual_average, period_days = days, "dissent below threshold: groupthink alert raised");
        Ok(Some(DissentAlert { threshold, actual_average, period_days: days, alert_type: "DISSENT_BELOW_THRESHOLD" }))
    }

    pub async fn check_default_alert_condition(&self) -> Result<Option<DissentAlert>, AccountabilityError> {
        self.check_alert_condition(DEFAULT_DISSENT_THRESHOLD, DEFAULT_PERIOD_DAYS).await
    }
}
