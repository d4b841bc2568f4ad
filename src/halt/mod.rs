//! Halt Gate (CT-11, CT-13). The oracle every service consults before any
//! state-changing operation: "Developer Golden Rule #1 — HALT FIRST."
//!
//! Two independent sources can halt the system: an upstream integrity alarm
//! (raised in-process, e.g. by the Content Hash Verifier) and the Cessation
//! Flag Store. CT-13 — integrity outranks availability — means that if the
//! Cessation Flag Store itself cannot be read, the gate reports halted
//! rather than assume "not halted".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::RwLock as StdRwLock;

use async_trait::async_trait;

use crate::store::CessationFlagStore;

/// Consulted before every service operation. Infallible by design: a checker
/// that itself cannot determine halt status must resolve internally to
/// `true` (CT-13), never propagate an error to the caller.
#[async_trait]
pub trait HaltChecker: Send + Sync {
    async fn is_halted(&self) -> bool;

    /// Human-readable reason, if halted. `None` only when not halted.
    async fn halt_reason(&self) -> Option<String>;
}

/// Reference implementation combining an in-process alarm latch with the
/// Cessation Flag Store.
pub struct HaltGate {
    alarm: AtomicBool,
    alarm_reason: StdRwLock<Option<String>>,
    cessation_flags: Arc<dyn CessationFlagStore>,
}

impl HaltGate {
    pub fn new(cessation_flags: Arc<dyn CessationFlagStore>) -> Self {
        Self { alarm: AtomicBool::new(false), alarm_reason: StdRwLock::new(None), cessation_flags }
    }

    /// Trip the in-process alarm. One-way: there is no corresponding
    /// `clear_alarm` — restarting the process is the only reset, matching
    /// the Cessation Flag Store's own monotonic latch.
    pub fn raise_alarm(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(target: "integrity", reason = %reason, "halt gate alarm raised");
        self.alarm.store(true, Ordering::SeqCst);
        let mut guard = self.alarm_reason.write().expect("alarm_reason lock poisoned");
        if guard.is_none() {
            *guard = Some(reason);
        }
    }
}

#[async_trait]
impl HaltChecker for HaltGate {
    async fn is_halted(&self) -> bool {
        if self.alarm.load(Ordering::SeqCst) {
            return true;
        }
        match self.cessation_flags.is_ceased().await {
            Ok(ceased) => ceased,
            // CT-13: both flag channels unreadable is ambiguity, and
            // ambiguity always resolves to halted.
            Err(e) => {
                tracing::error!(target: "integrity", error = %e, "cessation flag store unreadable: resolving to halted per CT-13");
                true
            }
        }
    }

    async fn halt_reason(&self) -> Option<String> {
        if let Some(reason) = self.alarm_reason.read().expect("alarm_reason lock poisoned").clone() {
            return Some(reason);
        }
        match self.cessation_flags.details().await {
            Ok(Some(details)) => Some(details.reason),
            Ok(None) => None,
            Err(e) => Some(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FlagChannel, InMemoryCessationFlagStore};

    #[tokio::test]
    async fn not_halted_when_neither_source_is_tripped() {
        let gate = HaltGate::new(Arc::new(InMemoryCessationFlagStore::new()));
        assert!(!gate.is_halted().await);
        assert_eq!(gate.halt_reason().await, None);
    }

    #[tokio::test]
    async fn alarm_halts_independently_of_cessation_flag() {
        let gate = HaltGate::new(Arc::new(InMemoryCessationFlagStore::new()));
        gate.raise_alarm("content hash verification failed");
        assert!(gate.is_halted().await);
        assert_eq!(gate.halt_reason().await.as_deref(), Some("content hash verification failed"));
    }

    #[tokio::test]
    async fn cessation_flag_halts_even_without_an_alarm() {
        let flags = Arc::new(InMemoryCessationFlagStore::new());
        flags
            .set(
                FlagChannel::Fast,
                crate::store::cessation_flag_store::CessationFlagDetails {
                    triggering_event_id: uuid::Uuid::new_v4(),
                    set_at: chrono::Utc::now(),
                    reason: "cessation executed".to_string(),
                },
            )
            .await
            .unwrap();
        let gate = HaltGate::new(flags);
        assert!(gate.is_halted().await);
    }
}
