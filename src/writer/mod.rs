//! Event Writer (spec §4.1, §6; ADR-1, GAP-CHAOS-001). The sole append path
//! into the event log: serializes concurrent callers, assigns sequence
//! numbers, builds the hash chain, and obtains the witness attestation.
//!
//! Halt checks are each service's own responsibility (Golden Rule #1 — HALT
//! FIRST, checked before a service even builds its payload); the Writer's
//! job is narrower and lower-level: never let two events claim the same
//! sequence, and never accept a write once it has detected the stored chain
//! has drifted from what it last wrote (ADR-1 split-brain protection).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::IntegrityError;
use crate::event::{canonical_envelope_bytes, content_hash, Event, EventPayload};
use crate::halt::HaltGate;
use crate::store::{EventLog, StoreError};
use crate::witness::Witness;

/// The sole mutator of the event log (ADR-1: "single canonical writer").
/// Cloning an `EventWriter` clones the `Arc`s, not the lock or verification
/// state — there is exactly one writer per process.
pub struct EventWriter {
    log: Arc<dyn EventLog>,
    witness: Arc<dyn Witness>,
    halt_gate: Arc<HaltGate>,
    verified: AtomicBool,
    write_lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(log: Arc<dyn EventLog>, witness: Arc<dyn Witness>, halt_gate: Arc<HaltGate>) -> Self {
        Self { log, witness, halt_gate, verified: AtomicBool::new(false), write_lock: Mutex::new(()) }
    }

    /// Recompute the head event's content hash from its own stored fields
    /// and compare against what was persisted (GAP-CHAOS-001). Must succeed
    /// before the first `write_event` call; an empty log trivially verifies.
    pub async fn verify_startup(&self) -> Result<(), IntegrityError> {
        let head = self
            .log
            .head()
            .await
            .map_err(|e| IntegrityError::WriterInconsistency { local: "n/a".to_string(), stored: e.to_string() })?;

        if let Some(event) = head {
            let recomputed_bytes = canonical_envelope_bytes(
                event.sequence,
                &event.event_type,
                &event.payload,
                &event.agent_id,
                event.local_timestamp,
                event.previous_content_hash.as_deref(),
            );
            let recomputed = content_hash(&recomputed_bytes);
            if recomputed != event.content_hash {
                tracing::error!(
                    target: "integrity",
                    local = %recomputed,
                    stored = %event.content_hash,
                    "writer inconsistency at startup: stored head hash does not recompute"
                );
                return Err(IntegrityError::WriterInconsistency {
                    local: recomputed,
                    stored: event.content_hash,
                });
            }
        }

        self.verified.store(true, Ordering::SeqCst);
        tracing::info!("event writer verified against stored head");
        Ok(())
    }

    /// Append a new event. Serialized against other `write_event` callers by
    /// an internal lock (ADR-1 single-writer discipline).
    pub async fn write_event(
        &self,
        payload: EventPayload,
        agent_id: &str,
        local_timestamp: DateTime<Utc>,
    ) -> Result<Event, IntegrityError> {
        if !self.verified.load(Ordering::SeqCst) {
            tracing::error!("event writer rejected write: not yet verified against stored head");
            return Err(IntegrityError::WriterNotVerified);
        }

        let _guard = self.write_lock.lock().await;

        let head = self.log.head().await.map_err(|e| self.inconsistency(e))?;
        let (sequence, previous_content_hash) = match &head {
            Some(event) => (event.sequence + 1, Some(event.content_hash.clone())),
            None => (1, None),
        };

        let event_type = payload.event_type();
        let envelope_bytes = canonical_envelope_bytes(
            sequence,
            event_type,
            &payload,
            agent_id,
            local_timestamp,
            previous_content_hash.as_deref(),
        );
        let content_hash = content_hash(&envelope_bytes);

        let attestation = self.witness.attest(&content_hash).map_err(|e| {
            self.halt_gate.raise_alarm(format!("witness attestation failed: {e}"));
            IntegrityError::SystemHalted(format!("witness attestation failed: {e}"))
        })?;

        let event = Event {
            event_id: Uuid::new_v4(),
            sequence,
            event_type: event_type.to_string(),
            payload,
            agent_id: agent_id.to_string(),
            local_timestamp,
            previous_content_hash,
            content_hash,
            witness_id: attestation.witness_id,
            witness_signature: attestation.witness_signature,
        };

        self.log.append(event.clone()).await.map_err(|e| self.inconsistency(e))?;

        tracing::info!(event_id = %event.event_id, sequence = event.sequence, event_type = %event.event_type, "event appended");
        Ok(event)
    }

    fn inconsistency(&self, e: StoreError) -> IntegrityError {
        self.halt_gate.raise_alarm(format!("event log inconsistency: {e}"));
        IntegrityError::WriterInconsistency { local: "append".to_string(), stored: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BreachDeclaredPayload, BreachSeverity, BreachType};
    use crate::store::{CessationFlagStore, InMemoryCessationFlagStore, InMemoryEventLog};
    use crate::witness::HmacWitness;

    fn sample_payload() -> EventPayload {
        EventPayload::BreachDeclared(BreachDeclaredPayload {
            breach_id: Uuid::new_v4(),
            breach_type: BreachType::HashMismatch,
            violated_requirement: "FR30".to_string(),
            severity: BreachSeverity::High,
            detection_timestamp: Utc::now(),
            details: serde_json::json!({}),
            source_event_id: None,
        })
    }

    fn writer() -> EventWriter {
        let log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
        let witness: Arc<dyn Witness> = Arc::new(HmacWitness::new("witness-1", b"key".to_vec()));
        let flags: Arc<dyn CessationFlagStore> = Arc::new(InMemoryCessationFlagStore::new());
        let halt_gate = Arc::new(HaltGate::new(flags));
        EventWriter::new(log, witness, halt_gate)
    }

    #[tokio::test]
    async fn write_before_verify_startup_is_rejected() {
        let writer = writer();
        let result = writer.write_event(sample_payload(), "agent", Utc::now()).await;
        assert!(matches!(result, Err(IntegrityError::WriterNotVerified)));
    }

    #[tokio::test]
    async fn sequential_writes_chain_hashes_and_increment_sequence() {
        let writer = writer();
        writer.verify_startup().await.unwrap();

        let first = writer.write_event(sample_payload(), "agent", Utc::now()).await.unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.previous_content_hash, None);

        let second = writer.write_event(sample_payload(), "agent", Utc::now()).await.unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.previous_content_hash, Some(first.content_hash));
    }

    #[tokio::test]
    async fn verify_startup_on_empty_log_succeeds() {
        let writer = writer();
        assert!(writer.verify_startup().await.is_ok());
    }
}
