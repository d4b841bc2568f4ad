//! The Event record (spec §3) and its canonical-byte / hash-chain contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::event::canonical::canonical_bytes;
use crate::event::payload::EventPayload;

/// The atom of the system. Every field listed here is immutable once the
/// event is durable; there is no secondary mutable field (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    /// Monotonically increasing, gap-free, assigned by the Writer.
    pub sequence: u64,
    pub event_type: String,
    pub payload: EventPayload,
    pub agent_id: String,
    pub local_timestamp: DateTime<Utc>,
    /// The predecessor's `content_hash`, or absent for the genesis event.
    pub previous_content_hash: Option<String>,
    /// SHA-256 over canonical bytes, binding this event into the chain.
    pub content_hash: String,
    pub witness_id: String,
    pub witness_signature: String,
}

/// The envelope over which the Writer computes `content_hash` (spec §4.1
/// step 5): `(sequence, event_type, payload, agent_id, local_timestamp,
/// previous_content_hash)`. A private, ordering-agnostic shape — canonical
/// byte sorting is handled by [`canonical_bytes`], not by field order here.
#[derive(Serialize)]
struct CanonicalEnvelope<'a> {
    sequence: u64,
    event_type: &'a str,
    payload: serde_json::Value,
    agent_id: &'a str,
    local_timestamp: DateTime<Utc>,
    previous_content_hash: Option<&'a str>,
}

/// Canonical bytes for the envelope that gets content-hashed (spec §4.1,
/// §6). Every payload type's `signable_content` is a pure function of its
/// own fields; this is the pure function of the *event* as a whole.
pub fn canonical_envelope_bytes(
    sequence: u64,
    event_type: &str,
    payload: &EventPayload,
    agent_id: &str,
    local_timestamp: DateTime<Utc>,
    previous_content_hash: Option<&str>,
) -> Vec<u8> {
    let envelope = CanonicalEnvelope {
        sequence,
        event_type,
        payload: payload.inner_value(),
        agent_id,
        local_timestamp,
        previous_content_hash,
    };
    canonical_bytes(&envelope)
}

/// SHA-256 over canonical bytes, as a lowercase hex string.
pub fn content_hash(canonical_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes);
    hex::encode(hasher.finalize())
}
