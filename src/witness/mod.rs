//! Witness: produce a deterministic signature over canonical bytes and
//! attach witness identity (spec §4.1, §6).
//!
//! The cryptographic primitive itself is out of scope (spec §1 — "referenced
//! only via a `Witness` contract"); [`HmacWitness`] is the reference
//! implementation this crate ships so the Writer has something concrete to
//! drive against, keyed the way the caller controls per spec §6.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Identity and signature of the witness attesting a `content_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessAttestation {
    pub witness_id: String,
    pub witness_signature: String,
}

/// Failure to produce a witness attestation. Not part of the integrity
/// taxonomy by itself — a service that cannot obtain a witness treats it
/// the same as any other write-path failure (spec §4.1 step 7, §7).
#[derive(Debug, thiserror::Error)]
#[error("witness attestation failed: {0}")]
pub struct WitnessError(pub String);

/// Given a `content_hash`, produce `{witness_id, signature}` deterministically
/// under a key the witness controls (spec §6).
pub trait Witness: Send + Sync {
    fn attest(&self, content_hash: &str) -> Result<WitnessAttestation, WitnessError>;
}

/// HMAC-SHA256 witness: deterministic, keyed, reproducible across processes.
/// Not a substitute for a production signing service — callers with real
/// key-management requirements implement [`Witness`] themselves.
pub struct HmacWitness {
    witness_id: String,
    key: Vec<u8>,
}

impl HmacWitness {
    pub fn new(witness_id: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Self { witness_id: witness_id.into(), key: key.into() }
    }
}

impl Witness for HmacWitness {
    fn attest(&self, content_hash: &str) -> Result<WitnessAttestation, WitnessError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| WitnessError(format!("invalid witness key: {e}")))?;
        mac.update(content_hash.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(WitnessAttestation {
            witness_id: self.witness_id.clone(),
            witness_signature: signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_hash_produces_same_signature() {
        let witness = HmacWitness::new("witness-1", b"test-key".to_vec());
        let a = witness.attest("deadbeef").unwrap();
        let b = witness.attest("deadbeef").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_hash_produces_different_signature() {
        let witness = HmacWitness::new("witness-1", b"test-key".to_vec());
        let a = witness.attest("deadbeef").unwrap();
        let b = witness.attest("cafef00d").unwrap();
        assert_ne!(a.witness_signature, b.witness_signature);
    }
}
