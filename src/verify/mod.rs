//! Content Hash Verifier / "No Silent Edits" (FR13). Publish succeeds only
//! if a stored hash is present AND equals the hash computed from the
//! content actually being published — a missing stored hash is treated as a
//! mismatch, not as "nothing to compare".

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AccountabilityError, IntegrityError, WriteError};
use crate::halt::HaltChecker;

#[derive(Debug, Clone, PartialEq)]
pub struct ContentVerificationResult {
    pub matches: bool,
    pub stored_hash: Option<String>,
    pub computed_hash: String,
    pub content_id: Uuid,
}

/// Pluggable source of the canonical stored hash for a content ID.
pub trait ContentHashSource: Send + Sync {
    fn get_stored_hash(&self, content_id: Uuid) -> Option<String>;
}

/// In-memory registry, the reference `ContentHashSource` — production
/// callers back this with the event store's own content hashes instead.
#[derive(Default)]
pub struct InMemoryContentHashRegistry {
    hashes: RwLock<HashMap<Uuid, String>>,
}

impl InMemoryContentHashRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, content_id: Uuid, hash: String) {
        self.hashes.write().await.insert(content_id, hash);
    }
}

impl ContentHashSource for InMemoryContentHashRegistry {
    fn get_stored_hash(&self, content_id: Uuid) -> Option<String> {
        self.hashes.try_read().ok().and_then(|map| map.get(&content_id).cloned())
    }
}

/// Enforces FR13 on publish: no content reaches callers whose hash has
/// drifted from the stored canonical hash.
pub struct PublishService {
    halt_checker: Arc<dyn HaltChecker>,
    hash_source: Arc<dyn ContentHashSource>,
}

impl PublishService {
    pub fn new(halt_checker: Arc<dyn HaltChecker>, hash_source: Arc<dyn ContentHashSource>) -> Self {
        Self { halt_checker, hash_source }
    }

    async fn halt_check(&self) -> Result<(), AccountabilityError> {
        if self.halt_checker.is_halted().await {
            let reason = self.halt_checker.halt_reason().await.unwrap_or_default();
            tracing::error!(target: "integrity", reason = %reason, "publish service rejected: system halted");
            return Err(IntegrityError::SystemHalted(reason).into());
        }
        Ok(())
    }

    /// Verify content against its stored hash without publishing.
    pub async fn verify_content(&self, content_id: Uuid, content: &[u8]) -> Result<ContentVerificationResult, AccountabilityError> {
        self.halt_check().await?;

        let stored_hash = self.hash_source.get_stored_hash(content_id);
        let mut hasher = Sha256::new();
        hasher.update(content);
        let computed_hash = hex::encode(hasher.finalize());

        let matches = stored_hash.as_deref() == Some(computed_hash.as_str());
        if !matches {
            tracing::warn!(content_id = %content_id, "content hash verification failed");
        }
        Ok(ContentVerificationResult { matches, stored_hash, computed_hash, content_id })
    }

    /// Publish `content`, blocking on any hash mismatch (FR13, AC2). A
    /// missing stored hash is itself a mismatch — there is no "nothing to
    /// compare" case that silently lets content through.
    pub async fn publish_content(&self, content_id: Uuid, content: &[u8]) -> Result<(), AccountabilityError> {
        let result = self.verify_content(content_id, content).await?;

        if !result.matches {
            let stored_prefix = result.stored_hash.as_deref().map(|h| prefix(h, 8)).unwrap_or_else(|| "none".to_string());
            let computed_prefix = prefix(&result.computed_hash, 8);
            tracing::error!(
                content_id = %content_id,
                stored_prefix = %stored_prefix,
                computed_prefix = %computed_prefix,
                "publish blocked: FR13 hash mismatch"
            );
            return Err(WriteError::Fr13Violation { stored_prefix, computed_prefix }.into());
        }

        tracing::info!(content_id = %content_id, "content published");
        Ok(())
    }
}

fn prefix(hash: &str, n: usize) -> String {
    hash.chars().take(n).collect()
}
