//! Cessation Flag Store (ADR-3). A dual-channel, monotonic, one-way latch:
//! once set, `is_ceased()` can never again report `false`. The two channels
//! ("fast" and "durable") exist so the Halt Gate can still observe cessation
//! if one channel is degraded; CT-13 requires that if *both* are unreadable
//! the ambiguity resolves to halted, never to "not ceased".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::IntegrityError;

/// Which channel a read or write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagChannel {
    Fast,
    Durable,
}

/// Detail recorded alongside the cessation flag: which event set it, and
/// when.
#[derive(Debug, Clone, PartialEq)]
pub struct CessationFlagDetails {
    pub triggering_event_id: Uuid,
    pub set_at: DateTime<Utc>,
    pub reason: String,
}

#[async_trait]
pub trait CessationFlagStore: Send + Sync {
    /// Set the flag on `channel`. Idempotent: setting an already-set channel
    /// is not an error.
    async fn set(&self, channel: FlagChannel, details: CessationFlagDetails) -> Result<(), IntegrityError>;

    /// Read a single channel. `Err` means that channel is unreadable right
    /// now (not "unset") — callers must not conflate the two.
    async fn read(&self, channel: FlagChannel) -> Result<bool, IntegrityError>;

    /// OR-semantics across both channels (ADR-3): ceased if either channel
    /// reports set. If *both* channels are unreadable, CT-13 requires this
    /// resolve to `Err`, not `Ok(false)` — ambiguity must never look like
    /// "not ceased".
    async fn is_ceased(&self) -> Result<bool, IntegrityError> {
        let fast = self.read(FlagChannel::Fast).await;
        let durable = self.read(FlagChannel::Durable).await;
        match (fast, durable) {
            (Ok(f), Ok(d)) => Ok(f || d),
            (Ok(f), Err(_)) => Ok(f),
            (Err(_), Ok(d)) => Ok(d),
            (Err(fast_err), Err(durable_err)) => Err(IntegrityError::FlagChannelsUnreadable(format!(
                "fast: {fast_err}; durable: {durable_err}"
            ))),
        }
    }

    async fn details(&self) -> Result<Option<CessationFlagDetails>, IntegrityError>;
}

#[derive(Default)]
pub struct InMemoryCessationFlagStore {
    fast: RwLock<bool>,
    durable: RwLock<bool>,
    details: RwLock<Option<CessationFlagDetails>>,
}

impl InMemoryCessationFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CessationFlagStore for InMemoryCessationFlagStore {
    async fn set(&self, channel: FlagChannel, details: CessationFlagDetails) -> Result<(), IntegrityError> {
        match channel {
            FlagChannel::Fast => *self.fast.write().await = true,
            FlagChannel::Durable => *self.durable.write().await = true,
        }
        let mut stored = self.details.write().await;
        if stored.is_none() {
            *stored = Some(details);
        }
        Ok(())
    }

    async fn read(&self, channel: FlagChannel) -> Result<bool, IntegrityError> {
        Ok(match channel {
            FlagChannel::Fast => *self.fast.read().await,
            FlagChannel::Durable => *self.durable.read().await,
        })
    }

    async fn details(&self) -> Result<Option<CessationFlagDetails>, IntegrityError> {
        Ok(self.details.read().await.clone())
    }
}
