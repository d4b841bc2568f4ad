//! Event log repository contract (spec §6): append / read-head /
//! read-by-sequence. The sole mutator is the [`crate::writer::EventWriter`];
//! this trait is otherwise read-oriented plus one atomic append.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::event::Event;
use crate::store::StoreError;

/// Persistence contract for the append-only event log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append `event` as the new head. Implementations must make this
    /// atomic: either `event` becomes durable and the new head, or nothing
    /// changes (spec §4.1 step 8).
    async fn append(&self, event: Event) -> Result<(), StoreError>;

    /// The highest-sequence event, or `None` if the log is empty (genesis).
    async fn head(&self) -> Result<Option<Event>, StoreError>;

    async fn by_sequence(&self, sequence: u64) -> Result<Option<Event>, StoreError>;

    /// Total number of events appended.
    async fn len(&self) -> Result<u64, StoreError>;
}

/// In-memory reference implementation. Doubles as the default (persistence
/// engines are out of scope, spec §1) and as the test fixture for every
/// service in this crate.
#[derive(Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: Event) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let expected_sequence = events.len() as u64 + 1;
        if event.sequence != expected_sequence {
            return Err(StoreError(format!(
                "append out of order: expected sequence {expected_sequence}, got {}",
                event.sequence
            )));
        }
        events.push(event);
        Ok(())
    }

    async fn head(&self) -> Result<Option<Event>, StoreError> {
        Ok(self.events.read().await.last().cloned())
    }

    async fn by_sequence(&self, sequence: u64) -> Result<Option<Event>, StoreError> {
        if sequence == 0 {
            return Ok(None);
        }
        Ok(self.events.read().await.get(sequence as usize - 1).cloned())
    }

    async fn len(&self) -> Result<u64, StoreError> {
        Ok(self.events.read().await.len() as u64)
    }
}
