//! Persistence contracts (spec §6, §9). Every store here is a trait plus an
//! in-memory reference implementation — persistence engines are explicitly
//! out of scope (spec §1); the in-memory implementations double as the test
//! fixtures for every service in this crate.

pub mod breach_store;
pub mod cessation_flag_store;
pub mod cessation_store;
pub mod dissent_store;
pub mod escalation_store;
pub mod event_log;

pub use breach_store::{BreachStore, InMemoryBreachStore};
pub use cessation_flag_store::{CessationFlagStore, FlagChannel, InMemoryCessationFlagStore};
pub use cessation_store::{CessationStore, InMemoryCessationStore};
pub use dissent_store::{DissentMetricsStore, InMemoryDissentMetricsStore};
pub use escalation_store::{EscalationStore, InMemoryEscalationStore};
pub use event_log::{EventLog, InMemoryEventLog};

/// A store-layer failure — I/O, serialization, or an invariant the store
/// itself enforces (e.g. out-of-order append). Distinct from
/// [`crate::error::AccountabilityError`]; services translate `StoreError`
/// into the appropriate taxonomy class for their operation.
#[derive(Debug, thiserror::Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);
