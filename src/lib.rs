//! Archon Ledger: the constitutional accountability engine for the
//! 72-Archon Conclave.
//!
//! Every constitutionally significant act — a breach declaration, an
//! acknowledgment, an escalation, a cessation consideration, a Conclave
//! decision, the final deliberation, cessation itself — becomes an
//! immutable, witnessed, hash-chained [`Event`](event::Event). Nothing here
//! ever mutates or deletes a past event; the [`writer::EventWriter`] is the
//! only append path, and the [`halt::HaltGate`] is consulted by every
//! service before it writes.
//!
//! # Structure
//!
//! - `event`: the event record, canonical byte encoding, and payload shapes
//!   for every event type this system emits.
//! - `witness`: the pluggable attestation contract every event is signed
//!   under (CT-12).
//! - `writer`: the single-writer, self-verifying append path (ADR-1).
//! - `halt`: the halt oracle consulted before every service operation
//!   (CT-11, CT-13).
//! - `store`: persistence contracts and in-memory reference implementations.
//! - `breach`: breach declaration, acknowledgment, and escalation (FR30,
//!   FR31).
//! - `cessation`: automatic cessation consideration (FR32) and the
//!   irreversible execution path (FR41, FR43, FR135).
//! - `dissent`: dissent health tracking and groupthink alerting (FR12).
//! - `verify`: the "No Silent Edits" content hash verifier (FR13).
//! - `error`: the three-class error taxonomy every operation surfaces
//!   through (FR30-32, FR135, CT-11, CT-13).
//!
//! # Example
//!
//! ```rust,ignore
//! use archon_ledger::breach::BreachService;
//! use archon_ledger::event::{BreachSeverity, BreachType};
//! ```

pub mod breach;
pub mod cessation;
pub mod dissent;
pub mod error;
pub mod event;
pub mod halt;
pub mod store;
pub mod verify;
pub mod witness;
pub mod writer;

pub use error::{AccountabilityError, Result};

/// Tunable thresholds wired into services at construction time rather than
/// hardcoded — the constitutional values themselves (e.g. the 7-day
/// escalation window, the 72-Archon quorum) are invariants, not
/// configuration, and stay as named constants in their owning module.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Rolling window, in days, for the cessation-trigger breach count
    /// (FR32 default: 90).
    pub cessation_window_days: u32,
    /// Unacknowledged-breach count above which cessation consideration
    /// triggers (FR32 default: 10, meaning 11+).
    pub cessation_threshold: usize,
    /// Early-alert threshold before the cessation threshold (default: 8).
    pub cessation_warning_threshold: usize,
    /// Dissent alert threshold, percent (NFR-023 default: 10.0).
    pub dissent_alert_threshold: f64,
    /// Rolling window, in days, for the dissent alert (NFR-023 default: 30).
    pub dissent_alert_period_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cessation_window_days: store::cessation_store::CESSATION_WINDOW_DAYS,
            cessation_threshold: store::cessation_store::CESSATION_THRESHOLD,
            cessation_warning_threshold: store::cessation_store::WARNING_THRESHOLD,
            dissent_alert_threshold: store::dissent_store::DEFAULT_DISSENT_THRESHOLD,
            dissent_alert_period_days: store::dissent_store::DEFAULT_PERIOD_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_constitutional_defaults() {
        let config = Config::default();
        assert_eq!(config.cessation_threshold, 10);
        assert_eq!(config.cessation_window_days, 90);
        assert_eq!(config.dissent_alert_threshold, 10.0);
    }
}
