//! Error taxonomy (FR30-FR32, FR135, CT-11, CT-13).
//!
//! Three classes, by precedence (spec §7):
//! 1. [`IntegrityError`] — never retried, never swallowed, always halts.
//! 2. [`ServiceError`] — state-machine violations, synchronous, no mutation.
//! 3. [`ValidationError`] — raised before any persistence, no mutation.
//!
//! [`AccountabilityError`] is the flat taxonomy surfaced to callers (spec §6);
//! the three-way precedence lives in which variant gets constructed.

use uuid::Uuid;

/// Integrity violations. CT-11: silent failure destroys legitimacy. These
/// are never caught-and-continued; they propagate and halt the process.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("CT-11: system is halted: {0}")]
    SystemHalted(String),

    #[error("ADR-1: writer head-hash mismatch — local={local}, stored={stored}")]
    WriterInconsistency { local: String, stored: String },

    #[error("writer has not completed startup verification — call verify_startup() first")]
    WriterNotVerified,

    #[error(
        "FR135: complete deliberation recording failure — {error_code}: {error_message}"
    )]
    DeliberationRecordingCompleteFailure {
        error_code: String,
        error_message: String,
    },

    #[error("ADR-3: both cessation flag channels unreadable: {0}")]
    FlagChannelsUnreadable(String),
}

/// State-machine violations. Raised synchronously to the caller; no halt,
/// no partial mutation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("FR31: breach not found: {0}")]
    BreachNotFound(Uuid),

    #[error("FR31: breach already acknowledged: {0}")]
    BreachAlreadyAcknowledged(Uuid),

    #[error("FR31: breach already escalated: {0}")]
    BreachAlreadyEscalated(Uuid),

    #[error("FR31: escalation timer not started for breach {0}")]
    EscalationTimerNotStarted(Uuid),

    #[error("FR32: cessation consideration not found: {0}")]
    CessationConsiderationNotFound(Uuid),

    #[error("FR32: invalid cessation decision for {consideration_id}: {reason}")]
    InvalidCessationDecision { consideration_id: Uuid, reason: String },

    /// Not raised by [`crate::cessation::consideration::CessationConsiderationService`]
    /// (that service is idempotent and returns `Ok(None)` instead — see
    /// SPEC_FULL.md §4.4). Retained for API-layer callers that want strict
    /// duplicate detection.
    #[error("FR32: cessation consideration already triggered: {0}")]
    CessationAlreadyTriggered(Uuid),

    /// Not raised by the service for the same reason as above.
    #[error("FR32: breach count ({current_count}) does not exceed cessation threshold ({threshold})")]
    BelowThreshold { current_count: usize, threshold: usize },
}

/// Validation errors. Raised before any persistence; no mutation occurs.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("FR31: invalid acknowledgment — {0}")]
    InvalidAcknowledgment(String),

    #[error("FR32: {0}")]
    InvalidCessationInput(String),

    #[error("FR135: cessation deliberation requires exactly 72 archon entries, got {0}")]
    WrongArchonCount(usize),

    #[error("FR135: vote_counts does not match the positions recorded in archon_deliberations")]
    VoteCountMismatch,

    #[error("dissent_percentage must be within [0, 100], got {0}")]
    InvalidDissentPercentage(f64),

    #[error("duration_seconds must be non-negative, got {0}")]
    NegativeDuration(i64),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("FR30: invalid breach type '{0}' — must be a valid BreachType value")]
    InvalidBreachType(String),
}

/// Failures of the write path itself, or of the no-silent-edits rule.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("FR30: breach declaration failed: {0}")]
    BreachDeclarationError(String),

    #[error("FR30: breach query failed: {0}")]
    BreachQueryError(String),

    #[error("cessation execution error: {0}")]
    CessationExecutionError(String),

    #[error(
        "FR13: silent edit detected — hash mismatch (stored={stored_prefix}, computed={computed_prefix})"
    )]
    Fr13Violation {
        stored_prefix: String,
        computed_prefix: String,
    },
}

/// The flat error taxonomy surfaced to callers (spec §6). Every variant
/// below carries the governing requirement tag in its `Display` impl.
#[derive(Debug, thiserror::Error)]
pub enum AccountabilityError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub type Result<T> = std::result::Result<T, AccountabilityError>;
