//! Event payload shapes (spec §3, §6).
//!
//! Each payload is a tagged-union variant of [`EventPayload`]. Constitutional
//! constraints per spec.md's original FR references are kept in doc comments
//! because they are the stable vocabulary this system is accountable to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::canonical::canonical_bytes;

/// Categories of constitutional violation (FR30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreachType {
    /// Threshold set below constitutional floor.
    ThresholdViolation,
    /// Statistical anomaly in witness pair co-occurrence.
    WitnessCollusion,
    /// Content hash verification failed.
    HashMismatch,
    /// Signature verification failed.
    SignatureInvalid,
    /// General constitutional primitive violation.
    ConstitutionalConstraint,
    /// Recovery waiting period or other timing constraint not honored.
    TimingViolation,
    /// Quorum not met for a decision requiring supermajority.
    QuorumViolation,
    /// Override violated constitutional constraints.
    OverrideAbuse,
    /// Emergence language violation detected.
    EmergenceViolation,
}

impl BreachType {
    /// Parse a breach type from its wire string (FR30). Closed-enum
    /// in-process callers never need this; it exists for boundary code
    /// deserializing breach types supplied by an external caller.
    pub fn parse(s: &str) -> Result<Self, crate::error::ValidationError> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| crate::error::ValidationError::InvalidBreachType(s.to_string()))
    }
}

/// Alert severity (aligned with architecture alert levels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreachSeverity {
    Critical,
    High,
    Medium,
    Low,
}

/// Acknowledgment response choices (FR31). Acknowledgment requires an
/// attributed response choice, not a template confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseChoice {
    /// Taking corrective action to address the breach.
    Corrective,
    /// Dismissing as false positive after investigation.
    Dismiss,
    /// Deferring to a future Conclave session for full review.
    Defer,
    /// Accepting breach as a known limitation with documented rationale.
    Accept,
}

/// Decision choices for a cessation consideration (FR32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CessationDecisionChoice {
    /// Move to a formal cessation vote.
    ProceedToVote,
    #[serde(rename = "dismiss")]
    DismissConsideration,
    #[serde(rename = "defer")]
    DeferReview,
}

/// Position an Archon took during final cessation deliberation (FR135).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchonPosition {
    SupportCessation,
    OpposeCessation,
    Abstain,
}

/// Payload for `breach.declared` (FR30). Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachDeclaredPayload {
    pub breach_id: Uuid,
    pub breach_type: BreachType,
    pub violated_requirement: String,
    pub severity: BreachSeverity,
    pub detection_timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<Uuid>,
}

impl BreachDeclaredPayload {
    pub fn signable_content(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

/// Payload for `breach.acknowledged` (FR31). Stops the escalation timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachAcknowledgedPayload {
    pub acknowledgment_id: Uuid,
    pub breach_id: Uuid,
    pub acknowledged_by: String,
    pub acknowledgment_timestamp: DateTime<Utc>,
    pub response_choice: ResponseChoice,
}

impl BreachAcknowledgedPayload {
    pub fn signable_content(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

/// Payload for `breach.escalated` (FR31). Escalation to the Conclave agenda
/// after 7 days unacknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachEscalatedPayload {
    pub escalation_id: Uuid,
    pub breach_id: Uuid,
    pub breach_type: BreachType,
    pub escalation_timestamp: DateTime<Utc>,
    pub days_since_breach: i64,
    pub agenda_placement_reason: String,
}

impl BreachEscalatedPayload {
    pub fn signable_content(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

/// Payload for `cessation.consideration` (FR32). Created when >10
/// unacknowledged breaches occur in a 90-day rolling window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CessationConsiderationPayload {
    pub consideration_id: Uuid,
    pub trigger_timestamp: DateTime<Utc>,
    pub breach_count: usize,
    pub window_days: u32,
    pub unacknowledged_breach_ids: Vec<Uuid>,
    pub agenda_placement_reason: String,
}

impl CessationConsiderationPayload {
    pub fn signable_content(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

/// Payload for `cessation.decision` (FR32). The Conclave's decision on a
/// consideration; at most one per consideration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CessationDecisionPayload {
    pub decision_id: Uuid,
    pub consideration_id: Uuid,
    pub decision: CessationDecisionChoice,
    pub decision_timestamp: DateTime<Utc>,
    pub decided_by: String,
    pub rationale: String,
}

impl CessationDecisionPayload {
    pub fn signable_content(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

/// One Archon's recorded position during final deliberation (FR135). All 72
/// must have an entry, even to abstain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchonDeliberation {
    pub archon_id: String,
    pub position: ArchonPosition,
    pub reasoning: String,
    pub statement_timestamp: DateTime<Utc>,
}

/// Yes/no/abstain tally for a cessation deliberation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub yes_count: u32,
    pub no_count: u32,
    pub abstain_count: u32,
}

impl VoteCounts {
    pub fn total(&self) -> u32 {
        self.yes_count + self.no_count + self.abstain_count
    }

    pub fn tally(deliberations: &[ArchonDeliberation]) -> Self {
        let mut counts = VoteCounts { yes_count: 0, no_count: 0, abstain_count: 0 };
        for d in deliberations {
            match d.position {
                ArchonPosition::SupportCessation => counts.yes_count += 1,
                ArchonPosition::OpposeCessation => counts.no_count += 1,
                ArchonPosition::Abstain => counts.abstain_count += 1,
            }
        }
        counts
    }
}

/// Required number of Archons for a cessation deliberation (FR135).
pub const REQUIRED_ARCHON_COUNT: usize = 72;

/// Payload for `cessation.deliberation` (FR135). Records the final,
/// pre-cessation deliberation of all 72 Archons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CessationDeliberationPayload {
    pub deliberation_id: Uuid,
    pub deliberation_started_at: DateTime<Utc>,
    pub deliberation_ended_at: DateTime<Utc>,
    pub vote_recorded_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub archon_deliberations: Vec<ArchonDeliberation>,
    pub vote_counts: VoteCounts,
    pub dissent_percentage: f64,
}

impl CessationDeliberationPayload {
    /// Validates FR135 invariants: exactly 72 Archons, vote counts matching
    /// positions, dissent in range, non-negative duration.
    pub fn validated(self) -> Result<Self, crate::error::ValidationError> {
        use crate::error::ValidationError;

        if self.archon_deliberations.len() != REQUIRED_ARCHON_COUNT {
            return Err(ValidationError::WrongArchonCount(self.archon_deliberations.len()));
        }
        if VoteCounts::tally(&self.archon_deliberations) != self.vote_counts {
            return Err(ValidationError::VoteCountMismatch);
        }
        if !(0.0..=100.0).contains(&self.dissent_percentage) {
            return Err(ValidationError::InvalidDissentPercentage(self.dissent_percentage));
        }
        if self.duration_seconds < 0 {
            return Err(ValidationError::NegativeDuration(self.duration_seconds));
        }
        Ok(self)
    }

    pub fn signable_content(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

/// Dissent percentage per FR12: share of non-majority (no + abstain) votes.
pub fn dissent_percentage(counts: VoteCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }
    let dissent_votes = counts.no_count + counts.abstain_count;
    round2(dissent_votes as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Payload for `cessation.deliberation_recording_failed` (FR135). Written
/// only when recording the deliberation itself failed; this failure event
/// then becomes the final event and cessation does not proceed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationRecordingFailedPayload {
    pub deliberation_id: Uuid,
    pub attempted_at: DateTime<Utc>,
    pub failed_at: DateTime<Utc>,
    pub error_code: String,
    pub error_message: String,
    pub retry_count: u32,
    pub partial_archon_count: usize,
}

impl DeliberationRecordingFailedPayload {
    pub fn signable_content(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

/// Payload for `cessation.executed` (FR43, FR135). The last-ever event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CessationExecutedPayload {
    pub cessation_id: Uuid,
    pub execution_timestamp: DateTime<Utc>,
    pub is_terminal: bool,
    pub final_sequence_number: u64,
    pub final_hash: String,
    pub reason: String,
    pub triggering_event_id: Uuid,
}

impl CessationExecutedPayload {
    pub fn new(
        cessation_id: Uuid,
        execution_timestamp: DateTime<Utc>,
        final_sequence_number: u64,
        final_hash: String,
        reason: String,
        triggering_event_id: Uuid,
    ) -> Self {
        Self {
            cessation_id,
            execution_timestamp,
            is_terminal: true,
            final_sequence_number,
            final_hash,
            reason,
            triggering_event_id,
        }
    }

    pub fn signable_content(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

/// Stable event type tags (spec §6), in persisted canonical bytes.
pub const BREACH_DECLARED_EVENT_TYPE: &str = "breach.declared";
pub const BREACH_ACKNOWLEDGED_EVENT_TYPE: &str = "breach.acknowledged";
pub const BREACH_ESCALATED_EVENT_TYPE: &str = "breach.escalated";
pub const CESSATION_CONSIDERATION_EVENT_TYPE: &str = "cessation.consideration";
pub const CESSATION_DECISION_EVENT_TYPE: &str = "cessation.decision";
pub const CESSATION_DELIBERATION_EVENT_TYPE: &str = "cessation.deliberation";
pub const CESSATION_DELIBERATION_RECORDING_FAILED_EVENT_TYPE: &str =
    "cessation.deliberation_recording_failed";
pub const CESSATION_EXECUTED_EVENT_TYPE: &str = "cessation.executed";

/// The tagged union of all event payload shapes (spec §3, §6, §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    #[serde(rename = "breach.declared")]
    BreachDeclared(BreachDeclaredPayload),
    #[serde(rename = "breach.acknowledged")]
    BreachAcknowledged(BreachAcknowledgedPayload),
    #[serde(rename = "breach.escalated")]
    BreachEscalated(BreachEscalatedPayload),
    #[serde(rename = "cessation.consideration")]
    CessationConsideration(CessationConsiderationPayload),
    #[serde(rename = "cessation.decision")]
    CessationDecision(CessationDecisionPayload),
    #[serde(rename = "cessation.deliberation")]
    CessationDeliberation(CessationDeliberationPayload),
    #[serde(rename = "cessation.deliberation_recording_failed")]
    CessationDeliberationRecordingFailed(DeliberationRecordingFailedPayload),
    #[serde(rename = "cessation.executed")]
    CessationExecuted(CessationExecutedPayload),
}

impl EventPayload {
    /// The stable dot-notation tag for this payload (spec §6).
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::BreachDeclared(_) => BREACH_DECLARED_EVENT_TYPE,
            EventPayload::BreachAcknowledged(_) => BREACH_ACKNOWLEDGED_EVENT_TYPE,
            EventPayload::BreachEscalated(_) => BREACH_ESCALATED_EVENT_TYPE,
            EventPayload::CessationConsideration(_) => CESSATION_CONSIDERATION_EVENT_TYPE,
            EventPayload::CessationDecision(_) => CESSATION_DECISION_EVENT_TYPE,
            EventPayload::CessationDeliberation(_) => CESSATION_DELIBERATION_EVENT_TYPE,
            EventPayload::CessationDeliberationRecordingFailed(_) => {
                CESSATION_DELIBERATION_RECORDING_FAILED_EVENT_TYPE
            }
            EventPayload::CessationExecuted(_) => CESSATION_EXECUTED_EVENT_TYPE,
        }
    }

    /// Canonical JSON value of the inner payload alone (without the
    /// `event_type` tag), used when building the Writer's envelope bytes.
    pub fn inner_value(&self) -> serde_json::Value {
        match self {
            EventPayload::BreachDeclared(p) => serde_json::to_value(p),
            EventPayload::BreachAcknowledged(p) => serde_json::to_value(p),
            EventPayload::BreachEscalated(p) => serde_json::to_value(p),
            EventPayload::CessationConsideration(p) => serde_json::to_value(p),
            EventPayload::CessationDecision(p) => serde_json::to_value(p),
            EventPayload::CessationDeliberation(p) => serde_json::to_value(p),
            EventPayload::CessationDeliberationRecordingFailed(p) => serde_json::to_value(p),
            EventPayload::CessationExecuted(p) => serde_json::to_value(p),
        }
        .expect("payload types always serialize")
    }
}
