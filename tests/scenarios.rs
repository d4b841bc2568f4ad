//! End-to-end scenarios exercising the full accountability engine across
//! module boundaries: breach lifecycle, cessation consideration, final
//! deliberation and execution, and the universal invariants that must hold
//! no matter which path a test takes to get there.

use std::sync::Arc;

use archon_ledger::breach::BreachService;
use archon_ledger::cessation::{CessationConsiderationService, CessationExecutionOrchestrator, CessationOutcome, FinalDeliberationService};
use archon_ledger::error::{AccountabilityError, ServiceError, ValidationError};
use archon_ledger::event::{
    ArchonDeliberation, ArchonPosition, BreachSeverity, BreachType, CessationDecisionChoice, ResponseChoice,
    REQUIRED_ARCHON_COUNT,
};
use archon_ledger::halt::{HaltChecker, HaltGate};
use archon_ledger::store::{
    CessationFlagStore, EventLog, InMemoryBreachStore, InMemoryCessationFlagStore, InMemoryCessationStore,
    InMemoryEscalationStore, InMemoryEventLog,
};
use archon_ledger::witness::{HmacWitness, Witness};
use archon_ledger::writer::EventWriter;
use chrono::Utc;
use uuid::Uuid;

struct Harness {
    writer: Arc<EventWriter>,
    log: Arc<dyn EventLog>,
    flags: Arc<dyn CessationFlagStore>,
    halt_gate: Arc<HaltGate>,
    breaches: Arc<BreachService>,
    considerations: CessationConsiderationService,
}

async fn build_harness() -> Harness {
    let log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    let witness: Arc<dyn Witness> = Arc::new(HmacWitness::new("witness-1", b"constitutional-key".to_vec()));
    let flags: Arc<dyn CessationFlagStore> = Arc::new(InMemoryCessationFlagStore::new());
    let halt_gate = Arc::new(HaltGate::new(flags.clone()));
    let writer = Arc::new(EventWriter::new(log.clone(), witness, halt_gate.clone()));
    writer.verify_startup().await.unwrap();

    let halt_checker: Arc<dyn HaltChecker> = halt_gate.clone();
    let breaches = Arc::new(BreachService::new(
        Arc::new(InMemoryBreachStore::new()),
        Arc::new(InMemoryEscalationStore::new()),
        writer.clone(),
        halt_checker.clone(),
    ));
    let considerations = CessationConsiderationService::new(
        breaches.clone(),
        Arc::new(InMemoryCessationStore::new()),
        writer.clone(),
        halt_checker,
    );

    Harness { writer, log, flags, halt_gate, breaches, considerations }
}

fn full_archon_vote(position: ArchonPosition) -> Vec<ArchonDeliberation> {
    (0..REQUIRED_ARCHON_COUNT)
        .map(|i| ArchonDeliberation {
            archon_id: format!("archon-{i}"),
            position,
            reasoning: "final deliberation".to_string(),
            statement_timestamp: Utc::now(),
        })
        .collect()
}

/// A breach is declared, acknowledged within the window, and never
/// escalates — the chain stays contiguous and well-formed throughout.
#[tokio::test]
async fn declare_and_acknowledge_keeps_chain_contiguous() {
    let h = build_harness().await;

    let breach = h
        .breaches
        .declare_breach(BreachType::HashMismatch, "FR82".to_string(), BreachSeverity::Critical, serde_json::json!({"detail": "mismatch"}), None)
        .await
        .unwrap();

    h.breaches
        .acknowledge_breach(breach.breach_id, "archon-7".to_string(), ResponseChoice::Corrective)
        .await
        .unwrap();

    assert_eq!(h.log.len().await.unwrap(), 2);
    let e1 = h.log.by_sequence(1).await.unwrap().unwrap();
    let e2 = h.log.by_sequence(2).await.unwrap().unwrap();
    assert_eq!(e1.previous_content_hash, None);
    assert_eq!(e2.previous_content_hash, Some(e1.content_hash));
    assert!(!h.halt_gate.is_halted().await);
}

/// An unacknowledged breach escalates to the Conclave agenda once the
/// 7-day window has passed; acknowledgment afterward still succeeds.
#[tokio::test]
async fn overdue_breach_escalates_then_is_still_acknowledgeable() {
    let h = build_harness().await;

    let breach = h
        .breaches
        .declare_breach(BreachType::TimingViolation, "FR31".to_string(), BreachSeverity::High, serde_json::json!({}), None)
        .await
        .unwrap();

    h.breaches.escalate_breach(breach.breach_id).await.unwrap();

    let double = h.breaches.escalate_breach(breach.breach_id).await;
    assert!(matches!(double, Err(AccountabilityError::Service(ServiceError::BreachAlreadyEscalated(_)))));

    let ack = h.breaches.acknowledge_breach(breach.breach_id, "archon-3".to_string(), ResponseChoice::Accept).await;
    assert!(ack.is_ok());
}

/// Eleven unacknowledged breaches trigger a cessation consideration;
/// the Conclave defers it; a second decision attempt is rejected.
#[tokio::test]
async fn cessation_consideration_lifecycle() {
    let h = build_harness().await;

    for i in 0..11 {
        h.breaches
            .declare_breach(
                BreachType::QuorumViolation,
                format!("FR3{i}"),
                BreachSeverity::Medium,
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();
    }

    assert_eq!(h.considerations.get_breach_alert_status().await.unwrap(), Some("CRITICAL"));

    let consideration = h.considerations.check_and_trigger_cessation().await.unwrap().unwrap();
    assert_eq!(consideration.breach_count, 11);
    assert!(h.considerations.is_cessation_consideration_active().await.unwrap());

    h.considerations
        .record_decision(consideration.consideration_id, CessationDecisionChoice::DeferReview, "conclave".to_string(), "insufficient consensus".to_string())
        .await
        .unwrap();

    let second = h
        .considerations
        .record_decision(consideration.consideration_id, CessationDecisionChoice::ProceedToVote, "conclave".to_string(), "reconsidered".to_string())
        .await;
    assert!(matches!(second, Err(AccountabilityError::Service(ServiceError::InvalidCessationDecision { .. }))));
}

/// Eight unacknowledged breaches sit at the warning band, not yet
/// critical — the boundary between WARNING and CRITICAL is exact.
#[tokio::test]
async fn warning_threshold_boundary() {
    let h = build_harness().await;
    for i in 0..8 {
        h.breaches
            .declare_breach(BreachType::OverrideAbuse, format!("FR4{i}"), BreachSeverity::Low, serde_json::json!({}), None)
            .await
            .unwrap();
    }
    assert_eq!(h.considerations.get_breach_alert_status().await.unwrap(), Some("WARNING"));
    assert!(h.considerations.check_and_trigger_cessation().await.unwrap().is_none());
}

/// Full 72-Archon final deliberation followed by cessation execution —
/// the terminal event is written, both flag channels are set, and the
/// system halts for every operation after.
#[tokio::test]
async fn full_deliberation_then_cessation_halts_the_system() {
    let h = build_harness().await;

    h.breaches
        .declare_breach(BreachType::EmergenceViolation, "FR135".to_string(), BreachSeverity::Critical, serde_json::json!({}), None)
        .await
        .unwrap();

    let final_deliberation = Arc::new(FinalDeliberationService::new(h.writer.clone(), h.halt_gate.clone()));
    let halt_checker: Arc<dyn HaltChecker> = h.halt_gate.clone();
    let orchestrator = CessationExecutionOrchestrator::new(h.writer.clone(), h.log.clone(), h.flags.clone(), halt_checker, final_deliberation);

    let archons = full_archon_vote(ArchonPosition::SupportCessation);
    let outcome = orchestrator
        .execute_cessation_with_deliberation(
            Uuid::new_v4(),
            Utc::now() - chrono::Duration::hours(2),
            Utc::now(),
            archons,
            Uuid::new_v4(),
            "72-archon supermajority vote to cease".to_string(),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, CessationOutcome::Executed(_)));

    assert!(h.halt_gate.is_halted().await);
    let declare_after = h
        .breaches
        .declare_breach(BreachType::HashMismatch, "FR30".to_string(), BreachSeverity::Low, serde_json::json!({}), None)
        .await;
    assert!(matches!(declare_after, Err(AccountabilityError::Integrity(_))));
}

/// A cessation deliberation with a mixed, dissenting vote still
/// executes — dissent doesn't block execution, it's reported.
#[tokio::test]
async fn dissenting_vote_still_executes_and_reports_dissent() {
    let h = build_harness().await;

    h.breaches
        .declare_breach(BreachType::SignatureInvalid, "FR135".to_string(), BreachSeverity::High, serde_json::json!({}), None)
        .await
        .unwrap();

    let final_deliberation = Arc::new(FinalDeliberationService::new(h.writer.clone(), h.halt_gate.clone()));
    let halt_checker: Arc<dyn HaltChecker> = h.halt_gate.clone();
    let orchestrator = CessationExecutionOrchestrator::new(h.writer.clone(), h.log.clone(), h.flags.clone(), halt_checker, final_deliberation);

    let mut archons = full_archon_vote(ArchonPosition::SupportCessation);
    // Flip 10 votes to Oppose and 2 to Abstain so dissent is measurable.
    for a in archons.iter_mut().take(10) {
        a.position = ArchonPosition::OpposeCessation;
    }
    for a in archons.iter_mut().skip(10).take(2) {
        a.position = ArchonPosition::Abstain;
    }

    let outcome = orchestrator
        .execute_cessation_with_deliberation(
            Uuid::new_v4(),
            Utc::now() - chrono::Duration::hours(1),
            Utc::now(),
            archons,
            Uuid::new_v4(),
            "supermajority with dissent".to_string(),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, CessationOutcome::Executed(_)));
}

/// Universal invariant: acknowledging a breach twice is always rejected,
/// regardless of whether it was previously escalated.
#[tokio::test]
async fn double_acknowledgment_is_always_rejected() {
    let h = build_harness().await;
    let breach = h
        .breaches
        .declare_breach(BreachType::ConstitutionalConstraint, "FR31".to_string(), BreachSeverity::Medium, serde_json::json!({}), None)
        .await
        .unwrap();

    h.breaches.acknowledge_breach(breach.breach_id, "archon-1".to_string(), ResponseChoice::Defer).await.unwrap();
    let second = h.breaches.acknowledge_breach(breach.breach_id, "archon-2".to_string(), ResponseChoice::Defer).await;
    assert!(matches!(second, Err(AccountabilityError::Service(ServiceError::BreachAlreadyAcknowledged(_)))));
}

/// Boundary: exactly 71 Archons (one short of quorum) is rejected before
/// any event is written — the log is untouched.
#[tokio::test]
async fn wrong_archon_count_writes_nothing() {
    let h = build_harness().await;
    let final_deliberation = Arc::new(FinalDeliberationService::new(h.writer.clone(), h.halt_gate.clone()));
    let halt_checker: Arc<dyn HaltChecker> = h.halt_gate.clone();
    let orchestrator = CessationExecutionOrchestrator::new(h.writer.clone(), h.log.clone(), h.flags.clone(), halt_checker, final_deliberation);

    let archons = full_archon_vote(ArchonPosition::SupportCessation)[..71].to_vec();
    let before = h.log.len().await.unwrap();
    let result = orchestrator
        .execute_cessation_with_deliberation(Uuid::new_v4(), Utc::now() - chrono::Duration::hours(1), Utc::now(), archons, Uuid::new_v4(), "short".to_string())
        .await;
    assert!(matches!(result, Err(AccountabilityError::Validation(ValidationError::WrongArchonCount(71)))));
    assert_eq!(h.log.len().await.unwrap(), before);
}

/// Empty attribution on a cessation decision is rejected before any write.
#[tokio::test]
async fn empty_decision_attribution_is_rejected() {
    let h = build_harness().await;
    for i in 0..11 {
        h.breaches
            .declare_breach(BreachType::WitnessCollusion, format!("FR5{i}"), BreachSeverity::Critical, serde_json::json!({}), None)
            .await
            .unwrap();
    }
    let consideration = h.considerations.check_and_trigger_cessation().await.unwrap().unwrap();
    let result = h
        .considerations
        .record_decision(consideration.consideration_id, CessationDecisionChoice::DismissConsideration, "   ".to_string(), "reason".to_string())
        .await;
    assert!(matches!(result, Err(AccountabilityError::Validation(ValidationError::InvalidCessationInput(_)))));
}
