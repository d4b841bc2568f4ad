//! Cessation: automatic consideration triggers (FR32), the Conclave's
//! decision on each, and the final, irreversible execution path (FR41,
//! FR43, FR135).

pub mod consideration;
pub mod execution;

pub use consideration::CessationConsiderationService;
pub use execution::{CessationExecutionOrchestrator, CessationOutcome, DeliberationOutcome, FinalDeliberationService};
