// ==========================================
// School Closure - engine layer
// ==========================================
// Business rules of the period closure; SQL stays in repositories
// Pure cores (aggregate / decide) + loaders taking a borrowed
// connection, so the orchestrator can run them on its transaction
// ==========================================

pub mod error;
pub mod grade_aggregator;
pub mod orchestrator;
pub mod pending_tracker;
pub mod preview;
pub mod promotion;

pub use error::{ClosureError, EngineResult};
pub use grade_aggregator::{round2, GradeAggregator};
pub use orchestrator::{validate_period, ClosureOrchestrator};
pub use pending_tracker::{CarryForwardSummary, PendingSubjectTracker};
pub use preview::ClosurePreviewService;
pub use promotion::{determine_status, DecisionInputs, PromotionDecisionEngine};
