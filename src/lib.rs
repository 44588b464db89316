// ==========================================
// School Closure - core library
// ==========================================
// Stack: Rust + SQLite (rusqlite)
// Scope: period closure, grade aggregation, promotion decisions,
//        pending-subject tracking
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - entities and types
pub mod domain;

// Repository layer - data access
pub mod repository;

// Engine layer - closure rules
pub mod engine;

// Configuration layer - setting table
pub mod config;

// Database infrastructure (connection PRAGMAs + schema bootstrap)
pub mod db;

// Logging
pub mod logging;

// API layer - closure operations
pub mod api;

// Application layer - shared state
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::types::{
    ClosureStatus, OutcomeStatus, PendingSubjectStatus, SchoolingStatus, SubjectStatus,
};

pub use domain::{
    ClosureReport, ClosureStats, GradeSummary, Inscription, PendingSubject, PeriodClosure,
    PromotionDecision, SchoolPeriod, StudentPeriodOutcome, SubjectResult, ValidationReport,
};

pub use engine::{
    ClosureError, ClosureOrchestrator, ClosurePreviewService, GradeAggregator, PendingSubjectTracker,
    PromotionDecisionEngine,
};

pub use api::{ApiError, ApiResult, ClosureApi};

pub use config::{ClosureConfigReader, ClosureParams, ConfigManager};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "school-closure";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
