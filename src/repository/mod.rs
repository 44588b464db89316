// ==========================================
// School Closure - repository layer
// ==========================================
// Rule: repositories carry no business logic
// All queries are parameterised
// ==========================================
// Repositories borrow a `&Connection`; a closure run hands them its
// transaction (or a per-student savepoint) so every write of the run
// commits or rolls back together.
// ==========================================

pub mod closure_repo;
pub mod db_utils;
pub mod error;
pub mod grade_catalog_repo;
pub mod grading_repo;
pub mod inscription_repo;
pub mod outcome_repo;
pub mod pending_subject_repo;
pub mod period_repo;

pub use closure_repo::PeriodClosureRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use grade_catalog_repo::GradeCatalogRepository;
pub use grading_repo::GradingRepository;
pub use inscription_repo::InscriptionRepository;
pub use outcome_repo::OutcomeRepository;
pub use pending_subject_repo::PendingSubjectRepository;
pub use period_repo::PeriodRepository;
