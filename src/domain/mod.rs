// ==========================================
// School Closure - domain layer
// ==========================================
// Entities, snapshots and value types
// No data access, no engine logic
// ==========================================

pub mod academic;
pub mod closure;
pub mod grading;
pub mod outcome;
pub mod types;

pub use academic::{Grade, Inscription, NewInscription, PeriodGrade, SchoolPeriod, Term, TransitionRule};
pub use closure::{
    ChecklistProgress, ClosureLogEntry, ClosureReport, ClosureStats, PeriodClosure,
    PeriodStatusView, PreviewRow, StudentClosureOutcome, ValidationReport,
};
pub use grading::{
    CouncilPointEntry, GradeSummary, InscriptionGradingSnapshot, QualificationEntry,
    SubjectFinalGrade, SubjectGradingSnapshot, SubjectResult,
};
pub use outcome::{
    OutcomeMetadata, OutcomeView, OwedSubject, PendingSubject, PendingSubjectView,
    PromotionDecision, StudentPeriodOutcome,
};
pub use types::{ClosureStatus, OutcomeStatus, PendingSubjectStatus, SchoolingStatus, SubjectStatus};
