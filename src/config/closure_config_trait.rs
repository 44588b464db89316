// ==========================================
// School Closure - closure configuration reader
// ==========================================
// Read-only interface consumed by the closure engine.
// Parameters are resolved once per run into `ClosureParams` and
// threaded through aggregation and decisioning.
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Error type of configuration reads
pub type ConfigError = Box<dyn Error + Send + Sync>;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Minimum passing score of a subject (0-20 scale)
pub const DEFAULT_MIN_APPROVAL_GRADE: f64 = 10.0;

/// Failed subjects tolerated before a student repeats the grade
pub const DEFAULT_MAX_FAILED_SUBJECTS: usize = 3;

/// Minimum average for promotion when no transition rule sets one
pub const DEFAULT_MIN_PROMOTION_AVERAGE: f64 = 10.0;

// ==========================================
// ClosureParams - resolved once per run
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureParams {
    /// Subject passes when final_score >= min_approval
    pub min_approval: f64,
    /// Promotion average used when the grade has no rule (or the rule leaves it unset)
    pub default_min_average: f64,
    /// Failed subjects above this make the student repeat
    pub max_failed_subjects: usize,
}

impl Default for ClosureParams {
    fn default() -> Self {
        Self {
            min_approval: DEFAULT_MIN_APPROVAL_GRADE,
            default_min_average: DEFAULT_MIN_PROMOTION_AVERAGE,
            max_failed_subjects: DEFAULT_MAX_FAILED_SUBJECTS,
        }
    }
}

// ==========================================
// ClosureConfigReader Trait
// ==========================================
// Implemented by ConfigManager (setting table) and by test mocks
#[async_trait]
pub trait ClosureConfigReader: Send + Sync {
    /// Passing score of a subject
    ///
    /// # Default
    /// - 10.0
    async fn get_min_approval_grade(&self) -> ConfigResult<f64>;

    /// Failed subjects tolerated before repeating
    ///
    /// # Default
    /// - 3
    async fn get_max_failed_subjects(&self) -> ConfigResult<usize>;

    /// Promotion average when no transition rule applies
    ///
    /// # Default
    /// - 10.0
    async fn get_min_promotion_average(&self) -> ConfigResult<f64>;

    /// Read every closure parameter in one go
    async fn resolve_params(&self) -> ConfigResult<ClosureParams> {
        Ok(ClosureParams {
            min_approval: self.get_min_approval_grade().await?,
            default_min_average: self.get_min_promotion_average().await?,
            max_failed_subjects: self.get_max_failed_subjects().await?,
        })
    }
}
