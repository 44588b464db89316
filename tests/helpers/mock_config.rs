// ==========================================
// Mock configuration for integration tests
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use school_closure::config::{ClosureConfigReader, ConfigResult};

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub min_approval_grade: f64,
    pub max_failed_subjects: usize,
    pub min_promotion_average: f64,
}

impl MockConfig {
    /// Same values as an empty setting table
    pub fn default() -> Self {
        Self {
            min_approval_grade: 10.0,
            max_failed_subjects: 3,
            min_promotion_average: 10.0,
        }
    }

    pub fn with_min_approval(min_approval_grade: f64) -> Self {
        let mut config = Self::default();
        config.min_approval_grade = min_approval_grade;
        config
    }

    pub fn with_max_failed(max_failed_subjects: usize) -> Self {
        let mut config = Self::default();
        config.max_failed_subjects = max_failed_subjects;
        config
    }
}

#[async_trait]
impl ClosureConfigReader for MockConfig {
    async fn get_min_approval_grade(&self) -> ConfigResult<f64> {
        Ok(self.min_approval_grade)
    }

    async fn get_max_failed_subjects(&self) -> ConfigResult<usize> {
        Ok(self.max_failed_subjects)
    }

    async fn get_min_promotion_average(&self) -> ConfigResult<f64> {
        Ok(self.min_promotion_average)
    }
}

/// Config source that always fails
#[derive(Debug, Clone, Copy)]
pub struct BrokenConfig;

#[async_trait]
impl ClosureConfigReader for BrokenConfig {
    async fn get_min_approval_grade(&self) -> ConfigResult<f64> {
        Err("setting store unavailable".into())
    }

    async fn get_max_failed_subjects(&self) -> ConfigResult<usize> {
        Err("setting store unavailable".into())
    }

    async fn get_min_promotion_average(&self) -> ConfigResult<f64> {
        Err("setting store unavailable".into())
    }
}
