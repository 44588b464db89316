// ==========================================
// School Closure - academic structure models
// ==========================================
// Read-only for the engine except Inscription (next-period rows)
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::SchoolingStatus;

// ==========================================
// SchoolPeriod - academic year
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolPeriod {
    pub id: i64,
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
    pub is_active: bool,
}

// ==========================================
// Term - grading lapse inside a period
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: i64,
    pub period_id: i64,
    pub name: String,
    pub ord: i32,
    pub is_blocked: bool,
}

// ==========================================
// Grade - catalog entry ordered by `ord`
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub name: String,
    pub ord: i32,
}

// ==========================================
// PeriodGrade - a grade opened in a given period
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodGrade {
    pub id: i64,
    pub period_id: i64,
    pub grade_id: i64,
}

// ==========================================
// TransitionRule - promotion policy per origin grade
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub id: i64,
    pub grade_from_id: i64,
    pub grade_to_id: Option<i64>,
    pub min_average: Option<f64>,
    pub max_pending_subjects: Option<i64>,
    pub auto_graduate: bool,
}

// ==========================================
// Inscription - enrollment of one student in one period
// ==========================================
// Loaded with student/grade/section names for audit lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inscription {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub period_id: i64,
    pub grade_id: i64,
    pub grade_name: String,
    pub grade_ord: i32,
    pub section_id: Option<i64>,
    pub section_name: Option<String>,
    pub schooling_status: SchoolingStatus,
    pub is_repeater: bool,
    pub origin_period_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Next-period inscription to be created by a closure run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInscription {
    pub student_id: i64,
    pub period_id: i64,
    pub grade_id: i64,
    pub section_id: Option<i64>,
    pub schooling_status: SchoolingStatus,
    pub is_repeater: bool,
    pub origin_period_id: i64,
}
