// ==========================================
// School Closure - domain type definitions
// ==========================================
// Storage codes are the lowercase Spanish values used by the
// school database; serde uses the same codes so API payloads and
// table contents read alike.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Subject status (per subject, per inscription)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectStatus {
    #[serde(rename = "aprobada")]
    Approved,
    #[serde(rename = "reprobada")]
    Failed,
}

impl SubjectStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SubjectStatus::Approved => "aprobada",
            SubjectStatus::Failed => "reprobada",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "aprobada" => Some(SubjectStatus::Approved),
            "reprobada" => Some(SubjectStatus::Failed),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SubjectStatus::Failed)
    }
}

impl fmt::Display for SubjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// Outcome status (per inscription, end of period)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeStatus {
    #[serde(rename = "aprobado")]
    Approved,
    #[serde(rename = "materias_pendientes")]
    PendingSubjects,
    #[serde(rename = "reprobado")]
    Failed,
}

impl OutcomeStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Approved => "aprobado",
            OutcomeStatus::PendingSubjects => "materias_pendientes",
            OutcomeStatus::Failed => "reprobado",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "aprobado" => Some(OutcomeStatus::Approved),
            "materias_pendientes" => Some(OutcomeStatus::PendingSubjects),
            "reprobado" => Some(OutcomeStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// Schooling status (escolaridad) of an inscription
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchoolingStatus {
    #[serde(rename = "regular")]
    Regular,
    #[serde(rename = "repitiente")]
    Repeater,
    #[serde(rename = "materia_pendiente")]
    PendingSubject,
}

impl SchoolingStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SchoolingStatus::Regular => "regular",
            SchoolingStatus::Repeater => "repitiente",
            SchoolingStatus::PendingSubject => "materia_pendiente",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "regular" => Some(SchoolingStatus::Regular),
            "repitiente" => Some(SchoolingStatus::Repeater),
            "materia_pendiente" => Some(SchoolingStatus::PendingSubject),
            _ => None,
        }
    }

    /// Schooling status of the next-period inscription for a given outcome
    pub fn for_outcome(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::Failed => SchoolingStatus::Repeater,
            OutcomeStatus::PendingSubjects => SchoolingStatus::PendingSubject,
            OutcomeStatus::Approved => SchoolingStatus::Regular,
        }
    }
}

impl fmt::Display for SchoolingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// Pending subject status
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingSubjectStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "aprobada")]
    Approved,
    #[serde(rename = "convalidada")]
    Validated,
}

impl PendingSubjectStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PendingSubjectStatus::Pending => "pendiente",
            PendingSubjectStatus::Approved => "aprobada",
            PendingSubjectStatus::Validated => "convalidada",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" => Some(PendingSubjectStatus::Pending),
            "aprobada" => Some(PendingSubjectStatus::Approved),
            "convalidada" => Some(PendingSubjectStatus::Validated),
            _ => None,
        }
    }

    /// Only approved/validated close a debt
    pub fn is_resolution(&self) -> bool {
        !matches!(self, PendingSubjectStatus::Pending)
    }
}

impl fmt::Display for PendingSubjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// Period closure status
// ==========================================
// draft -> validating -> closed; failed is reserved for runs
// recorded by external tooling (a rolled-back run leaves no row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosureStatus {
    Draft,
    Validating,
    Closed,
    Failed,
}

impl ClosureStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ClosureStatus::Draft => "draft",
            ClosureStatus::Validating => "validating",
            ClosureStatus::Closed => "closed",
            ClosureStatus::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(ClosureStatus::Draft),
            "validating" => Some(ClosureStatus::Validating),
            "closed" => Some(ClosureStatus::Closed),
            "failed" => Some(ClosureStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ClosureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schooling_status_for_outcome() {
        assert_eq!(
            SchoolingStatus::for_outcome(OutcomeStatus::Failed),
            SchoolingStatus::Repeater
        );
        assert_eq!(
            SchoolingStatus::for_outcome(OutcomeStatus::PendingSubjects),
            SchoolingStatus::PendingSubject
        );
        assert_eq!(
            SchoolingStatus::for_outcome(OutcomeStatus::Approved),
            SchoolingStatus::Regular
        );
    }

    #[test]
    fn test_db_codes_parse_back() {
        for s in [OutcomeStatus::Approved, OutcomeStatus::PendingSubjects, OutcomeStatus::Failed] {
            assert_eq!(OutcomeStatus::from_db_str(s.to_db_str()), Some(s));
        }
        assert_eq!(PendingSubjectStatus::from_db_str("CONVALIDADA"), Some(PendingSubjectStatus::Validated));
        assert_eq!(ClosureStatus::from_db_str("archived"), None);
    }

    #[test]
    fn test_serde_uses_db_codes() {
        let json = serde_json::to_string(&OutcomeStatus::PendingSubjects).unwrap();
        assert_eq!(json, "\"materias_pendientes\"");
        let parsed: PendingSubjectStatus = serde_json::from_str("\"convalidada\"").unwrap();
        assert_eq!(parsed, PendingSubjectStatus::Validated);
    }
}
