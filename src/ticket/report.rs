use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::Status;
use crate::error::{FastciliError, Result};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// A damage report (laporan) filed against a facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub reporter_id: i64,
    pub facility_id: i64,
    pub damage_quantity: i64,
    pub description: String,
    pub extra_description: Option<String>,
    pub photo: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for filing a report. Building and room are implied by the facility.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewReport {
    pub facility_id: i64,
    pub damage_quantity: i64,
    pub description: String,
    pub extra_description: Option<String>,
    pub photo: Option<String>,
}

impl NewReport {
    /// Field checks that need no database access.
    pub fn validate(&self) -> Result<()> {
        if self.damage_quantity < 1 {
            return Err(FastciliError::validation(
                "jumlah_kerusakan",
                "must be at least 1",
            ));
        }
        if self.description.trim().is_empty() {
            return Err(FastciliError::validation("deskripsi", "must not be empty"));
        }
        Ok(())
    }
}

/// Link between a report and the technician working on it (penugasan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub report_id: i64,
    pub technician_id: i64,
    /// Catatan teknisi.
    pub notes: Option<String>,
    /// Dokumentasi perbaikan.
    pub evidence: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// What a technician hands in when closing a repair.
#[derive(Debug, Clone)]
pub struct RepairDocumentation {
    pub notes: String,
    pub evidence: String,
}

impl RepairDocumentation {
    pub fn new(notes: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
            evidence: evidence.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.notes.trim().is_empty() {
            return Err(FastciliError::validation("catatan_teknisi", "must not be empty"));
        }
        if self.evidence.trim().is_empty() {
            return Err(FastciliError::validation("dokumentasi", "evidence photo is required"));
        }
        Ok(())
    }
}

/// The reporter's verdict on a finished repair. Written once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub report_id: i64,
    pub reporter_id: i64,
    pub score: i64,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

/// Validate a rating score and feedback pair.
pub fn validate_rating(score: i64, feedback: &str) -> Result<()> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(FastciliError::validation(
            "rating_pengguna",
            format!("must be between {MIN_SCORE} and {MAX_SCORE}"),
        ));
    }
    if feedback.trim().is_empty() {
        return Err(FastciliError::validation("feedback_pengguna", "must not be empty"));
    }
    Ok(())
}

/// One entry of a report's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Option<Status>,
    pub to: Status,
    pub actor_id: i64,
    pub changed_at: DateTime<Utc>,
}

/// A report together with everything attached to it.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDetail {
    pub report: Report,
    pub assignment: Option<Assignment>,
    pub rating: Option<Rating>,
    pub history: Vec<StatusChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_report() -> NewReport {
        NewReport {
            facility_id: 1,
            damage_quantity: 2,
            description: "AC tidak dingin".into(),
            ..Default::default()
        }
    }

    #[test]
    fn new_report_accepts_minimal_input() {
        assert!(new_report().validate().is_ok());
    }

    #[test]
    fn new_report_requires_description() {
        let input = NewReport {
            description: "   ".into(),
            ..new_report()
        };
        let err = input.validate().unwrap_err();
        assert_eq!(err.field(), Some("deskripsi"));
    }

    #[test]
    fn new_report_requires_positive_quantity() {
        let input = NewReport {
            damage_quantity: 0,
            ..new_report()
        };
        assert_eq!(input.validate().unwrap_err().field(), Some("jumlah_kerusakan"));
    }

    #[test]
    fn documentation_requires_notes_and_evidence() {
        assert!(RepairDocumentation::new("AC dingin kembali", "bukti.jpg").validate().is_ok());
        assert_eq!(
            RepairDocumentation::new("", "bukti.jpg").validate().unwrap_err().field(),
            Some("catatan_teknisi")
        );
        assert_eq!(
            RepairDocumentation::new("selesai", " ").validate().unwrap_err().field(),
            Some("dokumentasi")
        );
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1, "ok").is_ok());
        assert!(validate_rating(5, "mantap").is_ok());
        assert_eq!(validate_rating(0, "x").unwrap_err().field(), Some("rating_pengguna"));
        assert_eq!(validate_rating(6, "x").unwrap_err().field(), Some("rating_pengguna"));
        assert_eq!(validate_rating(3, "").unwrap_err().field(), Some("feedback_pengguna"));
    }
}
