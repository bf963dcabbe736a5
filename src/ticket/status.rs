use std::fmt;

use serde::{Deserialize, Serialize};

use crate::access::{Capability, Role};
use crate::error::{FastciliError, Result};

/// Lifecycle states of a damage report.
///
/// Each report flows through: SUBMITTED → ASSIGNED → IN_PROGRESS → COMPLETED → RATED
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Submitted,
    Assigned,
    InProgress,
    Completed,
    Rated,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Submitted,
        Status::Assigned,
        Status::InProgress,
        Status::Completed,
        Status::Rated,
    ];

    /// Column value in `reports.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Submitted => "submitted",
            Status::Assigned => "assigned",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Rated => "rated",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Status::Submitted => "Diajukan",
            Status::Assigned => "Ditugaskan",
            Status::InProgress => "Diproses",
            Status::Completed => "Selesai",
            Status::Rated => "Dinilai",
        }
    }

    /// True once the technician has finished, rated or not.
    pub fn is_finished(self) -> bool {
        matches!(self, Status::Completed | Status::Rated)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::InProgress => write!(f, "in progress"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Something a user asks to do with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Submit,
    Assign,
    Start,
    Complete,
    /// Replace notes/evidence of a completed repair ("Edit Laporan").
    Revise,
    Rate,
}

impl Action {
    pub fn capability(self) -> Capability {
        match self {
            Action::Submit => Capability::SubmitReport,
            Action::Assign => Capability::AssignRepair,
            Action::Start | Action::Complete | Action::Revise => Capability::WorkRepair,
            Action::Rate => Capability::RateRepair,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Submit => "submit",
            Action::Assign => "assign",
            Action::Start => "start",
            Action::Complete => "complete",
            Action::Revise => "revise",
            Action::Rate => "rate",
        };
        f.write_str(s)
    }
}

/// Transition table for the report lifecycle.
pub struct Lifecycle;

impl Lifecycle {
    /// Compute the status a report moves to when `role` performs `action`.
    ///
    /// `current` is `None` for a report that does not exist yet; only
    /// `Submit` is valid there. Role is checked before state, so a caller
    /// lacking the capability gets `Forbidden` regardless of the status.
    /// Ownership (original reporter, assigned technician) is checked by the
    /// caller, which knows the rows involved.
    pub fn next(current: Option<Status>, action: Action, role: Role) -> Result<Status> {
        role.require(action.capability())?;

        let next = match (current, action) {
            (None, Action::Submit) => Some(Status::Submitted),
            (Some(Status::Submitted), Action::Assign) => Some(Status::Assigned),
            (Some(Status::Assigned), Action::Start) => Some(Status::InProgress),
            (Some(Status::InProgress), Action::Complete) => Some(Status::Completed),
            (Some(Status::Completed), Action::Revise) => Some(Status::Completed),
            (Some(Status::Completed), Action::Rate) => Some(Status::Rated),
            _ => None,
        };

        match (next, current) {
            (Some(status), _) => Ok(status),
            (None, Some(from)) => Err(FastciliError::InvalidTransition { from, action }),
            // Only Submit starts a lifecycle; anything else on a missing report
            // is a lookup failure upstream.
            (None, None) => Err(FastciliError::validation(
                "status",
                format!("cannot {action} a report that does not exist"),
            )),
        }
    }
}
