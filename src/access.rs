//! User levels and the capabilities each level holds.
//!
//! Permissions are a flat lookup from [`Role`] to [`Capability`]; there is no
//! role hierarchy. A Teknisi can read the location catalog but never gets a
//! capability that mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FastciliError, Result};

/// The four user levels, keyed by their fixed `levels.id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Sarpras,
    Teknisi,
    Pelapor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Sarpras, Role::Teknisi, Role::Pelapor];

    pub fn level_id(self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::Sarpras => 2,
            Role::Teknisi => 3,
            Role::Pelapor => 4,
        }
    }

    pub fn from_level_id(id: i64) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.level_id() == id)
    }

    /// Short code stored in `levels.code`.
    pub fn code(self) -> &'static str {
        match self {
            Role::Admin => "ADM",
            Role::Sarpras => "SPR",
            Role::Teknisi => "TNS",
            Role::Pelapor => "PLP",
        }
    }

    /// Landing page after a successful login.
    pub fn home_route(self) -> &'static str {
        match self {
            Role::Admin | Role::Sarpras => "/home",
            Role::Teknisi => "/teknisi",
            Role::Pelapor => "/pelapor",
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => matches!(
                capability,
                ManageMasterData | ManageUsers | AssignRepair | ViewAllReports
            ),
            Role::Sarpras => matches!(capability, ManageMasterData | AssignRepair | ViewAllReports),
            Role::Teknisi => matches!(capability, WorkRepair),
            Role::Pelapor => matches!(capability, SubmitReport | RateRepair),
        }
    }

    /// Like [`Role::can`] but as a `Result`, for use with `?`.
    pub fn require(self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            tracing::warn!(role = %self, %capability, "capability denied");
            Err(FastciliError::Forbidden {
                role: self,
                capability,
            })
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Sarpras => write!(f, "Sarpras"),
            Role::Teknisi => write!(f, "Teknisi"),
            Role::Pelapor => write!(f, "Pelapor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Create, edit or delete buildings, rooms and facilities.
    ManageMasterData,
    ManageUsers,
    AssignRepair,
    /// Start and complete repairs assigned to oneself.
    WorkRepair,
    SubmitReport,
    RateRepair,
    ViewAllReports,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::ManageMasterData => "manage master data",
            Capability::ManageUsers => "manage users",
            Capability::AssignRepair => "assign repairs",
            Capability::WorkRepair => "work on repairs",
            Capability::SubmitReport => "submit reports",
            Capability::RateRepair => "rate repairs",
            Capability::ViewAllReports => "view all reports",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ids_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_level_id(role.level_id()), Some(role));
        }
        assert_eq!(Role::from_level_id(9), None);
    }

    #[test]
    fn home_routes_per_role() {
        assert_eq!(Role::Admin.home_route(), "/home");
        assert_eq!(Role::Sarpras.home_route(), "/home");
        assert_eq!(Role::Teknisi.home_route(), "/teknisi");
        assert_eq!(Role::Pelapor.home_route(), "/pelapor");
    }

    #[test]
    fn teknisi_is_read_only_on_catalog() {
        assert!(!Role::Teknisi.can(Capability::ManageMasterData));
        assert!(!Role::Teknisi.can(Capability::ManageUsers));
        assert!(matches!(
            Role::Teknisi.require(Capability::ManageMasterData),
            Err(FastciliError::Forbidden { role: Role::Teknisi, .. })
        ));
    }

    #[test]
    fn only_staff_assign() {
        assert!(Role::Admin.can(Capability::AssignRepair));
        assert!(Role::Sarpras.can(Capability::AssignRepair));
        assert!(!Role::Teknisi.can(Capability::AssignRepair));
        assert!(!Role::Pelapor.can(Capability::AssignRepair));
    }

    #[test]
    fn only_pelapor_reports_and_rates() {
        for role in Role::ALL {
            let expected = role == Role::Pelapor;
            assert_eq!(role.can(Capability::SubmitReport), expected);
            assert_eq!(role.can(Capability::RateRepair), expected);
        }
    }
}
