//! Command line interface of fastcili, built on clap.
//!
//! Commands that act on behalf of a user take the global `--email` and
//! `--password` credentials, which can also come from `FASTCILI_EMAIL` and
//! `FASTCILI_PASSWORD`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::access::Role;
use crate::config::DEFAULT_CONFIG_PATH;
use crate::store::catalog::Condition;
use crate::ticket::Status;

/// Facility damage reporting and repair tracking.
#[derive(Debug, Parser)]
#[command(name = "fastcili", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Account email for commands that need a logged in user.
    #[arg(long, global = true, env = "FASTCILI_EMAIL")]
    pub email: Option<String>,

    #[arg(long, global = true, env = "FASTCILI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run migrations and load the demo data.
    Init,

    /// Make sure the test reporter account can log in. Uses `--email`,
    /// defaulting to the seeded test reporter. Only Pelapor accounts are
    /// reset.
    EnsureUser,

    /// Check credentials and print the home route.
    Login,

    /// Change the password of the logged in user.
    Password {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },

    /// Register an account (Admin only).
    User {
        #[arg(long)]
        name: String,
        #[arg(long = "user-email")]
        user_email: String,
        #[arg(long = "user-password")]
        user_password: String,
        #[arg(long, value_enum)]
        role: RoleArg,
    },

    /// Damage reports and repairs.
    #[command(subcommand)]
    Report(ReportCommand),

    /// Buildings (gedung).
    #[command(subcommand)]
    Building(BuildingCommand),

    /// Rooms (ruangan).
    #[command(subcommand)]
    Room(RoomCommand),

    /// Facilities (fasilitas).
    #[command(subcommand)]
    Facility(FacilityCommand),

    /// Role dashboard.
    Dashboard,
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Submit a damage report.
    Create {
        #[arg(long)]
        facility: i64,
        #[arg(long)]
        quantity: i64,
        #[arg(long)]
        description: String,
        #[arg(long)]
        extra: Option<String>,
        /// Reference to the uploaded damage photo.
        #[arg(long)]
        photo: Option<String>,
    },
    /// Reports visible to the logged in user.
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Repairs assigned to the logged in technician.
    Tasks,
    /// Technicians available for assignment.
    Technicians,
    /// A report with its assignment, rating and history.
    Show { id: i64 },
    Assign {
        id: i64,
        #[arg(long)]
        technician: i64,
    },
    Start { id: i64 },
    Complete {
        id: i64,
        #[command(flatten)]
        doc: DocumentationArgs,
    },
    /// Replace the documentation of a completed repair.
    Revise {
        id: i64,
        #[command(flatten)]
        doc: DocumentationArgs,
    },
    Rate {
        id: i64,
        #[arg(long)]
        score: i64,
        #[arg(long)]
        feedback: String,
    },
}

#[derive(Debug, Args)]
pub struct DocumentationArgs {
    /// Technician notes (catatan teknisi).
    #[arg(long)]
    pub notes: String,
    /// Reference to the repair evidence photo.
    #[arg(long)]
    pub evidence: String,
}

/// Search and cascading filters shared by the catalog listings.
#[derive(Debug, Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub building: Option<i64>,
    #[arg(long)]
    pub room: Option<i64>,
    #[arg(long, value_enum)]
    pub condition: Option<ConditionArg>,
}

#[derive(Debug, Subcommand)]
pub enum BuildingCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Remove { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum RoomCommand {
    List {
        #[arg(long)]
        building: Option<i64>,
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        building: i64,
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: String,
    },
    Remove { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum FacilityCommand {
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    Add {
        #[arg(long)]
        room: i64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
        #[arg(long, value_enum, default_value_t = ConditionArg::Baik)]
        condition: ConditionArg,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: i64,
        #[arg(long, value_enum)]
        condition: ConditionArg,
    },
    /// Mark a facility good or broken.
    Mark {
        id: i64,
        #[arg(value_enum)]
        condition: ConditionArg,
    },
    Remove { id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Admin,
    Sarpras,
    Teknisi,
    Pelapor,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Role::Admin,
            RoleArg::Sarpras => Role::Sarpras,
            RoleArg::Teknisi => Role::Teknisi,
            RoleArg::Pelapor => Role::Pelapor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Submitted,
    Assigned,
    InProgress,
    Completed,
    Rated,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Submitted => Status::Submitted,
            StatusArg::Assigned => Status::Assigned,
            StatusArg::InProgress => Status::InProgress,
            StatusArg::Completed => Status::Completed,
            StatusArg::Rated => Status::Rated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConditionArg {
    Baik,
    Rusak,
}

impl From<ConditionArg> for Condition {
    fn from(arg: ConditionArg) -> Self {
        match arg {
            ConditionArg::Baik => Condition::Baik,
            ConditionArg::Rusak => Condition::Rusak,
        }
    }
}

impl Command {
    /// Short name used to tag the request span.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init => "init",
            Command::EnsureUser => "ensure-user",
            Command::Login => "login",
            Command::Password { .. } => "password",
            Command::User { .. } => "user",
            Command::Report(_) => "report",
            Command::Building(_) => "building",
            Command::Room(_) => "room",
            Command::Facility(_) => "facility",
            Command::Dashboard => "dashboard",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_report_create() {
        let cli = Cli::parse_from([
            "fastcili",
            "report",
            "create",
            "--facility",
            "3",
            "--quantity",
            "2",
            "--description",
            "Proyektor mati",
        ]);
        match cli.command {
            Command::Report(ReportCommand::Create {
                facility,
                quantity,
                description,
                extra,
                photo,
            }) => {
                assert_eq!(facility, 3);
                assert_eq!(quantity, 2);
                assert_eq!(description, "Proyektor mati");
                assert!(extra.is_none());
                assert!(photo.is_none());
            }
            other => panic!("expected report create, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "fastcili",
            "--config",
            "/etc/fastcili.toml",
            "--email",
            "admin@jti.com",
            "--password",
            "password",
            "--verbose",
            "dashboard",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("/etc/fastcili.toml"));
        assert_eq!(cli.email.as_deref(), Some("admin@jti.com"));
        assert!(matches!(cli.command, Command::Dashboard));
    }

    #[test]
    fn cli_parses_completion_documentation() {
        let cli = Cli::parse_from([
            "fastcili",
            "report",
            "complete",
            "7",
            "--notes",
            "Kabel diganti",
            "--evidence",
            "bukti.jpg",
        ]);
        match cli.command {
            Command::Report(ReportCommand::Complete { id, doc }) => {
                assert_eq!(id, 7);
                assert_eq!(doc.notes, "Kabel diganti");
                assert_eq!(doc.evidence, "bukti.jpg");
            }
            other => panic!("expected report complete, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_facility_filters() {
        let cli = Cli::parse_from([
            "fastcili",
            "facility",
            "list",
            "--building",
            "1",
            "--room",
            "2",
            "--condition",
            "rusak",
        ]);
        match cli.command {
            Command::Facility(FacilityCommand::List { filter }) => {
                assert_eq!(filter.building, Some(1));
                assert_eq!(filter.room, Some(2));
                assert_eq!(filter.condition.map(Condition::from), Some(Condition::Rusak));
            }
            other => panic!("expected facility list, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_status_filter() {
        let cli = Cli::parse_from(["fastcili", "report", "list", "--status", "in-progress"]);
        match cli.command {
            Command::Report(ReportCommand::List { status }) => {
                assert_eq!(status.map(Status::from), Some(Status::InProgress));
            }
            other => panic!("expected report list, got {other:?}"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
