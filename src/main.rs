mod access;
mod cli;
mod config;
mod error;
mod seed;
mod service;
mod store;
mod telemetry;
mod ticket;
mod ui;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::SqlitePool;
use tracing::Instrument;

use cli::{
    BuildingCommand, Cli, Command, FacilityCommand, FilterArgs, ReportCommand, RoomCommand,
};
use config::FastciliConfig;
use error::FastciliError;
use service::auth::AuthService;
use service::catalog::CatalogService;
use service::dashboard::DashboardService;
use service::workflow::TicketService;
use store::catalog::CatalogFilter;
use store::users::User;
use ticket::{MAX_SCORE, NewReport, RepairDocumentation};
use ui::Terminal;

/// `--email` / `--password` as given on the command line.
struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn pair(&self) -> Result<(&str, &str)> {
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| FastciliError::validation("email", "required for this command"))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| FastciliError::validation("password", "required for this command"))?;
        Ok((email, password))
    }

    async fn login(&self, auth: &AuthService) -> Result<User> {
        let (email, password) = self.pair()?;
        Ok(auth.login(email, password).await?.user)
    }
}

impl From<FilterArgs> for CatalogFilter {
    fn from(args: FilterArgs) -> Self {
        CatalogFilter {
            search: args.search,
            building_id: args.building,
            room_id: args.room,
            condition: args.condition.map(Into::into),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let term = Terminal::default();

    match run(cli, &term).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            term.failure(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, term: &Terminal) -> Result<()> {
    let config = FastciliConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    telemetry::init_tracing(&config.log_level, cli.verbose);

    let span = telemetry::request_span(cli.command.name());
    async move {
        let pool = store::connect(&config.database_url, config.auto_migrate)
            .await
            .context("Failed to open database")?;
        let credentials = Credentials {
            email: cli.email,
            password: cli.password,
        };
        dispatch(cli.command, &credentials, &config, pool, term).await
    }
    .instrument(span)
    .await
}

async fn dispatch(
    command: Command,
    credentials: &Credentials,
    config: &FastciliConfig,
    pool: SqlitePool,
    term: &Terminal,
) -> Result<()> {
    let auth = AuthService::new(pool.clone(), config.min_password_length);

    match command {
        Command::Init => {
            if !config.auto_migrate {
                store::migrate(&pool).await?;
            }
            let summary = seed::seed(&pool).await?;
            term.success("database ready");
            term.print_json(&summary);
        }

        Command::EnsureUser => {
            let email = credentials
                .email
                .as_deref()
                .unwrap_or(seed::TEST_REPORTER_EMAIL);
            let outcome = seed::ensure_reporter(&pool, email).await?;
            let action = if outcome.user_created {
                "created"
            } else {
                "reset"
            };
            term.success(&format!(
                "{} {action}, password '{}'",
                outcome.user.email,
                seed::DEFAULT_PASSWORD
            ));
            term.print_json(&outcome);
        }

        Command::Login => {
            let (email, password) = credentials.pair()?;
            let outcome = auth.login(email, password).await?;
            term.success(&format!(
                "{} ({}) → {}",
                outcome.user.name, outcome.user.role, outcome.home_route
            ));
        }

        Command::Password { old, new, confirm } => {
            let user = credentials.login(&auth).await?;
            auth.change_password(user.id, &old, &new, &confirm).await?;
            term.success("password changed");
        }

        Command::User {
            name,
            user_email,
            user_password,
            role,
        } => {
            let actor = credentials.login(&auth).await?;
            let user = auth
                .create_user(&actor, &name, &user_email, &user_password, role.into())
                .await?;
            term.success(&format!("user {} created", user.id));
            term.print_json(&user);
        }

        Command::Report(cmd) => {
            let actor = credentials.login(&auth).await?;
            report(cmd, &actor, TicketService::new(pool), term).await?;
        }

        Command::Building(cmd) => {
            let actor = credentials.login(&auth).await?;
            let catalog = CatalogService::new(pool);
            match cmd {
                BuildingCommand::List { search } => {
                    let filter = CatalogFilter {
                        search,
                        ..Default::default()
                    };
                    term.print_buildings(&catalog.buildings(&filter).await?);
                }
                BuildingCommand::Add {
                    code,
                    name,
                    description,
                } => {
                    let building = catalog
                        .add_building(&actor, &code, &name, description.as_deref())
                        .await?;
                    term.success(&format!("building {} added", building.id));
                }
                BuildingCommand::Update {
                    id,
                    name,
                    description,
                } => {
                    catalog
                        .update_building(&actor, id, &name, description.as_deref())
                        .await?;
                    term.success(&format!("building {id} updated"));
                }
                BuildingCommand::Remove { id } => {
                    catalog.remove_building(&actor, id).await?;
                    term.success(&format!("building {id} removed"));
                }
            }
        }

        Command::Room(cmd) => {
            let actor = credentials.login(&auth).await?;
            let catalog = CatalogService::new(pool);
            match cmd {
                RoomCommand::List { building, search } => {
                    let filter = CatalogFilter {
                        search,
                        building_id: building,
                        ..Default::default()
                    };
                    term.print_rooms(&catalog.rooms(&filter).await?);
                }
                RoomCommand::Add {
                    building,
                    code,
                    name,
                } => {
                    let room = catalog.add_room(&actor, building, &code, &name).await?;
                    term.success(&format!("room {} added", room.id));
                }
                RoomCommand::Update { id, name } => {
                    catalog.update_room(&actor, id, &name).await?;
                    term.success(&format!("room {id} updated"));
                }
                RoomCommand::Remove { id } => {
                    catalog.remove_room(&actor, id).await?;
                    term.success(&format!("room {id} removed"));
                }
            }
        }

        Command::Facility(cmd) => {
            let actor = credentials.login(&auth).await?;
            let catalog = CatalogService::new(pool);
            match cmd {
                FacilityCommand::List { filter } => {
                    term.print_facilities(&catalog.facilities(&filter.into()).await?);
                }
                FacilityCommand::Add {
                    room,
                    name,
                    quantity,
                    condition,
                } => {
                    let facility = catalog
                        .add_facility(&actor, room, &name, quantity, condition.into())
                        .await?;
                    term.success(&format!("facility {} added", facility.id));
                }
                FacilityCommand::Update {
                    id,
                    name,
                    quantity,
                    condition,
                } => {
                    catalog
                        .update_facility(&actor, id, &name, quantity, condition.into())
                        .await?;
                    term.success(&format!("facility {id} updated"));
                }
                FacilityCommand::Mark { id, condition } => {
                    let facility = catalog.set_condition(&actor, id, condition.into()).await?;
                    term.success(&format!("facility {id} is now {}", facility.condition));
                }
                FacilityCommand::Remove { id } => {
                    catalog.remove_facility(&actor, id).await?;
                    term.success(&format!("facility {id} removed"));
                }
            }
        }

        Command::Dashboard => {
            let actor = credentials.login(&auth).await?;
            let dashboard = DashboardService::new(pool).for_user(&actor).await?;
            term.print_dashboard(&dashboard);
        }
    }

    Ok(())
}

async fn report(
    cmd: ReportCommand,
    actor: &User,
    tickets: TicketService,
    term: &Terminal,
) -> Result<()> {
    match cmd {
        ReportCommand::Create {
            facility,
            quantity,
            description,
            extra,
            photo,
        } => {
            let report = tickets
                .submit(
                    actor,
                    NewReport {
                        facility_id: facility,
                        damage_quantity: quantity,
                        description,
                        extra_description: extra,
                        photo,
                    },
                )
                .await?;
            term.success(&format!("report {} submitted", report.id));
        }
        ReportCommand::List { status } => {
            let reports = tickets.reports_for(actor, status.map(Into::into)).await?;
            term.print_reports(&reports);
        }
        ReportCommand::Tasks => {
            term.print_tasks(&tickets.tasks_for(actor).await?);
        }
        ReportCommand::Technicians => {
            term.print_users(&tickets.technicians(actor).await?);
        }
        ReportCommand::Show { id } => {
            let detail = tickets.detail(actor, id).await?;
            term.print_json(&detail);
        }
        ReportCommand::Assign { id, technician } => {
            tickets.assign(actor, id, technician).await?;
            term.success(&format!("report {id} assigned to technician {technician}"));
        }
        ReportCommand::Start { id } => {
            tickets.start(actor, id).await?;
            term.success(&format!("repair {id} started"));
        }
        ReportCommand::Complete { id, doc } => {
            tickets
                .complete(actor, id, RepairDocumentation::new(doc.notes, doc.evidence))
                .await?;
            term.success(&format!("repair {id} completed"));
        }
        ReportCommand::Revise { id, doc } => {
            tickets
                .revise(actor, id, RepairDocumentation::new(doc.notes, doc.evidence))
                .await?;
            term.success(&format!("documentation of repair {id} updated"));
        }
        ReportCommand::Rate {
            id,
            score,
            feedback,
        } => {
            tickets.rate(actor, id, score, &feedback).await?;
            term.success(&format!("report {id} rated {score}/{MAX_SCORE}"));
        }
    }
    Ok(())
}
