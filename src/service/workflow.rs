//! The repair ticket workflow: file, assign, start, complete, rate.
//!
//! Every operation is a single transaction. The state check, the side-effect
//! row and the history entry commit together or not at all.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::access::{Capability, Role};
use crate::error::{FastciliError, Result};
use crate::store::{self, catalog};
use crate::store::reports::{self, TaskRow};
use crate::store::users::{self, User};
use crate::ticket::{
    Action, Assignment, Lifecycle, NewReport, Rating, RepairDocumentation, Report, ReportDetail,
    Status, validate_rating,
};

pub struct TicketService {
    pool: SqlitePool,
}

async fn load_report(conn: &mut SqliteConnection, id: i64) -> Result<Report> {
    reports::find_report(&mut *conn, id)
        .await?
        .ok_or_else(|| FastciliError::not_found("report", id))
}

/// The caller must be the technician the report is assigned to.
async fn load_own_assignment(
    conn: &mut SqliteConnection,
    report_id: i64,
    technician: &User,
) -> Result<Assignment> {
    match reports::find_assignment(&mut *conn, report_id).await? {
        Some(a) if a.technician_id == technician.id => Ok(a),
        _ => Err(FastciliError::NotOwner {
            entity: "report",
            id: report_id,
        }),
    }
}

/// Apply `from -> to` on `report_id`, failing if someone else moved it first.
async fn advance(
    conn: &mut SqliteConnection,
    report_id: i64,
    from: Status,
    to: Status,
    actor: &User,
    action: Action,
) -> Result<()> {
    let now = Utc::now();
    if !reports::set_status_if(&mut *conn, report_id, from, to, now).await? {
        let current = load_report(conn, report_id).await?.status;
        warn!(report_id, %current, %action, "report moved concurrently");
        return Err(FastciliError::InvalidTransition {
            from: current,
            action,
        });
    }
    reports::append_history(&mut *conn, report_id, Some(from), to, actor.id, now).await?;
    info!(report_id, from = %from, to = %to, actor = actor.id, "report transition");
    Ok(())
}

fn log_rejected(report_id: i64, action: Action, actor: &User, err: &FastciliError) {
    warn!(report_id, %action, actor = actor.id, error = %err, "transition rejected");
}

impl TicketService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// File a new report as a Pelapor.
    pub async fn submit(&self, actor: &User, input: NewReport) -> Result<Report> {
        let status = Lifecycle::next(None, Action::Submit, actor.role)?;
        input.validate()?;

        let mut tx = store::begin_write(&self.pool).await?;
        if catalog::find_facility(&mut *tx, input.facility_id).await?.is_none() {
            return Err(FastciliError::validation(
                "id_fasilitas",
                format!("facility {} does not exist", input.facility_id),
            ));
        }

        let now = Utc::now();
        let id = reports::insert_report(&mut *tx, actor.id, &input, now).await?;
        reports::append_history(&mut *tx, id, None, status, actor.id, now).await?;
        let report = load_report(&mut tx, id).await?;
        tx.commit().await?;

        info!(report_id = id, reporter = actor.id, facility = input.facility_id, "report submitted");
        Ok(report)
    }

    /// Hand a submitted report to a technician.
    ///
    /// A report is assigned at most once; a second assigner loses with
    /// `InvalidTransition` and the first assignment stands.
    pub async fn assign(&self, actor: &User, report_id: i64, technician_id: i64) -> Result<Assignment> {
        let mut tx = store::begin_write(&self.pool).await?;
        let report = load_report(&mut tx, report_id).await?;
        let next = Lifecycle::next(Some(report.status), Action::Assign, actor.role)
            .inspect_err(|e| log_rejected(report_id, Action::Assign, actor, e))?;

        let technician = users::find_user(&mut *tx, technician_id)
            .await?
            .ok_or_else(|| FastciliError::not_found("technician", technician_id))?;
        if technician.role != Role::Teknisi {
            return Err(FastciliError::validation(
                "id_teknisi",
                format!("{} is not a technician", technician.email),
            ));
        }

        advance(&mut tx, report_id, report.status, next, actor, Action::Assign).await?;
        reports::insert_assignment(&mut *tx, report_id, technician.id, Utc::now()).await?;
        let assignment = reports::find_assignment(&mut *tx, report_id)
            .await?
            .ok_or_else(|| FastciliError::not_found("assignment", report_id))?;
        tx.commit().await?;

        info!(report_id, technician = technician.id, "report assigned");
        Ok(assignment)
    }

    /// Technician picks up an assigned repair.
    pub async fn start(&self, actor: &User, report_id: i64) -> Result<Report> {
        let mut tx = store::begin_write(&self.pool).await?;
        let report = load_report(&mut tx, report_id).await?;
        let next = Lifecycle::next(Some(report.status), Action::Start, actor.role)
            .inspect_err(|e| log_rejected(report_id, Action::Start, actor, e))?;
        load_own_assignment(&mut tx, report_id, actor).await?;

        advance(&mut tx, report_id, report.status, next, actor, Action::Start).await?;
        let report = load_report(&mut tx, report_id).await?;
        tx.commit().await?;
        Ok(report)
    }

    /// Close a repair with notes and evidence.
    pub async fn complete(
        &self,
        actor: &User,
        report_id: i64,
        doc: RepairDocumentation,
    ) -> Result<Assignment> {
        let mut tx = store::begin_write(&self.pool).await?;
        let report = load_report(&mut tx, report_id).await?;
        let next = Lifecycle::next(Some(report.status), Action::Complete, actor.role)
            .inspect_err(|e| log_rejected(report_id, Action::Complete, actor, e))?;
        load_own_assignment(&mut tx, report_id, actor).await?;
        doc.validate()?;

        advance(&mut tx, report_id, report.status, next, actor, Action::Complete).await?;
        reports::record_documentation(&mut *tx, report_id, &doc.notes, &doc.evidence, Utc::now())
            .await?;
        let assignment = load_own_assignment(&mut tx, report_id, actor).await?;
        tx.commit().await?;
        Ok(assignment)
    }

    /// Replace the documentation of a completed, not yet rated repair.
    /// The status does not change.
    pub async fn revise(
        &self,
        actor: &User,
        report_id: i64,
        doc: RepairDocumentation,
    ) -> Result<Assignment> {
        let mut tx = store::begin_write(&self.pool).await?;
        let report = load_report(&mut tx, report_id).await?;
        Lifecycle::next(Some(report.status), Action::Revise, actor.role)
            .inspect_err(|e| log_rejected(report_id, Action::Revise, actor, e))?;
        load_own_assignment(&mut tx, report_id, actor).await?;
        doc.validate()?;

        reports::record_documentation(&mut *tx, report_id, &doc.notes, &doc.evidence, Utc::now())
            .await?;
        let assignment = load_own_assignment(&mut tx, report_id, actor).await?;
        tx.commit().await?;

        info!(report_id, actor = actor.id, "repair documentation revised");
        Ok(assignment)
    }

    /// The original reporter rates a completed repair, once.
    pub async fn rate(
        &self,
        actor: &User,
        report_id: i64,
        score: i64,
        feedback: &str,
    ) -> Result<Rating> {
        let mut tx = store::begin_write(&self.pool).await?;
        let report = load_report(&mut tx, report_id).await?;
        let next = Lifecycle::next(Some(report.status), Action::Rate, actor.role)
            .inspect_err(|e| log_rejected(report_id, Action::Rate, actor, e))?;
        if report.reporter_id != actor.id {
            return Err(FastciliError::NotOwner {
                entity: "report",
                id: report_id,
            });
        }
        validate_rating(score, feedback)?;

        advance(&mut tx, report_id, report.status, next, actor, Action::Rate).await?;
        reports::insert_rating(&mut *tx, report_id, actor.id, score, feedback, Utc::now()).await?;
        let rating = reports::find_rating(&mut *tx, report_id)
            .await?
            .ok_or_else(|| FastciliError::not_found("rating", report_id))?;
        tx.commit().await?;
        Ok(rating)
    }

    /// A report with its assignment, rating and history.
    ///
    /// Staff see everything, a Pelapor only their own reports, a Teknisi only
    /// reports assigned to them.
    pub async fn detail(&self, actor: &User, report_id: i64) -> Result<ReportDetail> {
        let mut conn = self.pool.acquire().await?;
        let report = load_report(&mut conn, report_id).await?;
        let detail = reports::load_detail(&mut conn, report).await?;

        let visible = actor.role.can(Capability::ViewAllReports)
            || detail.report.reporter_id == actor.id
            || detail
                .assignment
                .as_ref()
                .is_some_and(|a| a.technician_id == actor.id);
        if !visible {
            return Err(FastciliError::NotOwner {
                entity: "report",
                id: report_id,
            });
        }
        Ok(detail)
    }

    /// Reports visible in the caller's report list: everything for staff,
    /// assigned reports for a Teknisi, own reports for a Pelapor.
    pub async fn reports_for(&self, actor: &User, status: Option<Status>) -> Result<Vec<Report>> {
        if actor.role.can(Capability::ViewAllReports) {
            return reports::list_all_reports(&self.pool, status).await;
        }
        let mine: Vec<Report> = if actor.role.can(Capability::WorkRepair) {
            reports::list_tasks_for_technician(&self.pool, actor.id)
                .await?
                .into_iter()
                .map(|task| task.report)
                .collect()
        } else {
            actor.role.require(Capability::SubmitReport)?;
            reports::list_reports_by_reporter(&self.pool, actor.id).await?
        };
        Ok(mine
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect())
    }

    /// Accounts a report can be assigned to.
    pub async fn technicians(&self, actor: &User) -> Result<Vec<User>> {
        actor.role.require(Capability::AssignRepair)?;
        users::list_users_by_role(&self.pool, Role::Teknisi).await
    }

    /// The technician's repair table.
    pub async fn tasks_for(&self, actor: &User) -> Result<Vec<TaskRow>> {
        actor.role.require(Capability::WorkRepair)?;
        reports::list_tasks_for_technician(&self.pool, actor.id).await
    }
}
