use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection};

use super::decode_error;
use crate::error::Result;
use crate::ticket::{Assignment, NewReport, Rating, Report, ReportDetail, Status, StatusChange};

const REPORT_COLUMNS: &str = "id, reporter_id, facility_id, damage_quantity, description, \
     extra_description, photo, status, created_at, updated_at";

fn status_column(row: &SqliteRow, column: &str) -> Result<Status> {
    let raw: String = row.try_get(column)?;
    Status::parse(&raw).ok_or_else(|| decode_error(column, &raw))
}

fn report_from_row(row: &SqliteRow) -> Result<Report> {
    Ok(Report {
        id: row.try_get("id")?,
        reporter_id: row.try_get("reporter_id")?,
        facility_id: row.try_get("facility_id")?,
        damage_quantity: row.try_get("damage_quantity")?,
        description: row.try_get("description")?,
        extra_description: row.try_get("extra_description")?,
        photo: row.try_get("photo")?,
        status: status_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn assignment_from_row(row: &SqliteRow) -> Result<Assignment> {
    Ok(Assignment {
        id: row.try_get("id")?,
        report_id: row.try_get("report_id")?,
        technician_id: row.try_get("technician_id")?,
        notes: row.try_get("notes")?,
        evidence: row.try_get("evidence")?,
        assigned_at: row.try_get("assigned_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn rating_from_row(row: &SqliteRow) -> Result<Rating> {
    Ok(Rating {
        id: row.try_get("id")?,
        report_id: row.try_get("report_id")?,
        reporter_id: row.try_get("reporter_id")?,
        score: row.try_get("score")?,
        feedback: row.try_get("feedback")?,
        created_at: row.try_get("created_at")?,
    })
}

// --- reports ---

pub async fn insert_report<'e, E>(
    exec: E,
    reporter_id: i64,
    input: &NewReport,
    now: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO reports (reporter_id, facility_id, damage_quantity, description,
                             extra_description, photo, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        "#,
    )
    .bind(reporter_id)
    .bind(input.facility_id)
    .bind(input.damage_quantity)
    .bind(input.description.trim())
    .bind(input.extra_description.as_deref())
    .bind(input.photo.as_deref())
    .bind(Status::Submitted.as_str())
    .bind(now)
    .execute(exec)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_report<'e, E>(exec: E, id: i64) -> Result<Option<Report>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"))
        .bind(id)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(report_from_row).transpose()
}

/// Move `id` from `expected` to `next`. Returns false when the row was not in
/// `expected`, which is how a lost race shows up.
pub async fn set_status_if<'e, E>(
    exec: E,
    id: i64,
    expected: Status,
    next: Status,
    now: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result =
        sqlx::query("UPDATE reports SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4")
            .bind(next.as_str())
            .bind(now)
            .bind(id)
            .bind(expected.as_str())
            .execute(exec)
            .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_reports_by_reporter<'e, E>(exec: E, reporter_id: i64) -> Result<Vec<Report>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE reporter_id = ?1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(reporter_id)
    .fetch_all(exec)
    .await?;
    rows.iter().map(report_from_row).collect()
}

pub async fn list_all_reports<'e, E>(exec: E, status: Option<Status>) -> Result<Vec<Report>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE (?1 IS NULL OR status = ?1) \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(status.map(Status::as_str))
    .fetch_all(exec)
    .await?;
    rows.iter().map(report_from_row).collect()
}

/// Per-status totals over all reports. Statuses with no reports are absent.
pub async fn status_counts<'e, E>(exec: E) -> Result<Vec<(Status, i64)>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM reports GROUP BY status")
        .fetch_all(exec)
        .await?;
    rows.iter()
        .map(|row| -> Result<(Status, i64)> {
            Ok((status_column(row, "status")?, row.try_get("n")?))
        })
        .collect()
}

// --- assignments ---

pub async fn insert_assignment<'e, E>(
    exec: E,
    report_id: i64,
    technician_id: i64,
    now: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO assignments (report_id, technician_id, assigned_at) VALUES (?1, ?2, ?3)",
    )
    .bind(report_id)
    .bind(technician_id)
    .bind(now)
    .execute(exec)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_assignment<'e, E>(exec: E, report_id: i64) -> Result<Option<Assignment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, report_id, technician_id, notes, evidence, assigned_at, completed_at
        FROM assignments
        WHERE report_id = ?1
        "#,
    )
    .bind(report_id)
    .fetch_optional(exec)
    .await?;
    row.as_ref().map(assignment_from_row).transpose()
}

pub async fn record_documentation<'e, E>(
    exec: E,
    report_id: i64,
    notes: &str,
    evidence: &str,
    now: DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE assignments SET notes = ?1, evidence = ?2, completed_at = ?3 WHERE report_id = ?4",
    )
    .bind(notes.trim())
    .bind(evidence.trim())
    .bind(now)
    .bind(report_id)
    .execute(exec)
    .await?;
    Ok(())
}

/// A technician's task row, as shown in the repair table.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub report: Report,
    pub assignment: Assignment,
    pub facility_name: String,
    pub room_name: String,
    pub building_name: String,
}

pub async fn list_tasks_for_technician<'e, E>(exec: E, technician_id: i64) -> Result<Vec<TaskRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT rp.id, rp.reporter_id, rp.facility_id, rp.damage_quantity, rp.description,
               rp.extra_description, rp.photo, rp.status, rp.created_at, rp.updated_at,
               a.id AS assignment_id, a.technician_id, a.notes, a.evidence,
               a.assigned_at, a.completed_at,
               f.name AS facility_name, r.name AS room_name, b.name AS building_name
        FROM assignments a
        JOIN reports rp ON rp.id = a.report_id
        JOIN facilities f ON f.id = rp.facility_id
        JOIN rooms r ON r.id = f.room_id
        JOIN buildings b ON b.id = r.building_id
        WHERE a.technician_id = ?1
        ORDER BY a.assigned_at DESC, a.id DESC
        "#,
    )
    .bind(technician_id)
    .fetch_all(exec)
    .await?;

    rows.iter()
        .map(|row| -> Result<TaskRow> {
            let report = report_from_row(row)?;
            let assignment = Assignment {
                id: row.try_get("assignment_id")?,
                report_id: report.id,
                technician_id: row.try_get("technician_id")?,
                notes: row.try_get("notes")?,
                evidence: row.try_get("evidence")?,
                assigned_at: row.try_get("assigned_at")?,
                completed_at: row.try_get("completed_at")?,
            };
            Ok(TaskRow {
                report,
                assignment,
                facility_name: row.try_get("facility_name")?,
                room_name: row.try_get("room_name")?,
                building_name: row.try_get("building_name")?,
            })
        })
        .collect()
}

// --- ratings ---

pub async fn insert_rating<'e, E>(
    exec: E,
    report_id: i64,
    reporter_id: i64,
    score: i64,
    feedback: &str,
    now: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO ratings (report_id, reporter_id, score, feedback, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(report_id)
    .bind(reporter_id)
    .bind(score)
    .bind(feedback.trim())
    .bind(now)
    .execute(exec)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_rating<'e, E>(exec: E, report_id: i64) -> Result<Option<Rating>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, report_id, reporter_id, score, feedback, created_at FROM ratings WHERE report_id = ?1",
    )
    .bind(report_id)
    .fetch_optional(exec)
    .await?;
    row.as_ref().map(rating_from_row).transpose()
}

// --- history ---

pub async fn append_history<'e, E>(
    exec: E,
    report_id: i64,
    from: Option<Status>,
    to: Status,
    actor_id: i64,
    now: DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO status_history (report_id, from_status, to_status, actor_id, changed_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(report_id)
    .bind(from.map(Status::as_str))
    .bind(to.as_str())
    .bind(actor_id)
    .bind(now)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn history<'e, E>(exec: E, report_id: i64) -> Result<Vec<StatusChange>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT from_status, to_status, actor_id, changed_at
        FROM status_history
        WHERE report_id = ?1
        ORDER BY id ASC
        "#,
    )
    .bind(report_id)
    .fetch_all(exec)
    .await?;

    rows.iter()
        .map(|row| -> Result<StatusChange> {
            let from: Option<String> = row.try_get("from_status")?;
            let from = match from {
                Some(raw) => {
                    Some(Status::parse(&raw).ok_or_else(|| decode_error("from_status", &raw))?)
                }
                None => None,
            };
            Ok(StatusChange {
                from,
                to: status_column(row, "to_status")?,
                actor_id: row.try_get("actor_id")?,
                changed_at: row.try_get("changed_at")?,
            })
        })
        .collect()
}

/// Load a report and everything hanging off it in one connection.
pub async fn load_detail(
    conn: &mut SqliteConnection,
    report: Report,
) -> Result<ReportDetail> {
    let assignment = find_assignment(&mut *conn, report.id).await?;
    let rating = find_rating(&mut *conn, report.id).await?;
    let history = history(&mut *conn, report.id).await?;
    Ok(ReportDetail {
        report,
        assignment,
        rating,
        history,
    })
}
