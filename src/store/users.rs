use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection};

use super::decode_error;
use crate::access::Role;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, level_id, created_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let level_id: i64 = row.try_get("level_id")?;
    let role =
        Role::from_level_id(level_id).ok_or_else(|| decode_error("level_id", &level_id.to_string()))?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert any missing level rows. Existing rows are left alone.
pub async fn ensure_levels(conn: &mut SqliteConnection) -> Result<()> {
    for role in Role::ALL {
        sqlx::query("INSERT OR IGNORE INTO levels (id, code, name) VALUES (?1, ?2, ?3)")
            .bind(role.level_id())
            .bind(role.code())
            .bind(role.to_string())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn level_exists<'e, E>(exec: E, role: Role) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT COUNT(*) AS n FROM levels WHERE id = ?1")
        .bind(role.level_id())
        .fetch_one(exec)
        .await?;
    let n: i64 = row.try_get("n")?;
    Ok(n > 0)
}

pub async fn insert_user<'e, E>(
    exec: E,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, level_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.level_id())
    .bind(Utc::now())
    .execute(exec)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_user<'e, E>(exec: E, id: i64) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(id)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

/// Email lookup is case-insensitive.
pub async fn find_user_by_email<'e, E>(exec: E, email: &str) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)"
    ))
    .bind(email.trim())
    .fetch_optional(exec)
    .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn list_users_by_role<'e, E>(exec: E, role: Role) -> Result<Vec<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE level_id = ?1 ORDER BY name ASC"
    ))
    .bind(role.level_id())
    .fetch_all(exec)
    .await?;
    rows.iter().map(user_from_row).collect()
}

pub async fn update_password<'e, E>(exec: E, id: i64, password_hash: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
        .bind(password_hash)
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}
