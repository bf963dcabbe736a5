//! Buildings (gedung), rooms (ruangan) and facilities (fasilitas).

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::decode_error;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Building {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub id: i64,
    pub building_id: i64,
    pub code: String,
    pub name: String,
    pub building_name: String,
}

/// Physical condition of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Baik,
    Rusak,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Baik => "baik",
            Condition::Rusak => "rusak",
        }
    }

    pub fn parse(s: &str) -> Option<Condition> {
        match s.to_lowercase().as_str() {
            "baik" => Some(Condition::Baik),
            "rusak" => Some(Condition::Rusak),
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Condition::Baik => "Baik",
            Condition::Rusak => "Rusak",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub id: i64,
    pub room_id: i64,
    pub name: String,
    pub quantity: i64,
    pub condition: Condition,
    pub room_name: String,
    pub building_id: i64,
    pub building_name: String,
}

/// Narrowing applied to catalog listings. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub search: Option<String>,
    pub building_id: Option<i64>,
    pub room_id: Option<i64>,
    pub condition: Option<Condition>,
}

impl CatalogFilter {
    /// Trimmed search text with `LIKE` wildcards escaped, so `%` and `_`
    /// match themselves. Pair with `ESCAPE '\'`.
    fn search(&self) -> Option<String> {
        let text = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        Some(escaped)
    }
}

fn building_from_row(row: &SqliteRow) -> Result<Building> {
    Ok(Building {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    })
}

fn room_from_row(row: &SqliteRow) -> Result<Room> {
    Ok(Room {
        id: row.try_get("id")?,
        building_id: row.try_get("building_id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        building_name: row.try_get("building_name")?,
    })
}

fn facility_from_row(row: &SqliteRow) -> Result<Facility> {
    let condition: String = row.try_get("condition")?;
    Ok(Facility {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        condition: Condition::parse(&condition)
            .ok_or_else(|| decode_error("condition", &condition))?,
        room_name: row.try_get("room_name")?,
        building_id: row.try_get("building_id")?,
        building_name: row.try_get("building_name")?,
    })
}

// --- buildings ---

pub async fn insert_building<'e, E>(
    exec: E,
    code: &str,
    name: &str,
    description: Option<&str>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result =
        sqlx::query("INSERT INTO buildings (code, name, description) VALUES (?1, ?2, ?3)")
            .bind(code)
            .bind(name)
            .bind(description)
            .execute(exec)
            .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_building<'e, E>(exec: E, id: i64) -> Result<Option<Building>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, code, name, description FROM buildings WHERE id = ?1")
        .bind(id)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(building_from_row).transpose()
}

pub async fn find_building_by_code<'e, E>(exec: E, code: &str) -> Result<Option<Building>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, code, name, description FROM buildings WHERE code = ?1")
        .bind(code)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(building_from_row).transpose()
}

pub async fn list_buildings<'e, E>(exec: E, filter: &CatalogFilter) -> Result<Vec<Building>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, code, name, description
        FROM buildings
        WHERE (?1 IS NULL OR lower(name) LIKE '%' || lower(?1) || '%' ESCAPE '\'
                          OR lower(code) LIKE '%' || lower(?1) || '%' ESCAPE '\')
        ORDER BY code ASC
        "#,
    )
    .bind(filter.search())
    .fetch_all(exec)
    .await?;
    rows.iter().map(building_from_row).collect()
}

pub async fn update_building<'e, E>(
    exec: E,
    id: i64,
    name: &str,
    description: Option<&str>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE buildings SET name = ?1, description = ?2 WHERE id = ?3")
        .bind(name)
        .bind(description)
        .bind(id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_building<'e, E>(exec: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM buildings WHERE id = ?1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn count_rooms_in_building<'e, E>(exec: E, building_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT COUNT(*) AS n FROM rooms WHERE building_id = ?1")
        .bind(building_id)
        .fetch_one(exec)
        .await?;
    Ok(row.try_get("n")?)
}

// --- rooms ---

const ROOM_SELECT: &str = r#"
    SELECT r.id, r.building_id, r.code, r.name, b.name AS building_name
    FROM rooms r
    JOIN buildings b ON b.id = r.building_id
"#;

pub async fn insert_room<'e, E>(exec: E, building_id: i64, code: &str, name: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO rooms (building_id, code, name) VALUES (?1, ?2, ?3)")
        .bind(building_id)
        .bind(code)
        .bind(name)
        .execute(exec)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_room<'e, E>(exec: E, id: i64) -> Result<Option<Room>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("{ROOM_SELECT} WHERE r.id = ?1"))
        .bind(id)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(room_from_row).transpose()
}

pub async fn find_room_by_code<'e, E>(exec: E, code: &str) -> Result<Option<Room>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("{ROOM_SELECT} WHERE r.code = ?1"))
        .bind(code)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(room_from_row).transpose()
}

pub async fn list_rooms<'e, E>(exec: E, filter: &CatalogFilter) -> Result<Vec<Room>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        r#"{ROOM_SELECT}
        WHERE (?1 IS NULL OR r.building_id = ?1)
          AND (?2 IS NULL OR lower(r.name) LIKE '%' || lower(?2) || '%' ESCAPE '\'
                          OR lower(r.code) LIKE '%' || lower(?2) || '%' ESCAPE '\')
        ORDER BY r.code ASC
        "#
    ))
    .bind(filter.building_id)
    .bind(filter.search())
    .fetch_all(exec)
    .await?;
    rows.iter().map(room_from_row).collect()
}

pub async fn update_room<'e, E>(exec: E, id: i64, name: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE rooms SET name = ?1 WHERE id = ?2")
        .bind(name)
        .bind(id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_room<'e, E>(exec: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM rooms WHERE id = ?1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn count_facilities_in_room<'e, E>(exec: E, room_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT COUNT(*) AS n FROM facilities WHERE room_id = ?1")
        .bind(room_id)
        .fetch_one(exec)
        .await?;
    Ok(row.try_get("n")?)
}

// --- facilities ---

const FACILITY_SELECT: &str = r#"
    SELECT f.id, f.room_id, f.name, f.quantity, f.condition,
           r.name AS room_name, r.building_id, b.name AS building_name
    FROM facilities f
    JOIN rooms r ON r.id = f.room_id
    JOIN buildings b ON b.id = r.building_id
"#;

pub async fn insert_facility<'e, E>(
    exec: E,
    room_id: i64,
    name: &str,
    quantity: i64,
    condition: Condition,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO facilities (room_id, name, quantity, condition) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(room_id)
    .bind(name)
    .bind(quantity)
    .bind(condition.as_str())
    .execute(exec)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_facility<'e, E>(exec: E, id: i64) -> Result<Option<Facility>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("{FACILITY_SELECT} WHERE f.id = ?1"))
        .bind(id)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(facility_from_row).transpose()
}

pub async fn find_facility_in_room<'e, E>(exec: E, room_id: i64, name: &str) -> Result<Option<Facility>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("{FACILITY_SELECT} WHERE f.room_id = ?1 AND f.name = ?2"))
        .bind(room_id)
        .bind(name)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(facility_from_row).transpose()
}

pub async fn list_facilities<'e, E>(exec: E, filter: &CatalogFilter) -> Result<Vec<Facility>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        r#"{FACILITY_SELECT}
        WHERE (?1 IS NULL OR r.building_id = ?1)
          AND (?2 IS NULL OR f.room_id = ?2)
          AND (?3 IS NULL OR f.condition = ?3)
          AND (?4 IS NULL OR lower(f.name) LIKE '%' || lower(?4) || '%' ESCAPE '\')
        ORDER BY b.code ASC, r.code ASC, f.name ASC
        "#
    ))
    .bind(filter.building_id)
    .bind(filter.room_id)
    .bind(filter.condition.map(Condition::as_str))
    .bind(filter.search())
    .fetch_all(exec)
    .await?;
    rows.iter().map(facility_from_row).collect()
}

pub async fn update_facility<'e, E>(
    exec: E,
    id: i64,
    name: &str,
    quantity: i64,
    condition: Condition,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE facilities SET name = ?1, quantity = ?2, condition = ?3 WHERE id = ?4",
    )
    .bind(name)
    .bind(quantity)
    .bind(condition.as_str())
    .bind(id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_facility_condition<'e, E>(exec: E, id: i64, condition: Condition) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE facilities SET condition = ?1 WHERE id = ?2")
        .bind(condition.as_str())
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn delete_facility<'e, E>(exec: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM facilities WHERE id = ?1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn count_reports_for_facility<'e, E>(exec: E, facility_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT COUNT(*) AS n FROM reports WHERE facility_id = ?1")
        .bind(facility_id)
        .fetch_one(exec)
        .await?;
    Ok(row.try_get("n")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_parse_is_case_insensitive() {
        assert_eq!(Condition::parse("Baik"), Some(Condition::Baik));
        assert_eq!(Condition::parse("RUSAK"), Some(Condition::Rusak));
        assert_eq!(Condition::parse("hilang"), None);
    }

    #[test]
    fn blank_search_does_not_filter() {
        let filter = CatalogFilter {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(filter.search(), None);

        let filter = CatalogFilter {
            search: Some(" proyektor ".into()),
            ..Default::default()
        };
        assert_eq!(filter.search().as_deref(), Some("proyektor"));
    }

    #[test]
    fn search_escapes_like_wildcards() {
        let filter = CatalogFilter {
            search: Some(r"50%_off\".into()),
            ..Default::default()
        };
        assert_eq!(filter.search().as_deref(), Some(r"50\%\_off\\"));
    }
}
