//! Demo data and the test-account maintenance routine.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::access::Role;
use crate::error::{FastciliError, Result};
use crate::service::auth::hash_password;
use crate::store;
use crate::store::catalog::{self, Condition};
use crate::store::users::{self, User};

pub const DEFAULT_PASSWORD: &str = "password";

/// Account checked by `ensure-user` when no email is given.
pub const TEST_REPORTER_EMAIL: &str = "pelapor@jti.com";

/// (name, email, role) of the accounts created by [`seed`].
pub const DEMO_USERS: &[(&str, &str, Role)] = &[
    ("Administrator", "admin@jti.com", Role::Admin),
    ("Staf Sarpras", "sarpras@jti.com", Role::Sarpras),
    ("Rendi Saputra", "rendi.saputra@jti.com", Role::Teknisi),
    ("Teknisi Test", "teknisi@jti.com", Role::Teknisi),
    ("Yefta Octa", "yefta.octa@jti.com", Role::Pelapor),
    ("Pelapor Test", "pelapor@jti.com", Role::Pelapor),
];

const DEMO_BUILDINGS: &[(&str, &str, &str)] = &[
    ("GD-TI", "Gedung Teknologi Informasi", "Gedung utama jurusan TI"),
    ("GD-SP", "Gedung Sipil", "Gedung bersama lantai 1-7"),
];

/// (building code, room code, room name)
const DEMO_ROOMS: &[(&str, &str, &str)] = &[
    ("GD-TI", "LPR-1", "Laboratorium Pemrograman 1"),
    ("GD-TI", "RT-5", "Ruang Teori 5"),
    ("GD-SP", "AUD", "Auditorium"),
];

/// (room code, facility name, quantity)
const DEMO_FACILITIES: &[(&str, &str, i64)] = &[
    ("LPR-1", "Komputer", 30),
    ("LPR-1", "AC", 2),
    ("RT-5", "Proyektor", 1),
    ("RT-5", "Kursi", 40),
    ("AUD", "Sound System", 1),
];

#[derive(Debug, Default, Serialize)]
pub struct SeedSummary {
    pub users_created: usize,
    pub buildings_created: usize,
    pub rooms_created: usize,
    pub facilities_created: usize,
}

/// Load levels, demo accounts and a small location catalog.
///
/// Idempotent: rows that already exist are left untouched.
pub async fn seed(pool: &SqlitePool) -> Result<SeedSummary> {
    let mut tx = store::begin_write(pool).await?;
    let mut summary = SeedSummary::default();

    users::ensure_levels(&mut tx).await?;

    for &(name, email, role) in DEMO_USERS {
        if users::find_user_by_email(&mut *tx, email).await?.is_none() {
            let hash = hash_password(DEFAULT_PASSWORD)?;
            users::insert_user(&mut *tx, name, email, &hash, role).await?;
            summary.users_created += 1;
        }
    }

    for &(code, name, description) in DEMO_BUILDINGS {
        if catalog::find_building_by_code(&mut *tx, code).await?.is_none() {
            catalog::insert_building(&mut *tx, code, name, Some(description)).await?;
            summary.buildings_created += 1;
        }
    }

    for &(building_code, code, name) in DEMO_ROOMS {
        if catalog::find_room_by_code(&mut *tx, code).await?.is_some() {
            continue;
        }
        let building = catalog::find_building_by_code(&mut *tx, building_code)
            .await?
            .ok_or_else(|| FastciliError::not_found("building", building_code))?;
        catalog::insert_room(&mut *tx, building.id, code, name).await?;
        summary.rooms_created += 1;
    }

    for &(room_code, name, quantity) in DEMO_FACILITIES {
        let room = catalog::find_room_by_code(&mut *tx, room_code)
            .await?
            .ok_or_else(|| FastciliError::not_found("room", room_code))?;
        if catalog::find_facility_in_room(&mut *tx, room.id, name).await?.is_none() {
            catalog::insert_facility(&mut *tx, room.id, name, quantity, Condition::Baik).await?;
            summary.facilities_created += 1;
        }
    }

    tx.commit().await?;
    info!(
        users = summary.users_created,
        buildings = summary.buildings_created,
        rooms = summary.rooms_created,
        facilities = summary.facilities_created,
        "seed completed"
    );
    Ok(summary)
}

#[derive(Debug, Serialize)]
pub struct EnsureUserOutcome {
    pub user: User,
    pub level_created: bool,
    pub user_created: bool,
}

/// Make sure `email` can log in as a Pelapor with [`DEFAULT_PASSWORD`].
///
/// Creates the Pelapor level and the account when missing, and resets the
/// password of an existing Pelapor. Accounts of any other role are refused
/// and left untouched.
pub async fn ensure_reporter(pool: &SqlitePool, email: &str) -> Result<EnsureUserOutcome> {
    let mut tx = store::begin_write(pool).await?;

    let level_created = !users::level_exists(&mut *tx, Role::Pelapor).await?;
    if level_created {
        info!("Level Pelapor missing, creating it");
        users::ensure_levels(&mut tx).await?;
    }

    let hash = hash_password(DEFAULT_PASSWORD)?;
    let (id, user_created) = match users::find_user_by_email(&mut *tx, email).await? {
        Some(user) if user.role != Role::Pelapor => {
            warn!(user_id = user.id, role = %user.role, "refusing to reset a non-Pelapor account");
            return Err(FastciliError::validation(
                "email",
                format!("{email} belongs to a {} account", user.role),
            ));
        }
        Some(user) => {
            users::update_password(&mut *tx, user.id, &hash).await?;
            (user.id, false)
        }
        None => {
            let id = users::insert_user(&mut *tx, "Pelapor Test", email, &hash, Role::Pelapor)
                .await?;
            (id, true)
        }
    };

    let user = users::find_user(&mut *tx, id)
        .await?
        .ok_or_else(|| FastciliError::not_found("user", id))?;
    tx.commit().await?;

    info!(user_id = user.id, user_created, level_created, "test reporter ready");
    Ok(EnsureUserOutcome {
        user,
        level_created,
        user_created,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub async fn seeded_pool() -> SqlitePool {
        let pool = store::in_memory().await.unwrap();
        seed(&pool).await.unwrap();
        pool
    }

    pub async fn user(pool: &SqlitePool, email: &str) -> User {
        users::find_user_by_email(pool, email).await.unwrap().unwrap()
    }

    pub async fn facility_id(pool: &SqlitePool, room_code: &str, name: &str) -> i64 {
        let room = catalog::find_room_by_code(pool, room_code).await.unwrap().unwrap();
        catalog::find_facility_in_room(pool, room.id, name)
            .await
            .unwrap()
            .unwrap()
            .id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::auth::verify_password;

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = store::in_memory().await.unwrap();

        let first = seed(&pool).await.unwrap();
        assert_eq!(first.users_created, DEMO_USERS.len());
        assert_eq!(first.buildings_created, 2);
        assert_eq!(first.rooms_created, 3);
        assert_eq!(first.facilities_created, 5);

        let second = seed(&pool).await.unwrap();
        assert_eq!(second.users_created, 0);
        assert_eq!(second.facilities_created, 0);
    }

    #[tokio::test]
    async fn ensure_reporter_creates_missing_account() {
        let pool = store::in_memory().await.unwrap();

        let outcome = ensure_reporter(&pool, "pelapor.baru@jti.com").await.unwrap();
        assert!(outcome.level_created);
        assert!(outcome.user_created);
        assert_eq!(outcome.user.role, Role::Pelapor);
        assert!(verify_password(DEFAULT_PASSWORD, &outcome.user.password_hash));
    }

    #[tokio::test]
    async fn ensure_reporter_resets_existing_reporter() {
        let pool = fixtures::seeded_pool().await;
        let before = fixtures::user(&pool, TEST_REPORTER_EMAIL).await;
        let forgotten = hash_password("lupa_password").unwrap();
        users::update_password(&pool, before.id, &forgotten).await.unwrap();

        let outcome = ensure_reporter(&pool, TEST_REPORTER_EMAIL).await.unwrap();
        assert!(!outcome.level_created);
        assert!(!outcome.user_created);
        assert_eq!(outcome.user.id, before.id);
        assert_eq!(outcome.user.role, Role::Pelapor);
        assert!(verify_password(DEFAULT_PASSWORD, &outcome.user.password_hash));
    }

    #[tokio::test]
    async fn ensure_reporter_leaves_staff_accounts_alone() {
        let pool = fixtures::seeded_pool().await;

        for email in ["admin@jti.com", "teknisi@jti.com"] {
            let before = fixtures::user(&pool, email).await;
            let private = hash_password("rahasia_pribadi").unwrap();
            users::update_password(&pool, before.id, &private).await.unwrap();

            let err = ensure_reporter(&pool, email).await.unwrap_err();
            assert_eq!(err.field(), Some("email"), "{email}");

            let after = fixtures::user(&pool, email).await;
            assert_eq!(after.role, before.role, "{email}");
            assert!(verify_password("rahasia_pribadi", &after.password_hash));
            assert!(!verify_password(DEFAULT_PASSWORD, &after.password_hash));
        }
    }
}
