//! Credential checks and password management.
//!
//! Passwords are stored as Argon2id PHC strings
//! (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`). Verification reads the
//! parameters back from the stored string, so older hashes keep working when
//! the defaults change.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::access::{Capability, Role};
use crate::error::{FastciliError, Result};
use crate::store::users::{self, User};

fn hasher() -> Argon2<'static> {
    #[cfg(not(test))]
    let params = Params::default();
    // Minimum cost keeps the seeded test pools fast.
    #[cfg(test)]
    let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None).unwrap_or_default();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| FastciliError::PasswordHash(e.to_string()))?;
    let hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| FastciliError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Constant-time check of `password` against a stored PHC string. Anything
/// that does not parse as one never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => hasher()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    /// Page the user lands on, by role.
    pub home_route: &'static str,
}

pub struct AuthService {
    pool: SqlitePool,
    min_password_length: usize,
}

impl AuthService {
    pub fn new(pool: SqlitePool, min_password_length: usize) -> Self {
        Self {
            pool,
            min_password_length,
        }
    }

    /// Check credentials. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let user = users::find_user_by_email(&self.pool, email).await?;
        match user {
            Some(user) if verify_password(password, &user.password_hash) => {
                info!(user_id = user.id, role = %user.role, "login succeeded");
                let home_route = user.role.home_route();
                Ok(LoginOutcome { user, home_route })
            }
            _ => {
                warn!(email, "login failed");
                Err(FastciliError::InvalidCredentials)
            }
        }
    }

    /// Change a password after checking the current one.
    ///
    /// The stored hash is only replaced once every check passed, so a failed
    /// attempt leaves the old password usable.
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<()> {
        let user = users::find_user(&self.pool, user_id)
            .await?
            .ok_or_else(|| FastciliError::not_found("user", user_id))?;

        if !verify_password(old_password, &user.password_hash) {
            return Err(FastciliError::validation(
                "old_password",
                "current password is incorrect",
            ));
        }
        self.check_strength(new_password)?;
        if new_password != confirmation {
            return Err(FastciliError::validation(
                "password_confirmation",
                "password confirmation does not match",
            ));
        }

        let hash = hash_password(new_password)?;
        users::update_password(&self.pool, user.id, &hash).await?;
        info!(user_id = user.id, "password changed");
        Ok(())
    }

    /// Register an account. Admin only.
    pub async fn create_user(
        &self,
        actor: &User,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        actor.role.require(Capability::ManageUsers)?;

        if name.trim().is_empty() {
            return Err(FastciliError::validation("nama", "must not be empty"));
        }
        let email = email.trim();
        if !email.contains('@') {
            return Err(FastciliError::validation("email", "must be an email address"));
        }
        if users::find_user_by_email(&self.pool, email).await?.is_some() {
            return Err(FastciliError::validation("email", "already registered"));
        }
        self.check_strength(password)?;

        let hash = hash_password(password)?;
        let id = users::insert_user(&self.pool, name.trim(), email, &hash, role).await?;
        info!(user_id = id, %role, created_by = actor.id, "user created");

        users::find_user(&self.pool, id)
            .await?
            .ok_or_else(|| FastciliError::not_found("user", id))
    }

    fn check_strength(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.min_password_length {
            return Err(FastciliError::validation(
                "password",
                format!("must be at least {} characters", self.min_password_length),
            ));
        }
        Ok(())
    }
}
