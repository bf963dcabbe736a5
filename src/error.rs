use thiserror::Error;

use crate::access::{Capability, Role};
use crate::ticket::{Action, Status};

#[derive(Debug, Error)]
pub enum FastciliError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Email atau password salah")]
    InvalidCredentials,

    #[error("{role} is not allowed to {capability}")]
    Forbidden { role: Role, capability: Capability },

    #[error("{entity} {id} does not belong to you")]
    NotOwner { entity: &'static str, id: i64 },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Cannot {action} a report that is {from}")]
    InvalidTransition { from: Status, action: Action },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FastciliError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        FastciliError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        FastciliError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Name of the offending form field for field-level failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            FastciliError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FastciliError>;
