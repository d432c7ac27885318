//! User service — lazy creation and global username updates.

use sqlx::PgPool;

use board::names::generate_username;
use protocol::frame::ErrorCode;
use protocol::model::{ActorId, User, validate_username};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user not found: {0}")]
    NotFound(ActorId),
    #[error("name {0}")]
    Validation(protocol::model::NameError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for UserError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Validation(_) => "E_VALIDATION",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Fetch a user by actor id, creating it with a generated username on first
/// contact.
///
/// # Errors
///
/// Returns a database error if the upsert or select fails.
pub async fn get_or_create(pool: &PgPool, actor_id: &ActorId) -> Result<User, UserError> {
    sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
        .bind(actor_id)
        .bind(generate_username())
        .execute(pool)
        .await?;

    let (id, username) = sqlx::query_as::<_, (String, String)>(
        "SELECT id, username FROM users WHERE id = $1",
    )
    .bind(actor_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| UserError::NotFound(actor_id.clone()))?;

    Ok(User { id, username })
}

/// Update a username. Global: the change is visible in every session the
/// user participates in.
///
/// # Errors
///
/// Returns `Validation` for bad names, `NotFound` for unknown users.
pub async fn rename(pool: &PgPool, actor_id: &ActorId, username: &str) -> Result<User, UserError> {
    let trimmed = validate_username(username).map_err(UserError::Validation)?;

    let row = sqlx::query_as::<_, (String, String)>(
        "UPDATE users SET username = $2 WHERE id = $1 RETURNING id, username",
    )
    .bind(actor_id)
    .bind(trimmed)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| UserError::NotFound(actor_id.clone()))?;

    Ok(User { id: row.0, username: row.1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::model::NameError;

    #[test]
    fn error_codes() {
        assert_eq!(UserError::NotFound("a".into()).error_code(), "E_NOT_FOUND");
        assert_eq!(
            UserError::Validation(NameError::TooLong { max: 30 }).error_code(),
            "E_VALIDATION"
        );
    }

    #[test]
    fn validation_error_message_is_user_facing() {
        let err = UserError::Validation(NameError::TooShort { min: 2 });
        assert_eq!(err.to_string(), "name must be at least 2 characters");
    }
}
