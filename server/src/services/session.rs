//! Session service — lazy creation, settings, membership, and cleanup.
//!
//! DESIGN
//! ======
//! Sessions are created on first visit (atomic upsert) and deleted explicitly
//! by their creator, cascading card deletion in the schema. The first-joiner
//! creator claim rides on a partial unique index (`one creator per session`):
//! the join attempts the creator insert and falls back to participant on
//! conflict, so two racing first joins can never both win.
//!
//! Every mutating operation re-derives the caller's role from the database;
//! a client-supplied role is never trusted.

use sqlx::PgPool;

use board::names::generate_session_name;
use board::permissions;
use protocol::frame::ErrorCode;
use protocol::model::{
    ActorId, DeletePermission, MovePermission, Participant, Role, Session, SessionId,
    validate_session_name,
};

use super::user;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("session name {0}")]
    Validation(protocol::model::NameError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Validation(_) => "E_VALIDATION",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Partial settings update; absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsPatch {
    pub is_locked: Option<bool>,
    pub move_permission: Option<MovePermission>,
    pub delete_permission: Option<DeletePermission>,
}

type SessionRow = (String, String, bool, String, String);

fn row_to_session(row: SessionRow) -> Session {
    let (id, name, is_locked, move_permission, delete_permission) = row;
    Session {
        id,
        name,
        is_locked,
        move_permission: MovePermission::parse(&move_permission).unwrap_or(MovePermission::Creator),
        delete_permission: DeletePermission::parse(&delete_permission)
            .unwrap_or(DeletePermission::Creator),
    }
}

const SESSION_COLUMNS: &str = "id, name, is_locked, move_permission, delete_permission";

// =============================================================================
// GET / CREATE
// =============================================================================

/// Fetch a session by id, creating it with a generated name on first visit.
///
/// # Errors
///
/// Returns a database error if the upsert or select fails.
pub async fn get_or_create(pool: &PgPool, session_id: &SessionId) -> Result<Session, SessionError> {
    sqlx::query("INSERT INTO sessions (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
        .bind(session_id)
        .bind(generate_session_name())
        .execute(pool)
        .await?;

    fetch(pool, session_id).await
}

/// Fetch an existing session.
///
/// # Errors
///
/// Returns `NotFound` if the session does not exist.
pub async fn fetch(pool: &PgPool, session_id: &SessionId) -> Result<Session, SessionError> {
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

    Ok(row_to_session(row))
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Rename a session. Creator-only; the name is validated and trimmed.
///
/// # Errors
///
/// Returns `Forbidden` for non-creators and `Validation` for bad names.
pub async fn rename(
    pool: &PgPool,
    session_id: &SessionId,
    name: &str,
    actor_id: &str,
) -> Result<Session, SessionError> {
    let role = role_of(pool, actor_id, session_id).await?;
    if !role.is_some_and(permissions::can_edit_session_name) {
        return Err(SessionError::Forbidden("only the session creator can rename the session"));
    }
    let trimmed = validate_session_name(name).map_err(SessionError::Validation)?;

    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "UPDATE sessions SET name = $2, last_activity_at = now() \
         WHERE id = $1 RETURNING {SESSION_COLUMNS}"
    ))
    .bind(session_id)
    .bind(trimmed)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

    Ok(row_to_session(row))
}

/// Apply a partial settings update. Creator-only.
///
/// # Errors
///
/// Returns `Forbidden` for non-creators, `NotFound` for missing sessions.
pub async fn update_settings(
    pool: &PgPool,
    session_id: &SessionId,
    patch: SettingsPatch,
    actor_id: &str,
) -> Result<Session, SessionError> {
    let role = role_of(pool, actor_id, session_id).await?;
    if !role.is_some_and(permissions::can_configure_session) {
        return Err(SessionError::Forbidden("only the session creator can change settings"));
    }

    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "UPDATE sessions SET \
             is_locked = COALESCE($2, is_locked), \
             move_permission = COALESCE($3, move_permission), \
             delete_permission = COALESCE($4, delete_permission), \
             last_activity_at = now() \
         WHERE id = $1 RETURNING {SESSION_COLUMNS}"
    ))
    .bind(session_id)
    .bind(patch.is_locked)
    .bind(patch.move_permission.map(MovePermission::as_str))
    .bind(patch.delete_permission.map(DeletePermission::as_str))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

    Ok(row_to_session(row))
}

/// Delete a session and, through the schema cascade, all of its cards.
/// Creator-only.
///
/// # Errors
///
/// Returns `Forbidden` for non-creators, `NotFound` for missing sessions.
pub async fn delete(pool: &PgPool, session_id: &SessionId, actor_id: &str) -> Result<(), SessionError> {
    let role = role_of(pool, actor_id, session_id).await?;
    if !role.is_some_and(permissions::can_delete_session) {
        return Err(SessionError::Forbidden("only the session creator can delete the session"));
    }

    let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SessionError::NotFound(session_id.clone()));
    }
    Ok(())
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Look up an actor's role in a session, if any.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn role_of(
    pool: &PgPool,
    actor_id: &str,
    session_id: &SessionId,
) -> Result<Option<Role>, SessionError> {
    let row = sqlx::query_as::<_, (String,)>(
        "SELECT role FROM session_participants WHERE user_id = $1 AND session_id = $2",
    )
    .bind(actor_id)
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(role,)| Role::parse(&role)))
}

/// Join a session. Idempotent for existing participants; the first joiner
/// becomes creator via the partial unique index, everyone after that a
/// participant.
///
/// # Errors
///
/// Returns a database error if any insert fails.
pub async fn join(pool: &PgPool, actor_id: &ActorId, session_id: &SessionId) -> Result<Role, SessionError> {
    user::get_or_create(pool, actor_id).await.map_err(|e| match e {
        user::UserError::Database(e) => SessionError::Database(e),
        user::UserError::NotFound(_) | user::UserError::Validation(_) => {
            SessionError::Forbidden("user unavailable")
        }
    })?;

    if let Some(role) = role_of(pool, actor_id, session_id).await? {
        return Ok(role);
    }

    // Claim the creator slot; the partial unique index arbitrates races.
    let claimed = sqlx::query_as::<_, (String,)>(
        "INSERT INTO session_participants (user_id, session_id, role) \
         VALUES ($1, $2, 'creator') \
         ON CONFLICT DO NOTHING RETURNING role",
    )
    .bind(actor_id)
    .bind(session_id)
    .fetch_optional(pool)
    .await?;
    if claimed.is_some() {
        return Ok(Role::Creator);
    }

    let inserted = sqlx::query_as::<_, (String,)>(
        "INSERT INTO session_participants (user_id, session_id, role) \
         VALUES ($1, $2, 'participant') \
         ON CONFLICT (user_id, session_id) DO NOTHING RETURNING role",
    )
    .bind(actor_id)
    .bind(session_id)
    .fetch_optional(pool)
    .await?;
    if inserted.is_some() {
        return Ok(Role::Participant);
    }

    // Lost a same-actor race; the row exists now.
    Ok(role_of(pool, actor_id, session_id)
        .await?
        .unwrap_or(Role::Participant))
}

/// List participants: the union of explicit join records and all distinct
/// card creators (a card's author is a participant even without joining).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn participants(pool: &PgPool, session_id: &SessionId) -> Result<Vec<Participant>, SessionError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT u.id, u.username \
         FROM users u \
         JOIN ( \
             SELECT user_id FROM session_participants WHERE session_id = $1 \
             UNION \
             SELECT created_by_id FROM cards WHERE session_id = $1 \
         ) p ON p.user_id = u.id \
         ORDER BY u.username",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(actor_id, username)| Participant { actor_id, username })
        .collect())
}
