//! Card service — CRUD with per-field permission re-validation.
//!
//! DESIGN
//! ======
//! Every mutation fetches the authoritative card + session rows, re-runs the
//! permission predicates server-side (role re-derived from the database,
//! never trusted from the client), and writes through to Postgres in the same
//! call. The returned row is authoritative; clients that already applied the
//! mutation optimistically do not wait for it.

use sqlx::PgPool;

use board::colors::DEFAULT_COLOR;
use board::permissions;
use protocol::frame::ErrorCode;
use protocol::model::{Card, CardId, Role, SessionId, VoteAction};

use super::refine::RefineError;
use super::session;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("card not found: {0}")]
    NotFound(CardId),
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("AI refine is not configured")]
    RefineUnavailable,
    #[error("refine failed: {0}")]
    Refine(#[from] RefineError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for CardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::SessionNotFound(_) => "E_NOT_FOUND",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::RefineUnavailable => "E_REFINE_UNAVAILABLE",
            Self::Refine(_) => "E_REFINE_FAILED",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Refine(_))
    }
}

impl From<session::SessionError> for CardError {
    fn from(err: session::SessionError) -> Self {
        match err {
            session::SessionError::NotFound(id) => Self::SessionNotFound(id),
            session::SessionError::Forbidden(msg) => Self::Forbidden(msg),
            session::SessionError::Validation(_) => Self::Forbidden("invalid input"),
            session::SessionError::Database(e) => Self::Database(e),
        }
    }
}

/// Input for card creation. The id is client-generated; a missing id gets
/// one server-side so scripted clients can stay thin.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub id: Option<CardId>,
    pub content: String,
    pub color: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// Sparse update; only present fields are permission-checked and applied.
#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    pub content: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub color: Option<String>,
}

type CardRow = (
    String,             // id
    String,             // session_id
    String,             // content
    String,             // color
    f64,                // x
    f64,                // y
    i64,                // votes
    serde_json::Value,  // voted_by
    serde_json::Value,  // reactions
    String,             // created_by_id
    i64,                // updated_at ms
);

const CARD_COLUMNS: &str = "id, session_id, content, color, x, y, votes, voted_by, reactions, \
     created_by_id, (extract(epoch FROM updated_at) * 1000)::bigint";

fn row_to_card(row: CardRow) -> Card {
    let (id, session_id, content, color, x, y, votes, voted_by, reactions, created_by_id, updated_at) =
        row;
    Card {
        id,
        session_id,
        content,
        color,
        x,
        y,
        votes,
        voted_by: serde_json::from_value(voted_by).unwrap_or_default(),
        reactions: serde_json::from_value(reactions).unwrap_or_default(),
        created_by_id,
        updated_at,
    }
}

// =============================================================================
// READ
// =============================================================================

/// All cards of a session, oldest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &PgPool, session_id: &SessionId) -> Result<Vec<Card>, CardError> {
    let rows = sqlx::query_as::<_, CardRow>(&format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE session_id = $1 ORDER BY updated_at ASC, id ASC"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_card).collect())
}

async fn fetch(pool: &PgPool, card_id: &str) -> Result<Card, CardError> {
    let row = sqlx::query_as::<_, CardRow>(&format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE id = $1"
    ))
    .bind(card_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| CardError::NotFound(card_id.to_owned()))?;

    Ok(row_to_card(row))
}

// =============================================================================
// CREATE
// =============================================================================

/// Create a card. Rejected while the session is locked.
///
/// # Errors
///
/// Returns `Forbidden` when the session is locked, `SessionNotFound` for
/// unknown sessions.
pub async fn create(
    pool: &PgPool,
    session_id: &SessionId,
    data: NewCard,
    actor_id: &str,
) -> Result<Card, CardError> {
    let session = session::fetch(pool, session_id).await?;
    if !permissions::can_add_card(&session) {
        return Err(CardError::Forbidden("session is locked, cannot add new cards"));
    }

    // The author may not have an explicit join record yet; the FK needs the
    // user row either way.
    super::user::get_or_create(pool, &actor_id.to_owned())
        .await
        .map_err(|e| match e {
            super::user::UserError::Database(e) => CardError::Database(e),
            _ => CardError::Forbidden("user unavailable"),
        })?;

    let id = data.id.unwrap_or_else(board::ids::generate_card_id);
    let color = data.color.unwrap_or_else(|| DEFAULT_COLOR.to_owned());

    let row = sqlx::query_as::<_, CardRow>(&format!(
        "INSERT INTO cards (id, session_id, content, color, x, y, created_by_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {CARD_COLUMNS}"
    ))
    .bind(&id)
    .bind(session_id)
    .bind(&data.content)
    .bind(&color)
    .bind(data.x)
    .bind(data.y)
    .bind(actor_id)
    .fetch_one(pool)
    .await?;

    Ok(row_to_card(row))
}

// =============================================================================
// UPDATE
// =============================================================================

/// Apply a sparse update, re-validating permission per field: content and
/// color follow the edit rule, position follows the move rule.
///
/// # Errors
///
/// Returns `NotFound` or `Forbidden` when a touched field is not permitted.
pub async fn update(
    pool: &PgPool,
    card_id: &str,
    patch: CardPatch,
    actor_id: &str,
) -> Result<Card, CardError> {
    let card = fetch(pool, card_id).await?;
    let session = session::fetch(pool, &card.session_id).await?;

    if patch.content.is_some() && !permissions::can_edit_card(&session, &card, actor_id) {
        return Err(CardError::Forbidden("you don't have permission to edit this card"));
    }
    if (patch.x.is_some() || patch.y.is_some())
        && !permissions::can_move_card(&session, &card, actor_id)
    {
        return Err(CardError::Forbidden("you don't have permission to move this card"));
    }
    if patch.color.is_some() && !permissions::can_change_color(&session, &card, actor_id) {
        return Err(CardError::Forbidden("you don't have permission to recolor this card"));
    }

    let row = sqlx::query_as::<_, CardRow>(&format!(
        "UPDATE cards SET \
             content = COALESCE($2, content), \
             x = COALESCE($3, x), \
             y = COALESCE($4, y), \
             color = COALESCE($5, color), \
             updated_at = now() \
         WHERE id = $1 RETURNING {CARD_COLUMNS}"
    ))
    .bind(card_id)
    .bind(patch.content)
    .bind(patch.x)
    .bind(patch.y)
    .bind(patch.color)
    .fetch_one(pool)
    .await?;

    Ok(row_to_card(row))
}

// =============================================================================
// VOTE / REACT
// =============================================================================

/// Toggle the caller's vote. The derived `votes`/`voted_by` pair is computed
/// together and written atomically. Voting on one's own card is reported as
/// `Denied` rather than an error, matching the vote button's soft failure.
///
/// # Errors
///
/// Returns `Forbidden` when the session is locked.
pub async fn vote(pool: &PgPool, card_id: &str, actor_id: &str) -> Result<(Card, VoteAction), CardError> {
    let mut card = fetch(pool, card_id).await?;
    let session = session::fetch(pool, &card.session_id).await?;

    if !permissions::can_vote(&session, &card, actor_id) {
        if card.created_by_id == actor_id {
            return Ok((card, VoteAction::Denied));
        }
        return Err(CardError::Forbidden("session is locked, cannot vote"));
    }

    let action = card.toggle_vote(actor_id);
    let row = sqlx::query_as::<_, CardRow>(&format!(
        "UPDATE cards SET votes = $2, voted_by = $3, updated_at = now() \
         WHERE id = $1 RETURNING {CARD_COLUMNS}"
    ))
    .bind(card_id)
    .bind(card.votes)
    .bind(serde_json::to_value(&card.voted_by).unwrap_or_default())
    .fetch_one(pool)
    .await?;

    Ok((row_to_card(row), action))
}

/// Toggle an emoji reaction. Allowed on any card, including one's own, while
/// the session is unlocked.
///
/// # Errors
///
/// Returns `Forbidden` when the session is locked.
pub async fn react(
    pool: &PgPool,
    card_id: &str,
    emoji: &str,
    actor_id: &str,
) -> Result<Card, CardError> {
    let mut card = fetch(pool, card_id).await?;
    let session = session::fetch(pool, &card.session_id).await?;

    if !permissions::can_react(&session) {
        return Err(CardError::Forbidden("session is locked, cannot react"));
    }

    card.toggle_reaction(emoji, actor_id);
    let row = sqlx::query_as::<_, CardRow>(&format!(
        "UPDATE cards SET reactions = $2, updated_at = now() \
         WHERE id = $1 RETURNING {CARD_COLUMNS}"
    ))
    .bind(card_id)
    .bind(serde_json::to_value(&card.reactions).unwrap_or_default())
    .fetch_one(pool)
    .await?;

    Ok(row_to_card(row))
}

// =============================================================================
// DELETE
// =============================================================================

/// Delete a card. The caller's role is re-derived from the database; session
/// creators override the lock.
///
/// # Errors
///
/// Returns `NotFound` or `Forbidden` per the delete permission.
pub async fn delete(pool: &PgPool, card_id: &str, actor_id: &str) -> Result<(), CardError> {
    let card = fetch(pool, card_id).await?;
    let session = session::fetch(pool, &card.session_id).await?;
    let role = session::role_of(pool, actor_id, &card.session_id)
        .await?
        .unwrap_or(Role::Participant);

    if !permissions::can_delete_card(&session, &card, actor_id, role) {
        return Err(CardError::Forbidden("you don't have permission to delete this card"));
    }

    sqlx::query("DELETE FROM cards WHERE id = $1")
        .bind(card_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Bulk-delete all blank-content cards of a session. Creator-only.
///
/// # Errors
///
/// Returns `Forbidden` for non-creators.
pub async fn delete_empty(
    pool: &PgPool,
    session_id: &SessionId,
    actor_id: &str,
) -> Result<Vec<CardId>, CardError> {
    let role = session::role_of(pool, actor_id, session_id).await?;
    if role != Some(Role::Creator) {
        return Err(CardError::Forbidden("only the session creator can clean up empty cards"));
    }
    session::fetch(pool, session_id).await?;

    let rows = sqlx::query_as::<_, (String,)>(
        "DELETE FROM cards WHERE session_id = $1 AND btrim(content) = '' RETURNING id",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

// =============================================================================
// REFINE
// =============================================================================

/// Rewrite a card's content through the AI refine service, returning the
/// updated card plus the previous content for one-shot undo on the client.
///
/// # Errors
///
/// Returns `RefineUnavailable` without a configured client, `Forbidden`
/// unless the caller authored the card in an unlocked session.
pub async fn refine(
    state: &AppState,
    card_id: &str,
    actor_id: &str,
) -> Result<(Card, String), CardError> {
    let Some(refiner) = &state.refiner else {
        return Err(CardError::RefineUnavailable);
    };

    let card = fetch(&state.pool, card_id).await?;
    let session = session::fetch(&state.pool, &card.session_id).await?;
    if !permissions::can_refine(&session, &card, actor_id) {
        return Err(CardError::Forbidden("you don't have permission to refine this card"));
    }
    if card.content.trim().is_empty() {
        return Err(CardError::Forbidden("nothing to refine"));
    }

    let refined = refiner.refine(&card.content).await?;
    let previous = card.content.clone();

    let row = sqlx::query_as::<_, CardRow>(&format!(
        "UPDATE cards SET content = $2, updated_at = now() \
         WHERE id = $1 RETURNING {CARD_COLUMNS}"
    ))
    .bind(card_id)
    .bind(&refined)
    .fetch_one(&state.pool)
    .await?;

    Ok((row_to_card(row), previous))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_mapping_decodes_jsonb_fields() {
        let card = row_to_card((
            "c1".into(),
            "s1".into(),
            "idea".into(),
            "#F9E9A8".into(),
            1.5,
            -2.0,
            2,
            serde_json::json!(["a", "b"]),
            serde_json::json!({"🔥": ["a"]}),
            "alice".into(),
            1_700_000_000_000,
        ));
        assert_eq!(card.voted_by, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(card.reactions.get("🔥").map(Vec::len), Some(1));
        assert_eq!(card.votes, 2);
    }

    #[test]
    fn row_mapping_tolerates_malformed_json() {
        let card = row_to_card((
            "c1".into(),
            "s1".into(),
            String::new(),
            "#F9E9A8".into(),
            0.0,
            0.0,
            0,
            serde_json::json!("not-a-list"),
            serde_json::json!(42),
            "alice".into(),
            0,
        ));
        assert!(card.voted_by.is_empty());
        assert!(card.reactions.is_empty());
    }

    #[test]
    fn error_codes_map_to_taxonomy() {
        assert_eq!(CardError::NotFound("c".into()).error_code(), "E_NOT_FOUND");
        assert_eq!(CardError::SessionNotFound("s".into()).error_code(), "E_NOT_FOUND");
        assert_eq!(CardError::Forbidden("no").error_code(), "E_FORBIDDEN");
        assert_eq!(CardError::RefineUnavailable.error_code(), "E_REFINE_UNAVAILABLE");
    }

    #[tokio::test]
    #[ignore = "requires a live Postgres at the test pool address"]
    async fn create_then_vote_round_trip() {
        let state = crate::state::test_helpers::test_app_state();
        let session_id = "live-test".to_owned();
        session::get_or_create(&state.pool, &session_id).await.unwrap();
        let card = create(
            &state.pool,
            &session_id,
            NewCard { id: None, content: "hi".into(), color: None, x: 0.0, y: 0.0 },
            "alice",
        )
        .await
        .unwrap();
        let (voted, action) = vote(&state.pool, &card.id, "bob").await.unwrap();
        assert_eq!(action, VoteAction::Added);
        assert_eq!(voted.votes, 1);
    }
}
