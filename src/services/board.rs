//! Pin board service — CRUD and the derived cover image.
//!
//! DESIGN
//! ======
//! A board's `img_path` is denormalized: it always mirrors the
//! `pin_img_path` of the board's most recently modified pin, or the default
//! board image when the board is empty. `recompute_cover_image` is the one
//! place that derives it; pin mutations call it (or `set_cover_image` when
//! the touched pin is known to be the newest) inside their transaction.

use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::access::{self, AccessError, Resource};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row returned from board queries.
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub id: Uuid,
    pub persona_id: Uuid,
    pub name: String,
    pub img_path: String,
    pub created_at: OffsetDateTime,
}

type BoardTuple = (Uuid, Uuid, String, String, OffsetDateTime);

fn to_row((id, persona_id, name, img_path, created_at): BoardTuple) -> BoardRow {
    BoardRow { id, persona_id, name, img_path, created_at }
}

// =============================================================================
// CRUD
// =============================================================================

/// Create an empty board under a persona the caller owns.
///
/// # Errors
///
/// Returns `Access` errors if the persona is missing or not the caller's.
pub async fn create_board(
    pool: &PgPool,
    user_id: Uuid,
    persona_id: Uuid,
    name: &str,
    default_cover: &str,
) -> Result<BoardRow, BoardError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Persona(persona_id), user_id).await?;

    let row = sqlx::query_as::<_, BoardTuple>(
        "INSERT INTO pin_boards (id, persona_id, name, img_path)
         VALUES ($1, $2, $3, $4)
         RETURNING id, persona_id, name, img_path, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(persona_id)
    .bind(name)
    .bind(default_cover)
    .fetch_one(tx.as_mut())
    .await?;
    tx.commit().await?;

    info!(board_id = %row.0, %persona_id, "pin board created");
    Ok(to_row(row))
}

/// List a persona's boards, newest first.
///
/// # Errors
///
/// Returns `Access` errors if the persona is missing or not the caller's.
pub async fn list_boards(pool: &PgPool, user_id: Uuid, persona_id: Uuid) -> Result<Vec<BoardRow>, BoardError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Persona(persona_id), user_id).await?;

    let rows = sqlx::query_as::<_, BoardTuple>(
        "SELECT id, persona_id, name, img_path, created_at
         FROM pin_boards
         WHERE persona_id = $1
         ORDER BY created_at DESC, id DESC",
    )
    .bind(persona_id)
    .fetch_all(tx.as_mut())
    .await?;
    tx.commit().await?;

    Ok(rows.into_iter().map(to_row).collect())
}

/// Rename a board.
///
/// # Errors
///
/// Returns `Access` errors if the board is missing or not the caller's.
pub async fn rename_board(pool: &PgPool, user_id: Uuid, board_id: Uuid, name: &str) -> Result<BoardRow, BoardError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Board(board_id), user_id).await?;

    let row = sqlx::query_as::<_, BoardTuple>(
        "UPDATE pin_boards SET name = $2 WHERE id = $1
         RETURNING id, persona_id, name, img_path, created_at",
    )
    .bind(board_id)
    .bind(name)
    .fetch_one(tx.as_mut())
    .await?;
    tx.commit().await?;

    Ok(to_row(row))
}

/// Delete a board. Its pins and their tags go with it.
///
/// # Errors
///
/// Returns `Access` errors if the board is missing or not the caller's.
pub async fn delete_board(pool: &PgPool, user_id: Uuid, board_id: Uuid) -> Result<(), BoardError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Board(board_id), user_id).await?;

    sqlx::query("DELETE FROM pin_boards WHERE id = $1")
        .bind(board_id)
        .execute(tx.as_mut())
        .await?;
    tx.commit().await?;

    info!(%board_id, "pin board deleted");
    Ok(())
}

// =============================================================================
// COVER IMAGE
// =============================================================================

/// Newest pin wins: latest `modified_at`, ties broken by the larger pin id.
const LATEST_PIN_IMAGE: &str = "SELECT pin_img_path
     FROM pins
     WHERE pin_board_id = $1
     ORDER BY modified_at DESC, id DESC
     LIMIT 1";

/// Choose the cover for a board given its newest pin's image, if any.
#[must_use]
pub fn cover_for(latest_pin_image: Option<String>, default_cover: &str) -> String {
    latest_pin_image.unwrap_or_else(|| default_cover.to_owned())
}

/// Re-derive a board's cover from its remaining pins. Returns the new path.
pub(crate) async fn recompute_cover_image(
    conn: &mut PgConnection,
    board_id: Uuid,
    default_cover: &str,
) -> Result<String, sqlx::Error> {
    let latest: Option<String> = sqlx::query_scalar(LATEST_PIN_IMAGE)
        .bind(board_id)
        .fetch_optional(&mut *conn)
        .await?;
    let cover = cover_for(latest, default_cover);
    set_cover_image(conn, board_id, &cover).await?;
    Ok(cover)
}

/// Overwrite a board's cover. Only valid when `img_path` belongs to the
/// board's newest pin.
pub(crate) async fn set_cover_image(conn: &mut PgConnection, board_id: Uuid, img_path: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE pin_boards SET img_path = $2 WHERE id = $1")
        .bind(board_id)
        .bind(img_path)
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
