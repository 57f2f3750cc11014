//! Pin board routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::access_error_to_status;
use crate::routes::auth::AuthUser;
use crate::services::board::{self, BoardError, BoardRow};
use crate::services::image_store::PIN_BOARD_PREFIX;
use crate::services::unix_millis;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BoardResponse {
    pub id: Uuid,
    pub persona_id: Uuid,
    pub name: String,
    pub img_path: String,
    pub created_at: i64,
}

fn to_response(row: BoardRow) -> BoardResponse {
    BoardResponse {
        id: row.id,
        persona_id: row.persona_id,
        name: row.name,
        img_path: row.img_path,
        created_at: unix_millis(row.created_at),
    }
}

#[derive(Deserialize)]
pub struct BoardNameBody {
    pub name: String,
}

fn validated_name(body: &BoardNameBody) -> Result<&str, StatusCode> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(name)
}

/// `GET /api/personas/:id/boards` — list a persona's boards.
pub async fn list_boards(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(persona_id): Path<Uuid>,
) -> Result<Json<Vec<BoardResponse>>, StatusCode> {
    let rows = board::list_boards(&state.pool, auth.user.id, persona_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// `POST /api/personas/:id/boards` — create an empty board.
pub async fn create_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(persona_id): Path<Uuid>,
    Json(body): Json<BoardNameBody>,
) -> Result<(StatusCode, Json<BoardResponse>), StatusCode> {
    let name = validated_name(&body)?;
    let default_cover = state.images.default_path(PIN_BOARD_PREFIX);
    let row = board::create_board(&state.pool, auth.user.id, persona_id, name, &default_cover)
        .await
        .map_err(board_error_to_status)?;
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

/// `PATCH /api/boards/:id` — rename a board.
pub async fn rename_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
    Json(body): Json<BoardNameBody>,
) -> Result<Json<BoardResponse>, StatusCode> {
    let name = validated_name(&body)?;
    let row = board::rename_board(&state.pool, auth.user.id, board_id, name)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(to_response(row)))
}

/// `DELETE /api/boards/:id` — delete a board and its pins.
pub async fn delete_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    board::delete_board(&state.pool, auth.user.id, board_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn board_error_to_status(err: BoardError) -> StatusCode {
    match err {
        BoardError::Access(e) => access_error_to_status(&e),
        BoardError::Database(e) => {
            tracing::error!(error = %e, "board query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "boards_test.rs"]
mod tests;
