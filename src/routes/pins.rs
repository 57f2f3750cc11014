//! Pin routes — create, move, delete, image upload, listing and search.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::access_error_to_status;
use crate::routes::auth::AuthUser;
use crate::services::image_store::StoreError;
use crate::services::pin::{self, PinError, PinView};
use crate::services::scrape::ScrapeError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePinBody {
    pub pin_board_id: Uuid,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct CreatePinFromInsightBody {
    pub pin_board_id: Uuid,
    pub insight_id: Uuid,
}

#[derive(Deserialize)]
pub struct UpdatePinBody {
    pub pin_board_id: Uuid,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
}

/// `POST /api/pins` — scrape a URL and pin it to a board.
pub async fn create_pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreatePinBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let id = pin::create_pin(&state, auth.user.id, body.pin_board_id, url, &body.tags)
        .await
        .map_err(pin_error_to_status)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// `POST /api/pins/from-insight` — pin an existing insight to a board.
pub async fn create_pin_from_insight(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreatePinFromInsightBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let id = pin::create_pin_from_insight(&state, auth.user.id, body.pin_board_id, body.insight_id)
        .await
        .map_err(pin_error_to_status)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// `GET /api/pins/:id` — load one pin.
pub async fn get_pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(pin_id): Path<Uuid>,
) -> Result<Json<PinView>, StatusCode> {
    let view = pin::get_pin(&state.pool, auth.user.id, pin_id)
        .await
        .map_err(pin_error_to_status)?;
    Ok(Json(view))
}

/// `PUT /api/pins/:id` — move a pin, replacing its tags on a board change.
pub async fn update_pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(pin_id): Path<Uuid>,
    Json(body): Json<UpdatePinBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let id = pin::update_pin(&state, auth.user.id, pin_id, body.pin_board_id, &body.tags)
        .await
        .map_err(pin_error_to_status)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

/// `DELETE /api/pins/:id` — delete a pin.
pub async fn delete_pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(pin_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let id = pin::delete_pin(&state, auth.user.id, pin_id)
        .await
        .map_err(pin_error_to_status)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

/// `PUT /api/pins/:id/image` — replace a pin's image with the raw request body.
pub async fn set_pin_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(pin_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PinView>, StatusCode> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let view = pin::set_pin_image(&state, auth.user.id, pin_id, &body, content_type)
        .await
        .map_err(pin_error_to_status)?;
    Ok(Json(view))
}

/// `GET /api/personas/:id/pins` — every pin across a persona's boards.
pub async fn list_pins_by_persona(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(persona_id): Path<Uuid>,
) -> Result<Json<Vec<PinView>>, StatusCode> {
    let views = pin::list_pins_by_persona(&state.pool, auth.user.id, persona_id)
        .await
        .map_err(pin_error_to_status)?;
    Ok(Json(views))
}

/// `GET /api/boards/:id/pins` — every pin on a board.
pub async fn list_pins_by_board(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<Json<Vec<PinView>>, StatusCode> {
    let views = pin::list_pins_by_board(&state.pool, auth.user.id, board_id)
        .await
        .map_err(pin_error_to_status)?;
    Ok(Json(views))
}

/// `GET /api/personas/:id/pins/search?keyword=` — title/tag substring search.
pub async fn search_pins(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(persona_id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PinView>>, StatusCode> {
    let views = pin::search_pins(&state.pool, auth.user.id, persona_id, &query.keyword)
        .await
        .map_err(pin_error_to_status)?;
    Ok(Json(views))
}

pub(crate) fn pin_error_to_status(err: PinError) -> StatusCode {
    match err {
        PinError::Access(e) => access_error_to_status(&e),
        PinError::InsightNotFound(_) => StatusCode::NOT_FOUND,
        PinError::Scrape(ScrapeError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
        PinError::Scrape(ScrapeError::NotHtml(_) | ScrapeError::TooLarge(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        PinError::Scrape(e) => {
            tracing::warn!(error = %e, "link scrape failed");
            StatusCode::BAD_GATEWAY
        }
        PinError::Store(StoreError::Empty | StoreError::UnsupportedType(_)) => StatusCode::BAD_REQUEST,
        PinError::Store(e) => {
            tracing::error!(error = %e, "image store failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        PinError::Database(e) => {
            tracing::error!(error = %e, "pin query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "pins_test.rs"]
mod tests;
