//! Persona and catalog routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::routes::access_error_to_status;
use crate::routes::auth::AuthUser;
use crate::services::persona::{self, CatalogItem, PersonaError, PersonaRequest, PersonaView};
use crate::state::AppState;

fn validate(request: &PersonaRequest) -> Result<(), StatusCode> {
    if request.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

/// `GET /api/catalog/:kind` — list senses, jobs or interests.
pub async fn list_catalog(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(kind): Path<String>,
) -> Result<Json<Vec<CatalogItem>>, StatusCode> {
    let kind = persona::CatalogKind::parse(&kind).ok_or(StatusCode::BAD_REQUEST)?;
    let items = persona::list_catalog(&state.pool, kind).await.map_err(|e| {
        tracing::error!(error = %e, "catalog query failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(items))
}

/// `GET /api/personas` — list the caller's personas.
pub async fn list_personas(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<PersonaView>>, StatusCode> {
    let views = persona::list_personas(&state.pool, auth.user.id)
        .await
        .map_err(persona_error_to_status)?;
    Ok(Json(views))
}

/// `POST /api/personas` — create a persona with its associations.
pub async fn save_persona(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PersonaRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    validate(&body)?;
    let id = persona::save_persona(&state.pool, auth.user.id, &body)
        .await
        .map_err(persona_error_to_status)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// `GET /api/personas/:id` — load one persona.
pub async fn find_persona(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(persona_id): Path<Uuid>,
) -> Result<Json<PersonaView>, StatusCode> {
    let require_owner = state.access.persona_find_requires_owner;
    let view = persona::find_persona(&state.pool, auth.user.id, persona_id, require_owner)
        .await
        .map_err(persona_error_to_status)?;
    Ok(Json(view))
}

/// `PUT /api/personas/:id` — replace a persona's fields and associations.
pub async fn update_persona(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(persona_id): Path<Uuid>,
    Json(body): Json<PersonaRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    validate(&body)?;
    let id = persona::update_persona(&state.pool, auth.user.id, persona_id, &body)
        .await
        .map_err(persona_error_to_status)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

/// `DELETE /api/personas/:id` — delete a persona and everything under it.
pub async fn delete_persona(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(persona_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let id = persona::delete_persona(&state.pool, auth.user.id, persona_id)
        .await
        .map_err(persona_error_to_status)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

pub(crate) fn persona_error_to_status(err: PersonaError) -> StatusCode {
    match err {
        PersonaError::Access(e) => access_error_to_status(&e),
        PersonaError::Database(e) => {
            tracing::error!(error = %e, "persona query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "personas_test.rs"]
mod tests;
