//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API and the stored-image directory under a
//! single Axum router. Handlers translate requests into service calls and map
//! service errors to status codes; no business rules live here.

pub mod auth;
pub mod boards;
pub mod personas;
pub mod pins;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::access::AccessError;
use crate::state::AppState;

/// Full application router: API routes plus stored images at `image_base`.
/// An absolute URL base means images are served elsewhere (a CDN), so no
/// local directory is mounted.
pub fn app(state: AppState, image_root: &Path, image_base: &str) -> Router {
    let router = api_routes(state);
    if image_base.starts_with('/') {
        router.nest_service(image_base, ServeDir::new(image_root))
    } else {
        router
    }
}

fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/dev/session", post(auth::dev_session))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/catalog/{kind}", get(personas::list_catalog))
        .route("/api/personas", get(personas::list_personas).post(personas::save_persona))
        .route(
            "/api/personas/{id}",
            get(personas::find_persona)
                .put(personas::update_persona)
                .delete(personas::delete_persona),
        )
        .route(
            "/api/personas/{id}/boards",
            get(boards::list_boards).post(boards::create_board),
        )
        .route("/api/personas/{id}/pins", get(pins::list_pins_by_persona))
        .route("/api/personas/{id}/pins/search", get(pins::search_pins))
        .route(
            "/api/boards/{id}",
            patch(boards::rename_board).delete(boards::delete_board),
        )
        .route("/api/boards/{id}/pins", get(pins::list_pins_by_board))
        .route("/api/pins", post(pins::create_pin))
        .route("/api/pins/from-insight", post(pins::create_pin_from_insight))
        .route(
            "/api/pins/{id}",
            get(pins::get_pin).put(pins::update_pin).delete(pins::delete_pin),
        )
        .route("/api/pins/{id}/image", put(pins::set_pin_image))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Status for an ownership-chain failure, shared by every resource route.
pub(crate) fn access_error_to_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::NotFound(_) => StatusCode::NOT_FOUND,
        AccessError::Forbidden(_) => StatusCode::FORBIDDEN,
        AccessError::Database(e) => {
            tracing::error!(error = %e, "ownership lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
