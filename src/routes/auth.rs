//! Auth routes — session extractor, current user, logout, dev login.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use crate::services::session;
use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";
const DEV_USER_NAME: &str = "Dev User";

/// Session token from the cookie, falling back to an `Authorization: Bearer`
/// header for non-browser clients.
pub(crate) fn token_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).filter(|t| !t.is_empty()) {
        return Some(token.to_owned());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

fn session_cookie(token: String, max_age: Option<Duration>, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    if let Some(age) = max_age {
        cookie.set_max_age(age);
    }
    cookie
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie or bearer token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { user, token })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/auth/me` — return current user.
pub async fn me(auth: AuthUser) -> Json<session::SessionUser> {
    Json(auth.user)
}

/// `POST /api/auth/logout` — delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, "session delete failed on logout");
    }

    let jar = CookieJar::new().add(session_cookie(String::new(), Some(Duration::ZERO), state.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Default)]
pub struct DevSessionBody {
    pub name: Option<String>,
}

/// `POST /api/dev/session` — development login without an identity provider.
///
/// Enabled only when `DEV_AUTH_BYPASS=true`. Returns the token in the body
/// and as a cookie.
pub async fn dev_session(
    State(state): State<AppState>,
    body: Option<Json<DevSessionBody>>,
) -> Result<impl IntoResponse, StatusCode> {
    if !state.dev_auth_bypass {
        return Err(StatusCode::NOT_FOUND);
    }

    let body = body.map(|Json(b)| b).unwrap_or_default();
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEV_USER_NAME);

    let user = session::upsert_user_by_name(&state.pool, name)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "dev user upsert failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    let token = session::create_session(&state.pool, user.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "session creation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(user_id = %user.id, "dev session created");
    let jar = CookieJar::new().add(session_cookie(token.clone(), None, state.cookie_secure));
    Ok((jar, Json(serde_json::json!({ "token": token, "user": user }))))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
