use super::*;
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use crate::state::test_helpers::test_app_state;

fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.append(name.clone(), value.parse().unwrap());
    }
    map
}

// =============================================================================
// token_from_headers
// =============================================================================

#[test]
fn token_read_from_session_cookie() {
    let h = headers(&[(COOKIE, "other=1; session_token=abc123")]);
    assert_eq!(token_from_headers(&h).as_deref(), Some("abc123"));
}

#[test]
fn token_read_from_bearer_header() {
    let h = headers(&[(AUTHORIZATION, "Bearer xyz")]);
    assert_eq!(token_from_headers(&h).as_deref(), Some("xyz"));
}

#[test]
fn cookie_wins_over_bearer() {
    let h = headers(&[(COOKIE, "session_token=from-cookie"), (AUTHORIZATION, "Bearer from-header")]);
    assert_eq!(token_from_headers(&h).as_deref(), Some("from-cookie"));
}

#[test]
fn empty_cookie_falls_back_to_bearer() {
    let h = headers(&[(COOKIE, "session_token="), (AUTHORIZATION, "Bearer fallback")]);
    assert_eq!(token_from_headers(&h).as_deref(), Some("fallback"));
}

#[test]
fn missing_or_malformed_credentials_yield_none() {
    assert!(token_from_headers(&HeaderMap::new()).is_none());
    assert!(token_from_headers(&headers(&[(AUTHORIZATION, "Basic dXNlcg==")])).is_none());
    assert!(token_from_headers(&headers(&[(AUTHORIZATION, "Bearer   ")])).is_none());
}

// =============================================================================
// session_cookie
// =============================================================================

#[test]
fn session_cookie_is_http_only_and_lax() {
    let cookie = session_cookie("tok".into(), None, false);
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "tok");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
    assert!(cookie.max_age().is_none());
    assert_eq!(cookie.secure(), Some(false));
}

#[test]
fn session_cookie_secure_flag_follows_config() {
    let cookie = session_cookie("tok".into(), None, true);
    assert_eq!(cookie.secure(), Some(true));
}

#[test]
fn clearing_cookie_expires_immediately() {
    let cookie = session_cookie(String::new(), Some(Duration::ZERO), false);
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
}

// =============================================================================
// dev_session
// =============================================================================

#[tokio::test]
async fn dev_session_hidden_without_bypass() {
    let state = test_app_state();
    let result = dev_session(State(state), None).await;
    assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
}
