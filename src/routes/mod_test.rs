use super::*;
use crate::services::access::Resource;
use crate::state::test_helpers::test_app_state;
use uuid::Uuid;

#[test]
fn access_not_found_maps_to_404() {
    let err = AccessError::NotFound(Resource::Pin(Uuid::nil()));
    assert_eq!(access_error_to_status(&err), StatusCode::NOT_FOUND);
}

#[test]
fn access_forbidden_maps_to_403() {
    let err = AccessError::Forbidden(Resource::Board(Uuid::nil()));
    assert_eq!(access_error_to_status(&err), StatusCode::FORBIDDEN);
}

#[test]
fn access_database_maps_to_500() {
    let err = AccessError::Database(sqlx::Error::PoolTimedOut);
    assert_eq!(access_error_to_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn healthz_is_ok() {
    assert_eq!(healthz().await, StatusCode::OK);
}

#[tokio::test]
async fn router_builds_with_image_directory() {
    let dir = tempfile::tempdir().unwrap();
    let _router = app(test_app_state(), dir.path(), "/images");
}

#[tokio::test]
async fn router_builds_with_remote_image_base() {
    let dir = tempfile::tempdir().unwrap();
    let _router = app(test_app_state(), dir.path(), "https://cdn.example.test/img");
}
