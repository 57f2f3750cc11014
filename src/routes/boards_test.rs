use super::*;
use crate::services::access::{AccessError, Resource};
use time::OffsetDateTime;

#[test]
fn board_error_to_status_maps_not_found() {
    let err = BoardError::Access(AccessError::NotFound(Resource::Board(Uuid::nil())));
    assert_eq!(board_error_to_status(err), StatusCode::NOT_FOUND);
}

#[test]
fn board_error_to_status_maps_forbidden() {
    let err = BoardError::Access(AccessError::Forbidden(Resource::Persona(Uuid::nil())));
    assert_eq!(board_error_to_status(err), StatusCode::FORBIDDEN);
}

#[test]
fn board_error_to_status_maps_database() {
    let err = BoardError::Database(sqlx::Error::RowNotFound);
    assert_eq!(board_error_to_status(err), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn blank_board_name_is_rejected() {
    let body = BoardNameBody { name: "   ".into() };
    assert_eq!(validated_name(&body), Err(StatusCode::BAD_REQUEST));
}

#[test]
fn board_name_is_trimmed() {
    let body = BoardNameBody { name: "  Reading list ".into() };
    assert_eq!(validated_name(&body), Ok("Reading list"));
}

#[test]
fn response_reports_created_at_in_millis() {
    let row = BoardRow {
        id: Uuid::nil(),
        persona_id: Uuid::nil(),
        name: "B".into(),
        img_path: "/images/pinboard/default.png".into(),
        created_at: OffsetDateTime::UNIX_EPOCH + time::Duration::milliseconds(1_500),
    };
    let response = to_response(row);
    assert_eq!(response.created_at, 1_500);
    assert_eq!(response.img_path, "/images/pinboard/default.png");
}
