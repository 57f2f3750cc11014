use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// SessionUser
// =============================================================================

#[test]
fn session_user_serializes_id_and_name() {
    let user = SessionUser { id: Uuid::nil(), name: "ada".into() };
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
    assert_eq!(json["name"], "ada");
}

// =============================================================================
// LIVE DATABASE
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn session_round_trip() {
    let pool = crate::state::test_helpers::integration_pool().await;
    let user = upsert_user_by_name(&pool, "session-user").await.unwrap();
    let again = upsert_user_by_name(&pool, "session-user").await.unwrap();
    assert_eq!(user.id, again.id);

    let token = create_session(&pool, user.id).await.unwrap();
    let resolved = validate_session(&pool, &token).await.unwrap().unwrap();
    assert_eq!(resolved.id, user.id);

    delete_session(&pool, &token).await.unwrap();
    assert!(validate_session(&pool, &token).await.unwrap().is_none());
}
