use super::*;

#[test]
fn resource_reports_id_and_kind() {
    let id = Uuid::new_v4();
    assert_eq!(Resource::Persona(id).id(), id);
    assert_eq!(Resource::Board(id).kind(), "board");
    assert_eq!(Resource::Pin(id).kind(), "pin");
    assert_eq!(Resource::Persona(id).kind(), "persona");
}

#[test]
fn resource_display_names_kind_and_id() {
    let id = Uuid::nil();
    assert_eq!(Resource::Pin(id).to_string(), format!("pin {id}"));
}

#[test]
fn access_error_messages_name_the_resource() {
    let id = Uuid::nil();
    assert_eq!(AccessError::NotFound(Resource::Board(id)).to_string(), format!("board {id} not found"));
    assert_eq!(
        AccessError::Forbidden(Resource::Persona(id)).to_string(),
        format!("persona {id} is not owned by the caller")
    );
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::board;
    use crate::services::persona::{self, PersonaRequest};
    use crate::state::test_helpers::{integration_pool, seed_user};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn chain_resolves_from_pin_to_user() {
        let pool = integration_pool().await;
        let owner = seed_user(&pool, "chain-owner").await;
        let other = seed_user(&pool, "chain-other").await;
        let persona_id = persona::save_persona(&pool, owner, &PersonaRequest { name: "Root".into(), ..PersonaRequest::default() })
            .await
            .unwrap();
        let board = board::create_board(&pool, owner, persona_id, "B", "/images/pinboard/default.png")
            .await
            .unwrap();
        let insight_id = Uuid::new_v4();
        sqlx::query("INSERT INTO insights (id, url, open) VALUES ($1, 'http://x', false)")
            .bind(insight_id)
            .execute(&pool)
            .await
            .unwrap();
        let pin_id = Uuid::new_v4();
        sqlx::query("INSERT INTO pins (id, pin_board_id, insight_id, pin_img_path) VALUES ($1, $2, $3, 'p.png')")
            .bind(pin_id)
            .bind(board.id)
            .bind(insight_id)
            .execute(&pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        for resource in [Resource::Persona(persona_id), Resource::Board(board.id), Resource::Pin(pin_id)] {
            assert_eq!(owner_of(&mut conn, resource).await.unwrap(), owner);
            ensure_owner(&mut conn, resource, owner).await.unwrap();
            let denied = ensure_owner(&mut conn, resource, other).await;
            assert!(matches!(denied, Err(AccessError::Forbidden(r)) if r == resource));
        }

        let missing = owner_of(&mut conn, Resource::Pin(Uuid::new_v4())).await;
        assert!(matches!(missing, Err(AccessError::NotFound(Resource::Pin(_)))));
    }
}
