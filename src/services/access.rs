//! Ownership checks along the Pin → PinBoard → Persona → User chain.
//!
//! DESIGN
//! ======
//! Every resource resolves to exactly one owning user through a single join
//! query. Services call `ensure_owner` on their open transaction before the
//! first write, so a rejected caller never observes a partial mutation.

use std::fmt;

use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Persona(Uuid),
    Board(Uuid),
    Pin(Uuid),
}

impl Resource {
    #[must_use]
    pub fn id(self) -> Uuid {
        match self {
            Self::Persona(id) | Self::Board(id) | Self::Pin(id) => id,
        }
    }

    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Persona(_) => "persona",
            Self::Board(_) => "board",
            Self::Pin(_) => "pin",
        }
    }

    fn owner_query(self) -> &'static str {
        match self {
            Self::Persona(_) => "SELECT user_id FROM personas WHERE id = $1",
            Self::Board(_) => {
                "SELECT p.user_id
                 FROM pin_boards b
                 JOIN personas p ON p.id = b.persona_id
                 WHERE b.id = $1"
            }
            Self::Pin(_) => {
                "SELECT p.user_id
                 FROM pins x
                 JOIN pin_boards b ON b.id = x.pin_board_id
                 JOIN personas p ON p.id = b.persona_id
                 WHERE x.id = $1"
            }
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("{0} not found")]
    NotFound(Resource),
    #[error("{0} is not owned by the caller")]
    Forbidden(Resource),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resolve the user at the root of `resource`'s ownership chain.
///
/// # Errors
///
/// Returns `NotFound` if the resource does not exist.
pub async fn owner_of(conn: &mut PgConnection, resource: Resource) -> Result<Uuid, AccessError> {
    sqlx::query_scalar::<_, Uuid>(resource.owner_query())
        .bind(resource.id())
        .fetch_optional(conn)
        .await?
        .ok_or(AccessError::NotFound(resource))
}

/// Whether `user_id` owns `resource`.
///
/// # Errors
///
/// Returns `NotFound` if the resource does not exist.
pub async fn is_owner(conn: &mut PgConnection, resource: Resource, user_id: Uuid) -> Result<bool, AccessError> {
    Ok(owner_of(conn, resource).await? == user_id)
}

/// Fail with `Forbidden` unless `user_id` owns `resource`.
///
/// # Errors
///
/// Returns `NotFound` if the resource does not exist and `Forbidden` if it
/// belongs to someone else.
pub async fn ensure_owner(conn: &mut PgConnection, resource: Resource, user_id: Uuid) -> Result<(), AccessError> {
    if is_owner(conn, resource, user_id).await? {
        Ok(())
    } else {
        Err(AccessError::Forbidden(resource))
    }
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
