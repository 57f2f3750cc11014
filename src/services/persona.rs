//! Persona service — profile aggregate with replace-on-write associations.
//!
//! DESIGN
//! ======
//! A persona owns four association sets: senses, jobs and interests (rows
//! picked from read-only catalogs by id) and free-text charms. A write
//! request always carries the complete desired membership. Updates delete
//! every existing row of each kind and insert the request's rows inside the
//! same transaction; nothing is diffed.
//!
//! Catalog ids that do not resolve are skipped, the way a lookup-by-id-set
//! naturally behaves.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::access::{self, AccessError, Resource};
use crate::services::unix_millis;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One of the read-only reference catalogs a persona selects from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Sense,
    Job,
    Interest,
}

impl CatalogKind {
    pub const ALL: [Self; 3] = [Self::Sense, Self::Job, Self::Interest];

    /// Parse the plural path segment used by the catalog route.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "senses" => Some(Self::Sense),
            "jobs" => Some(Self::Job),
            "interests" => Some(Self::Interest),
            _ => None,
        }
    }

    fn catalog_table(self) -> &'static str {
        match self {
            Self::Sense => "senses",
            Self::Job => "jobs",
            Self::Interest => "interests",
        }
    }

    fn link_table(self) -> &'static str {
        match self {
            Self::Sense => "persona_senses",
            Self::Job => "persona_jobs",
            Self::Interest => "persona_interests",
        }
    }

    fn link_column(self) -> &'static str {
        match self {
            Self::Sense => "sense_id",
            Self::Job => "job_id",
            Self::Interest => "interest_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
}

/// Complete desired state of a persona. Absent lists mean "none".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonaRequest {
    pub name: String,
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(default)]
    pub sense_ids: Vec<i64>,
    #[serde(default)]
    pub job_ids: Vec<i64>,
    #[serde(default)]
    pub interest_ids: Vec<i64>,
    #[serde(default)]
    pub charms: Vec<String>,
}

impl PersonaRequest {
    fn ids(&self, kind: CatalogKind) -> &[i64] {
        match kind {
            CatalogKind::Sense => &self.sense_ids,
            CatalogKind::Job => &self.job_ids,
            CatalogKind::Interest => &self.interest_ids,
        }
    }
}

/// Read model assembled from the persona row and its four association tables.
#[derive(Debug, Clone, Serialize)]
pub struct PersonaView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub introduction: Option<String>,
    pub senses: Vec<CatalogItem>,
    pub jobs: Vec<CatalogItem>,
    pub interests: Vec<CatalogItem>,
    pub charms: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

type PersonaTuple = (Uuid, Uuid, String, Option<String>, OffsetDateTime, OffsetDateTime);

const PERSONA_COLUMNS: &str = "id, user_id, name, introduction, created_at, updated_at";

// =============================================================================
// CATALOG
// =============================================================================

/// List every row of a catalog.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_catalog(pool: &PgPool, kind: CatalogKind) -> Result<Vec<CatalogItem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String)>(&format!(
        "SELECT id, name FROM {} ORDER BY id",
        kind.catalog_table()
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id, name)| CatalogItem { id, name }).collect())
}

/// Resolve catalog rows by id. Unknown ids are skipped; duplicates collapse.
pub(crate) async fn find_catalog_by_ids(
    conn: &mut PgConnection,
    kind: CatalogKind,
    ids: &[i64],
) -> Result<Vec<CatalogItem>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, (i64, String)>(&format!(
        "SELECT id, name FROM {} WHERE id = ANY($1) ORDER BY id",
        kind.catalog_table()
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(id, name)| CatalogItem { id, name }).collect())
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a persona and its associations. Returns the persona id.
///
/// # Errors
///
/// Returns a database error if any insert fails; nothing is kept in that case.
pub async fn save_persona(pool: &PgPool, user_id: Uuid, request: &PersonaRequest) -> Result<Uuid, PersonaError> {
    let persona_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO personas (id, user_id, name, introduction) VALUES ($1, $2, $3, $4)")
        .bind(persona_id)
        .bind(user_id)
        .bind(&request.name)
        .bind(&request.introduction)
        .execute(tx.as_mut())
        .await?;

    for kind in CatalogKind::ALL {
        insert_catalog_links(&mut tx, kind, persona_id, request.ids(kind)).await?;
    }
    insert_charms(&mut tx, persona_id, &request.charms).await?;
    tx.commit().await?;

    info!(%persona_id, %user_id, "persona created");
    Ok(persona_id)
}

/// Load a persona read model.
///
/// Ownership is only enforced when `require_owner` is set; otherwise any
/// authenticated caller can read any persona.
///
/// # Errors
///
/// Returns `NotFound` if the persona does not exist, `Forbidden` if
/// `require_owner` is set and the caller is not the owner.
pub async fn find_persona(
    pool: &PgPool,
    user_id: Uuid,
    persona_id: Uuid,
    require_owner: bool,
) -> Result<PersonaView, PersonaError> {
    let mut tx = pool.begin().await?;
    if require_owner {
        access::ensure_owner(&mut tx, Resource::Persona(persona_id), user_id).await?;
    }

    let row = sqlx::query_as::<_, PersonaTuple>(&format!("SELECT {PERSONA_COLUMNS} FROM personas WHERE id = $1"))
        .bind(persona_id)
        .fetch_optional(tx.as_mut())
        .await?
        .ok_or(AccessError::NotFound(Resource::Persona(persona_id)))?;

    let view = load_view(&mut tx, row).await?;
    tx.commit().await?;
    Ok(view)
}

/// List the caller's personas, newest first.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn list_personas(pool: &PgPool, user_id: Uuid) -> Result<Vec<PersonaView>, PersonaError> {
    let mut tx = pool.begin().await?;
    let rows = sqlx::query_as::<_, PersonaTuple>(&format!(
        "SELECT {PERSONA_COLUMNS} FROM personas WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(tx.as_mut())
    .await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(load_view(&mut tx, row).await?);
    }
    tx.commit().await?;
    Ok(views)
}

/// Update persona fields and replace all four association sets.
///
/// # Errors
///
/// Returns `Access` errors if the persona is missing or not the caller's.
pub async fn update_persona(
    pool: &PgPool,
    user_id: Uuid,
    persona_id: Uuid,
    request: &PersonaRequest,
) -> Result<Uuid, PersonaError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Persona(persona_id), user_id).await?;

    sqlx::query("UPDATE personas SET name = $2, introduction = $3, updated_at = now() WHERE id = $1")
        .bind(persona_id)
        .bind(&request.name)
        .bind(&request.introduction)
        .execute(tx.as_mut())
        .await?;

    for kind in CatalogKind::ALL {
        replace_catalog_links(&mut tx, kind, persona_id, request.ids(kind)).await?;
    }
    replace_charms(&mut tx, persona_id, &request.charms).await?;
    tx.commit().await?;

    info!(%persona_id, "persona updated");
    Ok(persona_id)
}

/// Delete a persona. Associations, boards and pins are removed by cascade.
///
/// # Errors
///
/// Returns `Access` errors if the persona is missing or not the caller's.
pub async fn delete_persona(pool: &PgPool, user_id: Uuid, persona_id: Uuid) -> Result<Uuid, PersonaError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Persona(persona_id), user_id).await?;

    sqlx::query("DELETE FROM personas WHERE id = $1")
        .bind(persona_id)
        .execute(tx.as_mut())
        .await?;
    tx.commit().await?;

    info!(%persona_id, "persona deleted");
    Ok(persona_id)
}

// =============================================================================
// REPLACE SETS
// =============================================================================

/// Make `ids` the persona's complete membership for `kind`.
pub(crate) async fn replace_catalog_links(
    conn: &mut PgConnection,
    kind: CatalogKind,
    persona_id: Uuid,
    ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DELETE FROM {} WHERE persona_id = $1", kind.link_table()))
        .bind(persona_id)
        .execute(&mut *conn)
        .await?;
    insert_catalog_links(conn, kind, persona_id, ids).await
}

async fn insert_catalog_links(
    conn: &mut PgConnection,
    kind: CatalogKind,
    persona_id: Uuid,
    ids: &[i64],
) -> Result<(), sqlx::Error> {
    let items = find_catalog_by_ids(conn, kind, ids).await?;
    let insert = format!(
        "INSERT INTO {} (persona_id, {}) VALUES ($1, $2)",
        kind.link_table(),
        kind.link_column()
    );
    for item in items {
        sqlx::query(&insert)
            .bind(persona_id)
            .bind(item.id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Make `charms` the persona's complete charm list, in order.
pub(crate) async fn replace_charms(conn: &mut PgConnection, persona_id: Uuid, charms: &[String]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM persona_charms WHERE persona_id = $1")
        .bind(persona_id)
        .execute(&mut *conn)
        .await?;
    insert_charms(conn, persona_id, charms).await
}

async fn insert_charms(conn: &mut PgConnection, persona_id: Uuid, charms: &[String]) -> Result<(), sqlx::Error> {
    for charm in charms {
        sqlx::query("INSERT INTO persona_charms (persona_id, name) VALUES ($1, $2)")
            .bind(persona_id)
            .bind(charm)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// =============================================================================
// READ MODEL
// =============================================================================

async fn load_view(conn: &mut PgConnection, row: PersonaTuple) -> Result<PersonaView, sqlx::Error> {
    let (id, user_id, name, introduction, created_at, updated_at) = row;

    let senses = load_links(conn, CatalogKind::Sense, id).await?;
    let jobs = load_links(conn, CatalogKind::Job, id).await?;
    let interests = load_links(conn, CatalogKind::Interest, id).await?;
    let charms = sqlx::query_scalar::<_, String>("SELECT name FROM persona_charms WHERE persona_id = $1 ORDER BY id")
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(PersonaView {
        id,
        user_id,
        name,
        introduction,
        senses,
        jobs,
        interests,
        charms,
        created_at: unix_millis(created_at),
        updated_at: unix_millis(updated_at),
    })
}

async fn load_links(conn: &mut PgConnection, kind: CatalogKind, persona_id: Uuid) -> Result<Vec<CatalogItem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String)>(&format!(
        "SELECT c.id, c.name
         FROM {link} l
         JOIN {catalog} c ON c.id = l.{column}
         WHERE l.persona_id = $1
         ORDER BY c.id",
        link = kind.link_table(),
        catalog = kind.catalog_table(),
        column = kind.link_column(),
    ))
    .bind(persona_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(id, name)| CatalogItem { id, name }).collect())
}

#[cfg(test)]
#[path = "persona_test.rs"]
mod tests;
