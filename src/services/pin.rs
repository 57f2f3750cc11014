//! Pin service — placing insights on boards, tagging, moving, searching.
//!
//! DESIGN
//! ======
//! A pin places one insight on one board and carries its own tags and image.
//! Every mutation keeps the affected boards' cover images in step with their
//! newest pin (see `board::recompute_cover_image`), across both the source
//! and destination board when a pin moves.
//!
//! Tags are board-move metadata: a move to a different board replaces them
//! wholesale, while an update that stays on the same board leaves them alone.
//!
//! ERROR HANDLING
//! ==============
//! Scraping and image writes are slow external calls, so they run before the
//! write transaction opens. Ownership is checked once up front on a pooled
//! connection to avoid external calls for rejected callers, then again inside
//! the transaction. Any failure after that drops the transaction, so no
//! partial writes persist.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::access::{self, AccessError, Resource};
use crate::services::board;
use crate::services::image_store::{PIN_BOARD_PREFIX, PIN_PREFIX, StoreError};
use crate::services::scrape::ScrapeError;
use crate::services::unix_millis;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("insight not found: {0}")]
    InsightNotFound(Uuid),
    #[error("scrape failed: {0}")]
    Scrape(#[from] ScrapeError),
    #[error("image store failed: {0}")]
    Store(#[from] StoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightView {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub img_path: Option<String>,
    pub site_name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinView {
    pub id: Uuid,
    pub pin_board_id: Uuid,
    pub persona_id: Uuid,
    pub pin_img_path: String,
    pub insight: InsightView,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

/// A pin row joined with its board's persona and its insight.
#[derive(Debug, Clone)]
pub(crate) struct PinRecord {
    pub id: Uuid,
    pub pin_board_id: Uuid,
    pub persona_id: Uuid,
    pub pin_img_path: String,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
    pub insight: InsightView,
}

type PinTuple = (
    Uuid,
    Uuid,
    Uuid,
    String,
    OffsetDateTime,
    OffsetDateTime,
    Uuid,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

const PIN_SELECT: &str = "SELECT x.id, x.pin_board_id, b.persona_id, x.pin_img_path, x.created_at, x.modified_at,
            i.id, i.url, i.title, i.description, i.img_path, i.site_name, i.icon
     FROM pins x
     JOIN pin_boards b ON b.id = x.pin_board_id
     JOIN insights i ON i.id = x.insight_id";

const NEWEST_CREATED_FIRST: &str = "ORDER BY x.created_at DESC, x.id DESC";

fn to_record(row: PinTuple) -> PinRecord {
    let (
        id,
        pin_board_id,
        persona_id,
        pin_img_path,
        created_at,
        modified_at,
        insight_id,
        url,
        title,
        description,
        img_path,
        site_name,
        icon,
    ) = row;
    PinRecord {
        id,
        pin_board_id,
        persona_id,
        pin_img_path,
        created_at,
        modified_at,
        insight: InsightView { id: insight_id, url, title, description, img_path, site_name, icon },
    }
}

// =============================================================================
// CREATE
// =============================================================================

/// Scrape `url`, store it as a new insight, and pin it to `board_id` with the
/// caller's tags. Returns the new pin id.
///
/// # Errors
///
/// Returns `Access` errors for a missing or foreign board and `Scrape` if the
/// page cannot be read.
pub async fn create_pin(
    state: &AppState,
    user_id: Uuid,
    board_id: Uuid,
    url: &str,
    tags: &[String],
) -> Result<Uuid, PinError> {
    precheck_owner(&state.pool, Resource::Board(board_id), user_id).await?;

    let page = state.scraper.scrape(url).await?;
    let pin_img_path = page
        .image_url
        .clone()
        .unwrap_or_else(|| state.images.default_path(PIN_PREFIX));

    let mut tx = state.pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Board(board_id), user_id).await?;

    let insight_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO insights (id, url, title, description, img_path, site_name, icon, main_category_id, open)
         VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, false)",
    )
    .bind(insight_id)
    .bind(url)
    .bind(&page.title)
    .bind(&page.description)
    .bind(&page.image_url)
    .bind(&page.site_name)
    .bind(&page.icon)
    .execute(tx.as_mut())
    .await?;

    let pin_id = insert_pin(&mut tx, board_id, insight_id, &pin_img_path).await?;
    insert_tags(&mut tx, pin_id, tags).await?;
    // A freshly inserted pin is the newest on its board.
    board::set_cover_image(&mut tx, board_id, &pin_img_path).await?;
    tx.commit().await?;

    info!(%pin_id, %board_id, %insight_id, tags = tags.len(), "pin created from url");
    Ok(pin_id)
}

/// Pin an existing insight to `board_id`, tagging it with the insight's
/// category names. Returns the new pin id.
///
/// # Errors
///
/// Returns `Access` errors for a missing or foreign board and
/// `InsightNotFound` if the insight does not exist.
pub async fn create_pin_from_insight(
    state: &AppState,
    user_id: Uuid,
    board_id: Uuid,
    insight_id: Uuid,
) -> Result<Uuid, PinError> {
    let mut tx = state.pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Board(board_id), user_id).await?;

    let (img_path, main_category) = sqlx::query_as::<_, (Option<String>, Option<String>)>(
        "SELECT i.img_path, c.name
         FROM insights i
         LEFT JOIN insight_main_categories c ON c.id = i.main_category_id
         WHERE i.id = $1",
    )
    .bind(insight_id)
    .fetch_optional(tx.as_mut())
    .await?
    .ok_or(PinError::InsightNotFound(insight_id))?;

    let sub_categories = sqlx::query_scalar::<_, String>(
        "SELECT s.name
         FROM insight_sub_category_links l
         JOIN insight_sub_categories s ON s.id = l.sub_category_id
         WHERE l.insight_id = $1
         ORDER BY s.id",
    )
    .bind(insight_id)
    .fetch_all(tx.as_mut())
    .await?;

    let pin_img_path = img_path.unwrap_or_else(|| state.images.default_path(PIN_PREFIX));
    let pin_id = insert_pin(&mut tx, board_id, insight_id, &pin_img_path).await?;
    let tags = category_tags(main_category, sub_categories);
    insert_tags(&mut tx, pin_id, &tags).await?;
    board::set_cover_image(&mut tx, board_id, &pin_img_path).await?;
    tx.commit().await?;

    info!(%pin_id, %board_id, %insight_id, tags = tags.len(), "pin created from insight");
    Ok(pin_id)
}

/// Tags copied from an insight's classification: main category first, then
/// each subcategory. Insights without a main category contribute only their
/// subcategories.
#[must_use]
pub fn category_tags(main_category: Option<String>, sub_categories: Vec<String>) -> Vec<String> {
    main_category.into_iter().chain(sub_categories).collect()
}

// =============================================================================
// UPDATE / DELETE
// =============================================================================

/// Move a pin to `new_board_id`. A move across boards replaces the pin's tags
/// with `tags`; staying on the same board leaves them untouched. Both boards'
/// covers are re-synchronized. Returns the pin id.
///
/// # Errors
///
/// Returns `Access` errors if the caller owns neither the pin's board nor
/// the target board (each checked separately).
pub async fn update_pin(
    state: &AppState,
    user_id: Uuid,
    pin_id: Uuid,
    new_board_id: Uuid,
    tags: &[String],
) -> Result<Uuid, PinError> {
    let mut tx = state.pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Pin(pin_id), user_id).await?;
    access::ensure_owner(&mut tx, Resource::Board(new_board_id), user_id).await?;

    let source_board_id: Uuid = sqlx::query_scalar("SELECT pin_board_id FROM pins WHERE id = $1")
        .bind(pin_id)
        .fetch_one(tx.as_mut())
        .await?;

    let crosses_boards = source_board_id != new_board_id;
    if crosses_boards {
        sqlx::query("DELETE FROM pin_tags WHERE pin_id = $1")
            .bind(pin_id)
            .execute(tx.as_mut())
            .await?;
        insert_tags(&mut tx, pin_id, tags).await?;
    }

    let pin_img_path: String = sqlx::query_scalar(
        "UPDATE pins SET pin_board_id = $2, modified_at = clock_timestamp()
         WHERE id = $1
         RETURNING pin_img_path",
    )
    .bind(pin_id)
    .bind(new_board_id)
    .fetch_one(tx.as_mut())
    .await?;

    let default_cover = state.images.default_path(PIN_BOARD_PREFIX);
    board::recompute_cover_image(&mut tx, source_board_id, &default_cover).await?;
    board::set_cover_image(&mut tx, new_board_id, &pin_img_path).await?;
    tx.commit().await?;

    info!(%pin_id, from = %source_board_id, to = %new_board_id, crosses_boards, "pin updated");
    Ok(pin_id)
}

/// Delete a pin and re-derive its board's cover. Returns the pin id.
///
/// # Errors
///
/// Returns `Access` errors for a missing or foreign pin.
pub async fn delete_pin(state: &AppState, user_id: Uuid, pin_id: Uuid) -> Result<Uuid, PinError> {
    let mut tx = state.pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Pin(pin_id), user_id).await?;

    let board_id: Uuid = sqlx::query_scalar("DELETE FROM pins WHERE id = $1 RETURNING pin_board_id")
        .bind(pin_id)
        .fetch_one(tx.as_mut())
        .await?;

    let default_cover = state.images.default_path(PIN_BOARD_PREFIX);
    let cover = board::recompute_cover_image(&mut tx, board_id, &default_cover).await?;
    tx.commit().await?;

    info!(%pin_id, %board_id, %cover, "pin deleted");
    Ok(pin_id)
}

/// Replace a pin's image and make it its board's cover.
///
/// Ownership is only enforced when the `pin_image_requires_owner` policy is
/// set; otherwise any authenticated caller can replace a pin image.
///
/// # Errors
///
/// Returns `NotFound` for a missing pin, `Forbidden` under the strict
/// policy, and `Store` if the image cannot be written.
pub async fn set_pin_image(
    state: &AppState,
    user_id: Uuid,
    pin_id: Uuid,
    bytes: &[u8],
    content_type: Option<&str>,
) -> Result<PinView, PinError> {
    let require_owner = state.access.pin_image_requires_owner;
    {
        let mut conn = state.pool.acquire().await?;
        if require_owner {
            access::ensure_owner(&mut conn, Resource::Pin(pin_id), user_id).await?;
        } else {
            access::owner_of(&mut conn, Resource::Pin(pin_id)).await?;
        }
    }

    let stored = state.images.store(PIN_PREFIX, pin_id, bytes, content_type).await?;

    let mut tx = state.pool.begin().await?;
    if require_owner {
        access::ensure_owner(&mut tx, Resource::Pin(pin_id), user_id).await?;
    }
    let board_id: Uuid = sqlx::query_scalar(
        "UPDATE pins SET pin_img_path = $2, modified_at = clock_timestamp()
         WHERE id = $1
         RETURNING pin_board_id",
    )
    .bind(pin_id)
    .bind(&stored.public_path)
    .fetch_optional(tx.as_mut())
    .await?
    .ok_or(AccessError::NotFound(Resource::Pin(pin_id)))?;

    board::set_cover_image(&mut tx, board_id, &stored.public_path).await?;
    let view = load_pins(&mut tx, "WHERE x.id = $1", pin_id)
        .await?
        .pop()
        .ok_or(AccessError::NotFound(Resource::Pin(pin_id)))?;
    tx.commit().await?;

    info!(
        %pin_id,
        %board_id,
        location = %stored.write_location.display(),
        "pin image stored"
    );
    Ok(view)
}

// =============================================================================
// READ
// =============================================================================

/// Fetch one pin the caller owns.
///
/// # Errors
///
/// Returns `Access` errors for a missing or foreign pin.
pub async fn get_pin(pool: &PgPool, user_id: Uuid, pin_id: Uuid) -> Result<PinView, PinError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Pin(pin_id), user_id).await?;
    let view = load_pins(&mut tx, "WHERE x.id = $1", pin_id)
        .await?
        .pop()
        .ok_or(AccessError::NotFound(Resource::Pin(pin_id)))?;
    tx.commit().await?;
    Ok(view)
}

/// Every pin across a persona's boards, newest first.
///
/// # Errors
///
/// Returns `Access` errors for a missing or foreign persona.
pub async fn list_pins_by_persona(pool: &PgPool, user_id: Uuid, persona_id: Uuid) -> Result<Vec<PinView>, PinError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Persona(persona_id), user_id).await?;
    let views = load_pins(&mut tx, "WHERE b.persona_id = $1", persona_id).await?;
    tx.commit().await?;
    Ok(views)
}

/// Every pin on one board, newest first.
///
/// # Errors
///
/// Returns `Access` errors for a missing or foreign board.
pub async fn list_pins_by_board(pool: &PgPool, user_id: Uuid, board_id: Uuid) -> Result<Vec<PinView>, PinError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Board(board_id), user_id).await?;
    let views = load_pins(&mut tx, "WHERE x.pin_board_id = $1", board_id).await?;
    tx.commit().await?;
    Ok(views)
}

/// Pins of `persona_id` whose insight title or any tag contains `keyword`
/// (case-sensitive literal substring). Each pin appears once.
///
/// # Errors
///
/// Returns `Access` errors for a missing or foreign persona.
pub async fn search_pins(
    pool: &PgPool,
    user_id: Uuid,
    persona_id: Uuid,
    keyword: &str,
) -> Result<Vec<PinView>, PinError> {
    let mut tx = pool.begin().await?;
    access::ensure_owner(&mut tx, Resource::Persona(persona_id), user_id).await?;

    let by_title = sqlx::query_as::<_, PinTuple>(&format!(
        "{PIN_SELECT} WHERE b.persona_id = $1 AND strpos(i.title, $2) > 0 {NEWEST_CREATED_FIRST}"
    ))
    .bind(persona_id)
    .bind(keyword)
    .fetch_all(tx.as_mut())
    .await?;

    // Tag matches are collected system-wide and narrowed to the persona below.
    let by_tag = sqlx::query_as::<_, PinTuple>(&format!(
        "{PIN_SELECT} WHERE x.id IN (SELECT pin_id FROM pin_tags WHERE strpos(name, $1) > 0) {NEWEST_CREATED_FIRST}"
    ))
    .bind(keyword)
    .fetch_all(tx.as_mut())
    .await?;

    let hits = merge_search_hits(
        by_title.into_iter().map(to_record).collect(),
        by_tag.into_iter().map(to_record).collect(),
        persona_id,
    );
    let views = attach_tags(&mut tx, hits).await?;
    tx.commit().await?;
    Ok(views)
}

/// Union title and tag hits, keep only `persona_id`'s pins, drop duplicate
/// pin ids, and order newest-created first.
pub(crate) fn merge_search_hits(by_title: Vec<PinRecord>, by_tag: Vec<PinRecord>, persona_id: Uuid) -> Vec<PinRecord> {
    let mut seen = HashSet::new();
    let mut merged: Vec<PinRecord> = by_title
        .into_iter()
        .chain(by_tag)
        .filter(|pin| pin.persona_id == persona_id)
        .filter(|pin| seen.insert(pin.id))
        .collect();
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    merged
}

// =============================================================================
// HELPERS
// =============================================================================

async fn precheck_owner(pool: &PgPool, resource: Resource, user_id: Uuid) -> Result<(), PinError> {
    let mut conn = pool.acquire().await?;
    access::ensure_owner(&mut conn, resource, user_id).await?;
    Ok(())
}

async fn insert_pin(
    conn: &mut PgConnection,
    board_id: Uuid,
    insight_id: Uuid,
    pin_img_path: &str,
) -> Result<Uuid, sqlx::Error> {
    let pin_id = Uuid::new_v4();
    sqlx::query("INSERT INTO pins (id, pin_board_id, insight_id, pin_img_path) VALUES ($1, $2, $3, $4)")
        .bind(pin_id)
        .bind(board_id)
        .bind(insight_id)
        .bind(pin_img_path)
        .execute(conn)
        .await?;
    Ok(pin_id)
}

async fn insert_tags(conn: &mut PgConnection, pin_id: Uuid, tags: &[String]) -> Result<(), sqlx::Error> {
    for name in tags {
        sqlx::query("INSERT INTO pin_tags (pin_id, name) VALUES ($1, $2)")
            .bind(pin_id)
            .bind(name)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Load pins matching `filter` (a `WHERE` clause binding `$1`), newest first.
async fn load_pins(conn: &mut PgConnection, filter: &str, id: Uuid) -> Result<Vec<PinView>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PinTuple>(&format!("{PIN_SELECT} {filter} {NEWEST_CREATED_FIRST}"))
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    attach_tags(conn, rows.into_iter().map(to_record).collect()).await
}

async fn attach_tags(conn: &mut PgConnection, records: Vec<PinRecord>) -> Result<Vec<PinView>, sqlx::Error> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    let rows = sqlx::query_as::<_, (Uuid, String)>("SELECT pin_id, name FROM pin_tags WHERE pin_id = ANY($1) ORDER BY id")
        .bind(&ids)
        .fetch_all(conn)
        .await?;

    let mut tags: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (pin_id, name) in rows {
        tags.entry(pin_id).or_default().push(name);
    }

    Ok(records
        .into_iter()
        .map(|r| PinView {
            tags: tags.remove(&r.id).unwrap_or_default(),
            id: r.id,
            pin_board_id: r.pin_board_id,
            persona_id: r.persona_id,
            pin_img_path: r.pin_img_path,
            insight: r.insight,
            created_at: unix_millis(r.created_at),
            modified_at: unix_millis(r.modified_at),
        })
        .collect())
}

#[cfg(test)]
#[path = "pin_test.rs"]
mod tests;
