//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on request translation and auth plumbing. Every
//! public operation runs in one transaction and checks ownership before its
//! first write.

pub mod access;
pub mod board;
pub mod image_store;
pub mod persona;
pub mod pin;
pub mod scrape;
pub mod session;

use time::OffsetDateTime;

/// Milliseconds since the Unix epoch, the timestamp format used in responses.
pub(crate) fn unix_millis(ts: OffsetDateTime) -> i64 {
    i64::try_from(ts.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}
