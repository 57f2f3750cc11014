//! Image storage — persists uploaded images and hands back public paths.
//!
//! DESIGN
//! ======
//! Images are keyed by `(prefix, owner_id)`, so re-uploading for the same pin
//! overwrites the previous file. The public path carries a short content
//! digest as a query string so clients never keep serving a stale cached
//! copy after an overwrite.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::services::session::bytes_to_hex;

pub const PIN_PREFIX: &str = "pin";
pub const PIN_BOARD_PREFIX: &str = "pinboard";

const DEFAULT_IMAGE_FILE: &str = "default.png";
const DIGEST_HEX_LEN: usize = 12;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("image body is empty")]
    Empty,
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("image write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful store: the path clients use, and where the bytes landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub public_path: String,
    pub write_location: PathBuf,
}

#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(
        &self,
        prefix: &str,
        owner_id: Uuid,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<StoredImage, StoreError>;

    /// Public path of the placeholder image for `prefix`.
    fn default_path(&self, prefix: &str) -> String;
}

// =============================================================================
// LOCAL FILESYSTEM
// =============================================================================

pub struct LocalImageStore {
    root: PathBuf,
    public_base: String,
}

impl LocalImageStore {
    #[must_use]
    pub fn new(root: PathBuf, public_base: impl Into<String>) -> Self {
        Self { root, public_base: public_base.into() }
    }
}

#[async_trait::async_trait]
impl ImageStore for LocalImageStore {
    async fn store(
        &self,
        prefix: &str,
        owner_id: Uuid,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<StoredImage, StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::Empty);
        }
        let ext = image_extension(content_type, bytes)?;

        let dir = self.root.join(prefix);
        tokio::fs::create_dir_all(&dir).await?;
        let write_location = dir.join(format!("{owner_id}.{ext}"));
        tokio::fs::write(&write_location, bytes).await?;

        let digest = Sha256::digest(bytes);
        let mut version = bytes_to_hex(&digest);
        version.truncate(DIGEST_HEX_LEN);

        Ok(StoredImage {
            public_path: format!("{}/{prefix}/{owner_id}.{ext}?v={version}", self.public_base),
            write_location,
        })
    }

    fn default_path(&self, prefix: &str) -> String {
        format!("{}/{prefix}/{DEFAULT_IMAGE_FILE}", self.public_base)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Pick a file extension from the declared content type, falling back to
/// sniffing magic bytes when the type is missing or generic.
pub(crate) fn image_extension(content_type: Option<&str>, bytes: &[u8]) -> Result<&'static str, StoreError> {
    let declared = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    match declared.as_deref() {
        Some("image/png") => Ok("png"),
        Some("image/jpeg" | "image/jpg") => Ok("jpg"),
        Some("image/gif") => Ok("gif"),
        Some("image/webp") => Ok("webp"),
        Some(other) => Err(StoreError::UnsupportedType(other.to_owned())),
        None => sniff_extension(bytes).ok_or_else(|| StoreError::UnsupportedType("unknown".into())),
    }
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF8") {
        Some("gif")
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

#[cfg(test)]
#[path = "image_store_test.rs"]
mod tests;
