//! Storage reference resolution.

use std::path::{Component, Path, PathBuf};

use crate::error::{MediaError, Result};

/// Where a video's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// An external object store URL. Bytes are never proxied.
    External(String),
    /// A file under the uploads directory.
    Local(PathBuf),
}

impl StorageLocation {
    /// Resolve a stored reference.
    ///
    /// `http://` and `https://` references (any case) are external.
    /// Everything else is a path relative to `uploads_dir`; references that
    /// are absolute or climb with `..` resolve to nothing.
    pub fn resolve(storage_ref: &str, uploads_dir: &Path) -> Result<Self> {
        if is_external(storage_ref) {
            return Ok(StorageLocation::External(storage_ref.to_string()));
        }

        let relative = Path::new(storage_ref);
        let contained = !storage_ref.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(MediaError::FileNotFound(storage_ref.to_string()));
        }

        Ok(StorageLocation::Local(uploads_dir.join(relative)))
    }
}

/// Whether a reference points at an external object store.
pub fn is_external(storage_ref: &str) -> bool {
    has_prefix_ignore_case(storage_ref, "http://") || has_prefix_ignore_case(storage_ref, "https://")
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
