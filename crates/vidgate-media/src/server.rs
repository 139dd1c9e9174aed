//! The range streaming server.
//!
//! [`MediaServer`] performs no authorization; callers decide access first.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use vidgate_core::Video;

use crate::error::{MediaError, Result};
use crate::range::{parse_range, ByteRange};
use crate::source::StorageLocation;

/// Content type sent for every locally served video.
pub const CONTENT_TYPE: &str = "video/mp4";

/// A reader positioned at the first byte to send and limited to the
/// bytes to send. Nothing outside the window is ever read.
pub type MediaBody = Take<File>;

/// How to answer a stream request.
#[derive(Debug)]
pub enum MediaResponse {
    /// Send the client to an external store.
    Redirect(String),
    /// The whole file.
    Full { size: u64, body: MediaBody },
    /// One byte window of a file of `size` bytes.
    Partial {
        range: ByteRange,
        size: u64,
        body: MediaBody,
    },
}

impl MediaResponse {
    /// Bytes the body will yield. Zero for redirects.
    pub fn content_length(&self) -> u64 {
        match self {
            MediaResponse::Redirect(_) => 0,
            MediaResponse::Full { size, .. } => *size,
            MediaResponse::Partial { range, .. } => range.len(),
        }
    }
}

/// Serves video bytes from an uploads directory.
#[derive(Debug, Clone)]
pub struct MediaServer {
    uploads_dir: PathBuf,
}

impl MediaServer {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Prepare a response for `video`, honoring an optional `Range` header.
    ///
    /// External references redirect without touching the filesystem. An
    /// unusable `Range` header yields the full file.
    pub async fn serve(&self, video: &Video, range: Option<&str>) -> Result<MediaResponse> {
        let path = match StorageLocation::resolve(&video.storage_ref, &self.uploads_dir)? {
            StorageLocation::External(url) => return Ok(MediaResponse::Redirect(url)),
            StorageLocation::Local(path) => path,
        };

        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MediaError::FileNotFound(video.storage_ref.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(MediaError::FileNotFound(video.storage_ref.clone()));
        }
        let size = metadata.len();

        match range.and_then(|header| parse_range(header, size)) {
            Some(range) => {
                file.seek(SeekFrom::Start(range.start)).await?;
                Ok(MediaResponse::Partial {
                    range,
                    size,
                    body: file.take(range.len()),
                })
            }
            None => {
                if let Some(header) = range {
                    tracing::debug!(range = header, size, "unusable range, serving full file");
                }
                Ok(MediaResponse::Full {
                    size,
                    body: file.take(size),
                })
            }
        }
    }
}
