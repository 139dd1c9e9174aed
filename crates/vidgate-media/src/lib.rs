//! # vidgate Media
//!
//! Delivery of video bytes with HTTP byte-range support.
//!
//! Videos stored in an external object store are answered with a redirect.
//! Local files are read from the uploads directory; a single
//! `Range: bytes=start-[end]` request yields just that window, anything
//! else yields the whole file.
//!
//! ```rust,no_run
//! use vidgate_core::Video;
//! use vidgate_media::{MediaResponse, MediaServer};
//!
//! async fn example(video: Video) {
//!     let server = MediaServer::new("uploads");
//!     match server.serve(&video, Some("bytes=0-1023")).await.unwrap() {
//!         MediaResponse::Redirect(url) => println!("redirect to {}", url),
//!         MediaResponse::Full { size, .. } => println!("{} bytes", size),
//!         MediaResponse::Partial { range, size, .. } => println!("{}", range.content_range(size)),
//!     }
//! }
//! ```

pub mod error;
pub mod range;
pub mod server;
pub mod source;

pub use error::{MediaError, Result};
pub use range::{parse_range, ByteRange};
pub use server::{MediaBody, MediaResponse, MediaServer, CONTENT_TYPE};
pub use source::{is_external, StorageLocation};
