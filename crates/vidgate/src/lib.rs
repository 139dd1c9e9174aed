//! # vidgate
//!
//! Access-controlled video delivery: administrators grant users time-boxed,
//! scoped access rules, and users browse and stream only what their rules
//! cover.
//!
//! ## Overview
//!
//! - **Rules**: Each rule narrows by optional domain, topic, year, month and
//!   day. Unset fields are wildcards; a rule with none set covers everything.
//! - **Evaluation**: Rules are re-read on every request. A video is visible
//!   when any active rule covers it.
//! - **Streaming**: Local files honor single byte ranges; external storage
//!   references are answered with a redirect.
//! - **Audit**: Each permitted stream is recorded in the background.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vidgate::{Gateway, GatewayConfig};
//! use vidgate::core::{UserId, VideoId};
//! use vidgate::store::SqliteStore;
//!
//! async fn example(user: UserId, video: VideoId) {
//!     let store = SqliteStore::open("vidgate.db").unwrap();
//!     let gateway = Gateway::new(store, GatewayConfig::default());
//!
//!     let catalog = gateway.accessible_catalog(&user).await.unwrap();
//!     println!("{} videos visible", catalog.videos.len());
//!
//!     let media = gateway
//!         .stream_for_user(&user, &video, Some("bytes=0-1023"), None)
//!         .await
//!         .unwrap();
//!     println!("{} bytes to send", media.content_length());
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `vidgate::core` - Data model (ids, videos, rules, audit records)
//! - `vidgate::store` - Storage abstraction and SQLite
//! - `vidgate::access` - Access evaluation and catalog filtering
//! - `vidgate::media` - Byte-range delivery

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod identity;

// Re-export component crates
pub use vidgate_access as access;
pub use vidgate_core as core;
pub use vidgate_media as media;
pub use vidgate_store as store;

// Re-export main types for convenience
pub use config::{GatewayConfig, IdentityConfig, ServerConfig};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GrantRequest};
pub use http::{router, AppState};
pub use identity::{IdentityProvider, Principal, TrustedHeaderIdentity};
