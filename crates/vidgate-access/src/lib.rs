//! # vidgate Access
//!
//! Access control over the video catalog.
//!
//! ## Overview
//!
//! Users are granted [`AccessRule`](vidgate_core::AccessRule)s by an
//! administrator. Each rule narrows by up to five optional fields (domain,
//! topic, year, month, day); a rule covers a video when every field it sets
//! equals the video's, and a user may view a video when any active rule
//! covers it.
//!
//! ## Key Types
//!
//! - [`AccessEvaluator`] - Permit/deny for a single video
//! - [`CatalogFilter`] - The domains, topics and videos a user may browse
//! - [`AuditHook`] - Fire-and-forget audit recording
//! - [`AuditSink`] - Destination for audit records
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vidgate_access::{AccessEvaluator, CatalogFilter};
//! use vidgate_core::{now_millis, ExpiryPolicy, UserId, VideoId};
//! use vidgate_store::MemoryStore;
//!
//! async fn example(user: UserId, video: VideoId) {
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let evaluator = AccessEvaluator::new(Arc::clone(&store), ExpiryPolicy::default());
//!     let eval = evaluator.evaluate_access(&user, &video, now_millis()).await.unwrap();
//!     if eval.decision.is_permit() {
//!         // stream eval.video
//!     }
//!
//!     let filter = CatalogFilter::new(store, ExpiryPolicy::default());
//!     let catalog = filter.accessible_catalog(&user, now_millis()).await.unwrap();
//!     println!("{} videos visible", catalog.videos.len());
//! }
//! ```

pub mod audit;
pub mod catalog;
pub mod error;
pub mod evaluator;

pub use audit::{AuditHook, AuditSink, StoreAuditSink};
pub use catalog::{Catalog, CatalogFilter};
pub use error::{AccessError, Result};
pub use evaluator::{evaluate, matching_rule, AccessEvaluator, Decision, DenyReason, Evaluation};
