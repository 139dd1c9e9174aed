//! # vidgate testkit
//!
//! Testing utilities for vidgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for videos, scopes, and whole catalogs
//! - **Fixtures**: A seeded in-memory store for access scenarios
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vidgate_testkit::generators::{expected_matches, CatalogParams};
//!
//! proptest! {
//!     #[test]
//!     fn blanket_scope_sees_everything(params: CatalogParams) {
//!         let all = expected_matches(&params.videos, &[RuleScope::blanket()]);
//!         prop_assert_eq!(all.len(), params.videos.len());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use vidgate_testkit::fixtures::CatalogFixture;
//!
//! let fixture = CatalogFixture::new().await?;
//! let video = fixture.add_video("Lecture 1", (2024, 3, 1), "lecture-1.mp4").await?;
//! fixture.grant(RuleScope::blanket().year(2024), None).await?;
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::CatalogFixture;
pub use generators::{expected_matches, CatalogParams};
