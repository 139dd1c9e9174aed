//! # vidgate Store
//!
//! Storage abstraction for vidgate. Provides a trait-based interface for
//! users, the catalog hierarchy, access rules and the audit log, with SQLite
//! and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`StoreExt`] - Derived queries built on top of [`Store`]
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a record
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vidgate_core::{now_millis, ExpiryPolicy, UserId};
//! use vidgate_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("vidgate.db").unwrap();
//!
//!     let user = UserId::generate();
//!     let rules = store
//!         .active_rules(&user, now_millis(), ExpiryPolicy::default())
//!         .await
//!         .unwrap();
//!     assert!(rules.is_empty());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting a record whose id exists returns `AlreadyExists`
//! - **Set semantics for scopes**: `videos_matching` takes the union of all scopes
//!   in one query; a video covered by several rules appears once
//! - **Expiry at read time**: expired rules stay in storage until deleted

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store, StoreExt};
