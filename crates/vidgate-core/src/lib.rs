//! # vidgate Core
//!
//! Pure data model for vidgate: the catalog hierarchy (domains, topics,
//! videos), time-boxed access rules, and audit records.
//!
//! This crate contains no I/O, no storage, no networking. Everything here
//! is plain data plus the matching logic that decides whether a rule's
//! scope covers a video.
//!
//! ## Key Types
//!
//! - [`Video`] - A catalog entry with a domain, topic and calendar date
//! - [`AccessRule`] - A grant scoping a user to an optional domain/topic/date
//! - [`RuleScope`] - The five optional scoping fields of a rule
//! - [`ExpiryPolicy`] - How `is_permanent` interacts with `expires_at`
//! - [`AuditRecord`] - An append-only audit event
//!
//! ## Matching
//!
//! A rule matches a video iff every scoping field the rule sets equals the
//! video's corresponding field. Unset fields are wildcards, so a rule with
//! no fields set is a blanket grant.

pub mod audit;
pub mod error;
pub mod model;
pub mod rule;
pub mod types;

pub use audit::{normalize_ip, AuditAction, AuditDetail, AuditRecord, UNKNOWN_IP};
pub use error::{CoreError, Result};
pub use model::{Domain, Role, Topic, User, UserStatus, Video};
pub use rule::{AccessRule, ExpiryPolicy, RuleScope, PERMANENT_EXPIRY};
pub use types::{AuditId, DomainId, IdParseError, RuleId, TopicId, UserId, VideoId};

/// Milliseconds in one day, used to turn a grant duration into an expiry.
pub const DAY_MILLIS: i64 = 86_400_000;

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
