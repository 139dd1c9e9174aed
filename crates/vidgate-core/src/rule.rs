//! Access rules and their scope.
//!
//! An access rule grants one user the right to view every video its scope
//! covers until the rule expires. The scope narrows by up to five fields;
//! each unset field matches any value.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::model::Video;
use crate::types::{DomainId, RuleId, TopicId, UserId};

/// Expiry stored for permanent rules.
pub const PERMANENT_EXPIRY: i64 = i64::MAX;

/// Scope of an access rule.
///
/// `None` is the wildcard for that field. A scope with every field unset is
/// a blanket grant over the whole catalog; that is valid and intended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleScope {
    pub domain: Option<DomainId>,
    pub topic: Option<TopicId>,
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl RuleScope {
    /// A scope that matches every video.
    pub fn blanket() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: DomainId) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn topic(mut self, topic: TopicId) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: u8) -> Self {
        self.month = Some(month);
        self
    }

    pub fn day(mut self, day: u8) -> Self {
        self.day = Some(day);
        self
    }

    /// Whether no field is set.
    pub fn is_blanket(&self) -> bool {
        self.domain.is_none()
            && self.topic.is_none()
            && self.year.is_none()
            && self.month.is_none()
            && self.day.is_none()
    }

    /// Check if this scope covers a video.
    ///
    /// Every present field must equal the video's field; absent fields
    /// match anything.
    pub fn matches(&self, video: &Video) -> bool {
        field_matches(self.domain, video.domain)
            && field_matches(self.topic, video.topic)
            && field_matches(self.year, video.year)
            && field_matches(self.month, video.month)
            && field_matches(self.day, video.day)
    }

    /// Reject values no video can carry.
    pub fn validate(&self) -> Result<()> {
        if let Some(year) = self.year {
            if year <= 0 {
                return Err(CoreError::InvalidScope(format!("year {} out of range", year)));
            }
        }
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(CoreError::InvalidScope(format!("month {} out of range", month)));
            }
        }
        if let Some(day) = self.day {
            if !(1..=31).contains(&day) {
                return Err(CoreError::InvalidScope(format!("day {} out of range", day)));
            }
        }
        Ok(())
    }
}

fn field_matches<T: PartialEq>(filter: Option<T>, value: T) -> bool {
    match filter {
        None => true,
        Some(wanted) => wanted == value,
    }
}

/// How permanent rules interact with the expiry check.
///
/// The rule record carries both `expires_at` and `is_permanent`.
/// `HonorPermanent` treats a permanent rule as active whatever its expiry.
/// `Strict` compares `expires_at` only, ignoring the flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    Strict,
    #[default]
    HonorPermanent,
}

/// A persisted access grant.
///
/// Rules are never mutated: they are created, and later deleted or left
/// to expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    pub id: RuleId,
    pub user: UserId,
    #[serde(flatten)]
    pub scope: RuleScope,
    /// Expiry in Unix milliseconds. The rule is active while `now < expires_at`.
    pub expires_at: i64,
    pub is_permanent: bool,
    pub created_at: i64,
}

impl AccessRule {
    /// Create a rule that expires at the given time.
    pub fn expiring(user: UserId, scope: RuleScope, expires_at: i64, created_at: i64) -> Self {
        Self {
            id: RuleId::generate(),
            user,
            scope,
            expires_at,
            is_permanent: false,
            created_at,
        }
    }

    /// Create a rule that never expires.
    pub fn permanent(user: UserId, scope: RuleScope, created_at: i64) -> Self {
        Self {
            id: RuleId::generate(),
            user,
            scope,
            expires_at: PERMANENT_EXPIRY,
            is_permanent: true,
            created_at,
        }
    }

    /// Check if this rule is in force at `now`.
    ///
    /// The comparison is strict: a rule expiring exactly at `now` is expired.
    pub fn is_active(&self, now: i64, policy: ExpiryPolicy) -> bool {
        if self.is_permanent && policy == ExpiryPolicy::HonorPermanent {
            return true;
        }
        self.expires_at > now
    }

    /// Check if this rule covers a video, ignoring expiry.
    pub fn matches(&self, video: &Video) -> bool {
        self.scope.matches(video)
    }
}
