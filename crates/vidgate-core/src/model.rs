//! Catalog and account entities.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{DomainId, TopicId, UserId, VideoId};

/// Role attached to an authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Parse a role name as sent by the identity provider.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Account status. Disabled accounts are refused regardless of rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(UserStatus::Active),
            "disabled" => Some(UserStatus::Disabled),
            _ => None,
        }
    }
}

/// A user account, as far as access control needs to know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: i64,
}

impl User {
    /// Create an active account with the given role.
    pub fn new(email: impl Into<String>, role: Role, created_at: i64) -> Self {
        Self {
            id: UserId::generate(),
            email: email.into(),
            role,
            status: UserStatus::Active,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Top level of the catalog hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

impl Domain {
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: DomainId::generate(),
            name: name.into(),
            description: None,
            created_at,
        }
    }
}

/// A topic, always owned by exactly one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub domain: DomainId,
    pub description: Option<String>,
    pub created_at: i64,
}

impl Topic {
    pub fn new(name: impl Into<String>, domain: DomainId, created_at: i64) -> Self {
        Self {
            id: TopicId::generate(),
            name: name.into(),
            domain,
            description: None,
            created_at,
        }
    }
}

/// A video in the catalog.
///
/// `domain`, `topic`, `year`, `month` and `day` are the access-relevant
/// fields. Changing them after creation silently changes which rules
/// match, so nothing in vidgate mutates them once the video is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    pub description: Option<String>,
    pub domain: DomainId,
    pub topic: TopicId,
    pub year: i32,
    pub month: u8,
    pub day: u8,
    /// Either an absolute `http(s)://` URL or a path relative to the
    /// uploads directory.
    pub storage_ref: String,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub created_at: i64,
}

impl Video {
    /// Create a video, validating its calendar date.
    pub fn new(
        title: impl Into<String>,
        domain: DomainId,
        topic: TopicId,
        (year, month, day): (i32, u8, u8),
        storage_ref: impl Into<String>,
        created_at: i64,
    ) -> Result<Self> {
        if year <= 0 || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(CoreError::InvalidDate { year, month, day });
        }

        Ok(Self {
            id: VideoId::generate(),
            title: title.into(),
            description: None,
            domain,
            topic,
            year,
            month,
            day,
            storage_ref: storage_ref.into(),
            mime_type: None,
            size: None,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_rejects_bad_date() {
        let d = DomainId::generate();
        let t = TopicId::generate();

        assert!(Video::new("ok", d, t, (2024, 2, 29), "a.mp4", 0).is_ok());
        assert!(matches!(
            Video::new("bad", d, t, (2024, 13, 1), "a.mp4", 0),
            Err(CoreError::InvalidDate { month: 13, .. })
        ));
        assert!(Video::new("bad", d, t, (2024, 1, 0), "a.mp4", 0).is_err());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" user "), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn test_new_user_is_active() {
        let user = User::new("a@example.com", Role::User, 0);
        assert!(user.is_active());
        assert_eq!(user.status.as_str(), "active");
    }
}
