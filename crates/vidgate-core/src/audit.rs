//! Audit records.
//!
//! Audit records are append-only. Each action has exactly one detail shape,
//! so the payload is a tagged enum rather than an open map.

use serde::{Deserialize, Serialize};

use crate::rule::RuleScope;
use crate::types::{AuditId, RuleId, UserId, VideoId};

/// IP recorded when the caller address is absent.
pub const UNKNOWN_IP: &str = "Unknown";

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A user was permitted to stream a video.
    WatchVideo,
    /// An administrator granted an access rule.
    GrantAccess,
    /// An administrator deleted an access rule.
    RevokeAccess,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::WatchVideo => "WATCH_VIDEO",
            AuditAction::GrantAccess => "GRANT_ACCESS",
            AuditAction::RevokeAccess => "REVOKE_ACCESS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WATCH_VIDEO" => Some(AuditAction::WatchVideo),
            "GRANT_ACCESS" => Some(AuditAction::GrantAccess),
            "REVOKE_ACCESS" => Some(AuditAction::RevokeAccess),
            _ => None,
        }
    }
}

/// Structured detail attached to an audit record, one shape per action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditDetail {
    WatchVideo {
        video_id: VideoId,
        title: String,
    },
    GrantAccess {
        rule_id: RuleId,
        grantee: UserId,
        scope: RuleScope,
        expires_at: i64,
        is_permanent: bool,
    },
    RevokeAccess {
        rule_id: RuleId,
    },
}

impl AuditDetail {
    /// The action this detail belongs to.
    pub fn action(&self) -> AuditAction {
        match self {
            AuditDetail::WatchVideo { .. } => AuditAction::WatchVideo,
            AuditDetail::GrantAccess { .. } => AuditAction::GrantAccess,
            AuditDetail::RevokeAccess { .. } => AuditAction::RevokeAccess,
        }
    }
}

/// A persisted audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    pub action: AuditAction,
    pub user: UserId,
    pub detail: AuditDetail,
    /// Normalized caller address, see [`normalize_ip`].
    pub ip: String,
    /// Server-assigned, Unix milliseconds.
    pub timestamp: i64,
}

impl AuditRecord {
    /// Build a record, normalizing the caller address.
    pub fn new(user: UserId, detail: AuditDetail, ip: Option<&str>, timestamp: i64) -> Self {
        Self {
            id: AuditId::generate(),
            action: detail.action(),
            user,
            detail,
            ip: normalize_ip(ip),
            timestamp,
        }
    }
}

/// Normalize a caller address for storage.
///
/// `::1` becomes `127.0.0.1`, IPv4-mapped IPv6 addresses lose their
/// `::ffff:` prefix, and a missing or empty address becomes `"Unknown"`.
/// Anything else is kept verbatim.
pub fn normalize_ip(ip: Option<&str>) -> String {
    let ip = match ip {
        Some(ip) if !ip.is_empty() => ip,
        _ => return UNKNOWN_IP.to_string(),
    };

    if ip == "::1" {
        return "127.0.0.1".to_string();
    }
    if let Some(v4) = ip.strip_prefix("::ffff:") {
        return v4.to_string();
    }
    ip.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ip() {
        assert_eq!(normalize_ip(Some("::1")), "127.0.0.1");
        assert_eq!(normalize_ip(Some("::ffff:10.0.0.5")), "10.0.0.5");
        assert_eq!(normalize_ip(Some("")), "Unknown");
        assert_eq!(normalize_ip(None), "Unknown");
        assert_eq!(normalize_ip(Some("192.168.1.7")), "192.168.1.7");
        assert_eq!(normalize_ip(Some("2001:db8::1")), "2001:db8::1");
    }

    #[test]
    fn test_record_action_follows_detail() {
        let detail = AuditDetail::RevokeAccess {
            rule_id: RuleId::generate(),
        };
        let record = AuditRecord::new(UserId::generate(), detail, Some("::1"), 42);

        assert_eq!(record.action, AuditAction::RevokeAccess);
        assert_eq!(record.ip, "127.0.0.1");
        assert_eq!(record.timestamp, 42);
    }

    #[test]
    fn test_action_names() {
        for action in [
            AuditAction::WatchVideo,
            AuditAction::GrantAccess,
            AuditAction::RevokeAccess,
        ] {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(AuditAction::WatchVideo.as_str(), "WATCH_VIDEO");
    }
}
