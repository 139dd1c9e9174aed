//! Caller identity.
//!
//! Sessions are issued elsewhere. The gateway only needs the caller's user
//! id and role, which an [`IdentityProvider`] reads off the request.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};
use vidgate_core::{Role, UserId};

use crate::config::IdentityConfig;
use crate::error::{GatewayError, Result};

/// An authenticated caller as asserted by the session provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

/// Extracts the caller's identity from request headers.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` when the request carries no usable identity.
    async fn identify(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Trusts identity headers set by an upstream proxy.
///
/// The user header carries the hex user id; the role header is optional
/// and defaults to [`Role::User`]. Deploy only behind a proxy that strips
/// these headers from client requests.
#[derive(Debug, Clone)]
pub struct TrustedHeaderIdentity {
    user_header: HeaderName,
    role_header: HeaderName,
}

impl TrustedHeaderIdentity {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        Ok(Self {
            user_header: header_name(&config.user_header)?,
            role_header: header_name(&config.role_header)?,
        })
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| GatewayError::Config(format!("invalid header name {:?}: {}", name, e)))
}

#[async_trait]
impl IdentityProvider for TrustedHeaderIdentity {
    async fn identify(&self, headers: &HeaderMap) -> Option<Principal> {
        let user = headers.get(&self.user_header)?.to_str().ok()?;
        let user_id = UserId::from_hex(user.trim()).ok()?;

        let role = match headers.get(&self.role_header) {
            None => Role::User,
            Some(value) => Role::parse(value.to_str().ok()?)?,
        };

        Some(Principal { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn provider() -> TrustedHeaderIdentity {
        TrustedHeaderIdentity::new(&IdentityConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_identify_user_and_role() {
        let id = UserId::generate();
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_str(&id.to_hex()).unwrap());
        headers.insert("x-user-role", HeaderValue::from_static("Admin"));

        let principal = provider().identify(&headers).await.unwrap();
        assert_eq!(principal.user_id, id);
        assert_eq!(principal.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_role_defaults_to_user() {
        let id = UserId::generate();
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_str(&id.to_hex()).unwrap());

        let principal = provider().identify(&headers).await.unwrap();
        assert_eq!(principal.role, Role::User);
    }

    #[tokio::test]
    async fn test_missing_or_bad_identity() {
        let p = provider();
        assert!(p.identify(&HeaderMap::new()).await.is_none());

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("not-hex"));
        assert!(p.identify(&headers).await.is_none());

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-user-id",
            HeaderValue::from_str(&UserId::generate().to_hex()).unwrap(),
        );
        headers.insert("x-user-role", HeaderValue::from_static("superuser"));
        assert!(p.identify(&headers).await.is_none());
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let config = IdentityConfig {
            user_header: "bad header".into(),
            ..IdentityConfig::default()
        };
        assert!(matches!(
            TrustedHeaderIdentity::new(&config),
            Err(GatewayError::Config(_))
        ));
    }
}
