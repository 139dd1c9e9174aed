//! The Gateway: access-controlled entry point to the catalog.
//!
//! The Gateway brings together access evaluation, catalog filtering, media
//! delivery and audit recording behind one interface. It is transport
//! agnostic; the HTTP layer in [`crate::http`] is a thin shell over it.

use std::sync::Arc;

use serde::Deserialize;
use vidgate_access::{
    AccessEvaluator, AuditHook, AuditSink, Catalog, CatalogFilter, Decision, DenyReason,
    StoreAuditSink,
};
use vidgate_core::{
    now_millis, AccessRule, AuditDetail, AuditRecord, Role, RuleId, RuleScope, User, UserId,
    VideoId, DAY_MILLIS,
};
use vidgate_media::{MediaResponse, MediaServer};
use vidgate_store::Store;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::identity::Principal;

/// An administrator's request to grant access.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub user_id: UserId,
    #[serde(flatten)]
    pub scope: RuleScope,
    /// Lifetime of the rule in days. Ignored for permanent rules.
    #[serde(default)]
    pub duration_days: Option<u32>,
    #[serde(default)]
    pub permanent: bool,
}

/// The main Gateway struct.
///
/// Provides a unified API for:
/// - Resolving callers to active accounts
/// - Browsing the accessible catalog
/// - Streaming videos, with or without a rule check
/// - Granting, listing and revoking access rules
pub struct Gateway<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: GatewayConfig,
    evaluator: AccessEvaluator<S>,
    catalog: CatalogFilter<S>,
    media: MediaServer,
    audit: AuditHook,
}

impl<S: Store + 'static> Gateway<S> {
    /// Create a gateway that records audit events in the same store.
    pub fn new(store: S, config: GatewayConfig) -> Self {
        let store = Arc::new(store);
        let sink = Arc::new(StoreAuditSink::new(Arc::clone(&store)));
        Self::with_audit_sink(store, config, sink)
    }

    /// Create a gateway with a separate audit destination.
    pub fn with_audit_sink(store: Arc<S>, config: GatewayConfig, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            evaluator: AccessEvaluator::new(Arc::clone(&store), config.expiry_policy),
            catalog: CatalogFilter::new(Arc::clone(&store), config.expiry_policy),
            media: MediaServer::new(config.uploads_dir.clone()),
            audit: AuditHook::new(sink),
            store,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a principal to its account.
    ///
    /// Unknown accounts are unauthenticated; disabled accounts are refused.
    pub async fn authenticate(&self, principal: &Principal) -> Result<User> {
        self.active_account(&principal.user_id).await
    }

    async fn active_account(&self, id: &UserId) -> Result<User> {
        let user = self
            .store
            .get_user(id)
            .await?
            .ok_or(GatewayError::Unauthenticated)?;

        if !user.is_active() {
            return Err(GatewayError::AccountDisabled(user.id));
        }
        Ok(user)
    }

    /// Resolve a principal that must be an administrator.
    ///
    /// Both the asserted role and the stored account role must be admin.
    pub async fn authorize_admin(&self, principal: &Principal) -> Result<User> {
        let user = self.authenticate(principal).await?;
        if principal.role != Role::Admin || user.role != Role::Admin {
            return Err(GatewayError::NotAdmin);
        }
        Ok(user)
    }

    /// Ensure an admin account exists for `email`, creating it if needed.
    pub async fn seed_admin(&self, email: &str) -> Result<User> {
        if let Some(existing) = self.store.find_user_by_email(email).await? {
            return Ok(existing);
        }

        let admin = User::new(email, Role::Admin, now_millis());
        self.store.insert_user(&admin).await?;
        tracing::info!(user = %admin.id, email, "created admin account");
        Ok(admin)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Viewing
    // ─────────────────────────────────────────────────────────────────────────

    /// The domains, topics and videos `user` may browse right now.
    ///
    /// Unknown and disabled accounts are refused whatever rules they hold.
    pub async fn accessible_catalog(&self, user: &UserId) -> Result<Catalog> {
        self.active_account(user).await?;
        Ok(self.catalog.accessible_catalog(user, now_millis()).await?)
    }

    /// Stream a video after checking the user's rules.
    ///
    /// On permit a `WATCH_VIDEO` event is recorded in the background before
    /// any bytes are resolved.
    pub async fn stream_for_user(
        &self,
        user: &UserId,
        video_id: &VideoId,
        range: Option<&str>,
        ip: Option<&str>,
    ) -> Result<MediaResponse> {
        let eval = self
            .evaluator
            .evaluate_access(user, video_id, now_millis())
            .await?;

        match eval.decision {
            Decision::Permit => {}
            Decision::Deny(reason) => {
                tracing::debug!(user = %user, video = %video_id, ?reason, "stream denied");
                return Err(match reason {
                    DenyReason::NoMatchingRule => GatewayError::AccessDenied,
                    DenyReason::AccountDisabled => GatewayError::AccountDisabled(*user),
                    DenyReason::UnknownUser => GatewayError::Unauthenticated,
                });
            }
        }

        self.audit.fire(
            *user,
            AuditDetail::WatchVideo {
                video_id: eval.video.id,
                title: eval.video.title.clone(),
            },
            ip,
        );

        Ok(self.media.serve(&eval.video, range).await?)
    }

    /// Stream a video with no rule check. Callers must be administrators.
    pub async fn stream_for_admin(
        &self,
        video_id: &VideoId,
        range: Option<&str>,
    ) -> Result<MediaResponse> {
        let video = self
            .store
            .get_video(video_id)
            .await?
            .ok_or(GatewayError::VideoNotFound(*video_id))?;

        Ok(self.media.serve(&video, range).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rule Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant a rule on behalf of `admin`.
    pub async fn grant_access(
        &self,
        admin: &UserId,
        request: GrantRequest,
        ip: Option<&str>,
    ) -> Result<AccessRule> {
        request.scope.validate()?;

        if self.store.get_user(&request.user_id).await?.is_none() {
            return Err(GatewayError::UserNotFound(request.user_id));
        }

        let now = now_millis();
        let rule = if request.permanent {
            AccessRule::permanent(request.user_id, request.scope, now)
        } else {
            let days = match request.duration_days {
                Some(days) if days > 0 => days,
                _ => {
                    return Err(GatewayError::InvalidRequest(
                        "durationDays must be a positive number of days".into(),
                    ))
                }
            };
            let expires_at = now.saturating_add(i64::from(days) * DAY_MILLIS);
            AccessRule::expiring(request.user_id, request.scope, expires_at, now)
        };

        self.store.insert_rule(&rule).await?;

        self.audit.fire(
            *admin,
            AuditDetail::GrantAccess {
                rule_id: rule.id,
                grantee: rule.user,
                scope: rule.scope.clone(),
                expires_at: rule.expires_at,
                is_permanent: rule.is_permanent,
            },
            ip,
        );

        Ok(rule)
    }

    /// Every rule held by `user`, expired ones included, oldest first.
    pub async fn rules_for(&self, user: &UserId) -> Result<Vec<AccessRule>> {
        Ok(self.store.rules_for_user(user).await?)
    }

    /// Delete a rule on behalf of `admin`. Returns the deleted rule.
    pub async fn revoke_access(
        &self,
        admin: &UserId,
        rule_id: &RuleId,
        ip: Option<&str>,
    ) -> Result<AccessRule> {
        let rule = self
            .store
            .get_rule(rule_id)
            .await?
            .ok_or(GatewayError::RuleNotFound(*rule_id))?;

        if !self.store.delete_rule(rule_id).await? {
            return Err(GatewayError::RuleNotFound(*rule_id));
        }

        self.audit
            .fire(*admin, AuditDetail::RevokeAccess { rule_id: rule.id }, ip);

        Ok(rule)
    }

    /// Most recent audit records, newest first.
    pub async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        Ok(self.store.recent_audit(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidgate_core::{AuditAction, Domain, ExpiryPolicy, Topic, UserStatus, Video};
    use vidgate_store::MemoryStore;

    struct Setup {
        gateway: Gateway<MemoryStore>,
        viewer: User,
        admin: User,
        video: Video,
        _uploads: tempfile::TempDir,
    }

    async fn setup() -> Setup {
        let uploads = tempfile::tempdir().unwrap();
        std::fs::write(uploads.path().join("intro.mp4"), vec![7u8; 1000]).unwrap();

        let store = MemoryStore::new();
        let viewer = User::new("viewer@example.com", Role::User, 0);
        let admin = User::new("admin@example.com", Role::Admin, 0);
        let domain = Domain::new("Physics", 0);
        let topic = Topic::new("Optics", domain.id, 0);
        let video = Video::new("Intro", domain.id, topic.id, (2024, 5, 1), "intro.mp4", 1).unwrap();

        store.insert_user(&viewer).await.unwrap();
        store.insert_user(&admin).await.unwrap();
        store.insert_domain(&domain).await.unwrap();
        store.insert_topic(&topic).await.unwrap();
        store.insert_video(&video).await.unwrap();

        let config = GatewayConfig {
            expiry_policy: ExpiryPolicy::HonorPermanent,
            uploads_dir: uploads.path().to_path_buf(),
        };

        Setup {
            gateway: Gateway::new(store, config),
            viewer,
            admin,
            video,
            _uploads: uploads,
        }
    }

    fn grant(user: UserId, scope: RuleScope, days: Option<u32>, permanent: bool) -> GrantRequest {
        GrantRequest {
            user_id: user,
            scope,
            duration_days: days,
            permanent,
        }
    }

    async fn settle() {
        // Let detached audit tasks run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_stream_denied_without_rules() {
        let s = setup().await;
        let err = s
            .gateway
            .stream_for_user(&s.viewer.id, &s.video.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AccessDenied));
    }

    #[tokio::test]
    async fn test_grant_then_stream_records_watch() {
        let s = setup().await;
        let rule = s
            .gateway
            .grant_access(
                &s.admin.id,
                grant(s.viewer.id, RuleScope::blanket().year(2024), Some(7), false),
                Some("::1"),
            )
            .await
            .unwrap();
        assert!(!rule.is_permanent);
        assert!(rule.expires_at > now_millis() + 6 * DAY_MILLIS);

        let response = s
            .gateway
            .stream_for_user(&s.viewer.id, &s.video.id, Some("bytes=0-9"), Some("::ffff:10.1.1.1"))
            .await
            .unwrap();
        assert_eq!(response.content_length(), 10);

        settle().await;
        let log = s.gateway.recent_audit(10).await.unwrap();
        let watch = log
            .iter()
            .find(|r| r.action == AuditAction::WatchVideo)
            .expect("watch event recorded");
        assert_eq!(watch.user, s.viewer.id);
        assert_eq!(watch.ip, "10.1.1.1");
        assert!(log.iter().any(|r| r.action == AuditAction::GrantAccess && r.user == s.admin.id));
    }

    #[tokio::test]
    async fn test_unknown_video_is_not_found() {
        let s = setup().await;
        let err = s
            .gateway
            .stream_for_user(&s.viewer.id, &VideoId::generate(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::VideoNotFound(_)));
    }

    #[tokio::test]
    async fn test_permitted_but_file_missing() {
        let s = setup().await;
        let orphan = Video::new(
            "Orphan",
            s.video.domain,
            s.video.topic,
            (2024, 5, 2),
            "missing.mp4",
            2,
        )
        .unwrap();
        s.gateway.store().insert_video(&orphan).await.unwrap();
        s.gateway
            .grant_access(&s.admin.id, grant(s.viewer.id, RuleScope::blanket(), None, true), None)
            .await
            .unwrap();

        let err = s
            .gateway
            .stream_for_user(&s.viewer.id, &orphan.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_admin_stream_skips_rules() {
        let s = setup().await;
        let response = s.gateway.stream_for_admin(&s.video.id, None).await.unwrap();
        assert!(matches!(response, MediaResponse::Full { size: 1000, .. }));
    }

    #[tokio::test]
    async fn test_grant_validation() {
        let s = setup().await;

        let no_duration = s
            .gateway
            .grant_access(&s.admin.id, grant(s.viewer.id, RuleScope::blanket(), None, false), None)
            .await;
        assert!(matches!(no_duration, Err(GatewayError::InvalidRequest(_))));

        let bad_month = s
            .gateway
            .grant_access(
                &s.admin.id,
                grant(s.viewer.id, RuleScope::blanket().month(13), Some(1), false),
                None,
            )
            .await;
        assert!(matches!(bad_month, Err(GatewayError::InvalidRequest(_))));

        let unknown_user = s
            .gateway
            .grant_access(&s.admin.id, grant(UserId::generate(), RuleScope::blanket(), Some(1), false), None)
            .await;
        assert!(matches!(unknown_user, Err(GatewayError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_revoke_takes_effect_immediately() {
        let s = setup().await;
        let rule = s
            .gateway
            .grant_access(&s.admin.id, grant(s.viewer.id, RuleScope::blanket(), None, true), None)
            .await
            .unwrap();
        assert_eq!(s.gateway.rules_for(&s.viewer.id).await.unwrap(), vec![rule.clone()]);

        let revoked = s.gateway.revoke_access(&s.admin.id, &rule.id, None).await.unwrap();
        assert_eq!(revoked.id, rule.id);

        let err = s
            .gateway
            .stream_for_user(&s.viewer.id, &s.video.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AccessDenied));

        let again = s.gateway.revoke_access(&s.admin.id, &rule.id, None).await;
        assert!(matches!(again, Err(GatewayError::RuleNotFound(_))));
    }

    #[tokio::test]
    async fn test_authentication() {
        let s = setup().await;
        let as_viewer = Principal {
            user_id: s.viewer.id,
            role: Role::User,
        };
        let viewer_claiming_admin = Principal {
            user_id: s.viewer.id,
            role: Role::Admin,
        };
        let as_admin = Principal {
            user_id: s.admin.id,
            role: Role::Admin,
        };
        let stranger = Principal {
            user_id: UserId::generate(),
            role: Role::User,
        };

        assert_eq!(s.gateway.authenticate(&as_viewer).await.unwrap().id, s.viewer.id);
        assert!(matches!(
            s.gateway.authorize_admin(&as_viewer).await,
            Err(GatewayError::NotAdmin)
        ));
        assert!(matches!(
            s.gateway.authorize_admin(&viewer_claiming_admin).await,
            Err(GatewayError::NotAdmin)
        ));
        assert!(s.gateway.authorize_admin(&as_admin).await.is_ok());
        assert!(matches!(
            s.gateway.authenticate(&stranger).await,
            Err(GatewayError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_disabled_account_refused() {
        let s = setup().await;
        let mut disabled = User::new("gone@example.com", Role::User, 0);
        disabled.status = UserStatus::Disabled;
        s.gateway.store().insert_user(&disabled).await.unwrap();

        let principal = Principal {
            user_id: disabled.id,
            role: Role::User,
        };
        assert!(matches!(
            s.gateway.authenticate(&principal).await,
            Err(GatewayError::AccountDisabled(_))
        ));
    }

    #[tokio::test]
    async fn test_catalog_refuses_disabled_and_unknown_accounts() {
        let s = setup().await;
        let mut disabled = User::new("gone@example.com", Role::User, 0);
        disabled.status = UserStatus::Disabled;
        s.gateway.store().insert_user(&disabled).await.unwrap();
        s.gateway
            .grant_access(&s.admin.id, grant(disabled.id, RuleScope::blanket(), None, true), None)
            .await
            .unwrap();

        assert!(matches!(
            s.gateway.accessible_catalog(&disabled.id).await,
            Err(GatewayError::AccountDisabled(_))
        ));
        assert!(matches!(
            s.gateway
                .stream_for_user(&disabled.id, &s.video.id, None, None)
                .await,
            Err(GatewayError::AccountDisabled(_))
        ));
        assert!(matches!(
            s.gateway.accessible_catalog(&UserId::generate()).await,
            Err(GatewayError::Unauthenticated)
        ));

        s.gateway
            .grant_access(&s.admin.id, grant(s.viewer.id, RuleScope::blanket(), None, true), None)
            .await
            .unwrap();
        let catalog = s.gateway.accessible_catalog(&s.viewer.id).await.unwrap();
        assert_eq!(catalog.videos, vec![s.video.clone()]);
    }

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let s = setup().await;
        let first = s.gateway.seed_admin("root@example.com").await.unwrap();
        let second = s.gateway.seed_admin("root@example.com").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Admin);

        let existing = s.gateway.seed_admin("admin@example.com").await.unwrap();
        assert_eq!(existing.id, s.admin.id);
    }
}
