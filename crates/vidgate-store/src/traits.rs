//! Store trait: the abstract interface for vidgate persistence.
//!
//! This trait allows access evaluation to be storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).

use std::collections::BTreeSet;

use async_trait::async_trait;
use vidgate_core::{
    AccessRule, AuditRecord, Domain, DomainId, ExpiryPolicy, RuleId, RuleScope, Topic, TopicId,
    User, UserId, Video, VideoId,
};

use crate::error::Result;

/// Result of inserting a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was inserted.
    Inserted,
    /// A record with the same id already exists (idempotent - not an error).
    AlreadyExists,
}

/// The Store trait: async interface for vidgate persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Idempotent inserts**: Inserting a record whose id exists returns `AlreadyExists`.
/// - **No mutation of rules**: rules are inserted and deleted, never updated.
/// - **Expiry at read time**: `active_rules` compares against the caller's clock;
///   nothing sweeps expired rules in the background.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a user account.
    async fn insert_user(&self, user: &User) -> Result<InsertResult>;

    /// Get a user by id.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Get a user by email address (exact match).
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a domain.
    async fn insert_domain(&self, domain: &Domain) -> Result<InsertResult>;

    /// Insert a topic.
    async fn insert_topic(&self, topic: &Topic) -> Result<InsertResult>;

    /// Fetch the domains with the given ids. Unknown ids are skipped.
    async fn domains_by_ids(&self, ids: &[DomainId]) -> Result<Vec<Domain>>;

    /// Fetch the topics with the given ids. Unknown ids are skipped.
    async fn topics_by_ids(&self, ids: &[TopicId]) -> Result<Vec<Topic>>;

    /// Insert a video.
    async fn insert_video(&self, video: &Video) -> Result<InsertResult>;

    /// Get a video by id.
    async fn get_video(&self, id: &VideoId) -> Result<Option<Video>>;

    /// Get every video covered by at least one of `scopes`.
    ///
    /// A video is covered by a scope iff every field the scope sets equals
    /// the video's field. Results are ordered newest `created_at` first
    /// (ties by id, descending). An empty `scopes` slice yields no videos.
    async fn videos_matching(&self, scopes: &[RuleScope]) -> Result<Vec<Video>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Access Rules
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an access rule.
    async fn insert_rule(&self, rule: &AccessRule) -> Result<InsertResult>;

    /// Get a rule by id.
    async fn get_rule(&self, id: &RuleId) -> Result<Option<AccessRule>>;

    /// Get the user's rules that are active at `now` under `policy`.
    async fn active_rules(
        &self,
        user: &UserId,
        now: i64,
        policy: ExpiryPolicy,
    ) -> Result<Vec<AccessRule>>;

    /// Get all of the user's rules, expired ones included, oldest first.
    async fn rules_for_user(&self, user: &UserId) -> Result<Vec<AccessRule>>;

    /// Delete a rule. Returns whether it existed.
    async fn delete_rule(&self, id: &RuleId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Audit
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an audit record.
    async fn append_audit(&self, record: &AuditRecord) -> Result<()>;

    /// Most recent audit records, newest first.
    async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditRecord>>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Resolve the distinct domains and topics referenced by `videos`.
    ///
    /// Both lists are sorted by name, then id.
    fn hierarchy_for(
        &self,
        videos: &[Video],
    ) -> impl std::future::Future<Output = Result<(Vec<Domain>, Vec<Topic>)>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn hierarchy_for(&self, videos: &[Video]) -> Result<(Vec<Domain>, Vec<Topic>)> {
        // Deduplicate by identity before hitting the store
        let domain_ids: Vec<DomainId> = videos
            .iter()
            .map(|v| v.domain)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let topic_ids: Vec<TopicId> = videos
            .iter()
            .map(|v| v.topic)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut domains = self.domains_by_ids(&domain_ids).await?;
        let mut topics = self.topics_by_ids(&topic_ids).await?;

        domains.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        topics.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok((domains, topics))
    }
}
