//! Test fixtures and helpers.
//!
//! Common setup code for access scenarios.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use vidgate_access::{AccessEvaluator, CatalogFilter};
use vidgate_core::{
    now_millis, AccessRule, Domain, ExpiryPolicy, Role, RuleScope, Topic, User, Video, VideoId,
    DAY_MILLIS,
};
use vidgate_store::{MemoryStore, Result, Store};

use crate::generators::video_at;

/// A memory store seeded with a viewer, an admin, and one domain/topic.
pub struct CatalogFixture {
    pub store: Arc<MemoryStore>,
    pub viewer: User,
    pub admin: User,
    pub domain: Domain,
    pub topic: Topic,
    clock: AtomicI64,
}

impl CatalogFixture {
    /// Seed a fresh memory store.
    pub async fn new() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let viewer = User::new("viewer@example.com", Role::User, 0);
        let admin = User::new("admin@example.com", Role::Admin, 0);
        let domain = Domain::new("Physics", 0);
        let topic = Topic::new("Optics", domain.id, 0);

        store.insert_user(&viewer).await?;
        store.insert_user(&admin).await?;
        store.insert_domain(&domain).await?;
        store.insert_topic(&topic).await?;

        Ok(Self {
            store,
            viewer,
            admin,
            domain,
            topic,
            clock: AtomicI64::new(1),
        })
    }

    /// Add a video under the fixture's topic.
    ///
    /// Each call gets a later `created_at` than the one before.
    pub async fn add_video(
        &self,
        title: &str,
        date: (i32, u8, u8),
        storage_ref: &str,
    ) -> Result<Video> {
        let mut video = video_at(
            VideoId::generate(),
            self.domain.id,
            self.topic.id,
            date,
            storage_ref,
            self.clock.fetch_add(1, Ordering::SeqCst),
        );
        video.title = title.to_string();
        self.store.insert_video(&video).await?;
        Ok(video)
    }

    /// Add a second topic under a new domain.
    pub async fn add_branch(&self, domain: &str, topic: &str) -> Result<(Domain, Topic)> {
        let domain = Domain::new(domain, 0);
        let topic = Topic::new(topic, domain.id, 0);
        self.store.insert_domain(&domain).await?;
        self.store.insert_topic(&topic).await?;
        Ok((domain, topic))
    }

    /// Grant the viewer a rule: permanent when `days` is `None`, otherwise
    /// expiring `days` from now. Negative days produce an expired rule.
    pub async fn grant(&self, scope: RuleScope, days: Option<i64>) -> Result<AccessRule> {
        let now = now_millis();
        let rule = match days {
            None => AccessRule::permanent(self.viewer.id, scope, now),
            Some(days) => AccessRule::expiring(self.viewer.id, scope, now + days * DAY_MILLIS, now),
        };
        self.store.insert_rule(&rule).await?;
        Ok(rule)
    }

    pub fn evaluator(&self, policy: ExpiryPolicy) -> AccessEvaluator<MemoryStore> {
        AccessEvaluator::new(Arc::clone(&self.store), policy)
    }

    pub fn catalog(&self, policy: ExpiryPolicy) -> CatalogFilter<MemoryStore> {
        CatalogFilter::new(Arc::clone(&self.store), policy)
    }
}
