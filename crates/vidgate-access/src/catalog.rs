//! Catalog projection for browsing.

use std::sync::Arc;

use serde::Serialize;
use vidgate_core::{Domain, ExpiryPolicy, RuleScope, Topic, UserId, Video};
use vidgate_store::{Store, StoreExt};

use crate::error::Result;

/// What a user may browse.
///
/// Domains and topics are exactly those referenced by the visible videos;
/// a domain is listed because one of its videos is visible, not because a
/// rule names it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub domains: Vec<Domain>,
    pub topics: Vec<Topic>,
    /// Newest first.
    pub videos: Vec<Video>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

/// Computes a user's accessible catalog in one bulk query.
pub struct CatalogFilter<S: Store> {
    store: Arc<S>,
    policy: ExpiryPolicy,
}

impl<S: Store> CatalogFilter<S> {
    pub fn new(store: Arc<S>, policy: ExpiryPolicy) -> Self {
        Self { store, policy }
    }

    /// Everything `user` may see at `now`.
    ///
    /// A user without active rules gets an empty catalog, not an error.
    pub async fn accessible_catalog(&self, user: &UserId, now: i64) -> Result<Catalog> {
        let rules = self.store.active_rules(user, now, self.policy).await?;
        if rules.is_empty() {
            return Ok(Catalog::default());
        }

        let scopes: Vec<RuleScope> = rules.into_iter().map(|rule| rule.scope).collect();
        let videos = self.store.videos_matching(&scopes).await?;
        let (domains, topics) = self.store.hierarchy_for(&videos).await?;

        Ok(Catalog {
            domains,
            topics,
            videos,
        })
    }
}
