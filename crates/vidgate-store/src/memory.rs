//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use vidgate_core::{
    AccessRule, AuditRecord, Domain, DomainId, ExpiryPolicy, RuleId, RuleScope, Topic, TopicId,
    User, UserId, Video, VideoId,
};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: HashMap<UserId, User>,
    domains: HashMap<DomainId, Domain>,
    topics: HashMap<TopicId, Topic>,
    videos: HashMap<VideoId, Video>,
    rules: HashMap<RuleId, AccessRule>,
    /// Append order is preserved.
    audit: Vec<AuditRecord>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_once<K, V>(map: &mut HashMap<K, V>, key: K, value: &V) -> InsertResult
where
    K: std::hash::Hash + Eq,
    V: Clone,
{
    if map.contains_key(&key) {
        return InsertResult::AlreadyExists;
    }
    map.insert(key, value.clone());
    InsertResult::Inserted
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<InsertResult> {
        let mut inner = self.write()?;
        Ok(insert_once(&mut inner.users, user.id, user))
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_domain(&self, domain: &Domain) -> Result<InsertResult> {
        let mut inner = self.write()?;
        Ok(insert_once(&mut inner.domains, domain.id, domain))
    }

    async fn insert_topic(&self, topic: &Topic) -> Result<InsertResult> {
        let mut inner = self.write()?;
        Ok(insert_once(&mut inner.topics, topic.id, topic))
    }

    async fn domains_by_ids(&self, ids: &[DomainId]) -> Result<Vec<Domain>> {
        let inner = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.domains.get(id).cloned())
            .collect())
    }

    async fn topics_by_ids(&self, ids: &[TopicId]) -> Result<Vec<Topic>> {
        let inner = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.topics.get(id).cloned())
            .collect())
    }

    async fn insert_video(&self, video: &Video) -> Result<InsertResult> {
        let mut inner = self.write()?;
        Ok(insert_once(&mut inner.videos, video.id, video))
    }

    async fn get_video(&self, id: &VideoId) -> Result<Option<Video>> {
        Ok(self.read()?.videos.get(id).cloned())
    }

    async fn videos_matching(&self, scopes: &[RuleScope]) -> Result<Vec<Video>> {
        if scopes.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.read()?;
        let mut videos: Vec<Video> = inner
            .videos
            .values()
            .filter(|v| scopes.iter().any(|s| s.matches(v)))
            .cloned()
            .collect();

        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(videos)
    }

    async fn insert_rule(&self, rule: &AccessRule) -> Result<InsertResult> {
        let mut inner = self.write()?;
        Ok(insert_once(&mut inner.rules, rule.id, rule))
    }

    async fn get_rule(&self, id: &RuleId) -> Result<Option<AccessRule>> {
        Ok(self.read()?.rules.get(id).cloned())
    }

    async fn active_rules(
        &self,
        user: &UserId,
        now: i64,
        policy: ExpiryPolicy,
    ) -> Result<Vec<AccessRule>> {
        let inner = self.read()?;
        Ok(inner
            .rules
            .values()
            .filter(|r| &r.user == user && r.is_active(now, policy))
            .cloned()
            .collect())
    }

    async fn rules_for_user(&self, user: &UserId) -> Result<Vec<AccessRule>> {
        let inner = self.read()?;
        let mut rules: Vec<AccessRule> = inner
            .rules
            .values()
            .filter(|r| &r.user == user)
            .cloned()
            .collect();

        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rules)
    }

    async fn delete_rule(&self, id: &RuleId) -> Result<bool> {
        Ok(self.write()?.rules.remove(id).is_some())
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        self.write()?.audit.push(record.clone());
        Ok(())
    }

    async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let inner = self.read()?;

        // Stable sort keeps later appends first among equal timestamps
        let mut records: Vec<&AuditRecord> = inner.audit.iter().rev().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records.into_iter().take(limit).cloned().collect())
    }
}
