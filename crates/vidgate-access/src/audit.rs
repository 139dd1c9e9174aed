//! Best-effort audit dispatch.
//!
//! Audit writes run on a detached task. The operation being audited never
//! waits for them and never sees their errors; failures go to the log.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use vidgate_core::{now_millis, AuditDetail, AuditRecord, UserId};
use vidgate_store::Store;

use crate::error::Result;

/// Append-only destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<()>;
}

/// Audit sink that appends to the audit log of a [`Store`].
pub struct StoreAuditSink<S: Store> {
    store: Arc<S>,
}

impl<S: Store> StoreAuditSink<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store> AuditSink for StoreAuditSink<S> {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        self.store.append_audit(record).await?;
        Ok(())
    }
}

/// Fire-and-forget front end to an [`AuditSink`].
#[derive(Clone)]
pub struct AuditHook {
    sink: Arc<dyn AuditSink>,
}

impl AuditHook {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record an event in the background.
    ///
    /// The record is stamped and its IP normalized before this returns.
    /// The returned handle may be dropped; the write still runs.
    pub fn fire(&self, user: UserId, detail: AuditDetail, ip: Option<&str>) -> JoinHandle<()> {
        let record = AuditRecord::new(user, detail, ip, now_millis());
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            if let Err(e) = sink.record(&record).await {
                tracing::warn!(
                    action = record.action.as_str(),
                    user = %record.user,
                    error = %e,
                    "failed to record audit event"
                );
            }
        })
    }
}
