//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for vidgate. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use vidgate_core::{
    AccessRule, AuditAction, AuditDetail, AuditRecord, Domain, DomainId, ExpiryPolicy, Role,
    RuleId, RuleScope, Topic, TopicId, User, UserId, UserStatus, Video, VideoId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

const USER_COLUMNS: &str = "id, email, role, status, created_at";
const DOMAIN_COLUMNS: &str = "id, name, description, created_at";
const TOPIC_COLUMNS: &str = "id, name, domain, description, created_at";
const VIDEO_COLUMNS: &str =
    "id, title, description, domain, topic, year, month, day, storage_ref, mime_type, size, created_at";
const RULE_COLUMNS: &str =
    "id, user_id, domain, topic, year, month, day, expires_at, is_permanent, created_at";
const AUDIT_COLUMNS: &str = "id, action, user_id, detail, ip, timestamp";

/// Scopes per `videos_matching` statement. SQLite caps expression depth at
/// 1000, and each scope adds one level to the `OR` chain.
const SCOPE_BATCH: usize = 200;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row conversion
// ─────────────────────────────────────────────────────────────────────────────

fn invalid(column: &str, ty: Type) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(0, column.into(), ty)
}

fn id_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: for<'a> TryFrom<&'a [u8]>,
{
    let bytes: Vec<u8> = row.get(column)?;
    T::try_from(bytes.as_slice()).map_err(|_| invalid(column, Type::Blob))
}

fn optional_id_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>>
where
    T: for<'a> TryFrom<&'a [u8]>,
{
    let bytes: Option<Vec<u8>> = row.get(column)?;
    bytes
        .map(|b| T::try_from(b.as_slice()).map_err(|_| invalid(column, Type::Blob)))
        .transpose()
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get("role")?;
    let status: String = row.get("status")?;

    Ok(User {
        id: id_column(row, "id")?,
        email: row.get("email")?,
        role: Role::parse(&role).ok_or_else(|| invalid("role", Type::Text))?,
        status: UserStatus::parse(&status).ok_or_else(|| invalid("status", Type::Text))?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_domain(row: &Row<'_>) -> rusqlite::Result<Domain> {
    Ok(Domain {
        id: id_column(row, "id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_topic(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: id_column(row, "id")?,
        name: row.get("name")?,
        domain: id_column(row, "domain")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_video(row: &Row<'_>) -> rusqlite::Result<Video> {
    let size: Option<i64> = row.get("size")?;

    Ok(Video {
        id: id_column(row, "id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        domain: id_column(row, "domain")?,
        topic: id_column(row, "topic")?,
        year: row.get("year")?,
        month: row.get("month")?,
        day: row.get("day")?,
        storage_ref: row.get("storage_ref")?,
        mime_type: row.get("mime_type")?,
        size: size.map(|s| s as u64),
        created_at: row.get("created_at")?,
    })
}

fn row_to_rule(row: &Row<'_>) -> rusqlite::Result<AccessRule> {
    Ok(AccessRule {
        id: id_column(row, "id")?,
        user: id_column(row, "user_id")?,
        scope: RuleScope {
            domain: optional_id_column(row, "domain")?,
            topic: optional_id_column(row, "topic")?,
            year: row.get("year")?,
            month: row.get("month")?,
            day: row.get("day")?,
        },
        expires_at: row.get("expires_at")?,
        is_permanent: row.get("is_permanent")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_audit(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let action: String = row.get("action")?;
    let detail: Vec<u8> = row.get("detail")?;

    Ok(AuditRecord {
        id: id_column(row, "id")?,
        action: AuditAction::parse(&action).ok_or_else(|| invalid("action", Type::Text))?,
        user: id_column(row, "user_id")?,
        detail: decode_detail(&detail).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Blob, e.to_string().into())
        })?,
        ip: row.get("ip")?,
        timestamp: row.get("timestamp")?,
    })
}

// Audit details are stored as CBOR
fn encode_detail(detail: &AuditDetail) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(detail, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_detail(bytes: &[u8]) -> Result<AuditDetail> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn inserted(changed: usize) -> InsertResult {
    if changed == 0 {
        InsertResult::AlreadyExists
    } else {
        InsertResult::Inserted
    }
}

/// SQL placeholders for an `IN (...)` list.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Render one scope as a conjunction of equality filters.
///
/// Unset fields contribute nothing, so a blanket scope renders as a
/// tautology.
fn scope_clause(scope: &RuleScope, values: &mut Vec<Value>) -> String {
    let mut parts = Vec::new();

    if let Some(domain) = scope.domain {
        parts.push("domain = ?");
        values.push(Value::Blob(domain.as_bytes().to_vec()));
    }
    if let Some(topic) = scope.topic {
        parts.push("topic = ?");
        values.push(Value::Blob(topic.as_bytes().to_vec()));
    }
    if let Some(year) = scope.year {
        parts.push("year = ?");
        values.push(Value::Integer(year.into()));
    }
    if let Some(month) = scope.month {
        parts.push("month = ?");
        values.push(Value::Integer(month.into()));
    }
    if let Some(day) = scope.day {
        parts.push("day = ?");
        values.push(Value::Integer(day.into()));
    }

    if parts.is_empty() {
        "1 = 1".to_string()
    } else {
        format!("({})", parts.join(" AND "))
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_user(&self, user: &User) -> Result<InsertResult> {
        let user = user.clone();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT INTO users (id, email, role, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    user.id.as_bytes().as_slice(),
                    user.email,
                    user.role.as_str(),
                    user.status.as_str(),
                    user.created_at,
                ],
            )?;
            Ok(inserted(changed))
        })
        .await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let id = *id;

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id.as_bytes().as_slice()],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn insert_domain(&self, domain: &Domain) -> Result<InsertResult> {
        let domain = domain.clone();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT INTO domains (id, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    domain.id.as_bytes().as_slice(),
                    domain.name,
                    domain.description,
                    domain.created_at,
                ],
            )?;
            Ok(inserted(changed))
        })
        .await
    }

    async fn insert_topic(&self, topic: &Topic) -> Result<InsertResult> {
        let topic = topic.clone();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT INTO topics (id, name, domain, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    topic.id.as_bytes().as_slice(),
                    topic.name,
                    topic.domain.as_bytes().as_slice(),
                    topic.description,
                    topic.created_at,
                ],
            )?;
            Ok(inserted(changed))
        })
        .await
    }

    async fn domains_by_ids(&self, ids: &[DomainId]) -> Result<Vec<Domain>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<Vec<u8>> = ids.iter().map(|id| id.as_bytes().to_vec()).collect();

        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM domains WHERE id IN ({})",
                DOMAIN_COLUMNS,
                placeholders(keys.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let domains = stmt
                .query_map(params_from_iter(keys.iter()), row_to_domain)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(domains)
        })
        .await
    }

    async fn topics_by_ids(&self, ids: &[TopicId]) -> Result<Vec<Topic>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<Vec<u8>> = ids.iter().map(|id| id.as_bytes().to_vec()).collect();

        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM topics WHERE id IN ({})",
                TOPIC_COLUMNS,
                placeholders(keys.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let topics = stmt
                .query_map(params_from_iter(keys.iter()), row_to_topic)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(topics)
        })
        .await
    }

    async fn insert_video(&self, video: &Video) -> Result<InsertResult> {
        let video = video.clone();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT INTO videos (
                    id, title, description, domain, topic, year, month, day,
                    storage_ref, mime_type, size, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(id) DO NOTHING",
                params![
                    video.id.as_bytes().as_slice(),
                    video.title,
                    video.description,
                    video.domain.as_bytes().as_slice(),
                    video.topic.as_bytes().as_slice(),
                    video.year,
                    video.month,
                    video.day,
                    video.storage_ref,
                    video.mime_type,
                    video.size.map(|s| s as i64),
                    video.created_at,
                ],
            )?;
            Ok(inserted(changed))
        })
        .await
    }

    async fn get_video(&self, id: &VideoId) -> Result<Option<Video>> {
        let id = *id;

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS),
                params![id.as_bytes().as_slice()],
                row_to_video,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn videos_matching(&self, scopes: &[RuleScope]) -> Result<Vec<Video>> {
        if scopes.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<(String, Vec<Value>)> = scopes
            .chunks(SCOPE_BATCH)
            .map(|chunk| {
                let mut values = Vec::new();
                let clauses: Vec<String> = chunk
                    .iter()
                    .map(|scope| scope_clause(scope, &mut values))
                    .collect();
                let sql = format!(
                    "SELECT {} FROM videos WHERE {}",
                    VIDEO_COLUMNS,
                    clauses.join(" OR ")
                );
                (sql, values)
            })
            .collect();

        self.blocking(move |conn| {
            // A video covered by scopes in several batches is kept once
            let mut found: BTreeMap<VideoId, Video> = BTreeMap::new();
            for (sql, values) in &batches {
                let mut stmt = conn.prepare(sql)?;
                let rows = stmt.query_map(params_from_iter(values.iter()), row_to_video)?;
                for video in rows {
                    let video = video?;
                    found.entry(video.id).or_insert(video);
                }
            }

            let mut videos: Vec<Video> = found.into_values().collect();
            videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(videos)
        })
        .await
    }

    async fn insert_rule(&self, rule: &AccessRule) -> Result<InsertResult> {
        let rule = rule.clone();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT INTO access_rules (
                    id, user_id, domain, topic, year, month, day,
                    expires_at, is_permanent, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(id) DO NOTHING",
                params![
                    rule.id.as_bytes().as_slice(),
                    rule.user.as_bytes().as_slice(),
                    rule.scope.domain.as_ref().map(|d| d.as_bytes().as_slice()),
                    rule.scope.topic.as_ref().map(|t| t.as_bytes().as_slice()),
                    rule.scope.year,
                    rule.scope.month,
                    rule.scope.day,
                    rule.expires_at,
                    rule.is_permanent,
                    rule.created_at,
                ],
            )?;
            Ok(inserted(changed))
        })
        .await
    }

    async fn get_rule(&self, id: &RuleId) -> Result<Option<AccessRule>> {
        let id = *id;

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM access_rules WHERE id = ?1", RULE_COLUMNS),
                params![id.as_bytes().as_slice()],
                row_to_rule,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn active_rules(
        &self,
        user: &UserId,
        now: i64,
        policy: ExpiryPolicy,
    ) -> Result<Vec<AccessRule>> {
        let user = *user;
        let expiry_filter = match policy {
            ExpiryPolicy::Strict => "expires_at > ?2",
            ExpiryPolicy::HonorPermanent => "(expires_at > ?2 OR is_permanent = 1)",
        };

        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM access_rules
                 WHERE user_id = ?1 AND {}
                 ORDER BY created_at, id",
                RULE_COLUMNS, expiry_filter
            );
            let mut stmt = conn.prepare(&sql)?;
            let rules = stmt
                .query_map(params![user.as_bytes().as_slice(), now], row_to_rule)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rules)
        })
        .await
    }

    async fn rules_for_user(&self, user: &UserId) -> Result<Vec<AccessRule>> {
        let user = *user;

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM access_rules WHERE user_id = ?1 ORDER BY created_at, id",
                RULE_COLUMNS
            ))?;
            let rules = stmt
                .query_map(params![user.as_bytes().as_slice()], row_to_rule)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rules)
        })
        .await
    }

    async fn delete_rule(&self, id: &RuleId) -> Result<bool> {
        let id = *id;

        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM access_rules WHERE id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        let record = record.clone();
        let detail = encode_detail(&record.detail)?;

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO audit_log (id, action, user_id, detail, ip, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.as_bytes().as_slice(),
                    record.action.as_str(),
                    record.user.as_bytes().as_slice(),
                    detail,
                    record.ip,
                    record.timestamp,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM audit_log ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
                AUDIT_COLUMNS
            ))?;
            let records = stmt
                .query_map(params![limit], row_to_audit)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }
}
