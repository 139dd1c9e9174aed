//! End-to-end tests of the HTTP surface against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use vidgate::core::{AuditAction, Domain, Role, Topic, User, UserStatus, Video};
use vidgate::store::{MemoryStore, Store};
use vidgate::{router, AppState, Gateway, GatewayConfig, IdentityConfig, TrustedHeaderIdentity};

struct Harness {
    app: Router,
    gateway: Arc<Gateway<MemoryStore>>,
    viewer: User,
    admin: User,
    disabled: User,
    local: Video,
    remote: Video,
    orphan: Video,
    _uploads: tempfile::TempDir,
}

const REMOTE_URL: &str = "https://blob.example.com/videos/remote.mp4";

fn file_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 256) as u8).collect()
}

async fn harness() -> Harness {
    let uploads = tempfile::tempdir().unwrap();
    std::fs::write(uploads.path().join("local.mp4"), file_bytes()).unwrap();

    let store = MemoryStore::new();
    let viewer = User::new("viewer@example.com", Role::User, 0);
    let admin = User::new("admin@example.com", Role::Admin, 0);
    let mut disabled = User::new("disabled@example.com", Role::User, 0);
    disabled.status = UserStatus::Disabled;

    let domain = Domain::new("Physics", 0);
    let topic = Topic::new("Optics", domain.id, 0);
    let local = Video::new("Local", domain.id, topic.id, (2024, 3, 1), "local.mp4", 1).unwrap();
    let remote = Video::new("Remote", domain.id, topic.id, (2024, 3, 2), REMOTE_URL, 2).unwrap();
    let orphan = Video::new("Orphan", domain.id, topic.id, (2023, 3, 3), "gone.mp4", 3).unwrap();

    for user in [&viewer, &admin, &disabled] {
        store.insert_user(user).await.unwrap();
    }
    store.insert_domain(&domain).await.unwrap();
    store.insert_topic(&topic).await.unwrap();
    for video in [&local, &remote, &orphan] {
        store.insert_video(video).await.unwrap();
    }

    let config = GatewayConfig {
        uploads_dir: uploads.path().to_path_buf(),
        ..GatewayConfig::default()
    };
    let gateway = Arc::new(Gateway::new(store, config));
    let state = AppState {
        gateway: Arc::clone(&gateway),
        identity: Arc::new(TrustedHeaderIdentity::new(&IdentityConfig::default()).unwrap()),
        trust_proxy: true,
    };

    Harness {
        app: router(state),
        gateway,
        viewer,
        admin,
        disabled,
        local,
        remote,
        orphan,
        _uploads: uploads,
    }
}

fn get(uri: &str, user: Option<&User>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder
            .header("x-user-id", user.id.to_hex())
            .header("x-user-role", user.role.as_str());
    }
    builder
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn grant(h: &Harness, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/access-rules")
        .header("x-user-id", h.admin.id.to_hex())
        .header("x-user-role", "admin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send_json(&h.app, request).await
}

async fn grant_blanket(h: &Harness) -> Value {
    let (status, rule) = grant(
        h,
        json!({ "userId": h.viewer.id.to_hex(), "permanent": true }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    rule
}

#[tokio::test]
async fn banner_is_served() {
    let h = harness().await;
    let (status, _, body) = send(&h.app, get("/", None).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("running"));
}

#[tokio::test]
async fn content_requires_identity() {
    let h = harness().await;
    let (status, body) =
        send_json(&h.app, get("/api/user/content", None).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn content_is_empty_without_rules() {
    let h = harness().await;
    let (status, body) = send_json(
        &h.app,
        get("/api/user/content", Some(&h.viewer))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "domains": [], "topics": [], "videos": [] }));
}

#[tokio::test]
async fn content_follows_granted_scope() {
    let h = harness().await;
    let (status, rule) = grant(
        &h,
        json!({ "userId": h.viewer.id.to_hex(), "year": 2024, "durationDays": 30 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rule["year"], 2024);
    assert_eq!(rule["isPermanent"], false);

    let (status, body) = send_json(
        &h.app,
        get("/api/user/content", Some(&h.viewer))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<&str> = body["videos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![h.remote.id.to_hex(), h.local.id.to_hex()]);
    assert_eq!(body["domains"].as_array().unwrap().len(), 1);
    assert_eq!(body["topics"][0]["name"], "Optics");
}

#[tokio::test]
async fn stream_without_rule_is_forbidden() {
    let h = harness().await;
    let uri = format!("/api/user/stream/{}", h.local.id);
    let (status, body) =
        send_json(&h.app, get(&uri, Some(&h.viewer)).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied or expired");
}

#[tokio::test]
async fn stream_full_and_ranged() {
    let h = harness().await;
    grant_blanket(&h).await;
    let uri = format!("/api/user/stream/{}", h.local.id);

    let (status, headers, body) =
        send(&h.app, get(&uri, Some(&h.viewer)).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_LENGTH], "1000");
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert!(headers.get(header::CONTENT_RANGE).is_none());
    assert_eq!(body, file_bytes());

    let (status, headers, body) = send(
        &h.app,
        get(&uri, Some(&h.viewer))
            .header(header::RANGE, "bytes=0-99")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 0-99/1000");
    assert_eq!(headers[header::CONTENT_LENGTH], "100");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(body, file_bytes()[..100].to_vec());
}

#[tokio::test]
async fn malformed_range_serves_full_file() {
    let h = harness().await;
    grant_blanket(&h).await;
    let uri = format!("/api/user/stream/{}", h.local.id);

    let (status, _, body) = send(
        &h.app,
        get(&uri, Some(&h.viewer))
            .header(header::RANGE, "bytes=5000-")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 1000);
}

#[tokio::test]
async fn remote_video_redirects() {
    let h = harness().await;
    grant_blanket(&h).await;
    let uri = format!("/api/user/stream/{}", h.remote.id);

    let (status, headers, _) = send(
        &h.app,
        get(&uri, Some(&h.viewer))
            .header(header::RANGE, "bytes=0-99")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], REMOTE_URL);
}

#[tokio::test]
async fn not_found_variants_are_distinct() {
    let h = harness().await;
    grant_blanket(&h).await;

    let unknown = format!("/api/user/stream/{}", vidgate::core::VideoId::generate());
    let (status, body) =
        send_json(&h.app, get(&unknown, Some(&h.viewer)).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Video not found");

    let orphan = format!("/api/user/stream/{}", h.orphan.id);
    let (status, body) =
        send_json(&h.app, get(&orphan, Some(&h.viewer)).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Video file not found on server");

    let (status, _) = send_json(
        &h.app,
        get("/api/user/stream/not-an-id", Some(&h.viewer))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disabled_account_is_forbidden() {
    let h = harness().await;
    let uri = format!("/api/user/stream/{}", h.local.id);
    let (status, _) =
        send_json(&h.app, get(&uri, Some(&h.disabled)).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_reject_viewers() {
    let h = harness().await;
    let uri = format!("/api/admin/stream/{}", h.local.id);

    // Claiming the admin role is not enough; the account must be an admin
    let (status, body) = send_json(
        &h.app,
        get(&uri, None)
            .header("x-user-id", h.viewer.id.to_hex())
            .header("x-user-role", "admin")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized as an admin");
}

#[tokio::test]
async fn admin_stream_bypasses_rules() {
    let h = harness().await;
    let uri = format!("/api/admin/stream/{}", h.local.id);

    let (status, headers, body) = send(
        &h.app,
        get(&uri, Some(&h.admin))
            .header(header::RANGE, "bytes=990-")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 990-999/1000");
    assert_eq!(body.len(), 10);
}

#[tokio::test]
async fn rule_lifecycle() {
    let h = harness().await;
    let rule = grant_blanket(&h).await;
    let rule_id = rule["id"].as_str().unwrap().to_string();

    let list_uri = format!("/api/admin/access-rules/{}", h.viewer.id);
    let (status, rules) =
        send_json(&h.app, get(&list_uri, Some(&h.admin)).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rules.as_array().unwrap().len(), 1);
    assert_eq!(rules[0]["id"], rule_id.as_str());

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/admin/access-rules/{}", rule_id))
            .header("x-user-id", h.admin.id.to_hex())
            .header("x-user-role", "admin")
            .body(Body::empty())
            .unwrap()
    };
    let (status, body) = send_json(&h.app, delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Access rule removed");

    let (status, _) = send_json(&h.app, delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/user/stream/{}", h.local.id);
    let (status, _) =
        send_json(&h.app, get(&uri, Some(&h.viewer)).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_grants_are_rejected() {
    let h = harness().await;

    let (status, _) = grant(
        &h,
        json!({ "userId": h.viewer.id.to_hex(), "month": 13, "durationDays": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = grant(&h, json!({ "userId": "zz", "durationDays": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = grant(&h, json!({ "userId": h.viewer.id.to_hex() })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn watch_is_audited_with_forwarded_ip() {
    let h = harness().await;
    grant_blanket(&h).await;
    let uri = format!("/api/user/stream/{}", h.local.id);

    let (status, _, _) = send(
        &h.app,
        get(&uri, Some(&h.viewer))
            .header("x-forwarded-for", "::ffff:10.0.0.5, 192.0.2.1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The audit write is detached from the response; wait for it to land
    let mut watch = None;
    for _ in 0..50 {
        let log = h.gateway.recent_audit(10).await.unwrap();
        watch = log.into_iter().find(|r| r.action == AuditAction::WatchVideo);
        if watch.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let watch = watch.expect("watch event recorded");
    assert_eq!(watch.user, h.viewer.id);
    assert_eq!(watch.ip, "10.0.0.5");

    let (status, logs) =
        send_json(&h.app, get("/api/admin/logs", Some(&h.admin)).body(Body::empty()).unwrap())
            .await;
    assert_eq!(status, StatusCode::OK);
    assert!(logs
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["action"] == "WATCH_VIDEO"));
}
