//! HTTP surface.
//!
//! Routes mirror the front end's expectations: viewer routes under
//! `/api/user`, administrator routes under `/api/admin`. Every error body
//! is JSON of the form `{"message": "..."}`.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vidgate_access::Catalog;
use vidgate_core::{AccessRule, AuditRecord, RuleId, User, UserId, VideoId};
use vidgate_media::{MediaResponse, CONTENT_TYPE};
use vidgate_store::Store;

use crate::error::GatewayError;
use crate::gateway::{Gateway, GrantRequest};
use crate::identity::IdentityProvider;

/// Number of audit records returned by the log endpoint.
pub const AUDIT_PAGE: usize = 100;

const BANNER: &str = "vidgate API is running...";

/// Shared state for axum handlers.
pub struct AppState<S: Store> {
    pub gateway: Arc<Gateway<S>>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Take the caller address from `X-Forwarded-For` when present.
    pub trust_proxy: bool,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            identity: Arc::clone(&self.identity),
            trust_proxy: self.trust_proxy,
        }
    }
}

/// Build the application router.
pub fn router<S: Store + 'static>(state: AppState<S>) -> Router {
    let user = Router::new()
        .route("/content", get(content::<S>))
        .route("/stream/{video_id}", get(stream::<S>));

    let admin = Router::new()
        .route("/stream/{id}", get(admin_stream::<S>))
        .route("/access-rules", post(grant::<S>))
        .route(
            "/access-rules/{id}",
            get(list_rules::<S>).delete(revoke::<S>),
        )
        .route("/logs", get(logs::<S>));

    Router::new()
        .route("/", get(banner))
        .nest("/api/user", user)
        .nest("/api/admin", admin)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MessageBody {
    message: String,
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(MessageBody {
            message: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::Unauthenticated => {
                message(StatusCode::UNAUTHORIZED, "Not authorized, no valid identity")
            }
            GatewayError::AccountDisabled(_) => {
                message(StatusCode::FORBIDDEN, "Account is disabled")
            }
            GatewayError::NotAdmin => message(StatusCode::FORBIDDEN, "Not authorized as an admin"),
            GatewayError::AccessDenied => message(StatusCode::FORBIDDEN, "Access denied or expired"),
            GatewayError::VideoNotFound(_) => message(StatusCode::NOT_FOUND, "Video not found"),
            GatewayError::FileNotFound(_) => {
                message(StatusCode::NOT_FOUND, "Video file not found on server")
            }
            GatewayError::RuleNotFound(_) => message(StatusCode::NOT_FOUND, "Access rule not found"),
            GatewayError::UserNotFound(_) => message(StatusCode::NOT_FOUND, "User not found"),
            GatewayError::InvalidRequest(msg) => message(StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::Store(_)
            | GatewayError::Io(_)
            | GatewayError::Config(_)
            | GatewayError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::InvalidRequest(format!("invalid {} id", what)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────────────────────────

/// An authenticated, active account.
pub struct CurrentUser(pub User);

impl<S: Store + 'static> FromRequestParts<AppState<S>> for CurrentUser {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let principal = state
            .identity
            .identify(&parts.headers)
            .await
            .ok_or(GatewayError::Unauthenticated)?;
        Ok(CurrentUser(state.gateway.authenticate(&principal).await?))
    }
}

/// An authenticated, active administrator.
pub struct AdminUser(pub User);

impl<S: Store + 'static> FromRequestParts<AppState<S>> for AdminUser {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let principal = state
            .identity
            .identify(&parts.headers)
            .await
            .ok_or(GatewayError::Unauthenticated)?;
        Ok(AdminUser(state.gateway.authorize_admin(&principal).await?))
    }
}

/// The caller's address, unnormalized. `None` when unknown.
pub struct ClientIp(pub Option<String>);

const X_FORWARDED_FOR: &str = "x-forwarded-for";

impl<S: Store + 'static> FromRequestParts<AppState<S>> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        if state.trust_proxy {
            if let Some(ip) = forwarded_for(&parts.headers) {
                return Ok(ClientIp(Some(ip)));
            }
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientIp(peer))
    }
}

/// First entry of `X-Forwarded-For`: the originating client.
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::RANGE)?.to_str().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Media
// ─────────────────────────────────────────────────────────────────────────────

fn media_response(media: MediaResponse) -> Response {
    match media {
        MediaResponse::Redirect(url) => {
            (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
        }
        MediaResponse::Full { size, body } => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
                (header::CONTENT_LENGTH, size.to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
            Body::from_stream(ReaderStream::new(body)),
        )
            .into_response(),
        MediaResponse::Partial { range, size, body } => (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
                (header::CONTENT_LENGTH, range.len().to_string()),
                (header::CONTENT_RANGE, range.content_range(size)),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
            Body::from_stream(ReaderStream::new(body)),
        )
            .into_response(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn banner() -> &'static str {
    BANNER
}

async fn content<S: Store + 'static>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Catalog>, GatewayError> {
    Ok(Json(state.gateway.accessible_catalog(&user.id).await?))
}

async fn stream<S: Store + 'static>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    ClientIp(ip): ClientIp,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    let media = state
        .gateway
        .stream_for_user(&user.id, &video_id, range_header(&headers), ip.as_deref())
        .await?;
    Ok(media_response(media))
}

async fn admin_stream<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let video_id: VideoId = parse_id(&id, "video")?;
    let media = state
        .gateway
        .stream_for_admin(&video_id, range_header(&headers))
        .await?;
    Ok(media_response(media))
}

async fn grant<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    ClientIp(ip): ClientIp,
    payload: Result<Json<GrantRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccessRule>), GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let rule = state
        .gateway
        .grant_access(&admin.id, request, ip.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn list_rules<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<AccessRule>>, GatewayError> {
    let user: UserId = parse_id(&id, "user")?;
    Ok(Json(state.gateway.rules_for(&user).await?))
}

async fn revoke<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<String>,
) -> Result<Response, GatewayError> {
    let rule_id: RuleId = parse_id(&id, "rule")?;
    state
        .gateway
        .revoke_access(&admin.id, &rule_id, ip.as_deref())
        .await?;
    Ok(message(StatusCode::OK, "Access rule removed"))
}

async fn logs<S: Store + 'static>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<AuditRecord>>, GatewayError> {
    Ok(Json(state.gateway.recent_audit(AUDIT_PAGE).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(forwarded_for(&headers).as_deref(), Some("203.0.113.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static(" , 10.0.0.1"));
        assert_eq!(forwarded_for(&headers), None);
        assert_eq!(forwarded_for(&HeaderMap::new()), None);
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (GatewayError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (GatewayError::NotAdmin, StatusCode::FORBIDDEN),
            (GatewayError::AccessDenied, StatusCode::FORBIDDEN),
            (GatewayError::VideoNotFound(VideoId::generate()), StatusCode::NOT_FOUND),
            (GatewayError::FileNotFound("a.mp4".into()), StatusCode::NOT_FOUND),
            (GatewayError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (
                GatewayError::Store(vidgate_store::StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
