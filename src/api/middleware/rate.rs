//! Per-client rate limiting middleware.
//!
//! Sliding-window limits keyed by the verified session for requests carrying
//! a live bearer token, otherwise by the peer IP address:
//! - 100 requests per minute
//! - 1000 requests per hour

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::bearer_token;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::session::hash_token;

/// Unverified tokens never pick their own bucket: they fall back to the
/// peer address like anonymous calls.
fn rate_key(req: &Request<axum::body::Body>, ctx: &ApiContext) -> Result<String, ApiError> {
    if let Some(token) = bearer_token(req) {
        let sessions = ctx.core.read_sessions()?;
        if let Some(session) = sessions.get(&hash_token(token)) {
            return Ok(format!("session:{}", session.session_id));
        }
    }
    Ok(req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "anonymous".to_string()))
}

/// Returns 429 when the caller's window is full.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = rate_key(&req, &ctx)?;

    // MutexGuard is !Send, drop before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter
            .check(&key)
            .map_err(|retry_after| ApiError::RateLimited { retry_after })?;
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AppConfig;
    use crate::core_state::CoreState;
    use crate::firebase::AuthUser;
    use crate::models::DilemmaCatalog;

    fn context() -> ApiContext {
        ApiContext::new(Arc::new(CoreState::new(
            AppConfig::default(),
            DilemmaCatalog::bundled().unwrap(),
        )))
    }

    fn request(auth: Option<&str>, peer: Option<&str>) -> Request<axum::body::Body> {
        let mut builder = Request::builder().uri("/api/health");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let mut req = builder.body(axum::body::Body::empty()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            req.extensions_mut().insert(ConnectInfo(addr));
        }
        req
    }

    #[test]
    fn live_session_is_keyed_by_session_id() {
        let ctx = context();
        let (token, session_id) = ctx.core.write_sessions().unwrap().create(AuthUser {
            uid: "uid-1".into(),
            email: "dr@example.org".into(),
        });
        let header = format!("Bearer {token}");
        let key = rate_key(&request(Some(&header), Some("10.0.0.1:5000")), &ctx).unwrap();
        assert_eq!(key, format!("session:{session_id}"));
    }

    #[test]
    fn unknown_tokens_share_the_peer_bucket() {
        let ctx = context();
        let a = rate_key(&request(Some("Bearer 0001-bogus"), Some("10.0.0.1:5000")), &ctx);
        let b = rate_key(&request(Some("Bearer 0002-bogus"), Some("10.0.0.1:6000")), &ctx);
        assert_eq!(a.unwrap(), "ip:10.0.0.1");
        assert_eq!(b.unwrap(), "ip:10.0.0.1");
    }

    #[test]
    fn missing_peer_address_is_anonymous() {
        let ctx = context();
        assert_eq!(rate_key(&request(None, None), &ctx).unwrap(), "anonymous");
        assert_eq!(
            rate_key(&request(Some("Basic dXNlcg=="), None), &ctx).unwrap(),
            "anonymous"
        );
    }
}
