//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, validates it against the
//! session registry (which also records activity) and injects
//! `SessionContext` into request extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::bearer_token;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Require a live session.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?.to_string();

    let session = {
        let mut sessions = ctx.core.write_sessions()?;
        sessions.touch(&token).ok_or(ApiError::Unauthorized)?
    }; // RwLockWriteGuard dropped here, before any .await

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
