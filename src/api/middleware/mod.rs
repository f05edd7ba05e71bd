//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter, rejects early
//! 2. Auth validator, resolves the bearer token to a session
//! 3. Audit logger, runs after auth so it knows the user

pub mod audit;
pub mod auth;
pub mod rate;

/// Bearer token from the `Authorization` header, if present.
pub(crate) fn bearer_token(req: &axum::http::Request<axum::body::Body>) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
