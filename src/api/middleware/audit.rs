//! Audit logging middleware.
//!
//! Logs every API request with method, path, response status, latency and
//! the signed-in user when known. Runs innermost, after auth has injected
//! `SessionContext`.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::session::SessionContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user = req
        .extensions()
        .get::<SessionContext>()
        .map(|s| s.user.uid.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let started = Instant::now();
    let response = next.run(req).await;

    tracing::info!(
        target: "audit",
        %method,
        path,
        status = response.status().as_u16(),
        user,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "api access"
    );
    response
}
