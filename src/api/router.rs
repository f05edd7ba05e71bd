//! HTTP API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Rate limiter → 2. Auth validator (protected routes) → 3. Audit logger

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router over shared core state.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build the router from a pre-constructed `ApiContext`.
pub fn api_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Rate limit → Auth → Audit (innermost) → Handler
    //
    // Extension must be outermost so all middleware can access ApiContext.
    // .with_state() turns Router<ApiContext> into Router<()> so the from_fn
    // layers (state = ()) fit.
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/auth/me", get(endpoints::auth::me))
        .route(
            "/analysis/clinical-history",
            post(endpoints::analysis::clinical_history),
        )
        .route("/cases", post(endpoints::cases::submit))
        .route("/cases/active", get(endpoints::cases::active))
        .route(
            "/cases/active/deliberation",
            post(endpoints::cases::deliberate),
        )
        .route("/cases/active/report.pdf", get(endpoints::cases::report_pdf))
        .route("/cases/active/consent", get(endpoints::cases::consent))
        .route(
            "/cases/active/consent.pdf",
            get(endpoints::cases::consent_pdf),
        )
        .route("/chat/questions", get(endpoints::chat::questions))
        .route("/chat", post(endpoints::chat::ask))
        .route("/chat/history", get(endpoints::chat::history))
        .route("/saved-cases", get(endpoints::saved_cases::list))
        .route("/saved-cases/:id", get(endpoints::saved_cases::detail))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    // Public routes (rate-limited only)
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/dilemmas", get(endpoints::dilemmas::list))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    let mut router = Router::new()
        .nest("/api", protected)
        .nest("/api", public)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&ctx.core.config.server.cors_origins) {
        router = router.layer(cors);
    }
    router
}

/// CORS for the configured browser origins; `None` when none are valid.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
