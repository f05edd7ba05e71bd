//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ai_enabled: bool,
    pub models: Vec<String>,
    pub auth_enabled: bool,
    pub storage_enabled: bool,
    pub active_sessions: usize,
    pub uptime_secs: u64,
}

/// `GET /api/health`: service status and which providers are configured.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let core = &ctx.core;
    let active_sessions = core.read_sessions()?.len();

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        ai_enabled: core.ai().is_some(),
        models: core
            .ai()
            .map(|ai| ai.models().to_vec())
            .unwrap_or_default(),
        auth_enabled: core.auth().is_some(),
        storage_enabled: core.store().is_some(),
        active_sessions,
        uptime_secs: core.uptime().as_secs(),
    }))
}
