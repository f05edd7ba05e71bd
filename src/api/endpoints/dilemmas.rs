//! Dilemma catalog endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::models::Dilemma;

#[derive(Serialize)]
pub struct DilemmasResponse {
    pub default_dilemma: Option<String>,
    pub dilemmas: Vec<Dilemma>,
}

/// `GET /api/dilemmas`: the selectable primary dilemmas with their consent details.
pub async fn list(State(ctx): State<ApiContext>) -> Json<DilemmasResponse> {
    let catalog = &ctx.core.catalog;
    Json(DilemmasResponse {
        default_dilemma: catalog.default_name().map(str::to_string),
        dilemmas: catalog.dilemmas().to_vec(),
    })
}
