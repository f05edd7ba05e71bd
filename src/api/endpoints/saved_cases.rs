//! Stored case endpoints for the signed-in user.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::deliberation;
use crate::models::CaseReport;
use crate::session::SessionContext;
use crate::store::CaseSummary;

#[derive(Serialize)]
pub struct SavedCasesResponse {
    pub cases: Vec<CaseSummary>,
}

/// `GET /api/saved-cases`: summaries ordered by case id.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<SavedCasesResponse>, ApiError> {
    let core = ctx.core.clone();
    let cases = run_blocking(move || Ok(deliberation::list_saved_cases(&core, &session)?)).await?;
    Ok(Json(SavedCasesResponse { cases }))
}

/// `GET /api/saved-cases/:id`: one stored report.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(case_id): Path<String>,
) -> Result<Json<CaseReport>, ApiError> {
    let core = ctx.core.clone();
    let lookup = case_id.clone();
    let report =
        run_blocking(move || Ok(deliberation::get_saved_case(&core, &session, &lookup)?)).await?;
    report
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Case '{case_id}' not found")))
}
