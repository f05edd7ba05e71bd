//! Clinical history pre-analysis endpoint.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::ai::AiResponse;
use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::deliberation;
use crate::session::SessionContext;

#[derive(Deserialize)]
pub struct ClinicalHistoryRequest {
    pub clinical_history: String,
}

/// `POST /api/analysis/clinical-history`: extract the key bioethical
/// elements of a pasted clinical history. The result is attached to the
/// next submitted case.
pub async fn clinical_history(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<ClinicalHistoryRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    let core = ctx.core.clone();
    let response = run_blocking(move || {
        Ok(deliberation::analyze_clinical_history(
            &core,
            &session,
            &req.clinical_history,
        )?)
    })
    .await?;
    Ok(Json(response))
}
