//! Active case endpoints.
//!
//! - `POST /api/cases`: submit a case form, making it the active case
//! - `GET /api/cases/active`: the active case report (with chart specs)
//! - `POST /api/cases/active/deliberation`: AI deliberative analysis
//! - `GET /api/cases/active/report.pdf`: the deliberative report PDF
//! - `GET /api/cases/active/consent`: the consent text, if requested
//! - `GET /api/cases/active/consent.pdf`: the consent PDF

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::{pdf_attachment, run_blocking, safe_file_stem};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::consent::generate_consent_pdf;
use crate::deliberation::{self, DeliberationOutcome, SubmitOutcome};
use crate::models::{CaseForm, CaseReport};
use crate::report::generate_report_pdf;
use crate::session::SessionContext;

/// `POST /api/cases`: validate, analyze and persist a case.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(form): Json<CaseForm>,
) -> Result<(StatusCode, Json<SubmitOutcome>), ApiError> {
    let core = ctx.core.clone();
    let outcome =
        run_blocking(move || Ok(deliberation::submit_case(&core, &session, form)?)).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/cases/active`
pub async fn active(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<CaseReport>, ApiError> {
    Ok(Json(deliberation::active_report(&ctx.core, &session)?))
}

/// `POST /api/cases/active/deliberation`
pub async fn deliberate(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<DeliberationOutcome>, ApiError> {
    let core = ctx.core.clone();
    let outcome =
        run_blocking(move || Ok(deliberation::generate_deliberation(&core, &session)?)).await?;
    Ok(Json(outcome))
}

/// `GET /api/cases/active/report.pdf`
pub async fn report_pdf(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let report = deliberation::active_report(&ctx.core, &session)?;
    let filename = format!("Report_{}.pdf", safe_file_stem(&report.case_id));
    let bytes = run_blocking(move || Ok(generate_report_pdf(&report)?)).await?;
    Ok(pdf_attachment(bytes, &filename))
}

#[derive(Serialize)]
pub struct ConsentResponse {
    pub case_id: String,
    pub text: String,
}

async fn consent_text(
    ctx: &ApiContext,
    session: &SessionContext,
) -> Result<ConsentResponse, ApiError> {
    let report = deliberation::active_report(&ctx.core, session)?;
    let text = deliberation::active_consent(&ctx.core, session)?.ok_or_else(|| {
        ApiError::NotFound("No consent was generated for the active case".into())
    })?;
    Ok(ConsentResponse {
        case_id: report.case_id,
        text,
    })
}

/// `GET /api/cases/active/consent`
pub async fn consent(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<ConsentResponse>, ApiError> {
    Ok(Json(consent_text(&ctx, &session).await?))
}

/// `GET /api/cases/active/consent.pdf`
pub async fn consent_pdf(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let consent = consent_text(&ctx, &session).await?;
    let filename = format!("Consent_{}.pdf", safe_file_stem(&consent.case_id));
    let bytes = run_blocking(move || Ok(generate_consent_pdf(&consent.text)?)).await?;
    Ok(pdf_attachment(bytes, &filename))
}
