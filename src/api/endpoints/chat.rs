//! Guided deliberation chat endpoints.
//!
//! - `GET /api/chat/questions`: the guided questions offered to the user
//! - `POST /api/chat`: ask a question about the active case
//! - `GET /api/chat/history`: the active case's conversation

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::ai::prompt::GUIDED_QUESTIONS;
use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::deliberation::{self, ChatOutcome};
use crate::models::ChatMessage;
use crate::session::SessionContext;

/// Longest accepted question, in characters.
const MAX_QUESTION_CHARS: usize = 2000;

#[derive(Serialize)]
pub struct QuestionsResponse {
    pub questions: &'static [&'static str],
}

/// `GET /api/chat/questions`
pub async fn questions() -> Json<QuestionsResponse> {
    Json(QuestionsResponse {
        questions: &GUIDED_QUESTIONS,
    })
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// `POST /api/chat`
pub async fn ask(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<AskRequest>,
) -> Result<Json<ChatOutcome>, ApiError> {
    if req.question.chars().count() > MAX_QUESTION_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Question too long (max {MAX_QUESTION_CHARS} chars)"
        )));
    }
    let core = ctx.core.clone();
    let outcome =
        run_blocking(move || Ok(deliberation::ask_question(&core, &session, &req.question)?))
            .await?;
    Ok(Json(outcome))
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub case_id: String,
    pub messages: Vec<ChatMessage>,
}

/// `GET /api/chat/history`
pub async fn history(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let report = deliberation::active_report(&ctx.core, &session)?;
    Ok(Json(HistoryResponse {
        case_id: report.case_id,
        messages: report.chat_history,
    }))
}
