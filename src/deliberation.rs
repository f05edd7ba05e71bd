//! Deliberation use cases: clinical-history pre-analysis, case submission,
//! the committee-style deliberative analysis and the guided chat.
//!
//! Every function here blocks on external services and is meant to run on a
//! blocking thread. The session lock is only held to read a snapshot or to
//! write a result back, never across an AI or storage call.

use serde::Serialize;
use uuid::Uuid;

use crate::ai::prompt::{chat_prompt, clinical_history_prompt, deliberation_prompt};
use crate::ai::{AiError, AiResponse, ModelFallback};
use crate::charts::build_charts;
use crate::consent::consent_text;
use crate::core_state::{CoreError, CoreState};
use crate::ethics::check_coherence;
use crate::models::{BioethicsCase, CaseForm, CaseReport, ChatMessage, ModelError};
use crate::report::{compile_report, prompt_context};
use crate::session::SessionContext;
use crate::store::{CaseSummary, CaseUpdate, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DeliberationError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("No active case: submit a case first")]
    NoActiveCase,

    #[error("The active case changed while the answer was being generated")]
    CaseChanged,

    #[error("AI features are disabled: no Gemini API key configured")]
    AiDisabled,

    #[error("Case storage is not configured")]
    StorageDisabled,

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of persisting a change: stored, not stored (no backend), or failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Persistence {
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_error: Option<String>,
}

impl Persistence {
    fn from_result(result: Option<Result<(), StoreError>>, case_id: &str) -> Self {
        match result {
            None => Self::default(),
            Some(Ok(())) => Self {
                saved: true,
                storage_error: None,
            },
            Some(Err(e)) => {
                tracing::warn!(case_id = %case_id, "Case not persisted: {e}");
                Self {
                    saved: false,
                    storage_error: Some(e.to_string()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub report: CaseReport,
    pub consent_generated: bool,
    #[serde(flatten)]
    pub persistence: Persistence,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliberationOutcome {
    pub case_id: String,
    pub analysis: String,
    pub model: String,
    #[serde(flatten)]
    pub persistence: Persistence,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub case_id: String,
    pub answer: String,
    pub model: String,
    pub history: Vec<ChatMessage>,
    #[serde(flatten)]
    pub persistence: Persistence,
}

fn require_ai(core: &CoreState) -> Result<&ModelFallback, DeliberationError> {
    core.ai().ok_or(DeliberationError::AiDisabled)
}

/// The active report and the revision it was read at.
fn active_report_snapshot(
    core: &CoreState,
    session: &SessionContext,
) -> Result<(CaseReport, Uuid), DeliberationError> {
    let workspace = core.workspace_snapshot(&session.token_hash)?;
    let report = workspace.report.ok_or(DeliberationError::NoActiveCase)?;
    Ok((report, workspace.revision))
}

/// Apply `f` to the active report if no submission replaced it since
/// `revision` was read.
fn update_active_report<T>(
    core: &CoreState,
    session: &SessionContext,
    revision: Uuid,
    f: impl FnOnce(&mut CaseReport) -> T,
) -> Result<T, DeliberationError> {
    core.update_workspace(&session.token_hash, |ws| {
        let current = ws.revision;
        match ws.report.as_mut() {
            Some(report) if current == revision => Ok(f(report)),
            Some(_) => Err(DeliberationError::CaseChanged),
            None => Err(DeliberationError::NoActiveCase),
        }
    })?
}

fn persist_update(
    core: &CoreState,
    session: &SessionContext,
    case_id: &str,
    update: CaseUpdate,
) -> Persistence {
    let result = core
        .store()
        .map(|store| store.update_case(&session.user.uid, case_id, &update));
    Persistence::from_result(result, case_id)
}

// ═══════════════════════════════════════════════════════════
// Use cases
// ═══════════════════════════════════════════════════════════

/// AI pre-analysis of a pasted clinical history. The result is kept in the
/// session and attached to the next submitted case.
pub fn analyze_clinical_history(
    core: &CoreState,
    session: &SessionContext,
    clinical_history: &str,
) -> Result<AiResponse, DeliberationError> {
    let clinical_history = clinical_history.trim();
    if clinical_history.is_empty() {
        return Err(DeliberationError::InvalidInput(
            "Paste the patient's clinical history to analyze".into(),
        ));
    }
    let ai = require_ai(core)?;

    let response = ai.generate(&clinical_history_prompt(clinical_history))?;
    let text = response.text.clone();
    core.update_workspace(&session.token_hash, |ws| {
        ws.clinical_history_analysis = Some(text)
    })?;
    tracing::info!(model = %response.model, "Clinical history analyzed");
    Ok(response)
}

/// Validate and analyze a case form, make it the session's active case and
/// persist it when storage is available.
pub fn submit_case(
    core: &CoreState,
    session: &SessionContext,
    form: CaseForm,
) -> Result<SubmitOutcome, DeliberationError> {
    let workspace = core.workspace_snapshot(&session.token_hash)?;
    let wants_consent = form.generate_consent;

    let case = BioethicsCase::from_form(
        form,
        Some(&session.user.email),
        &core.catalog,
        workspace.clinical_history_analysis.as_deref(),
    )?;

    let ethical_analysis = check_coherence(&case.perspectives);
    let report = compile_report(&case, build_charts(&case.perspectives), ethical_analysis);
    let consent = wants_consent.then(|| consent_text(&case, &core.catalog));

    let active = report.clone();
    core.update_workspace(&session.token_hash, move |ws| ws.activate(active, consent))?;
    tracing::info!(
        case_id = %report.case_id,
        severity = %report.ethical_analysis.severity,
        "Case analyzed"
    );

    let result = core
        .store()
        .map(|store| store.save_case(&session.user.uid, &report));
    let persistence = Persistence::from_result(result, &report.case_id);

    Ok(SubmitOutcome {
        report,
        consent_generated: wants_consent,
        persistence,
    })
}

/// Committee-style AI analysis of the active case; replaces any previous one.
pub fn generate_deliberation(
    core: &CoreState,
    session: &SessionContext,
) -> Result<DeliberationOutcome, DeliberationError> {
    let (report, revision) = active_report_snapshot(core, session)?;
    let ai = require_ai(core)?;

    let response = ai.generate(&deliberation_prompt(&prompt_context(&report)?))?;
    let analysis = response.text.clone();
    update_active_report(core, session, revision, |active| {
        active.deliberative_analysis = analysis.clone();
    })?;

    let persistence = persist_update(
        core,
        session,
        &report.case_id,
        CaseUpdate::DeliberativeAnalysis(analysis.clone()),
    );
    Ok(DeliberationOutcome {
        case_id: report.case_id,
        analysis,
        model: response.model,
        persistence,
    })
}

/// Answer a question about the active case. Both turns are recorded only
/// when the model answers.
pub fn ask_question(
    core: &CoreState,
    session: &SessionContext,
    question: &str,
) -> Result<ChatOutcome, DeliberationError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(DeliberationError::InvalidInput("The question is empty".into()));
    }
    let (report, revision) = active_report_snapshot(core, session)?;
    let ai = require_ai(core)?;

    let response = ai.generate(&chat_prompt(&prompt_context(&report)?, question))?;
    let answer = response.text.clone();
    let history = update_active_report(core, session, revision, |active| {
        active.chat_history.push(ChatMessage::user(question));
        active.chat_history.push(ChatMessage::assistant(answer.clone()));
        active.chat_history.clone()
    })?;

    let persistence = persist_update(
        core,
        session,
        &report.case_id,
        CaseUpdate::ChatHistory(history.clone()),
    );
    Ok(ChatOutcome {
        case_id: report.case_id,
        answer,
        model: response.model,
        history,
        persistence,
    })
}

pub fn active_report(
    core: &CoreState,
    session: &SessionContext,
) -> Result<CaseReport, DeliberationError> {
    Ok(active_report_snapshot(core, session)?.0)
}

/// Consent text of the active case, if one was requested.
pub fn active_consent(
    core: &CoreState,
    session: &SessionContext,
) -> Result<Option<String>, DeliberationError> {
    let workspace = core.workspace_snapshot(&session.token_hash)?;
    if workspace.report.is_none() {
        return Err(DeliberationError::NoActiveCase);
    }
    Ok(workspace.consent_text)
}

pub fn list_saved_cases(
    core: &CoreState,
    session: &SessionContext,
) -> Result<Vec<CaseSummary>, DeliberationError> {
    let store = core.store().ok_or(DeliberationError::StorageDisabled)?;
    let cases = store.list_cases(&session.user.uid)?;
    Ok(cases.iter().map(CaseSummary::from).collect())
}

pub fn get_saved_case(
    core: &CoreState,
    session: &SessionContext,
    case_id: &str,
) -> Result<Option<CaseReport>, DeliberationError> {
    let store = core.store().ok_or(DeliberationError::StorageDisabled)?;
    Ok(store.get_case(&session.user.uid, case_id)?)
}
