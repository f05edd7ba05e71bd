//! Case persistence: one document per case under the owning user.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreCaseStore;
pub use memory::MemoryCaseStore;

use serde::Serialize;

use crate::firebase::FirebaseError;
use crate::models::{CaseReport, ChatMessage, FIELD_CHAT_HISTORY, FIELD_DELIBERATIVE_ANALYSIS};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Case '{0}' not found")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<FirebaseError> for StoreError {
    fn from(e: FirebaseError) -> Self {
        match e {
            FirebaseError::NotFound(path) => StoreError::NotFound(path),
            e if e.is_unavailable() => StoreError::Unavailable(e.to_string()),
            e => StoreError::Backend(e.to_string()),
        }
    }
}

/// In-place update of a stored case after creation.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseUpdate {
    DeliberativeAnalysis(String),
    ChatHistory(Vec<ChatMessage>),
}

impl CaseUpdate {
    /// Stored field name and its JSON value.
    pub fn field(&self) -> Result<(&'static str, serde_json::Value), StoreError> {
        Ok(match self {
            CaseUpdate::DeliberativeAnalysis(text) => {
                (FIELD_DELIBERATIVE_ANALYSIS, serde_json::Value::String(text.clone()))
            }
            CaseUpdate::ChatHistory(history) => {
                (FIELD_CHAT_HISTORY, serde_json::to_value(history)?)
            }
        })
    }

    pub fn apply(&self, report: &mut CaseReport) {
        match self {
            CaseUpdate::DeliberativeAnalysis(text) => report.deliberative_analysis = text.clone(),
            CaseUpdate::ChatHistory(history) => report.chat_history = history.clone(),
        }
    }
}

/// Listing entry for a stored case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSummary {
    pub case_id: String,
    pub analyzed_at: String,
    pub patient_summary: String,
    pub primary_dilemma: String,
}

impl From<&CaseReport> for CaseSummary {
    fn from(report: &CaseReport) -> Self {
        Self {
            case_id: report.case_id.clone(),
            analyzed_at: report.analyzed_at.clone(),
            patient_summary: report.patient_summary.clone(),
            primary_dilemma: report.primary_dilemma.clone(),
        }
    }
}

/// Per-user case storage. Implementations block.
pub trait CaseStore: Send + Sync {
    /// Create or replace the case document.
    fn save_case(&self, uid: &str, report: &CaseReport) -> Result<(), StoreError>;

    /// Update one field of an existing case; `NotFound` when it does not exist.
    fn update_case(&self, uid: &str, case_id: &str, update: &CaseUpdate) -> Result<(), StoreError>;

    /// The user's cases ordered by case id.
    fn list_cases(&self, uid: &str) -> Result<Vec<CaseReport>, StoreError>;

    fn get_case(&self, uid: &str, case_id: &str) -> Result<Option<CaseReport>, StoreError>;
}
