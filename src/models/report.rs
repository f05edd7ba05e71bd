use serde::{Deserialize, Serialize};

use super::{ChatRole, Perspectives, Severity};

/// Outcome of the ethical coherence check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthicalAnalysis {
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub severity: Severity,
    /// Accumulated severity points behind `severity`.
    #[serde(default)]
    pub severity_points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Plotly-compatible figure specs for the case dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseCharts {
    pub radar: Option<serde_json::Value>,
    pub consensus: Option<serde_json::Value>,
    pub balance: Option<serde_json::Value>,
}

/// The deliberative report: the stored document for one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub case_id: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub analyzed_at: String,
    pub analyst: String,
    pub patient_summary: String,
    pub primary_dilemma: String,
    #[serde(default)]
    pub suggested_dilemma: String,
    #[serde(default)]
    pub case_description: String,
    #[serde(default)]
    pub sociocultural_context: String,
    #[serde(default)]
    pub ai_key_points: String,
    #[serde(default)]
    pub clinical_history_analysis: String,
    pub perspectives: Perspectives,
    pub ethical_analysis: EthicalAnalysis,
    #[serde(default)]
    pub deliberative_analysis: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub charts: CaseCharts,
}

/// Stored field names that are updated in place after creation.
pub const FIELD_DELIBERATIVE_ANALYSIS: &str = "deliberative_analysis";
pub const FIELD_CHAT_HISTORY: &str = "chat_history";

#[cfg(test)]
impl CaseReport {
    /// Minimal report for storage and API tests.
    pub(crate) fn sample(case_id: &str) -> Self {
        Self {
            case_id: case_id.into(),
            analyzed_at: "2024-05-01 10:00:00".into(),
            analyst: "dr@example.org".into(),
            patient_summary: "Patient X, 70 years, gender N/A, condition Stable.".into(),
            primary_dilemma: "Refusal of treatment".into(),
            suggested_dilemma: String::new(),
            case_description: String::new(),
            sociocultural_context: String::new(),
            ai_key_points: String::new(),
            clinical_history_analysis: String::new(),
            perspectives: Perspectives::default(),
            ethical_analysis: EthicalAnalysis {
                warnings: Vec::new(),
                recommendations: Vec::new(),
                severity: Severity::Low,
                severity_points: 0,
            },
            deliberative_analysis: String::new(),
            chat_history: Vec::new(),
            charts: CaseCharts::default(),
        }
    }
}
