//! Prompt templates for the deliberation assistant.

/// Guided deliberation questions offered by the chat assistant.
pub const GUIDED_QUESTIONS: [&str; 8] = [
    "What is the main conflict between bioethical principles in this case?",
    "From a legal point of view, which regulations or rulings are relevant here?",
    "Which mediation strategies could be used between the medical team and the family?",
    "Which alternative courses of action have not been considered yet?",
    "How do cultural or religious factors influence decision-making?",
    "If we prioritize the principle of beneficence, what would the recommended course of action be?",
    "Analyze the case using the methodologies of Diego Gracia and Anderson Díaz Pérez (MIEC).",
    "Which methodology would be most appropriate to analyze the case, and what are its purpose and development?",
];

pub fn clinical_history_prompt(clinical_history: &str) -> String {
    format!(
        "Analyze the following clinical history and extract the key bioethical elements: {clinical_history}"
    )
}

/// `report_context` is the case report serialized as JSON.
pub fn deliberation_prompt(report_context: &str) -> String {
    format!("As a bioethics committee, analyze: {report_context}")
}

pub fn chat_prompt(report_context: &str, question: &str) -> String {
    format!(
        "You are a bioethics expert. Case: {report_context}. Question: '{question}'. Answer concisely."
    )
}
