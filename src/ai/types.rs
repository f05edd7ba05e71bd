use serde::Serialize;

use super::AiError;

/// Text-generation backend. Implementations block; async callers go through
/// `spawn_blocking`.
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AiError>;
}

/// A successful generation and the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiResponse {
    pub text: String,
    pub model: String,
}

/// One failed model attempt inside a fallback run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelAttempt {
    pub model: String,
    pub error: String,
}

pub(crate) fn describe_attempts(attempts: &[ModelAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.model, a.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Mock LLM client for testing: answers every model except the failing ones
/// and records the models it was asked for.
#[cfg(test)]
pub struct MockLlmClient {
    response: String,
    failing_models: Vec<String>,
    calls: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            failing_models: Vec::new(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, models: &[&str]) -> Self {
        self.failing_models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Models asked for, in call order.
    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(_, p)| p.clone())
    }
}

#[cfg(test)]
impl LlmClient for MockLlmClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AiError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        if self.failing_models.iter().any(|m| m == model) {
            return Err(AiError::Api {
                status: 404,
                body: format!("model {model} not found"),
            });
        }
        Ok(self.response.clone())
    }
}
