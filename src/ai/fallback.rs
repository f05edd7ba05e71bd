use std::sync::Arc;

use super::types::{AiResponse, LlmClient, ModelAttempt};
use super::AiError;

/// Ordered model fallback.
///
/// A prompt is sent to each model of the preference list in turn; the first
/// success wins. Failure is reported only once every model has failed, and
/// carries each attempt's error.
#[derive(Clone)]
pub struct ModelFallback {
    client: Arc<dyn LlmClient>,
    models: Vec<String>,
}

impl ModelFallback {
    pub fn new(client: Arc<dyn LlmClient>, models: Vec<String>) -> Self {
        Self { client, models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn generate(&self, prompt: &str) -> Result<AiResponse, AiError> {
        if self.models.is_empty() {
            return Err(AiError::NoModelsConfigured);
        }

        let mut attempts = Vec::with_capacity(self.models.len());
        for model in &self.models {
            match self.client.generate(model, prompt) {
                Ok(text) => {
                    tracing::info!(model = %model, failed_before = attempts.len(), "Model responded");
                    return Ok(AiResponse {
                        text,
                        model: model.clone(),
                    });
                }
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "Model attempt failed");
                    attempts.push(ModelAttempt {
                        model: model.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(AiError::AllModelsFailed { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::MockLlmClient;
    use crate::config::DEFAULT_MODELS;

    fn fallback(mock: &Arc<MockLlmClient>) -> ModelFallback {
        ModelFallback::new(
            mock.clone(),
            DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        )
    }

    #[test]
    fn first_model_success_stops_there() {
        let mock = Arc::new(MockLlmClient::new("answer"));
        let response = fallback(&mock).generate("prompt").unwrap();
        assert_eq!(response.text, "answer");
        assert_eq!(response.model, "gemini-2.0-flash-exp");
        assert_eq!(mock.models_called(), vec!["gemini-2.0-flash-exp"]);
    }

    #[test]
    fn falls_through_in_order_until_success() {
        let mock = Arc::new(
            MockLlmClient::new("late answer")
                .failing(&["gemini-2.0-flash-exp", "gemini-1.5-pro-001"]),
        );
        let response = fallback(&mock).generate("prompt").unwrap();
        assert_eq!(response.model, "gemini-1.5-flash-001");
        assert_eq!(
            mock.models_called(),
            vec!["gemini-2.0-flash-exp", "gemini-1.5-pro-001", "gemini-1.5-flash-001"]
        );
    }

    #[test]
    fn last_model_can_rescue() {
        let mock = Arc::new(MockLlmClient::new("ok").failing(&DEFAULT_MODELS[..3]));
        let response = fallback(&mock).generate("prompt").unwrap();
        assert_eq!(response.model, "gemini-1.5-flash");
        assert_eq!(mock.models_called().len(), 4);
    }

    #[test]
    fn fails_only_after_all_four() {
        let mock = Arc::new(MockLlmClient::new("never").failing(DEFAULT_MODELS));
        let err = fallback(&mock).generate("prompt").unwrap_err();
        match err {
            AiError::AllModelsFailed { attempts } => {
                let models: Vec<&str> = attempts.iter().map(|a| a.model.as_str()).collect();
                assert_eq!(models, DEFAULT_MODELS);
                assert!(attempts[0].error.contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mock.models_called(), DEFAULT_MODELS);
    }

    #[test]
    fn empty_model_list_is_an_error() {
        let mock = Arc::new(MockLlmClient::new("x"));
        let err = ModelFallback::new(mock.clone(), Vec::new())
            .generate("prompt")
            .unwrap_err();
        assert!(matches!(err, AiError::NoModelsConfigured));
        assert!(mock.models_called().is_empty());
    }

    #[test]
    fn prompt_is_forwarded_unchanged() {
        let mock = Arc::new(MockLlmClient::new("x"));
        fallback(&mock).generate("Analyze this").unwrap();
        assert_eq!(mock.last_prompt().as_deref(), Some("Analyze this"));
    }
}
