//! Generative-AI access: the `LlmClient` seam, the Gemini REST client and
//! the ordered model fallback.

pub mod fallback;
pub mod gemini;
pub mod prompt;
pub mod types;

pub use fallback::ModelFallback;
pub use gemini::GeminiClient;
pub use types::{AiResponse, LlmClient, ModelAttempt};

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Cannot reach the model API at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model API returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Response blocked by the provider: {0}")]
    Blocked(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("No models configured")]
    NoModelsConfigured,

    #[error("All models failed: {}", types::describe_attempts(.attempts))]
    AllModelsFailed { attempts: Vec<ModelAttempt> },
}
