//! Firebase REST access: Identity Toolkit sign-in/sign-up, the
//! service-account OAuth token and the Firestore document API.

pub mod auth;
pub mod firestore;
pub mod token;

pub use auth::{AuthProvider, AuthUser, FirebaseAuthClient};
pub use firestore::FirestoreClient;
pub use token::{AccessTokenSource, ServiceAccountTokenProvider};

#[derive(Debug, thiserror::Error)]
pub enum FirebaseError {
    #[error("Invalid e-mail or password")]
    InvalidCredentials,

    #[error("An account with this e-mail already exists")]
    EmailExists,

    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    #[error("Invalid e-mail address")]
    InvalidEmail,

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Firebase returned error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Access token error: {0}")]
    Token(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Malformed Firestore value: {0}")]
    Codec(String),

    #[error("Firebase configuration error: {0}")]
    Config(String),
}

impl FirebaseError {
    /// Transport-level failures: the provider could not be reached or answered
    /// with a server error.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Token(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Shared blocking HTTP client construction for the Firebase clients.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, FirebaseError> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FirebaseError::Http(e.to_string()))
}

/// Map a reqwest error without its URL, which may carry an API key.
pub(crate) fn transport_error(e: reqwest::Error) -> FirebaseError {
    FirebaseError::Http(e.without_url().to_string())
}

/// `{"error": {"message": ...}}` body returned by Google APIs.
pub(crate) fn google_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(300).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_message_extracts_message() {
        let body = r#"{"error": {"code": 400, "message": "EMAIL_EXISTS", "errors": []}}"#;
        assert_eq!(google_error_message(body), "EMAIL_EXISTS");
        assert_eq!(google_error_message("plain failure"), "plain failure");
    }

    #[test]
    fn unavailable_classification() {
        assert!(FirebaseError::Http("reset".into()).is_unavailable());
        assert!(FirebaseError::Api { status: 503, message: String::new() }.is_unavailable());
        assert!(!FirebaseError::Api { status: 400, message: String::new() }.is_unavailable());
        assert!(!FirebaseError::InvalidCredentials.is_unavailable());
    }
}
