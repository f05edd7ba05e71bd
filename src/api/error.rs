//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::deliberation::DeliberationError;
use crate::firebase::FirebaseError;
use crate::pdf::PdfError;
use crate::store::StoreError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid e-mail or password")]
    InvalidCredentials,
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No active case")]
    NoActiveCase,
    #[error("Active case changed")]
    CaseChanged,
    #[error("AI features are disabled")]
    AiDisabled,
    #[error("AI unavailable: {0}")]
    AiUnavailable(String),
    #[error("Authentication service unavailable: {0}")]
    AuthUnavailable(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required, sign in again".to_string(),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid e-mail or password".to_string(),
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Retry after {retry_after}s"),
            ),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::NoActiveCase => (
                StatusCode::CONFLICT,
                "NO_ACTIVE_CASE",
                "No active case: submit a case first".to_string(),
            ),
            ApiError::CaseChanged => (
                StatusCode::CONFLICT,
                "CASE_CHANGED",
                "The active case changed while the request was running".to_string(),
            ),
            ApiError::AiDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "AI_DISABLED",
                "AI features are disabled: no Gemini API key configured".to_string(),
            ),
            ApiError::AiUnavailable(detail) => {
                tracing::warn!(detail, "AI request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "AI_UNAVAILABLE",
                    format!("Could not get a response from the AI: {detail}"),
                )
            }
            ApiError::AuthUnavailable(detail) => {
                tracing::warn!(detail, "Authentication provider failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AUTH_UNAVAILABLE",
                    "Authentication service unavailable".to_string(),
                )
            }
            ApiError::StorageUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
                format!("Case storage unavailable: {detail}"),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SessionNotFound => ApiError::Unauthorized,
            CoreError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(format!("Case '{what}' not found")),
            StoreError::Unavailable(detail) => ApiError::StorageUnavailable(detail),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<FirebaseError> for ApiError {
    fn from(err: FirebaseError) -> Self {
        match err {
            FirebaseError::InvalidCredentials => ApiError::InvalidCredentials,
            FirebaseError::EmailExists => {
                ApiError::BadRequest("An account with this e-mail already exists".into())
            }
            FirebaseError::WeakPassword(detail) => {
                ApiError::BadRequest(format!("Password is too weak: {detail}"))
            }
            FirebaseError::InvalidEmail => ApiError::BadRequest("Invalid e-mail address".into()),
            e if e.is_unavailable() => ApiError::AuthUnavailable(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DeliberationError> for ApiError {
    fn from(err: DeliberationError) -> Self {
        match err {
            DeliberationError::InvalidInput(detail) => ApiError::BadRequest(detail),
            DeliberationError::Model(e) => ApiError::BadRequest(e.to_string()),
            DeliberationError::NoActiveCase => ApiError::NoActiveCase,
            DeliberationError::CaseChanged => ApiError::CaseChanged,
            DeliberationError::AiDisabled => ApiError::AiDisabled,
            DeliberationError::StorageDisabled => {
                ApiError::StorageUnavailable("case storage is not configured".into())
            }
            DeliberationError::Ai(e) => ApiError::AiUnavailable(e.to_string()),
            DeliberationError::Store(e) => e.into(),
            DeliberationError::Core(e) => e.into(),
            DeliberationError::Serialization(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PdfError> for ApiError {
    fn from(err: PdfError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn error_code(response: Response) -> String {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["error"]["code"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn rate_limited_returns_429_with_retry_after() {
        let response = ApiError::RateLimited { retry_after: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
        assert_eq!(error_code(response).await, "RATE_LIMITED");
    }

    #[tokio::test]
    async fn no_active_case_returns_409() {
        let response = ApiError::from(DeliberationError::NoActiveCase).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(error_code(response).await, "NO_ACTIVE_CASE");
    }

    #[tokio::test]
    async fn exhausted_models_return_502() {
        let err = DeliberationError::Ai(crate::ai::AiError::AllModelsFailed {
            attempts: Vec::new(),
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(error_code(response).await, "AI_UNAVAILABLE");
    }

    #[tokio::test]
    async fn provider_errors_map_to_client_codes() {
        let response = ApiError::from(FirebaseError::InvalidCredentials).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "INVALID_CREDENTIALS");

        let response = ApiError::from(FirebaseError::EmailExists).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(FirebaseError::Http("connect refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_code(response).await, "AUTH_UNAVAILABLE");
    }

    #[tokio::test]
    async fn storage_errors_map_by_kind() {
        let response = ApiError::from(StoreError::NotFound("HC-1".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = ApiError::from(StoreError::Unavailable("down".into())).into_response();
        assert_eq!(error_code(response).await, "STORAGE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("something broke".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn lost_session_maps_to_401() {
        let response = ApiError::from(CoreError::SessionNotFound).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
