//! API endpoint handlers.
//!
//! Each module corresponds to one area of the application. Handlers that
//! reach the AI, identity or storage providers run the blocking work on
//! the blocking thread pool.

pub mod analysis;
pub mod auth;
pub mod cases;
pub mod chat;
pub mod dilemmas;
pub mod health;
pub mod saved_cases;

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;

/// Run blocking provider calls off the async workers.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

/// `application/pdf` attachment response.
pub(crate) fn pdf_attachment(bytes: Vec<u8>, filename: &str) -> Response {
    let disposition = format!("attachment; filename=\"{filename}\"");
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// Case ids are user text; keep file names to a safe character set.
pub(crate) fn safe_file_stem(case_id: &str) -> String {
    case_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_replaces_unsafe_chars() {
        assert_eq!(safe_file_stem("HC-2024/01 \"x\""), "HC-2024_01__x_");
    }
}
