//! Account and session endpoints.
//!
//! `POST /api/auth/register`: create an account with the identity provider
//! `POST /api/auth/login`: sign in and open a session (returns the bearer token)
//! `POST /api/auth/logout`: end the current session
//! `GET /api/auth/me`: the signed-in user

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::firebase::{AuthProvider, AuthUser};
use crate::session::SessionContext;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    fn validated(self) -> Result<(String, String), ApiError> {
        let email = self.email.trim().to_string();
        if email.is_empty() || self.password.is_empty() {
            return Err(ApiError::BadRequest(
                "Please enter your e-mail and password".into(),
            ));
        }
        Ok((email, self.password))
    }
}

fn provider(ctx: &ApiContext) -> Result<std::sync::Arc<dyn AuthProvider>, ApiError> {
    ctx.core
        .auth()
        .ok_or_else(|| ApiError::AuthUnavailable("sign-in is not configured".into()))
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: AuthUser,
    pub message: &'static str,
}

/// `POST /api/auth/register`: create an account. Does not sign in.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let (email, password) = credentials.validated()?;
    let auth = provider(&ctx)?;

    let user = run_blocking(move || Ok(auth.sign_up(&email, &password)?)).await?;
    tracing::info!(uid = %user.uid, "Account created");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            message: "Account created. Please sign in.",
        }),
    ))
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub session_id: Uuid,
    pub user: AuthUser,
    pub inactivity_timeout_secs: u64,
}

/// `POST /api/auth/login`: verify credentials and open a session.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (email, password) = credentials.validated()?;
    let auth = provider(&ctx)?;

    let user = run_blocking(move || Ok(auth.sign_in(&email, &password)?)).await?;

    let (token, session_id) = ctx.core.write_sessions()?.create(user.clone());
    tracing::info!(uid = %user.uid, %session_id, "User signed in");

    Ok(Json(LoginResponse {
        token,
        session_id,
        user,
        inactivity_timeout_secs: ctx.core.config.session.inactivity_timeout_secs,
    }))
}

/// `POST /api/auth/logout`: discard the session and its active case.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<StatusCode, ApiError> {
    ctx.core.write_sessions()?.remove(&session.token_hash);
    tracing::info!(uid = %session.user.uid, session_id = %session.session_id, "User signed out");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: AuthUser,
    pub session_id: Uuid,
    pub signed_in_at: DateTime<Utc>,
    pub active_case_id: Option<String>,
}

/// `GET /api/auth/me`: the signed-in user and the active case, if any.
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<MeResponse>, ApiError> {
    let sessions = ctx.core.read_sessions()?;
    let current = sessions
        .get(&session.token_hash)
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(MeResponse {
        user: current.user.clone(),
        session_id: current.session_id,
        signed_in_at: current.created_at,
        active_case_id: current.workspace.report.as_ref().map(|r| r.case_id.clone()),
    }))
}
