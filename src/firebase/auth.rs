use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{google_error_message, http_client, transport_error, FirebaseError};

const AUTH_TIMEOUT_SECS: u64 = 30;

/// Signed-in account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// E-mail/password identity provider. Implementations block.
pub trait AuthProvider: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, FirebaseError>;
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, FirebaseError>;
}

/// Firebase Identity Toolkit REST client (web API key).
pub struct FirebaseAuthClient {
    base_url: String,
    api_key: Zeroizing<String>,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: String,
}

impl FirebaseAuthClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, FirebaseError> {
        if api_key.trim().is_empty() {
            return Err(FirebaseError::Config("Firebase web apiKey is empty".into()));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: Zeroizing::new(api_key.to_string()),
            client: http_client(AUTH_TIMEOUT_SECS)?,
        })
    }

    fn call(&self, method: &str, email: &str, password: &str) -> Result<AuthUser, FirebaseError> {
        let url = format!("{}/accounts:{method}", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            return Err(map_provider_error(status.as_u16(), &google_error_message(&body)));
        }

        let parsed: PasswordResponse = serde_json::from_str(&body)
            .map_err(|e| FirebaseError::Api {
                status: status.as_u16(),
                message: format!("unexpected response: {e}"),
            })?;
        Ok(AuthUser {
            uid: parsed.local_id,
            email: if parsed.email.is_empty() {
                email.to_string()
            } else {
                parsed.email
            },
        })
    }
}

impl AuthProvider for FirebaseAuthClient {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, FirebaseError> {
        self.call("signInWithPassword", email, password)
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, FirebaseError> {
        self.call("signUp", email, password)
    }
}

/// Identity Toolkit messages look like `CODE` or `CODE : detail`.
fn map_provider_error(status: u16, message: &str) -> FirebaseError {
    let (code, detail) = match message.split_once(" : ") {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            FirebaseError::InvalidCredentials
        }
        "EMAIL_EXISTS" => FirebaseError::EmailExists,
        "WEAK_PASSWORD" => FirebaseError::WeakPassword(if detail.is_empty() {
            "Password should be at least 6 characters".into()
        } else {
            detail.to_string()
        }),
        "INVALID_EMAIL" | "MISSING_EMAIL" => FirebaseError::InvalidEmail,
        _ => FirebaseError::Api {
            status,
            message: message.to_string(),
        },
    }
}

/// In-memory identity provider for tests.
#[cfg(test)]
pub struct MockAuthProvider {
    accounts: std::sync::Mutex<std::collections::HashMap<String, (String, String)>>,
}

#[cfg(test)]
impl MockAuthProvider {
    pub fn new() -> Self {
        Self {
            accounts: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn with_account(self, email: &str, password: &str, uid: &str) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), uid.to_string()));
        self
    }
}

#[cfg(test)]
impl AuthProvider for MockAuthProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, FirebaseError> {
        match self.accounts.lock().unwrap().get(email) {
            Some((stored, uid)) if stored == password => Ok(AuthUser {
                uid: uid.clone(),
                email: email.to_string(),
            }),
            _ => Err(FirebaseError::InvalidCredentials),
        }
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, FirebaseError> {
        if !email.contains('@') {
            return Err(FirebaseError::InvalidEmail);
        }
        if password.len() < 6 {
            return Err(FirebaseError::WeakPassword("too short".into()));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(FirebaseError::EmailExists);
        }
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (password.to_string(), uid.clone()));
        Ok(AuthUser {
            uid,
            email: email.to_string(),
        })
    }
}
