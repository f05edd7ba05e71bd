//! OAuth2 access tokens for the Firestore REST API, minted from a service
//! account with the JWT bearer grant.

use std::sync::RwLock;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::{google_error_message, http_client, transport_error, FirebaseError};
use crate::config::ServiceAccountConfig;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the provider-reported expiry.
const REFRESH_MARGIN_SECS: i64 = 60;
const TOKEN_TIMEOUT_SECS: u64 = 30;

/// Supplies bearer tokens for outbound Google API calls. Implementations block.
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self) -> Result<String, FirebaseError>;
}

/// Fixed token, e.g. `owner` against the Firestore emulator.
pub struct StaticToken(pub String);

impl AccessTokenSource for StaticToken {
    fn access_token(&self) -> Result<String, FirebaseError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: String,
    /// Unix seconds after which the token must be refreshed.
    refresh_at: i64,
}

pub struct ServiceAccountTokenProvider {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    key: EncodingKey,
    client: reqwest::blocking::Client,
    cache: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(account: &ServiceAccountConfig) -> Result<Self, FirebaseError> {
        // Secrets files often carry the PEM with literal `\n` escapes
        let pem = account.private_key.replace("\\n", "\n");
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| FirebaseError::Config(format!("invalid service account key: {e}")))?;

        Ok(Self {
            client_email: account.client_email.clone(),
            key_id: account.private_key_id.clone(),
            token_uri: account.token_uri.clone(),
            key,
            client: http_client(TOKEN_TIMEOUT_SECS)?,
            cache: RwLock::new(None),
        })
    }

    /// Signed RS256 assertion for the token endpoint.
    fn assertion(&self, now: i64) -> Result<String, FirebaseError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        encode(&header, &claims, &self.key).map_err(|e| FirebaseError::Token(e.to_string()))
    }

    fn cached(&self, now: i64) -> Option<String> {
        let cache = self.cache.read().ok()?;
        cache
            .as_ref()
            .filter(|c| now < c.refresh_at)
            .map(|c| c.token.clone())
    }

    fn fetch(&self, now: i64) -> Result<CachedToken, FirebaseError> {
        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            return Err(FirebaseError::Token(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                google_error_message(&body)
            )));
        }
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| FirebaseError::Token(format!("unexpected token response: {e}")))?;

        tracing::debug!(expires_in = parsed.expires_in, "Service account token refreshed");
        Ok(CachedToken {
            token: parsed.access_token,
            refresh_at: now + parsed.expires_in - REFRESH_MARGIN_SECS,
        })
    }
}

impl AccessTokenSource for ServiceAccountTokenProvider {
    fn access_token(&self) -> Result<String, FirebaseError> {
        let now = chrono::Utc::now().timestamp();
        if let Some(token) = self.cached(now) {
            return Ok(token);
        }

        let fresh = self.fetch(now)?;
        let token = fresh.token.clone();
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(fresh);
        }
        Ok(token)
    }
}
