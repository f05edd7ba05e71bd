//! Server-side user sessions.
//!
//! A successful sign-in yields a random bearer token. Only its SHA-256 hash
//! is kept. Each session owns a case workspace: the active case report, its
//! consent text and the latest clinical-history analysis. Sessions expire
//! after a period without requests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::firebase::AuthUser;
use crate::models::CaseReport;

pub type TokenHash = [u8; 32];

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> TokenHash {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Per-session case state.
#[derive(Debug, Clone, Default)]
pub struct CaseWorkspace {
    /// Latest AI clinical-history analysis; copied into the next submitted case.
    pub clinical_history_analysis: Option<String>,
    /// The active case report.
    pub report: Option<CaseReport>,
    /// Changes on every submission, even one reusing a case id.
    pub revision: Uuid,
    pub consent_text: Option<String>,
}

impl CaseWorkspace {
    /// Make `report` the active case. Returns its new revision.
    pub fn activate(&mut self, report: CaseReport, consent_text: Option<String>) -> Uuid {
        self.revision = Uuid::new_v4();
        self.report = Some(report);
        self.consent_text = consent_text;
        self.revision
    }
}

#[derive(Debug)]
pub struct UserSession {
    pub session_id: Uuid,
    pub user: AuthUser,
    pub created_at: DateTime<Utc>,
    last_activity: Instant,
    pub workspace: CaseWorkspace,
}

/// Identity of an authenticated request, injected by the auth middleware.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub token_hash: TokenHash,
    pub session_id: Uuid,
    pub user: AuthUser,
}

pub struct SessionRegistry {
    sessions: HashMap<TokenHash, UserSession>,
    inactivity_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(inactivity_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            inactivity_timeout,
        }
    }

    /// Open a session for a signed-in user. Returns the bearer token.
    pub fn create(&mut self, user: AuthUser) -> (String, Uuid) {
        self.purge_expired();
        let token = generate_token();
        let session_id = Uuid::new_v4();
        self.sessions.insert(
            hash_token(&token),
            UserSession {
                session_id,
                user,
                created_at: Utc::now(),
                last_activity: Instant::now(),
                workspace: CaseWorkspace::default(),
            },
        );
        (token, session_id)
    }

    /// Validate a token and record activity. Every expired session is dropped.
    pub fn touch(&mut self, token: &str) -> Option<SessionContext> {
        self.touch_at(hash_token(token), Instant::now())
    }

    fn touch_at(&mut self, token_hash: TokenHash, now: Instant) -> Option<SessionContext> {
        self.purge_expired_at(now);
        let session = self.sessions.get_mut(&token_hash)?;
        session.last_activity = now;
        Some(SessionContext {
            token_hash,
            session_id: session.session_id,
            user: session.user.clone(),
        })
    }

    /// End a session. Returns whether it existed.
    pub fn remove(&mut self, token_hash: &TokenHash) -> bool {
        self.sessions.remove(token_hash).is_some()
    }

    pub fn get(&self, token_hash: &TokenHash) -> Option<&UserSession> {
        self.sessions.get(token_hash)
    }

    pub fn workspace(&self, token_hash: &TokenHash) -> Option<&CaseWorkspace> {
        self.sessions.get(token_hash).map(|s| &s.workspace)
    }

    pub fn workspace_mut(&mut self, token_hash: &TokenHash) -> Option<&mut CaseWorkspace> {
        self.sessions.get_mut(token_hash).map(|s| &mut s.workspace)
    }

    /// Drop every session idle for the inactivity timeout, with its workspace.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&mut self, now: Instant) -> usize {
        let timeout = self.inactivity_timeout;
        let before = self.sessions.len();
        self.sessions.retain(|_, s| {
            let live = now.saturating_duration_since(s.last_activity) < timeout;
            if !live {
                tracing::info!(session_id = %s.session_id, "Session expired");
            }
            live
        });
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
