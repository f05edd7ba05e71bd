//! Application state shared by every request handler.
//!
//! Holds the loaded configuration and dilemma catalog, the optional
//! external services (AI, identity provider, case store) and the session
//! registry. A service left unconfigured is `None` and the features that
//! need it report themselves unavailable.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::ai::{GeminiClient, LlmClient, ModelFallback};
use crate::config::{AppConfig, StorageBackend, DEFAULT_AUTH_BASE_URL, DEFAULT_FIRESTORE_BASE_URL};
use crate::firebase::token::StaticToken;
use crate::firebase::{
    AccessTokenSource, AuthProvider, FirebaseAuthClient, FirebaseError, FirestoreClient,
    ServiceAccountTokenProvider,
};
use crate::models::DilemmaCatalog;
use crate::session::{CaseWorkspace, SessionRegistry, TokenHash};
use crate::store::{CaseStore, FirestoreCaseStore, MemoryCaseStore};

/// Bearer token accepted by the Firestore emulator.
const EMULATOR_TOKEN: &str = "owner";

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Session not found or expired")]
    SessionNotFound,
    #[error("AI client error: {0}")]
    Ai(#[from] crate::ai::AiError),
    #[error("Firebase setup error: {0}")]
    Firebase(#[from] FirebaseError),
}

pub struct CoreState {
    pub config: AppConfig,
    pub catalog: DilemmaCatalog,
    ai: Option<ModelFallback>,
    auth: Option<Arc<dyn AuthProvider>>,
    store: Option<Arc<dyn CaseStore>>,
    sessions: RwLock<SessionRegistry>,
    started_at: Instant,
}

impl CoreState {
    /// State with no external services.
    pub fn new(config: AppConfig, catalog: DilemmaCatalog) -> Self {
        let timeout = Duration::from_secs(config.session.inactivity_timeout_secs);
        Self {
            config,
            catalog,
            ai: None,
            auth: None,
            store: None,
            sessions: RwLock::new(SessionRegistry::new(timeout)),
            started_at: Instant::now(),
        }
    }

    pub fn with_ai(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.ai = Some(ModelFallback::new(client, self.config.model_preference()));
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CaseStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the state and every service the configuration enables.
    ///
    /// Builds blocking HTTP clients, so call it outside the async runtime.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        let catalog = DilemmaCatalog::load_or_empty(config.dilemmas_path.as_deref());
        let mut state = Self::new(config, catalog);

        match state.config.gemini_key() {
            Some(key) => {
                let client = GeminiClient::new(
                    &state.config.ai.base_url,
                    key,
                    state.config.ai.timeout_secs,
                )?;
                state = state.with_ai(Arc::new(client));
                tracing::info!(models = ?state.config.model_preference(), "AI enabled");
            }
            None => tracing::warn!("No Gemini API key configured, AI features disabled"),
        }

        match &state.config.firebase_client_config {
            Some(web) => {
                let base = web.auth_base_url.as_deref().unwrap_or(DEFAULT_AUTH_BASE_URL);
                let client = FirebaseAuthClient::new(base, &web.api_key)?;
                state = state.with_auth(Arc::new(client));
                tracing::info!("Firebase authentication enabled");
            }
            None => tracing::warn!("No firebase_client_config, sign-in disabled"),
        }

        if let Some(store) = build_store(&state.config)? {
            state = state.with_store(store);
        }

        Ok(state)
    }

    pub fn ai(&self) -> Option<&ModelFallback> {
        self.ai.as_ref()
    }

    pub fn auth(&self) -> Option<Arc<dyn AuthProvider>> {
        self.auth.clone()
    }

    pub fn store(&self) -> Option<Arc<dyn CaseStore>> {
        self.store.clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    // ── Sessions ────────────────────────────────────────────

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionRegistry>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionRegistry>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }

    /// Copy of a session's workspace, taken under the read lock.
    pub fn workspace_snapshot(&self, token_hash: &TokenHash) -> Result<CaseWorkspace, CoreError> {
        self.read_sessions()?
            .workspace(token_hash)
            .cloned()
            .ok_or(CoreError::SessionNotFound)
    }

    /// Mutate a session's workspace under the write lock.
    pub fn update_workspace<T>(
        &self,
        token_hash: &TokenHash,
        f: impl FnOnce(&mut CaseWorkspace) -> T,
    ) -> Result<T, CoreError> {
        let mut sessions = self.write_sessions()?;
        let workspace = sessions
            .workspace_mut(token_hash)
            .ok_or(CoreError::SessionNotFound)?;
        Ok(f(workspace))
    }
}

fn build_store(config: &AppConfig) -> Result<Option<Arc<dyn CaseStore>>, CoreError> {
    match config.storage.backend {
        StorageBackend::Disabled => {
            tracing::warn!("Case storage disabled");
            Ok(None)
        }
        StorageBackend::Memory => {
            tracing::info!("Using in-memory case storage");
            Ok(Some(Arc::new(MemoryCaseStore::new())))
        }
        StorageBackend::Firestore => {
            let base_url = config.storage.firestore_base_url.as_deref();
            let (project_id, tokens): (String, Arc<dyn AccessTokenSource>) =
                match (&config.firebase_credentials, base_url) {
                    (Some(account), _) => (
                        account.project_id.clone(),
                        Arc::new(ServiceAccountTokenProvider::new(account)?),
                    ),
                    // Custom endpoint without credentials: the local emulator
                    (None, Some(_)) => {
                        let project_id = config
                            .firebase_client_config
                            .as_ref()
                            .and_then(|c| c.project_id.clone())
                            .unwrap_or_else(|| "demo-bioethicare".to_string());
                        (project_id, Arc::new(StaticToken(EMULATOR_TOKEN.to_string())))
                    }
                    (None, None) => {
                        tracing::warn!("No firebase_credentials, case storage disabled");
                        return Ok(None);
                    }
                };
            let client = FirestoreClient::new(
                base_url.unwrap_or(DEFAULT_FIRESTORE_BASE_URL),
                &project_id,
                tokens,
            )?;
            tracing::info!(project = %project_id, "Firestore case storage enabled");
            Ok(Some(Arc::new(FirestoreCaseStore::new(client))))
        }
    }
}
