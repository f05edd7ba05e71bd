//! Application configuration.
//!
//! The service reads a single TOML secrets file at startup: the Gemini
//! API key at the top level, the Firebase service account under
//! `[firebase_credentials]` and the Firebase web client config under
//! `[firebase_client_config]`. Every section is optional; a missing section
//! disables the feature it drives.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Application-level constants
pub const APP_NAME: &str = "BioEthiCare 360";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default config file name, looked up in the working directory first.
pub const CONFIG_FILE_NAME: &str = "bioethicare.toml";

/// Environment variable that overrides `gemini_api_key`.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Gemini models in order of preference.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.0-flash-exp",
    "gemini-1.5-pro-001",
    "gemini-1.5-flash-001",
    "gemini-1.5-flash",
];

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "bioethicare_lib=info,bioethicare=info,tower_http=info"
}

/// Candidate config locations, in lookup order.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("bioethicare").join(CONFIG_FILE_NAME));
    }
    paths
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default, alias = "GEMINI_API_KEY")]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub firebase_credentials: Option<ServiceAccountConfig>,
    #[serde(default)]
    pub firebase_client_config: Option<FirebaseClientConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Overrides the bundled dilemma catalog.
    #[serde(default)]
    pub dilemmas_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Browser origins allowed by CORS. Empty disables the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub models: Vec<String>,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

/// Firebase service account, as exported from the Firebase console.
/// Unknown keys (`auth_provider_x509_cert_url`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountConfig {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Firebase web client config (the `firebaseConfig` object).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseClientConfig {
    pub api_key: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub auth_domain: Option<String>,
    /// Points the auth client at the emulator, e.g.
    /// `http://localhost:9099/identitytoolkit.googleapis.com/v1`.
    #[serde(default)]
    pub auth_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Firestore,
    Memory,
    Disabled,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub firestore_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub inactivity_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl AppConfig {
    /// Parse and validate a TOML document. Does not consult the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config from an explicit path, or from the first default
    /// location that exists. An explicit path must exist; when no default
    /// file exists the defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_paths().into_iter().find(|p| p.is_file()),
        };

        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                tracing::info!(path = %path.display(), "Loaded configuration");
                Self::from_toml_str(&raw)?
            }
            None => {
                tracing::warn!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(GEMINI_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.gemini_api_key = Some(key);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.models.iter().all(|m| m.trim().is_empty()) {
            return Err(ConfigError::Invalid("[ai] models must name at least one model".into()));
        }
        if self.ai.timeout_secs == 0 {
            return Err(ConfigError::Invalid("[ai] timeout_secs must be positive".into()));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("[server] bind '{}': {e}", self.server.bind)))
    }

    /// The Gemini key, if set and non-blank.
    pub fn gemini_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Configured models with blanks dropped, order preserved.
    pub fn model_preference(&self) -> Vec<String> {
        self.ai
            .models
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect()
    }
}
