pub mod ai; // Gemini client + ordered model fallback
pub mod api; // HTTP API router
pub mod charts;
pub mod config;
pub mod consent;
pub mod core_state; // Shared state: config, catalog, providers, sessions
pub mod deliberation; // Use cases: analysis, submission, deliberation, chat
pub mod ethics; // Ethical coherence check
pub mod firebase; // Identity Toolkit + Firestore REST
pub mod models;
pub mod pdf;
pub mod report;
pub mod session;
pub mod store; // Case persistence

#[cfg(test)]
mod test_http;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Startup options from the command line.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub bind: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] core_state::CoreError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
    #[error("Failed to start the async runtime: {0}")]
    Runtime(std::io::Error),
}

/// Load configuration, build the providers and serve the API until Ctrl-C.
pub fn run(options: RunOptions) -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let mut config = config::AppConfig::load(options.config_path.as_deref())?;
    if let Some(bind) = options.bind {
        config.server.bind = bind;
    }
    let addr = config.bind_addr()?;

    // Blocking HTTP clients must be built outside the runtime
    let core = Arc::new(core_state::CoreState::from_config(config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;

    runtime.block_on(serve(core.clone(), addr))
}

async fn serve(core: Arc<core_state::CoreState>, addr: std::net::SocketAddr) -> Result<(), StartupError> {
    let mut server = api::start_api_server(core, addr).await?;
    tracing::info!(addr = %server.info.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
