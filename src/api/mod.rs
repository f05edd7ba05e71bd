//! HTTP API.
//!
//! Exposes case analysis, AI deliberation, reports and saved cases as JSON
//! endpoints under `/api/`, protected by a middleware stack:
//! Rate Limit → Auth → Audit → Handler.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ServerError, ServerInfo};
pub use types::ApiContext;
