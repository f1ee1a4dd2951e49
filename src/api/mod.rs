//! HTTP API for the video summarizer
//!
//! Upload, job status, PDF export and health endpoints.

use anyhow::Result;
use tracing::info;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{build_router, AppState};

/// API server running on the shared application state
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!(
            "🚀 Starting API server on {}:{}",
            self.state.config.server.host, self.state.config.server.port
        );
        server::start_http_server(self.state).await
    }
}
