//! REST API server for phonescreen.
//!
//! Provides HTTP endpoints for:
//! - Call initiation (batch outbound interview calls)
//! - Telephony callbacks (one per interview phase)
//! - Service status and version

pub mod error;
pub mod routes;

use crate::config::ServerConfig;
use crate::interview::InterviewMachine;
use crate::telephony::CallPlacer;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use routes::callbacks::CallbacksState;
use routes::calls::CallsState;

pub struct ApiServer {
    bind: String,
    port: u16,
    allowed_origins: Vec<String>,
    machine: Arc<InterviewMachine>,
    placer: Arc<dyn CallPlacer>,
}

impl ApiServer {
    pub fn new(
        machine: Arc<InterviewMachine>,
        placer: Arc<dyn CallPlacer>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            bind: config.bind.clone(),
            port: config.port,
            allowed_origins: config.allowed_origins.clone(),
            machine,
            placer,
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::calls::router(CallsState {
                machine: Arc::clone(&self.machine),
                placer: Arc::clone(&self.placer),
            }))
            .merge(routes::callbacks::router(CallbacksState {
                machine: Arc::clone(&self.machine),
            }))
            .layer(ServiceBuilder::new());

        let listener =
            tokio::net::TcpListener::bind(&format!("{}:{}", self.bind, self.port)).await?;

        info!("API server listening on http://{}:{}", self.bind, self.port);
        if !self.allowed_origins.is_empty() {
            info!(
                "Allowed web origins (enforced by the deployment proxy): {}",
                self.allowed_origins.join(", ")
            );
        }
        info!("Endpoints:");
        info!("  GET  /                                    - Service info");
        info!("  GET  /version                             - Version info");
        info!("  POST /calls                               - Initiate interview calls");
        info!("  POST /callbacks/answered                  - Call answered");
        info!("  POST /callbacks/:call_id/introduction     - Introduction recording");
        info!("  POST /callbacks/:call_id/question1        - First answer recording");
        info!("  POST /callbacks/:call_id/question2        - Second answer recording");
        info!("  POST /callbacks/:call_id/qna              - Q&A recording or end signal");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "phonescreen",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "phonescreen"
    }))
}
