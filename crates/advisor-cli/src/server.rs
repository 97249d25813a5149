//! HTTP surface: `POST /diagnose`, `GET /health`, `GET /`.
//!
//! Malformed request bodies are rejected by axum's `Json` extractor; every
//! well-formed request gets a diagnosis.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use advisor_core::{DiagnosisResult, SymptomRequest};
use advisor_runtime::DiagnosisOrchestrator;

use crate::config::ServerConfig;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    provider: Option<String>,
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
}

/// Build the router around a shared orchestrator.
pub fn router(orchestrator: Arc<DiagnosisOrchestrator>, allowed_origins: &[String]) -> Result<Router> {
    Ok(Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/diagnose", post(diagnose))
        .layer(cors_layer(allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator))
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Medical Diagnosis API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health(State(orchestrator): State<Arc<DiagnosisOrchestrator>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: orchestrator.model_loaded(),
        provider: orchestrator.provider_name().map(str::to_string),
    })
}

async fn diagnose(
    State(orchestrator): State<Arc<DiagnosisOrchestrator>>,
    Json(request): Json<SymptomRequest>,
) -> Json<DiagnosisResult> {
    tracing::debug!(symptoms = request.symptoms.len(), age = request.age, "Diagnosis requested");
    Json(orchestrator.diagnose(&request).await)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(orchestrator: Arc<DiagnosisOrchestrator>, config: &ServerConfig) -> Result<()> {
    let app = router(orchestrator, &config.allowed_origins)?;

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr().context("Failed to get server address")?;

    tracing::info!(%addr, "Diagnosis API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Diagnosis API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
