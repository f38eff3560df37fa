//! HTTP server for label extraction.

use crate::config::ServerConfig;
use crate::fetch::download_bytes;
use crate::store::{MemoryRecordStore, RecordStore};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use medbox_ocr::medbox::{MedBoxOcrBuilder, Orchestrator, Submission};
use medbox_ocr::{PipelineError, StageFailure};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
struct AppState {
    orchestrator: Orchestrator,
    store: Arc<dyn RecordStore>,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// One submission: front image URL plus an optional back image URL.
#[derive(Debug, Deserialize)]
struct SubmissionRequest {
    front_url: String,
    back_url: Option<String>,
}

/// Failure body naming the failing stage.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
}

impl ErrorResponse {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            stage: None,
        }
    }

    fn from_failure(failure: &StageFailure) -> Self {
        Self {
            error: failure.error.to_string(),
            stage: Some(failure.stage.to_string()),
        }
    }
}

/// Runs the HTTP server.
pub async fn run_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Initializing extraction pipeline...");
    let mut builder = MedBoxOcrBuilder::new().strict_languages(config.engines.strict_languages);
    if let Some(ref dir) = config.engines.tessdata_dir {
        builder = builder.tessdata_dir(dir);
    }
    let orchestrator = builder.build()?;
    info!("Extraction pipeline initialized");

    let state = Arc::new(AppState {
        orchestrator,
        store: Arc::new(MemoryRecordStore::new()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/submissions", post(submission_handler))
        .route("/api/v1/records/:image_id", get(record_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {e}"))?;

    info!("Server listening on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /health                     - Health check");
    info!("  POST /api/v1/submissions         - Process a front/back submission");
    info!("  GET  /api/v1/records/:image_id   - Fetch a stored record");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Submission processing endpoint.
async fn submission_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmissionRequest>,
) -> Response {
    let start = Instant::now();

    let front = match download_bytes(&request.front_url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, url = %request.front_url, "Failed to download front image");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::message(format!(
                    "failed to download front image: {e}"
                ))),
            )
                .into_response();
        }
    };

    let mut submission = Submission::new(front);
    if let Some(ref back_url) = request.back_url {
        match download_bytes(back_url).await {
            Ok(bytes) => submission = submission.with_back(bytes),
            Err(e) => {
                error!(error = %e, url = %back_url, "Failed to download back image");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::message(format!(
                        "failed to download back image: {e}"
                    ))),
                )
                    .into_response();
            }
        }
    }

    let image_id = submission.id.to_string();
    info!(%image_id, "Processing submission");

    match state.orchestrator.process(submission).await {
        Ok(outcome) => {
            let response = state.orchestrator.response(&outcome.record);
            state.store.save(response.clone());
            info!(
                %image_id,
                confidence = response.confidence,
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Submission complete"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(failure) => {
            error!(%image_id, error = %failure, "Submission failed");
            let status = match failure.error {
                PipelineError::InvalidImage { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(ErrorResponse::from_failure(&failure))).into_response()
        }
    }
}

/// Stored record lookup endpoint.
async fn record_handler(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Response {
    match state.store.get(&image_id) {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::message(format!(
                "no record for image id '{image_id}'"
            ))),
        )
            .into_response(),
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
