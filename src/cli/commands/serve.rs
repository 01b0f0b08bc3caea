//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for processing videos and asking questions.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::VidragError;
use crate::pipeline::Pipeline;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let pipeline = Arc::new(Pipeline::new(&settings).await?);
    let app = router(pipeline);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("vidrag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Process", "POST /process");
    Output::kv("Chat", "POST /chat");
    Output::kv("Videos", "GET  /videos");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// API routes over a shared pipeline, with permissive CORS.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/process", post(process))
        .route("/chat", post(chat))
        .route("/videos", get(list_videos))
        .layer(cors)
        .with_state(pipeline)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ProcessRequest {
    /// YouTube URL/ID or local file path
    url: String,
    /// Label to index the video under
    name: String,
}

#[derive(Serialize)]
struct ProcessResponse {
    status: &'static str,
    chunks: usize,
}

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<String>,
}

#[derive(Serialize)]
struct VideoListResponse {
    videos: Vec<VideoInfo>,
    total: usize,
}

#[derive(Serialize)]
struct VideoInfo {
    name: String,
    chunks: usize,
    duration_seconds: f64,
    indexed_at: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: &VidragError) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn process(
    State(pipeline): State<Arc<Pipeline>>,
    Json(req): Json<ProcessRequest>,
) -> Response {
    info!("Processing video {} as '{}'", req.url, req.name);

    match pipeline.process(&req.url, &req.name).await {
        Ok(result) if result.chunk_count == 0 => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Processing returned no segments.".to_string(),
            }),
        )
            .into_response(),
        Ok(result) => Json(ProcessResponse {
            status: "success",
            chunks: result.chunk_count,
        })
        .into_response(),
        Err(e) => {
            error!("Process failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

async fn chat(State(pipeline): State<Arc<Pipeline>>, Json(req): Json<ChatRequest>) -> Response {
    match pipeline.ask(&req.question).await {
        Ok(answer) => Json(ChatResponse {
            answer: answer.text,
            sources: answer.citations,
        })
        .into_response(),
        Err(e) => {
            error!("Chat failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

async fn list_videos(State(pipeline): State<Arc<Pipeline>>) -> Response {
    match pipeline.list_videos().await {
        Ok(videos) => Json(VideoListResponse {
            total: videos.len(),
            videos: videos
                .into_iter()
                .map(|v| VideoInfo {
                    name: v.video_label,
                    chunks: v.chunk_count,
                    duration_seconds: v.duration_seconds,
                    indexed_at: v.indexed_at.to_rfc3339(),
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    }
}
