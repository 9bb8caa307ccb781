//! JSON HTTP server (Axum) over the notebook service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check with version |
//! | `GET` | `/documents` | List document summaries |
//! | `POST` | `/documents?name=` | Upload raw bytes; `Content-Type` picks the extractor |
//! | `GET` | `/documents/{id}/passages` | Passages in index order |
//! | `POST` | `/documents/{id}/ask` | Answer `{ "question" }` from that document |
//! | `DELETE` | `/documents/{id}` | Delete one document and its passages |
//! | `DELETE` | `/documents` | Delete everything |
//!
//! # Error Responses
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: ..." } }
//! ```
//!
//! | Code | Status | When |
//! |------|--------|------|
//! | `bad_request` | 400 | missing name, empty question, malformed JSON |
//! | `not_found` | 404 | unknown document id |
//! | `ingestion_failed` | 422 | extraction failed or produced no text |
//! | `internal` | 500 | storage or provider failure |
//!
//! CORS is fully permissive so browser front ends can call the API.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use docqa_core::models::DocumentSummary;
use docqa_core::Error;

use crate::config::Config;
use crate::upload::{open_notebook, upload_bytes, AppNotebook};

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    notebook: Arc<AppNotebook>,
}

/// Open the notebook from `config` and serve until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let notebook = Arc::new(open_notebook(config).await?);
    let app = router(notebook);

    let bind_addr = &config.server.bind;
    println!("docqa server listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router over an already opened notebook.
pub fn router(notebook: Arc<AppNotebook>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/documents",
            get(handle_list).post(handle_upload).delete(handle_reset),
        )
        .route("/documents/{id}", axum::routing::delete(handle_delete))
        .route("/documents/{id}/passages", get(handle_passages))
        .route("/documents/{id}/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(AppState { notebook })
}

// ============ Errors ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Validation(_) => bad_request(message),
            Error::NotFound(_) => AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message,
            },
            Error::Ingestion(_) => AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "ingestion_failed",
                message,
            },
            Error::Embedding(_) | Error::Store(_) => {
                tracing::error!(error = %message, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message,
                }
            }
        }
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<DocumentSummary>,
}

async fn handle_list(State(state): State<AppState>) -> Result<Json<ListResponse>, AppError> {
    let documents = state.notebook.list_documents().await?;
    Ok(Json(ListResponse { documents }))
}

#[derive(Deserialize)]
struct UploadParams {
    name: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    id: String,
    name: String,
    passages: usize,
    embedded: usize,
    failed: usize,
}

async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let name = params
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| bad_request("query parameter 'name' is required"))?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| bad_request("Content-Type header is required"))?;

    let (doc, report) = upload_bytes(&state.notebook, &name, &body, content_type).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            id: doc.id,
            name: doc.name,
            passages: report.passages,
            embedded: report.embedded,
            failed: report.failed,
        }),
    ))
}

#[derive(Serialize)]
struct PassageView {
    index: usize,
    text: String,
}

#[derive(Serialize)]
struct PassagesResponse {
    document_id: String,
    passages: Vec<PassageView>,
}

async fn handle_passages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PassagesResponse>, AppError> {
    let passages = state
        .notebook
        .passages(&id)
        .await?
        .into_iter()
        .map(|p| PassageView {
            index: p.index,
            text: p.text,
        })
        .collect();
    Ok(Json(PassagesResponse {
        document_id: id,
        passages,
    }))
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    let answer = state.notebook.ask(&id, &req.question).await?;
    Ok(Json(AskResponse { answer }))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if state.notebook.delete_document(&id).await? {
        Ok(Json(DeleteResponse { deleted: true }))
    } else {
        Err(Error::NotFound(id).into())
    }
}

async fn handle_reset(State(state): State<AppState>) -> Result<Json<DeleteResponse>, AppError> {
    state.notebook.reset_all().await?;
    Ok(Json(DeleteResponse { deleted: true }))
}
