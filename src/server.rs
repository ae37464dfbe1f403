//! HTTP server.
//!
//! Serves document CRUD and the streaming edit endpoint over a JSON HTTP
//! API built on Axum.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | API information |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/documents` | List documents |
//! | `POST` | `/api/documents` | Create a document |
//! | `GET`  | `/api/documents/{id}` | Fetch a document |
//! | `PUT`  | `/api/documents/{id}` | Update title and/or content |
//! | `DELETE` | `/api/documents/{id}` | Delete a document |
//! | `POST` | `/api/chat/stream/{id}` | Run an edit, streamed as server-sent events |
//!
//! # Streaming
//!
//! `POST /api/chat/stream/{id}` with `{"prompt": "..."}` answers
//! `text/event-stream`, one `data: {json}` frame per [`StreamEvent`].
//! Failures inside the pipeline arrive as a final `error` frame on an
//! otherwise normal `200` stream; only a malformed request is rejected
//! up front.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: abc" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! Origins listed in `[server].allowed_origins` are permitted; an empty
//! list permits any origin.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use docedit_core::models::{Document, StreamEvent};
use docedit_core::store::memory::InMemoryStore;
use docedit_core::store::{DocumentStore, DocumentUpdate, NewDocument};

use crate::config::Config;
use crate::llm::create_model;
use crate::orchestrator::{EditOrchestrator, EditSettings};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    orchestrator: EditOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: EditOrchestrator) -> Self {
        Self { orchestrator }
    }

    fn store(&self) -> &Arc<dyn DocumentStore> {
        self.orchestrator.store()
    }
}

/// Starts the HTTP server with an in-memory store and the configured model.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = if config.editor.seed_sample {
        Arc::new(InMemoryStore::with_sample())
    } else {
        Arc::new(InMemoryStore::new())
    };
    let model = create_model(&config.llm)?;
    tracing::info!(
        provider = %config.llm.provider,
        model = model.model_name(),
        "language model ready"
    );

    let orchestrator = EditOrchestrator::new(store, model, EditSettings::from_config(config));
    let app = router(config, AppState::new(orchestrator))?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("docedit server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with CORS applied.
pub fn router(config: &Config, state: AppState) -> anyhow::Result<Router> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let cors = if config.server.allowed_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins = config
            .server
            .allowed_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|_| anyhow::anyhow!("invalid allowed origin: {}", o))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        cors.allow_origin(AllowOrigin::list(origins))
    };

    Ok(Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route(
            "/api/documents",
            get(handle_list_documents).post(handle_create_document),
        )
        .route(
            "/api/documents/{id}",
            get(handle_get_document)
                .put(handle_update_document)
                .delete(handle_delete_document),
        )
        .route("/api/chat/stream/{id}", post(handle_chat_stream))
        .layer(cors)
        .with_state(state))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(id: &str) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: format!("document not found: {}", id),
    }
}

// ============ GET / and /health ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "docedit",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "documents": "/api/documents",
            "chat": "/api/chat/stream/{document_id}",
            "health": "/health",
        }
    }))
}

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

// ============ /api/documents ============

async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(state.store().list().await?))
}

async fn handle_create_document(
    State(state): State<AppState>,
    Json(body): Json<NewDocument>,
) -> Result<Json<Document>, AppError> {
    if body.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }
    Ok(Json(state.store().create(body).await?))
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    state
        .store()
        .fetch(&id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn handle_update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DocumentUpdate>,
) -> Result<Json<Document>, AppError> {
    state
        .store()
        .update(&id, body)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.store().delete(&id).await? {
        Ok(Json(serde_json::json!({ "status": "deleted", "id": id })))
    } else {
        Err(not_found(&id))
    }
}

// ============ POST /api/chat/stream/{id} ============

#[derive(Deserialize)]
struct ChatRequest {
    prompt: String,
}

async fn handle_chat_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, AppError> {
    if body.prompt.trim().is_empty() {
        return Err(bad_request("prompt must not be empty"));
    }
    tracing::info!(document_id = %id, "edit requested");

    let events = state.orchestrator.spawn(id, body.prompt);
    let mut response = Sse::new(sse_frames(events))
        .keep_alive(KeepAlive::default())
        .into_response();
    response
        .headers_mut()
        .insert("X-Accel-Buffering", HeaderValue::from_static("no"));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

/// One `data:` frame per event.
fn sse_frames(
    events: impl Stream<Item = StreamEvent> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    events.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|e| {
            serde_json::json!({ "type": "error", "message": e.to_string() }).to_string()
        });
        Ok(Event::default().data(data))
    })
}
