//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service banner |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/v1/analyze` | Analyze an uploaded PDF (multipart field `file`) |
//! | `POST` | `/api/v1/analyze-url` | Analyze a terms page, `{url}` |
//! | `POST` | `/api/v1/chat` | Ask about an analyzed document, `{filename, question, history}` |
//! | `POST` | `/api/v1/negotiate` | Negotiation email for one clause, `{clause, risk}` |
//! | `POST` | `/api/v1/negotiate-all` | One email for all red flags, `{red_flags}` |
//! | `POST` | `/api/v1/reset` | Drop every indexed document |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "store_unavailable", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `extraction_failed` (400),
//! `gateway_error` (502), `store_unavailable` (503), `internal` (500).

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use redline_core::{ChatTurn, RedFlag, RedlineConfig, RedlineError, Result, ServerConfig};

use crate::build_orchestrator;
use crate::orchestrator::{AnalysisResponse, Orchestrator};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

/// Build the router for an orchestrator.
pub fn router(orchestrator: Arc<Orchestrator>, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/analyze", post(handle_analyze))
        .route("/analyze-url", post(handle_analyze_url))
        .route("/chat", post(handle_chat))
        .route("/negotiate", post(handle_negotiate))
        .route("/negotiate-all", post(handle_negotiate_all))
        .route("/reset", post(handle_reset));

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .with_state(AppState { orchestrator })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Run the HTTP server until Ctrl-C.
pub async fn serve(config: &RedlineConfig) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(config)?);

    if config.server.reset_on_start {
        info!("Resetting document store on startup");
        orchestrator.reset().await?;
    }

    let app = router(orchestrator.clone(), &config.server);

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str()).await?;
    info!("Listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down");
    orchestrator.close().await
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

/// Error type that converts into an HTTP response.
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

impl From<RedlineError> for AppError {
    fn from(err: RedlineError) -> Self {
        let (status, code) = match err.error_code() {
            "bad_request" => (StatusCode::BAD_REQUEST, "bad_request"),
            "extraction_failed" => (StatusCode::BAD_REQUEST, "extraction_failed"),
            "store_unavailable" => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            "gateway_error" => (StatusCode::BAD_GATEWAY, "gateway_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            warn!("Request failed: {}", err);
        }
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        bad_request(format!("Invalid multipart body: {}", err))
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
    status: String,
    version: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to the Redline contract review API".to_string(),
        status: "active".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
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

// ============ POST /api/v1/analyze ============

/// Handler for `POST /api/v1/analyze`.
///
/// Reads the multipart field `file`; its file name becomes the document key.
async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<Json<AnalysisResponse>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| bad_request("file field has no file name"))?;
        let bytes = field.bytes().await?;

        let response = state.orchestrator.analyze_pdf(&filename, &bytes).await?;
        return Ok(Json(response));
    }

    Err(bad_request("missing multipart field 'file'"))
}

// ============ POST /api/v1/analyze-url ============

#[derive(Deserialize)]
struct AnalyzeUrlRequest {
    url: String,
}

async fn handle_analyze_url(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnalyzeUrlRequest>, JsonRejection>,
) -> std::result::Result<Json<AnalysisResponse>, AppError> {
    let Json(request) = payload?;
    let response = state.orchestrator.analyze_url(&request.url).await?;
    Ok(Json(response))
}

// ============ POST /api/v1/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    filename: String,
    question: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload?;
    let answer = state
        .orchestrator
        .chat(&request.filename, &request.question, &request.history)
        .await?;
    Ok(Json(ChatResponse { answer }))
}

// ============ POST /api/v1/negotiate and /negotiate-all ============

#[derive(Deserialize)]
struct NegotiateRequest {
    clause: String,
    risk: String,
}

#[derive(Deserialize)]
struct NegotiateAllRequest {
    red_flags: Vec<RedFlag>,
}

#[derive(Serialize)]
struct EmailResponse {
    email: String,
}

async fn handle_negotiate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NegotiateRequest>, JsonRejection>,
) -> std::result::Result<Json<EmailResponse>, AppError> {
    let Json(request) = payload?;
    let email = state
        .orchestrator
        .negotiate(&request.clause, &request.risk)
        .await?;
    Ok(Json(EmailResponse { email }))
}

async fn handle_negotiate_all(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NegotiateAllRequest>, JsonRejection>,
) -> std::result::Result<Json<EmailResponse>, AppError> {
    let Json(request) = payload?;
    let email = state.orchestrator.negotiate_all(&request.red_flags).await?;
    Ok(Json(EmailResponse { email }))
}

// ============ POST /api/v1/reset ============

#[derive(Serialize)]
struct ResetResponse {
    status: String,
}

async fn handle_reset(
    State(state): State<AppState>,
) -> std::result::Result<Json<ResetResponse>, AppError> {
    state.orchestrator.reset().await?;
    Ok(Json(ResetResponse {
        status: "reset".to_string(),
    }))
}
