//! HTTP server for the validation pipeline.
//!
//! Exposes parsing, validation, format checking, and reports as a small JSON
//! API. Every response, including errors, carries the CORS headers so the
//! browser front-end can call it cross-origin.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/parse` | Split bibliography text into sources and store them |
//! | `POST` | `/validate` | Score a batch of sources and persist the results |
//! | `POST` | `/check-citation` | Check one citation string against APA or MLA |
//! | `GET`  | `/report/{sessionId}` | Session report as JSON or CSV |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "sessionId is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use citecheck_core::citation::parse_citations;
use citecheck_core::format::{check_format, FormatCheck};
use citecheck_core::models::{Source, ValidationResult};
use citecheck_core::report::{render_csv, Report};

use crate::config::Config;
use crate::db;
use crate::error::ValidateError;
use crate::probe::HttpProber;
use crate::session::{load_report, resolve_session_id, save_parsed};
use crate::sqlite_store::SqliteStore;
use crate::validate::Validator;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    validator: Validator,
}

impl AppState {
    pub fn new(config: &Config, validator: Validator) -> Self {
        Self {
            config: Arc::new(config.clone()),
            validator,
        }
    }
}

/// Starts the HTTP server on `[server].bind`.
///
/// Opens the configured SQLite database and a pooled HTTP prober, then
/// serves until the process is terminated. Run `init` first so the schema
/// exists.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool));
    let prober = Arc::new(HttpProber::new(&config.probe)?);
    let validator = Validator::new(prober, store, config);
    run_server_with(config, validator).await
}

/// Starts the server with a caller-supplied [`Validator`].
pub async fn run_server_with(config: &Config, validator: Validator) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(AppState::new(config, validator))?;

    tracing::info!(bind = %bind_addr, "citecheck server listening");
    println!("citecheck server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with CORS and request tracing applied.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.server.cors_origins)?;

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/parse", post(handle_parse))
        .route("/validate", post(handle_validate))
        .route("/check-citation", post(handle_check_citation))
        .route("/report/{session_id}", get(handle_report))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// `"*"` (or an empty list) allows any origin; otherwise only the listed ones.
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }
    let values = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| anyhow::anyhow!("invalid CORS origin in config: {}", o))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(values)))
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

/// Error type that converts into a JSON HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Logs the cause and answers with a generic 500.
fn internal(err: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: "internal server error".to_string(),
    }
}

impl From<ValidateError> for AppError {
    fn from(err: ValidateError) -> Self {
        match err {
            ValidateError::InvalidArgument(msg) => bad_request(msg),
            ValidateError::Internal(e) => internal(format!("{:#}", e)),
        }
    }
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v)
        .map_err(|e| bad_request(format!("invalid JSON body: {}", e.body_text())))
}

// ============ GET /health ============

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

// ============ POST /parse ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParseResponse {
    session_id: String,
    sources: Vec<Source>,
}

/// Handler for `POST /parse`.
///
/// Body: `{ "text": "...", "sessionId": "optional" }`. A missing or blank
/// session id starts a new session.
async fn handle_parse(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ParseResponse>, AppError> {
    let body = json_body(body)?;
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| bad_request("text must not be empty"))?;
    let session_id = resolve_session_id(body.get("sessionId").and_then(Value::as_str));

    let sources = parse_citations(text);
    if sources.len() > state.validator.max_batch_size() {
        return Err(bad_request(format!(
            "too many citations: {} (max {})",
            sources.len(),
            state.validator.max_batch_size()
        )));
    }

    let expires_at = state.validator.expires_at(chrono::Utc::now().timestamp());
    save_parsed(state.validator.store().as_ref(), &session_id, &sources, expires_at)
        .await
        .map_err(|e| internal(format!("{:#}", e)))?;

    Ok(Json(ParseResponse {
        session_id,
        sources,
    }))
}

// ============ POST /validate ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    session_id: String,
    results: Vec<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failures: Option<Vec<FailureEntry>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureEntry {
    source_id: String,
    error: String,
}

/// Handler for `POST /validate`.
///
/// Body: `{ "sessionId": "...", "sources": [...], "allowPartial": false }`.
/// By default the batch is all-or-nothing. With `allowPartial`, each source
/// is persisted on its own and per-source failures are listed under
/// `failures`.
async fn handle_validate(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ValidateResponse>, AppError> {
    let mut body = json_body(body)?;

    let session_id = match body.get("sessionId") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => return Err(bad_request("sessionId is required")),
    };
    let allow_partial = match body.get("allowPartial") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(bad_request("allowPartial must be a boolean")),
    };
    let raw_sources = match body.get_mut("sources").map(Value::take) {
        Some(v @ Value::Array(_)) => v,
        Some(_) => return Err(bad_request("sources must be an array")),
        None => return Err(bad_request("sources is required")),
    };
    let sources: Vec<Source> = serde_json::from_value(raw_sources)
        .map_err(|e| bad_request(format!("invalid source: {}", e)))?;

    if !allow_partial {
        let results = state.validator.validate_batch(&session_id, &sources).await?;
        return Ok(Json(ValidateResponse {
            session_id,
            results,
            failures: None,
        }));
    }

    let outcomes = state.validator.validate_each(&session_id, &sources).await?;
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(r) => results.push(r),
            Err(error) => failures.push(FailureEntry {
                source_id: outcome.source_id,
                error,
            }),
        }
    }
    Ok(Json(ValidateResponse {
        session_id,
        results,
        failures: Some(failures),
    }))
}

// ============ POST /check-citation ============

/// Handler for `POST /check-citation`.
///
/// Body: `{ "citation": "...", "format": "apa" | "mla" }`; format defaults
/// to APA. Unknown formats come back as a failed check, not an error.
async fn handle_check_citation(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FormatCheck>, AppError> {
    let body = json_body(body)?;
    let citation = body
        .get("citation")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_request("citation is required"))?;
    let format = body.get("format").and_then(Value::as_str);
    Ok(Json(check_format(citation, format)))
}

// ============ GET /report/{sessionId} ============

#[derive(Deserialize)]
struct ReportQuery {
    format: Option<String>,
}

async fn handle_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let format = query.format.as_deref().unwrap_or("json");
    if format != "json" && format != "csv" {
        return Err(bad_request(format!("unsupported report format: {}", format)));
    }

    let report: Report = load_report(state.validator.store().as_ref(), &session_id)
        .await
        .map_err(|e| internal(format!("{:#}", e)))?
        .ok_or_else(|| not_found(format!("no sources for session: {}", session_id)))?;

    if format == "csv" {
        let disposition = format!(
            "attachment; filename=\"report-{}.csv\"",
            filename_safe(&session_id)
        );
        let headers = [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ];
        return Ok((headers, render_csv(&report)).into_response());
    }
    Ok(Json(report).into_response())
}

/// Replaces anything outside `[A-Za-z0-9._-]` with `_`.
fn filename_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
