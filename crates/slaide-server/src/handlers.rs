//! Request handlers for the HTTP API.

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slaide_core::{open_artifact, sanitize, Artifact, ArtifactBody, ArtifactDescriptor, HTML_CONTENT_TYPE};
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, ErrorResponse};
use crate::state::AppState;

/// How long the readiness check waits for the Host.
const READY_TIMEOUT: Duration = Duration::from_secs(5);

// --- Request / response types ---

#[derive(Debug, Deserialize)]
pub struct ArtifactQuery {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Parse a request body as JSON, reporting failures as `BadRequest`.
fn parse_json(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Pull a non-empty string field out of a JSON object.
fn string_field<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, ApiError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingParameter(field))
}

/// `filename="..."` must stay a valid header value; replace anything that is
/// not printable ASCII or would end the quoted string.
fn disposition_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

fn no_store(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
}

fn html_response(html: String) -> Response {
    let mut response = Response::new(Body::from(html));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    no_store(headers);
    response
}

fn artifact_response(artifact: Artifact) -> Response {
    let content_length = artifact.content_length();
    let body = match artifact.body {
        ArtifactBody::Stream { file, .. } => Body::from_stream(ReaderStream::new(file)),
        ArtifactBody::Html(html) => Body::from(html),
    };

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.kind.content_type()),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    let disposition = format!(
        "inline; filename=\"{}\"",
        disposition_file_name(&artifact.file_name)
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    no_store(headers);
    response
}

// --- Health ---

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Liveness check; the process is up.
pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

/// Readiness check; the Host answers HTTP at its base URL.
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let host = state.generator().host();
    if host.is_reachable(READY_TIMEOUT).await {
        Json(serde_json::json!({
            "status": "ready",
            "host": host.base_url(),
        }))
        .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Not ready".to_string(),
                details: Some(Value::String(format!(
                    "Host at {} did not answer within {}s",
                    host.base_url(),
                    READY_TIMEOUT.as_secs()
                ))),
            }),
        )
            .into_response()
    }
}

// --- Artifacts ---

/// `GET /api/artifact?path=...`: stream a generated file.
pub async fn get_artifact(query: Option<Query<ArtifactQuery>>) -> Result<Response, ApiError> {
    let path = query
        .and_then(|Query(q)| q.path)
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::MissingParameter("path"))?;

    let artifact = open_artifact(&path).await?;
    tracing::debug!(
        path = %path,
        content_type = artifact.kind.content_type(),
        bytes = artifact.content_length(),
        "serving artifact"
    );
    Ok(artifact_response(artifact))
}

/// `POST /api/artifact` with `{ "html": "..." }`: sanitize posted HTML.
pub async fn post_artifact(body: Bytes) -> Result<Response, ApiError> {
    let value = parse_json(&body)?;
    let html = value
        .get("html")
        .and_then(Value::as_str)
        .ok_or(ApiError::MissingParameter("html"))?
        .to_string();
    // Large bodies take a while; keep them off the async workers.
    let clean = tokio::task::spawn_blocking(move || sanitize(&html))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(html_response(clean))
}

// --- Generation ---

/// `POST /api/generate` with `{ "prompt": "..." }`.
pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ArtifactDescriptor>, ApiError> {
    let value = parse_json(&body)?;
    let prompt = string_field(&value, "prompt")?;
    let descriptor = state.generator().generate(prompt).await?;
    Ok(Json(descriptor))
}

// --- Discord login ---

/// `GET /api/auth/discord/callback?code=...`.
pub async fn discord_callback(
    State(state): State<AppState>,
    query: Option<Query<CallbackQuery>>,
) -> Result<Json<Value>, ApiError> {
    let code = query
        .and_then(|Query(q)| q.code)
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingParameter("code"))?;
    let login = state.login().ok_or(ApiError::NotConfigured)?;
    let rows = login.complete(&code).await?;
    Ok(Json(serde_json::json!({ "user": rows })))
}
