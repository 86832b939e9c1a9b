//! Route definitions for the HTTP API.

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use axum::{BoxError, Router};
use slaide_config::ServerSection;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::error::middleware_error;
use crate::handlers;
use crate::state::AppState;

/// Build the router with default limits.
pub fn build_router(state: AppState) -> Router {
    build_router_with(state, &ServerSection::default())
}

/// Build the router with the timeout, body and concurrency limits in `limits`.
pub fn build_router_with(state: AppState, limits: &ServerSection) -> Router {
    let request_timeout = Duration::from_secs(limits.request_timeout_secs);
    let api_routes = Router::new()
        .route(
            "/artifact",
            get(handlers::get_artifact).post(handlers::post_artifact),
        )
        .route("/generate", post(handlers::generate))
        .route("/auth/discord/callback", get(handlers::discord_callback));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/live", get(handlers::health_live))
        .route("/health/ready", get(handlers::health_ready))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    middleware_error(err, request_timeout)
                }))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(RequestBodyLimitLayer::new(limits.body_limit_bytes))
        .layer(ConcurrencyLimitLayer::new(limits.concurrency_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use slaide_config::SlaideConfig;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Router whose Host points at a closed port; fine for routes that never call it.
    fn make_app() -> Router {
        let mut config = SlaideConfig::default();
        config.host.url = "http://127.0.0.1:9".to_string();
        build_router(AppState::from_config(&config).unwrap())
    }

    async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let resp = make_app().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_u64());
    }

    #[tokio::test]
    async fn test_health_live() {
        let resp = make_app().oneshot(get_req("/health/live")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_without_host() {
        let resp = make_app().oneshot(get_req("/health/ready")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["error"], "Not ready");
    }

    #[tokio::test]
    async fn test_artifact_missing_path() {
        for uri in ["/api/artifact", "/api/artifact?path=", "/api/artifact?other=1"] {
            let resp = make_app().oneshot(get_req(uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_json(resp).await["error"], "Missing path");
        }
    }

    #[tokio::test]
    async fn test_artifact_not_found() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone.pdf");
        let uri = format!("/api/artifact?path={}", missing.to_str().unwrap());
        let resp = make_app().oneshot(get_req(&uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Not found");
        assert!(json["details"].is_string());
    }

    #[tokio::test]
    async fn test_artifact_odd_paths() {
        for path in ["..", "%2E%2E%2F%2E%2E", "%00", "/nonexistent/..%2Fx.html"] {
            let uri = format!("/api/artifact?path={path}");
            let resp = make_app().oneshot(get_req(&uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }

    #[tokio::test]
    async fn test_get_html_artifact_is_sanitized() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mine.html");
        std::fs::write(&path, "```html\n<div>```\n</div>\n```").unwrap();

        let uri = format!("/api/artifact?path={}", path.to_str().unwrap());
        let resp = make_app().oneshot(get_req(&uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "inline; filename=\"mine.html\""
        );
        assert_eq!(headers[header::CONTENT_LENGTH], "12");
        assert_eq!(body_bytes(resp).await, b"<div>\n</div>");
    }

    #[tokio::test]
    async fn test_get_pdf_artifact_streams_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deck.pdf");
        let bytes = b"%PDF-1.4\n```untouched```\n%%EOF";
        std::fs::write(&path, bytes).unwrap();

        let uri = format!("/api/artifact?path={}", path.to_str().unwrap());
        let resp = make_app().oneshot(get_req(&uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            resp.headers()[header::CONTENT_LENGTH],
            bytes.len().to_string().as_str()
        );
        assert_eq!(body_bytes(resp).await, bytes);
    }

    #[tokio::test]
    async fn test_get_other_artifact_is_octet_stream() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "```kept```").unwrap();

        let uri = format!("/api/artifact?path={}", path.to_str().unwrap());
        let resp = make_app().oneshot(get_req(&uri)).await.unwrap();
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert_eq!(body_bytes(resp).await, b"```kept```");
    }

    #[tokio::test]
    async fn test_post_artifact_sanitizes() {
        let resp = make_app()
            .oneshot(post_req(
                "/api/artifact",
                r#"{"html":"<p>```</p><pre>```keep```</pre>"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(
            body_bytes(resp).await,
            b"<p></p><pre>```keep```</pre>".to_vec()
        );
    }

    #[tokio::test]
    async fn test_post_artifact_errors() {
        let resp = make_app()
            .oneshot(post_req("/api/artifact", r#"{"html": 5}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Missing html");

        let resp = make_app()
            .oneshot(post_req("/api/artifact", "{oops"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Bad request");
        assert!(json["details"].is_string());
    }

    #[tokio::test]
    async fn test_generate_requires_prompt() {
        for body in ["{}", r#"{"prompt": 42}"#, r#"{"prompt": ""}"#] {
            let resp = make_app()
                .oneshot(post_req("/api/generate", body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(body_json(resp).await["error"], "Missing prompt");
        }
    }

    #[tokio::test]
    async fn test_generate_host_unreachable() {
        let resp = make_app()
            .oneshot(post_req("/api/generate", r#"{"prompt":"otters"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Server error");
        assert!(json["details"].is_string());
    }

    #[tokio::test]
    async fn test_discord_callback_without_code() {
        let resp = make_app()
            .oneshot(get_req("/api/auth/discord/callback"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "No code provided");
    }

    #[tokio::test]
    async fn test_discord_callback_not_configured() {
        let resp = make_app()
            .oneshot(get_req("/api/auth/discord/callback?code=abc"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(resp).await["error"],
            "Discord login is not configured"
        );
    }

    #[tokio::test]
    async fn test_body_limit() {
        let limits = ServerSection {
            body_limit_bytes: 16,
            ..ServerSection::default()
        };
        let app = build_router_with(
            AppState::from_config(&SlaideConfig::default()).unwrap(),
            &limits,
        );
        let body = r#"{"html":"<p>far more than sixteen bytes</p>"}"#;
        let mut req = post_req("/api/artifact", body);
        req.headers_mut()
            .insert(header::CONTENT_LENGTH, body.len().into());
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
