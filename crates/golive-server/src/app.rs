//! Router construction.
//!
//! Every path is served by one fallback handler: WebSocket upgrades go to the
//! live reload endpoint, everything else to the static responder.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection};
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::live_reload::websocket;
use crate::middleware::security;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer())
                .layer(security::xss_protection_layer())
                .layer(security::no_cache_layer())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Serve a request on any path.
async fn handle_request(
    State(state): State<Arc<AppState>>,
    method: Method,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    uri: Uri,
) -> Response {
    if let Ok(ws) = upgrade
        && state.live_reload_enabled()
    {
        return websocket::ws_handler(ws, Arc::clone(&state.broadcaster));
    }

    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, HEAD")],
        )
            .into_response();
    }

    state.responder.respond(uri.path()).await.into_response()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::live_reload::Broadcaster;
    use crate::responder::StaticResponder;

    fn router_for(root: &std::path::Path) -> Router {
        create_router(Arc::new(AppState {
            responder: StaticResponder::new(root.to_path_buf(), Some(5500)),
            broadcaster: Arc::new(Broadcaster::new()),
            live_reload: true,
        }))
    }

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn assert_hardened(response: &Response) {
        assert_eq!(header(response, "x-content-type-options"), Some("nosniff"));
        assert_eq!(header(response, "x-frame-options"), Some("SAMEORIGIN"));
        assert_eq!(header(response, "x-xss-protection"), Some("1; mode=block"));
        assert_eq!(header(response, "cache-control"), Some("no-cache"));
    }

    #[tokio::test]
    async fn test_page_response_has_security_headers() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("index.html"), "<body>home</body>").unwrap();

        let response = router_for(temp.path())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "content-type"), Some("text/html; charset=utf-8"));
        assert_hardened(&response);
    }

    #[tokio::test]
    async fn test_not_found_has_security_headers() {
        let temp = tempfile::tempdir().unwrap();

        let response = router_for(temp.path())
            .oneshot(Request::get("/nope.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_hardened(&response);
    }

    #[tokio::test]
    async fn test_gzip_when_accepted() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("app.js"), "console.log('hello');\n".repeat(64)).unwrap();

        let response = router_for(temp.path())
            .oneshot(
                Request::get("/app.js")
                    .header("accept-encoding", "gzip")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "content-encoding"), Some("gzip"));
    }

    #[tokio::test]
    async fn test_identity_without_accept_encoding() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("app.js"), "console.log('hello');\n".repeat(64)).unwrap();

        let response = router_for(temp.path())
            .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(header(&response, "content-encoding"), None);
    }

    #[tokio::test]
    async fn test_post_is_rejected() {
        let temp = tempfile::tempdir().unwrap();

        let response = router_for(temp.path())
            .oneshot(Request::post("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(header(&response, "allow"), Some("GET, HEAD"));
        assert_hardened(&response);
    }
}
