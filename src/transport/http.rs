//! HTTP transport with Server-Sent Events.
//!
//! Session flow:
//! 1. `GET <sse_path>` opens a session. The first event (`endpoint`) carries
//!    the URL to post frames to, `<messages_path>?sessionId=<id>`.
//! 2. `POST <messages_path>?sessionId=<id>` with one JSON-RPC frame answers
//!    `202 Accepted` immediately.
//! 3. The response arrives later on the event stream as a `message` event.
//!
//! Dropping the event stream closes the session.

use crate::error::{ServerError, ServerResult};
use crate::mcp::JsonRpcRequest;
use crate::transport::session::SessionManager;
use crate::transport::{Transport, wait_for_signal};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_util::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Interval between SSE keep-alive comments.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Clone)]
struct AppState {
    sessions: SessionManager,
    messages_path: Arc<str>,
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Build the router. Exposed separately from `HttpTransport` for in-process tests.
pub fn create_router(sessions: SessionManager, sse_path: &str, messages_path: &str) -> Router {
    let state = AppState {
        sessions,
        messages_path: Arc::from(messages_path),
    };

    Router::new()
        .route(sse_path, get(handle_sse))
        .route(messages_path, post(handle_message))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, mut rx) = state.sessions.open_session().await;
    let endpoint = format!("{}?sessionId={}", state.messages_path, session_id);
    let guard = state.sessions.guard(session_id);

    let stream = async_stream::stream! {
        // Dropped with the stream on client disconnect
        let _guard = guard;

        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));

        while let Some(response) = rx.recv().await {
            match serde_json::to_string(&response) {
                Ok(data) => yield Ok(Event::default().event("message").data(data)),
                Err(e) => warn!(error = %e, "Failed to serialize response frame"),
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("ping"),
    )
}

async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "Missing sessionId").into_response();
    };

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Rejected malformed frame");
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON-RPC message: {}", e),
            )
                .into_response();
        }
    };

    match state.sessions.post_message(&session_id, request).await {
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Frame for unknown session");
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len().await,
    }))
}

/// HTTP transport implementation.
pub struct HttpTransport {
    sessions: SessionManager,
    host: String,
    port: u16,
    sse_path: String,
    messages_path: String,
}

impl HttpTransport {
    pub fn new(
        sessions: SessionManager,
        host: impl Into<String>,
        port: u16,
        sse_path: impl Into<String>,
        messages_path: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            host: host.into(),
            port,
            sse_path: sse_path.into(),
            messages_path: messages_path.into(),
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn router(&self) -> Router {
        create_router(self.sessions.clone(), &self.sse_path, &self.messages_path)
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> ServerResult<()> {
        let bind_addr = self.bind_addr();
        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            ServerError::transport(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;

        info!(
            addr = %bind_addr,
            sse_path = %self.sse_path,
            messages_path = %self.messages_path,
            "HTTP transport listening"
        );

        // SSE streams stay open until their sessions close, so a bounded wait
        // follows the shutdown signal.
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let sessions = self.sessions.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            // Ending every session lets open event streams complete
            sessions.close_all().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(ServerError::transport(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        self.sessions.close_all().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::Dispatcher;
    use crate::tools::ToolRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> (SessionManager, Router) {
        let sessions = SessionManager::new(Dispatcher::new(ToolRegistry::new()));
        let router = create_router(sessions.clone(), "/sse", "/messages");
        (sessions, router)
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_http_transport_bind_addr() {
        let sessions = SessionManager::new(Dispatcher::new(ToolRegistry::new()));
        let transport = HttpTransport::new(sessions, "0.0.0.0", 3010, "/sse", "/messages");
        assert_eq!(transport.bind_addr(), "0.0.0.0:3010");
        assert_eq!(transport.name(), "http");
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_sessions, app) = router();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_without_session_id() {
        let (_sessions, app) = router();
        let response = app
            .oneshot(post("/messages", r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_to_unknown_session() {
        let (_sessions, app) = router();
        let response = app
            .oneshot(post(
                "/messages?sessionId=does-not-exist",
                r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_malformed_frame() {
        let (sessions, app) = router();
        let (id, _rx) = sessions.open_session().await;
        let response = app
            .oneshot(post(&format!("/messages?sessionId={}", id), "{oops"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_accepted() {
        let (sessions, app) = router();
        let (id, mut rx) = sessions.open_session().await;
        let response = app
            .oneshot(post(
                &format!("/messages?sessionId={}", id),
                r#"{"jsonrpc":"2.0","id":5,"method":"ping"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.id, Some(serde_json::json!(5)));
    }
}
