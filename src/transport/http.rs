//! HTTP transport for the MCP server.
//!
//! One axum router serves two endpoints:
//! - `POST <api-endpoint>`: the request envelope in, the response envelope out
//! - `<mcp-endpoint>`: streamable MCP (HTTP with SSE streaming responses)
//!
//! Every response carries an `X-Process-Time` header in seconds. CORS is
//! open to any origin.

use crate::db::MySqlConnector;
use crate::error::{DbError, DbResult, codes};
use crate::mcp::MySqlService;
use crate::models::{ErrorDetail, Request, Response};
use crate::tools::ActionDispatcher;
use crate::transport::{Transport, wait_for_signal};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::routing::post;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// HTTP transport implementation.
pub struct HttpTransport {
    dispatcher: ActionDispatcher<MySqlConnector>,
    host: String,
    port: u16,
    /// Plain request envelope endpoint
    api_endpoint: String,
    /// Streamable MCP endpoint
    mcp_endpoint: String,
}

impl HttpTransport {
    pub fn new(
        dispatcher: ActionDispatcher<MySqlConnector>,
        host: impl Into<String>,
        port: u16,
        api_endpoint: impl Into<String>,
        mcp_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            host: host.into(),
            port,
            api_endpoint: api_endpoint.into(),
            mcp_endpoint: mcp_endpoint.into(),
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the axum router for both endpoints.
    pub fn router(&self) -> axum::Router {
        let factory_dispatcher = self.dispatcher.clone();
        let mcp_service = StreamableHttpService::new(
            move || Ok(MySqlService::new(factory_dispatcher.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        let router = axum::Router::new().route(&self.api_endpoint, post(handle_envelope));

        // nest_service doesn't support the root path
        let router = if self.mcp_endpoint == "/" {
            router.fallback_service(mcp_service)
        } else {
            router.nest_service(&self.mcp_endpoint, mcp_service)
        };

        router
            .with_state(self.dispatcher.clone())
            .layer(middleware::from_fn(add_process_time))
            .layer(CorsLayer::permissive())
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting server with HTTP transport on {}", bind_addr);

        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::internal("BindError", format!("Failed to bind to {}: {}", bind_addr, e))
        })?;

        info!(
            api_endpoint = %self.api_endpoint,
            mcp_endpoint = %self.mcp_endpoint,
            "Endpoints ready"
        );

        // SSE connections may keep the server alive indefinitely
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        let served = tokio::select! {
            result = server => {
                result.map_err(|e| {
                    error!(error = %e, "HTTP server error");
                    DbError::internal("TransportError", format!("HTTP server error: {}", e))
                })
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
            } => Ok(()),
        };

        info!("Closing all sessions");
        self.dispatcher.registry().close_all().await;

        if served.is_ok() {
            info!("HTTP server stopped");
        }
        served
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// `POST <api-endpoint>`: decode the envelope and dispatch it.
///
/// A body that is not a valid request envelope is answered with an
/// INVALID_PARAMETERS envelope and the extractor's status code.
pub async fn handle_envelope(
    State(dispatcher): State<ActionDispatcher<MySqlConnector>>,
    payload: Result<Json<Request>, JsonRejection>,
) -> (StatusCode, Json<Response>) {
    match payload {
        Ok(Json(request)) => (StatusCode::OK, Json(dispatcher.handle(request).await)),
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed request envelope");
            let detail = ErrorDetail::new(codes::INVALID_PARAMETERS, "Invalid request body")
                .with_details(rejection.body_text());
            (rejection.status(), Json(Response::failure(detail, None)))
        }
    }
}

async fn add_process_time(
    request: axum::extract::Request,
    next: Next,
) -> axum::response::Response {
    let start = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64().to_string();
    if let Ok(value) = HeaderValue::from_str(&elapsed) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }
    response
}
