use crate::db::Db;
use crate::error::{Result, ReplygraphError};
use crate::graph::ReplyScope;
use crate::render::{render_server, GraphRenderer};
use crate::store::list_servers;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Check if a port is available by attempting to bind to it
async fn check_port_available(port: u16) -> bool {
    tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .is_ok()
}

/// HTTP facade over the event store and rendered graphs
pub struct HttpServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    db: Db,
    renderer: Arc<dyn GraphRenderer>,
    reply_scope: ReplyScope,
}

#[derive(Debug, Deserialize)]
struct UpdateGraphRequest {
    server_name: Option<String>,
}

impl HttpServer {
    pub fn new(
        db: Db,
        renderer: Arc<dyn GraphRenderer>,
        reply_scope: ReplyScope,
        allowed_origins: Vec<String>,
    ) -> Self {
        Self {
            state: AppState {
                db,
                renderer,
                reply_scope,
            },
            allowed_origins,
        }
    }

    /// Run the HTTP server on 127.0.0.1:`port`
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.create_router();
        let addr = format!("127.0.0.1:{}", port);

        if !check_port_available(port).await {
            return Err(ReplygraphError::Config(format!(
                "Port {} is already in use. Stop the other process or set http_server.port in config.toml",
                port
            )));
        }

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| {
                ReplygraphError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to bind to {}: {}", addr, e),
                ))
            })?;

        log::info!("Serving graph API on http://{}/api", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| ReplygraphError::Io(std::io::Error::other(format!("HTTP server error: {}", e))))?;

        Ok(())
    }

    /// Create the axum router
    pub fn create_router(&self) -> Router {
        // No configured origins: allow any, the browser client is served elsewhere
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/api/servers", get(handle_servers))
            .route("/api/update_graph", post(handle_update_graph))
            .route("/api/graph/:server_name", get(handle_graph))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn status_for(err: &ReplygraphError) -> StatusCode {
    match err {
        ReplygraphError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ReplygraphError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// GET /api/servers
async fn handle_servers(State(state): State<AppState>) -> Response {
    match list_servers(&state.db).await {
        Ok(servers) => (StatusCode::OK, Json(serde_json::json!({ "servers": servers }))).into_response(),
        Err(e) => {
            log::error!("Failed to list servers: {}", e);
            error_response(status_for(&e), e.to_string())
        }
    }
}

/// POST /api/update_graph {"server_name": "..."}
async fn handle_update_graph(State(state): State<AppState>, body: axum::body::Bytes) -> Response {
    let request: UpdateGraphRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)),
    };

    let server_name = match request.server_name {
        Some(name) if !name.is_empty() => name,
        _ => return error_response(StatusCode::BAD_REQUEST, "Server name is required!"),
    };

    match render_server(&state.db, Arc::clone(&state.renderer), &server_name, state.reply_scope).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": format!("Graph for server {} updated successfully!", server_name)
            })),
        )
            .into_response(),
        Err(e) => {
            log::error!("Failed to update graph for {}: {}", server_name, e);
            error_response(status_for(&e), e.to_string())
        }
    }
}

/// GET /api/graph/:server_name
async fn handle_graph(State(state): State<AppState>, Path(server_name): Path<String>) -> Response {
    let path = state.renderer.artifact_path(&server_name);

    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error_response(StatusCode::NOT_FOUND, "Graph not found!")
        }
        Err(e) => {
            log::error!("Failed to read graph {}: {}", path.display(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "replygraph",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}
