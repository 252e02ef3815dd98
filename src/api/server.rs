//! HTTP server implementation for the task API.
//!
//! This module provides the axum-based HTTP server that exposes the REST
//! endpoints under `/api`, the health check, and the embedded web client.

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    response::{Html, IntoResponse, Json},
    routing::{get, put},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::templates;
use crate::config::Config;
use crate::db::{StoreStatus, TaskStore, spawn_store_init};
use crate::error::{ApiError, ApiResult};
use crate::types::{Task, TaskTitle};

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "Task Manager Backend";

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The task store, injected at startup.
    store: Arc<dyn TaskStore>,
    /// Deployment environment name.
    environment: String,
    /// API base URL handed to the web client.
    api_base_url: String,
    /// Store initialization status.
    store_status: watch::Receiver<StoreStatus>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TaskStore>,
        environment: impl Into<String>,
        api_base_url: impl Into<String>,
        store_status: watch::Receiver<StoreStatus>,
    ) -> Self {
        Self {
            store,
            environment: environment.into(),
            api_base_url: api_base_url.into(),
            store_status,
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    pub fn store_status(&self) -> StoreStatus {
        *self.store_status.borrow()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    environment: String,
    timestamp: String,
    store: &'static str,
}

/// Confirmation body for deletions.
#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Root endpoint - serves the single-page client.
async fn index(State(state): State<AppState>) -> Html<String> {
    Html(templates::render_index(&state.api_base_url))
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        service: SERVICE_NAME,
        environment: state.environment.clone(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        store: state.store_status().as_str(),
    })
}

/// Parse a path segment as a task id.
fn parse_task_id(raw: &str) -> ApiResult<i64> {
    raw.parse().map_err(|_| ApiError::invalid_id(raw))
}

/// Unwrap a JSON body, turning axum's rejection into our error shape.
fn json_body(body: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_body(rejection.body_text()))
}

/// List all tasks, newest first.
async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.store().list().await?;
    Ok(Json(tasks))
}

/// Create a task from `{"title": ...}`.
async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let body = json_body(body)?;
    // Non-string titles are treated like a missing one
    let raw = body.get("title").and_then(Value::as_str).unwrap_or("");
    let title = TaskTitle::parse(raw)?;

    let task = state.store().create(&title).await?;
    info!(id = task.id, "Task created");
    Ok(Json(task))
}

/// Set `completed` from `{"completed": bool}`.
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let body = json_body(body)?;
    let completed = body
        .get("completed")
        .and_then(Value::as_bool)
        .ok_or_else(ApiError::invalid_completed)?;
    let id = parse_task_id(&id)?;

    let task = state
        .store()
        .set_completed(id, completed)
        .await?
        .ok_or_else(ApiError::task_not_found)?;
    info!(id, completed, "Task updated");
    Ok(Json(task))
}

/// Delete a task.
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_task_id(&id)?;

    if !state.store().delete(id).await? {
        return Err(ApiError::task_not_found());
    }
    info!(id, "Task deleted");
    Ok(Json(MessageResponse {
        message: "Task deleted successfully",
    }))
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    // The client may be served from another origin during development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/health", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle for managing a running server.
pub struct ServerHandle {
    /// Address the listener is bound to.
    addr: SocketAddr,
    /// Channel to signal shutdown.
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Serving task; finishes after the store has been closed.
    join: JoinHandle<()>,
    /// Receiver for store initialization updates.
    store_status: watch::Receiver<StoreStatus>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Current store initialization status.
    pub fn store_status(&self) -> StoreStatus {
        *self.store_status.borrow()
    }

    /// Wait until store initialization has either succeeded or given up.
    pub async fn wait_for_store(&mut self) -> StoreStatus {
        match self
            .store_status
            .wait_for(|status| *status != StoreStatus::Pending)
            .await
        {
            Ok(status) => *status,
            Err(_) => StoreStatus::Failed,
        }
    }

    /// Stop accepting connections, let in-flight requests finish, then close
    /// the store.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.join.await?;
        Ok(())
    }
}

/// Start the HTTP server.
///
/// Binds the listener and starts serving right away; the `tasks` table is
/// created concurrently by a retrying background task, so requests that
/// arrive before it exists fail with a store error.
pub async fn start_server(store: Arc<dyn TaskStore>, config: &Config) -> anyhow::Result<ServerHandle> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let addr = listener.local_addr()?;

    // Port 0 binds an ephemeral port; point the web client at the real one
    let mut bound = config.clone();
    bound.server.port = addr.port();

    let (init_handle, store_status) =
        spawn_store_init(Arc::clone(&store), config.store.retry.clone());

    let state = AppState::new(
        Arc::clone(&store),
        config.server.environment.clone(),
        bound.api_base_url(),
        store_status.clone(),
    );
    let app = build_router(state);

    info!(
        "Server running on http://{} in {} mode ({} store)",
        addr,
        config.server.environment,
        store.backend()
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let join = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Shutting down gracefully");
            })
            .await
        {
            error!("Server error: {}", e);
        }

        init_handle.abort();
        store.close().await;
        info!("Store closed");
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        join,
        store_status,
    })
}

/// Resolve when the process receives SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
