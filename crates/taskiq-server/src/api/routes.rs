//! Route table and handlers.
//!
//! ハンドラは (de)serialize と status code の写像だけを行い、
//! 判定はすべて `DependencyService`（Graph Engine）に任せる。

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode},
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use taskiq_core::app::{AppBuilder, BuildError, DependencyService};
use taskiq_core::domain::{
    DependencyEdge, DependencyId, DependencyView, NewDependency, NewTask, Task, TaskId,
};
use taskiq_core::impls::InMemoryTaskStore;
use taskiq_core::observability::DependencyCounts;
use taskiq_core::ports::TaskStore;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use crate::config::Config;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: DependencyService,
    /// Task Store の薄いシム（/tasks）
    pub tasks: Arc<InMemoryTaskStore>,
}

impl AppState {
    /// In-memory task store wired to a fresh dependency graph.
    pub fn in_memory() -> Result<Self, BuildError> {
        let tasks = Arc::new(InMemoryTaskStore::new());
        let app = AppBuilder::new().task_store(tasks.clone()).build()?;
        Ok(Self {
            service: app.service,
            tasks,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    pub dependencies: DependencyCounts,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListDependenciesQuery {
    pub task_id: Option<TaskId>,
}

type ApiResult<T> = Result<T, ApiError>;

/// Build the router without CORS/tracing layers (tests drive this directly).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", delete(delete_task))
        .route("/tasks/{id}/dependency_view", get(dependency_view))
        .route(
            "/tasks_dependencies",
            get(list_dependencies)
                .post(create_dependency)
                .delete(delete_dependency),
        )
        .route("/tasks_dependencies/{id}", delete(delete_dependency_by_id))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the HTTP server and run until SIGINT/SIGTERM.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::in_memory()?;
    let app = router(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

// ========================================
// Handlers
// ========================================

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Agile TaskIQ API is running.".to_string(),
    })
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy".to_string(),
        message: "API is running.".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dependencies: state.service.counts().await,
    })
}

async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list_tasks().await?))
}

async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(body) = body.map_err(|r| ApiError::invalid_task(r.body_text()))?;
    let task = state.tasks.create_task(body).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn delete_task(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Task>> {
    let Path(id) = id.map_err(|r| ApiError::invalid_task(r.body_text()))?;
    Ok(Json(state.tasks.delete_task(TaskId::new(id)).await?))
}

async fn dependency_view(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DependencyView>> {
    let Path(id) = id.map_err(|r| ApiError::invalid_task(r.body_text()))?;
    let view = state.service.get_dependency_view(TaskId::new(id)).await?;
    Ok(Json(view))
}

async fn list_dependencies(
    State(state): State<AppState>,
    query: Result<Query<ListDependenciesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DependencyEdge>>> {
    let Query(query) = query.map_err(|r| ApiError::invalid_edge(r.body_text()))?;
    Ok(Json(state.service.list_dependencies(query.task_id).await))
}

async fn create_dependency(
    State(state): State<AppState>,
    body: Result<Json<NewDependency>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DependencyEdge>)> {
    let Json(body) = body.map_err(|r| ApiError::invalid_edge(r.body_text()))?;
    let edge = state.service.create_dependency(body).await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

async fn delete_dependency(
    State(state): State<AppState>,
    query: Result<Query<NewDependency>, QueryRejection>,
) -> ApiResult<Json<DependencyEdge>> {
    let Query(query) = query.map_err(|r| ApiError::invalid_edge(r.body_text()))?;
    let edge = state
        .service
        .delete_dependency(query.task_id, query.depends_on_task_id)
        .await?;
    Ok(Json(edge))
}

async fn delete_dependency_by_id(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DependencyEdge>> {
    let Path(id) = id.map_err(|r| ApiError::invalid_edge(r.body_text()))?;
    let edge = state
        .service
        .delete_dependency_by_id(DependencyId::new(id))
        .await?;
    Ok(Json(edge))
}
