//! HTTP API for the task dependency subsystem.
//!
//! ## Endpoints
//!
//! - `GET /tasks_dependencies[?task_id={id}]` - List dependency edges
//! - `POST /tasks_dependencies` - Create a dependency (`201`)
//! - `DELETE /tasks_dependencies?task_id={a}&depends_on_task_id={b}` - Remove a dependency
//! - `DELETE /tasks_dependencies/{id}` - Remove a dependency by edge id
//! - `GET /tasks/{id}/dependency_view` - dependsOn / dependents / availableCandidates
//! - `GET /tasks`, `POST /tasks`, `DELETE /tasks/{id}` - Task store shim
//! - `GET /` - Liveness message
//! - `GET /status` - Health check
//!
//! Status codes: `404` NotFound, `409` Conflict / CycleDetected, `422` InvalidEdge.
//! decode できないリクエスト（壊れた JSON、欠けた / 整数でない id）も
//! `422` InvalidEdge（/tasks では InvalidTask）として JSON で返す。

pub mod error;
mod routes;

pub use error::ApiError;
pub use routes::{AppState, router, serve};
