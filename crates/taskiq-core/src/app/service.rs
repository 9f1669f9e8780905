//! DependencyService - プレゼンテーション層に公開するインターフェース
//!
//! - `get_dependency_view`: Graph Engine（インデックス参照）→ View Builder
//! - `create_dependency` / `delete_dependency`: そのまま Graph Engine へ
//!
//! ここには検証ロジックを置かない。判定はすべて Graph Engine が行う。

use std::sync::Arc;

use crate::app::view::build_view;
use crate::domain::{
    DependencyEdge, DependencyError, DependencyId, DependencyView, NewDependency, TaskId,
};
use crate::graph::DependencyGraph;
use crate::observability::DependencyCounts;
use crate::ports::TaskStore;

#[derive(Clone)]
pub struct DependencyService {
    graph: Arc<DependencyGraph>,
    store: Arc<dyn TaskStore>,
}

impl DependencyService {
    pub fn new(graph: Arc<DependencyGraph>, store: Arc<dyn TaskStore>) -> Self {
        Self { graph, store }
    }

    /// 対象タスクの依存ビューを返す。対象自体が存在しなければ `NotFound`。
    pub async fn get_dependency_view(
        &self,
        task_id: TaskId,
    ) -> Result<DependencyView, DependencyError> {
        let edges = self.graph.list_edges_for_task(task_id).await;
        let tasks = self.store.list_tasks().await?;
        if !tasks.iter().any(|task| task.id == task_id) {
            return Err(DependencyError::task_not_found(task_id));
        }
        Ok(build_view(task_id, &edges, &tasks))
    }

    pub async fn create_dependency(
        &self,
        request: NewDependency,
    ) -> Result<DependencyEdge, DependencyError> {
        self.graph
            .add_edge(request.task_id, request.depends_on_task_id)
            .await
    }

    pub async fn delete_dependency(
        &self,
        task_id: TaskId,
        depends_on_task_id: TaskId,
    ) -> Result<DependencyEdge, DependencyError> {
        self.graph.remove_edge(task_id, depends_on_task_id).await
    }

    pub async fn delete_dependency_by_id(
        &self,
        id: DependencyId,
    ) -> Result<DependencyEdge, DependencyError> {
        self.graph.remove_edge_by_id(id).await
    }

    /// `task_id` を指定すればそのタスクに接するエッジだけ、なければ全件
    pub async fn list_dependencies(&self, task_id: Option<TaskId>) -> Vec<DependencyEdge> {
        match task_id {
            Some(id) => self.graph.list_edges_for_task(id).await,
            None => self.graph.list_edges().await,
        }
    }

    pub async fn counts(&self) -> DependencyCounts {
        self.graph.counts().await
    }
}
