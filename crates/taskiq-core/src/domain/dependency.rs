//! DependencyEdge - 「task_id は depends_on_task_id に依存する」という有向エッジ

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DependencyId, TaskId};

/// Graph Engine が排他的に所有する依存エッジ
///
/// `id` はエンジンが単調増加で払い出すので、id 順 = 作成順になります。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub id: DependencyId,
    pub task_id: TaskId,
    pub depends_on_task_id: TaskId,
    pub created_at: DateTime<Utc>,
}

impl DependencyEdge {
    /// このエッジが `task` に接しているか
    pub fn touches(&self, task: TaskId) -> bool {
        self.task_id == task || self.depends_on_task_id == task
    }
}

/// エッジ作成（および削除）リクエストの本体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDependency {
    pub task_id: TaskId,
    pub depends_on_task_id: TaskId,
}

impl NewDependency {
    pub fn new(task_id: TaskId, depends_on_task_id: TaskId) -> Self {
        Self {
            task_id,
            depends_on_task_id,
        }
    }
}
