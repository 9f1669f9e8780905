//! Dependency View Builder
//!
//! Graph Engine が返した生のエッジを、1 タスク分のビューに分割・解決します。
//!
//! # 解決ルール
//! - エッジの相手タスクは Task Store のスナップショットから引く
//! - 競合で相手が削除済みなら、失敗せずプレースホルダ `Task <id>`（status: unknown）で埋める
//! - 並び順はエッジ作成順（入力の順序をそのまま保つ）

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::domain::{DependencyEdge, DependencyView, Task, TaskId};

/// Build the view of `subject` from its incident edges and a task snapshot.
///
/// `edges` は `list_edges_for_task(subject)` の結果（作成順）、
/// `tasks` は `list_tasks()` の結果を想定している。
pub fn build_view(subject: TaskId, edges: &[DependencyEdge], tasks: &[Task]) -> DependencyView {
    let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|task| (task.id, task)).collect();
    let resolve = |id: TaskId| match by_id.get(&id) {
        Some(task) => (*task).clone(),
        None => {
            warn!(%subject, missing = %id, "dependency points at a deleted task; using placeholder");
            Task::placeholder(id)
        }
    };

    let depends_on: Vec<Task> = edges
        .iter()
        .filter(|edge| edge.task_id == subject)
        .map(|edge| resolve(edge.depends_on_task_id))
        .collect();

    let dependents: Vec<Task> = edges
        .iter()
        .filter(|edge| edge.depends_on_task_id == subject)
        .map(|edge| resolve(edge.task_id))
        .collect();

    let already: HashSet<TaskId> = depends_on.iter().map(|task| task.id).collect();
    let available_candidates = tasks
        .iter()
        .filter(|task| task.id != subject && !already.contains(&task.id))
        .cloned()
        .collect();

    DependencyView {
        depends_on,
        dependents,
        available_candidates,
    }
}
