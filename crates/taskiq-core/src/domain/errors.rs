//! Errors - エラー型と分類
//!
//! 依存サブシステムのエラーは 4 種類のクライアント起因エラー
//! （NotFound / InvalidEdge / Conflict / CycleDetected）と、
//! そのまま呼び出し元に伝播させる内部エラーに分かれます。
//! エンジン自身はどのエラーもリトライしません。

use thiserror::Error;

use super::ids::{Id, IdMarker};
use super::{DependencyId, TaskId};

/// ErrorKind はエラーの運用分類（transport の status code に写像される）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 参照先のタスクまたはエッジが存在しない
    NotFound,
    /// 自己依存など、エッジとして成立しないリクエスト
    InvalidEdge,
    /// 同じ (task_id, depends_on_task_id) のエッジが既にある
    Conflict,
    /// 追加すると循環ができる
    CycleDetected,
    /// タスク属性の範囲チェック違反
    InvalidTask,
    /// 想定外（ストア障害、インデックス破損など）
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidEdge => "InvalidEdge",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::CycleDetected => "CycleDetected",
            ErrorKind::InvalidTask => "InvalidTask",
            ErrorKind::Internal => "Internal",
        }
    }
}

/// Task Store 側のエラー
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("task store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("task {0} not found")]
    NotFound(TaskId),

    /// 削除フックが失敗したので削除を中止した（タスクは残っている）
    #[error("deletion of task {task_id} aborted: {reason}")]
    DeletionAborted { task_id: TaskId, reason: String },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidTask(_) => ErrorKind::InvalidTask,
            StoreError::Unavailable(_) | StoreError::DeletionAborted { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

/// DependencyError は Graph Engine / サービス層のエラー
#[derive(Debug, Clone, Error)]
pub enum DependencyError {
    /// タスクまたはエッジ（id 指定）が存在しない
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// (task_id, depends_on_task_id) で指定したエッジが存在しない
    #[error("dependency {task_id} -> {depends_on_task_id} not found")]
    EdgeNotFound {
        task_id: TaskId,
        depends_on_task_id: TaskId,
    },

    #[error("invalid dependency: {0}")]
    InvalidEdge(String),

    #[error("dependency {task_id} -> {depends_on_task_id} already exists")]
    Conflict {
        task_id: TaskId,
        depends_on_task_id: TaskId,
    },

    /// `path` は task_id から始まり task_id に戻る閉路
    #[error(
        "dependency {task_id} -> {depends_on_task_id} would create a cycle: {}",
        format_path(.path)
    )]
    CycleDetected {
        task_id: TaskId,
        depends_on_task_id: TaskId,
        path: Vec<TaskId>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("dependency index corrupted: {0}")]
    Corrupted(String),
}

impl DependencyError {
    pub fn not_found<T: IdMarker>(id: Id<T>) -> Self {
        DependencyError::NotFound {
            kind: T::kind(),
            id: id.get(),
        }
    }

    pub fn task_not_found(id: TaskId) -> Self {
        Self::not_found(id)
    }

    pub fn dependency_not_found(id: DependencyId) -> Self {
        Self::not_found(id)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DependencyError::NotFound { .. } | DependencyError::EdgeNotFound { .. } => {
                ErrorKind::NotFound
            }
            DependencyError::InvalidEdge(_) => ErrorKind::InvalidEdge,
            DependencyError::Conflict { .. } => ErrorKind::Conflict,
            DependencyError::CycleDetected { .. } => ErrorKind::CycleDetected,
            DependencyError::Store(e) => e.kind(),
            DependencyError::Corrupted(_) => ErrorKind::Internal,
        }
    }
}

fn format_path(path: &[TaskId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
