//! TaskStore port - タスク属性の正本（source of truth）
//!
//! 依存サブシステムは Task Store を外部の協調者として扱い、
//! 以下の最小インターフェースだけを使います：
//! - 存在確認（get_task）
//! - 一覧（list_tasks）: 候補一覧とビューの解決に使う
//! - 削除通知フック（TaskDeletionListener）
//!
//! Task Store がエッジを直接読んだり書いたりすることはありません。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DependencyError, StoreError, Task, TaskId};

/// TaskStore はタスクの存在確認と一覧を提供する
///
/// # 設計原則
/// - 存在しないタスクは `Ok(None)`（エラーではない）
/// - ストア自体の障害は `StoreError::Unavailable` で返し、握りつぶさない
/// - `list_tasks` の順序は安定していること（候補一覧の順序になる）
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// 削除通知を受け取るリスナーを登録する
    fn subscribe_deletions(&self, listener: Arc<dyn TaskDeletionListener>);

    async fn contains(&self, id: TaskId) -> Result<bool, StoreError> {
        Ok(self.get_task(id).await?.is_some())
    }
}

/// タスク削除の通知先
///
/// Task Store は削除を確定する「前に」同期的にこれを呼び出します。
/// リスナーがエラーを返した場合、削除は中止されタスクは残ります。
#[async_trait]
pub trait TaskDeletionListener: Send + Sync {
    async fn on_task_deleted(&self, task_id: TaskId) -> Result<(), DependencyError>;
}
