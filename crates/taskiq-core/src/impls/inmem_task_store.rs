//! InMemoryTaskStore - 開発用・テスト用の Task Store
//!
//! # 実装詳細
//! - BTreeMap<TaskId, Task> で保持するので list_tasks は ID 順（= 作成順）
//! - ID は 1 から払い出し、削除しても再利用しない
//! - 削除通知リスナーは Weak で持つ（Graph Engine も store を Arc で持つため）

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{NewTask, StoreError, Task, TaskId};
use crate::ports::{TaskDeletionListener, TaskStore};

struct StoreState {
    tasks: BTreeMap<TaskId, Task>,

    /// Next task ID to assign.
    next_id: TaskId,
}

pub struct InMemoryTaskStore {
    state: Mutex<StoreState>,
    listeners: RwLock<Vec<Weak<dyn TaskDeletionListener>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                tasks: BTreeMap::new(),
                next_id: TaskId::new(1),
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 範囲チェックをしてからタスクを作成する
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError> {
        new_task.validate().map_err(StoreError::InvalidTask)?;

        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id = id.next();
        let task = new_task.into_task(id);
        state.tasks.insert(id, task.clone());
        info!(task_id = %id, title = %task.title, "task created");
        Ok(task)
    }

    /// Delete a task.
    ///
    /// 1. 存在確認
    /// 2. 削除通知リスナーを同期的に呼ぶ（どれかが失敗したら中止、タスクは残る）
    /// 3. 削除を確定
    pub async fn delete_task(&self, id: TaskId) -> Result<Task, StoreError> {
        if !self.state.lock().await.tasks.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }

        for listener in self.live_listeners() {
            if let Err(e) = listener.on_task_deleted(id).await {
                warn!(task_id = %id, error = %e, "deletion listener failed; deletion aborted");
                return Err(StoreError::DeletionAborted {
                    task_id: id,
                    reason: e.to_string(),
                });
            }
        }

        let removed = self
            .state
            .lock()
            .await
            .tasks
            .remove(&id)
            .ok_or(StoreError::NotFound(id))?;
        info!(task_id = %id, "task deleted");
        Ok(removed)
    }

    /// 生きているリスナーだけを返し、drop 済みのものは掃除する
    fn live_listeners(&self) -> Vec<Arc<dyn TaskDeletionListener>> {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.state.lock().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.state.lock().await.tasks.values().cloned().collect())
    }

    fn subscribe_deletions(&self, listener: Arc<dyn TaskDeletionListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&listener));
    }
}
