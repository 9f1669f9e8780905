//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! - Task Store と Clock を受け取り、Graph Engine を組み立てる
//! - Graph Engine を Task Store の削除通知リスナーとして登録する
//! - 起動時検証（Fail-fast 設計）: Task Store が無ければ build() で失敗

use std::sync::Arc;

use crate::app::DependencyService;
use crate::graph::DependencyGraph;
use crate::ports::{Clock, SystemClock, TaskStore};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let store = Arc::new(InMemoryTaskStore::new());
/// let app = AppBuilder::new()
///     .task_store(store.clone())
///     .build()?;
/// app.service.create_dependency(request).await?;
/// ```
///
/// 設定はすべて明示的に渡す。グローバルな可変状態は持たない。
pub struct AppBuilder {
    store: Option<Arc<dyn TaskStore>>,
    clock: Option<Arc<dyn Clock>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No task store configured. Call AppBuilder::task_store() before build().")]
    MissingTaskStore,
}

impl AppBuilder {
    /// 新しい AppBuilder を作成
    pub fn new() -> Self {
        Self {
            store: None,
            clock: None,
        }
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 省略時は SystemClock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let store = self.store.ok_or(BuildError::MissingTaskStore)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let graph = Arc::new(DependencyGraph::with_clock(store.clone(), clock));
        store.subscribe_deletions(graph.clone());

        Ok(App {
            service: DependencyService::new(graph, store),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App はアプリケーションのランタイム
pub struct App {
    pub service: DependencyService,
}
