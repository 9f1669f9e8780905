//! DependencyGraph - 依存エッジの正本と不変条件の番人
//!
//! # 排他制御
//! - エッジ集合と 2 つの隣接インデックスは 1 つの共有資源として `RwLock` で守る
//! - 変更系（add / remove / on_task_deleted）は write guard の下で直列化する。
//!   到達可能性チェックと挿入を同じ critical section で行うので、
//!   並行した挿入が組み合わさって循環を作ることはない
//! - 読み取り系は read guard を取ってエッジをコピーし、すぐに手放す
//! - Task Store への問い合わせはロックを取る前に済ませる
//! - write guard を取ってからコミットまでの間に `.await` はない。
//!   リクエストがキャンセルされても中途半端なエッジは観測されない

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::DependencyIndex;
use crate::domain::{DependencyEdge, DependencyError, DependencyId, TaskId};
use crate::observability::DependencyCounts;
use crate::ports::{Clock, SystemClock, TaskDeletionListener, TaskStore};

/// ロックの内側にある状態
struct GraphState {
    index: DependencyIndex,

    /// Next edge id to assign.
    next_id: DependencyId,

    /// 削除通知を受け取ったタスク。Task Store の ID は再利用されない前提
    ///
    /// 要素は削除されないので、これまでに削除されたタスク数だけ単調に増える
    /// （上限は作成されたタスクの総数）。件数は `counts().retired_tasks` で見える。
    retired: HashSet<TaskId>,
}

impl GraphState {
    fn new() -> Self {
        Self {
            index: DependencyIndex::new(),
            next_id: DependencyId::new(1),
            retired: HashSet::new(),
        }
    }

    fn allocate_id(&mut self) -> DependencyId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    /// すべてのチェックを書き込みの前に行う（失敗時は何も変わらない）
    fn add_edge(
        &mut self,
        task_id: TaskId,
        depends_on_task_id: TaskId,
        now: DateTime<Utc>,
    ) -> Result<DependencyEdge, DependencyError> {
        // 存在確認はロック外で済んでいるが、その後に削除された可能性がある
        for id in [task_id, depends_on_task_id] {
            if self.retired.contains(&id) {
                return Err(DependencyError::task_not_found(id));
            }
        }
        if self.index.find(task_id, depends_on_task_id).is_some() {
            return Err(DependencyError::Conflict {
                task_id,
                depends_on_task_id,
            });
        }
        // depends_on から辿って task に届くなら、新しいエッジで閉路ができる
        if let Some(path) = self.index.path(depends_on_task_id, task_id) {
            let mut cycle = Vec::with_capacity(path.len() + 1);
            cycle.push(task_id);
            cycle.extend(path);
            return Err(DependencyError::CycleDetected {
                task_id,
                depends_on_task_id,
                path: cycle,
            });
        }

        let edge = DependencyEdge {
            id: self.allocate_id(),
            task_id,
            depends_on_task_id,
            created_at: now,
        };
        self.index.insert(edge.clone())?;
        Ok(edge)
    }

    fn remove_pair(
        &mut self,
        task_id: TaskId,
        depends_on_task_id: TaskId,
    ) -> Result<DependencyEdge, DependencyError> {
        let id = self
            .index
            .find(task_id, depends_on_task_id)
            .map(|edge| edge.id)
            .ok_or(DependencyError::EdgeNotFound {
                task_id,
                depends_on_task_id,
            })?;
        self.index.remove(id).ok_or_else(|| {
            DependencyError::Corrupted(format!("edge {id} indexed by pair but not stored"))
        })
    }

    fn purge(&mut self, task_id: TaskId) -> Vec<DependencyEdge> {
        self.retired.insert(task_id);
        self.index.remove_incident(task_id)
    }
}

/// Dependency Graph Engine.
///
/// # 使用例
/// ```ignore
/// let graph = DependencyGraph::new(store.clone());
/// let edge = graph.add_edge(task_b, task_a).await?; // B waits for A
/// let edges = graph.list_edges_for_task(task_a).await;
/// ```
pub struct DependencyGraph {
    state: RwLock<GraphState>,
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl DependencyGraph {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(GraphState::new()),
            store,
            clock,
        }
    }

    /// Add a dependency: `task_id` depends on `depends_on_task_id`.
    ///
    /// # Errors
    /// - `InvalidEdge`: 自己依存
    /// - `NotFound`: どちらかのタスクが存在しない
    /// - `Conflict`: 同じペアが既にある（成功した呼び出しをリトライした場合もこれ）
    /// - `CycleDetected`: 追加すると循環ができる
    /// - `Store`: Task Store の障害（そのまま伝播）
    pub async fn add_edge(
        &self,
        task_id: TaskId,
        depends_on_task_id: TaskId,
    ) -> Result<DependencyEdge, DependencyError> {
        if task_id == depends_on_task_id {
            debug!(%task_id, "rejected self-dependency");
            return Err(DependencyError::InvalidEdge(format!(
                "task {task_id} cannot depend on itself"
            )));
        }

        for id in [task_id, depends_on_task_id] {
            if !self.store.contains(id).await? {
                debug!(%task_id, %depends_on_task_id, missing = %id, "rejected dependency on unknown task");
                return Err(DependencyError::task_not_found(id));
            }
        }

        let now = self.clock.now();
        let mut state = self.state.write().await;
        match state.add_edge(task_id, depends_on_task_id, now) {
            Ok(edge) => {
                info!(id = %edge.id, %task_id, %depends_on_task_id, "dependency created");
                Ok(edge)
            }
            Err(e) => {
                debug!(%task_id, %depends_on_task_id, error = %e, "dependency rejected");
                Err(e)
            }
        }
    }

    /// Remove the dependency `task_id -> depends_on_task_id`.
    ///
    /// 存在しない場合は黙って成功せず `EdgeNotFound` を返す（呼び出し側のバグを表に出す）。
    pub async fn remove_edge(
        &self,
        task_id: TaskId,
        depends_on_task_id: TaskId,
    ) -> Result<DependencyEdge, DependencyError> {
        let edge = self
            .state
            .write()
            .await
            .remove_pair(task_id, depends_on_task_id)?;
        info!(id = %edge.id, %task_id, %depends_on_task_id, "dependency removed");
        Ok(edge)
    }

    /// Remove a dependency by its edge id.
    pub async fn remove_edge_by_id(
        &self,
        id: DependencyId,
    ) -> Result<DependencyEdge, DependencyError> {
        let mut state = self.state.write().await;
        let edge = state
            .index
            .remove(id)
            .ok_or_else(|| DependencyError::dependency_not_found(id))?;
        info!(%id, task_id = %edge.task_id, depends_on_task_id = %edge.depends_on_task_id, "dependency removed");
        Ok(edge)
    }

    /// Every edge where `task_id` is either endpoint, in creation order. O(degree).
    pub async fn list_edges_for_task(&self, task_id: TaskId) -> Vec<DependencyEdge> {
        self.state.read().await.index.incident(task_id)
    }

    /// Every edge, in creation order.
    pub async fn list_edges(&self) -> Vec<DependencyEdge> {
        self.state.read().await.index.all()
    }

    /// Cascade delete: purge every edge touching `task_id` and retire the id.
    ///
    /// Task Store の削除フックから呼ばれる唯一の書き込み経路。
    pub async fn purge_task(&self, task_id: TaskId) -> Vec<DependencyEdge> {
        let purged = self.state.write().await.purge(task_id);
        info!(%task_id, purged = purged.len(), "task deleted; incident dependencies purged");
        purged
    }

    pub async fn counts(&self) -> DependencyCounts {
        let state = self.state.read().await;
        DependencyCounts {
            edges: state.index.len(),
            tasks_with_dependencies: state.index.task_count(),
            retired_tasks: state.retired.len(),
        }
    }

    /// 診断用: 全体の循環検出（正常なら常に None）
    pub async fn detect_cycle(&self) -> Option<Vec<TaskId>> {
        self.state.read().await.index.detect_cycle()
    }

    /// 診断用: インデックスの整合性検証
    pub async fn check_consistency(&self) -> Result<(), DependencyError> {
        self.state.read().await.index.check_consistency()
    }
}

#[async_trait]
impl TaskDeletionListener for DependencyGraph {
    async fn on_task_deleted(&self, task_id: TaskId) -> Result<(), DependencyError> {
        self.purge_task(task_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, NewTask, StoreError, Task};
    use crate::impls::InMemoryTaskStore;
    use crate::ports::FixedClock;
    use chrono::TimeZone;

    fn t(n: i64) -> TaskId {
        TaskId::new(n)
    }

    /// Store with tasks 1..=n and a graph listening to its deletions.
    async fn setup(n: usize) -> (Arc<InMemoryTaskStore>, Arc<DependencyGraph>) {
        let store = Arc::new(InMemoryTaskStore::new());
        for i in 1..=n {
            store
                .create_task(NewTask::titled(format!("task {i}")))
                .await
                .unwrap();
        }
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let graph = Arc::new(DependencyGraph::with_clock(
            store.clone(),
            Arc::new(FixedClock::new(at)),
        ));
        store.subscribe_deletions(graph.clone());
        (store, graph)
    }

    #[tokio::test]
    async fn add_edge_returns_assigned_id_and_timestamp() {
        let (_store, graph) = setup(2).await;
        let edge = graph.add_edge(t(1), t(2)).await.unwrap();

        assert_eq!(edge.id, DependencyId::new(1));
        assert_eq!(edge.task_id, t(1));
        assert_eq!(edge.depends_on_task_id, t(2));
        assert_eq!(
            edge.created_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn duplicate_add_is_conflict_and_stores_one_edge() {
        let (_store, graph) = setup(2).await;
        graph.add_edge(t(1), t(2)).await.unwrap();

        let err = graph.add_edge(t(1), t(2)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(graph.list_edges().await.len(), 1);
    }

    #[tokio::test]
    async fn self_dependency_is_invalid_even_for_unknown_task() {
        let (_store, graph) = setup(1).await;

        let err = graph.add_edge(t(1), t(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEdge);
        assert!(err.to_string().contains("cannot depend on itself"));

        let err = graph.add_edge(t(99), t(99)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEdge);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let (_store, graph) = setup(1).await;

        let err = graph.add_edge(t(1), t(5)).await.unwrap_err();
        assert!(matches!(err, DependencyError::NotFound { kind: "task", id: 5 }));

        let err = graph.add_edge(t(5), t(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(graph.list_edges().await.is_empty());
    }

    #[tokio::test]
    async fn closing_edge_is_cycle_but_unrelated_edge_succeeds() {
        // A(1) depends on B(2), B depends on C(3); D(4) is unrelated
        let (_store, graph) = setup(4).await;
        graph.add_edge(t(1), t(2)).await.unwrap();
        graph.add_edge(t(2), t(3)).await.unwrap();

        let err = graph.add_edge(t(3), t(1)).await.unwrap_err();
        match err {
            DependencyError::CycleDetected { path, .. } => {
                assert_eq!(path, vec![t(3), t(1), t(2), t(3)]);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }

        graph.add_edge(t(3), t(4)).await.unwrap();
        assert!(graph.detect_cycle().await.is_none());
    }

    #[tokio::test]
    async fn failed_mutation_leaves_state_untouched() {
        let (_store, graph) = setup(3).await;
        graph.add_edge(t(2), t(1)).await.unwrap();
        graph.add_edge(t(3), t(2)).await.unwrap();
        let before = graph.list_edges().await;

        assert!(graph.add_edge(t(1), t(3)).await.is_err());
        assert!(graph.add_edge(t(2), t(1)).await.is_err());
        assert!(graph.remove_edge(t(1), t(2)).await.is_err());

        assert_eq!(graph.list_edges().await, before);
        graph.check_consistency().await.unwrap();

        // a rejected insert does not burn an id
        let edge = graph.add_edge(t(3), t(1)).await.unwrap();
        assert_eq!(edge.id, DependencyId::new(3));
    }

    #[tokio::test]
    async fn remove_edge_updates_both_directions() {
        let (_store, graph) = setup(2).await;
        graph.add_edge(t(1), t(2)).await.unwrap();

        let removed = graph.remove_edge(t(1), t(2)).await.unwrap();
        assert_eq!(removed.id, DependencyId::new(1));
        assert!(graph.list_edges_for_task(t(1)).await.is_empty());
        assert!(graph.list_edges_for_task(t(2)).await.is_empty());

        let err = graph.remove_edge(t(1), t(2)).await.unwrap_err();
        assert!(matches!(err, DependencyError::EdgeNotFound { .. }));
    }

    #[tokio::test]
    async fn remove_edge_by_id() {
        let (_store, graph) = setup(3).await;
        graph.add_edge(t(1), t(2)).await.unwrap();
        let second = graph.add_edge(t(1), t(3)).await.unwrap();

        graph.remove_edge_by_id(second.id).await.unwrap();
        assert_eq!(graph.list_edges().await.len(), 1);

        let err = graph.remove_edge_by_id(second.id).await.unwrap_err();
        assert_eq!(err.to_string(), "dependency 2 not found");
    }

    #[tokio::test]
    async fn list_edges_for_task_covers_both_endpoints_in_creation_order() {
        let (_store, graph) = setup(4).await;
        graph.add_edge(t(2), t(1)).await.unwrap();
        graph.add_edge(t(3), t(4)).await.unwrap();
        graph.add_edge(t(3), t(2)).await.unwrap();
        graph.add_edge(t(2), t(4)).await.unwrap();

        let ids: Vec<i64> = graph
            .list_edges_for_task(t(2))
            .await
            .iter()
            .map(|e| e.id.get())
            .collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn deleting_task_cascades_to_incident_edges() {
        let (store, graph) = setup(4).await;
        graph.add_edge(t(1), t(2)).await.unwrap();
        graph.add_edge(t(2), t(3)).await.unwrap();
        graph.add_edge(t(4), t(2)).await.unwrap();
        graph.add_edge(t(4), t(3)).await.unwrap();

        store.delete_task(t(2)).await.unwrap();

        for neighbour in [t(1), t(3), t(4)] {
            let edges = graph.list_edges_for_task(neighbour).await;
            assert!(edges.iter().all(|e| !e.touches(t(2))));
        }
        assert_eq!(graph.list_edges().await.len(), 1);
        graph.check_consistency().await.unwrap();

        let counts = graph.counts().await;
        assert_eq!(counts.edges, 1);
        assert_eq!(counts.tasks_with_dependencies, 2);
        assert_eq!(counts.retired_tasks, 1);
    }

    #[tokio::test]
    async fn retired_task_cannot_gain_edges() {
        let (_store, graph) = setup(2).await;
        // deletion observed by the engine while the store still answers for the task
        graph.purge_task(t(2)).await;

        let err = graph.add_edge(t(1), t(2)).await.unwrap_err();
        assert!(matches!(err, DependencyError::NotFound { kind: "task", id: 2 }));
    }

    #[tokio::test]
    async fn retired_set_grows_with_every_deletion() {
        let (store, graph) = setup(3).await;
        graph.add_edge(t(1), t(2)).await.unwrap();

        // 3 has no edges, but is still remembered
        for id in [t(1), t(2), t(3)] {
            store.delete_task(id).await.unwrap();
        }

        let counts = graph.counts().await;
        assert_eq!(counts.edges, 0);
        assert_eq!(counts.tasks_with_dependencies, 0);
        assert_eq!(counts.retired_tasks, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_opposite_edges_never_both_commit() {
        for _ in 0..32 {
            let (_store, graph) = setup(2).await;
            let (a, b) = tokio::join!(
                {
                    let graph = graph.clone();
                    tokio::spawn(async move { graph.add_edge(t(1), t(2)).await })
                },
                {
                    let graph = graph.clone();
                    tokio::spawn(async move { graph.add_edge(t(2), t(1)).await })
                },
            );
            let results = [a.unwrap(), b.unwrap()];
            let committed = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(committed, 1);
            assert!(graph.detect_cycle().await.is_none());
        }
    }

    mod properties {
        use super::super::GraphState;
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(i64, i64),
            Remove(i64, i64),
            Purge(i64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                6 => (1..=6i64, 1..=6i64).prop_map(|(a, b)| Op::Add(a, b)),
                2 => (1..=6i64, 1..=6i64).prop_map(|(a, b)| Op::Remove(a, b)),
                1 => (1..=6i64).prop_map(Op::Purge),
            ]
        }

        proptest! {
            #[test]
            fn mutations_preserve_invariants(ops in prop::collection::vec(op(), 1..60)) {
                let mut state = GraphState::new();
                for op in ops {
                    let before = state.index.all();
                    let result = match op {
                        Op::Add(a, b) if a == b => continue,
                        Op::Add(a, b) => state.add_edge(t(a), t(b), Utc::now()).map(|_| ()),
                        Op::Remove(a, b) => state.remove_pair(t(a), t(b)).map(|_| ()),
                        Op::Purge(a) => {
                            state.purge(t(a));
                            Ok(())
                        }
                    };
                    if result.is_err() {
                        prop_assert_eq!(state.index.all(), before);
                    }
                    prop_assert!(state.index.check_consistency().is_ok());
                    prop_assert!(state.index.detect_cycle().is_none());
                }
            }
        }
    }

    struct UnavailableStore;

    #[async_trait]
    impl TaskStore for UnavailableStore {
        async fn get_task(&self, _id: TaskId) -> Result<Option<Task>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn subscribe_deletions(&self, _listener: Arc<dyn TaskDeletionListener>) {}
    }

    #[tokio::test]
    async fn store_failure_propagates_unmodified() {
        let graph = DependencyGraph::new(Arc::new(UnavailableStore));
        let err = graph.add_edge(t(1), t(2)).await.unwrap_err();

        assert!(matches!(
            err,
            DependencyError::Store(StoreError::Unavailable(_))
        ));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
