//! Dependency index: edge set + bidirectional adjacency.
//!
//! Design:
//! - `edges`: DependencyId -> edge（正本。BTreeMap なので id 順 = 作成順）
//! - `forward`: task -> 自分が task_id 側のエッジ（依存している先）
//! - `reverse`: task -> 自分が depends_on_task_id 側のエッジ（依存されている元）
//! - `pairs`: (task_id, depends_on_task_id) -> DependencyId（重複検出を O(1) に）
//! - Invariant: edges / forward / reverse / pairs は常に同期している
//!
//! この型はロックを持たない素のデータ構造です。排他制御は `DependencyGraph` が行います。

use std::collections::btree_map::Entry as BTreeEntry;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::domain::{DependencyEdge, DependencyError, DependencyId, TaskId};

type Adjacency = HashMap<TaskId, BTreeSet<DependencyId>>;

#[derive(Debug, Default, Clone)]
pub struct DependencyIndex {
    edges: BTreeMap<DependencyId, DependencyEdge>,
    pairs: HashMap<(TaskId, TaskId), DependencyId>,
    forward: Adjacency,
    reverse: Adjacency,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 少なくとも 1 本のエッジに接しているタスクの数
    pub fn task_count(&self) -> usize {
        self.forward
            .keys()
            .chain(self.reverse.keys())
            .collect::<HashSet<_>>()
            .len()
    }

    /// (task_id, depends_on_task_id) のエッジを探す
    pub fn find(&self, task_id: TaskId, depends_on_task_id: TaskId) -> Option<&DependencyEdge> {
        self.pairs
            .get(&(task_id, depends_on_task_id))
            .and_then(|id| self.edges.get(id))
    }

    /// Insert an edge, updating both adjacency indices.
    ///
    /// 呼び出し側で自己依存・重複・循環のチェックを済ませていること。
    /// id かペアが既に存在する場合は何も変更せず `Corrupted` を返す。
    pub fn insert(&mut self, edge: DependencyEdge) -> Result<(), DependencyError> {
        let pair = (edge.task_id, edge.depends_on_task_id);
        if self.edges.contains_key(&edge.id) || self.pairs.contains_key(&pair) {
            return Err(DependencyError::Corrupted(format!(
                "edge {} ({} -> {}) collides with an existing entry",
                edge.id, edge.task_id, edge.depends_on_task_id
            )));
        }
        self.pairs.insert(pair, edge.id);
        self.forward.entry(edge.task_id).or_default().insert(edge.id);
        self.reverse
            .entry(edge.depends_on_task_id)
            .or_default()
            .insert(edge.id);
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    /// Remove an edge by id. Both indices are pruned so empty sets never linger.
    pub fn remove(&mut self, id: DependencyId) -> Option<DependencyEdge> {
        let edge = match self.edges.entry(id) {
            BTreeEntry::Occupied(e) => e.remove(),
            BTreeEntry::Vacant(_) => return None,
        };
        self.pairs.remove(&(edge.task_id, edge.depends_on_task_id));
        detach(&mut self.forward, edge.task_id, id);
        detach(&mut self.reverse, edge.depends_on_task_id, id);
        Some(edge)
    }

    /// Remove every edge touching `task`. Returned edges are in creation order.
    pub fn remove_incident(&mut self, task: TaskId) -> Vec<DependencyEdge> {
        self.incident_ids(task)
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    /// `task` が両端のどちらかに現れるエッジの id（作成順）
    ///
    /// 隣接インデックスだけを見るので O(degree)。
    pub fn incident_ids(&self, task: TaskId) -> Vec<DependencyId> {
        let outgoing = self.forward.get(&task);
        let incoming = self.reverse.get(&task);
        // 自己依存は存在しないので 2 つの集合は交わらない
        let mut ids: Vec<DependencyId> = outgoing
            .into_iter()
            .chain(incoming)
            .flat_map(|set| set.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// `task` に接するエッジ（作成順）
    pub fn incident(&self, task: TaskId) -> Vec<DependencyEdge> {
        self.incident_ids(task)
            .into_iter()
            .filter_map(|id| self.edges.get(&id).cloned())
            .collect()
    }

    /// 全エッジ（作成順）
    pub fn all(&self) -> Vec<DependencyEdge> {
        self.edges.values().cloned().collect()
    }

    /// `task` が直接依存しているタスク
    pub fn dependencies_of(&self, task: TaskId) -> Vec<TaskId> {
        self.forward
            .get(&task)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.edges.get(id))
                    .map(|edge| edge.depends_on_task_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Reachability: `from` から depends_on 方向にエッジを辿って `to` に届くか。
    ///
    /// 届く場合はその経路（`from` で始まり `to` で終わる）を返す。BFS なので O(V + E)。
    pub fn path(&self, from: TaskId, to: TaskId) -> Option<Vec<TaskId>> {
        let mut prev: HashMap<TaskId, TaskId> = HashMap::new();
        let mut visited: HashSet<TaskId> = HashSet::from([from]);
        let mut queue: VecDeque<TaskId> = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            if node == to {
                return Some(follow_path(from, to, &prev));
            }
            for next in self.dependencies_of(node) {
                if visited.insert(next) {
                    prev.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Whole-graph cycle detection (three-colour DFS over the forward index).
    ///
    /// `add_edge` が挿入前に到達可能性を確認しているので、通常は常に `None`。
    /// インデックスの診断とテストでの不変条件確認に使う。
    pub fn detect_cycle(&self) -> Option<Vec<TaskId>> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            Gray,
            Black,
        }

        struct Frame {
            node: TaskId,
            successors: Vec<TaskId>,
            next: usize,
        }

        let mut color: HashMap<TaskId, Color> = HashMap::new();
        let mut starts: Vec<TaskId> = self.forward.keys().copied().collect();
        starts.sort_unstable();

        for start in starts {
            if color.contains_key(&start) {
                continue;
            }
            color.insert(start, Color::Gray);
            let mut stack = vec![Frame {
                node: start,
                successors: self.dependencies_of(start),
                next: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                if frame.next == frame.successors.len() {
                    color.insert(frame.node, Color::Black);
                    stack.pop();
                    continue;
                }
                let next = frame.successors[frame.next];
                frame.next += 1;

                match color.get(&next).copied() {
                    // Gray のノードはちょうど現在のスタック上にある
                    Some(Color::Gray) => {
                        let begin = stack.iter().position(|f| f.node == next).unwrap_or(0);
                        let mut cycle: Vec<TaskId> =
                            stack[begin..].iter().map(|f| f.node).collect();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    Some(Color::Black) => {}
                    None => {
                        color.insert(next, Color::Gray);
                        stack.push(Frame {
                            node: next,
                            successors: self.dependencies_of(next),
                            next: 0,
                        });
                    }
                }
            }
        }
        None
    }

    /// 4 つの構造が互いに一致しているかを検証する
    pub fn check_consistency(&self) -> Result<(), DependencyError> {
        let corrupted = |msg: String| Err(DependencyError::Corrupted(msg));

        if self.pairs.len() != self.edges.len() {
            return corrupted(format!(
                "{} pairs indexed for {} edges",
                self.pairs.len(),
                self.edges.len()
            ));
        }
        for (id, edge) in &self.edges {
            if *id != edge.id {
                return corrupted(format!("edge stored under {id} has id {}", edge.id));
            }
            if edge.task_id == edge.depends_on_task_id {
                return corrupted(format!("edge {id} is a self-dependency"));
            }
            if self.pairs.get(&(edge.task_id, edge.depends_on_task_id)) != Some(id) {
                return corrupted(format!("edge {id} missing from pair index"));
            }
            let in_forward = self
                .forward
                .get(&edge.task_id)
                .is_some_and(|set| set.contains(id));
            let in_reverse = self
                .reverse
                .get(&edge.depends_on_task_id)
                .is_some_and(|set| set.contains(id));
            if !in_forward || !in_reverse {
                return corrupted(format!("edge {id} missing from adjacency index"));
            }
        }
        let forward_total: usize = self.forward.values().map(BTreeSet::len).sum();
        let reverse_total: usize = self.reverse.values().map(BTreeSet::len).sum();
        if forward_total != self.edges.len() || reverse_total != self.edges.len() {
            return corrupted("adjacency index holds stale edge ids".to_string());
        }
        if self.forward.values().chain(self.reverse.values()).any(BTreeSet::is_empty) {
            return corrupted("adjacency index holds an empty set".to_string());
        }
        Ok(())
    }
}

fn detach(adjacency: &mut Adjacency, task: TaskId, id: DependencyId) {
    if let Entry::Occupied(mut e) = adjacency.entry(task) {
        e.get_mut().remove(&id);
        if e.get().is_empty() {
            e.remove_entry();
        }
    }
}

fn follow_path(from: TaskId, to: TaskId, prev: &HashMap<TaskId, TaskId>) -> Vec<TaskId> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        match prev.get(&current) {
            Some(&p) => {
                path.push(p);
                current = p;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn t(n: i64) -> TaskId {
        TaskId::new(n)
    }

    /// ids are assigned in call order, like the engine does
    fn index_with(edges: &[(i64, i64)]) -> DependencyIndex {
        let mut index = DependencyIndex::new();
        for (i, (task, depends_on)) in edges.iter().enumerate() {
            index
                .insert(DependencyEdge {
                    id: DependencyId::new(i as i64 + 1),
                    task_id: t(*task),
                    depends_on_task_id: t(*depends_on),
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        index
    }

    #[test]
    fn new_index_is_empty() {
        let index = DependencyIndex::new();
        assert!(index.is_empty());
        assert!(index.incident(t(1)).is_empty());
        assert_eq!(index.task_count(), 0);
    }

    #[test]
    fn insert_creates_forward_and_reverse_entries() {
        let index = index_with(&[(2, 1)]); // 2 depends on 1

        assert_eq!(index.dependencies_of(t(2)), vec![t(1)]);
        assert!(index.dependencies_of(t(1)).is_empty());
        assert_eq!(index.incident(t(1))[0].task_id, t(2));
        assert_eq!(index.task_count(), 2);
        index.check_consistency().unwrap();
    }

    #[test]
    fn insert_rejects_duplicate_pair_without_changes() {
        let mut index = index_with(&[(2, 1)]);
        let before = index.all();

        let err = index
            .insert(DependencyEdge {
                id: DependencyId::new(99),
                task_id: t(2),
                depends_on_task_id: t(1),
                created_at: Utc::now(),
            })
            .unwrap_err();

        assert!(matches!(err, DependencyError::Corrupted(_)));
        assert_eq!(index.all(), before);
        index.check_consistency().unwrap();
    }

    #[test]
    fn remove_prunes_both_indices() {
        let mut index = index_with(&[(2, 1)]);
        let removed = index.remove(DependencyId::new(1)).unwrap();

        assert_eq!(removed.task_id, t(2));
        assert!(index.is_empty());
        assert!(index.find(t(2), t(1)).is_none());
        assert_eq!(index.task_count(), 0);
        index.check_consistency().unwrap();
        assert!(index.remove(DependencyId::new(1)).is_none());
    }

    #[test]
    fn incident_is_in_creation_order_across_directions() {
        // 2 is the dependent in edge 1 and 3, the dependency in edge 2
        let index = index_with(&[(2, 1), (3, 2), (2, 4)]);
        let ids: Vec<i64> = index.incident(t(2)).iter().map(|e| e.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn remove_incident_purges_every_edge_touching_task() {
        let mut index = index_with(&[(2, 1), (3, 2), (4, 1), (2, 5)]);
        let purged = index.remove_incident(t(2));

        assert_eq!(purged.len(), 3);
        assert!(purged.iter().all(|e| e.touches(t(2))));
        assert_eq!(index.len(), 1);
        assert!(index.incident(t(1)).iter().all(|e| !e.touches(t(2))));
        assert!(index.incident(t(3)).is_empty());
        index.check_consistency().unwrap();
    }

    #[test]
    fn path_follows_depends_on_direction() {
        // 1 -> 2 -> 3 (1 depends on 2, 2 depends on 3)
        let index = index_with(&[(1, 2), (2, 3)]);

        assert_eq!(index.path(t(1), t(3)), Some(vec![t(1), t(2), t(3)]));
        assert_eq!(index.path(t(3), t(1)), None);
        assert_eq!(index.path(t(2), t(2)), Some(vec![t(2)]));
    }

    #[test]
    fn detect_no_cycle_in_dag() {
        let index = index_with(&[(2, 1), (3, 2)]);
        assert!(index.detect_cycle().is_none());
    }

    #[test]
    fn dag_with_diamond_should_not_detect_cycle() {
        // Diamond: A -> B -> C, A -> C (NOT a cycle!)
        let index = index_with(&[(2, 1), (3, 2), (3, 1)]);
        assert!(index.detect_cycle().is_none());
    }

    #[test]
    fn complex_dag_with_multiple_paths() {
        //     A
        //    / \
        //   B   C
        //   |\ /|
        //   | X |
        //   |/ \|
        //   D   E
        let index = index_with(&[(2, 1), (3, 1), (4, 2), (5, 2), (4, 3), (5, 3)]);
        assert!(index.detect_cycle().is_none());
    }

    #[test]
    fn detect_longer_cycle() {
        // index itself does not validate, so a cycle can be forced in directly
        let index = index_with(&[(2, 1), (3, 2), (4, 3), (2, 4)]);
        let cycle = index.detect_cycle().expect("cycle should be found");

        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4); // 2 -> 4 -> 3 -> 2
        for pair in cycle.windows(2) {
            assert!(index.find(pair[0], pair[1]).is_some());
        }
    }

    #[test]
    fn consistency_check_catches_stale_index() {
        let mut index = index_with(&[(2, 1)]);
        index.forward.entry(t(7)).or_default().insert(DependencyId::new(42));
        assert!(matches!(
            index.check_consistency(),
            Err(DependencyError::Corrupted(_))
        ));
    }
}
