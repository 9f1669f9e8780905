use serde::{Deserialize, Serialize};

use super::Task;

/// 1 タスク分の依存ビュー（プレゼンテーション層向け）
///
/// - `depends_on`: このタスクが依存しているタスク（エッジ作成順）
/// - `dependents`: このタスクに依存しているタスク（エッジ作成順）
/// - `available_candidates`: 「依存を追加」の候補。あくまで参考情報で、
///   最終判定は Graph Engine が行う
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyView {
    pub depends_on: Vec<Task>,
    pub dependents: Vec<Task>,
    pub available_candidates: Vec<Task>,
}
