use serde::{Deserialize, Serialize};

/// Graph Engine の規模（/status で返す）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCounts {
    pub edges: usize,
    pub tasks_with_dependencies: usize,
    pub retired_tasks: usize,
}
