//! Domain model (IDs, tasks, dependency edges, errors, views).

pub mod dependency;
pub mod errors;
pub mod ids;
pub mod task;
pub mod view;

pub use dependency::{DependencyEdge, NewDependency};
pub use errors::{DependencyError, ErrorKind, StoreError};
pub use ids::{DependencyId, TaskId};
pub use task::{NewTask, TShirtSize, Task, TaskStatus};
pub use view::DependencyView;
