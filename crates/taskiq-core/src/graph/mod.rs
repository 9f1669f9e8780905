//! Graph module: the dependency index and the engine that guards it.

mod engine;
mod index;

pub use engine::DependencyGraph;
pub use index::DependencyIndex;
