//! App - アプリケーション層
//!
//! このモジュールは、ports と Graph Engine を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **DependencyService**: プレゼンテーション層向けの入口
//! - **view**: Dependency View Builder

pub mod builder;
pub mod service;
pub mod view;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::service::DependencyService;
pub use self::view::build_view;
