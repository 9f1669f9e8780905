//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 依存サブシステムの外側にあるもの（Task Store、時刻）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - Task Store がタスク属性の正本（source of truth）
//! - エッジの正本は Graph Engine（`graph` モジュール）

pub mod clock;
pub mod task_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::task_store::{TaskDeletionListener, TaskStore};
