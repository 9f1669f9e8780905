//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: 開発用・テスト用の Task Store

pub mod inmem_task_store;

// 主要な型を再エクスポート
pub use self::inmem_task_store::InMemoryTaskStore;
