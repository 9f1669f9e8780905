//! taskiq-core
//!
//! Core building blocks for the TaskIQ task dependency subsystem.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, dependency, errors, view）
//! - **ports**: 抽象化レイヤー（TaskStore, TaskDeletionListener, Clock）
//! - **graph**: Dependency Graph Engine（エッジ集合 + 双方向インデックス + 不変条件）
//! - **app**: アプリケーション層（AppBuilder, DependencyService, View Builder）
//! - **impls**: 実装（InMemoryTaskStore など開発用）
//! - **observability**: 規模の集計

pub mod app;
pub mod domain;
pub mod graph;
pub mod impls;
pub mod observability;
pub mod ports;
