//! Domain identifiers (strongly-typed IDs).
//!
//! # 整数 ID + Phantom type パターン
//! Task の ID は Task Store が払い出す整数、依存エッジの ID は Graph Engine が
//! 払い出す整数です。どちらも JSON では素の整数として送受信します。
//!
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時の型安全性を提供します。
//! TaskId と DependencyId を取り違えるとコンパイルエラーになります。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// エラーメッセージで使う名前（例: "task", "dependency"）
    fn kind() -> &'static str;
}

/// ジェネリック ID 型
///
/// # 例
/// ```ignore
/// let task_id = TaskId::new(1);
/// let dep_id = DependencyId::new(1);
/// // task_id と dep_id は異なる型なので、混同できない
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    value: i64,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub const fn new(value: i64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// 内部の整数値を取得
    pub const fn get(self) -> i64 {
        self.value
    }

    /// 次の ID（採番用）
    pub(crate) const fn next(self) -> Self {
        Self::new(self.value + 1)
    }
}

impl<T: IdMarker> From<i64> for Id<T> {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// derive だと { "value": 1 } になってしまうので、素の整数として手書きする
impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.value)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::new)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn kind() -> &'static str {
        "task"
    }
}

/// Dependency edge のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dependency {}

impl IdMarker for Dependency {
    fn kind() -> &'static str {
        "dependency"
    }
}

/// Identifier of a Task (assigned by the task store).
pub type TaskId = Id<Task>;

/// Identifier of a dependency edge (assigned by the graph engine).
pub type DependencyId = Id<Dependency>;
