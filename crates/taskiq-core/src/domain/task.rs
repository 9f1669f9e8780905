//! Task - Task Store が所有するタスクの属性
//!
//! 依存サブシステムから見ると Task は外部の協調者が持つデータで、
//! ここで必要なのは「存在するか」と「表示用の属性」だけです。
//! フィールド間の不変条件はなく、範囲チェックのみ行います。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TaskId;

/// Task の状態
///
/// `Unknown` は View Builder が削除済みタスクの代わりに出すプレースホルダ専用で、
/// Task Store はこの状態のタスクを受け付けません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
    Unknown,
}

/// T-shirt size estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TShirtSize {
    XS,
    S,
    M,
    L,
    XL,
}

/// Task Store が保持するタスク
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    /// 見積もり時間（hours）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tshirt_size: Option<TShirtSize>,
    /// 1..=100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<u8>,
}

impl Task {
    /// 削除済み（または未知の）タスクの代わりに表示するプレースホルダ
    pub fn placeholder(id: TaskId) -> Self {
        Self {
            id,
            title: format!("Task {id}"),
            description: None,
            deadline: None,
            status: TaskStatus::Unknown,
            estimated_duration: None,
            tshirt_size: None,
            priority_score: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.status == TaskStatus::Unknown
    }
}

/// タスク作成リクエスト（ID は Task Store が払い出す）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub estimated_duration: Option<f64>,
    #[serde(default)]
    pub tshirt_size: Option<TShirtSize>,
    #[serde(default)]
    pub priority_score: Option<u8>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// 範囲チェック。違反内容をメッセージで返す。
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.status == TaskStatus::Unknown {
            return Err("status 'unknown' is reserved for placeholders".to_string());
        }
        if let Some(hours) = self.estimated_duration
            && !(hours.is_finite() && hours > 0.0)
        {
            return Err(format!("estimated_duration must be positive, got {hours}"));
        }
        if let Some(score) = self.priority_score
            && !(1..=100).contains(&score)
        {
            return Err(format!("priority_score must be within 1..=100, got {score}"));
        }
        Ok(())
    }

    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            status: self.status,
            estimated_duration: self.estimated_duration,
            tshirt_size: self.tshirt_size,
            priority_score: self.priority_score,
        }
    }
}
