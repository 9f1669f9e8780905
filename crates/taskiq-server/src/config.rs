//! Configuration for the TaskIQ dependency server.
//!
//! 環境変数から読み込みます：
//! - `TASKIQ_HOST` - 任意。待ち受けアドレス。既定は `0.0.0.0`
//! - `BACKEND_PORT` - 任意。待ち受けポート。既定は `8000`
//! - `FRONT_END_URL` - 任意。CORS で許可するフロントエンドのオリジン
//!
//! 設定は `serve` に明示的に渡す。グローバル状態には置かない。

use thiserror::Error;

/// CORS で常に許可するローカル開発用オリジン
pub const LOCAL_FRONTEND_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// 設定されていればそのオリジンと localhost:3000 を許可する
    pub frontend_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            frontend_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `BACKEND_PORT` is not a valid port.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の lookup から読み込む（テストでプロセス環境を汚さないため）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("TASKIQ_HOST").unwrap_or(defaults.host);

        let port = match lookup("BACKEND_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| {
                ConfigError::InvalidValue(
                    "BACKEND_PORT".to_string(),
                    format!("'{raw}' (must be an integer): {e}"),
                )
            })?,
            None => defaults.port,
        };

        let frontend_url = lookup("FRONT_END_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            host,
            port,
            frontend_url,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// CORS で許可するオリジンの一覧
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = Vec::new();
        if let Some(url) = &self.frontend_url {
            origins.push(url.clone());
        }
        if self.frontend_url.as_deref() != Some(LOCAL_FRONTEND_ORIGIN) {
            origins.push(LOCAL_FRONTEND_ORIGIN.to_string());
        }
        origins
    }
}
