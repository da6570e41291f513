//! apim-config - 配置加载库

use std::collections::HashMap;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 分析引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// 索引前缀
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,
    /// entrypoint 字段是否使用 `.keyword` 映射
    #[serde(default)]
    pub entrypoint_keyword: bool,
    /// 分组聚合的桶数量上限
    #[serde(default = "default_group_by_size")]
    pub group_by_size: u32,
    /// 追加或覆盖的指标字段 -> doc-type 映射
    #[serde(default)]
    pub metric_doc_types: HashMap<String, String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            index_prefix: default_index_prefix(),
            entrypoint_keyword: false,
            group_by_size: default_group_by_size(),
            metric_doc_types: HashMap::new(),
        }
    }
}

fn default_index_prefix() -> String {
    "gravitee".to_string()
}

fn default_group_by_size() -> u32 {
    1000
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 合并顺序：`default.toml` -> `{APP_ENV}.toml` -> `APIM_` 前缀环境变量，
    /// 嵌套字段以 `__` 分隔（例如 `APIM_ANALYTICS__INDEX_PREFIX`）。
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("APIM_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.analytics.index_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "analytics.index_prefix must not be blank".to_string(),
            ));
        }
        if self.analytics.group_by_size == 0 {
            return Err(ConfigError::Invalid(
                "analytics.group_by_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
