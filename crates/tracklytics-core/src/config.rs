//! TOML 配置：开关、转换表与初始超级属性。
//!
//! # 设计背景（Why）
//! - 转换表往往由产品/数据团队维护，放进配置文件可以在不改代码的情况下调整展示标签；
//! - 初始超级属性（应用版本、渠道）在启动时一次性播种。
//!
//! # 配置样例
//! ```toml
//! enabled = true
//!
//! [transforms.position]
//! 0 = "First"
//! 1 = "Second"
//!
//! [super_attributes]
//! AppVersion = "4.2.0"
//! ```
//!
//! # 契约说明（What）
//! - 所有字段均可省略，缺省时 `enabled = true`、无转换表、无初始超级属性；
//! - 转换表的键必须是可解析为 `i64` 的字符串，否则返回 [`ConfigError::InvalidRawValue`]；
//! - 未知字段会被拒绝，避免拼写错误被静默忽略。

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    attributes::AttributeMap,
    transform::{TransformRegistry, TransformTable},
};

/// 配置解析错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tracklytics config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("transform table `{table}` has non-integer raw value `{raw}`")]
    InvalidRawValue { table: String, raw: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "tracklytics.config.io",
            ConfigError::Parse(_) => "tracklytics.config.parse",
            ConfigError::InvalidRawValue { .. } => "tracklytics.config.invalid_raw",
        }
    }
}

/// 引擎配置。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TracklyticsConfig {
    /// 分发器初始开关。
    pub enabled: bool,
    /// 表名 → (原始值字符串 → 展示字符串)。
    pub transforms: BTreeMap<String, BTreeMap<String, String>>,
    /// 启动时写入超级属性存储的条目。
    pub super_attributes: BTreeMap<String, String>,
}

impl Default for TracklyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            transforms: BTreeMap::new(),
            super_attributes: BTreeMap::new(),
        }
    }
}

impl TracklyticsConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// 将配置中的转换表构造成 [`TransformRegistry`]。
    pub fn transform_registry(&self) -> Result<TransformRegistry, ConfigError> {
        let mut registry = TransformRegistry::new();
        for (table_id, entries) in &self.transforms {
            let mut table = TransformTable::new();
            for (raw, display) in entries {
                let parsed = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ConfigError::InvalidRawValue {
                        table: table_id.clone(),
                        raw: raw.clone(),
                    })?;
                table.insert(parsed, display.as_str());
            }
            registry.declare(table_id.as_str(), table);
        }
        Ok(registry)
    }

    /// 配置中的初始超级属性，按键名排序。
    pub fn super_attribute_entries(&self) -> AttributeMap {
        self.super_attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
enabled = false

[transforms.position]
0 = "First"
1 = "Second"

[super_attributes]
AppVersion = "4.2.0"
"#;

    #[test]
    fn parses_full_sample() {
        let config = TracklyticsConfig::from_toml_str(SAMPLE).expect("样例配置应可解析");
        assert!(!config.enabled);

        let registry = config.transform_registry().expect("转换表合法");
        assert_eq!(registry.lookup("position", 1), Ok("Second"));
        assert_eq!(config.super_attribute_entries().get("AppVersion"), Some("4.2.0"));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = TracklyticsConfig::from_toml_str("").expect("空配置应可解析");
        assert_eq!(config, TracklyticsConfig::default());
        assert!(config.enabled);
    }

    #[test]
    fn non_integer_raw_value_is_rejected() {
        let config = TracklyticsConfig::from_toml_str("[transforms.tier]\nfree = \"Free\"\n")
            .expect("语法合法");
        let error = config.transform_registry().expect_err("键不是整数");
        assert_eq!(error.code(), "tracklytics.config.invalid_raw");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let error =
            TracklyticsConfig::from_toml_str("enable = true\n").expect_err("拼写错误应被拒绝");
        assert_eq!(error.code(), "tracklytics.config.parse");
    }

    #[test]
    fn missing_file_reports_path() {
        let error = TracklyticsConfig::from_path("/nonexistent/tracklytics.toml")
            .expect_err("文件不存在");
        assert!(error.to_string().contains("/nonexistent/tracklytics.toml"));
    }
}
