//! 原始值到展示字符串的转换表。
//!
//! # 设计背景（Why）
//! - 调用点常以整数枚举（位置、档位、状态码）作为参数，后端却需要可读标签；
//!   转换表把“原始值 → 展示字符串”的映射集中声明，避免在每个调用点手写 `match`。
//!
//! # 契约说明（What）
//! - [`TransformRegistry`] 在装配阶段构造，运行期只读，可被多个线程共享；
//! - 查询失败返回 [`TrackError`]，是否回退到默认值由 [`AttributeCollector`](crate::AttributeCollector) 决定。

use std::collections::{BTreeMap, HashMap};

use crate::error::TrackError;

/// 单张转换表。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransformTable {
    entries: BTreeMap<i64, String>,
}

impl TransformTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明一条映射，返回被覆盖的旧值。
    pub fn insert(&mut self, raw: i64, display: impl Into<String>) -> Option<String> {
        self.entries.insert(raw, display.into())
    }

    /// 链式声明映射，便于在装配代码中内联构造。
    pub fn with(mut self, raw: i64, display: impl Into<String>) -> Self {
        self.insert(raw, display);
        self
    }

    pub fn lookup(&self, raw: i64) -> Option<&str> {
        self.entries.get(&raw).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for TransformTable {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(raw, display)| (raw, display.into()))
                .collect(),
        }
    }
}

/// 以表名索引的转换表集合。
///
/// # 教案式说明
/// - **意图 (Why)**：调用点只携带表名与原始值，查表逻辑与表的来源（代码声明或配置文件）解耦；
/// - **契约 (What)**：`declare` 同名覆盖；`lookup` 区分“表不存在”与“表中无此值”两类失败，
///   以便日志能指出是装配遗漏还是数据越界。
#[derive(Clone, Debug, Default)]
pub struct TransformRegistry {
    tables: HashMap<String, TransformTable>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明或替换一张转换表，返回旧表。
    pub fn declare(
        &mut self,
        table_id: impl Into<String>,
        table: TransformTable,
    ) -> Option<TransformTable> {
        self.tables.insert(table_id.into(), table)
    }

    pub fn table(&self, table_id: &str) -> Option<&TransformTable> {
        self.tables.get(table_id)
    }

    pub fn contains(&self, table_id: &str) -> bool {
        self.tables.contains_key(table_id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// 在指定表中查找原始值对应的展示字符串。
    pub fn lookup(&self, table_id: &str, raw: i64) -> Result<&str, TrackError> {
        let table = self
            .tables
            .get(table_id)
            .ok_or_else(|| TrackError::UnknownTransformTable {
                table: table_id.to_owned(),
            })?;
        table.lookup(raw).ok_or_else(|| TrackError::TransformLookup {
            table: table_id.to_owned(),
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions() -> TransformRegistry {
        let mut registry = TransformRegistry::new();
        registry.declare("position", TransformTable::new().with(0, "First").with(1, "Second"));
        registry
    }

    #[test]
    fn lookup_hits_declared_value() {
        assert_eq!(positions().lookup("position", 1), Ok("Second"));
    }

    #[test]
    fn lookup_distinguishes_missing_value_and_missing_table() {
        let registry = positions();
        assert_eq!(
            registry.lookup("position", 9),
            Err(TrackError::TransformLookup {
                table: "position".to_owned(),
                raw: 9
            })
        );
        assert_eq!(
            registry.lookup("tier", 0),
            Err(TrackError::UnknownTransformTable {
                table: "tier".to_owned()
            })
        );
    }
}
