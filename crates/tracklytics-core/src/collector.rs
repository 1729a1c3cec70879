//! # AttributeCollector：单次事件的属性装配
//!
//! ## 核心意图（Why）
//! - 一次事件的属性最多来自六类来源，它们之间存在固定的覆盖关系：
//!   类型级固定 < 方法级固定 < 实参 < 返回值 < 可追踪对象 < 转换值；
//! - 装配同时承担超级属性的写入副作用，以及为后端准备超级属性快照。
//!
//! ## 执行逻辑（How）
//! 1. 按 [`AttributeSource::precedence`] 稳定排序来源，同优先级保持传入顺序；
//! 2. 逐个解析为零到多个键值，后写覆盖先写；缺值时回退默认值，两者皆缺则跳过该键；
//! 3. 所有来源解析成功后，再把 `is_super` 来源的键值整批写入超级属性存储；
//! 4. 读取超级属性存储的完整快照，与属性映射一并返回。
//!
//! ## 行为契约（What）
//! - 转换查表失败且无默认值时返回 [`TrackError`]，此时超级属性存储保持不变，也不会产生任何分发；
//! - 超级属性快照单独返回，绝不并入事件属性。
//!
//! ## 风险提示（Trade-offs）
//! - 第 3 步的“先解析、后写入”使失败的事件不会留下半截副作用，代价是多一次临时向量分配。

use std::sync::Arc;

use crate::{
    attributes::AttributeMap,
    error::TrackError,
    occurrence::{AttributeSource, EventOccurrence},
    super_attrs::SuperAttributeStore,
    trackable::TrackableResolver,
    transform::TransformRegistry,
};

/// 装配完成的事件属性。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedEvent {
    /// 合并后的事件属性。
    pub attributes: AttributeMap,
    /// 装配结束时超级属性存储的完整快照。
    pub super_attributes: AttributeMap,
}

/// 属性装配器。
///
/// # 教案式说明
/// - **意图 (Why)**：把装配规则集中在一处，分发器与测试都通过同一入口得到一致结果；
/// - **契约 (What)**：只读共享转换表，读写共享超级属性存储；自身无可变状态，可跨线程并发调用。
#[derive(Clone, Debug)]
pub struct AttributeCollector {
    transforms: Arc<TransformRegistry>,
    super_attributes: Arc<SuperAttributeStore>,
}

impl AttributeCollector {
    pub fn new(
        transforms: Arc<TransformRegistry>,
        super_attributes: Arc<SuperAttributeStore>,
    ) -> Self {
        Self {
            transforms,
            super_attributes,
        }
    }

    pub fn transforms(&self) -> &Arc<TransformRegistry> {
        &self.transforms
    }

    pub fn super_attributes(&self) -> &Arc<SuperAttributeStore> {
        &self.super_attributes
    }

    /// 解析一次事件的全部属性来源。
    ///
    /// # 教案式说明
    /// - **输入**：`occurrence` 仅被借用，调用方可在失败后记录其内容；
    /// - **输出**：成功时返回属性映射与超级属性快照；
    /// - **后置条件**：成功返回时，所有 `is_super` 来源的键值已对之后的任何读取可见。
    pub fn resolve(&self, occurrence: &EventOccurrence) -> Result<ResolvedEvent, TrackError> {
        let mut ordered: Vec<&AttributeSource> = occurrence.sources().iter().collect();
        ordered.sort_by_key(|source| source.precedence());

        let mut attributes = AttributeMap::with_capacity(ordered.len());
        let mut super_writes: Vec<(String, String)> = Vec::new();

        for source in ordered {
            let pairs = self.resolve_source(source)?;
            if source.is_super() {
                super_writes.extend(
                    pairs
                        .iter()
                        .map(|(key, value)| (key.to_owned(), value.to_owned())),
                );
            }
            attributes.extend(pairs);
        }

        self.super_attributes.set_many(super_writes);

        Ok(ResolvedEvent {
            attributes,
            super_attributes: self.super_attributes.get_all(),
        })
    }

    fn resolve_source(&self, source: &AttributeSource) -> Result<AttributeMap, TrackError> {
        let mut pairs = AttributeMap::new();
        match source {
            AttributeSource::Parameter {
                key,
                value,
                default,
                ..
            }
            | AttributeSource::Return {
                key,
                value,
                default,
                ..
            } => {
                if let Some(value) = value.as_ref().or(default.as_ref()) {
                    pairs.insert(key.as_str(), value.as_str());
                }
            }
            AttributeSource::Fixed { key, value, .. } => {
                pairs.insert(key.as_str(), value.as_str());
            }
            AttributeSource::Trackable { value, .. } => {
                pairs = TrackableResolver::resolve(value.as_deref());
            }
            AttributeSource::Transformed {
                key,
                raw,
                table,
                default,
                ..
            } => {
                if let Some(value) = self.transform(table, *raw, default.as_deref())? {
                    pairs.insert(key.as_str(), value);
                }
            }
        }
        Ok(pairs)
    }

    fn transform(
        &self,
        table: &str,
        raw: Option<i64>,
        default: Option<&str>,
    ) -> Result<Option<String>, TrackError> {
        let Some(raw) = raw else {
            return Ok(default.map(str::to_owned));
        };
        match self.transforms.lookup(table, raw) {
            Ok(display) => Ok(Some(display.to_owned())),
            Err(error) => match default {
                Some(default) => {
                    tracing::debug!(
                        target: "tracklytics::collector",
                        table,
                        raw,
                        "transform lookup missed, falling back to default"
                    );
                    Ok(Some(default.to_owned()))
                }
                None => Err(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformTable;

    fn collector() -> AttributeCollector {
        let mut transforms = TransformRegistry::new();
        transforms.declare("position", TransformTable::new().with(0, "First").with(1, "Second"));
        AttributeCollector::new(Arc::new(transforms), Arc::new(SuperAttributeStore::new()))
    }

    #[test]
    fn empty_occurrence_yields_empty_attributes_and_current_snapshot() {
        let collector = collector();
        collector.super_attributes().set("Session", "abc");

        let resolved = collector
            .resolve(&EventOccurrence::new("AppOpened"))
            .expect("空事件应解析成功");
        assert!(resolved.attributes.is_empty());
        assert_eq!(resolved.super_attributes.get("Session"), Some("abc"));
    }

    #[test]
    fn sources_are_applied_by_precedence_not_by_position() {
        let occurrence = EventOccurrence::new("Checkout").with_sources([
            AttributeSource::parameter("Origin", Some("param".to_owned())),
            AttributeSource::fixed("Origin", "method"),
            AttributeSource::fixed_class("Origin", "class"),
        ]);
        let resolved = collector().resolve(&occurrence).expect("解析成功");
        assert_eq!(resolved.attributes.get("Origin"), Some("param"));
    }

    #[test]
    fn absent_transform_raw_uses_default_or_is_omitted() {
        let occurrence = EventOccurrence::new("Scroll").with_sources([
            AttributeSource::transformed("Pos", None, "position").with_default("Unknown"),
            AttributeSource::transformed("Other", None, "position"),
        ]);
        let resolved = collector().resolve(&occurrence).expect("解析成功");
        assert_eq!(resolved.attributes.get("Pos"), Some("Unknown"));
        assert!(!resolved.attributes.contains_key("Other"));
    }

    #[test]
    fn failed_resolution_leaves_super_store_untouched() {
        let collector = collector();
        let occurrence = EventOccurrence::new("Scroll").with_sources([
            AttributeSource::fixed("Plan", "pro").as_super(),
            AttributeSource::transformed("Pos", Some(42), "position"),
        ]);
        let error = collector.resolve(&occurrence).expect_err("未声明的原始值应失败");
        assert_eq!(error.code(), "tracklytics.transform.lookup");
        assert!(collector.super_attributes().is_empty());
    }

    #[test]
    fn super_trackable_writes_every_pair() {
        let collector = collector();
        let user: AttributeMap = [("UserId", "7"), ("Plan", "pro")].into_iter().collect();
        let occurrence = EventOccurrence::new("Login")
            .with_source(AttributeSource::trackable(Some(Arc::new(user))).as_super());
        let resolved = collector.resolve(&occurrence).expect("解析成功");

        assert_eq!(resolved.super_attributes.get("UserId"), Some("7"));
        assert_eq!(resolved.super_attributes.get("Plan"), Some("pro"));
        assert_eq!(resolved.attributes.len(), 2);
    }
}
