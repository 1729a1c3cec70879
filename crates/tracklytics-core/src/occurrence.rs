//! 事件发生描述：一次埋点调用的全部输入。
//!
//! # 设计背景（Why）
//! - 埋点调用点（手写或由 [`TrackedCall`](crate::TrackedCall) 生成）只负责描述“发生了什么”，
//!   解析与分发全部交给引擎，因此描述本身必须是纯数据、构建后不可变；
//! - 属性来源保持为带标签的枚举，解析规则（默认值、转换、超级属性）随来源类型而定。
//!
//! # 契约说明（What）
//! - [`EventOccurrence`] 每次调用新建一次，被分发器消费一次；
//! - [`AttributeSource`] 的处理顺序由 [`AttributeSource::precedence`] 决定，与传入顺序无关，
//!   同一优先级内保持传入顺序。

use std::{collections::BTreeSet, fmt, sync::Arc};

use crate::{trackable::Trackable, tracker::TrackerId};

/// 固定属性的声明作用域。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixedScope {
    /// 类型级声明，对该类型的所有事件生效，优先级最低。
    Class,
    /// 方法级声明，覆盖同名的类型级声明。
    Method,
}

/// 单个属性来源。
///
/// # 教案式说明
/// - **意图 (Why)**：覆盖调用点可能提供属性的全部途径：实参、返回值、固定值、
///   可追踪对象与转换表；
/// - **契约 (What)**：
///   - `Parameter`/`Return`/`Transformed` 的值缺失时回退到 `default`，两者皆缺则不写入该键；
///   - `Trackable` 展开为零到多个键值；
///   - 所有变体的 `is_super` 为真时，解析出的键值同时写入超级属性存储；
/// - **构造方式 (How)**：优先使用 `parameter`/`fixed` 等构造函数，再以 `with_default`/`as_super`
///   链式补充，避免手写结构体字面量。
#[derive(Clone)]
pub enum AttributeSource {
    Parameter {
        key: String,
        value: Option<String>,
        default: Option<String>,
        is_super: bool,
    },
    Return {
        key: String,
        value: Option<String>,
        default: Option<String>,
        is_super: bool,
    },
    Fixed {
        key: String,
        value: String,
        scope: FixedScope,
        is_super: bool,
    },
    Trackable {
        value: Option<Arc<dyn Trackable>>,
        is_super: bool,
    },
    Transformed {
        key: String,
        raw: Option<i64>,
        table: String,
        default: Option<String>,
        is_super: bool,
    },
}

impl AttributeSource {
    /// 方法实参来源。
    pub fn parameter(key: impl Into<String>, value: Option<String>) -> Self {
        AttributeSource::Parameter {
            key: key.into(),
            value,
            default: None,
            is_super: false,
        }
    }

    /// 方法返回值来源。
    pub fn return_value(key: impl Into<String>, value: Option<String>) -> Self {
        AttributeSource::Return {
            key: key.into(),
            value,
            default: None,
            is_super: false,
        }
    }

    /// 方法级固定属性。
    pub fn fixed(key: impl Into<String>, value: impl Into<String>) -> Self {
        AttributeSource::Fixed {
            key: key.into(),
            value: value.into(),
            scope: FixedScope::Method,
            is_super: false,
        }
    }

    /// 类型级固定属性。
    pub fn fixed_class(key: impl Into<String>, value: impl Into<String>) -> Self {
        AttributeSource::Fixed {
            key: key.into(),
            value: value.into(),
            scope: FixedScope::Class,
            is_super: false,
        }
    }

    /// 可追踪对象来源；传入 `None` 表示实参为空，按零属性处理。
    pub fn trackable(value: Option<Arc<dyn Trackable>>) -> Self {
        AttributeSource::Trackable {
            value,
            is_super: false,
        }
    }

    /// 经转换表映射的来源。
    pub fn transformed(key: impl Into<String>, raw: Option<i64>, table: impl Into<String>) -> Self {
        AttributeSource::Transformed {
            key: key.into(),
            raw,
            table: table.into(),
            default: None,
            is_super: false,
        }
    }

    /// 设置默认值；对 `Fixed`/`Trackable` 无意义，保持原样。
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            AttributeSource::Parameter { default, .. }
            | AttributeSource::Return { default, .. }
            | AttributeSource::Transformed { default, .. } => *default = Some(value.into()),
            AttributeSource::Fixed { .. } | AttributeSource::Trackable { .. } => {}
        }
        self
    }

    /// 标记解析结果需同时写入超级属性存储。
    pub fn as_super(mut self) -> Self {
        match &mut self {
            AttributeSource::Parameter { is_super, .. }
            | AttributeSource::Return { is_super, .. }
            | AttributeSource::Fixed { is_super, .. }
            | AttributeSource::Trackable { is_super, .. }
            | AttributeSource::Transformed { is_super, .. } => *is_super = true,
        }
        self
    }

    pub fn is_super(&self) -> bool {
        match self {
            AttributeSource::Parameter { is_super, .. }
            | AttributeSource::Return { is_super, .. }
            | AttributeSource::Fixed { is_super, .. }
            | AttributeSource::Trackable { is_super, .. }
            | AttributeSource::Transformed { is_super, .. } => *is_super,
        }
    }

    /// 合并优先级，数值越大越晚写入、越能覆盖同名键。
    ///
    /// 顺序：类型级固定 < 方法级固定 < 实参 < 返回值 < 可追踪对象 < 转换值。
    pub fn precedence(&self) -> u8 {
        match self {
            AttributeSource::Fixed {
                scope: FixedScope::Class,
                ..
            } => 0,
            AttributeSource::Fixed {
                scope: FixedScope::Method,
                ..
            } => 1,
            AttributeSource::Parameter { .. } => 2,
            AttributeSource::Return { .. } => 3,
            AttributeSource::Trackable { .. } => 4,
            AttributeSource::Transformed { .. } => 5,
        }
    }
}

impl fmt::Debug for AttributeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeSource::Parameter {
                key,
                value,
                default,
                is_super,
            } => f
                .debug_struct("Parameter")
                .field("key", key)
                .field("value", value)
                .field("default", default)
                .field("is_super", is_super)
                .finish(),
            AttributeSource::Return {
                key,
                value,
                default,
                is_super,
            } => f
                .debug_struct("Return")
                .field("key", key)
                .field("value", value)
                .field("default", default)
                .field("is_super", is_super)
                .finish(),
            AttributeSource::Fixed {
                key,
                value,
                scope,
                is_super,
            } => f
                .debug_struct("Fixed")
                .field("key", key)
                .field("value", value)
                .field("scope", scope)
                .field("is_super", is_super)
                .finish(),
            AttributeSource::Trackable { value, is_super } => f
                .debug_struct("Trackable")
                .field("present", &value.is_some())
                .field("is_super", is_super)
                .finish(),
            AttributeSource::Transformed {
                key,
                raw,
                table,
                default,
                is_super,
            } => f
                .debug_struct("Transformed")
                .field("key", key)
                .field("raw", raw)
                .field("table", table)
                .field("default", default)
                .field("is_super", is_super)
                .finish(),
        }
    }
}

/// 事件的后端过滤条件；空集合表示广播给所有已注册后端。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackFilter {
    ids: BTreeSet<TrackerId>,
}

impl TrackFilter {
    /// 广播：不限制后端。
    pub fn all() -> Self {
        Self::default()
    }

    /// 仅分发给列出的后端。
    pub fn only(ids: impl IntoIterator<Item = TrackerId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.ids.is_empty()
    }

    /// 判断给定后端是否应收到事件。
    pub fn admits(&self, id: TrackerId) -> bool {
        self.ids.is_empty() || self.ids.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = TrackerId> + '_ {
        self.ids.iter().copied()
    }
}

/// 一次埋点调用的完整描述。
#[derive(Clone, Debug)]
pub struct EventOccurrence {
    name: String,
    sources: Vec<AttributeSource>,
    filter: TrackFilter,
}

impl EventOccurrence {
    /// 以事件名创建无属性来源、广播分发的描述。
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            filter: TrackFilter::all(),
        }
    }

    pub fn with_source(mut self, source: AttributeSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = AttributeSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn with_filter(mut self, filter: TrackFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[AttributeSource] {
        &self.sources
    }

    pub fn filter(&self) -> &TrackFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_follows_declared_order() {
        let ordered = [
            AttributeSource::fixed_class("k", "v"),
            AttributeSource::fixed("k", "v"),
            AttributeSource::parameter("k", None),
            AttributeSource::return_value("k", None),
            AttributeSource::trackable(None),
            AttributeSource::transformed("k", None, "t"),
        ];
        let ranks: Vec<u8> = ordered.iter().map(AttributeSource::precedence).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn default_is_ignored_for_fixed_sources() {
        let source = AttributeSource::fixed("Status", "Success").with_default("ignored");
        match source {
            AttributeSource::Fixed { value, .. } => assert_eq!(value, "Success"),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn as_super_marks_every_variant() {
        assert!(AttributeSource::trackable(None).as_super().is_super());
        assert!(AttributeSource::parameter("a", None).as_super().is_super());
        assert!(!AttributeSource::return_value("a", None).is_super());
    }

    #[test]
    fn empty_filter_is_broadcast() {
        let filter = TrackFilter::all();
        assert!(filter.is_broadcast());
        assert!(filter.admits(TrackerId::new(99)));

        let only = TrackFilter::only([TrackerId::new(1)]);
        assert!(only.admits(TrackerId::new(1)));
        assert!(!only.admits(TrackerId::new(2)));
    }
}
