//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义引擎的错误语义，区分“会使整次事件作废的解析错误”与“只影响单个后端的隔离错误”；
//! - 每个变体都带稳定错误码，便于日志聚合与告警规则按码匹配。
//!
//! ## 传播策略（What）
//! - [`TrackError`]：属性解析阶段的致命错误，直接返回给 `resolve`/`track` 的调用方，
//!   此时不会向任何后端分发；
//! - [`AdapterLifecycleError`] / [`AdapterDispatchError`]：后端侧错误，由注册表捕获、记录日志后
//!   汇总进报告，绝不中断对其余后端的调用；
//! - Trackable 提取失败不构成错误，按零属性处理。

use std::{borrow::Cow, error::Error as StdError, fmt, sync::Arc};

use thiserror::Error;

use crate::tracker::{LifecyclePhase, TrackerId};

/// 属性解析阶段的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：解析失败意味着属性映射不完整，按约定整次事件作废，不发送部分事件；
/// - **契约 (What)**：所有变体 `Clone + Send + Sync + 'static`，可跨线程传递与重复上报；
/// - **设计权衡 (Trade-offs)**：表名以 `String` 保存，牺牲少量分配换取日志可读性。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TrackError {
    /// 转换表中不存在该原始值，且调用点未声明默认值。
    #[error("transform table `{table}` has no entry for raw value {raw}")]
    TransformLookup { table: String, raw: i64 },

    /// 引用了未声明的转换表，且调用点未声明默认值。
    #[error("transform table `{table}` is not declared")]
    UnknownTransformTable { table: String },
}

impl TrackError {
    /// 返回稳定的机器可读错误码。
    pub fn code(&self) -> &'static str {
        match self {
            TrackError::TransformLookup { .. } => "tracklytics.transform.lookup",
            TrackError::UnknownTransformTable { .. } => "tracklytics.transform.unknown_table",
        }
    }
}

/// 后端实现向引擎报告失败时使用的错误类型。
///
/// # 教案式说明
/// - **意图 (Why)**：后端各自持有网络、SDK 等错误类型，统一包装为 `code + message + source`
///   三元组后，注册表即可在不理解具体后端的前提下记录与汇总；
/// - **契约 (What)**：`code` 建议使用 `vendor.reason` 风格的稳定标识；`source` 可选，保留底层错误链；
/// - **执行 (How)**：`source` 以 `Arc` 持有，使错误本身可廉价 `Clone` 并放入多个报告。
#[derive(Clone, Debug)]
pub struct TrackerError {
    code: Cow<'static, str>,
    message: Cow<'static, str>,
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl TrackerError {
    /// 以错误码与描述构造错误。
    pub fn new(code: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    /// 附加底层错误，保留错误链。
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// 后端 `track_event` 或生命周期调用发生 panic 时，由注册表构造的错误。
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&'static str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self::new("tracklytics.tracker.panic", format!("tracker panicked: {detail}"))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for TrackerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

/// 某个后端的 `init`/`start`/`stop` 调用失败。
///
/// - **契约 (What)**：携带后端 id、展示名与失败阶段；失败后该后端的生命周期状态保持不变；
/// - **风险 (Trade-offs)**：注册表只记录不重试，重试策略属于后端自身职责。
#[derive(Clone, Debug, Error)]
#[error("tracker `{name}` (id={id}) failed during {phase}: {source}")]
pub struct AdapterLifecycleError {
    pub id: TrackerId,
    pub name: String,
    pub phase: LifecyclePhase,
    pub source: TrackerError,
}

/// 某个后端的 `track_event` 调用失败或 panic。
///
/// 已写入超级属性存储的值不会因此回滚。
#[derive(Clone, Debug, Error)]
#[error("tracker `{name}` (id={id}) failed to track `{event}`: {source}")]
pub struct AdapterDispatchError {
    pub id: TrackerId,
    pub name: String,
    pub event: String,
    pub source: TrackerError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_error_codes_are_stable() {
        let lookup = TrackError::TransformLookup {
            table: "position".to_owned(),
            raw: 7,
        };
        assert_eq!(lookup.code(), "tracklytics.transform.lookup");
        assert_eq!(
            lookup.to_string(),
            "transform table `position` has no entry for raw value 7"
        );

        let unknown = TrackError::UnknownTransformTable {
            table: "missing".to_owned(),
        };
        assert_eq!(unknown.code(), "tracklytics.transform.unknown_table");
    }

    #[test]
    fn tracker_error_keeps_source_chain() {
        let io = std::io::Error::other("socket closed");
        let error = TrackerError::new("vendor.io", "upload failed").with_source(io);
        assert_eq!(error.to_string(), "[vendor.io] upload failed");
        let source = error.source().expect("应保留底层错误");
        assert_eq!(source.to_string(), "socket closed");
    }

    #[test]
    fn panic_payload_is_rendered() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let error = TrackerError::from_panic(payload.as_ref());
        assert_eq!(error.code(), "tracklytics.tracker.panic");
        assert!(error.message().contains("boom"));
    }
}
