//! 显式埋点包装：以构建器包裹函数体，代替编译期织入。
//!
//! # 设计背景（Why）
//! - 调用点声明“事件名 + 固定属性 + 实参”，包装器执行函数体后把返回值也作为属性来源，
//!   随后一次性交给 [`EventDispatcher::track`]；
//! - 声明与执行写在同一处，阅读调用点即可知道会上报什么。
//!
//! # 契约说明（What）
//! - 函数体总会执行，且在埋点之前执行完毕；埋点结果与函数体返回值一起交还调用方；
//! - `as_super` 作用于最近一次添加的来源；尚未添加来源时为空操作；
//!   返回值来源在函数体执行后才生成，需用 `returning_super` 预先标记。
//!
//! # 示例
//! ```
//! use std::sync::Arc;
//! use tracklytics_core::{Tracklytics, TrackerId};
//! use tracklytics_core::test_stubs::RecordingTracker;
//!
//! let tracker = Arc::new(RecordingTracker::new(TrackerId::new(1), "rec"));
//! let tracklytics = Tracklytics::builder().with_tracker(tracker.clone()).build();
//!
//! let outcome = tracklytics
//!     .dispatcher()
//!     .call("Search")
//!     .param("Query", Some("rust"))
//!     .run_returning("Hits", || 3);
//!
//! assert_eq!(outcome.value, 3);
//! assert!(outcome.report.is_ok());
//! assert_eq!(tracker.events()[0].attributes.get("Hits"), Some("3"));
//! ```

use std::{fmt::Display, sync::Arc};

use crate::{
    dispatcher::EventDispatcher,
    error::TrackError,
    occurrence::{AttributeSource, EventOccurrence, TrackFilter},
    registry::DispatchReport,
    trackable::Trackable,
    tracker::TrackerId,
};

/// 函数体返回值与埋点结果。
#[derive(Debug)]
pub struct TrackedOutcome<R> {
    pub value: R,
    pub report: Result<DispatchReport, TrackError>,
}

impl<R> TrackedOutcome<R> {
    /// 丢弃埋点结果，只取函数体返回值；埋点失败已在分发器中记录日志。
    pub fn into_value(self) -> R {
        self.value
    }
}

/// 一次埋点调用的构建器，由 [`EventDispatcher::call`] 创建。
#[must_use = "TrackedCall 只有在 run 系列方法被调用后才会埋点"]
pub struct TrackedCall<'a> {
    dispatcher: &'a EventDispatcher,
    occurrence: EventOccurrence,
    pending: Vec<AttributeSource>,
    return_is_super: bool,
}

impl<'a> TrackedCall<'a> {
    pub(crate) fn new(dispatcher: &'a EventDispatcher, event_name: impl Into<String>) -> Self {
        Self {
            dispatcher,
            occurrence: EventOccurrence::new(event_name),
            pending: Vec::new(),
            return_is_super: false,
        }
    }

    fn push(mut self, source: AttributeSource) -> Self {
        self.pending.push(source);
        self
    }

    pub fn fixed_class(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(AttributeSource::fixed_class(key, value))
    }

    pub fn fixed(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(AttributeSource::fixed(key, value))
    }

    pub fn param<V: Display>(self, key: impl Into<String>, value: Option<V>) -> Self {
        self.push(AttributeSource::parameter(
            key,
            value.map(|value| value.to_string()),
        ))
    }

    pub fn param_or<V: Display>(
        self,
        key: impl Into<String>,
        value: Option<V>,
        default: impl Into<String>,
    ) -> Self {
        self.push(
            AttributeSource::parameter(key, value.map(|value| value.to_string()))
                .with_default(default),
        )
    }

    pub fn trackable(self, value: Option<Arc<dyn Trackable>>) -> Self {
        self.push(AttributeSource::trackable(value))
    }

    pub fn transform(
        self,
        key: impl Into<String>,
        raw: Option<i64>,
        table: impl Into<String>,
    ) -> Self {
        self.push(AttributeSource::transformed(key, raw, table))
    }

    pub fn transform_or(
        self,
        key: impl Into<String>,
        raw: Option<i64>,
        table: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        self.push(AttributeSource::transformed(key, raw, table).with_default(default))
    }

    /// 将最近一次添加的来源标记为超级属性。
    pub fn as_super(mut self) -> Self {
        if let Some(last) = self.pending.pop() {
            self.pending.push(last.as_super());
        }
        self
    }

    /// 将 `run_returning*` 生成的返回值来源标记为超级属性。
    pub fn returning_super(mut self) -> Self {
        self.return_is_super = true;
        self
    }

    pub fn filter(mut self, ids: impl IntoIterator<Item = TrackerId>) -> Self {
        self.occurrence = self.occurrence.with_filter(TrackFilter::only(ids));
        self
    }

    /// 执行函数体后埋点，不记录返回值。
    pub fn run<R>(self, body: impl FnOnce() -> R) -> TrackedOutcome<R> {
        let value = body();
        let report = self.finish(None);
        TrackedOutcome { value, report }
    }

    /// 执行函数体，并以其 `Display` 输出作为返回值属性。
    pub fn run_returning<R: Display>(
        self,
        key: impl Into<String>,
        body: impl FnOnce() -> R,
    ) -> TrackedOutcome<R> {
        self.run_returning_with(key, body, |value| Some(value.to_string()))
    }

    /// 执行函数体，并以自定义映射得到返回值属性；映射返回 `None` 时按缺值处理。
    pub fn run_returning_with<R>(
        self,
        key: impl Into<String>,
        body: impl FnOnce() -> R,
        render: impl FnOnce(&R) -> Option<String>,
    ) -> TrackedOutcome<R> {
        let value = body();
        let mut source = AttributeSource::return_value(key, render(&value));
        if self.return_is_super {
            source = source.as_super();
        }
        let report = self.finish(Some(source));
        TrackedOutcome { value, report }
    }

    fn finish(self, returned: Option<AttributeSource>) -> Result<DispatchReport, TrackError> {
        let occurrence = self
            .occurrence
            .with_sources(self.pending)
            .with_sources(returned);
        self.dispatcher.track(occurrence)
    }
}
