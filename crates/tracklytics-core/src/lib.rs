//! # tracklytics-core
//!
//! ## 定位与职责（Why）
//! - 业务代码在调用点声明“事件名 + 属性来源”，本 crate 负责把这些来源装配成最终的属性映射，
//!   并分发给任意数量的分析后端（[`Tracker`]）。
//! - 真正的难点不在“发送事件”，而在于：按固定优先级合并多种属性来源、维护跨事件共享的
//!   “超级属性”存储，以及在动态后端集合上执行过滤与生命周期管理。
//!
//! ## 架构嵌入（Where）
//! - 叶子组件：[`TransformRegistry`]、[`TrackableResolver`]、[`SuperAttributeStore`]；
//! - 装配层：[`AttributeCollector`]；
//! - 分发层：[`TrackerRegistry`] 与顶层入口 [`EventDispatcher`]；
//! - 宿主集成：[`Tracklytics`] 负责一次性初始化，[`TrackedCall`] 取代编译期织入，
//!   [`observer`] 模块提供只读的调试订阅点。
//!
//! ## 调用链（How）
//! `EventDispatcher::track` → `AttributeCollector::resolve` → `TrackerRegistry::dispatch_to`
//! → 每个满足过滤条件的 `Tracker::track_event`。整个过程在调用方线程上同步执行。
//!
//! ## 示例
//! ```
//! use std::sync::Arc;
//! use tracklytics_core::{AttributeSource, EventOccurrence, TrackFilter, TrackerId, Tracklytics};
//! use tracklytics_core::test_stubs::RecordingTracker;
//!
//! let tracker = Arc::new(RecordingTracker::new(TrackerId::new(1), "recording"));
//! let tracklytics = Tracklytics::builder().with_tracker(tracker.clone()).build();
//! tracklytics.start();
//!
//! let occurrence = EventOccurrence::new("Login")
//!     .with_source(AttributeSource::fixed("Status", "Success"))
//!     .with_filter(TrackFilter::only([TrackerId::new(1)]));
//! tracklytics.track(occurrence).expect("解析不应失败");
//!
//! let events = tracker.events();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].attributes.get("Status"), Some("Success"));
//! ```

pub mod attributes;
pub mod bootstrap;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod instrument;
pub mod observer;
pub mod occurrence;
pub mod registry;
pub mod super_attrs;
/// 测试与示例共用的后端桩实现。
///
/// - 通过 `use tracklytics_core::test_stubs::*;` 引入 [`RecordingTracker`](test_stubs::RecordingTracker)
///   等类型；生产代码不应依赖该模块。
pub mod test_stubs;
pub mod trackable;
pub mod tracker;
pub mod transform;

pub use attributes::AttributeMap;
pub use bootstrap::{Tracklytics, TracklyticsBuilder};
pub use collector::{AttributeCollector, ResolvedEvent};
pub use config::{ConfigError, TracklyticsConfig};
pub use dispatcher::EventDispatcher;
pub use error::{AdapterDispatchError, AdapterLifecycleError, TrackError, TrackerError};
pub use instrument::{TrackedCall, TrackedOutcome};
pub use observer::{DispatchObserver, DispatchRecord, DispatchStream, RecordingObserver};
pub use occurrence::{AttributeSource, EventOccurrence, FixedScope, TrackFilter};
pub use registry::{DispatchReport, LifecycleReport, TrackerRegistry, TrackerStatus};
pub use super_attrs::SuperAttributeStore;
pub use trackable::{Trackable, TrackableResolver};
pub use tracker::{LifecyclePhase, LifecycleState, Tracker, TrackerId};
pub use transform::{TransformRegistry, TransformTable};

/// 引擎对外暴露的统一 `Result` 别名，默认错误类型为 [`TrackError`]。
pub type Result<T, E = TrackError> = core::result::Result<T, E>;
