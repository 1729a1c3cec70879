//! # EventDispatcher：引擎唯一的埋点入口
//!
//! ## 核心意图（Why）
//! - 埋点调用点只需构造 [`EventOccurrence`] 并调用 [`EventDispatcher::track`]，
//!   装配、过滤、分发、调试旁路全部在此编排；
//! - 分发器本身 `Send + Sync`，以 `Arc` 共享给任意线程，多个线程可以同时埋点。
//!
//! ## 执行逻辑（How）
//! 1. 若分发器被关闭，直接返回空报告，不解析、不写超级属性、不分发；
//! 2. 调用 [`AttributeCollector::resolve`]，失败则记录日志并把错误返回给调用方；
//! 3. 调用 [`TrackerRegistry::dispatch_to`]，在调用方线程上同步逐个分发；
//! 4. 若存在调试订阅，发布一份 [`DispatchRecord`]。
//!
//! ## 行为契约（What）
//! - 阻塞时长不超过各后端 `track_event` 耗时之和；不重试任何失败的后端；
//! - 同一线程顺序发出的事件按序完成；不同线程并发发出的事件之间没有全局顺序保证。

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    collector::{AttributeCollector, ResolvedEvent},
    error::TrackError,
    instrument::TrackedCall,
    observer::{DispatchObserver, DispatchRecord, DispatchStream, ObserverHub},
    occurrence::EventOccurrence,
    registry::{DispatchReport, TrackerRegistry},
    super_attrs::SuperAttributeStore,
    transform::TransformRegistry,
};

/// 事件分发器。
pub struct EventDispatcher {
    collector: AttributeCollector,
    registry: Arc<TrackerRegistry>,
    hub: ObserverHub,
    enabled: AtomicBool,
}

impl EventDispatcher {
    /// 以显式构造的组件组装分发器。
    ///
    /// # 教案式说明
    /// - **意图 (Why)**：超级属性存储与注册表由调用方构造并传入，测试可以各自持有互不干扰的实例；
    /// - **契约 (What)**：新建的分发器默认处于开启状态，尚无任何调试订阅。
    pub fn new(
        transforms: Arc<TransformRegistry>,
        super_attributes: Arc<SuperAttributeStore>,
        registry: Arc<TrackerRegistry>,
    ) -> Self {
        Self {
            collector: AttributeCollector::new(transforms, super_attributes),
            registry,
            hub: ObserverHub::default(),
            enabled: AtomicBool::new(true),
        }
    }

    /// 解析并分发一次事件。
    ///
    /// # 教案式说明
    /// - **输入**：`occurrence` 按值传入，表达“一次调用只消费一次”的语义；
    /// - **输出**：成功时返回 [`DispatchReport`]，后端失败已被隔离并记录在报告中；
    ///   解析失败时返回 [`TrackError`]，此时没有任何后端被调用；
    /// - **风险 (Trade-offs)**：整个过程同步执行，慢后端会阻塞调用线程。
    pub fn track(&self, occurrence: EventOccurrence) -> Result<DispatchReport, TrackError> {
        if !self.is_enabled() {
            tracing::trace!(
                target: "tracklytics::dispatch",
                event = occurrence.name(),
                "tracking disabled, occurrence dropped"
            );
            return Ok(DispatchReport::default());
        }

        let resolved = self.collector.resolve(&occurrence).inspect_err(|error| {
            tracing::warn!(
                target: "tracklytics::dispatch",
                event = occurrence.name(),
                code = error.code(),
                %error,
                "attribute resolution failed, occurrence dropped"
            );
        })?;

        let report = self.registry.dispatch_to(
            occurrence.name(),
            &resolved.attributes,
            &resolved.super_attributes,
            occurrence.filter(),
        );

        tracing::debug!(
            target: "tracklytics::dispatch",
            event = occurrence.name(),
            targets = report.targets.len(),
            failures = report.failures.len(),
            "event dispatched"
        );

        if !self.hub.is_idle() {
            let ResolvedEvent {
                attributes,
                super_attributes,
            } = resolved;
            self.hub.publish(DispatchRecord {
                event_name: occurrence.name().to_owned(),
                attributes,
                super_attributes,
                targets: report.targets.clone(),
            });
        }

        Ok(report)
    }

    /// 只解析不分发，便于调试与测试装配规则；超级属性副作用照常发生。
    pub fn resolve(&self, occurrence: &EventOccurrence) -> Result<ResolvedEvent, TrackError> {
        self.collector.resolve(occurrence)
    }

    /// 以显式包装的方式声明一次埋点调用。
    pub fn call(&self, event_name: impl Into<String>) -> TrackedCall<'_> {
        TrackedCall::new(self, event_name)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// 订阅分发记录流；丢弃返回的流即退订。
    ///
    /// 队列无上限：持有却不轮询的流会保留此后每一条记录，直到被丢弃。
    pub fn subscribe(&self) -> DispatchStream {
        self.hub.subscribe()
    }

    /// 有界订阅：积压达到 `capacity`（另加一个发送槽位）后，新记录被丢弃，分发不受影响。
    pub fn subscribe_bounded(&self, capacity: usize) -> DispatchStream {
        self.hub.subscribe_bounded(capacity)
    }

    pub fn add_observer(&self, observer: Arc<dyn DispatchObserver>) {
        self.hub.add_observer(observer);
    }

    pub fn registry(&self) -> &Arc<TrackerRegistry> {
        &self.registry
    }

    pub fn super_attributes(&self) -> &Arc<SuperAttributeStore> {
        self.collector.super_attributes()
    }

    pub fn transforms(&self) -> &Arc<TransformRegistry> {
        self.collector.transforms()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("enabled", &self.is_enabled())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
