//! 进程级初始化入口。
//!
//! # 设计背景（Why）
//! - 宿主应用通常在启动时一次性登记全部分析后端，并在前后台切换时统一启停；
//!   [`Tracklytics`] 把这套流程收敛为 `builder().with_tracker(..).build()` 与 `start`/`stop`；
//! - 构建完成的实例可用 `Arc` 共享，或仅把 [`EventDispatcher`] 交给埋点代码。
//!
//! # 契约说明（What）
//! - `build` 会按注册顺序对所有后端执行一次 `init`，失败被隔离并保存在 [`Tracklytics::init_report`]；
//! - `start`/`stop` 不会被自动调用，生命周期边界由宿主决定；
//! - 未显式提供的组件（转换表、超级属性存储）以空实例补齐。

use std::sync::Arc;

use crate::{
    config::{ConfigError, TracklyticsConfig},
    dispatcher::EventDispatcher,
    error::TrackError,
    occurrence::EventOccurrence,
    registry::{DispatchReport, LifecycleReport, TrackerRegistry},
    super_attrs::SuperAttributeStore,
    tracker::Tracker,
    transform::{TransformRegistry, TransformTable},
};

/// 组装完成的引擎实例。
#[derive(Debug)]
pub struct Tracklytics {
    dispatcher: Arc<EventDispatcher>,
    init_report: LifecycleReport,
}

impl Tracklytics {
    pub fn builder() -> TracklyticsBuilder {
        TracklyticsBuilder::default()
    }

    /// 分发器句柄，可克隆后交给任意线程的埋点代码。
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<TrackerRegistry> {
        self.dispatcher.registry()
    }

    /// 超级属性存储；宿主可在事件之外直接增删超级属性。
    pub fn super_attributes(&self) -> &Arc<SuperAttributeStore> {
        self.dispatcher.super_attributes()
    }

    /// 构建阶段 `init` 调用的结果。
    pub fn init_report(&self) -> &LifecycleReport {
        &self.init_report
    }

    pub fn start(&self) -> LifecycleReport {
        self.registry().start_all()
    }

    pub fn stop(&self) -> LifecycleReport {
        self.registry().stop_all()
    }

    pub fn track(&self, occurrence: EventOccurrence) -> Result<DispatchReport, TrackError> {
        self.dispatcher.track(occurrence)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.dispatcher.set_enabled(enabled);
    }
}

/// [`Tracklytics`] 构建器。
#[derive(Default)]
pub struct TracklyticsBuilder {
    trackers: Vec<Arc<dyn Tracker>>,
    transforms: TransformRegistry,
    super_attributes: Option<Arc<SuperAttributeStore>>,
    seed: Vec<(String, String)>,
    enabled: Option<bool>,
}

impl TracklyticsBuilder {
    pub fn with_tracker(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.trackers.push(tracker);
        self
    }

    pub fn with_trackers(mut self, trackers: impl IntoIterator<Item = Arc<dyn Tracker>>) -> Self {
        self.trackers.extend(trackers);
        self
    }

    pub fn with_transform_table(
        mut self,
        table_id: impl Into<String>,
        table: TransformTable,
    ) -> Self {
        self.transforms.declare(table_id, table);
        self
    }

    /// 使用外部构造的超级属性存储，便于多个实例共享或测试注入。
    pub fn with_super_attributes(mut self, store: Arc<SuperAttributeStore>) -> Self {
        self.super_attributes = Some(store);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// 应用配置：合并转换表、记录初始超级属性与开关。
    ///
    /// 配置中的同名转换表覆盖此前通过代码声明的表。
    pub fn with_config(mut self, config: &TracklyticsConfig) -> Result<Self, ConfigError> {
        let declared = config.transform_registry()?;
        for table_id in config.transforms.keys() {
            if let Some(table) = declared.table(table_id) {
                self.transforms.declare(table_id.as_str(), table.clone());
            }
        }
        self.seed.extend(config.super_attribute_entries());
        self.enabled = Some(config.enabled);
        Ok(self)
    }

    /// 注册全部后端并执行一次 `init`。
    pub fn build(self) -> Tracklytics {
        let super_attributes = self.super_attributes.unwrap_or_default();
        super_attributes.set_many(self.seed);

        let registry = Arc::new(TrackerRegistry::new());
        for tracker in self.trackers {
            registry.register(tracker);
        }

        let dispatcher =
            EventDispatcher::new(Arc::new(self.transforms), super_attributes, registry);
        if let Some(enabled) = self.enabled {
            dispatcher.set_enabled(enabled);
        }

        let init_report = dispatcher.registry().init_all();
        tracing::info!(
            target: "tracklytics::bootstrap",
            trackers = dispatcher.registry().len(),
            init_failures = init_report.failures.len(),
            enabled = dispatcher.is_enabled(),
            "tracklytics initialized"
        );

        Tracklytics {
            dispatcher: Arc::new(dispatcher),
            init_report,
        }
    }
}
