//! # TrackerRegistry：后端集合、生命周期与过滤分发
//!
//! ## 核心意图（Why）
//! - 持有所有已注册的后端，并以注册顺序为它们批量执行 `init`/`start`/`stop` 与事件分发；
//! - 任何单个后端的失败（返回错误或 panic）都被隔离：记录日志、写入报告，其余后端照常收到调用。
//!
//! ## 架构定位（Where）
//! - 位于 [`EventDispatcher`](crate::EventDispatcher) 之下、各 [`Tracker`] 实现之上；
//! - 后端列表存放在 [`ArcSwap`] 中：注册时以 RCU 方式替换整张列表，分发开始时加载一次快照，
//!   因此分发过程中的并发注册不会影响正在进行的分发。
//!
//! ## 行为契约（What）
//! - `register`：追加到列表末尾，不触发任何生命周期调用；
//! - `init_all`/`start_all`/`stop_all`：按注册顺序逐个调用，成功后更新该后端的状态；
//! - `dispatch_to`：过滤器为空时调用全部后端，否则只调用 id 命中的后端；同 id 的多个后端全部调用；
//!   每个后端恰好调用一次，同步执行，不排队、不重试。
//!
//! ## 风险提示（Trade-offs）
//! - 分发是串行的，慢后端会阻塞其后的后端与调用线程；引擎不设超时，超时由后端自行管理；
//! - 生命周期状态仅作记录，不拦截分发，先启动后分发的顺序由宿主保证。

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::{
    attributes::AttributeMap,
    error::{AdapterDispatchError, AdapterLifecycleError, TrackerError},
    occurrence::TrackFilter,
    tracker::{LifecyclePhase, LifecycleState, Tracker, TrackerId},
};

/// 注册表内部的后端槽位：后端本体与其生命周期状态。
struct TrackerSlot {
    tracker: Arc<dyn Tracker>,
    state: Mutex<LifecycleState>,
}

impl TrackerSlot {
    fn id(&self) -> TrackerId {
        self.tracker.id()
    }

    fn name(&self) -> String {
        self.tracker.display_name().to_owned()
    }
}

/// 后端状态的只读视图。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerStatus {
    pub id: TrackerId,
    pub name: String,
    pub state: LifecycleState,
}

/// 一轮生命周期调用的结果汇总。
#[derive(Clone, Debug, Default)]
pub struct LifecycleReport {
    /// 成功完成该阶段的后端，按注册顺序排列。
    pub succeeded: Vec<TrackerId>,
    pub failures: Vec<AdapterLifecycleError>,
}

impl LifecycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 一次事件分发的结果汇总。
#[derive(Clone, Debug, Default)]
pub struct DispatchReport {
    /// 通过过滤、被调用的后端，按注册顺序排列。
    pub targets: Vec<TrackerId>,
    /// 其中调用成功的后端。
    pub delivered: Vec<TrackerId>,
    pub failures: Vec<AdapterDispatchError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 后端注册表。
#[derive(Default)]
pub struct TrackerRegistry {
    slots: ArcSwap<Vec<Arc<TrackerSlot>>>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册后端，追加在现有后端之后；不会启动它。
    ///
    /// # 教案式说明
    /// - **意图 (Why)**：注册只改变“谁会收到事件”，生命周期由宿主在合适的时机统一驱动；
    /// - **执行 (How)**：`rcu` 基于当前列表复制出新列表并原子替换，竞争时闭包可能被重放，
    ///   因此闭包内只做纯复制；
    /// - **契约 (What)**：不校验 id 唯一性。
    pub fn register(&self, tracker: Arc<dyn Tracker>) {
        let slot = Arc::new(TrackerSlot {
            tracker,
            state: Mutex::new(LifecycleState::Uninitialized),
        });
        tracing::debug!(
            target: "tracklytics::registry",
            tracker_id = %slot.id(),
            tracker = slot.tracker.display_name(),
            "tracker registered"
        );
        self.slots.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&slot));
            next
        });
    }

    pub fn len(&self) -> usize {
        self.slots.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.load().is_empty()
    }

    /// 按注册顺序返回全部后端 id。
    pub fn ids(&self) -> Vec<TrackerId> {
        self.slots.load().iter().map(|slot| slot.id()).collect()
    }

    /// 按注册顺序返回全部后端的状态视图。
    pub fn states(&self) -> Vec<TrackerStatus> {
        self.slots
            .load()
            .iter()
            .map(|slot| TrackerStatus {
                id: slot.id(),
                name: slot.name(),
                state: *slot.state.lock(),
            })
            .collect()
    }

    pub fn init_all(&self) -> LifecycleReport {
        self.run_phase(LifecyclePhase::Init)
    }

    pub fn start_all(&self) -> LifecycleReport {
        self.run_phase(LifecyclePhase::Start)
    }

    pub fn stop_all(&self) -> LifecycleReport {
        self.run_phase(LifecyclePhase::Stop)
    }

    fn run_phase(&self, phase: LifecyclePhase) -> LifecycleReport {
        let snapshot = self.slots.load_full();
        let mut report = LifecycleReport::default();

        for slot in snapshot.iter() {
            let tracker = &slot.tracker;
            let outcome = guarded(|| match phase {
                LifecyclePhase::Init => tracker.init(),
                LifecyclePhase::Start => tracker.start(),
                LifecyclePhase::Stop => tracker.stop(),
            });

            match outcome {
                Ok(()) => {
                    *slot.state.lock() = phase.target_state();
                    report.succeeded.push(slot.id());
                }
                Err(source) => {
                    tracing::warn!(
                        target: "tracklytics::registry",
                        tracker_id = %slot.id(),
                        tracker = tracker.display_name(),
                        %phase,
                        code = source.code(),
                        error = %source,
                        "tracker lifecycle call failed"
                    );
                    report.failures.push(AdapterLifecycleError {
                        id: slot.id(),
                        name: slot.name(),
                        phase,
                        source,
                    });
                }
            }
        }

        report
    }

    /// 将装配完成的事件分发给满足过滤条件的后端。
    ///
    /// # 教案式说明
    /// - **输入**：`attributes` 与 `super_attributes` 以借用方式传给每个后端，后端需要持久化时自行克隆；
    /// - **执行 (How)**：加载一次列表快照，按注册顺序过滤并同步调用，错误与 panic 均被捕获；
    /// - **输出**：[`DispatchReport`] 记录目标、成功与失败的后端；失败已在此处记录日志。
    pub fn dispatch_to(
        &self,
        event_name: &str,
        attributes: &AttributeMap,
        super_attributes: &AttributeMap,
        filter: &TrackFilter,
    ) -> DispatchReport {
        let snapshot = self.slots.load_full();
        let mut report = DispatchReport::default();

        for slot in snapshot.iter().filter(|slot| filter.admits(slot.id())) {
            let tracker = &slot.tracker;
            report.targets.push(slot.id());

            match guarded(|| tracker.track_event(event_name, attributes, super_attributes)) {
                Ok(()) => report.delivered.push(slot.id()),
                Err(source) => {
                    tracing::warn!(
                        target: "tracklytics::dispatch",
                        event = event_name,
                        tracker_id = %slot.id(),
                        tracker = tracker.display_name(),
                        code = source.code(),
                        error = %source,
                        "tracker failed to track event"
                    );
                    report.failures.push(AdapterDispatchError {
                        id: slot.id(),
                        name: slot.name(),
                        event: event_name.to_owned(),
                        source,
                    });
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for TrackerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerRegistry")
            .field("trackers", &self.states())
            .finish()
    }
}

/// 执行后端调用并把 panic 折算为 [`TrackerError`]。
fn guarded(call: impl FnOnce() -> Result<(), TrackerError>) -> Result<(), TrackerError> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(TrackerError::from_panic(payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_stubs::{FailingTracker, RecordingTracker};

    #[test]
    fn register_does_not_start() {
        let registry = TrackerRegistry::new();
        registry.register(Arc::new(RecordingTracker::new(TrackerId::new(1), "a")));
        let states = registry.states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].state, LifecycleState::Uninitialized);
    }

    #[test]
    fn lifecycle_failure_is_isolated() {
        let registry = TrackerRegistry::new();
        registry.register(Arc::new(FailingTracker::on_start(TrackerId::new(1), "broken")));
        registry.register(Arc::new(RecordingTracker::new(TrackerId::new(2), "healthy")));

        let report = registry.start_all();
        assert_eq!(report.succeeded, vec![TrackerId::new(2)]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].phase, LifecyclePhase::Start);

        let states = registry.states();
        assert_eq!(states[0].state, LifecycleState::Uninitialized);
        assert_eq!(states[1].state, LifecycleState::Started);
    }

    #[test]
    fn panicking_tracker_does_not_abort_dispatch() {
        let registry = TrackerRegistry::new();
        let healthy = Arc::new(RecordingTracker::new(TrackerId::new(2), "healthy"));
        registry.register(Arc::new(FailingTracker::panicking(TrackerId::new(1), "panicky")));
        registry.register(healthy.clone());

        let report = registry.dispatch_to(
            "Login",
            &AttributeMap::new(),
            &AttributeMap::new(),
            &TrackFilter::all(),
        );
        assert_eq!(report.targets, vec![TrackerId::new(1), TrackerId::new(2)]);
        assert_eq!(report.delivered, vec![TrackerId::new(2)]);
        assert_eq!(report.failures[0].source.code(), "tracklytics.tracker.panic");
        assert_eq!(healthy.events().len(), 1);
    }

    #[test]
    fn panicking_lifecycle_is_isolated() {
        let registry = TrackerRegistry::new();
        let healthy = Arc::new(RecordingTracker::new(TrackerId::new(2), "healthy"));
        registry.register(Arc::new(FailingTracker::panicking(TrackerId::new(1), "panicky")));
        registry.register(healthy.clone());

        let report = registry.start_all();
        assert_eq!(report.succeeded, vec![TrackerId::new(2)]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, TrackerId::new(1));
        assert_eq!(report.failures[0].phase, LifecyclePhase::Start);
        assert_eq!(report.failures[0].source.code(), "tracklytics.tracker.panic");

        let states = registry.states();
        assert_eq!(states[0].state, LifecycleState::Uninitialized);
        assert_eq!(states[1].state, LifecycleState::Started);
        assert_eq!(healthy.phases(), vec![LifecyclePhase::Start]);
    }
}
