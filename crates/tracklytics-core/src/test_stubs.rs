//! 测试与示例共用的 [`Tracker`] 桩实现。
//!
//! # 设计定位（Why）
//! - 单元测试、集成测试与文档示例都需要“能记录收到什么”的后端，以及“按需失败”的后端；
//!   集中在此处避免各测试文件重复定义。
//!
//! # 契约说明（What）
//! - 桩对象不产生 I/O，仅在内存中记录调用；
//! - [`CallJournal`] 可被多个桩共享，用于断言跨后端的调用顺序。

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    attributes::AttributeMap,
    error::TrackerError,
    tracker::{LifecyclePhase, Tracker, TrackerId},
};

/// 跨后端共享的调用顺序日志，记录 `(后端 id, 事件名)`。
pub type CallJournal = Arc<Mutex<Vec<(TrackerId, String)>>>;

/// 后端收到的一次事件。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedEvent {
    pub name: String,
    pub attributes: AttributeMap,
    pub super_attributes: AttributeMap,
}

/// 记录全部调用的后端。
#[derive(Debug)]
pub struct RecordingTracker {
    id: TrackerId,
    name: String,
    events: Mutex<Vec<TrackedEvent>>,
    phases: Mutex<Vec<LifecyclePhase>>,
    journal: Option<CallJournal>,
}

impl RecordingTracker {
    pub fn new(id: TrackerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            events: Mutex::new(Vec::new()),
            phases: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    /// 额外把每次 `track_event` 写入共享日志。
    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events.lock().clone()
    }

    /// 按调用顺序返回已执行的生命周期阶段。
    pub fn phases(&self) -> Vec<LifecyclePhase> {
        self.phases.lock().clone()
    }

    fn record_phase(&self, phase: LifecyclePhase) -> Result<(), TrackerError> {
        self.phases.lock().push(phase);
        Ok(())
    }
}

impl Tracker for RecordingTracker {
    fn id(&self) -> TrackerId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn init(&self) -> Result<(), TrackerError> {
        self.record_phase(LifecyclePhase::Init)
    }

    fn start(&self) -> Result<(), TrackerError> {
        self.record_phase(LifecyclePhase::Start)
    }

    fn stop(&self) -> Result<(), TrackerError> {
        self.record_phase(LifecyclePhase::Stop)
    }

    fn track_event(
        &self,
        event_name: &str,
        attributes: &AttributeMap,
        super_attributes: &AttributeMap,
    ) -> Result<(), TrackerError> {
        if let Some(journal) = &self.journal {
            journal.lock().push((self.id, event_name.to_owned()));
        }
        self.events.lock().push(TrackedEvent {
            name: event_name.to_owned(),
            attributes: attributes.clone(),
            super_attributes: super_attributes.clone(),
        });
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FailureMode {
    Lifecycle(LifecyclePhase),
    Dispatch,
    Panic,
}

/// 在指定环节失败的后端。
#[derive(Debug)]
pub struct FailingTracker {
    id: TrackerId,
    name: String,
    mode: FailureMode,
}

impl FailingTracker {
    /// `start` 返回错误，其余调用成功且忽略事件。
    pub fn on_start(id: TrackerId, name: impl Into<String>) -> Self {
        Self::with_mode(id, name, FailureMode::Lifecycle(LifecyclePhase::Start))
    }

    /// 指定生命周期阶段返回错误。
    pub fn on_phase(id: TrackerId, name: impl Into<String>, phase: LifecyclePhase) -> Self {
        Self::with_mode(id, name, FailureMode::Lifecycle(phase))
    }

    /// `track_event` 返回错误。
    pub fn on_dispatch(id: TrackerId, name: impl Into<String>) -> Self {
        Self::with_mode(id, name, FailureMode::Dispatch)
    }

    /// `track_event` 与全部生命周期调用都会 panic。
    pub fn panicking(id: TrackerId, name: impl Into<String>) -> Self {
        Self::with_mode(id, name, FailureMode::Panic)
    }

    fn with_mode(id: TrackerId, name: impl Into<String>, mode: FailureMode) -> Self {
        Self {
            id,
            name: name.into(),
            mode,
        }
    }

    fn lifecycle(&self, phase: LifecyclePhase) -> Result<(), TrackerError> {
        match self.mode {
            FailureMode::Lifecycle(failing) if failing == phase => Err(TrackerError::new(
                "stub.lifecycle",
                format!("{phase} refused by stub"),
            )),
            FailureMode::Panic => panic!("stub tracker panicked during {phase}"),
            _ => Ok(()),
        }
    }
}

impl Tracker for FailingTracker {
    fn id(&self) -> TrackerId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn init(&self) -> Result<(), TrackerError> {
        self.lifecycle(LifecyclePhase::Init)
    }

    fn start(&self) -> Result<(), TrackerError> {
        self.lifecycle(LifecyclePhase::Start)
    }

    fn stop(&self) -> Result<(), TrackerError> {
        self.lifecycle(LifecyclePhase::Stop)
    }

    fn track_event(
        &self,
        event_name: &str,
        _attributes: &AttributeMap,
        _super_attributes: &AttributeMap,
    ) -> Result<(), TrackerError> {
        match self.mode {
            FailureMode::Dispatch => Err(TrackerError::new(
                "stub.dispatch",
                format!("event `{event_name}` refused by stub"),
            )),
            FailureMode::Panic => panic!("stub tracker panicked on `{event_name}`"),
            FailureMode::Lifecycle(_) => Ok(()),
        }
    }
}
