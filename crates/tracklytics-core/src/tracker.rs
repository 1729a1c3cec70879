//! 分析后端（Tracker）契约。
//!
//! # 设计背景（Why）
//! - 分析厂商集合是开放的：每接入一家厂商就新增一个实现，而引擎只认识这一组能力；
//! - 采用 Trait 对象 + 运行期注册，无需继承层次，也不要求后端之间共享任何状态。
//!
//! # 契约说明（What）
//! - `track_event` 在分发方线程上同步调用，不得 panic 跨越边界；失败请返回 [`TrackerError`]；
//! - 网络传输、批量上报、超时与重试均由后端自行负责；
//! - 引擎记录生命周期状态但不据此拦截分发，保证“先 start 后 track”是宿主的职责。

use std::fmt;

use crate::{attributes::AttributeMap, error::TrackerError};

/// 调用方分配的后端标识，用于事件过滤。
///
/// 注册表不校验唯一性：重复 id 的后端都会收到广播事件，也都会命中包含该 id 的过滤器。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackerId(i64);

impl TrackerId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TrackerId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// 后端在注册表中的生命周期状态。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized,
    Started,
    Stopped,
}

/// 注册表批量触发的生命周期阶段。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Init,
    Start,
    Stop,
}

impl LifecyclePhase {
    /// 阶段成功完成后后端所处的状态。
    pub const fn target_state(self) -> LifecycleState {
        match self {
            LifecyclePhase::Init => LifecycleState::Initialized,
            LifecyclePhase::Start => LifecycleState::Started,
            LifecyclePhase::Stop => LifecycleState::Stopped,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LifecyclePhase::Init => "init",
            LifecyclePhase::Start => "start",
            LifecyclePhase::Stop => "stop",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分析后端需要实现的能力集合。
///
/// # 教案式说明
/// - **意图 (Why)**：把“怎样把事件送到某家厂商”完全封装在实现内部，引擎只负责装配与路由；
/// - **契约 (What)**：
///   - `id`/`display_name` 在注册后不应变化，日志与过滤都依赖它们；
///   - `init` 为可选的一次性准备步骤，默认空实现；`start`/`stop` 对应宿主应用的前后台切换；
///   - `track_event` 收到的 `super_attributes` 是超级属性存储的快照，是否使用由后端自行决定；
/// - **风险 (Trade-offs)**：调用是同步的，慢后端会拖慢同一事件中排在其后的所有后端以及调用线程，
///   需要网络 I/O 的实现应自行缓冲或移交后台线程。
pub trait Tracker: Send + Sync {
    fn id(&self) -> TrackerId;

    fn display_name(&self) -> &str;

    fn init(&self) -> Result<(), TrackerError> {
        Ok(())
    }

    fn start(&self) -> Result<(), TrackerError>;

    fn stop(&self) -> Result<(), TrackerError>;

    fn track_event(
        &self,
        event_name: &str,
        attributes: &AttributeMap,
        super_attributes: &AttributeMap,
    ) -> Result<(), TrackerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_maps_to_target_state() {
        assert_eq!(LifecyclePhase::Init.target_state(), LifecycleState::Initialized);
        assert_eq!(LifecyclePhase::Start.target_state(), LifecycleState::Started);
        assert_eq!(LifecyclePhase::Stop.target_state(), LifecycleState::Stopped);
        assert_eq!(LifecyclePhase::Stop.to_string(), "stop");
    }

    #[test]
    fn tracker_id_orders_by_raw_value() {
        assert!(TrackerId::new(1) < TrackerId::from(2));
        assert_eq!(TrackerId::new(-3).to_string(), "-3");
    }
}
