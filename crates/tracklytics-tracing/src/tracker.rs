use tracklytics_core::{AttributeMap, Tracker, TrackerError, TrackerId};

/// [`LogTracker`] 输出事件时使用的日志 target。
pub const EVENT_TARGET: &str = "tracklytics::events";

/// 把每个事件写成一条 `info` 日志的后端。
///
/// 属性以 `Debug` 形式渲染为 `attributes`/`super_attributes` 字段；生命周期调用记录为 `debug`。
#[derive(Debug, Clone)]
pub struct LogTracker {
    id: TrackerId,
    name: String,
}

impl LogTracker {
    pub fn new(id: TrackerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Tracker for LogTracker {
    fn id(&self) -> TrackerId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn init(&self) -> Result<(), TrackerError> {
        tracing::debug!(
            target: EVENT_TARGET,
            tracker = %self.name,
            tracker_id = %self.id,
            "log tracker initialized"
        );
        Ok(())
    }

    fn start(&self) -> Result<(), TrackerError> {
        tracing::debug!(
            target: EVENT_TARGET,
            tracker = %self.name,
            tracker_id = %self.id,
            "log tracker started"
        );
        Ok(())
    }

    fn stop(&self) -> Result<(), TrackerError> {
        tracing::debug!(
            target: EVENT_TARGET,
            tracker = %self.name,
            tracker_id = %self.id,
            "log tracker stopped"
        );
        Ok(())
    }

    fn track_event(
        &self,
        event_name: &str,
        attributes: &AttributeMap,
        super_attributes: &AttributeMap,
    ) -> Result<(), TrackerError> {
        tracing::info!(
            target: EVENT_TARGET,
            tracker = %self.name,
            event = event_name,
            attributes = ?attributes,
            super_attributes = ?super_attributes,
            "analytics event"
        );
        Ok(())
    }
}
