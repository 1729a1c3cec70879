//! `LogTracker` 的日志输出测试。

use std::sync::Arc;

use tracing_test::traced_test;
use tracklytics_core::{AttributeSource, EventOccurrence, TrackerId, Tracklytics};
use tracklytics_tracing::LogTracker;

#[traced_test]
#[test]
fn events_are_logged_with_attributes() {
    let tracklytics = Tracklytics::builder()
        .with_tracker(Arc::new(LogTracker::new(TrackerId::new(9), "console")))
        .build();
    tracklytics.super_attributes().set("AppVersion", "4.2.0");

    tracklytics
        .track(
            EventOccurrence::new("Login")
                .with_source(AttributeSource::fixed("Status", "Success")),
        )
        .expect("解析成功");

    assert!(logs_contain("analytics event"));
    assert!(logs_contain("Login"));
    assert!(logs_contain("Status"));
    assert!(logs_contain("AppVersion"));
}

#[traced_test]
#[test]
fn lifecycle_calls_are_logged() {
    let tracklytics = Tracklytics::builder()
        .with_tracker(Arc::new(LogTracker::new(TrackerId::new(9), "console")))
        .build();
    tracklytics.start();
    tracklytics.stop();

    assert!(logs_contain("log tracker initialized"));
    assert!(logs_contain("log tracker started"));
    assert!(logs_contain("log tracker stopped"));
}

#[traced_test]
#[test]
fn disabled_engine_logs_no_events() {
    let tracklytics = Tracklytics::builder()
        .with_tracker(Arc::new(LogTracker::new(TrackerId::new(9), "console")))
        .enabled(false)
        .build();

    tracklytics
        .track(EventOccurrence::new("Hidden"))
        .expect("关闭时直接返回");

    assert!(!logs_contain("analytics event"));
}
