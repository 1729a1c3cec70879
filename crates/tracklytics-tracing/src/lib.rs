//! tracklytics 与 `tracing` 生态的集成层。
//!
//! # 设计背景（Why）
//! - `tracklytics-core` 只通过 `tracing` 宏输出诊断信息，本身不决定日志去向；
//!   宿主需要一个“一行安装”的入口把这些日志打印出来；
//! - 开发阶段常常还没有接入真实的分析后端，[`LogTracker`] 把事件直接写进日志，便于核对埋点。
//!
//! # 使用方式（How）
//! ```no_run
//! use std::sync::Arc;
//! use tracklytics_core::{EventOccurrence, TrackerId, Tracklytics};
//! use tracklytics_tracing::LogTracker;
//!
//! tracklytics_tracing::install().expect("进程内首次安装");
//! let tracklytics = Tracklytics::builder()
//!     .with_tracker(Arc::new(LogTracker::new(TrackerId::new(0), "log")))
//!     .build();
//! tracklytics.track(EventOccurrence::new("AppOpened")).expect("无转换来源");
//! ```

mod tracker;

use std::sync::OnceLock;

use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

pub use tracker::{EVENT_TARGET, LogTracker};

/// 安装状态的全局缓存，确保 `install` 仅执行一次。
static INSTALL_STATE: OnceLock<InstallState> = OnceLock::new();

/// 安装过程可能出现的错误类型。
///
/// # 教案式说明
/// - **意图（Why）**：归纳安装阶段的全部失败路径，便于调用方在启动流程中统一处理；
/// - **契约（What）**：所有错误都实现 [`std::error::Error`]，并保留底层错误信息。
#[derive(Debug)]
pub enum Error {
    /// `install` 被重复调用。
    AlreadyInstalled,
    /// 外部提前设置了全局 `tracing` Subscriber，无法再次注册。
    SubscriberAlreadySet,
    /// 过滤指令无法解析。
    InvalidFilter(tracing_subscriber::filter::ParseError),
    /// 设置全局 Subscriber 失败的底层错误。
    SetGlobalSubscriber(tracing::subscriber::SetGlobalDefaultError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::AlreadyInstalled => {
                f.write_str("tracklytics-tracing 已完成安装，禁止重复调用 install")
            }
            Error::SubscriberAlreadySet => {
                f.write_str("全局 tracing Subscriber 已存在，tracklytics-tracing 无法覆盖")
            }
            Error::InvalidFilter(err) => write!(f, "过滤指令解析失败: {err}"),
            Error::SetGlobalSubscriber(err) => {
                write!(f, "设置 tracing 全局 Subscriber 失败: {err}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidFilter(err) => Some(err),
            Error::SetGlobalSubscriber(err) => Some(err),
            _ => None,
        }
    }
}

/// 安装后的持久状态。
#[derive(Debug)]
struct InstallState {
    directives: String,
}

/// 零配置安装入口：`RUST_LOG` 优先，缺省为 `info`。
///
/// # 教案式说明
/// - **逻辑（How）**：
///   1. 检查是否重复安装或外部已设置 Subscriber；
///   2. 组装 `EnvFilter + fmt` Layer 并设置为全局 Subscriber；
///   3. 将生效的过滤指令写入 `INSTALL_STATE`。
/// - **契约（What）**：多次调用返回 [`Error::AlreadyInstalled`]；调用前若外部已配置 Subscriber，返回
///   [`Error::SubscriberAlreadySet`]。
pub fn install() -> Result<(), Error> {
    install_with_filter(None)
}

/// 与 [`install`] 相同，但显式指定过滤指令（如 `"tracklytics=debug"`），忽略 `RUST_LOG`。
pub fn install_with_filter(directives: Option<&str>) -> Result<(), Error> {
    if INSTALL_STATE.get().is_some() {
        return Err(Error::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(Error::SubscriberAlreadySet);
    }

    let filter = build_env_filter(directives)?;
    let state = InstallState {
        directives: filter.to_string(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber).map_err(Error::SetGlobalSubscriber)?;

    INSTALL_STATE
        .set(state)
        .map_err(|_| Error::AlreadyInstalled)
}

/// 已安装时返回生效的过滤指令。
pub fn installed_filter() -> Option<&'static str> {
    INSTALL_STATE.get().map(|state| state.directives.as_str())
}

fn build_env_filter(directives: Option<&str>) -> Result<EnvFilter, Error> {
    match directives {
        Some(directives) => EnvFilter::try_new(directives).map_err(Error::InvalidFilter),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}
