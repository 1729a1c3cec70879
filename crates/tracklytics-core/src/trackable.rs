//! Trackable 能力：让任意值自行声明要附加到事件上的属性。
//!
//! # 设计背景（Why）
//! - 领域对象（用户、订单、页面）往往最清楚自己哪些字段值得上报，由对象实现单一方法的 Trait，
//!   比在调用点逐个列举参数更不易遗漏；
//! - 属性数据属于尽力而为的范畴，提取失败按“零属性”降级，而不是让整次事件失败。

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use crate::attributes::AttributeMap;

/// 可提供事件属性的值。
///
/// - **契约 (What)**：返回 `None` 表示当前无法提供属性（例如对象尚未加载完成），
///   引擎会将其视为零个属性；
/// - **前置条件**：实现需 `Send + Sync`，事件可能在任意线程上被解析。
pub trait Trackable: Send + Sync {
    fn trackable_attributes(&self) -> Option<AttributeMap>;
}

impl Trackable for AttributeMap {
    fn trackable_attributes(&self) -> Option<AttributeMap> {
        Some(self.clone())
    }
}

impl<T: Trackable + ?Sized> Trackable for Arc<T> {
    fn trackable_attributes(&self) -> Option<AttributeMap> {
        (**self).trackable_attributes()
    }
}

/// 将 [`Trackable`] 值展开为扁平属性映射。
#[derive(Clone, Copy, Debug, Default)]
pub struct TrackableResolver;

impl TrackableResolver {
    /// 提取属性；值缺失、提取返回 `None` 或提取过程 panic 时得到空映射。
    pub fn resolve(value: Option<&dyn Trackable>) -> AttributeMap {
        let Some(value) = value else {
            return AttributeMap::new();
        };
        match catch_unwind(AssertUnwindSafe(|| value.trackable_attributes())) {
            Ok(Some(attributes)) => attributes,
            Err(_) => {
                tracing::warn!(
                    target: "tracklytics::collector",
                    "trackable extraction panicked, treated as no attributes"
                );
                AttributeMap::new()
            }
            Ok(None) => {
                tracing::debug!(
                    target: "tracklytics::collector",
                    "trackable value yielded no attributes"
                );
                AttributeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unloaded;

    impl Trackable for Unloaded {
        fn trackable_attributes(&self) -> Option<AttributeMap> {
            None
        }
    }

    #[test]
    fn extraction_failure_degrades_to_empty() {
        assert!(TrackableResolver::resolve(Some(&Unloaded)).is_empty());
        assert!(TrackableResolver::resolve(None).is_empty());
    }

    struct Broken;

    impl Trackable for Broken {
        fn trackable_attributes(&self) -> Option<AttributeMap> {
            panic!("profile not loaded")
        }
    }

    #[test]
    fn panicking_extraction_degrades_to_empty() {
        assert!(TrackableResolver::resolve(Some(&Broken)).is_empty());
    }

    #[test]
    fn attribute_map_is_trackable_itself() {
        let user: AttributeMap = [("UserId", "42"), ("Plan", "pro")].into_iter().collect();
        let resolved = TrackableResolver::resolve(Some(&user));
        assert_eq!(resolved, user);
    }
}
