//! # SuperAttributeStore：跨事件共享的超级属性存储
//!
//! ## 核心意图（Why）
//! - 某些属性（登录用户、实验分组）一经设置就应对之后的所有事件可见，
//!   因此需要一块在进程生命周期内持续存在、可被多个并发事件读写的存储；
//! - 存储以显式构造、`Arc` 传递的方式存在而非全局单例，测试可各自实例化互不干扰的存储。
//!
//! ## 行为契约（What）
//! - `set` 原子覆盖单个键；`set_many` 在同一把写锁内完成整批写入；
//! - `get_all` 返回某一时刻的一致快照，可能落后于并发写入，但不会观察到半写状态；
//! - 条目只会被显式覆盖、删除或 `clear` 清空，不会过期，也不会被自动并入事件属性。
//!
//! ## 风险提示（Trade-offs）
//! - 读写锁在写多读少的极端负载下会让 `get_all` 排队；事件属性规模很小，临界区仅为一次拷贝。

use parking_lot::RwLock;

use crate::attributes::AttributeMap;

/// 进程级超级属性存储。
#[derive(Debug, Default)]
pub struct SuperAttributeStore {
    entries: RwLock<AttributeMap>,
}

impl SuperAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以初始属性构造存储，常用于从配置播种。
    pub fn with_entries(entries: AttributeMap) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// 写入或覆盖单个超级属性，返回旧值。
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.write().insert(key, value)
    }

    /// 在一次写锁内写入一批超级属性，后出现的同名键覆盖先出现的。
    pub fn set_many<I, K, V>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_none() {
            return;
        }
        self.entries.write().extend(pairs);
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().remove(key)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).map(str::to_owned)
    }

    /// 返回当前全部超级属性的时间点拷贝。
    pub fn get_all(&self) -> AttributeMap {
        self.entries.read().clone()
    }

    /// 清空存储；用于测试复位或用户登出。
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
