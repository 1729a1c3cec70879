//! 有序属性映射。
//!
//! # 设计背景（Why）
//! - 事件属性既需要“键唯一、后写覆盖”的映射语义，又需要稳定的遍历顺序，
//!   以便后端按声明顺序上报、测试按顺序断言；
//! - 单次事件的属性规模通常只有个位数到几十个，线性存储在查找成本与内存局部性之间更划算。
//!
//! # 契约说明（What）
//! - 遍历顺序等于键首次插入的顺序；
//! - 覆盖写入保持原有位置，仅替换值。

use std::fmt;

/// 键值均为字符串的有序映射。
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributeMap {
    entries: Vec<(String, String)>,
}

impl AttributeMap {
    /// 创建空映射。
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// 写入键值；若键已存在则原位替换并返回旧值。
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 移除键并返回其值，其余条目保持相对顺序。
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按插入顺序遍历键值。
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl fmt::Debug for AttributeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V> Extend<(K, V)> for AttributeMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_first_position() {
        let mut map = AttributeMap::new();
        map.insert("a", "1");
        map.insert("b", "2");
        assert_eq!(map.insert("a", "3"), Some("1".to_owned()));

        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn remove_preserves_order_of_rest() {
        let mut map: AttributeMap = [("x", "1"), ("y", "2"), ("z", "3")].into_iter().collect();
        assert_eq!(map.remove("y"), Some("2".to_owned()));
        assert_eq!(map.remove("y"), None);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["x", "z"]);
    }

    #[test]
    fn debug_renders_as_map() {
        let map: AttributeMap = [("Status", "Success")].into_iter().collect();
        assert_eq!(format!("{map:?}"), r#"{"Status": "Success"}"#);
    }
}
