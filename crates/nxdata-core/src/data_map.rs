//! 容器的名称映射
//!
//! 名称在同一容器内唯一，迭代顺序为插入顺序。
//! 映射只保存ID，对象本身归注册表所有。

use crate::id::DataId;
use std::collections::HashMap;

/// 名称 → ID 映射
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataMap {
    /// 插入顺序
    order: Vec<DataId>,

    /// 名称索引
    names: HashMap<String, DataId>,
}

/// 插入失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// 名称已被其他对象占用
    NameTaken,
    /// 对象已在此容器中
    AlreadyPresent,
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入子对象
    pub fn insert(&mut self, id: DataId, name: &str) -> Result<(), InsertError> {
        if self.contains_id(id) {
            return Err(InsertError::AlreadyPresent);
        }
        if self.names.contains_key(name) {
            return Err(InsertError::NameTaken);
        }

        self.order.push(id);
        self.names.insert(name.to_string(), id);
        Ok(())
    }

    /// 按ID移除，返回是否存在
    pub fn remove(&mut self, id: DataId) -> bool {
        let Some(index) = self.order.iter().position(|&child| child == id) else {
            return false;
        };

        self.order.remove(index);
        self.names.retain(|_, child| *child != id);
        true
    }

    /// 更新子对象名称
    pub fn rename(&mut self, id: DataId, new_name: &str) -> Result<(), InsertError> {
        match self.names.get(new_name) {
            Some(&existing) if existing == id => return Ok(()),
            Some(_) => return Err(InsertError::NameTaken),
            None => {}
        }

        self.names.retain(|_, child| *child != id);
        self.names.insert(new_name.to_string(), id);
        Ok(())
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Option<DataId> {
        self.names.get(name).copied()
    }

    pub fn contains_id(&self, id: DataId) -> bool {
        self.order.contains(&id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// 名称是否可以被指定对象使用
    pub fn is_name_available(&self, name: &str, id: DataId) -> bool {
        self.names.get(name).map_or(true, |&existing| existing == id)
    }

    /// 按插入顺序的子对象ID
    pub fn ids(&self) -> &[DataId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut map = DataMap::new();
        assert!(map.insert(DataId(3), "b").is_ok());
        assert!(map.insert(DataId(1), "a").is_ok());

        assert_eq!(map.get("a"), Some(DataId(1)));
        assert_eq!(map.ids(), &[DataId(3), DataId(1)]);
        assert_eq!(map.insert(DataId(4), "a"), Err(InsertError::NameTaken));
        assert_eq!(map.insert(DataId(3), "c"), Err(InsertError::AlreadyPresent));
    }

    #[test]
    fn test_remove_and_rename() {
        let mut map = DataMap::new();
        map.insert(DataId(1), "a").unwrap();
        map.insert(DataId(2), "b").unwrap();

        assert_eq!(map.rename(DataId(1), "b"), Err(InsertError::NameTaken));
        assert!(map.rename(DataId(1), "c").is_ok());
        assert_eq!(map.get("c"), Some(DataId(1)));
        assert_eq!(map.get("a"), None);

        assert!(map.remove(DataId(1)));
        assert!(!map.remove(DataId(1)));
        assert!(!map.contains_name("c"));
        assert_eq!(map.len(), 1);
    }
}
