//! 对象标识和注册表
//!
//! 标识符单调递增且在一个数据结构实例的生命周期内从不复用。
//! 注册表是所有活动对象的唯一所有者，容器之间只按ID相互引用。

use crate::object::DataObject;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 数据对象唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataId(pub u64);

impl DataId {
    /// 从原始值创建（用于文件加载）
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 全局实例ID生成器
static STRUCTURE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 数据结构实例标识
///
/// 每个 `DataStructure`（包括复制出来的）都有自己的实例ID，
/// `LinkedPath` 用它确认自己属于哪个实例。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructureId(u64);

impl StructureId {
    pub(crate) fn new() -> Self {
        Self(STRUCTURE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// 不属于任何实例的空标识
    pub const NULL: StructureId = StructureId(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// 标识注册表
///
/// 负责发放ID并持有 id → 对象 的映射。查询已移除的ID返回 `None`。
#[derive(Debug, Clone)]
pub struct IdRegistry {
    /// 下一个将要发放的ID
    next_id: u64,

    /// 所有活动对象
    objects: HashMap<DataId, DataObject>,
}

impl IdRegistry {
    /// 创建空注册表，第一个ID为1
    pub fn new() -> Self {
        Self {
            next_id: 1,
            objects: HashMap::new(),
        }
    }

    /// 发放新ID
    pub fn generate_id(&mut self) -> DataId {
        let id = DataId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// 覆盖计数器（用于从持久化状态恢复）
    pub fn set_next_id(&mut self, next: DataId) {
        self.next_id = next.0;
    }

    /// 下一个将要发放的ID
    pub fn next_id(&self) -> DataId {
        DataId(self.next_id)
    }

    pub fn get(&self, id: DataId) -> Option<&DataObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: DataId) -> Option<&mut DataObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: DataId) -> bool {
        self.objects.contains_key(&id)
    }

    /// 登记对象
    ///
    /// 计数器会被推进到对象ID之后，保证以后发放的ID不会与之冲突。
    pub(crate) fn insert(&mut self, object: DataObject) {
        let id = object.id();
        if id.0 >= self.next_id {
            self.next_id = id.0.saturating_add(1);
        }
        self.objects.insert(id, object);
    }

    pub(crate) fn remove(&mut self, id: DataId) -> Option<DataObject> {
        self.objects.remove(&id)
    }

    pub(crate) fn clear(&mut self) {
        self.objects.clear();
    }

    /// 活动对象数量
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// 遍历所有活动对象（无序）
    pub fn iter(&self) -> impl Iterator<Item = &DataObject> {
        self.objects.values()
    }

    /// 已登记的最大ID
    pub fn max_id(&self) -> Option<DataId> {
        self.objects.keys().max().copied()
    }
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self::new()
    }
}
