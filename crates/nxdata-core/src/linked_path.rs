//! 链接路径
//!
//! 一次解析后缓存的ID链。只要链上的对象都还注册着就保持有效，
//! 重新校验只查注册表，不再按名称搜索。

use crate::id::{DataId, StructureId};
use crate::object::DataObject;
use crate::path::DataPath;
use crate::structure::DataStructure;

/// 链接路径
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkedPath {
    /// 所属数据结构实例
    owner: StructureId,

    /// 从顶层到目标的ID链
    ids: Vec<DataId>,
}

impl LinkedPath {
    pub(crate) fn new(owner: StructureId, ids: Vec<DataId>) -> Self {
        Self { owner, ids }
    }

    /// 空路径（无效）
    pub fn empty() -> Self {
        Self {
            owner: StructureId::NULL,
            ids: Vec::new(),
        }
    }

    pub fn owner(&self) -> StructureId {
        self.owner
    }

    pub fn ids(&self) -> &[DataId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 目标对象ID
    pub fn id(&self) -> Option<DataId> {
        self.ids.last().copied()
    }

    /// 检查路径是否属于 `data` 且链上每个ID仍然存在
    pub fn is_valid(&self, data: &DataStructure) -> bool {
        !self.ids.is_empty()
            && self.owner == data.instance_id()
            && self.ids.iter().all(|&id| data.contains_data(id))
    }

    /// 目标对象
    pub fn data<'a>(&self, data: &'a DataStructure) -> Option<&'a DataObject> {
        if !self.is_valid(data) {
            return None;
        }
        data.get_data(self.id()?)
    }

    /// 第 `index` 段当前的名称
    pub fn name_at<'a>(&self, data: &'a DataStructure, index: usize) -> Option<&'a str> {
        if self.owner != data.instance_id() {
            return None;
        }
        data.get_data(*self.ids.get(index)?).map(DataObject::name)
    }

    /// 按当前名称重建数据路径（对象被重命名后结果会随之变化）
    pub fn to_data_path(&self, data: &DataStructure) -> Option<DataPath> {
        if !self.is_valid(data) {
            return None;
        }
        let names = self
            .ids
            .iter()
            .map(|&id| data.get_data(id).map(|object| object.name().to_string()))
            .collect::<Option<Vec<_>>>()?;
        DataPath::new(names).ok()
    }
}

impl Default for LinkedPath {
    fn default() -> Self {
        Self::empty()
    }
}
