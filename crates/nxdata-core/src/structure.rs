//! 数据结构
//!
//! `DataStructure` 持有注册表、顶层容器和通知通道，是所有结构性修改的唯一入口。
//!
//! # 所有权
//!
//! 注册表是对象的唯一所有者；容器和父引用只保存ID。每个对象记录自己的父容器，
//! 当对象不再属于任何容器（包括顶层）时被注销，并发出 `Removed` 通知。
//! 只从部分父容器中解除链接不会注销对象。
//!
//! # 失败语义
//!
//! 解析失败（路径不存在、中间节点不是容器、ID未注册）返回 `None` 或 `false`；
//! 需要失败原因时使用 `try_*` 系列方法。

use crate::data_map::{DataMap, InsertError};
use crate::error::DataStructureError;
use crate::group::DataGroup;
use crate::id::{DataId, IdRegistry, StructureId};
use crate::linked_path::LinkedPath;
use crate::message::{DataStructureMessage, ObserverId, Signal};
use crate::object::DataObject;
use crate::path::{is_valid_name, DataPath};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// 顶层容器在错误信息中的名称
const TOP_LEVEL_NAME: &str = "DataStructure";

/// 层次化数据仓库
pub struct DataStructure {
    /// 实例标识
    instance: StructureId,

    /// ID发放和对象存储
    registry: IdRegistry,

    /// 顶层容器
    root: DataMap,

    /// 观察者
    signal: Signal,

    /// 拆除过程中为 `false`，此时不再发送通知
    valid: bool,
}

impl DataStructure {
    /// 创建空数据结构
    pub fn new() -> Self {
        Self {
            instance: StructureId::new(),
            registry: IdRegistry::new(),
            root: DataMap::new(),
            signal: Signal::new(),
            valid: true,
        }
    }

    pub fn instance_id(&self) -> StructureId {
        self.instance
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// 发放新ID
    pub fn generate_id(&mut self) -> DataId {
        self.registry.generate_id()
    }

    /// 覆盖ID计数器
    pub fn set_next_id(&mut self, next: DataId) {
        self.registry.set_next_id(next);
    }

    pub fn next_id(&self) -> DataId {
        self.registry.next_id()
    }

    /// 活动对象数量
    pub fn get_size(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    /// 顶层对象ID，按插入顺序
    pub fn top_level_ids(&self) -> &[DataId] {
        self.root.ids()
    }

    /// 遍历顶层对象
    pub fn top_level(&self) -> impl Iterator<Item = &DataObject> + '_ {
        self.root.ids().iter().filter_map(|&id| self.registry.get(id))
    }

    pub(crate) fn root(&self) -> &DataMap {
        &self.root
    }

    pub fn get_data(&self, id: DataId) -> Option<&DataObject> {
        self.registry.get(id)
    }

    pub fn get_data_mut(&mut self, id: DataId) -> Option<&mut DataObject> {
        self.registry.get_mut(id)
    }

    pub fn contains_data(&self, id: DataId) -> bool {
        self.registry.contains(id)
    }

    /// 沿路径逐段解析，返回ID链
    pub fn resolve(&self, path: &DataPath) -> Result<Vec<DataId>, DataStructureError> {
        let mut ids: Vec<DataId> = Vec::with_capacity(path.len());
        let mut current: Option<&DataObject> = None;

        for name in path.iter() {
            let child = match current {
                None => self.root.get(name),
                Some(object) => object
                    .as_container()
                    .ok_or_else(|| DataStructureError::NotAContainer(object.name().to_string()))?
                    .get(name),
            }
            .ok_or_else(|| DataStructureError::NotFound(path.clone()))?;

            current = Some(
                self.registry
                    .get(child)
                    .ok_or(DataStructureError::MissingId(child))?,
            );
            ids.push(child);
        }

        Ok(ids)
    }

    pub fn get_data_by_path(&self, path: &DataPath) -> Option<&DataObject> {
        let id = self.get_id(path)?;
        self.registry.get(id)
    }

    pub fn get_data_by_path_mut(&mut self, path: &DataPath) -> Option<&mut DataObject> {
        let id = self.get_id(path)?;
        self.registry.get_mut(id)
    }

    pub fn get_data_by_linked_path(&self, path: &LinkedPath) -> Option<&DataObject> {
        path.data(self)
    }

    /// 路径目标的ID，路径不存在时返回 `None`
    pub fn get_id(&self, path: &DataPath) -> Option<DataId> {
        self.resolve(path).ok()?.last().copied()
    }

    pub fn contains_path(&self, path: &DataPath) -> bool {
        self.get_id(path).is_some()
    }

    /// 解析为链接路径，失败时返回空路径
    pub fn get_linked_path(&self, path: &DataPath) -> LinkedPath {
        match self.resolve(path) {
            Ok(ids) => LinkedPath::new(self.instance, ids),
            Err(_) => LinkedPath::empty(),
        }
    }

    /// 解析路径，缺失的段自动创建为 `DataGroup`
    ///
    /// 已存在的中间节点不是容器时返回错误。
    pub fn make_path(&mut self, path: &DataPath) -> Result<LinkedPath, DataStructureError> {
        let mut ids: Vec<DataId> = Vec::with_capacity(path.len());

        for name in path.iter() {
            let parent = ids.last().copied();
            let existing = match parent {
                None => self.root.get(name),
                Some(parent_id) => {
                    let parent_object = self
                        .registry
                        .get(parent_id)
                        .ok_or(DataStructureError::MissingId(parent_id))?;
                    parent_object
                        .as_container()
                        .ok_or_else(|| DataStructureError::NotAContainer(parent_object.name().to_string()))?
                        .get(name)
                }
            };

            let id = match existing {
                Some(id) => id,
                None => {
                    let id = DataGroup::create(self, name, parent)?;
                    debug!(%id, name, "created intermediate group");
                    id
                }
            };
            ids.push(id);
        }

        Ok(LinkedPath::new(self.instance, ids))
    }

    /// 将新对象加入数据结构
    ///
    /// 这是所有工厂方法共用的插入路径：放入顶层或 `parent` 指定的容器，
    /// 登记到注册表并发出 `Added` 通知。
    pub fn insert_object(
        &mut self,
        mut object: DataObject,
        parent: Option<DataId>,
    ) -> Result<DataId, DataStructureError> {
        let id = object.id();
        if !is_valid_name(object.name()) {
            return Err(DataStructureError::InvalidName(object.name().to_string()));
        }
        // u64::MAX 留作计数器耗尽的标记
        if id.value() == u64::MAX {
            return Err(DataStructureError::IdOutOfRange(id));
        }
        if self.registry.contains(id) {
            return Err(DataStructureError::IdInUse(id));
        }
        // 容器只能以空状态插入，子对象之后再逐个链接
        if object.as_container().is_some_and(|children| !children.is_empty()) {
            warn!(%id, name = object.name(), "insertion rejected: container already has children");
            return Err(DataStructureError::PopulatedContainer(object.name().to_string()));
        }
        object.take_parents();

        match parent {
            Some(parent_id) => {
                let parent_object = self
                    .registry
                    .get_mut(parent_id)
                    .ok_or(DataStructureError::MissingId(parent_id))?;
                if let Err(err) = parent_object.can_insert(&object) {
                    warn!(%id, parent = %parent_id, "insertion rejected: {}", err);
                    return Err(err);
                }

                let parent_name = parent_object.name().to_string();
                let container = parent_object
                    .as_container_mut()
                    .ok_or_else(|| DataStructureError::NotAContainer(parent_name.clone()))?;
                container
                    .insert(id, object.name())
                    .map_err(|err| insert_error(err, id, object.name(), &parent_name))?;
                object.add_parent(parent_id);
            }
            None => {
                self.root
                    .insert(id, object.name())
                    .map_err(|err| insert_error(err, id, object.name(), TOP_LEVEL_NAME))?;
            }
        }

        self.registry.insert(object);
        self.notify(DataStructureMessage::Added { id });
        Ok(id)
    }

    /// `insert_object` 的布尔形式
    pub fn finish_adding_object(&mut self, object: DataObject, parent: Option<DataId>) -> bool {
        self.insert_object(object, parent).is_ok()
    }

    /// 从所有父容器中移除对象并注销
    ///
    /// 只属于该对象的子对象会一并注销。
    pub fn remove_data(&mut self, id: DataId) -> bool {
        let Some(object) = self.registry.get_mut(id) else {
            return false;
        };

        for parent_id in object.take_parents() {
            if let Some(container) = self
                .registry
                .get_mut(parent_id)
                .and_then(DataObject::as_container_mut)
            {
                container.remove(id);
            }
        }
        self.root.remove(id);

        self.purge(id);
        true
    }

    pub fn remove_data_by_path(&mut self, path: &DataPath) -> bool {
        match self.get_id(path) {
            Some(id) => self.remove_data(id),
            None => false,
        }
    }

    /// 把已有对象额外链接到另一个容器下，原有的父容器保持不变
    pub fn set_additional_parent(&mut self, target: DataId, new_parent: DataId) -> bool {
        match self.try_set_additional_parent(target, new_parent) {
            Ok(()) => true,
            Err(err) => {
                debug!(%target, parent = %new_parent, "set_additional_parent failed: {}", err);
                false
            }
        }
    }

    pub fn try_set_additional_parent(
        &mut self,
        target: DataId,
        new_parent: DataId,
    ) -> Result<(), DataStructureError> {
        let target_object = self
            .registry
            .get(target)
            .ok_or(DataStructureError::MissingId(target))?;
        let parent_object = self
            .registry
            .get(new_parent)
            .ok_or(DataStructureError::MissingId(new_parent))?;
        parent_object.can_insert(target_object)?;

        if target == new_parent || self.is_ancestor(target, new_parent) {
            warn!(%target, parent = %new_parent, "refusing to create a cycle");
            return Err(DataStructureError::WouldCreateCycle {
                child: target,
                parent: new_parent,
            });
        }

        let name = target_object.name().to_string();
        let parent_name = parent_object.name().to_string();
        let container = self
            .registry
            .get_mut(new_parent)
            .and_then(DataObject::as_container_mut)
            .ok_or_else(|| DataStructureError::NotAContainer(parent_name.clone()))?;
        container
            .insert(target, &name)
            .map_err(|err| insert_error(err, target, &name, &parent_name))?;

        if let Some(target_object) = self.registry.get_mut(target) {
            target_object.add_parent(new_parent);
        }

        debug!(%target, parent = %new_parent, "linked additional parent");
        self.notify(DataStructureMessage::Reparented {
            target,
            parent: new_parent,
            added: true,
        });
        Ok(())
    }

    /// 解除一个父容器链接，其他链接不受影响
    ///
    /// 如果这是最后一个链接，对象被注销。
    pub fn remove_parent(&mut self, target: DataId, parent: DataId) -> bool {
        match self.try_remove_parent(target, parent) {
            Ok(()) => true,
            Err(err) => {
                debug!(%target, %parent, "remove_parent failed: {}", err);
                false
            }
        }
    }

    pub fn try_remove_parent(&mut self, target: DataId, parent: DataId) -> Result<(), DataStructureError> {
        if !self.registry.contains(target) {
            return Err(DataStructureError::MissingId(target));
        }

        let parent_object = self
            .registry
            .get_mut(parent)
            .ok_or(DataStructureError::MissingId(parent))?;
        let parent_name = parent_object.name().to_string();
        let container = parent_object
            .as_container_mut()
            .ok_or_else(|| DataStructureError::NotAContainer(parent_name.clone()))?;
        if !container.remove(target) {
            return Err(DataStructureError::NotAChild {
                child: target,
                parent: parent_name,
            });
        }

        if let Some(target_object) = self.registry.get_mut(target) {
            target_object.remove_parent(parent);
        }

        debug!(%target, %parent, "removed parent link");
        self.notify(DataStructureMessage::Reparented {
            target,
            parent,
            added: false,
        });

        if self.parent_count(target) == 0 {
            self.purge(target);
        }
        Ok(())
    }

    /// 重命名对象，新名称必须在它的每个父容器中都可用
    pub fn rename_data(&mut self, id: DataId, new_name: &str) -> bool {
        self.try_rename_data(id, new_name).is_ok()
    }

    pub fn try_rename_data(&mut self, id: DataId, new_name: &str) -> Result<(), DataStructureError> {
        if !is_valid_name(new_name) {
            return Err(DataStructureError::InvalidName(new_name.to_string()));
        }
        let object = self.registry.get(id).ok_or(DataStructureError::MissingId(id))?;
        let parents = object.parents().to_vec();

        if self.root.contains_id(id) && !self.root.is_name_available(new_name, id) {
            return Err(DataStructureError::DuplicateName {
                name: new_name.to_string(),
                parent: TOP_LEVEL_NAME.to_string(),
            });
        }
        for &parent_id in &parents {
            let Some(parent_object) = self.registry.get(parent_id) else {
                continue;
            };
            let available = parent_object
                .as_container()
                .map_or(true, |container| container.is_name_available(new_name, id));
            if !available {
                return Err(DataStructureError::DuplicateName {
                    name: new_name.to_string(),
                    parent: parent_object.name().to_string(),
                });
            }
        }

        if self.root.contains_id(id) {
            self.root
                .rename(id, new_name)
                .map_err(|err| insert_error(err, id, new_name, TOP_LEVEL_NAME))?;
        }
        for parent_id in parents {
            let Some(parent_object) = self.registry.get_mut(parent_id) else {
                continue;
            };
            let parent_name = parent_object.name().to_string();
            if let Some(container) = parent_object.as_container_mut() {
                container
                    .rename(id, new_name)
                    .map_err(|err| insert_error(err, id, new_name, &parent_name))?;
            }
        }
        if let Some(object) = self.registry.get_mut(id) {
            object.set_name(new_name.to_string());
        }
        Ok(())
    }

    /// 所有能到达该对象的路径
    pub fn get_data_paths(&self, id: DataId) -> Vec<DataPath> {
        let Some(object) = self.registry.get(id) else {
            return Vec::new();
        };

        let mut paths = Vec::new();
        if self.root.contains_id(id) {
            if let Ok(path) = DataPath::new([object.name()]) {
                paths.push(path);
            }
        }
        for &parent in object.parents() {
            for parent_path in self.get_data_paths(parent) {
                if let Ok(path) = parent_path.create_child_path(object.name()) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// 移除所有顶层对象并清空注册表，ID计数器保持不变
    pub fn clear(&mut self) {
        let top_level: Vec<DataId> = self.root.ids().to_vec();
        for id in top_level {
            self.remove_data(id);
        }
        self.registry.clear();
    }

    /// 注册观察者
    pub fn connect<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&DataStructure, &DataStructureMessage) + Send + 'static,
    {
        self.signal.connect(Box::new(observer))
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.signal.disconnect(id)
    }

    pub fn observer_count(&self) -> usize {
        self.signal.len()
    }

    /// 把已存在的对象链接到顶层（读取文件时重建多父链接用）
    pub(crate) fn link_top_level(&mut self, id: DataId) -> Result<(), DataStructureError> {
        let object = self.registry.get(id).ok_or(DataStructureError::MissingId(id))?;
        let name = object.name().to_string();
        self.root
            .insert(id, &name)
            .map_err(|err| insert_error(err, id, &name, TOP_LEVEL_NAME))
    }

    /// 树形文本表示，重复出现的对象标记为链接
    pub fn tree_string(&self) -> String {
        let mut result = String::new();
        let mut seen = HashSet::new();
        for &id in self.root.ids() {
            self.build_tree_string(id, 0, &mut seen, &mut result);
        }
        result
    }

    fn build_tree_string(&self, id: DataId, depth: usize, seen: &mut HashSet<DataId>, result: &mut String) {
        let Some(object) = self.registry.get(id) else {
            return;
        };

        let first = seen.insert(id);
        let indent = "  ".repeat(depth);
        let marker = if first { "" } else { " -> link" };
        result.push_str(&format!(
            "{}{} [{}] {}{}\n",
            indent,
            object.name(),
            id,
            object.object_type(),
            marker
        ));

        if first {
            if let Some(children) = object.as_container() {
                for &child in children.ids() {
                    self.build_tree_string(child, depth + 1, seen, result);
                }
            }
        }
    }

    /// 父容器数量（顶层算一个）
    fn parent_count(&self, id: DataId) -> usize {
        let parents = self.registry.get(id).map_or(0, |object| object.parents().len());
        parents + usize::from(self.root.contains_id(id))
    }

    /// `ancestor` 是否位于 `node` 的某条父链上
    fn is_ancestor(&self, ancestor: DataId, node: DataId) -> bool {
        let mut stack = vec![node];
        let mut visited = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(object) = self.registry.get(current) else {
                continue;
            };
            for &parent in object.parents() {
                if parent == ancestor {
                    return true;
                }
                stack.push(parent);
            }
        }
        false
    }

    /// 注销已没有父容器的对象，并级联注销只属于它的子对象
    fn purge(&mut self, id: DataId) {
        let Some(object) = self.registry.remove(id) else {
            return;
        };

        if let Some(children) = object.as_container() {
            for &child in children.ids() {
                let orphaned = self.registry.get_mut(child).map_or(false, |child_object| {
                    child_object.remove_parent(id);
                    child_object.parents().is_empty()
                }) && !self.root.contains_id(child);

                if orphaned {
                    self.purge(child);
                }
            }
        }

        debug!(%id, name = object.name(), "purged data object");
        self.notify(DataStructureMessage::Removed {
            id,
            name: object.name().to_string(),
        });
    }

    fn notify(&mut self, message: DataStructureMessage) {
        if !self.valid || self.signal.is_empty() {
            return;
        }

        let mut signal = std::mem::take(&mut self.signal);
        signal.emit(self, &message);
        self.signal = signal;
    }
}

fn insert_error(err: InsertError, child: DataId, name: &str, parent: &str) -> DataStructureError {
    match err {
        InsertError::NameTaken => DataStructureError::DuplicateName {
            name: name.to_string(),
            parent: parent.to_string(),
        },
        InsertError::AlreadyPresent => DataStructureError::AlreadyChild {
            child,
            parent: parent.to_string(),
        },
    }
}

impl Default for DataStructure {
    fn default() -> Self {
        Self::new()
    }
}

/// 深复制
///
/// 副本拥有新的实例标识，对象保持原有ID；观察者不会被复制。
impl Clone for DataStructure {
    fn clone(&self) -> Self {
        Self {
            instance: StructureId::new(),
            registry: self.registry.clone(),
            root: self.root.clone(),
            signal: Signal::new(),
            valid: self.valid,
        }
    }
}

impl Drop for DataStructure {
    fn drop(&mut self) {
        // 先标记无效，拆除时不再通知观察者
        self.valid = false;
        self.clear();
    }
}

impl fmt::Debug for DataStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStructure")
            .field("instance", &self.instance)
            .field("size", &self.registry.len())
            .field("next_id", &self.registry.next_id())
            .field("top_level", &self.root.ids())
            .field("signal", &self.signal)
            .finish()
    }
}
