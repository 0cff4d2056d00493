//! 数据对象
//!
//! 数据对象是数据结构中带名称和ID的节点。对象可以同时属于多个容器，
//! 因此整体是一个有向无环图而不是树。
//!
//! 对象分为两类：
//! - 容器：`DataGroup`、`AttributeMatrix`、`ImageGeom`，可按名称包含子对象
//! - 叶子：`DataArray`、`StringArray`

use crate::array::{DataArray, StringArray};
use crate::data_map::DataMap;
use crate::error::DataStructureError;
use crate::geometry::ImageGeom;
use crate::group::{AttributeMatrix, DataGroup};
use crate::id::DataId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 对象类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataObjectType {
    DataGroup,
    AttributeMatrix,
    ImageGeom,
    DataArray,
    StringArray,
}

impl DataObjectType {
    /// 持久化使用的类型名
    pub fn as_str(&self) -> &'static str {
        match self {
            DataObjectType::DataGroup => "DataGroup",
            DataObjectType::AttributeMatrix => "AttributeMatrix",
            DataObjectType::ImageGeom => "ImageGeom",
            DataObjectType::DataArray => "DataArray",
            DataObjectType::StringArray => "StringArray",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DataGroup" => Some(DataObjectType::DataGroup),
            "AttributeMatrix" => Some(DataObjectType::AttributeMatrix),
            "ImageGeom" => Some(DataObjectType::ImageGeom),
            "DataArray" => Some(DataObjectType::DataArray),
            "StringArray" => Some(DataObjectType::StringArray),
            _ => None,
        }
    }

    /// 是否可以包含子对象
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            DataObjectType::DataGroup | DataObjectType::AttributeMatrix | DataObjectType::ImageGeom
        )
    }
}

impl fmt::Display for DataObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对象内容
#[derive(Debug, Clone, PartialEq)]
pub enum DataObjectKind {
    Group(DataGroup),
    AttributeMatrix(AttributeMatrix),
    ImageGeom(ImageGeom),
    Array(DataArray),
    StringArray(StringArray),
}

/// 数据对象
#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    /// 唯一标识符
    id: DataId,

    /// 名称（在每个父容器内唯一）
    name: String,

    /// 父容器ID（不含顶层）
    parents: Vec<DataId>,

    /// 内容
    kind: DataObjectKind,
}

impl DataObject {
    /// 创建尚未加入数据结构的对象
    pub fn new(id: DataId, name: impl Into<String>, kind: DataObjectKind) -> Self {
        Self {
            id,
            name: name.into(),
            parents: Vec::new(),
            kind,
        }
    }

    pub fn id(&self) -> DataId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// 父容器ID，按建立链接的顺序
    pub fn parents(&self) -> &[DataId] {
        &self.parents
    }

    pub(crate) fn add_parent(&mut self, parent: DataId) {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }

    pub(crate) fn remove_parent(&mut self, parent: DataId) -> bool {
        let before = self.parents.len();
        self.parents.retain(|&p| p != parent);
        self.parents.len() != before
    }

    pub fn kind(&self) -> &DataObjectKind {
        &self.kind
    }

    /// 取出全部父容器ID
    pub(crate) fn take_parents(&mut self) -> Vec<DataId> {
        std::mem::take(&mut self.parents)
    }

    pub fn object_type(&self) -> DataObjectType {
        match &self.kind {
            DataObjectKind::Group(_) => DataObjectType::DataGroup,
            DataObjectKind::AttributeMatrix(_) => DataObjectType::AttributeMatrix,
            DataObjectKind::ImageGeom(_) => DataObjectType::ImageGeom,
            DataObjectKind::Array(_) => DataObjectType::DataArray,
            DataObjectKind::StringArray(_) => DataObjectType::StringArray,
        }
    }

    pub fn is_container(&self) -> bool {
        self.as_container().is_some()
    }

    /// 容器视图，叶子对象返回 `None`
    pub fn as_container(&self) -> Option<&DataMap> {
        match &self.kind {
            DataObjectKind::Group(group) => Some(group.children()),
            DataObjectKind::AttributeMatrix(matrix) => Some(matrix.children()),
            DataObjectKind::ImageGeom(geom) => Some(geom.children()),
            DataObjectKind::Array(_) | DataObjectKind::StringArray(_) => None,
        }
    }

    pub(crate) fn as_container_mut(&mut self) -> Option<&mut DataMap> {
        match &mut self.kind {
            DataObjectKind::Group(group) => Some(group.children_mut()),
            DataObjectKind::AttributeMatrix(matrix) => Some(matrix.children_mut()),
            DataObjectKind::ImageGeom(geom) => Some(geom.children_mut()),
            DataObjectKind::Array(_) | DataObjectKind::StringArray(_) => None,
        }
    }

    /// 按名称查找子对象ID
    pub fn child(&self, name: &str) -> Option<DataId> {
        self.as_container()?.get(name)
    }

    pub fn as_array(&self) -> Option<&DataArray> {
        match &self.kind {
            DataObjectKind::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut DataArray> {
        match &mut self.kind {
            DataObjectKind::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_string_array(&self) -> Option<&StringArray> {
        match &self.kind {
            DataObjectKind::StringArray(strings) => Some(strings),
            _ => None,
        }
    }

    pub fn as_string_array_mut(&mut self) -> Option<&mut StringArray> {
        match &mut self.kind {
            DataObjectKind::StringArray(strings) => Some(strings),
            _ => None,
        }
    }

    pub fn as_attribute_matrix(&self) -> Option<&AttributeMatrix> {
        match &self.kind {
            DataObjectKind::AttributeMatrix(matrix) => Some(matrix),
            _ => None,
        }
    }

    pub fn as_image_geom(&self) -> Option<&ImageGeom> {
        match &self.kind {
            DataObjectKind::ImageGeom(geom) => Some(geom),
            _ => None,
        }
    }

    pub fn as_image_geom_mut(&mut self) -> Option<&mut ImageGeom> {
        match &mut self.kind {
            DataObjectKind::ImageGeom(geom) => Some(geom),
            _ => None,
        }
    }

    /// 叶子数组的元组数
    pub fn tuple_count(&self) -> Option<usize> {
        match &self.kind {
            DataObjectKind::Array(array) => Some(array.number_of_tuples()),
            DataObjectKind::StringArray(strings) => Some(strings.number_of_tuples()),
            _ => None,
        }
    }

    /// 检查本对象作为容器能否接收 `child`（不检查名称冲突）
    pub fn can_insert(&self, child: &DataObject) -> Result<(), DataStructureError> {
        match &self.kind {
            DataObjectKind::Group(_) | DataObjectKind::ImageGeom(_) => Ok(()),
            DataObjectKind::AttributeMatrix(matrix) => matrix.check_child(&self.name, child),
            DataObjectKind::Array(_) | DataObjectKind::StringArray(_) => {
                Err(DataStructureError::NotAContainer(self.name.clone()))
            }
        }
    }
}
