//! 层次化容器格式
//!
//! 与文件无关的 组/属性/数据集 模型。数据结构写入这个模型，
//! 具体的文件后端（见 `nxdata-file`）再负责把模型落盘。
//!
//! # 布局
//!
//! ```text
//! DataStructure            (组, NextObjectId)
//! ├── A                    (组, ObjectId, ObjectType = DataGroup)
//! │   └── B                (组)
//! │       └── C            (数据集, ObjectType = DataArray, TupleDimensions, ComponentDimensions)
//! └── D                    (组)
//!     └── C                (组, ObjectType = Link, ObjectId = C 的ID)
//! ```
//!
//! 标签字符串是兼容性约定的一部分，不能随意修改。

mod reader;
mod writer;

pub use reader::DataStructureReader;
pub use writer::DataStructureWriter;

use crate::array::DataType;
use crate::error::DataStructureError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// 数据结构组名
pub const DATA_STRUCTURE_TAG: &str = "DataStructure";
/// 下一个ID
pub const NEXT_ID_TAG: &str = "NextObjectId";
/// 对象ID
pub const OBJECT_ID_TAG: &str = "ObjectId";
/// 对象类型
pub const OBJECT_TYPE_TAG: &str = "ObjectType";
/// 多父链接记录的类型名
pub const LINK_TYPE: &str = "Link";
/// 元组维度
pub const TUPLE_DIMENSIONS_TAG: &str = "TupleDimensions";
/// 分量维度
pub const COMPONENT_DIMENSIONS_TAG: &str = "ComponentDimensions";
/// 几何尺寸
pub const DIMENSIONS_TAG: &str = "Dimensions";
/// 几何原点
pub const ORIGIN_TAG: &str = "Origin";
/// 几何间距
pub const SPACING_TAG: &str = "Spacing";

/// 格式读写错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("Missing group: {0}")]
    MissingGroup(String),

    #[error("Node '{node}' is missing attribute '{attribute}'")]
    MissingAttribute { node: String, attribute: String },

    #[error("Attribute '{attribute}' on '{node}' has the wrong type")]
    AttributeType { node: String, attribute: String },

    #[error("Unknown object type '{object_type}' on '{node}'")]
    UnknownObjectType { node: String, object_type: String },

    #[error("Node '{node}' is a {found} but a {expected} was expected")]
    NodeKind {
        node: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Dataset '{node}' payload is malformed: {reason}")]
    Payload { node: String, reason: String },

    #[error("Link to object {0} has no target")]
    DanglingLink(u64),

    #[error("Structure error: {0}")]
    Structure(#[from] DataStructureError),
}

/// 属性值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    UInt(u64),
    Int(i64),
    Float(f64),
    Text(String),
    UIntList(Vec<u64>),
    FloatList(Vec<f64>),
}

/// 属性表
pub type Attributes = BTreeMap<String, AttributeValue>;

/// 数据集元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetType {
    /// 小端数值
    Numeric(DataType),
    /// 以NUL分隔的UTF-8字符串
    Text,
}

/// 数据集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub attributes: Attributes,
    pub dataset_type: DatasetType,
    pub bytes: Vec<u8>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, dataset_type: DatasetType, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            dataset_type,
            bytes,
        }
    }
}

/// 容器节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContainerNode {
    Group(ContainerGroup),
    Dataset(Dataset),
}

impl ContainerNode {
    pub fn name(&self) -> &str {
        match self {
            ContainerNode::Group(group) => &group.name,
            ContainerNode::Dataset(dataset) => &dataset.name,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            ContainerNode::Group(group) => &group.attributes,
            ContainerNode::Dataset(dataset) => &dataset.attributes,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ContainerNode::Group(_) => "group",
            ContainerNode::Dataset(_) => "dataset",
        }
    }
}

/// 容器组
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerGroup {
    pub name: String,
    pub attributes: Attributes,
    /// 子节点，保持写入顺序
    pub children: Vec<ContainerNode>,
}

impl ContainerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn set_attribute(&mut self, name: &str, value: AttributeValue) {
        self.attributes.insert(name.to_string(), value);
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn add_group(&mut self, group: ContainerGroup) {
        self.children.push(ContainerNode::Group(group));
    }

    pub fn add_dataset(&mut self, dataset: Dataset) {
        self.children.push(ContainerNode::Dataset(dataset));
    }

    pub fn node(&self, name: &str) -> Option<&ContainerNode> {
        self.children.iter().find(|node| node.name() == name)
    }

    pub fn group(&self, name: &str) -> Option<&ContainerGroup> {
        match self.node(name)? {
            ContainerNode::Group(group) => Some(group),
            ContainerNode::Dataset(_) => None,
        }
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        match self.node(name)? {
            ContainerNode::Dataset(dataset) => Some(dataset),
            ContainerNode::Group(_) => None,
        }
    }

    /// 子树中的节点总数（不含自身）
    pub fn node_count(&self) -> usize {
        self.children
            .iter()
            .map(|node| match node {
                ContainerNode::Group(group) => 1 + group.node_count(),
                ContainerNode::Dataset(_) => 1,
            })
            .sum()
    }
}

/// 按类型读取属性
pub(crate) fn read_u64(node: &str, attributes: &Attributes, name: &str) -> Result<u64, FormatError> {
    match attributes.get(name) {
        Some(AttributeValue::UInt(value)) => Ok(*value),
        Some(_) => Err(attribute_type(node, name)),
        None => Err(missing_attribute(node, name)),
    }
}

pub(crate) fn read_text<'a>(node: &str, attributes: &'a Attributes, name: &str) -> Result<&'a str, FormatError> {
    match attributes.get(name) {
        Some(AttributeValue::Text(value)) => Ok(value.as_str()),
        Some(_) => Err(attribute_type(node, name)),
        None => Err(missing_attribute(node, name)),
    }
}

pub(crate) fn read_shape(node: &str, attributes: &Attributes, name: &str) -> Result<Vec<usize>, FormatError> {
    match attributes.get(name) {
        Some(AttributeValue::UIntList(values)) => values
            .iter()
            .map(|&value| usize::try_from(value).map_err(|_| attribute_type(node, name)))
            .collect(),
        Some(_) => Err(attribute_type(node, name)),
        None => Err(missing_attribute(node, name)),
    }
}

pub(crate) fn read_vector3(node: &str, attributes: &Attributes, name: &str) -> Result<[f32; 3], FormatError> {
    match attributes.get(name) {
        Some(AttributeValue::FloatList(values)) if values.len() == 3 => {
            Ok([values[0] as f32, values[1] as f32, values[2] as f32])
        }
        Some(_) => Err(attribute_type(node, name)),
        None => Err(missing_attribute(node, name)),
    }
}

pub(crate) fn shape_attribute(shape: &[usize]) -> AttributeValue {
    AttributeValue::UIntList(shape.iter().map(|&value| value as u64).collect())
}

fn missing_attribute(node: &str, name: &str) -> FormatError {
    FormatError::MissingAttribute {
        node: node.to_string(),
        attribute: name.to_string(),
    }
}

fn attribute_type(node: &str, name: &str) -> FormatError {
    FormatError::AttributeType {
        node: node.to_string(),
        attribute: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_navigation() {
        let mut group = ContainerGroup::new(DATA_STRUCTURE_TAG);
        group.set_attribute(NEXT_ID_TAG, AttributeValue::UInt(7));
        group.add_dataset(Dataset::new("Values", DatasetType::Numeric(DataType::UInt8), vec![1, 2]));
        let mut root = ContainerGroup::new("");
        root.add_group(group);

        let group = root.group("DataStructure").unwrap();
        assert_eq!(read_u64(&group.name, &group.attributes, NEXT_ID_TAG), Ok(7));
        assert!(group.dataset("Values").is_some());
        assert!(group.group("Values").is_none());
        assert_eq!(root.node_count(), 2);
    }

    #[test]
    fn test_attribute_errors() {
        let mut attributes = Attributes::new();
        attributes.insert("Name".to_string(), AttributeValue::Text("x".to_string()));

        assert!(matches!(
            read_u64("node", &attributes, "Name"),
            Err(FormatError::AttributeType { .. })
        ));
        assert!(matches!(
            read_shape("node", &attributes, "Missing"),
            Err(FormatError::MissingAttribute { .. })
        ));
        assert_eq!(read_text("node", &attributes, "Name"), Ok("x"));
    }
}
