//! 数据结构写出

use super::{
    shape_attribute, AttributeValue, ContainerGroup, Dataset, DatasetType, FormatError,
    COMPONENT_DIMENSIONS_TAG, DATA_STRUCTURE_TAG, DIMENSIONS_TAG, LINK_TYPE, NEXT_ID_TAG,
    OBJECT_ID_TAG, OBJECT_TYPE_TAG, ORIGIN_TAG, SPACING_TAG, TUPLE_DIMENSIONS_TAG,
};
use crate::data_map::DataMap;
use crate::error::DataStructureError;
use crate::geometry::Vector3;
use crate::id::DataId;
use crate::object::{DataObject, DataObjectKind};
use crate::structure::DataStructure;
use std::collections::HashSet;
use tracing::debug;

/// 把数据结构写入容器模型
///
/// 对象第一次出现时完整写出，之后每次出现只写一条链接记录。
#[derive(Debug, Default)]
pub struct DataStructureWriter {
    written: HashSet<DataId>,
    links: usize,
}

impl DataStructureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在 `parent` 下创建 `DataStructure` 组并写入全部对象
    pub fn write(&mut self, data: &DataStructure, parent: &mut ContainerGroup) -> Result<(), FormatError> {
        let mut group = ContainerGroup::new(DATA_STRUCTURE_TAG);
        group.set_attribute(NEXT_ID_TAG, AttributeValue::UInt(data.next_id().value()));

        self.write_children(data, data.root(), &mut group)?;
        parent.add_group(group);

        debug!(objects = self.written.len(), links = self.links, "wrote data structure");
        Ok(())
    }

    fn write_children(
        &mut self,
        data: &DataStructure,
        children: &DataMap,
        group: &mut ContainerGroup,
    ) -> Result<(), FormatError> {
        for &child in children.ids() {
            self.write_object(data, child, group)?;
        }
        Ok(())
    }

    fn write_object(
        &mut self,
        data: &DataStructure,
        id: DataId,
        parent: &mut ContainerGroup,
    ) -> Result<(), FormatError> {
        let object = data.get_data(id).ok_or(DataStructureError::MissingId(id))?;

        if !self.written.insert(id) {
            let mut link = ContainerGroup::new(object.name());
            link.set_attribute(OBJECT_ID_TAG, AttributeValue::UInt(id.value()));
            link.set_attribute(OBJECT_TYPE_TAG, AttributeValue::Text(LINK_TYPE.to_string()));
            parent.add_group(link);
            self.links += 1;
            return Ok(());
        }

        match object.kind() {
            DataObjectKind::Group(group) => {
                let mut node = object_group(object);
                self.write_children(data, group.children(), &mut node)?;
                parent.add_group(node);
            }
            DataObjectKind::AttributeMatrix(matrix) => {
                let mut node = object_group(object);
                node.set_attribute(TUPLE_DIMENSIONS_TAG, shape_attribute(matrix.shape()));
                self.write_children(data, matrix.children(), &mut node)?;
                parent.add_group(node);
            }
            DataObjectKind::ImageGeom(geom) => {
                let mut node = object_group(object);
                node.set_attribute(DIMENSIONS_TAG, shape_attribute(&geom.dimensions()));
                node.set_attribute(ORIGIN_TAG, vector_attribute(geom.origin()));
                node.set_attribute(SPACING_TAG, vector_attribute(geom.spacing()));
                self.write_children(data, geom.children(), &mut node)?;
                parent.add_group(node);
            }
            DataObjectKind::Array(array) => {
                let mut dataset = Dataset::new(
                    object.name(),
                    DatasetType::Numeric(array.data_type()),
                    array.store().to_le_bytes(),
                );
                tag_object(&mut dataset.attributes, object);
                dataset
                    .attributes
                    .insert(TUPLE_DIMENSIONS_TAG.to_string(), shape_attribute(array.tuple_shape()));
                dataset.attributes.insert(
                    COMPONENT_DIMENSIONS_TAG.to_string(),
                    shape_attribute(array.component_shape()),
                );
                parent.add_dataset(dataset);
            }
            DataObjectKind::StringArray(strings) => {
                if strings.values().iter().any(|value| value.contains('\0')) {
                    return Err(FormatError::Payload {
                        node: object.name().to_string(),
                        reason: "strings cannot contain NUL".to_string(),
                    });
                }
                let mut dataset = Dataset::new(
                    object.name(),
                    DatasetType::Text,
                    strings.values().join("\0").into_bytes(),
                );
                tag_object(&mut dataset.attributes, object);
                dataset.attributes.insert(
                    TUPLE_DIMENSIONS_TAG.to_string(),
                    shape_attribute(&[strings.number_of_tuples()]),
                );
                parent.add_dataset(dataset);
            }
        }

        Ok(())
    }
}

fn object_group(object: &DataObject) -> ContainerGroup {
    let mut group = ContainerGroup::new(object.name());
    tag_object(&mut group.attributes, object);
    group
}

fn tag_object(attributes: &mut super::Attributes, object: &DataObject) {
    attributes.insert(OBJECT_ID_TAG.to_string(), AttributeValue::UInt(object.id().value()));
    attributes.insert(
        OBJECT_TYPE_TAG.to_string(),
        AttributeValue::Text(object.object_type().as_str().to_string()),
    );
}

fn vector_attribute(vector: Vector3) -> AttributeValue {
    AttributeValue::FloatList(vector.iter().map(|&value| f64::from(value)).collect())
}

impl DataStructure {
    /// 写入容器模型
    pub fn write_to_container(&self, parent: &mut ContainerGroup) -> Result<(), FormatError> {
        DataStructureWriter::new().write(self, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DataArray;
    use crate::format::ContainerNode;
    use crate::group::DataGroup;

    #[test]
    fn test_second_occurrence_is_a_link() {
        let mut data = DataStructure::new();
        let a = DataGroup::create(&mut data, "A", None).unwrap();
        let c = DataArray::create::<i32>(&mut data, "C", vec![2], vec![1], Some(a)).unwrap();
        let d = DataGroup::create(&mut data, "D", None).unwrap();
        assert!(data.set_additional_parent(c, d));

        let mut root = ContainerGroup::new("");
        data.write_to_container(&mut root).unwrap();

        let group = root.group(DATA_STRUCTURE_TAG).unwrap();
        assert_eq!(group.attribute(NEXT_ID_TAG), Some(&AttributeValue::UInt(4)));

        let primary = group.group("A").unwrap().dataset("C").unwrap();
        assert_eq!(primary.bytes.len(), 8);

        let link = group.group("D").unwrap().group("C").unwrap();
        assert_eq!(
            link.attribute(OBJECT_TYPE_TAG),
            Some(&AttributeValue::Text(LINK_TYPE.to_string()))
        );
        assert_eq!(link.attribute(OBJECT_ID_TAG), Some(&AttributeValue::UInt(c.value())));
        assert!(matches!(group.node("A"), Some(ContainerNode::Group(_))));
    }

    #[test]
    fn test_strings_with_nul_are_rejected() {
        let mut data = DataStructure::new();
        crate::array::StringArray::create(&mut data, "Names", vec!["a\0b".to_string()], None).unwrap();

        let mut root = ContainerGroup::new("");
        assert!(matches!(
            data.write_to_container(&mut root),
            Err(FormatError::Payload { .. })
        ));
    }
}
