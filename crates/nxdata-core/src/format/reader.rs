//! 数据结构读取
//!
//! 先按容器模型重建主树，再恢复链接记录描述的额外父容器，
//! 因为链接可能出现在其目标对象之前。

use super::{
    read_shape, read_text, read_u64, read_vector3, ContainerGroup, ContainerNode, Dataset, DatasetType,
    FormatError, COMPONENT_DIMENSIONS_TAG, DATA_STRUCTURE_TAG, DIMENSIONS_TAG, LINK_TYPE, NEXT_ID_TAG,
    OBJECT_ID_TAG, OBJECT_TYPE_TAG, ORIGIN_TAG, SPACING_TAG, TUPLE_DIMENSIONS_TAG,
};
use crate::array::{shape_product, DataArray, DataStore, StringArray};
use crate::geometry::{ImageGeom, Vector3};
use crate::group::{AttributeMatrix, DataGroup};
use crate::id::DataId;
use crate::object::{DataObject, DataObjectKind, DataObjectType};
use crate::structure::DataStructure;
use tracing::debug;

/// 从容器模型重建数据结构
#[derive(Debug, Default)]
pub struct DataStructureReader {
    /// 待恢复的链接：(目标, 父容器，`None` 表示顶层)
    links: Vec<(DataId, Option<DataId>)>,
}

impl DataStructureReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取 `parent` 下的 `DataStructure` 组
    ///
    /// 恢复后的ID计数器不小于已读对象的最大ID加一。
    pub fn read(&mut self, parent: &ContainerGroup) -> Result<DataStructure, FormatError> {
        let group = parent
            .group(DATA_STRUCTURE_TAG)
            .ok_or_else(|| FormatError::MissingGroup(DATA_STRUCTURE_TAG.to_string()))?;
        let stored_next = read_u64(&group.name, &group.attributes, NEXT_ID_TAG)?;

        let mut data = DataStructure::new();
        for node in &group.children {
            self.read_node(&mut data, node, None)?;
        }

        let links = std::mem::take(&mut self.links);
        let link_count = links.len();
        for (target, parent) in links {
            if !data.contains_data(target) {
                return Err(FormatError::DanglingLink(target.value()));
            }
            match parent {
                Some(parent) => data.try_set_additional_parent(target, parent)?,
                None => data.link_top_level(target)?,
            }
        }

        let next = data
            .registry()
            .max_id()
            .map_or(stored_next, |max| stored_next.max(max.value().saturating_add(1)));
        data.set_next_id(DataId::from_raw(next));

        debug!(objects = data.get_size(), links = link_count, next_id = next, "read data structure");
        Ok(data)
    }

    fn read_node(
        &mut self,
        data: &mut DataStructure,
        node: &ContainerNode,
        parent: Option<DataId>,
    ) -> Result<(), FormatError> {
        let name = node.name();
        let attributes = node.attributes();
        let object_type = read_text(name, attributes, OBJECT_TYPE_TAG)?;
        let id = DataId::from_raw(read_u64(name, attributes, OBJECT_ID_TAG)?);

        if object_type == LINK_TYPE {
            self.links.push((id, parent));
            return Ok(());
        }

        let tag = DataObjectType::from_name(object_type).ok_or_else(|| FormatError::UnknownObjectType {
            node: name.to_string(),
            object_type: object_type.to_string(),
        })?;

        let (kind, children) = match (tag, node) {
            (DataObjectType::DataGroup, ContainerNode::Group(group)) => {
                (DataObjectKind::Group(DataGroup::new()), Some(group))
            }
            (DataObjectType::AttributeMatrix, ContainerNode::Group(group)) => {
                let shape = read_shape(name, attributes, TUPLE_DIMENSIONS_TAG)?;
                let matrix = AttributeMatrix::new(shape).map_err(|err| payload(name, err.to_string()))?;
                (DataObjectKind::AttributeMatrix(matrix), Some(group))
            }
            (DataObjectType::ImageGeom, ContainerNode::Group(group)) => {
                (DataObjectKind::ImageGeom(read_image_geom(group)?), Some(group))
            }
            (DataObjectType::DataArray, ContainerNode::Dataset(dataset)) => {
                (DataObjectKind::Array(read_array(dataset)?), None)
            }
            (DataObjectType::StringArray, ContainerNode::Dataset(dataset)) => {
                (DataObjectKind::StringArray(read_strings(dataset)?), None)
            }
            (expected, found) => {
                return Err(FormatError::NodeKind {
                    node: name.to_string(),
                    expected: if expected.is_container() { "group" } else { "dataset" },
                    found: found.kind_name(),
                });
            }
        };

        data.insert_object(DataObject::new(id, name, kind), parent)?;

        if let Some(group) = children {
            for child in &group.children {
                self.read_node(data, child, Some(id))?;
            }
        }
        Ok(())
    }
}

fn read_image_geom(group: &ContainerGroup) -> Result<ImageGeom, FormatError> {
    let name = group.name.as_str();
    let dimensions = read_shape(name, &group.attributes, DIMENSIONS_TAG)?;
    let dimensions = <[usize; 3]>::try_from(dimensions.as_slice()).map_err(|_| FormatError::AttributeType {
        node: name.to_string(),
        attribute: DIMENSIONS_TAG.to_string(),
    })?;
    if shape_product(&dimensions).is_none() {
        return Err(payload(name, "geometry has too many cells"));
    }
    let origin = read_vector3(name, &group.attributes, ORIGIN_TAG)?;
    let spacing = read_vector3(name, &group.attributes, SPACING_TAG)?;

    Ok(ImageGeom::new(dimensions)
        .with_origin(Vector3::new(origin[0], origin[1], origin[2]))
        .with_spacing(Vector3::new(spacing[0], spacing[1], spacing[2])))
}

fn read_array(dataset: &Dataset) -> Result<DataArray, FormatError> {
    let name = dataset.name.as_str();
    let DatasetType::Numeric(data_type) = dataset.dataset_type else {
        return Err(payload(name, "expected a numeric dataset"));
    };

    let store = DataStore::from_le_bytes(data_type, &dataset.bytes)
        .ok_or_else(|| payload(name, format!("byte length is not a multiple of {}", data_type.size_of())))?;
    let tuple_shape = read_shape(name, &dataset.attributes, TUPLE_DIMENSIONS_TAG)?;
    let component_shape = read_shape(name, &dataset.attributes, COMPONENT_DIMENSIONS_TAG)?;

    DataArray::new(tuple_shape, component_shape, store).map_err(|err| payload(name, err.to_string()))
}

fn read_strings(dataset: &Dataset) -> Result<StringArray, FormatError> {
    let name = dataset.name.as_str();
    if dataset.dataset_type != DatasetType::Text {
        return Err(payload(name, "expected a text dataset"));
    }

    let tuples = shape_product(&read_shape(name, &dataset.attributes, TUPLE_DIMENSIONS_TAG)?)
        .ok_or_else(|| payload(name, "string array has too many tuples"))?;
    let text = std::str::from_utf8(&dataset.bytes).map_err(|err| payload(name, err.to_string()))?;

    let values: Vec<String> = if tuples == 0 {
        Vec::new()
    } else {
        text.split('\0').map(str::to_string).collect()
    };
    if values.len() != tuples || (tuples == 0 && !text.is_empty()) {
        return Err(payload(name, format!("expected {} strings", tuples)));
    }
    Ok(StringArray::new(values))
}

fn payload(node: &str, reason: impl Into<String>) -> FormatError {
    FormatError::Payload {
        node: node.to_string(),
        reason: reason.into(),
    }
}

impl DataStructure {
    /// 从容器模型读取
    pub fn read_from_container(parent: &ContainerGroup) -> Result<DataStructure, FormatError> {
        DataStructureReader::new().read(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DataType;
    use crate::error::DataStructureError;
    use crate::format::AttributeValue;
    use crate::path::DataPath;

    fn path(text: &str) -> DataPath {
        text.parse().unwrap()
    }

    fn round_trip(data: &DataStructure) -> DataStructure {
        let mut root = ContainerGroup::new("");
        data.write_to_container(&mut root).unwrap();
        DataStructure::read_from_container(&root).unwrap()
    }

    fn sample() -> DataStructure {
        let mut data = DataStructure::new();
        let a = DataGroup::create(&mut data, "A", None).unwrap();
        let b = DataGroup::create(&mut data, "B", Some(a)).unwrap();
        let c = DataArray::create_with_values(&mut data, "C", vec![5], vec![2], (0..10).collect::<Vec<i32>>(), Some(b))
            .unwrap();
        let d = DataGroup::create(&mut data, "D", None).unwrap();
        assert!(data.set_additional_parent(c, d));

        let geom = ImageGeom::new([2, 2, 1]).with_spacing(Vector3::new(0.5, 0.5, 1.0));
        let image = ImageGeom::create(&mut data, "Image", geom, None).unwrap();
        let cells = AttributeMatrix::create(&mut data, "CellData", vec![4], Some(image)).unwrap();
        DataArray::create_with_values(&mut data, "Mask", vec![4], vec![1], vec![true, false, true, true], Some(cells))
            .unwrap();
        StringArray::create(
            &mut data,
            "Names",
            vec!["one".to_string(), String::new(), "three".to_string()],
            None,
        )
        .unwrap();
        data
    }

    #[test]
    fn test_round_trip_preserves_graph() {
        let data = sample();
        let loaded = round_trip(&data);

        assert_eq!(loaded.get_size(), data.get_size());
        for object in data.registry().iter() {
            let copy = loaded.get_data(object.id()).unwrap();
            assert_eq!(copy.name(), object.name());
            assert_eq!(copy.object_type(), object.object_type());
            assert_eq!(copy.kind(), object.kind());
            assert_eq!(copy.parents(), object.parents());
        }
        assert_eq!(loaded.top_level_ids(), data.top_level_ids());
        assert_eq!(loaded.get_id(&path("D/C")), loaded.get_id(&path("A/B/C")));
        assert!(loaded.next_id() >= data.next_id());

        let values = loaded
            .get_data_by_path(&path("A/B/C"))
            .and_then(DataObject::as_array)
            .and_then(DataArray::as_slice::<i32>)
            .unwrap()
            .to_vec();
        assert_eq!(values, (0..10).collect::<Vec<i32>>());

        let names = loaded.get_data_by_path(&path("Names")).and_then(DataObject::as_string_array).unwrap();
        assert_eq!(names.values(), &["one".to_string(), String::new(), "three".to_string()]);

        let geom = loaded.get_data_by_path(&path("Image")).and_then(DataObject::as_image_geom).unwrap();
        assert_eq!(geom.dimensions(), [2, 2, 1]);
        assert!((geom.spacing().x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_new_ids_do_not_collide_after_round_trip() {
        let data = sample();
        let mut loaded = round_trip(&data);

        let fresh = loaded.generate_id();
        assert!(!data.contains_data(fresh));
        assert!(data.registry().iter().all(|object| object.id() < fresh));
    }

    #[test]
    fn test_stale_next_id_is_raised() {
        let data = sample();
        let mut root = ContainerGroup::new("");
        data.write_to_container(&mut root).unwrap();

        if let Some(ContainerNode::Group(group)) = root.children.first_mut() {
            group.set_attribute(NEXT_ID_TAG, AttributeValue::UInt(1));
        }

        let loaded = DataStructure::read_from_container(&root).unwrap();
        let max = data.registry().max_id().unwrap();
        assert_eq!(loaded.next_id(), DataId::from_raw(max.value() + 1));
    }

    #[test]
    fn test_top_level_link_round_trip() {
        let mut data = DataStructure::new();
        let x = DataGroup::create(&mut data, "X", None).unwrap();
        let y = DataGroup::create(&mut data, "Y", None).unwrap();
        assert!(data.set_additional_parent(y, x));

        let loaded = round_trip(&data);
        assert_eq!(loaded.get_id(&path("Y")), Some(y));
        assert_eq!(loaded.get_id(&path("X/Y")), Some(y));
        assert_eq!(loaded.get_data(y).unwrap().parents(), &[x]);
    }

    #[test]
    fn test_link_before_target() {
        let mut shared = Dataset::new("Shared", DatasetType::Numeric(DataType::UInt8), vec![1, 2]);
        shared.attributes.insert(OBJECT_ID_TAG.to_string(), AttributeValue::UInt(3));
        shared
            .attributes
            .insert(OBJECT_TYPE_TAG.to_string(), AttributeValue::Text("DataArray".to_string()));
        shared
            .attributes
            .insert(TUPLE_DIMENSIONS_TAG.to_string(), AttributeValue::UIntList(vec![2]));
        shared
            .attributes
            .insert(COMPONENT_DIMENSIONS_TAG.to_string(), AttributeValue::UIntList(vec![1]));

        let mut link = ContainerGroup::new("Shared");
        link.set_attribute(OBJECT_ID_TAG, AttributeValue::UInt(3));
        link.set_attribute(OBJECT_TYPE_TAG, AttributeValue::Text(LINK_TYPE.to_string()));

        let mut first = group_node("First", 1);
        first.add_group(link);
        let mut second = group_node("Second", 2);
        second.add_dataset(shared);

        let mut structure = ContainerGroup::new(DATA_STRUCTURE_TAG);
        structure.set_attribute(NEXT_ID_TAG, AttributeValue::UInt(4));
        structure.add_group(first);
        structure.add_group(second);
        let mut root = ContainerGroup::new("");
        root.add_group(structure);

        let loaded = DataStructure::read_from_container(&root).unwrap();
        assert_eq!(loaded.get_id(&path("First/Shared")), Some(DataId(3)));
        assert_eq!(loaded.get_id(&path("Second/Shared")), Some(DataId(3)));
        assert_eq!(loaded.get_size(), 3);
    }

    #[test]
    fn test_malformed_input() {
        let empty = ContainerGroup::new("");
        assert!(matches!(
            DataStructure::read_from_container(&empty),
            Err(FormatError::MissingGroup(_))
        ));

        let mut structure = ContainerGroup::new(DATA_STRUCTURE_TAG);
        structure.set_attribute(NEXT_ID_TAG, AttributeValue::UInt(2));
        let mut unknown = ContainerGroup::new("Thing");
        unknown.set_attribute(OBJECT_ID_TAG, AttributeValue::UInt(1));
        unknown.set_attribute(OBJECT_TYPE_TAG, AttributeValue::Text("Mystery".to_string()));
        structure.add_group(unknown);
        let mut root = ContainerGroup::new("");
        root.add_group(structure.clone());
        assert!(matches!(
            DataStructure::read_from_container(&root),
            Err(FormatError::UnknownObjectType { .. })
        ));

        let mut dangling = ContainerGroup::new("Ghost");
        dangling.set_attribute(OBJECT_ID_TAG, AttributeValue::UInt(9));
        dangling.set_attribute(OBJECT_TYPE_TAG, AttributeValue::Text(LINK_TYPE.to_string()));
        structure.children = vec![ContainerNode::Group(dangling)];
        let mut root = ContainerGroup::new("");
        root.add_group(structure.clone());
        assert_eq!(
            DataStructure::read_from_container(&root).err(),
            Some(FormatError::DanglingLink(9))
        );

        let mut truncated = Dataset::new("Bad", DatasetType::Numeric(DataType::Int32), vec![0; 6]);
        truncated.attributes.insert(OBJECT_ID_TAG.to_string(), AttributeValue::UInt(1));
        truncated
            .attributes
            .insert(OBJECT_TYPE_TAG.to_string(), AttributeValue::Text("DataArray".to_string()));
        structure.children = vec![ContainerNode::Dataset(truncated)];
        let mut root = ContainerGroup::new("");
        root.add_group(structure);
        assert!(matches!(
            DataStructure::read_from_container(&root),
            Err(FormatError::Payload { .. })
        ));
    }

    fn wrap(node: ContainerNode) -> ContainerGroup {
        let mut structure = ContainerGroup::new(DATA_STRUCTURE_TAG);
        structure.set_attribute(NEXT_ID_TAG, AttributeValue::UInt(2));
        structure.children.push(node);
        let mut root = ContainerGroup::new("");
        root.add_group(structure);
        root
    }

    fn array_dataset(name: &str, tuples: Vec<u64>) -> Dataset {
        let mut dataset = Dataset::new(name, DatasetType::Numeric(DataType::UInt8), vec![0; 4]);
        dataset.attributes.insert(OBJECT_ID_TAG.to_string(), AttributeValue::UInt(1));
        dataset
            .attributes
            .insert(OBJECT_TYPE_TAG.to_string(), AttributeValue::Text("DataArray".to_string()));
        dataset
            .attributes
            .insert(TUPLE_DIMENSIONS_TAG.to_string(), AttributeValue::UIntList(tuples));
        dataset
            .attributes
            .insert(COMPONENT_DIMENSIONS_TAG.to_string(), AttributeValue::UIntList(vec![1]));
        dataset
    }

    #[test]
    fn test_oversized_shapes_are_rejected() {
        let huge = vec![u64::MAX, u64::MAX];

        let root = wrap(ContainerNode::Dataset(array_dataset("Values", huge.clone())));
        assert!(matches!(
            DataStructure::read_from_container(&root),
            Err(FormatError::Payload { .. })
        ));

        let mut strings = array_dataset("Names", huge.clone());
        strings.dataset_type = DatasetType::Text;
        strings
            .attributes
            .insert(OBJECT_TYPE_TAG.to_string(), AttributeValue::Text("StringArray".to_string()));
        let root = wrap(ContainerNode::Dataset(strings));
        assert!(matches!(
            DataStructure::read_from_container(&root),
            Err(FormatError::Payload { .. })
        ));

        let mut matrix = group_node("Cells", 1);
        matrix.set_attribute(OBJECT_TYPE_TAG, AttributeValue::Text("AttributeMatrix".to_string()));
        matrix.set_attribute(TUPLE_DIMENSIONS_TAG, AttributeValue::UIntList(huge));
        let root = wrap(ContainerNode::Group(matrix));
        assert!(matches!(
            DataStructure::read_from_container(&root),
            Err(FormatError::Payload { .. })
        ));

        let mut image = group_node("Image", 1);
        image.set_attribute(OBJECT_TYPE_TAG, AttributeValue::Text("ImageGeom".to_string()));
        image.set_attribute(DIMENSIONS_TAG, AttributeValue::UIntList(vec![u64::MAX, u64::MAX, 2]));
        image.set_attribute(ORIGIN_TAG, AttributeValue::FloatList(vec![0.0; 3]));
        image.set_attribute(SPACING_TAG, AttributeValue::FloatList(vec![1.0; 3]));
        let root = wrap(ContainerNode::Group(image));
        assert!(matches!(
            DataStructure::read_from_container(&root),
            Err(FormatError::Payload { .. })
        ));
    }

    #[test]
    fn test_last_object_id_is_rejected() {
        let root = wrap(ContainerNode::Group(group_node("Group", u64::MAX)));
        assert_eq!(
            DataStructure::read_from_container(&root).err(),
            Some(FormatError::Structure(DataStructureError::IdOutOfRange(DataId(u64::MAX))))
        );
    }

    fn group_node(name: &str, id: u64) -> ContainerGroup {
        let mut group = ContainerGroup::new(name);
        group.set_attribute(OBJECT_ID_TAG, AttributeValue::UInt(id));
        group.set_attribute(OBJECT_TYPE_TAG, AttributeValue::Text("DataGroup".to_string()));
        group
    }
}
