//! 分组容器
//!
//! `DataGroup` 可以包含任意子对象。
//! `AttributeMatrix` 只接收元组数与自身一致的数组。

use crate::array::shape_product;
use crate::data_map::DataMap;
use crate::error::DataStructureError;
use crate::id::DataId;
use crate::object::{DataObject, DataObjectKind};
use crate::structure::DataStructure;

/// 通用分组
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataGroup {
    children: DataMap,
}

impl DataGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建分组并加入数据结构（`parent` 为 `None` 时放在顶层）
    pub fn create(
        data: &mut DataStructure,
        name: impl Into<String>,
        parent: Option<DataId>,
    ) -> Result<DataId, DataStructureError> {
        let id = data.generate_id();
        let object = DataObject::new(id, name, DataObjectKind::Group(Self::new()));
        data.insert_object(object, parent)
    }

    pub fn children(&self) -> &DataMap {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut DataMap {
        &mut self.children
    }
}

/// 属性矩阵
///
/// 所有子数组共享同一个元组维度。
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMatrix {
    /// 元组维度
    shape: Vec<usize>,

    children: DataMap,
}

impl AttributeMatrix {
    /// 元组数量溢出时返回错误
    pub fn new(shape: Vec<usize>) -> Result<Self, DataStructureError> {
        if shape_product(&shape).is_none() {
            return Err(DataStructureError::ShapeOverflow(shape));
        }
        Ok(Self {
            shape,
            children: DataMap::new(),
        })
    }

    /// 创建属性矩阵并加入数据结构
    pub fn create(
        data: &mut DataStructure,
        name: impl Into<String>,
        shape: Vec<usize>,
        parent: Option<DataId>,
    ) -> Result<DataId, DataStructureError> {
        let id = data.generate_id();
        let object = DataObject::new(id, name, DataObjectKind::AttributeMatrix(Self::new(shape)?));
        data.insert_object(object, parent)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn number_of_tuples(&self) -> usize {
        shape_product(&self.shape).unwrap_or_default()
    }

    pub fn children(&self) -> &DataMap {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut DataMap {
        &mut self.children
    }

    pub(crate) fn check_child(&self, own_name: &str, child: &DataObject) -> Result<(), DataStructureError> {
        let Some(tuples) = child.tuple_count() else {
            return Err(DataStructureError::Rejected {
                parent: own_name.to_string(),
                child: child.name().to_string(),
                reason: format!("{} is not an array", child.object_type()),
            });
        };

        if tuples != self.number_of_tuples() {
            return Err(DataStructureError::Rejected {
                parent: own_name.to_string(),
                child: child.name().to_string(),
                reason: format!(
                    "array has {} tuples, matrix expects {}",
                    tuples,
                    self.number_of_tuples()
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{DataArray, DataType};

    #[test]
    fn test_attribute_matrix_rejects_mismatched_arrays() {
        let mut data = DataStructure::new();
        let matrix = AttributeMatrix::create(&mut data, "CellData", vec![2, 3], None).unwrap();

        assert!(DataArray::create::<f32>(&mut data, "Good", vec![6], vec![1], Some(matrix)).is_ok());

        let result = DataArray::create::<f32>(&mut data, "Bad", vec![5], vec![1], Some(matrix));
        assert!(matches!(result, Err(DataStructureError::Rejected { .. })));

        let result = DataGroup::create(&mut data, "Nested", Some(matrix));
        assert!(matches!(result, Err(DataStructureError::Rejected { .. })));

        let matrix_object = data.get_data(matrix).unwrap();
        assert_eq!(matrix_object.as_container().map(DataMap::len), Some(1));
        assert!(data.get_data_by_path(&"CellData/Good".parse().unwrap()).is_some());

        let floats = data.get_data_by_path(&"CellData/Good".parse().unwrap()).unwrap();
        assert_eq!(floats.as_array().map(DataArray::data_type), Some(DataType::Float32));
    }

    #[test]
    fn test_attribute_matrix_shape_overflow() {
        let mut data = DataStructure::new();
        let result = AttributeMatrix::create(&mut data, "Huge", vec![usize::MAX, 2], None);
        assert!(matches!(result, Err(DataStructureError::ShapeOverflow(_))));
        assert_eq!(data.get_size(), 0);
    }

    #[test]
    fn test_group_create() {
        let mut data = DataStructure::new();
        let group = DataGroup::create(&mut data, "Group", None).unwrap();
        let child = DataGroup::create(&mut data, "Child", Some(group)).unwrap();

        assert_eq!(data.get_size(), 2);
        assert_eq!(data.get_data(child).unwrap().parents(), &[group]);
        assert!(matches!(
            DataGroup::create(&mut data, "Child", Some(group)),
            Err(DataStructureError::DuplicateName { .. })
        ));
    }
}
