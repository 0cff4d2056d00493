//! 几何容器
//!
//! 目前提供规则网格几何 `ImageGeom`。几何本身是容器，
//! 单元数据通常以属性矩阵的形式挂在几何下。

use crate::data_map::DataMap;
use crate::error::DataStructureError;
use crate::id::DataId;
use crate::object::{DataObject, DataObjectKind};
use crate::structure::DataStructure;
use nalgebra as na;

/// 3D向量类型
pub type Vector3 = na::Vector3<f32>;

/// 3D点类型
pub type Point3 = na::Point3<f32>;

/// 3D包围盒
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox3 {
    pub min: Point3,
    pub max: Point3,
}

/// 规则网格几何
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeom {
    /// 各方向的单元数（x, y, z）
    dimensions: [usize; 3],

    /// 原点
    origin: Vector3,

    /// 单元间距
    spacing: Vector3,

    children: DataMap,
}

impl ImageGeom {
    /// 创建几何，原点为0，间距为1
    pub fn new(dimensions: [usize; 3]) -> Self {
        Self {
            dimensions,
            origin: Vector3::zeros(),
            spacing: Vector3::new(1.0, 1.0, 1.0),
            children: DataMap::new(),
        }
    }

    /// 设置原点
    pub fn with_origin(mut self, origin: Vector3) -> Self {
        self.origin = origin;
        self
    }

    /// 设置间距
    pub fn with_spacing(mut self, spacing: Vector3) -> Self {
        self.spacing = spacing;
        self
    }

    /// 创建几何对象并加入数据结构
    pub fn create(
        data: &mut DataStructure,
        name: impl Into<String>,
        geometry: ImageGeom,
        parent: Option<DataId>,
    ) -> Result<DataId, DataStructureError> {
        let id = data.generate_id();
        let object = DataObject::new(id, name, DataObjectKind::ImageGeom(geometry));
        data.insert_object(object, parent)
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    pub fn origin(&self) -> Vector3 {
        self.origin
    }

    pub fn spacing(&self) -> Vector3 {
        self.spacing
    }

    pub fn set_origin(&mut self, origin: Vector3) {
        self.origin = origin;
    }

    pub fn set_spacing(&mut self, spacing: Vector3) {
        self.spacing = spacing;
    }

    /// 单元总数，溢出时饱和到 `usize::MAX`
    pub fn number_of_cells(&self) -> usize {
        self.dimensions.iter().fold(1usize, |acc, &dim| acc.saturating_mul(dim))
    }

    /// (x, y, z) → 线性索引，x 变化最快
    pub fn cell_index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        let [dx, dy, dz] = self.dimensions;
        if x >= dx || y >= dy || z >= dz {
            return None;
        }
        let plane = dx.checked_mul(dy)?;
        z.checked_mul(plane)?.checked_add(y.checked_mul(dx)?)?.checked_add(x)
    }

    /// 单元中心坐标
    pub fn cell_center(&self, index: usize) -> Option<Point3> {
        if index >= self.number_of_cells() {
            return None;
        }
        let [dx, dy, _] = self.dimensions;
        let x = index % dx;
        let y = (index / dx) % dy;
        let z = index / dx.saturating_mul(dy);
        let cell = Vector3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5);
        Some(Point3::from(self.origin + cell.component_mul(&self.spacing)))
    }

    /// 几何范围
    pub fn bounds(&self) -> BoundingBox3 {
        let extent = Vector3::new(
            self.dimensions[0] as f32,
            self.dimensions[1] as f32,
            self.dimensions[2] as f32,
        )
        .component_mul(&self.spacing);

        BoundingBox3 {
            min: Point3::from(self.origin),
            max: Point3::from(self.origin + extent),
        }
    }

    pub fn children(&self) -> &DataMap {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut DataMap {
        &mut self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_geom_cells() {
        let geom = ImageGeom::new([4, 3, 2])
            .with_origin(Vector3::new(10.0, 0.0, 0.0))
            .with_spacing(Vector3::new(0.5, 1.0, 2.0));

        assert_eq!(geom.number_of_cells(), 24);
        assert_eq!(geom.cell_index(1, 2, 1), Some(1 + 2 * 4 + 12));
        assert_eq!(geom.cell_index(4, 0, 0), None);

        let center = geom.cell_center(0).unwrap();
        assert!((center.x - 10.25).abs() < 1e-6);
        assert!((center.z - 1.0).abs() < 1e-6);

        let bounds = geom.bounds();
        assert!((bounds.max.x - 12.0).abs() < 1e-6);
        assert!((bounds.max.z - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_huge_dimensions_do_not_overflow() {
        let geom = ImageGeom::new([usize::MAX, usize::MAX, 2]);
        assert_eq!(geom.number_of_cells(), usize::MAX);
        assert_eq!(geom.cell_index(1, 1, 1), None);
        assert!(geom.cell_center(usize::MAX - 1).is_some());
    }

    #[test]
    fn test_geometry_holds_children() {
        let mut data = DataStructure::new();
        let geom = ImageGeom::create(&mut data, "Image", ImageGeom::new([2, 2, 1]), None).unwrap();
        let cells = crate::group::AttributeMatrix::create(&mut data, "CellData", vec![4], Some(geom)).unwrap();

        let path = "Image/CellData".parse().unwrap();
        assert_eq!(data.get_id(&path), Some(cells));
    }
}
