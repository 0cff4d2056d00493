//! NXData 核心数据模型
//!
//! 提供层次化、强类型的内存数据仓库：对象由注册表统一持有，
//! 容器之间通过ID相互引用，一个对象可以同时挂在多个容器下。
//!
//! # 架构设计
//!
//! - `DataStructure`: 注册表、顶层容器和通知通道
//! - `DataObject`: ID、名称、父容器列表和具体数据（`DataObjectKind`）
//! - `DataPath` / `LinkedPath`: 按名称寻址和按ID寻址
//! - `format`: 与文件无关的容器模型读写
//!
//! # 示例
//!
//! ```rust
//! use nxdata_core::prelude::*;
//!
//! let mut data = DataStructure::new();
//! let a = DataGroup::create(&mut data, "A", None).unwrap();
//! let b = DataGroup::create(&mut data, "B", Some(a)).unwrap();
//! let c = DataArray::create::<f32>(&mut data, "C", vec![10], vec![1], Some(b)).unwrap();
//!
//! let path: DataPath = "A/B/C".parse().unwrap();
//! assert_eq!(data.get_id(&path), Some(c));
//! ```

pub mod array;
pub mod data_map;
pub mod error;
pub mod format;
pub mod geometry;
pub mod group;
pub mod id;
pub mod linked_path;
pub mod message;
pub mod object;
pub mod path;
pub mod structure;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::array::{DataArray, DataType, Element, StringArray};
    pub use crate::data_map::DataMap;
    pub use crate::error::DataStructureError;
    pub use crate::format::{ContainerGroup, FormatError};
    pub use crate::geometry::{ImageGeom, Point3, Vector3};
    pub use crate::group::{AttributeMatrix, DataGroup};
    pub use crate::id::{DataId, StructureId};
    pub use crate::linked_path::LinkedPath;
    pub use crate::message::{DataStructureMessage, ObserverId};
    pub use crate::object::{DataObject, DataObjectKind, DataObjectType};
    pub use crate::path::DataPath;
    pub use crate::structure::DataStructure;
}
