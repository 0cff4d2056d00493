//! 数据结构操作错误定义

use crate::id::DataId;
use crate::path::DataPath;
use thiserror::Error;

/// 结构性操作错误
///
/// 公共接口大多以 `Option`/`bool` 报告失败，需要知道原因的调用方
/// 可以使用返回 `Result` 的对应方法。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataStructureError {
    #[error("Data path must contain at least one name")]
    EmptyPath,

    #[error("Invalid object name: {0:?}")]
    InvalidName(String),

    #[error("No object found at path: {0}")]
    NotFound(DataPath),

    #[error("No object registered with id {0}")]
    MissingId(DataId),

    #[error("Id {0} is already registered")]
    IdInUse(DataId),

    #[error("Object '{0}' cannot hold child objects")]
    NotAContainer(String),

    #[error("Name '{name}' is already used inside '{parent}'")]
    DuplicateName { name: String, parent: String },

    #[error("Object {child} is already a child of '{parent}'")]
    AlreadyChild { child: DataId, parent: String },

    #[error("Object {child} is not a child of '{parent}'")]
    NotAChild { child: DataId, parent: String },

    #[error("'{parent}' rejected '{child}': {reason}")]
    Rejected {
        parent: String,
        child: String,
        reason: String,
    },

    #[error("Linking {child} under {parent} would create a cycle")]
    WouldCreateCycle { child: DataId, parent: DataId },

    #[error("Array payload holds {actual} values but its shape requires {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Shape {0:?} has too many elements")]
    ShapeOverflow(Vec<usize>),

    #[error("Id {0} is outside the usable id range")]
    IdOutOfRange(DataId),

    #[error("Container '{0}' already holds children and cannot be inserted")]
    PopulatedContainer(String),
}
