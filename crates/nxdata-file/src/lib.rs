//! NXData 文件格式处理
//!
//! 支持：
//! - `.nxds` 原生格式（基于SQLite）
//! - `.json` 交换格式

pub mod document;
pub mod error;
pub mod json;
pub mod native;

pub use document::{Document, DocumentMetadata, FileFormat};
pub use error::FileError;
pub use native::SaveOptions;
