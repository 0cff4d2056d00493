//! 文档：数据结构加上元数据和文件状态

use crate::error::FileError;
use crate::native::{SaveOptions, FORMAT_VERSION};
use chrono::{DateTime, Utc};
use nxdata_core::structure::DataStructure;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 文档元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// 文档唯一标识
    pub id: Uuid,

    /// 文档标题
    pub title: String,

    /// 作者
    pub author: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 最后修改时间
    pub modified_at: DateTime<Utc>,

    /// 文件格式版本
    pub format_version: u32,

    /// 自定义属性
    pub custom_properties: HashMap<String, String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: "Untitled".to_string(),
            author: String::new(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
            format_version: FORMAT_VERSION,
            custom_properties: HashMap::new(),
        }
    }
}

/// 支持的文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.nxds` 原生格式
    Native,
    /// `.json` 交换格式
    Json,
}

impl FileFormat {
    /// 按扩展名判断格式
    pub fn from_path(path: &Path) -> Result<Self, FileError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("nxds") => Ok(FileFormat::Native),
            Some("json") => Ok(FileFormat::Json),
            _ => Err(FileError::InvalidFormat("Unknown file extension".to_string())),
        }
    }
}

/// 数据文档
#[derive(Debug)]
pub struct Document {
    /// 元数据
    pub metadata: DocumentMetadata,

    /// 数据结构
    data: DataStructure,

    /// 是否已修改
    modified: bool,

    /// 文件路径（如果已保存）
    file_path: Option<PathBuf>,
}

impl Document {
    /// 创建新文档
    pub fn new() -> Self {
        Self::from_parts(DocumentMetadata::default(), DataStructure::new())
    }

    /// 用已有的元数据和数据结构创建文档
    pub fn from_parts(metadata: DocumentMetadata, data: DataStructure) -> Self {
        Self {
            metadata,
            data,
            modified: false,
            file_path: None,
        }
    }

    /// 从文件加载
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();

        let mut document = match FileFormat::from_path(path)? {
            FileFormat::Native => crate::native::load(path)?,
            FileFormat::Json => crate::json::load(path)?,
        };
        document.file_path = Some(path.to_path_buf());
        Ok(document)
    }

    /// 保存文件
    pub fn save(&mut self) -> Result<(), FileError> {
        if let Some(path) = self.file_path.clone() {
            self.save_as(path)
        } else {
            Err(FileError::InvalidFormat("No file path set".to_string()))
        }
    }

    /// 另存为
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), FileError> {
        self.save_as_with(path, &SaveOptions::default())
    }

    /// 按指定选项另存为
    pub fn save_as_with(&mut self, path: impl AsRef<Path>, options: &SaveOptions) -> Result<(), FileError> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;

        self.metadata.modified_at = Utc::now();
        self.metadata.format_version = FORMAT_VERSION;
        match format {
            FileFormat::Native => crate::native::save(self, path, options)?,
            FileFormat::Json => crate::json::save(self, path, options)?,
        }

        self.file_path = Some(path.to_path_buf());
        self.modified = false;

        Ok(())
    }

    /// 数据结构
    pub fn data(&self) -> &DataStructure {
        &self.data
    }

    /// 可变数据结构，文档随之标记为已修改
    pub fn data_mut(&mut self) -> &mut DataStructure {
        self.modified = true;
        &mut self.data
    }

    /// 取出数据结构
    pub fn into_data(self) -> DataStructure {
        self.data
    }

    /// 是否已修改
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// 标记为已保存
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /// 获取文件路径
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// 设置文件路径
    pub fn set_file_path(&mut self, path: impl AsRef<Path>) {
        self.file_path = Some(path.as_ref().to_path_buf());
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxdata_core::group::DataGroup;
    use nxdata_core::path::DataPath;

    #[test]
    fn test_modified_flag() {
        let mut doc = Document::new();
        assert!(!doc.is_modified());

        DataGroup::create(doc.data_mut(), "A", None).unwrap();
        assert!(doc.is_modified());

        doc.mark_saved();
        assert!(!doc.is_modified());
    }

    #[test]
    fn test_unknown_extension() {
        let mut doc = Document::new();
        assert!(matches!(doc.save_as("data.txt"), Err(FileError::InvalidFormat(_))));
        assert!(matches!(doc.save(), Err(FileError::InvalidFormat(_))));
        assert!(matches!(Document::open("data"), Err(FileError::InvalidFormat(_))));
    }

    #[test]
    fn test_save_as_and_reopen() {
        for extension in ["nxds", "json"] {
            let file_path = std::env::temp_dir().join(format!("nxdata_doc_{}.{}", Uuid::new_v4(), extension));

            let mut doc = Document::new();
            let a = DataGroup::create(doc.data_mut(), "A", None).unwrap();
            DataGroup::create(doc.data_mut(), "B", Some(a)).unwrap();
            doc.save_as(&file_path).expect("Failed to save");
            assert!(!doc.is_modified());
            assert_eq!(doc.file_path(), Some(file_path.as_path()));

            let reopened = Document::open(&file_path).expect("Failed to open");
            let path: DataPath = "A/B".parse().unwrap();
            assert!(reopened.data().contains_path(&path));
            assert_eq!(reopened.metadata.id, doc.metadata.id);
            assert_eq!(reopened.file_path(), Some(file_path.as_path()));

            std::fs::remove_file(&file_path).ok();
        }
    }
}
