//! JSON 交换格式（.json）
//!
//! 把容器模型整体写成一个 JSON 对象，便于调试和与其他工具交换。

use crate::document::{Document, DocumentMetadata};
use crate::error::FileError;
use crate::native::{SaveOptions, FORMAT_VERSION};
use nxdata_core::format::ContainerGroup;
use nxdata_core::structure::DataStructure;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// 文件顶层对象
#[derive(Debug, Serialize, Deserialize)]
struct JsonFile {
    format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<DocumentMetadata>,
    root: ContainerGroup,
}

/// 保存文档到 JSON 文件
pub fn save(document: &Document, path: &Path, options: &SaveOptions) -> Result<(), FileError> {
    let mut root = ContainerGroup::new("");
    document.data().write_to_container(&mut root)?;

    let file = JsonFile {
        format_version: FORMAT_VERSION,
        metadata: options.include_metadata.then(|| document.metadata.clone()),
        root,
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &file)?;

    info!(path = %path.display(), objects = document.data().get_size(), "saved json file");
    Ok(())
}

/// 从 JSON 文件加载文档
pub fn load(path: &Path) -> Result<Document, FileError> {
    let reader = BufReader::new(File::open(path)?);
    let file: JsonFile = serde_json::from_reader(reader)?;

    if file.format_version > FORMAT_VERSION {
        return Err(FileError::UnsupportedVersion(format!(
            "File version {} is newer than supported version {}",
            file.format_version, FORMAT_VERSION
        )));
    }

    let data = DataStructure::read_from_container(&file.root)?;
    info!(path = %path.display(), objects = data.get_size(), "loaded json file");

    Ok(Document::from_parts(file.metadata.unwrap_or_default(), data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxdata_core::prelude::*;

    #[test]
    fn test_json_roundtrip_keeps_links() {
        let file_path = std::env::temp_dir().join(format!("nxdata_json_{}.json", uuid::Uuid::new_v4()));

        let mut data = DataStructure::new();
        let a = DataGroup::create(&mut data, "A", None).unwrap();
        let d = DataGroup::create(&mut data, "D", None).unwrap();
        let c = DataArray::create_with_values(&mut data, "C", vec![3], vec![1], vec![1u16, 2, 3], Some(a)).unwrap();
        assert!(data.set_additional_parent(c, d));
        let doc = Document::from_parts(DocumentMetadata::default(), data);

        save(&doc, &file_path, &SaveOptions::default()).expect("Failed to save");
        let loaded = load(&file_path).expect("Failed to load");

        assert_eq!(loaded.metadata, doc.metadata);
        assert_eq!(loaded.data().get_data(c).unwrap().parents(), &[a, d]);
        std::fs::remove_file(&file_path).ok();
    }

    #[test]
    fn test_missing_structure_group() {
        let file_path = std::env::temp_dir().join(format!("nxdata_json_{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&file_path, r#"{"format_version":1,"root":{"name":"","attributes":{},"children":[]}}"#)
            .unwrap();

        assert!(matches!(load(&file_path), Err(FileError::Format(FormatError::MissingGroup(_)))));
        std::fs::remove_file(&file_path).ok();
    }
}
