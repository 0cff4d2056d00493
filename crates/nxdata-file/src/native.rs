//! NXData原生文件格式（.nxds）
//!
//! 基于SQLite的单文件格式：
//! - `metadata` 表保存格式版本和文档元数据
//! - `nodes` 表按深度优先顺序保存容器模型的每个节点
//! - 数据集内容用 zlib 压缩存储

use crate::document::{Document, DocumentMetadata};
use crate::error::FileError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use nxdata_core::array::DataType;
use nxdata_core::format::{Attributes, ContainerGroup, ContainerNode, Dataset, DatasetType};
use nxdata_core::structure::DataStructure;
use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// 当前文件格式版本
pub const FORMAT_VERSION: u32 = 1;

/// 字符串数据集的类型名
const STRING_DATATYPE: &str = "string";

/// 保存选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// zlib 压缩级别（0-9）
    pub compression: u32,

    /// 是否写入文档元数据
    pub include_metadata: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compression: 6,
            include_metadata: true,
        }
    }
}

impl SaveOptions {
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = level.min(9);
        self
    }

    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }
}

/// 创建数据库架构
fn create_schema(conn: &Connection) -> Result<(), FileError> {
    conn.execute_batch(
        r#"
        -- 元数据表
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- 节点表（parent 为空表示根节点）
        CREATE TABLE IF NOT EXISTS nodes (
            id INTEGER PRIMARY KEY,
            parent INTEGER,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            attributes TEXT NOT NULL,
            datatype TEXT,
            size INTEGER,
            data BLOB
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent);
        "#,
    )?;

    Ok(())
}

/// 保存文档到文件
pub fn save(document: &Document, path: &Path, options: &SaveOptions) -> Result<(), FileError> {
    let mut root = ContainerGroup::new("");
    document.data().write_to_container(&mut root)?;

    let mut conn = Connection::open(path)?;
    create_schema(&conn)?;

    let tx = conn.transaction()?;
    save_metadata(&tx, &document.metadata, options)?;

    tx.execute("DELETE FROM nodes", [])?;
    let mut writer = NodeWriter {
        tx: &tx,
        next_row: 1,
        compression: Compression::new(options.compression),
    };
    for (position, node) in root.children.iter().enumerate() {
        writer.write_node(node, None, position)?;
    }
    let rows = writer.next_row - 1;
    tx.commit()?;

    conn.execute("VACUUM", [])?;

    info!(path = %path.display(), objects = document.data().get_size(), rows, "saved native file");
    Ok(())
}

fn save_metadata(tx: &Transaction, metadata: &DocumentMetadata, options: &SaveOptions) -> Result<(), FileError> {
    tx.execute("DELETE FROM metadata", [])?;
    tx.execute(
        "INSERT INTO metadata (key, value) VALUES ('format_version', ?)",
        params![FORMAT_VERSION.to_string()],
    )?;
    if options.include_metadata {
        let json = serde_json::to_string(metadata)?;
        tx.execute(
            "INSERT INTO metadata (key, value) VALUES ('document', ?)",
            params![json],
        )?;
    }
    Ok(())
}

struct NodeWriter<'a> {
    tx: &'a Transaction<'a>,
    next_row: i64,
    compression: Compression,
}

impl NodeWriter<'_> {
    fn write_node(&mut self, node: &ContainerNode, parent: Option<i64>, position: usize) -> Result<(), FileError> {
        let row = self.next_row;
        self.next_row += 1;
        let attributes = serde_json::to_string(node.attributes())?;

        match node {
            ContainerNode::Group(group) => {
                self.tx.execute(
                    "INSERT INTO nodes (id, parent, position, name, kind, attributes) VALUES (?, ?, ?, ?, ?, ?)",
                    params![row, parent, position as i64, &group.name, node.kind_name(), &attributes],
                )?;
                for (position, child) in group.children.iter().enumerate() {
                    self.write_node(child, Some(row), position)?;
                }
            }
            ContainerNode::Dataset(dataset) => {
                let data = compress(&dataset.bytes, self.compression)?;
                self.tx.execute(
                    "INSERT INTO nodes (id, parent, position, name, kind, attributes, datatype, size, data)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        row,
                        parent,
                        position as i64,
                        &dataset.name,
                        node.kind_name(),
                        &attributes,
                        datatype_name(dataset.dataset_type),
                        dataset.bytes.len() as i64,
                        &data,
                    ],
                )?;
            }
        }
        Ok(())
    }
}

/// 从文件加载文档
pub fn load(path: &Path) -> Result<Document, FileError> {
    let conn = Connection::open(path)?;

    // 检查格式版本
    let version: String = conn.query_row(
        "SELECT value FROM metadata WHERE key = 'format_version'",
        [],
        |row| row.get(0),
    )?;

    let version: u32 = version
        .parse()
        .map_err(|_| FileError::InvalidFormat("Invalid version".to_string()))?;

    if version > FORMAT_VERSION {
        return Err(FileError::UnsupportedVersion(format!(
            "File version {} is newer than supported version {}",
            version, FORMAT_VERSION
        )));
    }
    if version < FORMAT_VERSION {
        warn!(version, "loading file written by an older format version");
    }

    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'document'")?;
    let metadata_json: Option<String> = stmt.query_map([], |row| row.get(0))?.next().transpose()?;
    let metadata = match metadata_json {
        Some(json) => serde_json::from_str(&json)?,
        None => DocumentMetadata::default(),
    };

    let root = load_nodes(&conn)?;
    let data = DataStructure::read_from_container(&root)?;
    info!(path = %path.display(), objects = data.get_size(), "loaded native file");

    Ok(Document::from_parts(metadata, data))
}

/// 一行节点记录
struct NodeRow {
    id: i64,
    name: String,
    kind: String,
    attributes: String,
    datatype: Option<String>,
    size: Option<i64>,
    data: Option<Vec<u8>>,
}

fn load_nodes(conn: &Connection) -> Result<ContainerGroup, FileError> {
    let mut stmt = conn.prepare(
        "SELECT id, parent, name, kind, attributes, datatype, size, data FROM nodes ORDER BY parent, position",
    )?;
    let rows = stmt.query_map([], |row| {
        let parent: Option<i64> = row.get(1)?;
        Ok((
            parent,
            NodeRow {
                id: row.get(0)?,
                name: row.get(2)?,
                kind: row.get(3)?,
                attributes: row.get(4)?,
                datatype: row.get(5)?,
                size: row.get(6)?,
                data: row.get(7)?,
            },
        ))
    })?;

    let mut children: HashMap<Option<i64>, Vec<NodeRow>> = HashMap::new();
    let mut count = 0;
    for row in rows {
        let (parent, row) = row?;
        children.entry(parent).or_default().push(row);
        count += 1;
    }
    debug!(rows = count, "read node table");

    let mut root = ContainerGroup::new("");
    root.children = build_children(None, &mut children)?;
    if !children.is_empty() {
        return Err(FileError::Corruption("Node rows with unreachable parents".to_string()));
    }
    Ok(root)
}

fn build_children(
    parent: Option<i64>,
    children: &mut HashMap<Option<i64>, Vec<NodeRow>>,
) -> Result<Vec<ContainerNode>, FileError> {
    let Some(rows) = children.remove(&parent) else {
        return Ok(Vec::new());
    };

    let mut nodes = Vec::with_capacity(rows.len());
    for row in rows {
        let attributes: Attributes = serde_json::from_str(&row.attributes)?;
        let node = match row.kind.as_str() {
            "group" => {
                let mut group = ContainerGroup::new(row.name);
                group.attributes = attributes;
                group.children = build_children(Some(row.id), children)?;
                ContainerNode::Group(group)
            }
            "dataset" => {
                let dataset_type = parse_datatype(row.datatype.as_deref())?;
                let size = row
                    .size
                    .and_then(|size| usize::try_from(size).ok())
                    .ok_or_else(|| FileError::Corruption(format!("Dataset '{}' has no valid size", row.name)))?;
                let bytes = decompress(row.data.as_deref().unwrap_or_default(), size)?;
                if bytes.len() != size {
                    return Err(FileError::Corruption(format!(
                        "Dataset '{}' has {} bytes, expected {}",
                        row.name,
                        bytes.len(),
                        size
                    )));
                }
                let mut dataset = Dataset::new(row.name, dataset_type, bytes);
                dataset.attributes = attributes;
                ContainerNode::Dataset(dataset)
            }
            other => {
                return Err(FileError::InvalidFormat(format!("Unknown node kind: {}", other)));
            }
        };
        nodes.push(node);
    }
    Ok(nodes)
}

fn datatype_name(dataset_type: DatasetType) -> &'static str {
    match dataset_type {
        DatasetType::Numeric(data_type) => data_type.as_str(),
        DatasetType::Text => STRING_DATATYPE,
    }
}

fn parse_datatype(name: Option<&str>) -> Result<DatasetType, FileError> {
    match name {
        Some(STRING_DATATYPE) => Ok(DatasetType::Text),
        Some(name) => DataType::from_name(name)
            .map(DatasetType::Numeric)
            .ok_or_else(|| FileError::InvalidFormat(format!("Unknown data type: {}", name))),
        None => Err(FileError::Corruption("Dataset row without data type".to_string())),
    }
}

fn compress(bytes: &[u8], level: Compression) -> Result<Vec<u8>, FileError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// 解压数据，最多读取 `size + 1` 字节，多出的部分由调用方判定为损坏
fn decompress(bytes: &[u8], size: usize) -> Result<Vec<u8>, FileError> {
    let limit = (size as u64).saturating_add(1);
    let mut decoder = ZlibDecoder::new(bytes).take(limit);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| FileError::Corruption(format!("Invalid compressed data: {}", e)))?;
    Ok(result)
}
