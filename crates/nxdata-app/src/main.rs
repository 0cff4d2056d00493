//! NXData 检查工具
//!
//! 用法：`nxdata [文件]`
//! - 文件存在时打开并打印对象树
//! - 文件不存在时生成示例数据结构并保存到该路径（默认 `demo.nxds`）

use anyhow::{Context, Result};
use nxdata_core::prelude::*;
use nxdata_file::Document;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// 未指定路径时使用的文件名
const DEFAULT_PATH: &str = "demo.nxds";

fn main() -> Result<()> {
    // 初始化日志
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(Level::INFO).finish(),
    )?;

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PATH));

    if path.exists() {
        let document = Document::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
        print_document(&document);
    } else {
        let mut document = Document::new();
        document.metadata.title = "Demo".to_string();
        build_demo(document.data_mut())?;
        document
            .save_as(&path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        info!(path = %path.display(), "wrote demo document");
        print_document(&document);
    }

    Ok(())
}

/// 示例：A/B/C 数组，同时挂在顶层组 D 下
fn build_demo(data: &mut DataStructure) -> Result<()> {
    let a = DataGroup::create(data, "A", None)?;
    let b = DataGroup::create(data, "B", Some(a))?;
    let values: Vec<f32> = (0..10).map(|i| i as f32).collect();
    let c = DataArray::create_with_values(data, "C", vec![10], vec![1], values, Some(b))?;
    let d = DataGroup::create(data, "D", None)?;
    data.try_set_additional_parent(c, d)?;

    let geometry = ImageGeom::new([4, 4, 1]).with_spacing(Vector3::new(0.5, 0.5, 1.0));
    let image = ImageGeom::create(data, "Image", geometry, None)?;
    let cells = AttributeMatrix::create(data, "CellData", vec![16], Some(image))?;
    DataArray::create::<u8>(data, "Phases", vec![16], vec![1], Some(cells))?;
    Ok(())
}

fn print_document(document: &Document) {
    let data = document.data();
    println!("{} ({})", document.metadata.title, document.metadata.id);
    println!("objects: {}, next id: {}", data.get_size(), data.next_id());
    print!("{}", data.tree_string());
}
