//! 数据路径
//!
//! 路径是从顶层容器出发的名称序列，至少包含一个名称。

use crate::error::DataStructureError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// 默认分隔符
pub const PATH_SEPARATOR: char = '/';

/// 数据路径
///
/// 序列化为名称数组，反序列化时同样校验名称。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DataPath {
    names: Vec<String>,
}

impl DataPath {
    /// 从名称列表创建
    pub fn new<I, S>(names: I) -> Result<Self, DataStructureError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(DataStructureError::EmptyPath);
        }
        if let Some(bad) = names.iter().find(|name| !is_valid_name(name)) {
            return Err(DataStructureError::InvalidName(bad.clone()));
        }
        Ok(Self { names })
    }

    /// 解析 "a/b/c" 形式的字符串
    ///
    /// 首尾分隔符会被忽略，中间的空段视为错误。
    pub fn from_string(text: &str) -> Result<Self, DataStructureError> {
        let trimmed = text.trim_matches(PATH_SEPARATOR);
        if trimmed.is_empty() {
            return Err(DataStructureError::EmptyPath);
        }
        Self::new(trimmed.split(PATH_SEPARATOR))
    }

    /// 用指定分隔符拼接
    pub fn to_string_with(&self, delimiter: &str) -> String {
        self.names.join(delimiter)
    }

    /// 创建子路径
    pub fn create_child_path(&self, name: impl Into<String>) -> Result<Self, DataStructureError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(DataStructureError::InvalidName(name));
        }
        let mut names = self.names.clone();
        names.push(name);
        Ok(Self { names })
    }

    /// 父路径（顶层路径没有父路径）
    pub fn parent(&self) -> Option<Self> {
        if self.names.len() < 2 {
            return None;
        }
        Some(Self {
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }

    /// 最后一段名称
    pub fn target_name(&self) -> &str {
        self.names.last().map(String::as_str).unwrap_or_default()
    }

    /// 替换最后一段名称
    pub fn with_name(&self, name: impl Into<String>) -> Result<Self, DataStructureError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(DataStructureError::InvalidName(name));
        }
        let mut names = self.names.clone();
        if let Some(last) = names.last_mut() {
            *last = name;
        }
        Ok(Self { names })
    }

    pub fn parts(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// 路径总是非空，保留此方法以配合 `len`
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Index<usize> for DataPath {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.names[index]
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names.join("/"))
    }
}

impl TryFrom<Vec<String>> for DataPath {
    type Error = DataStructureError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<DataPath> for Vec<String> {
    fn from(path: DataPath) -> Self {
        path.names
    }
}

impl std::str::FromStr for DataPath {
    type Err = DataStructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

/// 对象名称不能为空，也不能包含路径分隔符
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(PATH_SEPARATOR)
}
