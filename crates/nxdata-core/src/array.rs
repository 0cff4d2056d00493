//! 数组数据
//!
//! `DataArray` 是叶子对象：按元组组织的定长数值存储，不能包含子对象。
//! 每个元组包含 `component_shape` 描述的若干分量。

use crate::error::DataStructureError;
use crate::id::DataId;
use crate::object::{DataObject, DataObjectKind};
use crate::structure::DataStructure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Boolean,
}

impl DataType {
    pub const ALL: [DataType; 11] = [
        DataType::Int8,
        DataType::UInt8,
        DataType::Int16,
        DataType::UInt16,
        DataType::Int32,
        DataType::UInt32,
        DataType::Int64,
        DataType::UInt64,
        DataType::Float32,
        DataType::Float64,
        DataType::Boolean,
    ];

    /// 持久化使用的类型名
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::UInt8 => "uint8",
            DataType::Int16 => "int16",
            DataType::UInt16 => "uint16",
            DataType::Int32 => "int32",
            DataType::UInt32 => "uint32",
            DataType::Int64 => "int64",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Boolean => "boolean",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// 单个元素的字节数
    pub fn size_of(&self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 | DataType::Boolean => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 类型化的数据存储
#[derive(Debug, Clone, PartialEq)]
pub enum DataStore {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Boolean(Vec<bool>),
}

/// 对每种存储变体执行同一段泛型代码
macro_rules! with_store {
    ($store:expr, $values:ident => $body:expr) => {
        match $store {
            DataStore::Int8($values) => $body,
            DataStore::UInt8($values) => $body,
            DataStore::Int16($values) => $body,
            DataStore::UInt16($values) => $body,
            DataStore::Int32($values) => $body,
            DataStore::UInt32($values) => $body,
            DataStore::Int64($values) => $body,
            DataStore::UInt64($values) => $body,
            DataStore::Float32($values) => $body,
            DataStore::Float64($values) => $body,
            DataStore::Boolean($values) => $body,
        }
    };
}

impl DataStore {
    /// 创建填充默认值的存储
    pub fn zeros(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::Int8 => DataStore::Int8(vec![0; len]),
            DataType::UInt8 => DataStore::UInt8(vec![0; len]),
            DataType::Int16 => DataStore::Int16(vec![0; len]),
            DataType::UInt16 => DataStore::UInt16(vec![0; len]),
            DataType::Int32 => DataStore::Int32(vec![0; len]),
            DataType::UInt32 => DataStore::UInt32(vec![0; len]),
            DataType::Int64 => DataStore::Int64(vec![0; len]),
            DataType::UInt64 => DataStore::UInt64(vec![0; len]),
            DataType::Float32 => DataStore::Float32(vec![0.0; len]),
            DataType::Float64 => DataStore::Float64(vec![0.0; len]),
            DataType::Boolean => DataStore::Boolean(vec![false; len]),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            DataStore::Int8(_) => DataType::Int8,
            DataStore::UInt8(_) => DataType::UInt8,
            DataStore::Int16(_) => DataType::Int16,
            DataStore::UInt16(_) => DataType::UInt16,
            DataStore::Int32(_) => DataType::Int32,
            DataStore::UInt32(_) => DataType::UInt32,
            DataStore::Int64(_) => DataType::Int64,
            DataStore::UInt64(_) => DataType::UInt64,
            DataStore::Float32(_) => DataType::Float32,
            DataStore::Float64(_) => DataType::Float64,
            DataStore::Boolean(_) => DataType::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        with_store!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 小端字节序列
    pub fn to_le_bytes(&self) -> Vec<u8> {
        with_store!(self, values => encode(values))
    }

    /// 从小端字节序列恢复，长度不是元素大小的整数倍时返回 `None`
    pub fn from_le_bytes(data_type: DataType, bytes: &[u8]) -> Option<Self> {
        match data_type {
            DataType::Int8 => decode::<i8>(bytes),
            DataType::UInt8 => decode::<u8>(bytes),
            DataType::Int16 => decode::<i16>(bytes),
            DataType::UInt16 => decode::<u16>(bytes),
            DataType::Int32 => decode::<i32>(bytes),
            DataType::UInt32 => decode::<u32>(bytes),
            DataType::Int64 => decode::<i64>(bytes),
            DataType::UInt64 => decode::<u64>(bytes),
            DataType::Float32 => decode::<f32>(bytes),
            DataType::Float64 => decode::<f64>(bytes),
            DataType::Boolean => decode::<bool>(bytes),
        }
    }
}

fn encode<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::DATA_TYPE.size_of());
    for value in values {
        value.write_le(&mut out);
    }
    out
}

fn decode<T: Element>(bytes: &[u8]) -> Option<DataStore> {
    let size = T::DATA_TYPE.size_of();
    if bytes.len() % size != 0 {
        return None;
    }
    Some(T::into_store(bytes.chunks_exact(size).map(T::read_le).collect()))
}

/// 可存入 `DataArray` 的元素类型
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn into_store(values: Vec<Self>) -> DataStore;

    fn slice(store: &DataStore) -> Option<&[Self]>;

    fn slice_mut(store: &mut DataStore) -> Option<&mut [Self]>;

    fn write_le(&self, out: &mut Vec<u8>);

    /// `bytes` 的长度恰好等于元素大小
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_numeric_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DATA_TYPE: DataType = DataType::$variant;

                fn into_store(values: Vec<Self>) -> DataStore {
                    DataStore::$variant(values)
                }

                fn slice(store: &DataStore) -> Option<&[Self]> {
                    match store {
                        DataStore::$variant(values) => Some(values.as_slice()),
                        _ => None,
                    }
                }

                fn slice_mut(store: &mut DataStore) -> Option<&mut [Self]> {
                    match store {
                        DataStore::$variant(values) => Some(values.as_mut_slice()),
                        _ => None,
                    }
                }

                fn write_le(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_numeric_element! {
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Boolean;

    fn into_store(values: Vec<Self>) -> DataStore {
        DataStore::Boolean(values)
    }

    fn slice(store: &DataStore) -> Option<&[Self]> {
        match store {
            DataStore::Boolean(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    fn slice_mut(store: &mut DataStore) -> Option<&mut [Self]> {
        match store {
            DataStore::Boolean(values) => Some(values.as_mut_slice()),
            _ => None,
        }
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// 数值数组
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    /// 元组维度
    tuple_shape: Vec<usize>,

    /// 分量维度
    component_shape: Vec<usize>,

    /// 数据
    store: DataStore,
}

impl DataArray {
    /// 由已有数据创建
    pub fn new(
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
        store: DataStore,
    ) -> Result<Self, DataStructureError> {
        let expected = element_count(&tuple_shape, &component_shape)?;
        if store.len() != expected {
            return Err(DataStructureError::ShapeMismatch {
                expected,
                actual: store.len(),
            });
        }
        Ok(Self {
            tuple_shape,
            component_shape,
            store,
        })
    }

    /// 创建填充默认值的数组
    pub fn zeros(
        data_type: DataType,
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
    ) -> Result<Self, DataStructureError> {
        let len = element_count(&tuple_shape, &component_shape)?;
        Ok(Self {
            tuple_shape,
            component_shape,
            store: DataStore::zeros(data_type, len),
        })
    }

    /// 创建数组对象并加入数据结构
    pub fn create<T: Element>(
        data: &mut DataStructure,
        name: impl Into<String>,
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
        parent: Option<DataId>,
    ) -> Result<DataId, DataStructureError> {
        let array = Self::zeros(T::DATA_TYPE, tuple_shape, component_shape)?;
        Self::insert(data, name, array, parent)
    }

    /// 用给定数据创建数组对象并加入数据结构
    pub fn create_with_values<T: Element>(
        data: &mut DataStructure,
        name: impl Into<String>,
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
        values: Vec<T>,
        parent: Option<DataId>,
    ) -> Result<DataId, DataStructureError> {
        let array = Self::new(tuple_shape, component_shape, T::into_store(values))?;
        Self::insert(data, name, array, parent)
    }

    fn insert(
        data: &mut DataStructure,
        name: impl Into<String>,
        array: DataArray,
        parent: Option<DataId>,
    ) -> Result<DataId, DataStructureError> {
        let id = data.generate_id();
        let object = DataObject::new(id, name, DataObjectKind::Array(array));
        data.insert_object(object, parent)
    }

    pub fn tuple_shape(&self) -> &[usize] {
        &self.tuple_shape
    }

    pub fn component_shape(&self) -> &[usize] {
        &self.component_shape
    }

    // 构造时已检查过维度乘积不溢出
    pub fn number_of_tuples(&self) -> usize {
        shape_product(&self.tuple_shape).unwrap_or_default()
    }

    pub fn number_of_components(&self) -> usize {
        shape_product(&self.component_shape).unwrap_or_default()
    }

    /// 元素总数
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn data_type(&self) -> DataType {
        self.store.data_type()
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// 类型化只读访问，类型不匹配时返回 `None`
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.store)
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(&mut self.store)
    }

    pub fn get<T: Element>(&self, index: usize) -> Option<T> {
        self.as_slice::<T>()?.get(index).copied()
    }

    /// 写入单个元素，索引越界或类型不匹配时返回 `false`
    pub fn set<T: Element>(&mut self, index: usize, value: T) -> bool {
        match self.as_mut_slice::<T>().and_then(|values| values.get_mut(index)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// 用同一个值填充
    pub fn fill<T: Element>(&mut self, value: T) -> bool {
        match self.as_mut_slice::<T>() {
            Some(values) => {
                values.fill(value);
                true
            }
            None => false,
        }
    }
}

/// 字符串数组，每个元组一个字符串
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringArray {
    values: Vec<String>,
}

impl StringArray {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// 创建字符串数组对象并加入数据结构
    pub fn create(
        data: &mut DataStructure,
        name: impl Into<String>,
        values: Vec<String>,
        parent: Option<DataId>,
    ) -> Result<DataId, DataStructureError> {
        let id = data.generate_id();
        let object = DataObject::new(id, name, DataObjectKind::StringArray(Self::new(values)));
        data.insert_object(object, parent)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 可变访问，元组数量保持不变
    pub fn values_mut(&mut self) -> &mut [String] {
        &mut self.values
    }

    pub fn set(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn number_of_tuples(&self) -> usize {
        self.values.len()
    }
}

/// 维度乘积，空维度视为1，溢出时返回 `None`
pub fn shape_product(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// 元组维度和分量维度对应的元素总数
fn element_count(tuple_shape: &[usize], component_shape: &[usize]) -> Result<usize, DataStructureError> {
    shape_product(tuple_shape)
        .and_then(|tuples| tuples.checked_mul(shape_product(component_shape)?))
        .ok_or_else(|| DataStructureError::ShapeOverflow([tuple_shape, component_shape].concat()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut array = DataArray::zeros(DataType::Int32, vec![10], vec![1]).unwrap();
        assert_eq!(array.len(), 10);
        assert_eq!(array.data_type(), DataType::Int32);

        assert!(array.set::<i32>(3, 42));
        assert_eq!(array.get::<i32>(3), Some(42));
        assert_eq!(array.get::<f32>(3), None);
        assert!(!array.set::<i32>(10, 1));
    }

    #[test]
    fn test_shape_mismatch() {
        let result = DataArray::new(vec![4], vec![3], DataStore::Float32(vec![0.0; 10]));
        assert_eq!(
            result,
            Err(DataStructureError::ShapeMismatch {
                expected: 12,
                actual: 10
            })
        );

        let array = DataArray::new(vec![2, 2], vec![3], DataStore::Float32(vec![0.0; 12])).unwrap();
        assert_eq!(array.number_of_tuples(), 4);
        assert_eq!(array.number_of_components(), 3);
    }

    #[test]
    fn test_shape_overflow() {
        assert_eq!(shape_product(&[]), Some(1));
        assert_eq!(shape_product(&[usize::MAX, 2]), None);

        let result = DataArray::new(vec![usize::MAX], vec![2], DataStore::UInt8(Vec::new()));
        assert!(matches!(result, Err(DataStructureError::ShapeOverflow(_))));
        let result = DataArray::zeros(DataType::UInt8, vec![usize::MAX / 2, 3], vec![1]);
        assert!(matches!(result, Err(DataStructureError::ShapeOverflow(_))));
    }

    #[test]
    fn test_string_values_keep_their_length() {
        let mut strings = StringArray::new(vec!["a".to_string(), "b".to_string()]);
        strings.values_mut()[0].push('x');
        assert!(strings.set(1, "c"));
        assert!(!strings.set(2, "d"));

        assert_eq!(strings.values(), &["ax".to_string(), "c".to_string()]);
        assert_eq!(strings.number_of_tuples(), 2);
    }

    #[test]
    fn test_le_bytes() {
        let store = DataStore::UInt16(vec![1, 0x0203]);
        let bytes = store.to_le_bytes();
        assert_eq!(bytes, vec![1, 0, 3, 2]);
        assert_eq!(DataStore::from_le_bytes(DataType::UInt16, &bytes), Some(store));
        assert_eq!(DataStore::from_le_bytes(DataType::UInt16, &[1, 2, 3]), None);

        let flags = DataStore::Boolean(vec![true, false]);
        assert_eq!(flags.to_le_bytes(), vec![1, 0]);
    }

    #[test]
    fn test_type_names() {
        for data_type in DataType::ALL {
            assert_eq!(DataType::from_name(data_type.as_str()), Some(data_type));
        }
        assert_eq!(DataType::from_name("complex"), None);
    }
}
