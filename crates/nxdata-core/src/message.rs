//! 结构变更通知
//!
//! 同步发布/订阅：`notify` 按注册顺序立即调用每个观察者。
//! 观察者只能拿到数据结构的只读引用，因此不能在回调中修改结构。

use crate::id::DataId;
use crate::structure::DataStructure;

/// 结构变更消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStructureMessage {
    /// 对象已加入
    Added { id: DataId },

    /// 对象已从最后一个父容器移除并注销
    Removed { id: DataId, name: String },

    /// 对象增加（`added = true`）或失去（`added = false`）一个父容器
    Reparented {
        target: DataId,
        parent: DataId,
        added: bool,
    },
}

impl DataStructureMessage {
    /// 消息涉及的对象
    pub fn target(&self) -> DataId {
        match self {
            DataStructureMessage::Added { id } | DataStructureMessage::Removed { id, .. } => *id,
            DataStructureMessage::Reparented { target, .. } => *target,
        }
    }
}

/// 观察者注册句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// 观察者回调
pub type Observer = Box<dyn FnMut(&DataStructure, &DataStructureMessage) + Send>;

/// 观察者列表
#[derive(Default)]
pub struct Signal {
    next_id: u64,
    slots: Vec<(ObserverId, Observer)>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.slots.push((id, observer));
        id
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot, _)| *slot != id);
        self.slots.len() != before
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn emit(&mut self, source: &DataStructure, message: &DataStructureMessage) {
        for (_, observer) in &mut self.slots {
            observer(source, message);
        }
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("observers", &self.slots.len())
            .finish()
    }
}
