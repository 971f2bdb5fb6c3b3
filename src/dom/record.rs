//! 变更通知
//!
//! 文档在观察期间产生的原始结构变更记录。

use super::id::NodeRef;

/// 一条原始变更通知。批次内顺序即发生顺序；移动先在旧父节点上报告移除，再在新父节点上报告添加。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// 字符数据变化
    CharacterData {
        target: NodeRef,
        old_value: Option<String>,
    },
    /// 属性变化（`old_value` 为 None 表示之前不存在）
    Attributes {
        target: NodeRef,
        name: String,
        old_value: Option<String>,
    },
    /// 子节点列表变化
    ChildList {
        target: NodeRef,
        added: Vec<NodeRef>,
        removed: Vec<NodeRef>,
    },
}
