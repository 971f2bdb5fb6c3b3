//! 标识镜像
//!
//! 稳定标识与节点句柄之间的双向映射，每个会话每一侧各一份。

use std::collections::HashMap;

use super::document::Document;
use super::id::{NodeId, NodeRef};
use tracing::trace;

/// 标识镜像。
///
/// 节点第一次被序列化时盖上标识（stamp），之后即使被退役也保留这个 stamp；
/// `get_node`/`has` 只看活跃映射。录制侧据此识别“移动”：
/// 再次出现在添加列表里、但已带 stamp 的节点就是被移动的已知节点。
#[derive(Debug, Default, Clone)]
pub struct Mirror {
    stamps: HashMap<NodeRef, NodeId>,
    live: HashMap<NodeId, NodeRef>,
    last_id: u32,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// 节点的 stamp（退役后依然存在）
    pub fn get_id(&self, node: NodeRef) -> Option<NodeId> {
        self.stamps.get(&node).copied()
    }

    /// 节点当前是否在活跃映射中，是则返回其标识
    pub fn live_id(&self, node: NodeRef) -> Option<NodeId> {
        let id = self.get_id(node)?;
        (self.live.get(&id) == Some(&node)).then_some(id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<NodeRef> {
        self.live.get(&id).copied()
    }

    pub fn has(&self, id: NodeId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// 用给定标识登记节点（回放侧保留事件里携带的标识）
    pub fn register(&mut self, id: NodeId, node: NodeRef) {
        self.stamps.insert(node, id);
        self.live.insert(id, node);
        self.last_id = self.last_id.max(id.0);
    }

    /// 录制侧：复用已有 stamp，否则分配新标识；并登记为活跃。
    pub fn assign(&mut self, node: NodeRef) -> NodeId {
        let id = match self.get_id(node) {
            Some(id) => id,
            None => {
                self.last_id += 1;
                NodeId(self.last_id)
            }
        };
        self.register(id, node);
        id
    }

    /// 退役节点及其当前整棵子树的活跃标识。stamp 保留。
    pub fn remove(&mut self, doc: &Document, node: NodeRef) {
        for n in doc.descendants(node) {
            if let Some(id) = self.get_id(n)
                && self.live.get(&id) == Some(&n)
            {
                trace!(id = id.0, "退役标识");
                self.live.remove(&id);
            }
        }
    }

    /// 清空活跃映射（全量快照前调用）
    pub fn reset(&mut self) {
        self.live.clear();
    }
}
