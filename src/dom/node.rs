//! 节点类型
//!
//! 定义节点种类与回放可见的节点状态。

use indexmap::IndexMap;

use super::id::NodeRef;

/// 节点种类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
    CData(String),
}

impl NodeKind {
    /// 能否拥有子节点
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Element { .. })
    }

    /// 字符数据（text/comment/cdata）
    pub fn character_data(&self) -> Option<&str> {
        match self {
            NodeKind::Text(s) | NodeKind::Comment(s) | NodeKind::CData(s) => Some(s),
            _ => None,
        }
    }
}

/// 节点上回放可见、但不属于结构的状态（滚动、表单值、媒体、样式规则、hover）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    pub scroll_left: i64,
    pub scroll_top: i64,
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub paused: bool,
    pub sheet_rules: Vec<String>,
    pub hovered: bool,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            scroll_left: 0,
            scroll_top: 0,
            value: None,
            checked: None,
            paused: true,
            sheet_rules: Vec::new(),
            hovered: false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeRef>,
    pub(crate) children: Vec<NodeRef>,
    pub(crate) state: NodeState,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            state: NodeState::default(),
        }
    }
}
