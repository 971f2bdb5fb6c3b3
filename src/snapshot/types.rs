use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

/// 带标识的节点描述，足以在另一棵树里重建该节点及其子树。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: SerializedKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum SerializedKind {
    Document {
        child_nodes: Vec<SerializedNode>,
    },
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag_name: String,
        attributes: IndexMap<String, String>,
        child_nodes: Vec<SerializedNode>,
    },
    Text {
        text_content: String,
    },
    Comment {
        text_content: String,
    },
    Cdata {
        text_content: String,
    },
}

impl SerializedNode {
    pub fn children(&self) -> &[SerializedNode] {
        match &self.kind {
            SerializedKind::Document { child_nodes } | SerializedKind::Element { child_nodes, .. } => {
                child_nodes
            }
            _ => &[],
        }
    }

    /// 子树内所有标识（先序）
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            out.push(n.id);
            stack.extend(n.children().iter().rev());
        }
        out
    }
}
