//! 序列化
//!
//! 先序遍历子树，复用已有 stamp、给新节点分配标识，并把每个节点登记到镜像。

use url::Url;

use super::resolve::{absolute_to_stylesheet, document_base, transform_attr};
use super::types::{SerializedKind, SerializedNode};
use crate::dom::{Document, Mirror, NodeKind, NodeRef};
use crate::error::SnapshotError;
use tracing::{debug, info};

/// 序列化 `node` 及其完整子树；未知句柄返回 None。
pub fn serialize_node_with_id(
    doc: &Document,
    node: NodeRef,
    mirror: &mut Mirror,
) -> Option<SerializedNode> {
    let base = document_base(&doc.info().href);
    serialize_inner(doc, node, mirror, base.as_ref(), false)
}

fn serialize_inner(
    doc: &Document,
    node: NodeRef,
    mirror: &mut Mirror,
    base: Option<&Url>,
    in_style: bool,
) -> Option<SerializedNode> {
    let kind = doc.kind(node)?;
    // 先序：父节点先拿标识
    let id = mirror.assign(node);
    let kind = match kind {
        NodeKind::Document => SerializedKind::Document {
            child_nodes: serialize_children(doc, node, mirror, base, false),
        },
        NodeKind::DocumentType {
            name,
            public_id,
            system_id,
        } => SerializedKind::DocumentType {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeKind::Element { tag, attributes } => SerializedKind::Element {
            tag_name: tag.clone(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.clone(), transform_attr(k, v, base)))
                .collect(),
            child_nodes: serialize_children(doc, node, mirror, base, tag == "style"),
        },
        NodeKind::Text(text) => SerializedKind::Text {
            text_content: if in_style {
                absolute_to_stylesheet(text, base)
            } else {
                text.clone()
            },
        },
        NodeKind::Comment(text) => SerializedKind::Comment {
            text_content: text.clone(),
        },
        NodeKind::CData(text) => SerializedKind::Cdata {
            text_content: text.clone(),
        },
    };
    Some(SerializedNode { id, kind })
}

fn serialize_children(
    doc: &Document,
    node: NodeRef,
    mirror: &mut Mirror,
    base: Option<&Url>,
    in_style: bool,
) -> Vec<SerializedNode> {
    doc.children(node)
        .iter()
        .filter_map(|&c| serialize_inner(doc, c, mirror, base, in_style))
        .collect()
}

/// 全量快照：重置镜像的活跃映射后序列化整棵文档。
#[tracing::instrument(skip(doc, mirror), fields(href = %doc.info().href))]
pub fn snapshot(doc: &Document, mirror: &mut Mirror) -> Result<SerializedNode, SnapshotError> {
    if doc.document_element().is_none() {
        debug!("文档没有根元素");
        return Err(SnapshotError::NoDocumentElement);
    }
    mirror.reset();
    let node = serialize_node_with_id(doc, doc.root(), mirror)
        .ok_or(SnapshotError::NoDocumentElement)?;
    info!(nodes = mirror.len(), "📸 全量快照完成");
    Ok(node)
}
