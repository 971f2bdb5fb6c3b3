//! 重建
//!
//! 把 `SerializedNode` 物化进目标文档，保留事件里携带的标识。

use super::types::{SerializedKind, SerializedNode};
use crate::dom::{Document, DocumentInfo, Mirror, NodeKind, NodeRef};
use tracing::{debug, trace};

/// 物化子树并登记标识，返回子树根（尚未挂到任何父节点上）。
///
/// 子树里已在目标镜像中活跃的标识表示移动：旧节点先被摘下并退役，
/// 避免同一标识在目标树里出现两份。
pub fn build_node_with_id(
    serialized: &SerializedNode,
    doc: &mut Document,
    mirror: &mut Mirror,
) -> NodeRef {
    for id in serialized.ids() {
        if let Some(old) = mirror.get_node(id) {
            trace!(id = id.0, "标识已存在，摘下旧节点");
            doc.detach(old);
            mirror.remove(doc, old);
        }
    }
    build_inner(serialized, doc, mirror)
}

fn build_inner(serialized: &SerializedNode, doc: &mut Document, mirror: &mut Mirror) -> NodeRef {
    let node = match &serialized.kind {
        // 文档节点映射到目标文档自身的根
        SerializedKind::Document { .. } => doc.root(),
        SerializedKind::DocumentType {
            name,
            public_id,
            system_id,
        } => doc.create_doctype(name.clone(), public_id.clone(), system_id.clone()),
        SerializedKind::Element {
            tag_name,
            attributes,
            ..
        } => doc.create_node(NodeKind::Element {
            tag: tag_name.clone(),
            attributes: attributes.clone(),
        }),
        SerializedKind::Text { text_content } => doc.create_text(text_content.clone()),
        SerializedKind::Comment { text_content } => doc.create_comment(text_content.clone()),
        SerializedKind::Cdata { text_content } => doc.create_cdata(text_content.clone()),
    };
    mirror.register(serialized.id, node);

    for child in serialized.children() {
        let c = build_inner(child, doc, mirror);
        if let Err(err) = doc.append_child(node, c) {
            debug!(%err, "忽略无法挂载的子节点");
            mirror.remove(doc, c);
        }
    }
    node
}

/// 从全量快照重建一份新文档和对应的镜像。
pub fn rebuild(serialized: &SerializedNode, info: DocumentInfo) -> (Document, Mirror) {
    let mut doc = Document::new(info);
    let mut mirror = Mirror::new();
    let node = build_node_with_id(serialized, &mut doc, &mut mirror);
    if node != doc.root() {
        let root = doc.root();
        if let Err(err) = doc.append_child(root, node) {
            debug!(%err, "快照根无法挂到文档上");
        }
    }
    debug!(nodes = mirror.len(), "重建完成");
    (doc, mirror)
}
