use crate::dom::{Document, DocumentInfo, NodeRef};

mod player;
mod recorder;
mod timer;

pub(crate) const HREF: &str = "https://demo.local/app/index.html";

/// `<html><head></head><body></body></html>`，返回 (文档, body)
pub(crate) fn page() -> (Document, NodeRef) {
    let mut doc = Document::new(DocumentInfo {
        href: HREF.to_string(),
        ..DocumentInfo::default()
    });
    let root = doc.root();
    let html = doc.create_element("html");
    let head = doc.create_element("head");
    let body = doc.create_element("body");
    doc.append_child(root, html).expect("append html");
    doc.append_child(html, head).expect("append head");
    doc.append_child(html, body).expect("append body");
    (doc, body)
}

/// 往父节点下追加一个元素
pub(crate) fn append_el(doc: &mut Document, parent: NodeRef, tag: &str) -> NodeRef {
    let el = doc.create_element(tag);
    doc.append_child(parent, el).expect("append element");
    el
}
