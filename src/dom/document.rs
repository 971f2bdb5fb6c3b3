//! 文档
//!
//! arena 形式的文档树。节点在整个会话内都可寻址（分离的节点不回收），
//! 观察开启时每次结构/属性/文本修改都会排入一条 `MutationRecord`。

use indexmap::IndexMap;
use tracing::trace;

use super::id::NodeRef;
use super::node::{NodeData, NodeKind, NodeState};
use super::record::MutationRecord;
use crate::error::DomError;

/// 文档加载状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    Loading,
    Interactive,
    #[default]
    Complete,
}

/// 文档级信息（地址、视口、加载状态）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub href: String,
    pub width: u32,
    pub height: u32,
    pub ready_state: ReadyState,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            href: "about:blank".to_string(),
            width: 1280,
            height: 720,
            ready_state: ReadyState::Complete,
        }
    }
}

/// 文档树
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeRef,
    info: DocumentInfo,
    focused: Option<NodeRef>,
    observing: bool,
    records: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DocumentInfo::default())
    }
}

impl Document {
    pub fn new(info: DocumentInfo) -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            root: NodeRef(0),
            info,
            focused: None,
            observing: false,
            records: Vec::new(),
        }
    }

    /// 文档节点
    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut DocumentInfo {
        &mut self.info
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeRef {
        let node = NodeRef(self.nodes.len());
        self.nodes.push(NodeData::new(kind));
        node
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeRef {
        self.alloc(NodeKind::Element {
            tag: tag.into().to_ascii_lowercase(),
            attributes: IndexMap::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeRef {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeRef {
        self.alloc(NodeKind::Comment(text.into()))
    }

    pub fn create_cdata(&mut self, text: impl Into<String>) -> NodeRef {
        self.alloc(NodeKind::CData(text.into()))
    }

    pub fn create_doctype(
        &mut self,
        name: impl Into<String>,
        public_id: impl Into<String>,
        system_id: impl Into<String>,
    ) -> NodeRef {
        self.alloc(NodeKind::DocumentType {
            name: name.into(),
            public_id: public_id.into(),
            system_id: system_id.into(),
        })
    }

    /// 按种类创建节点（回放侧物化时使用）
    pub fn create_node(&mut self, kind: NodeKind) -> NodeRef {
        self.alloc(kind)
    }

    fn data(&self, node: NodeRef) -> Result<&NodeData, DomError> {
        self.nodes.get(node.0).ok_or(DomError::UnknownNode(node))
    }

    fn data_mut(&mut self, node: NodeRef) -> Result<&mut NodeData, DomError> {
        self.nodes.get_mut(node.0).ok_or(DomError::UnknownNode(node))
    }

    pub fn kind(&self, node: NodeRef) -> Option<&NodeKind> {
        self.nodes.get(node.0).map(|d| &d.kind)
    }

    pub fn state(&self, node: NodeRef) -> Option<&NodeState> {
        self.nodes.get(node.0).map(|d| &d.state)
    }

    pub fn state_mut(&mut self, node: NodeRef) -> Option<&mut NodeState> {
        self.nodes.get_mut(node.0).map(|d| &mut d.state)
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.get(node.0).and_then(|d| d.parent)
    }

    pub fn children(&self, node: NodeRef) -> &[NodeRef] {
        self.nodes
            .get(node.0)
            .map(|d| d.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn next_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == node)?;
        siblings.get(pos + 1).copied()
    }

    pub fn tag(&self, node: NodeRef) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attribute(&self, node: NodeRef, name: &str) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn is_document(&self, node: NodeRef) -> bool {
        matches!(self.kind(node), Some(NodeKind::Document))
    }

    /// `node` 是否为 `ancestor` 本身或其后代
    pub fn contains(&self, ancestor: NodeRef, node: NodeRef) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// 是否挂在本文档的根上
    pub fn is_attached(&self, node: NodeRef) -> bool {
        self.contains(self.root, node)
    }

    /// 第一个元素子节点（`<html>`）
    pub fn document_element(&self) -> Option<NodeRef> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|&c| self.tag(c).is_some())
    }

    /// 按标签名先序查找第一个元素
    pub fn find_element(&self, tag: &str) -> Option<NodeRef> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.tag(n) == Some(tag))
    }

    /// 先序遍历（含自身）
    pub fn descendants(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    fn push_record(&mut self, record: MutationRecord) {
        if self.observing {
            trace!(?record, "排入变更通知");
            self.records.push(record);
        }
    }

    /// 开关变更观察；关闭时丢弃未取走的通知。
    pub fn observe(&mut self, on: bool) {
        self.observing = on;
        if !on {
            self.records.clear();
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// 取走当前批次的所有变更通知
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    fn check_insert(&self, parent: NodeRef, child: NodeRef) -> Result<(), DomError> {
        let parent_kind = &self.data(parent)?.kind;
        let child_kind = &self.data(child)?.kind;
        if !parent_kind.is_container()
            || matches!(child_kind, NodeKind::Document)
            || self.contains(child, parent)
        {
            return Err(DomError::Hierarchy { parent, child });
        }
        Ok(())
    }

    /// 从当前父节点摘下（若有），返回原父节点。
    pub fn detach(&mut self, node: NodeRef) -> Option<NodeRef> {
        let parent = self.parent(node)?;
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.retain(|&c| c != node);
        }
        if let Some(d) = self.nodes.get_mut(node.0) {
            d.parent = None;
        }
        self.push_record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![node],
        });
        Some(parent)
    }

    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// 把 `child` 插到 `before` 之前（None 表示末尾）。已挂载的 `child` 会先从旧位置移除。
    pub fn insert_before(
        &mut self,
        parent: NodeRef,
        child: NodeRef,
        before: Option<NodeRef>,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        let before = match before {
            Some(b) if b == child => self.next_sibling(child),
            other => other,
        };
        if let Some(b) = before
            && self.parent(b) != Some(parent)
        {
            return Err(DomError::NotAChild { parent, child: b });
        }

        self.detach(child);

        let p = self.data_mut(parent)?;
        let idx = before
            .and_then(|b| p.children.iter().position(|&c| c == b))
            .unwrap_or(p.children.len());
        p.children.insert(idx, child);
        self.data_mut(child)?.parent = Some(parent);

        self.push_record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        node: NodeRef,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        let NodeKind::Element { attributes, .. } = &mut self.data_mut(node)?.kind else {
            return Err(DomError::WrongKind(node));
        };
        let old_value = attributes.insert(name.clone(), value);
        self.push_record(MutationRecord::Attributes {
            target: node,
            name,
            old_value,
        });
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeRef, name: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let NodeKind::Element { attributes, .. } = &mut self.data_mut(node)?.kind else {
            return Err(DomError::WrongKind(node));
        };
        let Some(old) = attributes.shift_remove(&name) else {
            return Ok(());
        };
        self.push_record(MutationRecord::Attributes {
            target: node,
            name,
            old_value: Some(old),
        });
        Ok(())
    }

    /// 修改字符数据节点（text/comment/cdata）的内容
    pub fn set_data(&mut self, node: NodeRef, data: impl Into<String>) -> Result<(), DomError> {
        let data = data.into();
        let old = match &mut self.data_mut(node)?.kind {
            NodeKind::Text(s) | NodeKind::Comment(s) | NodeKind::CData(s) => {
                std::mem::replace(s, data)
            }
            _ => return Err(DomError::WrongKind(node)),
        };
        self.push_record(MutationRecord::CharacterData {
            target: node,
            old_value: Some(old),
        });
        Ok(())
    }

    /// `textContent` 赋值语义：字符数据直接改；容器节点替换为单个文本子节点（空串则清空）。
    pub fn set_text_content(&mut self, node: NodeRef, text: &str) -> Result<(), DomError> {
        if self.data(node)?.kind.character_data().is_some() {
            return self.set_data(node, text);
        }
        if !self.data(node)?.kind.is_container() {
            return Err(DomError::WrongKind(node));
        }
        for child in self.children(node).to_vec() {
            self.detach(child);
        }
        if !text.is_empty() {
            let t = self.create_text(text);
            self.append_child(node, t)?;
        }
        Ok(())
    }

    pub fn focused(&self) -> Option<NodeRef> {
        self.focused
    }

    pub fn set_focused(&mut self, node: Option<NodeRef>) {
        self.focused = node;
    }

    /// 插入一条样式规则，下标越界时夹到末尾；返回实际下标。
    pub fn insert_rule(
        &mut self,
        node: NodeRef,
        rule: &str,
        index: Option<usize>,
    ) -> Result<usize, DomError> {
        if self.tag(node) != Some("style") {
            return Err(DomError::WrongKind(node));
        }
        let rule = rule.trim();
        if rule.is_empty() || !rule.contains('{') || !rule.ends_with('}') {
            return Err(DomError::InvalidRule(rule.to_string()));
        }
        let rules = &mut self.data_mut(node)?.state.sheet_rules;
        let idx = index.unwrap_or(rules.len()).min(rules.len());
        rules.insert(idx, rule.to_string());
        Ok(idx)
    }

    pub fn delete_rule(&mut self, node: NodeRef, index: usize) -> Result<(), DomError> {
        if self.tag(node) != Some("style") {
            return Err(DomError::WrongKind(node));
        }
        let rules = &mut self.data_mut(node)?.state.sheet_rules;
        if index >= rules.len() {
            return Err(DomError::IndexSize {
                index,
                len: rules.len(),
            });
        }
        rules.remove(index);
        Ok(())
    }

    /// 序列化成 HTML 风格的字符串（调试输出与结构比较用）
    pub fn to_html(&self, node: NodeRef) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeRef, out: &mut String) {
        let Some(kind) = self.kind(node) else {
            return;
        };
        match kind {
            NodeKind::Document => {
                for &c in self.children(node) {
                    self.write_html(c, out);
                }
            }
            NodeKind::DocumentType { name, .. } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attributes {
                    out.push_str(&format!(" {k}=\"{}\"", escape(v)));
                }
                out.push('>');
                for &c in self.children(node) {
                    self.write_html(c, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Text(s) => out.push_str(&escape(s)),
            NodeKind::Comment(s) => {
                out.push_str("<!--");
                out.push_str(s);
                out.push_str("-->");
            }
            NodeKind::CData(s) => {
                out.push_str("<![CDATA[");
                out.push_str(s);
                out.push_str("]]>");
            }
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
