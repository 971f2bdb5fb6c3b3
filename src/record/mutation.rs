//! 变更差异对账器
//!
//! 把一批无序、可能相互覆盖的原始变更通知归并为一个最小的 `MutationData`：
//! 1. 分类：丢弃新旧值相同的通知，拆出新增/移除，识别移动（已带 stamp 的节点再次被添加）
//! 2. 移除裁决：同批新增后又移除的互相抵消；祖先已移除的被吸收；移动配对被取消
//! 3. 新增定位：父节点和后继兄弟都必须已知，否则进重试队列；一整轮无进展即放弃
//! 4. 序列化：每个新增根连同整棵子树重新序列化，新节点按先序分配标识
//! 5. 输出：文本/属性只引用镜像中仍然活跃的标识

use std::collections::{HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace, warn};
use url::Url;

use crate::dom::{Document, Mirror, MutationRecord, NodeId, NodeKind, NodeRef};
use crate::event::{AddedNode, AttributeMutation, MutationData, RemovedNode, TextMutation};
use crate::snapshot::{document_base, serialize_node_with_id, transform_attr};

/// 一次 flush 的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushOutcome {
    /// 空批次为 None，不产生事件
    pub data: Option<MutationData>,
    /// 重试队列放弃时仍无法定位的新增根数量
    pub stranded: usize,
}

/// 对一批通知做对账。`mirror` 必须是生成前一份快照时使用的同一个镜像。
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn reconcile(doc: &Document, mirror: &mut Mirror, records: Vec<MutationRecord>) -> FlushOutcome {
    let mut batch = MutationBatch::new(doc, mirror);
    for record in records {
        batch.classify(record);
    }
    batch.finish()
}

struct MutationBatch<'a> {
    doc: &'a Document,
    mirror: &'a mut Mirror,
    base: Option<Url>,
    texts: IndexSet<NodeRef>,
    attrs: IndexMap<NodeRef, IndexMap<String, Option<String>>>,
    pending_removes: Vec<(NodeRef, RemovedNode)>,
    added: IndexSet<NodeRef>,
    moved: IndexSet<NodeRef>,
    moved_keys: HashSet<(NodeId, NodeId)>,
}

impl<'a> MutationBatch<'a> {
    fn new(doc: &'a Document, mirror: &'a mut Mirror) -> Self {
        Self {
            doc,
            mirror,
            base: document_base(&doc.info().href),
            texts: IndexSet::new(),
            attrs: IndexMap::new(),
            pending_removes: Vec::new(),
            added: IndexSet::new(),
            moved: IndexSet::new(),
            moved_keys: HashSet::new(),
        }
    }

    fn classify(&mut self, record: MutationRecord) {
        match record {
            MutationRecord::CharacterData { target, old_value } => {
                let Some(value) = self.doc.kind(target).and_then(NodeKind::character_data) else {
                    trace!(?target, "字符数据通知指向非字符节点，忽略");
                    return;
                };
                if old_value.as_deref() == Some(value) {
                    return;
                }
                self.texts.insert(target);
            }
            MutationRecord::Attributes {
                target,
                name,
                old_value,
            } => {
                if self.doc.tag(target).is_none() {
                    trace!(?target, "属性通知指向非元素节点，忽略");
                    return;
                }
                let value = self.doc.attribute(target, &name);
                if old_value.as_deref() == value {
                    return;
                }
                let value = value.map(|v| transform_attr(&name, v, self.base.as_ref()));
                self.attrs.entry(target).or_default().insert(name, value);
            }
            MutationRecord::ChildList {
                target,
                added,
                removed,
            } => {
                for node in added {
                    self.gen_adds(node, target);
                }
                for node in removed {
                    self.handle_remove(node, target);
                }
            }
        }
    }

    /// 标记新增：带 stamp 的是移动，否则是新节点；子孙一并标记。
    fn gen_adds(&mut self, node: NodeRef, parent: NodeRef) {
        let mut stack = vec![(node, Some(parent))];
        while let Some((n, parent)) = stack.pop() {
            match self.mirror.get_id(n) {
                Some(id) => {
                    self.moved.insert(n);
                    if let Some(pid) = parent.and_then(|p| self.mirror.get_id(p)) {
                        self.moved_keys.insert((id, pid));
                    }
                }
                None => {
                    self.added.insert(n);
                }
            }
            stack.extend(self.doc.children(n).iter().rev().map(|&c| (c, None)));
        }
    }

    fn handle_remove(&mut self, node: NodeRef, target: NodeRef) {
        let id = self.mirror.get_id(node);
        let parent_id = self.mirror.get_id(target);

        if self.added.contains(&node) {
            // 同批新增又移除：互相抵消
            deep_delete(self.doc, &mut self.added, node);
        } else if self.added.contains(&target) && id.is_none() {
            // 父节点本批新增、该节点从未序列化：父节点序列化时自然不包含它
        } else if self.is_ancestor_removed(target) {
            // 祖先已经移除，回放侧随祖先一起消失
        } else if let (Some(id), Some(pid)) = (id, parent_id)
            && self.moved.contains(&node)
            && self.moved_keys.contains(&(id, pid))
        {
            // 移入后又移出：取消这次移动
            deep_delete(self.doc, &mut self.moved, node);
            self.moved_keys.remove(&(id, pid));
        } else if let (Some(id), Some(parent_id)) = (id, parent_id) {
            self.pending_removes
                .push((node, RemovedNode { id, parent_id }));
        } else {
            trace!(?node, "移除通知引用未知节点，丢弃");
        }
        self.mirror.remove(self.doc, node);
    }

    fn is_ancestor_removed(&self, target: NodeRef) -> bool {
        let mut cur = target;
        loop {
            if self.mirror.live_id(cur).is_none() {
                return true;
            }
            match self.doc.parent(cur) {
                None => return !self.doc.is_document(cur),
                Some(p) if self.doc.is_document(p) => return false,
                Some(p) => cur = p,
            }
        }
    }

    /// 尝试定位并序列化一个新增根；锚点未就绪返回 false。
    fn push_add(
        &mut self,
        node: NodeRef,
        adds: &mut Vec<AddedNode>,
        serialized: &mut HashSet<NodeRef>,
    ) -> bool {
        let Some(parent_id) = self
            .doc
            .parent(node)
            .and_then(|p| self.mirror.live_id(p))
        else {
            return false;
        };
        let next_id = match self.doc.next_sibling(node) {
            None => None,
            Some(next) => match self.mirror.live_id(next) {
                Some(id) => Some(id),
                None => return false,
            },
        };
        let Some(serialized_node) = serialize_node_with_id(self.doc, node, self.mirror) else {
            return true;
        };
        serialized.extend(self.doc.descendants(node));
        adds.push(AddedNode {
            parent_id,
            next_id,
            node: serialized_node,
        });
        true
    }

    fn finish(mut self) -> FlushOutcome {
        // 新增根：仍挂在文档上、且没有祖先同为新增根的节点
        let mut candidates: IndexSet<NodeRef> = IndexSet::new();
        for &n in self.moved.iter().chain(self.added.iter()) {
            if self.doc.is_attached(n) {
                candidates.insert(n);
            }
        }
        let roots: Vec<NodeRef> = candidates
            .iter()
            .copied()
            .filter(|&n| !has_ancestor_in(self.doc, &candidates, n))
            .collect();

        let mut adds = Vec::new();
        let mut serialized = HashSet::new();
        let mut queue = VecDeque::new();
        for n in roots {
            if !self.push_add(n, &mut adds, &mut serialized) {
                queue.push_back(n);
            }
        }

        let mut stranded = 0;
        while !queue.is_empty() {
            let before = queue.len();
            for _ in 0..before {
                let Some(n) = queue.pop_front() else {
                    break;
                };
                if !self.push_add(n, &mut adds, &mut serialized) {
                    queue.push_back(n);
                }
            }
            if queue.len() == before {
                // 整轮无进展：可能是边界情况，立即跳出避免死循环
                stranded = queue.len();
                warn!(stranded, "重试队列无法继续定位，放弃剩余新增");
                break;
            }
        }

        // 被新增子树重新携带的节点不再需要移除条目
        let mut seen = HashSet::new();
        let removes: Vec<RemovedNode> = self
            .pending_removes
            .iter()
            .filter(|(node, _)| !serialized.contains(node))
            .filter(|(_, rm)| seen.insert(rm.id))
            .map(|(_, rm)| *rm)
            .collect();

        let texts: Vec<TextMutation> = self
            .texts
            .iter()
            .filter(|n| !serialized.contains(n))
            .filter_map(|&n| {
                let id = self.mirror.live_id(n)?;
                let value = self.doc.kind(n)?.character_data()?.to_string();
                Some(TextMutation {
                    id,
                    value: Some(value),
                })
            })
            .collect();

        let attributes: Vec<AttributeMutation> = std::mem::take(&mut self.attrs)
            .into_iter()
            .filter(|(n, _)| !serialized.contains(n))
            .filter_map(|(n, attributes)| {
                let id = self.mirror.live_id(n)?;
                Some(AttributeMutation { id, attributes })
            })
            .collect();

        let data = MutationData {
            texts,
            attributes,
            removes,
            adds,
        };
        debug!(
            texts = data.texts.len(),
            attributes = data.attributes.len(),
            removes = data.removes.len(),
            adds = data.adds.len(),
            stranded,
            "对账完成"
        );
        FlushOutcome {
            data: (!data.is_empty()).then_some(data),
            stranded,
        }
    }
}

fn deep_delete(doc: &Document, set: &mut IndexSet<NodeRef>, node: NodeRef) {
    for n in doc.descendants(node) {
        set.shift_remove(&n);
    }
}

fn has_ancestor_in(doc: &Document, set: &IndexSet<NodeRef>, node: NodeRef) -> bool {
    let mut cur = doc.parent(node);
    while let Some(p) = cur {
        if set.contains(&p) {
            return true;
        }
        cur = doc.parent(p);
    }
    false
}
