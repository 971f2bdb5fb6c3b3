//! 回放对账引擎
//!
//! 把事件应用到重建出来的目标文档上。目标侧镜像由最近一次全量快照填充，
//! 之后随 `adds`/`removes` 同步登记和退役；事件里的标识原样沿用。
//!
//! 所有引用未知标识的条目都静默跳过；`adds` 的锚点未就绪时进入重试队列，
//! 一整轮无进展即放弃并计入 `stranded`。

use std::collections::VecDeque;
use std::rc::Rc;

use super::actions::MoveCursor;
use super::notification::{Listener, PlayerEvent};
use crate::dom::{Document, Mirror, NodeId, NodeRef};
use crate::event::{
    AddedNode, Event, EventKind, FullSnapshotData, IncrementalData, InputData, InputValue,
    MediaAct, MediaInteractionData, MouseInteraction, MouseInteractionData, MouseMoveData,
    MutationData, ScrollData, StyleSheetRuleData,
};
use crate::snapshot::{build_node_with_id, rebuild};
use crate::timer::{Millis, Timer};
use tracing::{debug, trace, warn};

/// 重建后注入的内置样式
const BUILTIN_STYLE_RULES: &[&str] = &[
    "iframe { background: #ccc; }",
    "noscript { display: none !important; }",
];

/// 回放光标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub x: i64,
    pub y: i64,
    /// 点击/触摸后置位，下一次移动清除
    pub active: bool,
}

/// 事件的调度延迟。指针轨迹以第一个采样点的时间为准。
pub fn delay_of(event: &Event, baseline: i64) -> Millis {
    let first_sample = match event.incremental() {
        Some(IncrementalData::MouseMove(d) | IncrementalData::TouchMove(d)) => {
            d.positions.first().map(|p| p.time_offset)
        }
        _ => None,
    };
    Millis(event.timestamp + first_sample.unwrap_or(0) - baseline)
}

/// 回放世界：定时器上的任务都作用于它。
pub struct Replayer {
    events: Rc<[Event]>,
    doc: Document,
    mirror: Mirror,
    baseline: i64,
    cursor: Cursor,
    viewport: (u32, u32),
    hovered: Vec<NodeRef>,
    last_played: Option<usize>,
    applied: Vec<bool>,
    stranded: usize,
    insert_style_rules: Vec<String>,
    listeners: Vec<Listener>,
}

impl Replayer {
    pub fn new(events: Vec<Event>, insert_style_rules: Vec<String>) -> Self {
        let doc = Document::default();
        let viewport = (doc.info().width, doc.info().height);
        let applied = vec![false; events.len()];
        Self {
            events: events.into(),
            doc,
            mirror: Mirror::new(),
            baseline: 0,
            cursor: Cursor::default(),
            viewport,
            hovered: Vec::new(),
            last_played: None,
            applied,
            stranded: 0,
            insert_style_rules,
            listeners: Vec::new(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// 目标文档
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// 目标侧镜像
    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// 当前悬停链（目标节点及其祖先）
    pub fn hovered(&self) -> &[NodeRef] {
        &self.hovered
    }

    pub fn baseline(&self) -> i64 {
        self.baseline
    }

    pub(crate) fn set_baseline(&mut self, baseline: i64) {
        self.baseline = baseline;
    }

    /// 最近一个完整应用的事件下标
    pub fn last_played(&self) -> Option<usize> {
        self.last_played
    }

    /// 放弃的 `adds` 条目累计数
    pub fn stranded(&self) -> usize {
        self.stranded
    }

    /// 第 `index` 个事件在当前这轮播放中是否已经应用
    pub fn is_cast(&self, index: usize) -> bool {
        self.applied.get(index).copied().unwrap_or(false)
    }

    pub(crate) fn reset_progress(&mut self) {
        self.last_played = None;
        self.applied.fill(false);
    }

    pub(crate) fn on(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub(crate) fn notify(&mut self, event: PlayerEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// 应用第 `index` 个事件。`sync` 为 true 表示追赶模式（事件早于基线）。
    pub fn cast(&mut self, index: usize, timer: &mut Timer<Replayer>, sync: bool) {
        let events = Rc::clone(&self.events);
        let Some(event) = events.get(index) else {
            warn!(index, "事件下标越界");
            return;
        };
        match &event.kind {
            EventKind::Meta { data } => self.resize(data.width, data.height),
            EventKind::FullSnapshot { data } => self.rebuild_full_snapshot(data),
            EventKind::IncrementalSnapshot { data } => {
                self.apply_incremental(event.timestamp, data, timer, sync)
            }
            EventKind::Loaded | EventKind::DomContentLoaded | EventKind::Custom { .. } => {}
        }
        self.last_played = Some(index);
        if let Some(slot) = self.applied.get_mut(index) {
            *slot = true;
        }
        self.notify(PlayerEvent::EventCast { index });
    }

    fn rebuild_full_snapshot(&mut self, data: &FullSnapshotData) {
        let info = self.doc.info().clone();
        let (doc, mirror) = rebuild(&data.node, info);
        self.doc = doc;
        self.mirror = mirror;
        self.hovered.clear();
        self.inject_style_rules();
        self.notify(PlayerEvent::FullSnapshotRebuilt);

        let root = self.doc.root();
        if let Some(state) = self.doc.state_mut(root) {
            state.scroll_top = data.offset.top;
            state.scroll_left = data.offset.left;
        }
        debug!(nodes = self.mirror.len(), "全量快照已重建");
    }

    /// 在 `<head>` 之前插入一个不登记标识的 `<style>`
    fn inject_style_rules(&mut self) {
        let Some(html) = self.doc.document_element() else {
            return;
        };
        let style = self.doc.create_element("style");
        let rules = BUILTIN_STYLE_RULES
            .iter()
            .copied()
            .chain(self.insert_style_rules.iter().map(String::as_str));
        for rule in rules {
            if let Err(err) = self.doc.insert_rule(style, rule, None) {
                debug!(%err, rule, "忽略无法注入的样式规则");
            }
        }
        let head = self
            .doc
            .children(html)
            .iter()
            .copied()
            .find(|&c| self.doc.tag(c) == Some("head"));
        if let Err(err) = self.doc.insert_before(html, style, head) {
            debug!(%err, "注入样式失败");
        }
    }

    #[tracing::instrument(skip(self, data, timer))]
    fn apply_incremental(
        &mut self,
        ts: i64,
        data: &IncrementalData,
        timer: &mut Timer<Replayer>,
        sync: bool,
    ) {
        match data {
            IncrementalData::Mutation(d) => self.apply_mutation(d),
            IncrementalData::MouseMove(d) | IncrementalData::TouchMove(d) => {
                self.apply_pointer_move(ts, d, timer, sync)
            }
            IncrementalData::MouseInteraction(d) => self.apply_mouse_interaction(d, sync),
            IncrementalData::Scroll(d) => self.apply_scroll(d),
            IncrementalData::ViewportResize(d) => self.resize(d.width, d.height),
            IncrementalData::Input(d) => self.apply_input(d),
            IncrementalData::MediaInteraction(d) => self.apply_media(d),
            IncrementalData::StyleSheetRule(d) => self.apply_style_rules(d),
        }
    }

    /// 应用一份结构差异
    pub fn apply_mutation(&mut self, data: &MutationData) {
        for rm in &data.removes {
            let (Some(node), Some(parent)) = (
                self.mirror.get_node(rm.id),
                self.mirror.get_node(rm.parent_id),
            ) else {
                trace!(id = rm.id.0, "移除条目引用未知节点，跳过");
                continue;
            };
            self.mirror.remove(&self.doc, node);
            if let Err(err) = self.doc.remove_child(parent, node) {
                debug!(%err, id = rm.id.0, "节点已不在原父节点下");
                self.doc.detach(node);
            }
        }

        let mut queue: VecDeque<&AddedNode> = VecDeque::new();
        for add in &data.adds {
            if !self.try_append(add) {
                queue.push_back(add);
            }
        }
        while !queue.is_empty() {
            let before = queue.len();
            for _ in 0..before {
                let Some(add) = queue.pop_front() else {
                    break;
                };
                if !self.try_append(add) {
                    queue.push_back(add);
                }
            }
            if queue.len() == before {
                self.stranded += queue.len();
                warn!(stranded = queue.len(), "adds 锚点无法解析，放弃剩余条目");
                break;
            }
        }

        for text in &data.texts {
            let Some(node) = self.mirror.get_node(text.id) else {
                continue;
            };
            let value = text.value.as_deref().unwrap_or_default();
            if let Err(err) = self.doc.set_text_content(node, value) {
                debug!(%err, id = text.id.0, "文本更新失败");
            }
        }

        for attr in &data.attributes {
            let Some(node) = self.mirror.get_node(attr.id) else {
                continue;
            };
            for (name, value) in &attr.attributes {
                let res = match value {
                    Some(v) => self.doc.set_attribute(node, name.as_str(), v.as_str()),
                    None => self.doc.remove_attribute(node, name),
                };
                if let Err(err) = res {
                    debug!(%err, id = attr.id.0, name, "属性更新失败");
                }
            }
        }
    }

    /// 父节点与（若指定）后继兄弟都已知时物化并插入，返回 true；否则返回 false。
    fn try_append(&mut self, add: &AddedNode) -> bool {
        let Some(parent) = self.mirror.get_node(add.parent_id) else {
            return false;
        };
        if let Some(next_id) = add.next_id
            && !self.mirror.has(next_id)
        {
            return false;
        }

        let node = build_node_with_id(&add.node, &mut self.doc, &mut self.mirror);
        // 结构漂移时 next 可能已不是 parent 的子节点，此时追加到末尾
        let next = add
            .next_id
            .and_then(|id| self.mirror.get_node(id))
            .filter(|&n| n != node && self.doc.parent(n) == Some(parent));
        if let Err(err) = self.doc.insert_before(parent, node, next) {
            debug!(%err, parent = add.parent_id.0, "新增节点无法挂载");
            self.mirror.remove(&self.doc, node);
        }
        true
    }

    fn apply_pointer_move(
        &mut self,
        ts: i64,
        data: &MouseMoveData,
        timer: &mut Timer<Replayer>,
        sync: bool,
    ) {
        if sync {
            // 追赶模式只取最后一个采样点
            if let Some(last) = data.positions.last() {
                self.move_cursor(last.x, last.y, last.id);
            }
            return;
        }
        for p in &data.positions {
            timer.add_action(
                Millis(ts + p.time_offset - self.baseline),
                MoveCursor {
                    x: p.x,
                    y: p.y,
                    id: p.id,
                },
            );
        }
    }

    /// 移动光标并更新悬停链；目标未知时只移动光标。
    pub fn move_cursor(&mut self, x: i64, y: i64, id: NodeId) {
        self.cursor = Cursor {
            x,
            y,
            active: false,
        };
        let Some(target) = self.mirror.get_node(id) else {
            return;
        };
        for node in std::mem::take(&mut self.hovered) {
            if let Some(state) = self.doc.state_mut(node) {
                state.hovered = false;
            }
        }
        let mut cur = Some(target);
        while let Some(node) = cur {
            if self.doc.tag(node).is_some() {
                if let Some(state) = self.doc.state_mut(node) {
                    state.hovered = true;
                }
                self.hovered.push(node);
            }
            cur = self.doc.parent(node);
        }
    }

    fn apply_mouse_interaction(&mut self, data: &MouseInteractionData, sync: bool) {
        let Some(target) = self.mirror.get_node(data.id) else {
            return;
        };
        self.notify(PlayerEvent::MouseInteraction {
            act: data.act,
            target: data.id,
        });
        match data.act {
            MouseInteraction::Blur => {
                if self.doc.focused() == Some(target) {
                    self.doc.set_focused(None);
                }
            }
            MouseInteraction::Focus => self.doc.set_focused(Some(target)),
            MouseInteraction::Click | MouseInteraction::TouchStart | MouseInteraction::TouchEnd
                if !sync =>
            {
                self.move_cursor(data.x, data.y, data.id);
                self.cursor.active = true;
            }
            _ => {}
        }
    }

    /// 文档节点上的滚动即窗口滚动
    fn apply_scroll(&mut self, data: &ScrollData) {
        let Some(target) = self.mirror.get_node(data.id) else {
            return;
        };
        if self.doc.is_document(target) {
            trace!(x = data.x, y = data.y, "窗口滚动");
        }
        if let Some(state) = self.doc.state_mut(target) {
            state.scroll_left = data.x;
            state.scroll_top = data.y;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        let info = self.doc.info_mut();
        info.width = width;
        info.height = height;
        self.notify(PlayerEvent::Resize { width, height });
    }

    fn apply_input(&mut self, data: &InputData) {
        let Some(state) = self
            .mirror
            .get_node(data.id)
            .and_then(|n| self.doc.state_mut(n))
        else {
            return;
        };
        match &data.value {
            InputValue::Text(text) => state.value = Some(text.clone()),
            InputValue::Checked(checked) => state.checked = Some(*checked),
        }
    }

    fn apply_media(&mut self, data: &MediaInteractionData) {
        if let Some(state) = self
            .mirror
            .get_node(data.id)
            .and_then(|n| self.doc.state_mut(n))
        {
            state.paused = data.act == MediaAct::Pause;
        }
    }

    fn apply_style_rules(&mut self, data: &StyleSheetRuleData) {
        let Some(target) = self.mirror.get_node(data.id) else {
            return;
        };
        for add in data.adds.iter().flatten() {
            if let Err(err) = self.doc.insert_rule(target, &add.rule, add.index) {
                debug!(%err, "忽略无法插入的样式规则");
            }
        }
        for rm in data.removes.iter().flatten() {
            if let Err(err) = self.doc.delete_rule(target, rm.index) {
                debug!(%err, "忽略无法删除的样式规则");
            }
        }
    }
}
