use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::snapshot::SerializedNode;

/// 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// 页面元信息（每次全量快照之前发出）
    Meta { data: MetaData },
    Loaded,
    DomContentLoaded,
    /// 全量快照：回放重建的唯一入口
    FullSnapshot { data: FullSnapshotData },
    /// 增量快照，按 `source` 区分负载
    IncrementalSnapshot { data: IncrementalData },
    /// 调用方注入的自定义事件
    Custom { data: CustomData },
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 采集时间（Unix 毫秒）
    pub timestamp: i64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(timestamp: i64, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }

    pub fn is_full_snapshot(&self) -> bool {
        matches!(self.kind, EventKind::FullSnapshot { .. })
    }

    pub fn is_incremental(&self) -> bool {
        matches!(self.kind, EventKind::IncrementalSnapshot { .. })
    }

    /// 增量负载（若是增量事件）
    pub fn incremental(&self) -> Option<&IncrementalData> {
        match &self.kind {
            EventKind::IncrementalSnapshot { data } => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    pub href: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub top: i64,
    pub left: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullSnapshotData {
    pub node: SerializedNode,
    pub offset: ScrollOffset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub tag: String,
    pub payload: serde_json::Value,
}

/// 增量来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum IncrementalData {
    Mutation(MutationData),
    MouseMove(MouseMoveData),
    MouseInteraction(MouseInteractionData),
    Scroll(ScrollData),
    ViewportResize(ViewportResizeData),
    Input(InputData),
    TouchMove(MouseMoveData),
    MediaInteraction(MediaInteractionData),
    StyleSheetRule(StyleSheetRuleData),
}

/// 一次 flush 的结构差异
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationData {
    pub texts: Vec<TextMutation>,
    pub attributes: Vec<AttributeMutation>,
    pub removes: Vec<RemovedNode>,
    pub adds: Vec<AddedNode>,
}

impl MutationData {
    /// 四个列表全空：这一批不产生事件
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
            && self.attributes.is_empty()
            && self.removes.is_empty()
            && self.adds.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMutation {
    pub id: NodeId,
    pub value: Option<String>,
}

/// 属性变更；值为 None 表示移除该属性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMutation {
    pub id: NodeId,
    pub attributes: IndexMap<String, Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedNode {
    pub id: NodeId,
    pub parent_id: NodeId,
}

/// 新增（或移动）的子树；`node` 是完整子树
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedNode {
    pub parent_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<NodeId>,
    pub node: SerializedNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MousePosition {
    pub x: i64,
    pub y: i64,
    pub id: NodeId,
    /// 相对事件时间戳的偏移（通常为负：采样早于发出）
    pub time_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseMoveData {
    pub positions: Vec<MousePosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseInteraction {
    MouseUp,
    MouseDown,
    Click,
    ContextMenu,
    DblClick,
    Focus,
    Blur,
    TouchStart,
    TouchEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseInteractionData {
    pub act: MouseInteraction,
    pub id: NodeId,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollData {
    pub id: NodeId,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportResizeData {
    pub width: u32,
    pub height: u32,
}

/// 表单值：文本或勾选状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Checked(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputData {
    pub id: NodeId,
    pub value: InputValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAct {
    Play,
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInteractionData {
    pub act: MediaAct,
    pub id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAdd {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRemove {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSheetRuleData {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adds: Option<Vec<RuleAdd>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removes: Option<Vec<RuleRemove>>,
}

/// 一个简单的事件收集器（存内存，录制结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<Event>,
    /// 由检查点策略触发的事件数
    pub checkpoints: usize,
}

impl EventLog {
    pub fn push(&mut self, ev: Event, is_checkpoint: bool) {
        if is_checkpoint {
            self.checkpoints += 1;
        }
        self.events.push(ev);
    }
}
