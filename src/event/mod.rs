//! 事件流
//!
//! 录制产物与回放输入：按时间戳排序、只追加的 JSON 事件序列。
//!
//! 设计目标：
//! - **结构化**：每种增量来源是一个封闭的枚举变体，回放侧穷举匹配
//! - **自包含**：`adds` 携带完整子树，回放侧不依赖录制侧的任何状态
//! - **可回放**：序列以 META + FULL_SNAPSHOT 开头，之后是增量

mod types;

pub use types::{
    AddedNode, AttributeMutation, CustomData, Event, EventKind, EventLog, FullSnapshotData,
    IncrementalData, InputData, InputValue, MediaAct, MediaInteractionData, MetaData,
    MouseInteraction, MouseInteractionData, MouseMoveData, MousePosition, MutationData,
    RemovedNode, RuleAdd, RuleRemove, ScrollData, ScrollOffset, StyleSheetRuleData,
    TextMutation, ViewportResizeData,
};
