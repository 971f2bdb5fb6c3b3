//! 回放通知

use serde::Serialize;

use crate::dom::NodeId;
use crate::event::MouseInteraction;

/// 推送给监听者的回放生命周期与可视化通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerEvent {
    Start,
    Pause,
    Resume,
    Finish,
    Resize { width: u32, height: u32 },
    FullSnapshotRebuilt,
    MouseInteraction { act: MouseInteraction, target: NodeId },
    /// 第 `index` 个事件已应用
    EventCast { index: usize },
}

/// 监听回调
pub type Listener = Box<dyn FnMut(&PlayerEvent)>;
