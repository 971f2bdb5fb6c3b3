//! 错误类型
//!
//! 只有调用方误用或无法恢复的采集状态会以错误形式返回；
//! 树形竞态（悬空引用、无法解析的锚点）在对账器内部吸收。

use crate::dom::NodeRef;
use crate::replay::{PlaybackCommand, PlaybackState};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeRef),
    #[error("hierarchy violation: cannot insert {child:?} into {parent:?}")]
    Hierarchy { parent: NodeRef, child: NodeRef },
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeRef, child: NodeRef },
    #[error("node {0:?} has the wrong kind for this operation")]
    WrongKind(NodeRef),
    #[error("index {index} out of range (len {len})")]
    IndexSize { index: usize, len: usize },
    #[error("invalid stylesheet rule: {0:?}")]
    InvalidRule(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("failed to snapshot the document: no document element")]
    NoDocumentElement,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("please add custom event after start recording")]
    NotStarted,
    #[error("recording already stopped")]
    Stopped,
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("cannot replay an empty event list")]
    NoEvents,
    #[error("illegal command {command:?} in state {state:?}")]
    IllegalTransition {
        state: PlaybackState,
        command: PlaybackCommand,
    },
}

/// 二进制读写会话文件时的错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
