//! 标识符类型
//!
//! 定义节点的稳定标识和文档内句柄。

use serde::{Deserialize, Serialize};

/// 节点标识：录制会话内唯一的正整数，随事件流原样传到回放侧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// 节点句柄：所属 `Document` 的 arena 下标，跨文档无意义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub usize);
