//! 文档树模块
//!
//! 录制侧与回放侧共用的内存文档树：节点、变更通知、标识镜像。

// 子模块声明
mod document;
mod id;
mod mirror;
mod node;
mod record;

// 重新导出公共接口
pub use document::{Document, DocumentInfo, ReadyState};
pub use id::{NodeId, NodeRef};
pub use mirror::Mirror;
pub use node::{NodeKind, NodeState};
pub use record::MutationRecord;
