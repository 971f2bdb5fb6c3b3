//! 快照模块
//!
//! 文档树与值类型 `SerializedNode` 之间的双向转换：
//! 录制侧序列化并分配标识，回放侧按携带的标识物化。

mod rebuild;
mod resolve;
mod serialize;
mod types;

pub use rebuild::{build_node_with_id, rebuild};
pub use serialize::{serialize_node_with_id, snapshot};
pub use types::{SerializedKind, SerializedNode};
pub(crate) use resolve::document_base;
pub use resolve::{absolute_to_doc, absolute_to_srcset, absolute_to_stylesheet, transform_attr};
