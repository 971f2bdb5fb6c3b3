//! 录制模块
//!
//! 把文档的原始变更通知转成可回放的事件流。
//!
//! - `mutation`：变更差异对账器，一次 flush 产出一个最小的 `MutationData`
//! - `recorder`：事件发射与检查点策略，按条数或时间间隔强制全量快照

// 子模块声明
mod mutation;
mod recorder;

// 重新导出公共接口
pub use mutation::{FlushOutcome, reconcile};
pub use recorder::{RecordOptions, Recorder, RecorderState, record};
