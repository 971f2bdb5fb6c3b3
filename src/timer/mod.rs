//! 调度动作队列
//!
//! 此模块包含回放调度的核心组件：时间量、动作、带序号的调度项、定时器与时钟。

// 子模块声明
mod action;
mod clock;
mod queue;
mod scheduled_action;
mod time;

// 重新导出公共接口
pub use action::Action;
pub use clock::{Clock, ManualClock, SystemClock};
pub use queue::Timer;
pub use scheduled_action::ScheduledAction;
pub use time::Millis;
