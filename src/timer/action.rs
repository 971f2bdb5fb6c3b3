//! 动作 trait
//!
//! 定义可被定时器调度执行的任务对象。

use super::queue::Timer;

/// 动作：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
///
/// `W` 是动作作用的世界（回放侧是 `Replayer`）。执行时可以继续向定时器追加动作。
pub trait Action<W> {
    fn execute(self: Box<Self>, timer: &mut Timer<W>, world: &mut W);
}
