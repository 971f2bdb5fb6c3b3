//! 定时器上的回放任务

use super::engine::Replayer;
use crate::dom::NodeId;
use crate::timer::{Action, Timer};

/// 应用事件流中的第 `index` 个事件
#[derive(Debug, Clone, Copy)]
pub struct CastEvent {
    pub index: usize,
}

impl Action<Replayer> for CastEvent {
    fn execute(self: Box<Self>, timer: &mut Timer<Replayer>, world: &mut Replayer) {
        world.cast(self.index, timer, false);
    }
}

/// 实时回放时指针轨迹的单个采样点
#[derive(Debug, Clone, Copy)]
pub struct MoveCursor {
    pub x: i64,
    pub y: i64,
    pub id: NodeId,
}

impl Action<Replayer> for MoveCursor {
    fn execute(self: Box<Self>, _timer: &mut Timer<Replayer>, world: &mut Replayer) {
        world.move_cursor(self.x, self.y, self.id);
    }
}
