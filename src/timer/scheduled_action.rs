//! 调度动作
//!
//! 定义调度项结构及其优先级比较。

use super::action::Action;
use super::time::Millis;
use std::cmp::Ordering;

/// 调度项，包含相对延迟、序列号和动作对象。
pub struct ScheduledAction<W> {
    pub(crate) delay: Millis,
    pub(crate) seq: u64,
    pub(crate) action: Box<dyn Action<W>>,
}

impl<W> ScheduledAction<W> {
    pub fn delay(&self) -> Millis {
        self.delay
    }
}

// BinaryHeap 是 max-heap；我们需要最小延迟优先、同延迟按插入顺序，因此反向比较。
impl<W> Ord for ScheduledAction<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.delay.cmp(&other.delay) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
        .reverse()
    }
}

impl<W> PartialOrd for ScheduledAction<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<W> PartialEq for ScheduledAction<W> {
    fn eq(&self, other: &Self) -> bool {
        self.delay == other.delay && self.seq == other.seq
    }
}

impl<W> Eq for ScheduledAction<W> {}
