//! 定时器
//!
//! 按相对延迟有序执行动作的队列。游标由墙钟差值乘以倍速推进，
//! `clear` 是唯一的取消原语：丢弃所有待执行动作并停止游标。

use super::action::Action;
use super::scheduled_action::ScheduledAction;
use super::time::Millis;
use std::collections::BinaryHeap;
use tracing::{debug, trace, warn};

/// 调度动作队列：维护游标（已流逝的缩放时间）、倍速与动作堆。
pub struct Timer<W> {
    time_offset: f64,
    speed: f64,
    last_wall: Option<Millis>,
    next_seq: u64,
    q: BinaryHeap<ScheduledAction<W>>,
}

impl<W> Default for Timer<W> {
    fn default() -> Self {
        Self {
            time_offset: 0.0,
            speed: 1.0,
            last_wall: None,
            next_seq: 0,
            q: BinaryHeap::new(),
        }
    }
}

impl<W: 'static> Timer<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前游标（自 `start` 起按倍速累计的毫秒数）
    pub fn time_offset(&self) -> Millis {
        Millis(self.time_offset.floor() as i64)
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// 游标是否在走
    pub fn is_running(&self) -> bool {
        self.last_wall.is_some()
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// 队首动作的延迟
    pub fn next_delay(&self) -> Option<Millis> {
        self.q.peek().map(ScheduledAction::delay)
    }

    /// 距离队首动作到期还需的墙钟毫秒数；游标停止或队列为空时返回 None。
    pub fn wall_until_next(&self) -> Option<Millis> {
        self.last_wall?;
        let delay = self.q.peek()?.delay.0 as f64;
        let remaining = ((delay - self.time_offset) / self.speed).ceil().max(0.0);
        Some(Millis(remaining as i64))
    }

    /// 加入一个动作；同延迟的动作按加入顺序执行。
    pub fn add_action<A: Action<W> + 'static>(&mut self, delay: Millis, action: A) {
        self.add_boxed(delay, Box::new(action));
    }

    pub fn add_boxed(&mut self, delay: Millis, action: Box<dyn Action<W>>) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        trace!(delay = delay.0, seq, "调度动作");
        self.q.push(ScheduledAction { delay, seq, action });
    }

    pub fn add_actions<I>(&mut self, actions: I)
    where
        I: IntoIterator<Item = (Millis, Box<dyn Action<W>>)>,
    {
        for (delay, action) in actions {
            self.add_boxed(delay, action);
        }
        debug!(queue_size = self.q.len(), "批量动作已加入队列");
    }

    /// 从 `now` 开始走游标，游标归零。
    pub fn start(&mut self, now: Millis) {
        self.time_offset = 0.0;
        self.last_wall = Some(now);
        debug!(now = now.0, queue_size = self.q.len(), "▶️  定时器启动");
    }

    /// 取消所有待执行动作并停止游标；任何时候调用都安全。
    pub fn clear(&mut self) {
        let dropped = self.q.len();
        self.q.clear();
        self.last_wall = None;
        debug!(dropped, "定时器已清空");
    }

    /// 修改倍速；只影响之后的推进，已累计的游标不回溯缩放。
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() || speed <= 0.0 {
            warn!(speed, "忽略非法倍速");
            return;
        }
        self.speed = speed;
    }

    /// 把游标推进到墙钟 `now`，执行所有已到期的动作，返回执行数量。
    ///
    /// 队列执行完后游标停止，直到下一次 `start`。
    #[tracing::instrument(skip(self, world), fields(now = now.0))]
    pub fn tick(&mut self, now: Millis, world: &mut W) -> usize {
        let Some(last) = self.last_wall else {
            return 0;
        };
        let delta = now.saturating_sub(last).0.max(0) as f64;
        self.time_offset += delta * self.speed;
        self.last_wall = Some(now);

        let mut executed = 0;
        while self
            .q
            .peek()
            .is_some_and(|top| top.delay.0 as f64 <= self.time_offset)
        {
            let Some(item) = self.q.pop() else {
                break;
            };
            trace!(delay = item.delay.0, seq = item.seq, "执行动作");
            item.action.execute(self, world);
            executed += 1;
            if self.last_wall.is_none() {
                // 动作内部清空了队列
                break;
            }
        }

        if self.q.is_empty() && self.last_wall.is_some() {
            debug!(executed, "队列已空，停止游标");
            self.last_wall = None;
        }
        executed
    }
}
