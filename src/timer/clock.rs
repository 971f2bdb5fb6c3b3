//! 时钟
//!
//! 录制侧用它给事件打时间戳，回放侧用它推进定时器游标。

use super::time::Millis;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// 毫秒时钟
pub trait Clock {
    fn now(&self) -> Millis;
}

/// 系统时钟：以创建时刻的 Unix 毫秒为起点，之后按单调时钟前进。
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    epoch_ms: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self {
            origin: Instant::now(),
            epoch_ms,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        Millis(self.epoch_ms.saturating_add(elapsed))
    }
}

/// 手动时钟：克隆体共享同一个时间值，测试和离线回放用它精确控制时间。
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start.0)),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.set(now.0);
    }

    pub fn advance(&self, by: Millis) {
        self.now.set(self.now.get().saturating_add(by.0));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now.get())
    }
}
