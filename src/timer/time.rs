//! 回放时间类型
//!
//! 定义毫秒精度的时间量及其单位转换。

use serde::{Deserialize, Serialize};

/// 时间量（毫秒）。可以为负：早于基线的动作在第一次 tick 时立即到期。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Millis(pub i64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    pub fn from_secs(s: i64) -> Millis {
        Millis(s.saturating_mul(1_000))
    }

    pub fn saturating_add(self, other: Millis) -> Millis {
        Millis(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Millis) -> Millis {
        Millis(self.0.saturating_sub(other.0))
    }
}
