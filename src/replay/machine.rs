//! 回放状态机
//!
//! `idle → playing ⇄ paused`，`playing` 在最后一个事件执行后进入 `finished`。
//! `play` 在任何状态下都合法（重新选择基线即 seek）；其余命令只在对应状态下合法。

use crate::error::PlaybackError;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Resume,
    Finish,
}

#[derive(Debug, Default)]
pub struct PlaybackMachine {
    state: PlaybackState,
}

impl PlaybackMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// 命令在当前状态下的目标状态；非法时返回 None。
    pub fn target(&self, command: PlaybackCommand) -> Option<PlaybackState> {
        use PlaybackCommand as C;
        use PlaybackState as S;
        match (self.state, command) {
            (_, C::Play) => Some(S::Playing),
            (S::Playing, C::Pause) => Some(S::Paused),
            (S::Paused, C::Resume) => Some(S::Playing),
            (S::Playing, C::Finish) => Some(S::Finished),
            _ => None,
        }
    }

    pub fn can(&self, command: PlaybackCommand) -> bool {
        self.target(command).is_some()
    }

    /// 执行一次状态转移
    pub fn send(&mut self, command: PlaybackCommand) -> Result<PlaybackState, PlaybackError> {
        let Some(next) = self.target(command) else {
            return Err(PlaybackError::IllegalTransition {
                state: self.state,
                command,
            });
        };
        debug!(from = ?self.state, to = ?next, ?command, "状态转移");
        self.state = next;
        Ok(next)
    }
}
