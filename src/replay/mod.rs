//! 回放模块
//!
//! 从事件流重建并按时间重放一个会话。
//!
//! - `engine`：回放对账引擎，把事件应用到目标文档
//! - `actions`：挂在定时器上的任务（应用事件、移动光标）
//! - `machine`：播放状态机，决定哪些命令合法
//! - `player`：把三者组装成 play/pause/resume 接口

// 子模块声明
mod actions;
mod engine;
mod machine;
mod notification;
mod player;

// 重新导出公共接口
pub use actions::{CastEvent, MoveCursor};
pub use engine::{Cursor, Replayer, delay_of};
pub use machine::{PlaybackCommand, PlaybackMachine, PlaybackState};
pub use notification::{Listener, PlayerEvent};
pub use player::{Player, PlayerConfig, PlayerMetaData};
