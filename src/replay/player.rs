//! 播放器
//!
//! 状态机 + 定时器 + 回放引擎。每次 `play`/`resume` 都先清空定时器再按新基线重新播种，
//! 被取代的基线上的任务不会再执行。
//!
//! 没有宿主的动画帧循环：调用方用 `tick` 推进（或用 `run_to_end` 配合手动时钟一次跑完）。

use super::actions::CastEvent;
use super::engine::{Replayer, delay_of};
use super::machine::{PlaybackCommand, PlaybackMachine, PlaybackState};
use super::notification::PlayerEvent;
use crate::error::PlaybackError;
use crate::event::Event;
use crate::timer::{Action, Clock, ManualClock, Millis, Timer};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// 倍速
    pub speed: f64,
    /// 重建后额外注入的样式规则
    pub insert_style_rules: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            insert_style_rules: Vec::new(),
        }
    }
}

/// 会话元信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMetaData {
    pub total_time: Millis,
}

pub struct Player {
    replayer: Replayer,
    timer: Timer<Replayer>,
    machine: PlaybackMachine,
    clock: Box<dyn Clock>,
    first_ts: i64,
    last_ts: i64,
}

impl Player {
    /// 事件按时间戳稳定排序；空序列无法回放。
    pub fn new(
        mut events: Vec<Event>,
        config: PlayerConfig,
        clock: impl Clock + 'static,
    ) -> Result<Self, PlaybackError> {
        events.sort_by_key(|e| e.timestamp);
        let (Some(first), Some(last)) = (events.first(), events.last()) else {
            return Err(PlaybackError::NoEvents);
        };
        let (first_ts, last_ts) = (first.timestamp, last.timestamp);
        let mut timer = Timer::new();
        timer.set_speed(config.speed);
        info!(events = events.len(), total_ms = last_ts - first_ts, "🎞️  播放器就绪");
        Ok(Self {
            replayer: Replayer::new(events, config.insert_style_rules),
            timer,
            machine: PlaybackMachine::new(),
            clock: Box::new(clock),
            first_ts,
            last_ts,
        })
    }

    /// 注册通知监听
    pub fn on(&mut self, listener: impl FnMut(&PlayerEvent) + 'static) {
        self.replayer.on(Box::new(listener));
    }

    pub fn state(&self) -> PlaybackState {
        self.machine.state()
    }

    pub fn replayer(&self) -> &Replayer {
        &self.replayer
    }

    /// 定时器中待执行的任务数
    pub fn pending_actions(&self) -> usize {
        self.timer.len()
    }

    pub fn speed(&self) -> f64 {
        self.timer.speed()
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.timer.set_speed(speed);
    }

    /// 从 `time_offset`（相对第一个事件）开始播放。
    ///
    /// 早于基线的事件立即以追赶模式应用，其余事件按延迟调度。
    #[tracing::instrument(skip(self), fields(offset = time_offset.0))]
    pub fn play(&mut self, time_offset: Millis) -> Result<(), PlaybackError> {
        self.machine.send(PlaybackCommand::Play)?;
        self.timer.clear();
        self.replayer.reset_progress();
        let baseline = self.first_ts + time_offset.0;
        self.replayer.set_baseline(baseline);

        let mut actions: Vec<(Millis, Box<dyn Action<Replayer>>)> = Vec::new();
        let mut synced = 0;
        for index in 0..self.replayer.events().len() {
            if self.replayer.events()[index].timestamp < baseline {
                self.replayer.cast(index, &mut self.timer, true);
                synced += 1;
            } else {
                let delay = delay_of(&self.replayer.events()[index], baseline);
                let action: Box<dyn Action<Replayer>> = Box::new(CastEvent { index });
                actions.push((delay, action));
            }
        }
        debug!(synced, scheduled = actions.len(), "播放已播种");
        self.timer.add_actions(actions);
        self.timer.start(self.clock.now());
        self.replayer.notify(PlayerEvent::Start);
        self.check_finished();
        Ok(())
    }

    /// 暂停：清空定时器，保留最后应用的事件。
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.machine.send(PlaybackCommand::Pause)?;
        self.timer.clear();
        self.replayer.notify(PlayerEvent::Pause);
        info!(
            at_ms = self.get_current_time().0,
            last_played = ?self.replayer.last_played(),
            "⏸️  已暂停"
        );
        Ok(())
    }

    /// 从新基线继续，只重新调度尚未应用的事件。
    #[tracing::instrument(skip(self), fields(offset = time_offset.0))]
    pub fn resume(&mut self, time_offset: Millis) -> Result<(), PlaybackError> {
        self.machine.send(PlaybackCommand::Resume)?;
        self.timer.clear();
        let baseline = self.first_ts + time_offset.0;
        self.replayer.set_baseline(baseline);

        let actions: Vec<(Millis, Box<dyn Action<Replayer>>)> = self
            .replayer
            .events()
            .iter()
            .enumerate()
            .filter(|&(index, _)| !self.replayer.is_cast(index))
            .map(|(index, e)| {
                let action: Box<dyn Action<Replayer>> = Box::new(CastEvent { index });
                (delay_of(e, baseline), action)
            })
            .collect();
        debug!(scheduled = actions.len(), "恢复已播种");
        self.timer.add_actions(actions);
        self.timer.start(self.clock.now());
        self.replayer.notify(PlayerEvent::Resume);
        self.check_finished();
        Ok(())
    }

    /// 按当前时钟推进，返回执行的任务数。
    pub fn tick(&mut self) -> usize {
        if self.machine.state() != PlaybackState::Playing {
            return 0;
        }
        let executed = self.timer.tick(self.clock.now(), &mut self.replayer);
        self.check_finished();
        executed
    }

    /// 手动时钟下把剩余任务一次跑完。
    pub fn run_to_end(&mut self, clock: &ManualClock) -> usize {
        let mut executed = 0;
        while self.machine.state() == PlaybackState::Playing {
            let Some(wait) = self.timer.wall_until_next() else {
                break;
            };
            clock.advance(wait);
            executed += self.tick();
        }
        executed
    }

    /// 手动时钟下推进到回放位置 `at`（或队列耗尽）为止，逐个经过到期任务。
    pub fn run_until(&mut self, clock: &ManualClock, at: Millis) -> usize {
        let mut executed = 0;
        while self.machine.state() == PlaybackState::Playing {
            let remaining = at.0 - self.get_current_time().0;
            if remaining <= 0 {
                break;
            }
            let Some(next) = self.timer.wall_until_next() else {
                break;
            };
            let wall = (remaining as f64 / self.timer.speed()).ceil() as i64;
            if next.0 > wall {
                clock.advance(Millis(wall));
                executed += self.tick();
                break;
            }
            clock.advance(next);
            executed += self.tick();
        }
        executed
    }

    /// 当前回放位置（相对第一个事件）
    pub fn get_current_time(&self) -> Millis {
        let base_offset = self.replayer.baseline() - self.first_ts;
        Millis(self.timer.time_offset().0 + base_offset)
    }

    pub fn get_meta_data(&self) -> PlayerMetaData {
        PlayerMetaData {
            total_time: Millis(self.last_ts - self.first_ts),
        }
    }

    /// 定时器里的任务（包括指针采样点）全部执行完才算结束
    fn check_finished(&mut self) {
        if self.machine.state() != PlaybackState::Playing || !self.timer.is_empty() {
            return;
        }
        if let Err(err) = self.machine.send(PlaybackCommand::Finish) {
            warn!(%err, "无法进入结束状态");
            return;
        }
        self.replayer.notify(PlayerEvent::Finish);
        info!(stranded = self.replayer.stranded(), "🏁 回放结束");
    }
}
