//! 事件发射与检查点
//!
//! 给每个负载盖上采集时间戳后交给 `emit` 回调。每次增量事件之后检查两个阈值：
//! 自上次全量快照以来的增量条数、以及时间跨度；任一超过即补一份全量快照
//! （META + FULL_SNAPSHOT，检查点标志为 true）并把计数清零。

use std::fmt;

use super::mutation::reconcile;
use crate::dom::{Document, Mirror, ReadyState};
use crate::error::RecordError;
use crate::event::{
    CustomData, Event, EventKind, FullSnapshotData, IncrementalData, MetaData, ScrollOffset,
};
use crate::snapshot::snapshot;
use crate::timer::{Clock, SystemClock};
use tracing::{debug, info, warn};

/// 事件回调：`(event, is_checkpoint)`
pub type EmitFn = Box<dyn FnMut(&Event, bool)>;

/// 录制配置
pub struct RecordOptions {
    /// 每 N 条增量事件补一次全量快照
    pub checkout_every_nth: Option<u32>,
    /// 距上次全量快照超过该毫秒数后补一次全量快照
    pub checkout_every_nms: Option<i64>,
    emit: EmitFn,
}

impl RecordOptions {
    pub fn new(emit: impl FnMut(&Event, bool) + 'static) -> Self {
        Self {
            checkout_every_nth: None,
            checkout_every_nms: None,
            emit: Box::new(emit),
        }
    }

    pub fn checkout_every_nth(mut self, n: u32) -> Self {
        self.checkout_every_nth = Some(n);
        self
    }

    pub fn checkout_every_nms(mut self, ms: i64) -> Self {
        self.checkout_every_nms = Some(ms);
        self
    }
}

impl fmt::Debug for RecordOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordOptions")
            .field("checkout_every_nth", &self.checkout_every_nth)
            .field("checkout_every_nms", &self.checkout_every_nms)
            .finish_non_exhaustive()
    }
}

/// 录制器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    NotStarted,
    /// 文档仍在加载，等 `notify_loaded` 再拍初始快照
    WaitingForLoad,
    Recording,
    Stopped,
}

/// 录制会话：持有录制侧镜像、时钟和检查点计数。
pub struct Recorder {
    options: RecordOptions,
    clock: Box<dyn Clock>,
    mirror: Mirror,
    state: RecorderState,
    last_full_snapshot_at: Option<i64>,
    incremental_count: u32,
    stranded: usize,
}

/// 用系统时钟开始录制；返回的录制器调用 `stop` 即解除所有观察。
pub fn record(doc: &mut Document, options: RecordOptions) -> Result<Recorder, RecordError> {
    let mut recorder = Recorder::new(options, SystemClock::new());
    recorder.start(doc)?;
    Ok(recorder)
}

impl Recorder {
    pub fn new(options: RecordOptions, clock: impl Clock + 'static) -> Self {
        Self {
            options,
            clock: Box::new(clock),
            mirror: Mirror::new(),
            state: RecorderState::NotStarted,
            last_full_snapshot_at: None,
            incremental_count: 0,
            stranded: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// 录制侧镜像
    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// 自上次全量快照以来的增量事件数
    pub fn incremental_count(&self) -> u32 {
        self.incremental_count
    }

    /// 累计放弃的新增根数量（重试队列无进展时）
    pub fn stranded(&self) -> usize {
        self.stranded
    }

    /// 开始录制。文档还在加载时只进入等待状态。
    #[tracing::instrument(skip(self, doc), fields(href = %doc.info().href))]
    pub fn start(&mut self, doc: &mut Document) -> Result<(), RecordError> {
        match self.state {
            RecorderState::NotStarted => {}
            RecorderState::Stopped => return Err(RecordError::Stopped),
            _ => {
                debug!(state = ?self.state, "录制已经开始，忽略重复 start");
                return Ok(());
            }
        }
        if doc.info().ready_state == ReadyState::Loading {
            info!("⏳ 文档加载中，等待 load 后拍初始快照");
            self.state = RecorderState::WaitingForLoad;
            return Ok(());
        }
        self.begin(doc)
    }

    pub fn notify_dom_content_loaded(&mut self) {
        if self.state != RecorderState::WaitingForLoad {
            debug!(state = ?self.state, "非等待状态，忽略 DOMContentLoaded");
            return;
        }
        self.emit(EventKind::DomContentLoaded, false);
    }

    /// 文档加载完成：发出 LOADED，然后拍初始快照并开始观察。
    pub fn notify_loaded(&mut self, doc: &mut Document) -> Result<(), RecordError> {
        if self.state != RecorderState::WaitingForLoad {
            debug!(state = ?self.state, "非等待状态，忽略 load");
            return Ok(());
        }
        self.emit(EventKind::Loaded, false);
        self.begin(doc)
    }

    fn begin(&mut self, doc: &mut Document) -> Result<(), RecordError> {
        self.take_full_snapshot(doc, false)?;
        doc.observe(true);
        self.state = RecorderState::Recording;
        info!("🎬 录制开始");
        Ok(())
    }

    /// 对账当前累积的变更通知，非空时发出一条 MUTATION 增量事件。
    ///
    /// 返回本次放弃的新增根数量。
    #[tracing::instrument(skip(self, doc))]
    pub fn flush(&mut self, doc: &mut Document) -> Result<usize, RecordError> {
        if self.state != RecorderState::Recording {
            return Ok(0);
        }
        let records = doc.take_records();
        if records.is_empty() {
            return Ok(0);
        }
        let outcome = reconcile(doc, &mut self.mirror, records);
        self.stranded += outcome.stranded;
        if let Some(data) = outcome.data {
            self.emit_incremental(doc, IncrementalData::Mutation(data))?;
        }
        Ok(outcome.stranded)
    }

    /// 发出一条非变更来源的增量事件（指针、滚动、输入等）。
    ///
    /// 先 flush 待处理的变更，保证事件引用的节点已经出现在流里。
    pub fn record_incremental(
        &mut self,
        doc: &mut Document,
        data: IncrementalData,
    ) -> Result<(), RecordError> {
        if self.state != RecorderState::Recording {
            debug!(state = ?self.state, "未在录制，丢弃增量事件");
            return Ok(());
        }
        if doc.has_pending_records() {
            self.flush(doc)?;
        }
        self.emit_incremental(doc, data)
    }

    /// 注入一条 CUSTOM 事件
    pub fn add_custom_event(
        &mut self,
        tag: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<(), RecordError> {
        match self.state {
            RecorderState::NotStarted => Err(RecordError::NotStarted),
            RecorderState::Stopped => Err(RecordError::Stopped),
            _ => {
                let data = CustomData {
                    tag: tag.into(),
                    payload,
                };
                self.emit(EventKind::Custom { data }, false);
                Ok(())
            }
        }
    }

    /// 停止录制：flush 剩余变更后解除观察。
    pub fn stop(&mut self, doc: &mut Document) -> Result<(), RecordError> {
        if self.state == RecorderState::Recording {
            self.flush(doc)?;
        }
        doc.observe(false);
        self.state = RecorderState::Stopped;
        info!(stranded = self.stranded, "⏹️  录制结束");
        Ok(())
    }

    fn emit_incremental(
        &mut self,
        doc: &mut Document,
        data: IncrementalData,
    ) -> Result<(), RecordError> {
        let ts = self.emit(EventKind::IncrementalSnapshot { data }, false);
        self.incremental_count += 1;

        let exceed_count = self
            .options
            .checkout_every_nth
            .is_some_and(|n| self.incremental_count >= n);
        let exceed_time = match (self.options.checkout_every_nms, self.last_full_snapshot_at) {
            (Some(ms), Some(last)) => ts - last > ms,
            _ => false,
        };
        if exceed_count || exceed_time {
            debug!(
                count = self.incremental_count,
                exceed_count, exceed_time, "触发检查点"
            );
            self.take_full_snapshot(doc, true)?;
        }
        Ok(())
    }

    fn take_full_snapshot(
        &mut self,
        doc: &mut Document,
        is_checkpoint: bool,
    ) -> Result<(), RecordError> {
        // 快照本身已包含这些变更
        let discarded = doc.take_records().len();
        if discarded > 0 {
            debug!(discarded, "全量快照前丢弃待处理的变更通知");
        }
        // 先序列化，失败时不留下孤立的 Meta
        let node = match snapshot(doc, &mut self.mirror) {
            Ok(node) => node,
            Err(err) => {
                warn!(%err, "全量快照失败");
                return Err(err.into());
            }
        };
        let info = doc.info();
        let meta = MetaData {
            href: info.href.clone(),
            width: info.width,
            height: info.height,
        };
        self.emit(EventKind::Meta { data: meta }, is_checkpoint);
        let offset = doc
            .state(doc.root())
            .map(|s| ScrollOffset {
                top: s.scroll_top,
                left: s.scroll_left,
            })
            .unwrap_or_default();
        let ts = self.emit(
            EventKind::FullSnapshot {
                data: FullSnapshotData { node, offset },
            },
            is_checkpoint,
        );
        self.last_full_snapshot_at = Some(ts);
        self.incremental_count = 0;
        Ok(())
    }

    fn emit(&mut self, kind: EventKind, is_checkpoint: bool) -> i64 {
        let ev = Event::new(self.clock.now().0, kind);
        (self.options.emit)(&ev, is_checkpoint);
        ev.timestamp
    }
}
