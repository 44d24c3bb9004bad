//! Event Publisher Implementation
//!
//! 播放与导出过程中的事件推送

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::export::BatchReport;

/// 提示等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    /// 提示的显示时长
    pub fn display_duration(&self, message: &str) -> Duration {
        match self {
            Self::Success => Duration::from_secs(5),
            Self::Error => Duration::from_secs(7),
            Self::Info if message.chars().count() > 50 => Duration::from_secs(8),
            _ => Duration::from_secs(3),
        }
    }
}

/// 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ReaderEvent {
    /// 开始朗读某一句
    UnitStarted {
        session_id: Uuid,
        index: usize,
        text: String,
        remote: bool,
    },
    /// 播放进度变更
    ProgressChanged {
        session_id: Uuid,
        index: usize,
        total: usize,
    },
    /// 朗读到结尾
    PlaybackFinished { session_id: Uuid },
    /// 可自动消失的提示
    Notice {
        level: NoticeLevel,
        message: String,
        display_ms: u64,
    },
    /// 批量合成进度
    BatchProgress {
        job_id: Uuid,
        index: usize,
        total: usize,
        percent: u8,
        status: String,
    },
    /// 批量合成结束
    BatchFinished { job_id: Uuid, report: BatchReport },
}

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<ReaderEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.channel.subscribe()
    }

    pub fn publish_unit_started(&self, session_id: Uuid, index: usize, text: &str, remote: bool) {
        self.publish(ReaderEvent::UnitStarted {
            session_id,
            index,
            text: text.to_string(),
            remote,
        });
    }

    pub fn publish_progress(&self, session_id: Uuid, index: usize, total: usize) {
        self.publish(ReaderEvent::ProgressChanged {
            session_id,
            index,
            total,
        });
    }

    pub fn publish_playback_finished(&self, session_id: Uuid) {
        self.publish(ReaderEvent::PlaybackFinished { session_id });
    }

    /// 发布提示，显示时长由等级和长度决定
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        let display_ms = level.display_duration(&message).as_millis() as u64;
        self.publish(ReaderEvent::Notice {
            level,
            message,
            display_ms,
        });
    }

    pub fn publish_batch_progress(
        &self,
        job_id: Uuid,
        index: usize,
        total: usize,
        percent: u8,
        status: impl Into<String>,
    ) {
        self.publish(ReaderEvent::BatchProgress {
            job_id,
            index,
            total,
            percent,
            status: status.into(),
        });
    }

    pub fn publish_batch_finished(&self, job_id: Uuid, report: BatchReport) {
        self.publish(ReaderEvent::BatchFinished { job_id, report });
    }

    fn publish(&self, event: ReaderEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
