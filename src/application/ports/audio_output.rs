//! Audio Output Port - 播放远程合成的音频
//!
//! 播放是异步的：`play` 立即返回，结束时通过 `CompletionSink` 回报结果

use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::export::AudioData;
use crate::domain::playback::Generation;

/// 设备错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Device rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
}

impl DeviceError {
    pub fn code(&self) -> &str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Rejected { code, .. } => code,
        }
    }
}

/// 一次播放的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// 正常播完
    Completed,
    /// 被主动取消（停止 / 跳转）
    Interrupted,
    /// 播放出错，附带错误码
    Failed(String),
}

/// 播放来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSource {
    Remote,
    Device,
}

/// 回报给播放编排器的完成信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub generation: Generation,
    pub source: PlaybackSource,
    pub outcome: PlaybackOutcome,
}

/// 完成信号的发送端
///
/// 携带发起播放时的代次；一次播放只能回报一次。
#[derive(Debug)]
pub struct CompletionSink {
    generation: Generation,
    source: PlaybackSource,
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionSink {
    pub fn new(
        generation: Generation,
        source: PlaybackSource,
        tx: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            generation,
            source,
            tx,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn finish(self, outcome: PlaybackOutcome) {
        // 编排器已退出时丢弃
        let _ = self.tx.send(Completion {
            generation: self.generation,
            source: self.source,
            outcome,
        });
    }
}

/// Audio Output Port
pub trait AudioOutputPort: Send + Sync {
    /// 从 `start_at` 秒处开始播放，替换正在播放的音频
    fn play(&self, audio: AudioData, start_at: f64, sink: CompletionSink)
        -> Result<(), DeviceError>;

    /// 暂停，返回当前播放位置（秒）
    fn pause(&self) -> Option<f64>;

    /// 停止并释放当前音频，不回报完成
    fn stop(&self);
}
