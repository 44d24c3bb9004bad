//! Playback Commands - 播放控制命令
//!
//! 发送给播放编排器，每条命令通过 oneshot 返回结果

use tokio::sync::oneshot;

use crate::application::error::ApplicationError;
use crate::domain::playback::PlaybackSnapshot;
use crate::domain::voice::{Speed, VoiceSelection};

pub type Reply<T> = oneshot::Sender<Result<T, ApplicationError>>;

/// 播放控制命令
#[derive(Debug)]
pub enum PlaybackCommand {
    /// 开始，或从暂停处恢复
    Start { reply: Reply<PlaybackSnapshot> },
    Pause { reply: Reply<PlaybackSnapshot> },
    /// 跳转到第 `index` 句（从 0 开始）
    Seek {
        index: usize,
        reply: Reply<PlaybackSnapshot>,
    },
    Stop { reply: Reply<PlaybackSnapshot> },
    /// 新语速从下一句开始生效
    SetSpeed {
        speed: Speed,
        reply: Reply<PlaybackSnapshot>,
    },
    AdjustSpeed {
        delta: f64,
        reply: Reply<PlaybackSnapshot>,
    },
    /// 新音色从下一句开始生效
    SetVoice {
        voice: VoiceSelection,
        reply: Reply<PlaybackSnapshot>,
    },
    Snapshot { reply: Reply<PlaybackSnapshot> },
    Shutdown,
}
