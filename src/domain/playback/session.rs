//! Playback Context - 播放会话状态机
//!
//! 状态: Idle → Playing ⇄ Paused → Stopped → Idle

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::text_segmenter::SpeakableUnit;
use crate::domain::voice::{Speed, VoiceSelection};

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
    Stopped,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

/// 播放代次
///
/// 每次开始播放一个片段都会递增；回调携带的代次与会话不一致时即为过期回调。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 会话规则错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("没有可朗读的内容")]
    Empty,

    #[error("跳转位置越界: {index} (共 {total} 句)")]
    OutOfRange { index: usize, total: usize },

    #[error("当前状态不允许该操作: {0:?}")]
    InvalidTransition(PlaybackStatus),
}

/// 开始播放的方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartMode {
    /// 从当前位置重新开始
    Fresh,
    /// 从暂停恢复，附带远程音频的暂停位置（秒）
    Resume { offset: Option<f64> },
    /// 已在播放
    AlreadyPlaying,
}

/// 会话快照
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub session_id: Uuid,
    pub status: PlaybackStatus,
    pub current_index: usize,
    pub total: usize,
    pub voice: String,
    pub speed: f64,
}

impl PlaybackSnapshot {
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.current_index as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// 播放会话
///
/// 由播放编排器独占；`units` 与创建者共享，只读。
#[derive(Debug)]
pub struct PlaybackSession {
    id: Uuid,
    units: Arc<[SpeakableUnit]>,
    current_index: usize,
    status: PlaybackStatus,
    paused_offset: Option<f64>,
    voice: VoiceSelection,
    speed: Speed,
    generation: Generation,
}

impl PlaybackSession {
    pub fn new(units: Arc<[SpeakableUnit]>, voice: VoiceSelection, speed: Speed) -> Self {
        Self {
            id: Uuid::new_v4(),
            units,
            current_index: 0,
            status: PlaybackStatus::Idle,
            paused_offset: None,
            voice,
            speed,
            generation: Generation(0),
        }
    }

    pub fn start(&mut self) -> Result<StartMode, SessionError> {
        if self.units.is_empty() {
            return Err(SessionError::Empty);
        }
        let mode = match self.status {
            PlaybackStatus::Playing => StartMode::AlreadyPlaying,
            PlaybackStatus::Paused => StartMode::Resume {
                offset: self.paused_offset.take(),
            },
            PlaybackStatus::Idle | PlaybackStatus::Stopped => {
                self.paused_offset = None;
                StartMode::Fresh
            }
        };
        self.status = PlaybackStatus::Playing;
        Ok(mode)
    }

    /// 暂停；只记录大于 0 的远程音频位置
    pub fn pause(&mut self, offset: Option<f64>) -> Result<(), SessionError> {
        if self.status != PlaybackStatus::Playing {
            return Err(SessionError::InvalidTransition(self.status));
        }
        self.status = PlaybackStatus::Paused;
        self.paused_offset = offset.filter(|o| *o > 0.0);
        Ok(())
    }

    /// 停止：回到开头并使所有进行中的回调失效
    pub fn stop(&mut self) {
        self.status = PlaybackStatus::Stopped;
        self.current_index = 0;
        self.paused_offset = None;
        self.next_generation();
    }

    pub fn seek(&mut self, index: usize) -> Result<(), SessionError> {
        if index >= self.units.len() {
            return Err(SessionError::OutOfRange {
                index,
                total: self.units.len(),
            });
        }
        self.current_index = index;
        self.paused_offset = None;
        Ok(())
    }

    /// 前进到下一句，返回新的位置
    pub fn advance(&mut self) -> usize {
        if self.current_index < self.units.len() {
            self.current_index += 1;
        }
        self.current_index
    }

    pub fn next_generation(&mut self) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn current_unit(&self) -> Option<&SpeakableUnit> {
        self.units.get(self.current_index)
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.units.len()
    }

    pub fn set_voice(&mut self, voice: VoiceSelection) {
        self.voice = voice;
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn units(&self) -> &Arc<[SpeakableUnit]> {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn paused_offset(&self) -> Option<f64> {
        self.paused_offset
    }

    pub fn voice(&self) -> &VoiceSelection {
        &self.voice
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            session_id: self.id,
            status: self.status,
            current_index: self.current_index,
            total: self.units.len(),
            voice: self.voice.to_string(),
            speed: self.speed.value(),
        }
    }
}
