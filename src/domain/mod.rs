//! Domain Layer - 领域层
//!
//! 包含四个限界上下文:
//! - Book Context: 文本与分段
//! - Voice Context: 音色与语速
//! - Playback Context: 播放会话
//! - Export Context: 批量合成与导出

pub mod book;
pub mod export;
pub mod playback;
pub mod voice;

// 共享的文本分割器
mod text_segmenter;

pub use text_segmenter::{
    segment, segment_default, SegmenterConfig, SpeakableUnit, DEFAULT_MAX_UNIT_CHARS,
    DEFAULT_SOFT_BREAKS, DEFAULT_SOFT_BREAK_WINDOW,
};
