//! Device Adapter - 播放设备实现

mod paced;
mod pacer;

pub use paced::{
    PacedAudioOutput, PacedSpeechDevice, DEFAULT_BITRATE_BPS, DEFAULT_CHAR_DURATION,
};
