//! Playback Context - 播放会话

mod session;

pub use session::{
    Generation, PlaybackSession, PlaybackSnapshot, PlaybackStatus, SessionError, StartMode,
};
