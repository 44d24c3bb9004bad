//! Speech Device Port - 本机语音能力

use super::audio_output::{CompletionSink, DeviceError};

/// 一次朗读请求
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, voice: impl Into<String>, rate: f32) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            rate,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Speech Device Port
///
/// `speak` 立即返回；结束时回报 completed / error / interrupted。
/// `cancel` 会让进行中的朗读以 interrupted 结束。
pub trait SpeechDevicePort: Send + Sync {
    fn speak(&self, utterance: Utterance, sink: CompletionSink) -> Result<(), DeviceError>;

    fn pause(&self);

    /// 恢复被暂停的朗读；不支持或没有可恢复的朗读时返回 false
    fn resume(&self) -> bool;

    fn cancel(&self);
}
