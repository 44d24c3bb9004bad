//! Paced Devices - 终端预览用的播放设备
//!
//! 不出声，只按音频长度或文字长度计时后回报完成

use std::time::Duration;

use super::pacer::Pacer;
use crate::application::ports::{
    AudioOutputPort, CompletionSink, DeviceError, PlaybackOutcome, SpeechDevicePort, Utterance,
};
use crate::domain::export::AudioData;

/// 远程合成音频的码率（24kHz 48kbps 单声道 mp3）
pub const DEFAULT_BITRATE_BPS: u64 = 48_000;

/// 本机语音在 1.0 倍速下每个字的时长
pub const DEFAULT_CHAR_DURATION: Duration = Duration::from_millis(220);

/// 按字节数和码率计算时长的音频输出
pub struct PacedAudioOutput {
    pacer: Pacer,
    bitrate_bps: u64,
}

impl PacedAudioOutput {
    pub fn new(bitrate_bps: u64) -> Self {
        Self {
            pacer: Pacer::default(),
            bitrate_bps: bitrate_bps.max(1),
        }
    }

    pub fn duration_of(&self, audio: &[u8]) -> Duration {
        Duration::from_millis(audio.len() as u64 * 8 * 1000 / self.bitrate_bps)
    }
}

impl Default for PacedAudioOutput {
    fn default() -> Self {
        Self::new(DEFAULT_BITRATE_BPS)
    }
}

impl AudioOutputPort for PacedAudioOutput {
    fn play(
        &self,
        audio: AudioData,
        start_at: f64,
        sink: CompletionSink,
    ) -> Result<(), DeviceError> {
        if audio.is_empty() {
            return Err(DeviceError::Rejected {
                code: "empty".to_string(),
                message: "audio buffer is empty".to_string(),
            });
        }
        let total = self.duration_of(&audio);
        let offset = Duration::from_secs_f64(start_at.max(0.0));
        tracing::trace!(
            total_ms = total.as_millis() as u64,
            offset_ms = offset.as_millis() as u64,
            "PacedAudioOutput: play"
        );
        self.pacer.start(total, offset, sink);
        Ok(())
    }

    fn pause(&self) -> Option<f64> {
        self.pacer.pause().map(|d| d.as_secs_f64())
    }

    fn stop(&self) {
        self.pacer.stop(None);
    }
}

/// 按文字长度和语速计时的本机语音
pub struct PacedSpeechDevice {
    pacer: Pacer,
    char_duration: Duration,
    supports_resume: bool,
}

impl PacedSpeechDevice {
    pub fn new(char_duration: Duration) -> Self {
        Self {
            pacer: Pacer::default(),
            char_duration,
            supports_resume: true,
        }
    }

    /// 模拟不支持恢复的设备
    pub fn without_resume(mut self) -> Self {
        self.supports_resume = false;
        self
    }

    pub fn duration_of(&self, utterance: &Utterance) -> Duration {
        let chars = utterance.text.chars().count() as u32;
        let rate = if utterance.rate > 0.0 { utterance.rate } else { 1.0 };
        self.char_duration.saturating_mul(chars).div_f32(rate)
    }
}

impl Default for PacedSpeechDevice {
    fn default() -> Self {
        Self::new(DEFAULT_CHAR_DURATION)
    }
}

impl SpeechDevicePort for PacedSpeechDevice {
    fn speak(&self, utterance: Utterance, sink: CompletionSink) -> Result<(), DeviceError> {
        if utterance.text.trim().is_empty() {
            return Err(DeviceError::Rejected {
                code: "text-empty".to_string(),
                message: "nothing to speak".to_string(),
            });
        }
        let total = self.duration_of(&utterance);
        tracing::trace!(
            voice = %utterance.voice,
            rate = utterance.rate,
            total_ms = total.as_millis() as u64,
            "PacedSpeechDevice: speak"
        );
        self.pacer.start(total, Duration::ZERO, sink);
        Ok(())
    }

    fn pause(&self) {
        self.pacer.pause();
    }

    fn resume(&self) -> bool {
        self.supports_resume && self.pacer.resume()
    }

    fn cancel(&self) {
        self.pacer.stop(Some(PlaybackOutcome::Interrupted));
    }
}
