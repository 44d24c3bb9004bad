//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 远程语音标识前缀
pub const REMOTE_VOICE_PREFIX: &str = "online:";

/// 音色选择
///
/// 以 `online:` 开头的标识走远程合成服务，其余交给本机语音能力。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceSelection {
    Remote(String),
    OnDevice(String),
}

impl VoiceSelection {
    pub fn parse(id: &str) -> Self {
        let id = id.trim();
        match id.strip_prefix(REMOTE_VOICE_PREFIX) {
            Some(name) => Self::Remote(name.to_string()),
            None => Self::OnDevice(id.to_string()),
        }
    }

    /// 不带前缀的音色名
    pub fn name(&self) -> &str {
        match self {
            Self::Remote(name) | Self::OnDevice(name) => name,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl std::fmt::Display for VoiceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(name) => write!(f, "{}{}", REMOTE_VOICE_PREFIX, name),
            Self::OnDevice(name) => write!(f, "{}", name),
        }
    }
}

/// 朗读速度倍率，限制在 0.5 - 2.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Speed(f64);

impl Speed {
    pub const MIN: f64 = 0.5;
    pub const MAX: f64 = 2.0;
    pub const STEP: f64 = 0.1;

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// 调整速度，结果保留一位小数
    pub fn adjust(&self, delta: f64) -> Self {
        Self::new(((self.0 + delta) * 10.0).round() / 10.0)
    }

    pub fn rate_descriptor(&self) -> RateDescriptor {
        RateDescriptor::from_speed(*self)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(1.0)
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}x", self.0)
    }
}

/// 远程合成的语速参数，形如 `+20%` / `-50%`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateDescriptor(String);

impl RateDescriptor {
    /// `round((speed - 1) * 100)`，显式带符号
    pub fn from_speed(speed: Speed) -> Self {
        // 半数向正无穷取整
        let percent = ((speed.value() - 1.0) * 100.0 + 0.5).floor() as i64;
        if percent >= 0 {
            Self(format!("+{}%", percent))
        } else {
            Self(format!("{}%", percent))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RateDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 高速下不稳定、需要降速和加大间隔的本机音色
fn is_rate_sensitive(voice_name: &str) -> bool {
    voice_name.contains("Yunyang") || voice_name.contains("YunYang")
}

/// 本机语音的实际语速
pub fn device_rate(voice_name: &str, speed: Speed) -> f32 {
    let rate = if is_rate_sensitive(voice_name) {
        (speed.value() * 0.9).min(1.5)
    } else {
        speed.value()
    };
    rate as f32
}

/// 本机语音两句之间的间隔
pub fn utterance_spacing(voice_name: &str) -> Duration {
    if is_rate_sensitive(voice_name) {
        Duration::from_millis(300)
    } else {
        Duration::from_millis(200)
    }
}
