//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod audio_output;
mod decision;
mod document_source;
mod speech_device;
mod synthesis;

pub use audio_cache::{generate_cache_key, AudioCachePort, CacheKey};
pub use audio_output::{
    AudioOutputPort, Completion, CompletionSink, DeviceError, PlaybackOutcome, PlaybackSource,
};
pub use decision::DecisionPort;
pub use document_source::{Document, DocumentError, DocumentSourcePort};
pub use speech_device::{SpeechDevicePort, Utterance};
pub use synthesis::{synthesize_cached, SynthesisError, SynthesisPort, SynthesisRequest};
