//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SynthesisPort、AudioOutputPort、SpeechDevicePort 等）
//! - commands: 命令及处理器（打开文档、播放编排、导出）
//! - queries: 查询及处理器（音色目录）
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    handlers::{
        ExportAudioHandler, ExportOutcome, ExportSsmlHandler, ExportTextHandler, OpenBookHandler,
        PlaybackConfig, PlaybackHandle, PlaybackOrchestrator,
    },
    ExportAudio, ExportSsml, ExportText, OpenBook, PlaybackCommand,
};

pub use error::ApplicationError;

pub use ports::{
    AudioCachePort, AudioOutputPort, DecisionPort, DocumentSourcePort, SpeechDevicePort,
    SynthesisError, SynthesisPort, SynthesisRequest,
};

pub use queries::{
    handlers::{CheckSynthesisHealthHandler, ListVoicesHandler, VoiceCatalog},
    CheckSynthesisHealth, ListVoices,
};
