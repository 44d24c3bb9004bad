//! Narrator - 电子书逐句朗读与有声导出
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Segmenter: 文本分段
//! - Book / Voice / Playback / Export Context
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Synthesis, AudioCache, AudioOutput, SpeechDevice, Decision, DocumentSource）
//! - Commands: 打开文档、播放编排、导出
//! - Queries: 音色目录
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP 合成客户端、模拟设备、文档读取、用户确认
//! - Memory: 单句音频缓存
//! - Worker: 批量合成流水线
//! - Events: 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
