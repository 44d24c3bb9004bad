//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{DeviceError, DocumentError, SynthesisError};
use crate::domain::playback::SessionError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 分段结果违反长度约束（只记录日志，不会返回给用户）
    #[error("Segmentation defect: unit {index} has {length} chars")]
    SegmentationDefect { index: usize, length: usize },

    /// 合成超时
    #[error("Synthesis timeout")]
    SynthesisTimeout,

    /// 合成服务返回错误
    #[error("Synthesis service error ({status}): {message}")]
    SynthesisServiceError { status: u16, message: String },

    /// 无法连接合成服务
    #[error("Synthesis network error: {0}")]
    SynthesisNetworkError(String),

    /// 播放设备错误
    #[error("Playback device error ({code}): {message}")]
    PlaybackDeviceError { code: String, message: String },

    /// 用户取消
    #[error("Cancelled by user")]
    UserCancelled,

    /// 一段音频都没有生成
    #[error("No audio produced")]
    NoAudioProduced,

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 读取文档失败
    #[error("Document error: {0}")]
    DocumentError(#[from] DocumentError),

    /// 文件读写错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<SynthesisError> for ApplicationError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::Timeout => Self::SynthesisTimeout,
            SynthesisError::ServiceError { status, message } => {
                Self::SynthesisServiceError { status, message }
            }
            SynthesisError::NetworkError(msg) => Self::SynthesisNetworkError(msg),
            SynthesisError::InvalidResponse(msg) => Self::SynthesisServiceError {
                status: 200,
                message: msg,
            },
        }
    }
}

impl From<DeviceError> for ApplicationError {
    fn from(err: DeviceError) -> Self {
        Self::PlaybackDeviceError {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<SessionError> for ApplicationError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Empty | SessionError::OutOfRange { .. } => {
                Self::ValidationError(err.to_string())
            }
            SessionError::InvalidTransition(_) => Self::InvalidState(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_error_mapping() {
        assert!(matches!(
            ApplicationError::from(SynthesisError::Timeout),
            ApplicationError::SynthesisTimeout
        ));
        assert!(matches!(
            ApplicationError::from(SynthesisError::ServiceError {
                status: 503,
                message: "busy".into()
            }),
            ApplicationError::SynthesisServiceError { status: 503, .. }
        ));
        assert!(matches!(
            ApplicationError::from(SessionError::OutOfRange { index: 9, total: 3 }),
            ApplicationError::ValidationError(_)
        ));
    }
}
