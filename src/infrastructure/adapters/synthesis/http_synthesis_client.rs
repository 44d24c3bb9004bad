//! HTTP Synthesis Client - 调用远程语音合成服务
//!
//! 实现 SynthesisPort trait，每次调用只发一次请求，重试由 `RetryingSynthesisClient` 负责
//!
//! 远程合成 API:
//! POST {base}/synthesize
//! Request: {"text": "...", "voice": "...", "options": {"rate": "+0%", "volume": "+0%", "pitch": "+0Hz"}}
//! Response: audio/mpeg binary；失败时为 {"success": false, "error": "..."}
//! GET {base}/voices → {"success": true, "voices": [...]}
//! GET {base}/health → {"success": true, "status": "healthy"}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{SynthesisError, SynthesisPort, SynthesisRequest};
use crate::domain::export::AudioData;
use crate::domain::voice::VoiceInfo;

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    text: &'a str,
    voice: &'a str,
    options: SynthesizeOptions<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesizeOptions<'a> {
    rate: &'a str,
    volume: &'a str,
    pitch: &'a str,
}

/// 错误响应
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
}

/// 音色列表响应
#[derive(Debug, Deserialize)]
struct VoicesEnvelope {
    success: bool,
    #[serde(default)]
    voices: Vec<VoiceInfo>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP 合成客户端配置
#[derive(Debug, Clone)]
pub struct HttpSynthesisClientConfig {
    /// 合成服务基础 URL（含 `/api`）
    pub base_url: String,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 健康检查超时时间（秒）
    pub health_timeout_secs: u64,
}

impl Default for HttpSynthesisClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".to_string(),
            timeout_secs: 30,
            health_timeout_secs: 5,
        }
    }
}

impl HttpSynthesisClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 合成客户端
pub struct HttpSynthesisClient {
    client: Client,
    config: HttpSynthesisClientConfig,
}

impl HttpSynthesisClient {
    pub fn new(config: HttpSynthesisClientConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

fn map_send_error(e: reqwest::Error) -> SynthesisError {
    if e.is_timeout() {
        SynthesisError::Timeout
    } else if e.is_connect() {
        SynthesisError::NetworkError(format!("Cannot connect to synthesis service: {}", e))
    } else {
        SynthesisError::NetworkError(e.to_string())
    }
}

/// 从错误响应中取出可读的错误信息
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl SynthesisPort for HttpSynthesisClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioData, SynthesisError> {
        let body = SynthesizeBody {
            text: &request.text,
            voice: &request.voice,
            options: SynthesizeOptions {
                rate: request.rate.as_str(),
                volume: "+0%",
                pitch: "+0Hz",
            },
        };

        tracing::debug!(
            url = %self.url("synthesize"),
            text_len = request.text.chars().count(),
            voice = %request.voice,
            rate = %request.rate,
            "Sending synthesis request"
        );

        let response = self
            .client
            .post(self.url("synthesize"))
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ServiceError {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                SynthesisError::Timeout
            } else {
                SynthesisError::InvalidResponse(format!("Failed to read audio: {}", e))
            }
        })?;

        if bytes.is_empty() {
            return Err(SynthesisError::InvalidResponse("Empty audio body".to_string()));
        }

        tracing::debug!(audio_size = bytes.len(), "Synthesis completed");
        Ok(AudioData::from(bytes.as_ref()))
    }

    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError> {
        let response = self
            .client
            .get(self.url("voices"))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(SynthesisError::ServiceError {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let envelope: VoicesEnvelope = serde_json::from_str(&text)
            .map_err(|e| SynthesisError::InvalidResponse(format!("Bad voices payload: {}", e)))?;

        if !envelope.success {
            return Err(SynthesisError::ServiceError {
                status: status.as_u16(),
                message: envelope.error.unwrap_or_default(),
            });
        }

        tracing::info!(count = envelope.voices.len(), "Fetched remote voices");
        Ok(envelope.voices)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.url("health"))
            .timeout(Duration::from_secs(self.config.health_timeout_secs))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Synthesis service health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, StatusCode},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    use crate::domain::voice::Speed;

    async fn synthesize(Json(body): Json<Value>) -> axum::response::Response {
        let text = body["text"].as_str().unwrap_or_default();
        if text.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": "文本不能为空"})),
            )
                .into_response();
        }
        let audio = format!(
            "mp3|{}|{}|{}|{}",
            body["voice"].as_str().unwrap_or_default(),
            body["options"]["rate"].as_str().unwrap_or_default(),
            body["options"]["volume"].as_str().unwrap_or_default(),
            body["options"]["pitch"].as_str().unwrap_or_default(),
        );
        ([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response()
    }

    async fn voices() -> Json<Value> {
        Json(json!({
            "success": true,
            "voices": [
                {"name": "zh-CN-XiaoxiaoNeural", "displayName": "Microsoft Xiaoxiao Online", "language": "zh-CN", "gender": "Female", "isRecommended": true}
            ]
        }))
    }

    async fn health() -> Json<Value> {
        Json(json!({"success": true, "status": "healthy"}))
    }

    async fn spawn_mock() -> String {
        let app = Router::new()
            .route("/api/synthesize", post(synthesize))
            .route("/api/voices", get(voices))
            .route("/api/health", get(health));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    fn client(base_url: String) -> HttpSynthesisClient {
        HttpSynthesisClient::new(HttpSynthesisClientConfig::new(base_url)).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = HttpSynthesisClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3001/api");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_error_message_parsing() {
        assert_eq!(
            error_message(r#"{"success":false,"error":"语音合成失败"}"#),
            "语音合成失败"
        );
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_synthesize_sends_wire_format() {
        let client = client(spawn_mock().await);
        let request = SynthesisRequest::new(
            "你好。",
            "zh-CN-XiaoxiaoNeural",
            Speed::new(0.8).rate_descriptor(),
        );

        let audio = client.synthesize(&request).await.unwrap();
        assert_eq!(&audio[..], b"mp3|zh-CN-XiaoxiaoNeural|-20%|+0%|+0Hz");
    }

    #[tokio::test]
    async fn test_service_error_envelope() {
        let client = client(spawn_mock().await);
        let request = SynthesisRequest::new("", "zh-CN-XiaoxiaoNeural", Speed::default().rate_descriptor());

        let err = client.synthesize(&request).await.unwrap_err();
        assert_eq!(
            err,
            SynthesisError::ServiceError {
                status: 400,
                message: "文本不能为空".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_list_voices_and_health() {
        let client = client(spawn_mock().await);
        let voices = client.list_voices().await.unwrap();
        assert_eq!(voices.len(), 1);
        assert!(voices[0].is_recommended);
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // 绑定后立即释放端口，保证连接被拒绝
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client(format!("http://{}/api", addr));
        let request = SynthesisRequest::new("你好。", "v", Speed::default().rate_descriptor());
        assert!(matches!(
            client.synthesize(&request).await,
            Err(SynthesisError::NetworkError(_))
        ));
        assert!(!client.health_check().await);
    }
}
