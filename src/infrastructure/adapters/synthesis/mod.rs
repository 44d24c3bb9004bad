//! Synthesis Adapter - 远程语音合成客户端实现

mod http_synthesis_client;
mod retrying;
mod scripted;

pub use http_synthesis_client::{HttpSynthesisClient, HttpSynthesisClientConfig};
pub use retrying::{RetryPolicy, RetryingSynthesisClient};
pub use scripted::ScriptedSynthesisClient;
