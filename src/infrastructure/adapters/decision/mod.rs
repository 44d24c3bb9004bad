//! Decision Adapter - 是否继续的决策来源

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::application::ports::DecisionPort;

/// 固定答案，用于 `--yes` 和测试
pub struct FixedDecision {
    answer: bool,
}

impl FixedDecision {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

#[async_trait]
impl DecisionPort for FixedDecision {
    async fn confirm(&self, message: &str) -> bool {
        tracing::info!(answer = self.answer, prompt = %message, "Auto-answering decision prompt");
        self.answer
    }
}

/// 从逐行输入读取答案
///
/// `y` / `yes` / `是` / `继续` 视为继续，其他输入和 EOF 视为放弃
pub struct LineDecisionProvider<R> {
    reader: Mutex<R>,
}

pub type StdinDecisionProvider = LineDecisionProvider<BufReader<Stdin>>;

impl StdinDecisionProvider {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> LineDecisionProvider<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "是" | "继续"
    )
}

#[async_trait]
impl<R> DecisionPort for LineDecisionProvider<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn confirm(&self, message: &str) -> bool {
        eprintln!("\n{}\n是否继续尝试？[y/N] ", message);

        let mut reader = self.reader.lock().await;
        let mut input = String::new();
        match reader.read_line(&mut input).await {
            Ok(0) => false,
            Ok(_) => is_affirmative(&input),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read decision input");
                false
            }
        }
    }
}
