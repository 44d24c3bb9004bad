//! Export Command Handlers

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::application::commands::{ExportAudio, ExportSsml, ExportText};
use crate::application::error::ApplicationError;
use crate::domain::export::{render_plain_text, render_ssml, AudioArtifact, BatchJob, BatchReport};
use crate::infrastructure::worker::{BatchOutcome, BatchPipeline, BatchRequest};

// ============================================================================
// ExportAudio
// ============================================================================

/// 音频导出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// 已写入文件
    Saved { path: PathBuf, report: BatchReport },
    /// 用户选择暂停，任务状态保留
    Suspended {
        resume_from: usize,
        report: BatchReport,
    },
}

/// ExportAudio Handler
///
/// 持有唯一的批量任务；同一时间只运行一次导出
pub struct ExportAudioHandler {
    pipeline: Arc<BatchPipeline>,
    job: tokio::sync::Mutex<BatchJob>,
    cancel: Mutex<CancellationToken>,
}

impl ExportAudioHandler {
    pub fn new(pipeline: Arc<BatchPipeline>) -> Self {
        Self {
            pipeline,
            job: tokio::sync::Mutex::new(BatchJob::new()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub async fn handle(&self, command: ExportAudio) -> Result<ExportOutcome, ApplicationError> {
        let mut job = self.job.lock().await;
        *self.cancel.lock().unwrap_or_else(|e| e.into_inner()) = job.reset_cancel();

        let request = BatchRequest {
            voice: command.voice,
            speed: command.speed,
        };
        let outcome = self
            .pipeline
            .run(&mut job, &command.units, &request, command.resume_from)
            .await;

        match outcome {
            Ok(BatchOutcome::Completed(_)) => {
                let artifact = self.pipeline.finalize(&mut job)?;
                let path = write_artifact(&artifact, &command.output_dir).await?;
                Ok(ExportOutcome::Saved {
                    path,
                    report: artifact.report().clone(),
                })
            }
            Ok(BatchOutcome::Suspended {
                resume_from,
                report,
            }) => Ok(ExportOutcome::Suspended {
                resume_from,
                report,
            }),
            Err(ApplicationError::UserCancelled) => {
                job.clear();
                Err(ApplicationError::UserCancelled)
            }
            Err(e) => Err(e),
        }
    }

    /// 把暂停任务中已生成的部分写成文件
    pub async fn save_partial(&self, output_dir: &Path) -> Result<ExportOutcome, ApplicationError> {
        let mut job = self.job.lock().await;
        let artifact = self.pipeline.finalize(&mut job)?;
        let path = write_artifact(&artifact, output_dir).await?;
        Ok(ExportOutcome::Saved {
            path,
            report: artifact.report().clone(),
        })
    }

    /// 取消正在进行的导出
    pub fn cancel(&self) {
        self.cancel.lock().unwrap_or_else(|e| e.into_inner()).cancel();
    }
}

async fn write_artifact(artifact: &AudioArtifact, output_dir: &Path) -> Result<PathBuf, ApplicationError> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(artifact.file_name());
    tokio::fs::write(&path, artifact.data()).await?;

    tracing::info!(
        path = %path.display(),
        size = artifact.size(),
        mime = artifact.mime_type(),
        "Audio exported"
    );
    Ok(path)
}

// ============================================================================
// ExportSsml / ExportText
// ============================================================================

/// ExportSsml Handler
pub struct ExportSsmlHandler;

impl ExportSsmlHandler {
    pub async fn handle(&self, command: ExportSsml) -> Result<PathBuf, ApplicationError> {
        if command.units.is_empty() {
            return Err(ApplicationError::validation("没有可保存的内容"));
        }
        let ssml = render_ssml(&command.units, command.voice.name(), command.speed);
        write_text(&command.output, &ssml).await?;

        tracing::info!(path = %command.output.display(), units = command.units.len(), "SSML exported");
        Ok(command.output)
    }
}

/// ExportText Handler
pub struct ExportTextHandler;

impl ExportTextHandler {
    pub async fn handle(&self, command: ExportText) -> Result<PathBuf, ApplicationError> {
        if command.units.is_empty() {
            return Err(ApplicationError::validation("没有可保存的内容"));
        }
        write_text(&command.output, &render_plain_text(&command.units)).await?;

        tracing::info!(path = %command.output.display(), units = command.units.len(), "Text exported");
        Ok(command.output)
    }
}

async fn write_text(path: &Path, content: &str) -> Result<(), ApplicationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}
