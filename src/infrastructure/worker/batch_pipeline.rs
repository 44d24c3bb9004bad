//! Batch Pipeline - 整本书逐句合成并合并为一个音频文件

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    synthesize_cached, AudioCachePort, DecisionPort, SynthesisPort, SynthesisRequest,
};
use crate::application::ApplicationError;
use crate::domain::export::{AudioArtifact, BatchJob, BatchReport};
use crate::domain::voice::{Speed, VoiceSelection};
use crate::domain::SpeakableUnit;
use crate::infrastructure::events::{EventPublisher, NoticeLevel};

/// 流水线配置
#[derive(Debug, Clone)]
pub struct BatchPipelineConfig {
    /// 连续失败多少次后询问用户
    pub failure_threshold: u32,
    /// 失败后重试同一句前的等待
    pub retry_delay: Duration,
    /// 每句成功后的等待，限制请求频率
    pub success_delay: Duration,
    /// 服务不可达且用户选择继续时的额外等待
    pub offline_cooldown: Duration,
}

impl Default for BatchPipelineConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            retry_delay: Duration::from_millis(1000),
            success_delay: Duration::from_millis(200),
            offline_cooldown: Duration::from_millis(3000),
        }
    }
}

/// 批量合成参数
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub voice: VoiceSelection,
    pub speed: Speed,
}

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// 所有句子都处理完毕
    Completed(BatchReport),
    /// 用户选择不再继续；任务状态保留，可从 `resume_from` 恢复
    Suspended {
        resume_from: usize,
        report: BatchReport,
    },
}

/// 批量合成流水线
///
/// 严格按顺序处理；失败的句子原地重试，只有成功后才前进
pub struct BatchPipeline {
    config: BatchPipelineConfig,
    synthesis: Arc<dyn SynthesisPort>,
    cache: Arc<dyn AudioCachePort>,
    decision: Arc<dyn DecisionPort>,
    event_publisher: Arc<EventPublisher>,
}

impl BatchPipeline {
    pub fn new(
        config: BatchPipelineConfig,
        synthesis: Arc<dyn SynthesisPort>,
        cache: Arc<dyn AudioCachePort>,
        decision: Arc<dyn DecisionPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            synthesis,
            cache,
            decision,
            event_publisher,
        }
    }

    /// 从 `resume_from` 开始处理
    ///
    /// 取消时返回 `UserCancelled`，已成功的缓冲区保留在 `job` 中由调用方处置
    pub async fn run(
        &self,
        job: &mut BatchJob,
        units: &[SpeakableUnit],
        request: &BatchRequest,
        resume_from: usize,
    ) -> Result<BatchOutcome, ApplicationError> {
        if units.is_empty() {
            return Err(ApplicationError::validation("没有可保存的内容"));
        }
        let VoiceSelection::Remote(voice) = &request.voice else {
            return Err(ApplicationError::validation(
                "本地语音暂不支持导出音频，请选择在线语音",
            ));
        };

        let total = units.len();
        let rate = request.speed.rate_descriptor();
        job.prepare(total, resume_from);
        let cancel = job.cancel_token();

        tracing::info!(
            job_id = %job.id(),
            total,
            resume_from,
            voice = %voice,
            rate = %rate,
            "Batch synthesis started"
        );

        let mut index = job.next_index();
        while index < total {
            // Check 1: 处理每一句之前
            if job.is_cancelled() {
                return Err(self.cancelled(job, index));
            }
            if job.is_populated(index) {
                index += 1;
                continue;
            }

            let percent = (((index + 1) as f64 / total as f64) * 100.0).round() as u8;
            self.event_publisher.publish_batch_progress(
                job.id(),
                index,
                total,
                percent,
                format!("正在处理第 {}/{} 句...", index + 1, total),
            );

            let synth_request = SynthesisRequest::new(units[index].text(), voice.as_str(), rate.clone());
            // Check 2: 合成（含重试与退避）进行中也响应取消，未完成的请求随之丢弃
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(job, index)),
                result = synthesize_cached(self.synthesis.as_ref(), self.cache.as_ref(), &synth_request) => result,
            };

            // Check 3: 合成返回后，取消时丢弃结果
            if job.is_cancelled() {
                return Err(self.cancelled(job, index));
            }

            match result {
                Ok(audio) => {
                    tracing::debug!(index, size = audio.len(), "Unit synthesized");
                    job.record_success(index, audio);
                    index += 1;
                    self.wait(job, self.config.success_delay, index).await?;
                }
                Err(e) => {
                    let failures = job.record_failure(index);
                    tracing::warn!(index, failures, error = %e, "Unit synthesis failed");

                    if failures >= self.config.failure_threshold {
                        let reachable = self.synthesis.health_check().await;
                        let message = self.decision_message(job, index, failures, reachable);

                        if !self.decision.confirm(&message).await {
                            let report = job.report();
                            tracing::info!(
                                job_id = %job.id(),
                                resume_from = index,
                                succeeded = report.succeeded,
                                "Batch synthesis suspended by user"
                            );
                            self.event_publisher.notify(
                                NoticeLevel::Warning,
                                format!("已在第 {} 句暂停生成，{}", index + 1, report),
                            );
                            return Ok(BatchOutcome::Suspended {
                                resume_from: index,
                                report,
                            });
                        }

                        job.reset_failures();
                        if !reachable {
                            self.event_publisher.publish_batch_progress(
                                job.id(),
                                index,
                                total,
                                percent,
                                "等待网络恢复...",
                            );
                            self.wait(job, self.config.offline_cooldown, index).await?;
                        }
                    } else {
                        self.wait(job, self.config.retry_delay, index).await?;
                    }
                }
            }
        }

        let report = job.report();
        tracing::info!(
            job_id = %job.id(),
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "Batch synthesis finished"
        );
        self.event_publisher
            .publish_batch_finished(job.id(), report.clone());
        Ok(BatchOutcome::Completed(report))
    }

    /// 合并所有成功的音频并丢弃任务状态
    pub fn finalize(&self, job: &mut BatchJob) -> Result<AudioArtifact, ApplicationError> {
        let parts = job.compact();
        if parts.is_empty() {
            tracing::error!(job_id = %job.id(), "No unit synthesized, nothing to export");
            return Err(ApplicationError::NoAudioProduced);
        }

        let artifact = AudioArtifact::merge(&parts, job.report());
        job.clear();

        let report = artifact.report();
        if report.is_complete() {
            self.event_publisher
                .notify(NoticeLevel::Success, "音频文件生成成功！");
        } else {
            self.event_publisher.notify(
                NoticeLevel::Warning,
                format!(
                    "音频文件生成完成，但有 {} 句失败。失败句子: {}",
                    report.failed.len(),
                    report.failed_list()
                ),
            );
        }
        Ok(artifact)
    }

    /// 可被取消打断的等待
    async fn wait(
        &self,
        job: &BatchJob,
        delay: Duration,
        index: usize,
    ) -> Result<(), ApplicationError> {
        let cancel = job.cancel_token();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(self.cancelled(job, index)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn cancelled(&self, job: &BatchJob, index: usize) -> ApplicationError {
        tracing::info!(job_id = %job.id(), index, "Batch synthesis cancelled");
        self.event_publisher
            .notify(NoticeLevel::Info, "已取消音频生成");
        ApplicationError::UserCancelled
    }

    fn decision_message(&self, job: &BatchJob, index: usize, failures: u32, reachable: bool) -> String {
        let report = job.report();
        let connection = if reachable {
            "服务器连接正常"
        } else {
            "服务器连接异常"
        };
        let mut message = format!(
            "连续 {} 句生成失败，{}。\n当前卡在第 {} 句\n已成功生成: {} 句\n失败句子: {}",
            failures,
            connection,
            index + 1,
            report.succeeded,
            report.failed_list()
        );
        if !reachable {
            message.push_str("\n建议检查网络连接后重试。");
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{
        FixedDecision, RetryPolicy, RetryingSynthesisClient, ScriptedSynthesisClient,
    };
    use crate::infrastructure::memory::SharedUnitCache;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 记录每次询问并按顺序回答
    struct ScriptedDecision {
        answers: Mutex<Vec<bool>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedDecision {
        fn new(answers: Vec<bool>) -> Self {
            Self {
                answers: Mutex::new(answers),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DecisionPort for ScriptedDecision {
        async fn confirm(&self, message: &str) -> bool {
            self.prompts.lock().unwrap().push(message.to_string());
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                false
            } else {
                answers.remove(0)
            }
        }
    }

    fn units(n: usize) -> Vec<SpeakableUnit> {
        (1..=n)
            .map(|i| SpeakableUnit::speech(format!("第{}句。", i)))
            .collect()
    }

    fn request() -> BatchRequest {
        BatchRequest {
            voice: VoiceSelection::parse("online:zh-CN-XiaoxiaoNeural"),
            speed: Speed::default(),
        }
    }

    fn pipeline(
        synthesis: Arc<dyn SynthesisPort>,
        decision: Arc<dyn DecisionPort>,
    ) -> BatchPipeline {
        BatchPipeline::new(
            BatchPipelineConfig::default(),
            synthesis,
            SharedUnitCache::new(10).arc(),
            decision,
            EventPublisher::new().arc(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_units_succeed() {
        let scripted = Arc::new(ScriptedSynthesisClient::new());
        let pipeline = pipeline(scripted.clone(), Arc::new(FixedDecision::new(false)));
        let units = units(3);
        let mut job = BatchJob::new();

        let outcome = pipeline.run(&mut job, &units, &request(), 0).await.unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Completed(BatchReport {
                total: 3,
                succeeded: 3,
                failed: vec![]
            })
        );

        let artifact = pipeline.finalize(&mut job).unwrap();
        let expected: Vec<u8> = units
            .iter()
            .map(|u| {
                ScriptedSynthesisClient::audio_for(&SynthesisRequest::new(
                    u.text(),
                    "zh-CN-XiaoxiaoNeural",
                    Speed::default().rate_descriptor(),
                ))
            })
            .flat_map(|a| a.to_vec())
            .collect();
        assert_eq!(artifact.data(), expected.as_slice());
        assert_eq!(job.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_failure_prompts_once_then_continues() {
        let units = units(10);
        let scripted = Arc::new(ScriptedSynthesisClient::new().fail_times(units[3].text(), 10));
        let decision = Arc::new(ScriptedDecision::new(vec![true]));
        let pipeline = pipeline(scripted.clone(), decision.clone());
        let mut job = BatchJob::new();

        let outcome = pipeline.run(&mut job, &units, &request(), 0).await.unwrap();

        assert_eq!(scripted.health_check_count(), 1);
        let prompts = decision.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("连续 10 句生成失败"));
        assert!(prompts[0].contains("当前卡在第 4 句"));
        assert!(prompts[0].contains("已成功生成: 3 句"));
        assert_eq!(scripted.call_count(units[3].text()), 11);

        // 最终成功的句子不出现在失败报告中
        assert_eq!(
            outcome,
            BatchOutcome::Completed(BatchReport {
                total: 10,
                succeeded: 10,
                failed: vec![]
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_processing_unit_six() {
        let units = units(10);
        let mut job = BatchJob::new();
        let token = job.reset_cancel();
        let sixth = units[5].text().to_string();
        let scripted = Arc::new(ScriptedSynthesisClient::new().on_call(move |req| {
            if req.text == sixth {
                token.cancel();
            }
        }));
        let pipeline = pipeline(scripted.clone(), Arc::new(FixedDecision::new(true)));

        let result = pipeline.run(&mut job, &units, &request(), 0).await;

        assert!(matches!(result, Err(ApplicationError::UserCancelled)));
        assert!((0..5).all(|i| job.is_populated(i)));
        assert!((5..10).all(|i| !job.is_populated(i)));
        assert_eq!(scripted.calls().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_slow_retrying_synthesis() {
        let slow = Arc::new(ScriptedSynthesisClient::new().with_delay(Duration::from_secs(60)));
        let retrying = Arc::new(RetryingSynthesisClient::new(slow.clone(), RetryPolicy::default()));
        let pipeline = pipeline(retrying, Arc::new(FixedDecision::new(true)));
        let units = units(3);
        let mut job = BatchJob::new();
        let token = job.reset_cancel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = pipeline.run(&mut job, &units, &request(), 0).await;

        assert!(matches!(result, Err(ApplicationError::UserCancelled)));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(slow.calls().len(), 1);
        assert!(!job.is_populated(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_offline_cooldown() {
        let units = units(1);
        let scripted = Arc::new(ScriptedSynthesisClient::new().fail_always(units[0].text()));
        scripted.set_healthy(false);
        let pipeline = pipeline(scripted.clone(), Arc::new(ScriptedDecision::new(vec![true])));
        let mut job = BatchJob::new();
        let token = job.reset_cancel();

        // 9 × 1s 重试等待后询问，随后进入 3s 冷却
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10_000)).await;
            token.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = pipeline.run(&mut job, &units, &request(), 0).await;

        assert!(matches!(result, Err(ApplicationError::UserCancelled)));
        assert_eq!(started.elapsed(), Duration::from_millis(10_000));
        assert_eq!(scripted.call_count(units[0].text()), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_does_not_resynthesize_earlier_units() {
        let units = units(5);
        let failing = Arc::new(ScriptedSynthesisClient::new().fail_always(units[2].text()));
        let first = pipeline(failing.clone(), Arc::new(FixedDecision::new(false)));
        let mut job = BatchJob::new();

        let outcome = first.run(&mut job, &units, &request(), 0).await.unwrap();
        let BatchOutcome::Suspended { resume_from, report } = outcome else {
            panic!("expected suspension");
        };
        assert_eq!(resume_from, 2);
        assert_eq!(report.failed, vec![3]);
        assert_eq!(failing.call_count(units[2].text()), 10);

        let healthy = Arc::new(ScriptedSynthesisClient::new());
        let second = pipeline(healthy.clone(), Arc::new(FixedDecision::new(false)));
        let outcome = second.run(&mut job, &units, &request(), resume_from).await.unwrap();

        assert!(matches!(outcome, BatchOutcome::Completed(ref r) if r.succeeded == 5 && r.failed.is_empty()));
        assert_eq!(
            healthy.calls(),
            vec![units[2].text(), units[3].text(), units[4].text()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_units_fail_produces_no_audio() {
        let units = units(2);
        let scripted = Arc::new(
            ScriptedSynthesisClient::new()
                .fail_always(units[0].text())
                .fail_always(units[1].text()),
        );
        scripted.set_healthy(false);
        let pipeline = pipeline(scripted.clone(), Arc::new(FixedDecision::new(false)));
        let mut job = BatchJob::new();

        let outcome = pipeline.run(&mut job, &units, &request(), 0).await.unwrap();
        assert!(matches!(outcome, BatchOutcome::Suspended { resume_from: 0, .. }));
        assert!(matches!(
            pipeline.finalize(&mut job),
            Err(ApplicationError::NoAudioProduced)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_cooldown_after_continue() {
        let units = units(1);
        let scripted = Arc::new(ScriptedSynthesisClient::new().fail_times(units[0].text(), 10));
        scripted.set_healthy(false);
        let decision = Arc::new(ScriptedDecision::new(vec![true]));
        let pipeline = pipeline(scripted.clone(), decision.clone());
        let mut job = BatchJob::new();

        let started = tokio::time::Instant::now();
        pipeline.run(&mut job, &units, &request(), 0).await.unwrap();

        assert!(decision.prompts()[0].contains("服务器连接异常"));
        // 9 × 1s 重试等待 + 3s 冷却 + 成功后 200ms
        assert_eq!(started.elapsed(), Duration::from_millis(12_200));
    }

    #[tokio::test]
    async fn test_rejects_on_device_voice() {
        let pipeline = pipeline(
            Arc::new(ScriptedSynthesisClient::new()),
            Arc::new(FixedDecision::new(true)),
        );
        let mut job = BatchJob::new();
        let request = BatchRequest {
            voice: VoiceSelection::parse("Ting-Ting"),
            speed: Speed::default(),
        };
        assert!(matches!(
            pipeline.run(&mut job, &units(1), &request, 0).await,
            Err(ApplicationError::ValidationError(_))
        ));
    }
}
