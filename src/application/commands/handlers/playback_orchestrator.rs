//! Playback Orchestrator - 逐句朗读的播放状态机
//!
//! 单任务 actor：命令、定时器信号和设备完成回调都在同一个循环里串行处理。
//! 每次开始播放一句都会递增代次，携带旧代次的回调一律丢弃。

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::application::commands::playback_commands::{PlaybackCommand, Reply};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    synthesize_cached, AudioCachePort, AudioOutputPort, Completion, CompletionSink,
    PlaybackOutcome, PlaybackSource, SpeechDevicePort, SynthesisError, SynthesisPort,
    SynthesisRequest, Utterance,
};
use crate::domain::export::AudioData;
use crate::domain::playback::{Generation, PlaybackSession, PlaybackSnapshot, StartMode};
use crate::domain::voice::{device_rate, utterance_spacing, Speed, VoiceSelection};
use crate::domain::SpeakableUnit;
use crate::infrastructure::events::{EventPublisher, NoticeLevel};

/// 播放配置
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// 远程合成失败时改用的本机音色
    pub fallback_voice: String,
    /// 本机朗读无回调时强制跳到下一句
    pub watchdog: Duration,
    /// 超过该长度的句子直接跳过
    pub max_playable_chars: usize,
    /// 远程音频播完后到下一句的间隔
    pub remote_advance: Duration,
    /// 远程音频播放出错后到下一句的间隔
    pub audio_error_advance: Duration,
    /// 本机朗读出错后到下一句的间隔
    pub device_error_advance: Duration,
    /// 播放中跳转后重新开始前的等待
    pub seek_settle: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fallback_voice: "zh-CN-YunYangNeural".to_string(),
            watchdog: Duration::from_secs(15),
            max_playable_chars: 200,
            remote_advance: Duration::from_millis(100),
            audio_error_advance: Duration::from_millis(500),
            device_error_advance: Duration::from_millis(1000),
            seek_settle: Duration::from_millis(200),
        }
    }
}

/// 编排器内部的定时 / 异步信号
#[derive(Debug)]
enum Signal {
    /// 远程音频获取完成
    Fetched {
        generation: Generation,
        result: Result<AudioData, SynthesisError>,
    },
    /// 播放当前位置的句子
    PlayCurrent { generation: Generation },
    /// 本机朗读超时
    Watchdog { generation: Generation },
}

/// 当前正在使用的播放后端
#[derive(Debug, Clone, PartialEq, Eq)]
enum ActiveBackend {
    Remote,
    Device { voice: String },
}

/// 播放编排器
pub struct PlaybackOrchestrator {
    config: PlaybackConfig,
    session: PlaybackSession,
    commands: mpsc::Receiver<PlaybackCommand>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signals: mpsc::UnboundedReceiver<Signal>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    synthesis: Arc<dyn SynthesisPort>,
    cache: Arc<dyn AudioCachePort>,
    audio_output: Arc<dyn AudioOutputPort>,
    speech_device: Arc<dyn SpeechDevicePort>,
    event_publisher: Arc<EventPublisher>,
    active: Option<ActiveBackend>,
    current_audio: Option<AudioData>,
    fetch_task: Option<JoinHandle<()>>,
    timers: Vec<JoinHandle<()>>,
}

impl PlaybackOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PlaybackConfig,
        units: Arc<[SpeakableUnit]>,
        voice: VoiceSelection,
        speed: Speed,
        synthesis: Arc<dyn SynthesisPort>,
        cache: Arc<dyn AudioCachePort>,
        audio_output: Arc<dyn AudioOutputPort>,
        speech_device: Arc<dyn SpeechDevicePort>,
        event_publisher: Arc<EventPublisher>,
    ) -> (Self, PlaybackHandle) {
        let (command_tx, commands) = mpsc::channel(32);
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let (completion_tx, completions) = mpsc::unbounded_channel();

        let orchestrator = Self {
            config,
            session: PlaybackSession::new(units, voice, speed),
            commands,
            signal_tx,
            signals,
            completion_tx,
            completions,
            synthesis,
            cache,
            audio_output,
            speech_device,
            event_publisher,
            active: None,
            current_audio: None,
            fetch_task: None,
            timers: Vec::new(),
        };
        (orchestrator, PlaybackHandle { tx: command_tx })
    }

    /// 启动编排器
    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.session.id(),
            total = self.session.len(),
            voice = %self.session.voice(),
            "PlaybackOrchestrator started"
        );

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(PlaybackCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(signal) = self.signals.recv() => self.handle_signal(signal),
                Some(completion) = self.completions.recv() => self.handle_completion(completion),
            }
        }

        self.teardown();
        tracing::info!(session_id = %self.session.id(), "PlaybackOrchestrator stopped");
    }

    fn handle_command(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Start { reply } => {
                let result = self.start();
                self.reply(reply, result);
            }
            PlaybackCommand::Pause { reply } => {
                let result = self.pause();
                self.reply(reply, result);
            }
            PlaybackCommand::Seek { index, reply } => {
                let result = self.seek(index);
                self.reply(reply, result);
            }
            PlaybackCommand::Stop { reply } => {
                self.stop();
                self.reply(reply, Ok(()));
            }
            PlaybackCommand::SetSpeed { speed, reply } => {
                self.session.set_speed(speed);
                tracing::debug!(speed = %speed, "Speed changed");
                self.reply(reply, Ok(()));
            }
            PlaybackCommand::AdjustSpeed { delta, reply } => {
                let speed = self.session.speed().adjust(delta);
                self.session.set_speed(speed);
                tracing::debug!(speed = %speed, "Speed adjusted");
                self.reply(reply, Ok(()));
            }
            PlaybackCommand::SetVoice { voice, reply } => {
                tracing::debug!(voice = %voice, "Voice changed");
                self.session.set_voice(voice);
                self.reply(reply, Ok(()));
            }
            PlaybackCommand::Snapshot { reply } => self.reply(reply, Ok(())),
            PlaybackCommand::Shutdown => {}
        }
    }

    fn reply(&self, reply: Reply<PlaybackSnapshot>, result: Result<(), ApplicationError>) {
        let _ = reply.send(result.map(|_| self.session.snapshot()));
    }

    // ========== 命令 ==========

    fn start(&mut self) -> Result<(), ApplicationError> {
        match self.session.start()? {
            StartMode::AlreadyPlaying => {}
            StartMode::Fresh => {
                tracing::info!(index = self.session.current_index(), "Playback started");
                self.play_current();
            }
            StartMode::Resume { offset } => {
                tracing::info!(index = self.session.current_index(), offset = ?offset, "Playback resumed");
                self.resume(offset);
            }
        }
        Ok(())
    }

    fn resume(&mut self, offset: Option<f64>) {
        match (self.active.clone(), offset, self.current_audio.clone()) {
            (Some(ActiveBackend::Remote), Some(offset), Some(audio)) => {
                self.audio_output.stop();
                let generation = self.session.next_generation();
                let sink = self.sink(generation, PlaybackSource::Remote);
                if let Err(e) = self.audio_output.play(audio, offset, sink) {
                    self.on_audio_error(&e.to_string());
                }
            }
            (Some(ActiveBackend::Device { .. }), _, _) => {
                if self.speech_device.resume() {
                    let generation = self.session.generation();
                    self.schedule(self.config.watchdog, Signal::Watchdog { generation });
                } else {
                    self.speech_device.cancel();
                    self.play_current();
                }
            }
            _ => {
                self.audio_output.stop();
                self.play_current();
            }
        }
    }

    fn pause(&mut self) -> Result<(), ApplicationError> {
        if !self.session.is_playing() {
            return Err(ApplicationError::invalid_state(format!(
                "cannot pause while {}",
                self.session.status().as_str()
            )));
        }

        let offset = match &self.active {
            Some(ActiveBackend::Remote) => self.audio_output.pause(),
            Some(ActiveBackend::Device { .. }) => {
                self.speech_device.pause();
                None
            }
            None => None,
        };
        self.cancel_timers();
        self.abort_fetch();
        self.session.pause(offset)?;

        tracing::info!(index = self.session.current_index(), offset = ?offset, "Playback paused");
        Ok(())
    }

    fn seek(&mut self, index: usize) -> Result<(), ApplicationError> {
        self.session.seek(index)?;
        let was_playing = self.session.is_playing();

        self.teardown();
        let generation = self.session.next_generation();
        self.publish_progress();

        if was_playing {
            self.schedule(self.config.seek_settle, Signal::PlayCurrent { generation });
        }
        tracing::info!(index, was_playing, "Seeked");
        Ok(())
    }

    fn stop(&mut self) {
        self.teardown();
        self.session.stop();
        self.publish_progress();
        tracing::info!(session_id = %self.session.id(), "Playback stopped");
    }

    // ========== 播放 ==========

    /// 播放当前位置的句子；到达结尾时结束
    fn play_current(&mut self) {
        if !self.session.is_playing() {
            return;
        }

        loop {
            let Some(unit) = self.session.current_unit() else {
                self.finish();
                return;
            };
            let length = unit.char_len();
            if length <= self.config.max_playable_chars {
                break;
            }
            let defect = ApplicationError::SegmentationDefect {
                index: self.session.current_index(),
                length,
            };
            tracing::error!(error = %defect, "Skipping over-length unit");
            self.session.advance();
        }

        let generation = self.session.next_generation();
        let index = self.session.current_index();
        let Some(text) = self.session.current_unit().map(|u| u.text().to_string()) else {
            return;
        };

        self.event_publisher.publish_unit_started(
            self.session.id(),
            index,
            &text,
            self.session.voice().is_remote(),
        );
        self.publish_progress();

        match self.session.voice().clone() {
            VoiceSelection::Remote(voice) => {
                tracing::debug!(index, generation = %generation, voice = %voice, "Playing remote unit");
                self.active = Some(ActiveBackend::Remote);
                self.current_audio = None;
                self.fetch(generation, text, voice);
            }
            VoiceSelection::OnDevice(voice) => {
                tracing::debug!(index, generation = %generation, voice = %voice, "Speaking unit on device");
                self.speak(generation, text, voice);
            }
        }
    }

    fn request_for(&self, text: String, voice: String) -> SynthesisRequest {
        SynthesisRequest::new(text, voice, self.session.speed().rate_descriptor())
    }

    /// 后台获取音频，结果以信号形式回到循环
    fn fetch(&mut self, generation: Generation, text: String, voice: String) {
        self.abort_fetch();
        let request = self.request_for(text, voice);
        let synthesis = self.synthesis.clone();
        let cache = self.cache.clone();
        let signal_tx = self.signal_tx.clone();

        self.fetch_task = Some(tokio::spawn(async move {
            let result = synthesize_cached(synthesis.as_ref(), cache.as_ref(), &request).await;
            let _ = signal_tx.send(Signal::Fetched { generation, result });
        }));
    }

    /// 预取下一句，失败忽略
    fn preload(&self, index: usize) {
        let (Some(unit), VoiceSelection::Remote(voice)) =
            (self.session.units().get(index), self.session.voice())
        else {
            return;
        };
        if unit.char_len() > self.config.max_playable_chars {
            return;
        }
        let request = self.request_for(unit.text().to_string(), voice.clone());
        let synthesis = self.synthesis.clone();
        let cache = self.cache.clone();

        tokio::spawn(async move {
            if let Err(e) = synthesize_cached(synthesis.as_ref(), cache.as_ref(), &request).await {
                tracing::debug!(index, error = %e, "Preload failed");
            }
        });
    }

    fn speak(&mut self, generation: Generation, text: String, voice: String) {
        let rate = device_rate(&voice, self.session.speed());
        let utterance = Utterance::new(text, voice.clone(), rate);
        let sink = self.sink(generation, PlaybackSource::Device);
        self.active = Some(ActiveBackend::Device { voice });

        match self.speech_device.speak(utterance, sink) {
            Ok(()) => self.schedule(self.config.watchdog, Signal::Watchdog { generation }),
            Err(e) => self.on_device_error(e.code()),
        }
    }

    fn finish(&mut self) {
        tracing::info!(session_id = %self.session.id(), "Reached end of book");
        self.stop();
        self.event_publisher.publish_playback_finished(self.session.id());
        self.event_publisher.notify(NoticeLevel::Success, "朗读完成");
    }

    // ========== 信号与回调 ==========

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Fetched { generation, result } => {
                if !self.is_live(generation) {
                    tracing::debug!(generation = %generation, "Stale fetch result dropped");
                    return;
                }
                self.fetch_task = None;
                match result {
                    Ok(audio) => {
                        self.current_audio = Some(audio.clone());
                        let sink = self.sink(generation, PlaybackSource::Remote);
                        if let Err(e) = self.audio_output.play(audio, 0.0, sink) {
                            self.on_audio_error(&e.to_string());
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            index = self.session.current_index(),
                            error = %e,
                            fallback = %self.config.fallback_voice,
                            "Remote synthesis failed, falling back to device voice"
                        );
                        self.event_publisher.notify(
                            NoticeLevel::Warning,
                            format!("在线语音合成失败，改用本机语音: {}", e),
                        );
                        let text = self
                            .session
                            .current_unit()
                            .map(|u| u.text().to_string())
                            .unwrap_or_default();
                        let fallback = self.config.fallback_voice.clone();
                        self.speak(generation, text, fallback);
                    }
                }
            }
            Signal::PlayCurrent { generation } => {
                if self.is_live(generation) {
                    self.play_current();
                }
            }
            Signal::Watchdog { generation } => {
                if !self.is_live(generation) {
                    return;
                }
                tracing::warn!(
                    index = self.session.current_index(),
                    timeout_secs = self.config.watchdog.as_secs(),
                    "Device utterance timed out, forcing advance"
                );
                self.speech_device.cancel();
                self.session.advance();
                self.play_current();
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        if !self.is_live(completion.generation) {
            tracing::debug!(
                generation = %completion.generation,
                current = %self.session.generation(),
                "Stale completion ignored"
            );
            return;
        }

        match (completion.source, completion.outcome) {
            (_, PlaybackOutcome::Interrupted) => {
                tracing::debug!("Playback interrupted");
            }
            (PlaybackSource::Remote, PlaybackOutcome::Completed) => {
                self.current_audio = None;
                let next = self.session.advance();
                self.preload(next + 1);
                self.schedule_next(self.config.remote_advance);
            }
            (PlaybackSource::Remote, PlaybackOutcome::Failed(code)) => {
                self.on_audio_error(&code);
            }
            (PlaybackSource::Device, PlaybackOutcome::Completed) => {
                self.cancel_timers();
                let spacing = match &self.active {
                    Some(ActiveBackend::Device { voice }) => utterance_spacing(voice),
                    _ => utterance_spacing(""),
                };
                self.session.advance();
                self.schedule_next(spacing);
            }
            (PlaybackSource::Device, PlaybackOutcome::Failed(code)) => {
                self.on_device_error(&code);
            }
        }
    }

    fn on_audio_error(&mut self, reason: &str) {
        tracing::warn!(index = self.session.current_index(), reason, "Audio playback error, skipping unit");
        self.current_audio = None;
        self.session.advance();
        self.schedule_next(self.config.audio_error_advance);
    }

    fn on_device_error(&mut self, code: &str) {
        let index = self.session.current_index();
        tracing::warn!(index, code, "Device speech error, skipping unit");
        self.event_publisher.notify(
            NoticeLevel::Warning,
            format!("语音播放出错 ({})，跳过第 {} 句", code, index + 1),
        );
        self.cancel_timers();
        self.session.advance();
        self.schedule_next(self.config.device_error_advance);
    }

    // ========== 辅助 ==========

    /// 回调是否仍然有效：代次一致且仍在播放
    fn is_live(&self, generation: Generation) -> bool {
        self.session.is_current(generation) && self.session.is_playing()
    }

    fn sink(&self, generation: Generation, source: PlaybackSource) -> CompletionSink {
        CompletionSink::new(generation, source, self.completion_tx.clone())
    }

    fn schedule_next(&mut self, delay: Duration) {
        self.publish_progress();
        let generation = self.session.generation();
        self.schedule(delay, Signal::PlayCurrent { generation });
    }

    fn schedule(&mut self, delay: Duration, signal: Signal) {
        self.timers.retain(|t| !t.is_finished());
        let signal_tx = self.signal_tx.clone();
        self.timers.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signal_tx.send(signal);
        }));
    }

    fn cancel_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }

    fn abort_fetch(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }

    /// 停掉所有正在进行的音频、朗读和定时器
    fn teardown(&mut self) {
        self.cancel_timers();
        self.abort_fetch();
        self.audio_output.stop();
        self.speech_device.cancel();
        self.active = None;
        self.current_audio = None;
    }

    fn publish_progress(&self) {
        self.event_publisher.publish_progress(
            self.session.id(),
            self.session.current_index(),
            self.session.len(),
        );
    }
}

/// 播放编排器的控制句柄
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::Sender<PlaybackCommand>,
}

impl PlaybackHandle {
    async fn request(
        &self,
        make: impl FnOnce(Reply<PlaybackSnapshot>) -> PlaybackCommand,
    ) -> Result<PlaybackSnapshot, ApplicationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ApplicationError::internal("playback orchestrator stopped"))?;
        rx.await
            .map_err(|_| ApplicationError::internal("playback orchestrator dropped reply"))?
    }

    pub async fn start(&self) -> Result<PlaybackSnapshot, ApplicationError> {
        self.request(|reply| PlaybackCommand::Start { reply }).await
    }

    pub async fn pause(&self) -> Result<PlaybackSnapshot, ApplicationError> {
        self.request(|reply| PlaybackCommand::Pause { reply }).await
    }

    /// 播放中暂停，否则开始 / 恢复
    pub async fn toggle(&self) -> Result<PlaybackSnapshot, ApplicationError> {
        let snapshot = self.snapshot().await?;
        if snapshot.status == crate::domain::playback::PlaybackStatus::Playing {
            self.pause().await
        } else {
            self.start().await
        }
    }

    pub async fn seek(&self, index: usize) -> Result<PlaybackSnapshot, ApplicationError> {
        self.request(|reply| PlaybackCommand::Seek { index, reply })
            .await
    }

    pub async fn stop(&self) -> Result<PlaybackSnapshot, ApplicationError> {
        self.request(|reply| PlaybackCommand::Stop { reply }).await
    }

    pub async fn set_speed(&self, speed: Speed) -> Result<PlaybackSnapshot, ApplicationError> {
        self.request(|reply| PlaybackCommand::SetSpeed { speed, reply })
            .await
    }

    pub async fn adjust_speed(&self, delta: f64) -> Result<PlaybackSnapshot, ApplicationError> {
        self.request(|reply| PlaybackCommand::AdjustSpeed { delta, reply })
            .await
    }

    pub async fn set_voice(
        &self,
        voice: VoiceSelection,
    ) -> Result<PlaybackSnapshot, ApplicationError> {
        self.request(|reply| PlaybackCommand::SetVoice { voice, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<PlaybackSnapshot, ApplicationError> {
        self.request(|reply| PlaybackCommand::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(PlaybackCommand::Shutdown).await;
    }
}
