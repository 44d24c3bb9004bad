//! 按时长模拟播放进度
//!
//! 没有真实声卡时，用定时器代替"播放完毕"回调

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::application::ports::{CompletionSink, PlaybackOutcome};

struct Track {
    id: u64,
    total: Duration,
    played: Duration,
    resumed_at: Option<Instant>,
    sink: Option<CompletionSink>,
    timer: Option<JoinHandle<()>>,
}

impl Track {
    fn position(&self) -> Duration {
        let running = self.resumed_at.map(|t| t.elapsed()).unwrap_or_default();
        (self.played + running).min(self.total)
    }
}

/// 单轨道的播放计时器
#[derive(Default)]
pub(crate) struct Pacer {
    state: Arc<Mutex<Option<Track>>>,
    next_id: AtomicU64,
}

impl Pacer {
    fn lock(&self) -> MutexGuard<'_, Option<Track>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 从 `played` 处开始计时；替换掉的旧轨道以 Interrupted 结束
    pub fn start(&self, total: Duration, played: Duration, sink: CompletionSink) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let played = played.min(total);

        let previous = {
            let mut guard = self.lock();
            let timer = self.spawn_timer(id, total - played);
            guard.replace(Track {
                id,
                total,
                played,
                resumed_at: Some(Instant::now()),
                sink: Some(sink),
                timer: Some(timer),
            })
        };
        if let Some(track) = previous {
            Self::finish(track, Some(PlaybackOutcome::Interrupted));
        }
    }

    /// 暂停，返回已播放的时长
    pub fn pause(&self) -> Option<Duration> {
        let mut guard = self.lock();
        let track = guard.as_mut()?;
        if track.resumed_at.is_some() {
            track.played = track.position();
            track.resumed_at = None;
            if let Some(timer) = track.timer.take() {
                timer.abort();
            }
        }
        Some(track.played)
    }

    /// 恢复暂停的轨道
    pub fn resume(&self) -> bool {
        let mut guard = self.lock();
        let Some(track) = guard.as_mut() else {
            return false;
        };
        if track.resumed_at.is_some() {
            return true;
        }
        let remaining = track.total.saturating_sub(track.played);
        let id = track.id;
        track.resumed_at = Some(Instant::now());
        track.timer = Some(self.spawn_timer(id, remaining));
        true
    }

    /// 结束当前轨道，`outcome` 为 None 时不回报
    pub fn stop(&self, outcome: Option<PlaybackOutcome>) {
        let track = self.lock().take();
        if let Some(track) = track {
            Self::finish(track, outcome);
        }
    }

    fn finish(mut track: Track, outcome: Option<PlaybackOutcome>) {
        if let Some(timer) = track.timer.take() {
            timer.abort();
        }
        if let (Some(sink), Some(outcome)) = (track.sink.take(), outcome) {
            sink.finish(outcome);
        }
    }

    fn spawn_timer(&self, id: u64, remaining: Duration) -> JoinHandle<()> {
        let state = self.state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            Self::complete(&state, id);
        })
    }

    /// 计时结束；轨道已被替换或已暂停时不做任何事
    fn complete(state: &Mutex<Option<Track>>, id: u64) {
        let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
        let running = guard
            .as_ref()
            .map(|t| t.id == id && t.resumed_at.is_some())
            .unwrap_or(false);
        if !running {
            return;
        }
        if let Some(mut track) = guard.take() {
            track.timer = None;
            if let Some(sink) = track.sink.take() {
                sink.finish(PlaybackOutcome::Completed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{Completion, PlaybackSource};
    use crate::domain::playback::Generation;
    use tokio::sync::mpsc;

    fn make_sink() -> (CompletionSink, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CompletionSink::new(Generation::new(1), PlaybackSource::Device, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_timer_does_not_finish_paused_track() {
        let pacer = Pacer::default();
        let (sink, mut rx) = make_sink();
        pacer.start(Duration::from_secs(2), Duration::ZERO, sink);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(pacer.pause().is_some());

        // 已醒来的旧计时器在暂停之后才拿到锁
        Pacer::complete(&pacer.state, 0);
        assert!(rx.try_recv().is_err());

        assert!(pacer.resume());
        assert_eq!(rx.recv().await.unwrap().outcome, PlaybackOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_track_reports_interrupted() {
        let pacer = Pacer::default();
        let (first, mut first_rx) = make_sink();
        pacer.start(Duration::from_secs(2), Duration::ZERO, first);
        let (second, mut second_rx) = make_sink();
        pacer.start(Duration::from_secs(1), Duration::ZERO, second);

        assert_eq!(first_rx.recv().await.unwrap().outcome, PlaybackOutcome::Interrupted);
        Pacer::complete(&pacer.state, 0);
        assert_eq!(second_rx.recv().await.unwrap().outcome, PlaybackOutcome::Completed);
    }
}
