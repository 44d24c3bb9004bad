//! In-Memory Unit Cache Implementation
//!
//! 按写入顺序淘汰的有界缓存，只在进程生命周期内有效

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::ports::{AudioCachePort, CacheKey};
use crate::domain::export::AudioData;

/// 默认容量
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// 单句音频缓存
///
/// 读取不改变顺序；超出容量时淘汰最早写入的条目。本身不加锁。
#[derive(Debug)]
pub struct UnitCache {
    capacity: usize,
    entries: HashMap<CacheKey, AudioData>,
    order: VecDeque<CacheKey>,
}

impl UnitCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<AudioData> {
        self.entries.get(key).cloned()
    }

    /// 写入，返回被淘汰的 key
    pub fn put(&mut self, key: CacheKey, audio: AudioData) -> Option<CacheKey> {
        if self.entries.contains_key(&key) {
            // 条目不可变，重复写入保留原值和原顺序
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, audio);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// 播放与批量导出共享的缓存
///
/// 用互斥锁把独立调度的调用方串行化。
pub struct SharedUnitCache {
    inner: Mutex<UnitCache>,
    capacity: usize,
}

impl SharedUnitCache {
    pub fn new(capacity: usize) -> Self {
        let cache = UnitCache::new(capacity);
        Self {
            capacity: cache.capacity(),
            inner: Mutex::new(cache),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for SharedUnitCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl AudioCachePort for SharedUnitCache {
    async fn get(&self, key: &CacheKey) -> Option<AudioData> {
        let cache = self.inner.lock().await;
        let hit = cache.get(key);
        tracing::trace!(key = %key, hit = hit.is_some(), "Unit cache lookup");
        hit
    }

    async fn put(&self, key: CacheKey, audio: AudioData) {
        let mut cache = self.inner.lock().await;
        if let Some(evicted) = cache.put(key, audio) {
            tracing::debug!(evicted = %evicted, "Unit cache evicted oldest entry");
        }
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::generate_cache_key;
    use crate::domain::voice::Speed;

    fn key(text: &str) -> CacheKey {
        generate_cache_key("zh-CN-XiaoxiaoNeural", text, &Speed::default().rate_descriptor())
    }

    fn audio(byte: u8) -> AudioData {
        Arc::from(vec![byte])
    }

    #[test]
    fn test_evicts_oldest_inserted() {
        let mut cache = UnitCache::new(3);
        for i in 0..3u8 {
            assert!(cache.put(key(&i.to_string()), audio(i)).is_none());
        }

        // 读取不影响淘汰顺序
        assert!(cache.get(&key("0")).is_some());

        let evicted = cache.put(key("3"), audio(3));
        assert_eq!(evicted, Some(key("0")));
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&key("0")).is_none());
        assert!(cache.get(&key("1")).is_some());
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut cache = UnitCache::new(10);
        for i in 0..25u8 {
            cache.put(key(&i.to_string()), audio(i));
            assert!(cache.len() <= 10);
        }
        assert_eq!(cache.len(), 10);
        assert!(cache.get(&key("14")).is_none());
        assert!(cache.get(&key("15")).is_some());
    }

    #[test]
    fn test_duplicate_put_keeps_first() {
        let mut cache = UnitCache::new(2);
        cache.put(key("a"), audio(1));
        cache.put(key("a"), audio(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("a")).map(|a| a[0]), Some(1));
    }

    #[tokio::test]
    async fn test_shared_cache_port() {
        let cache: Arc<dyn AudioCachePort> = SharedUnitCache::new(2).arc();
        cache.put(key("x"), audio(9)).await;
        assert_eq!(cache.get(&key("x")).await.map(|a| a[0]), Some(9));
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.capacity(), 2);
    }
}
