//! Audio Cache Port - 单句音频缓存
//!
//! 定义音频缓存的抽象接口，具体实现为进程内的有界缓存

use async_trait::async_trait;

use crate::domain::export::AudioData;
use crate::domain::voice::RateDescriptor;

/// 缓存 key
///
/// 由 (音色, 文本, 语速) 组成，文本部分取 md5
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audio Cache Port
///
/// 播放与批量导出共用；条目写入后不再修改
#[async_trait]
pub trait AudioCachePort: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<AudioData>;

    /// 写入；超出容量时先淘汰最早写入的条目
    async fn put(&self, key: CacheKey, audio: AudioData);

    async fn len(&self) -> usize;

    fn capacity(&self) -> usize;
}

/// 生成缓存 key
///
/// 格式: `{voice}:{md5(text)}:{rate}`
pub fn generate_cache_key(voice: &str, text: &str, rate: &RateDescriptor) -> CacheKey {
    let digest = md5::compute(text.as_bytes());
    CacheKey(format!("{}:{:x}:{}", voice, digest, rate))
}
