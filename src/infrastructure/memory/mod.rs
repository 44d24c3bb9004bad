//! Memory Layer - In-Memory State Management
//!
//! 进程内的单句音频缓存

mod unit_cache;

pub use unit_cache::{SharedUnitCache, UnitCache, DEFAULT_CACHE_CAPACITY};
