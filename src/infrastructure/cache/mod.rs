//! Cache infrastructure - stores, key index, read-through accessor and invalidation

mod factory;
mod in_memory;
mod index;
mod invalidation;
mod read_through;
mod redis;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use index::{KeyIndex, PurgeFailure, PurgeOutcome};
pub use invalidation::{InvalidationEngine, InvalidationPlan, InvalidationReport, InvalidationTarget};
pub use read_through::ReadThroughCache;
pub use redis::{RedisCache, RedisCacheConfig};
