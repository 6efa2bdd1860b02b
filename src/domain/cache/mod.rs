//! Cache domain - store contract, key space and mutation events

mod event;
mod key;
mod repository;

pub use event::{LikedEntity, MutationEvent, MutationKind};
pub use key::{
    base_identity, build_key, kind_index_key, pages_index_key, CacheKey, CacheKind, KeyScope,
    GLOBAL_IDENTITY, KEY_SCHEMA_VERSION,
};
pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
