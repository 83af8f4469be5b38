//! Keyed query cache with staleness, observers, and optimistic writes.
//!
//! The cache stores every fetched portal payload as [`serde_json::Value`]
//! under a hierarchical [`QueryKey`]. Reads go through [`QueryCache::read`],
//! which deduplicates concurrent fetches per key and serves fresh data
//! without touching the network. Writes go through [`Mutation`] and
//! [`OptimisticMutation`], which reconcile the cache by prefix
//! invalidation when they settle.

mod cache;
mod entry;
mod key;
mod mutation;

pub use cache::{QueryCache, QueryObserver};
pub use entry::{CacheDefaults, Fetcher, QueryOptions, QuerySnapshot, QueryStatus};
pub use key::{QueryKey, QueryKeys, QuerySegment};
pub use mutation::{Mutation, OptimisticMutation};
