// Audio cache module

pub mod store;

pub use store::{normalize_key, CacheStore, DEFAULT_MAX_AGE_DAYS};
