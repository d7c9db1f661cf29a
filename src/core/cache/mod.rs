// Caching layer — fingerprint keys, TTL'd store, adaptive TTL planning.

pub mod fingerprint;
pub mod store;
pub mod ttl;

pub use fingerprint::{KeyScope, fingerprint};
pub use store::CacheStore;
pub use ttl::TtlPlanner;
