//! Persistent backend session cache.

pub mod error;
pub mod session;

pub use error::CacheError;
pub use session::{cache_key, CacheStatus, CachedSession, SessionStore, SESSIONS_FILE};
