//! TTL-based, repository-keyed store of backend session handles.
//!
//! The store maps a hash of the repository root path to the backend session
//! created for that repository. Entries expire lazily: a read ignores an
//! entry older than the TTL but leaves it in place until it is overwritten
//! or the whole store is cleared.
//!
//! # Persistence
//!
//! The full mapping is rewritten to `sessions.json` inside the cache
//! directory after every mutation, while the write lock is still held.
//! Persistence is best effort: if the write fails the in-memory mutation is
//! kept and the error is returned, so memory and disk disagree until the
//! next successful write. Separate processes sharing a cache directory race
//! with last-writer-wins semantics.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::cache::error::CacheError;
use crate::git::source::RepositoryIdentity;

/// Name of the cache file inside the cache directory.
pub const SESSIONS_FILE: &str = "sessions.json";

/// Number of digest bytes kept for a cache key (128 bits).
const CACHE_KEY_BYTES: usize = 16;

/// One cached backend session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    /// Opaque backend session handle.
    pub session_id: String,
    /// Repository root the key was derived from; diagnostic only.
    pub repo_path: String,
    /// Insertion time; drives expiration.
    pub created_at: DateTime<Utc>,
    /// Last time the session was used; informational.
    pub last_used_at: DateTime<Utc>,
}

impl CachedSession {
    /// Returns true if the entry is older than `ttl` at `now`.
    pub fn is_expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        now - self.created_at > ttl
    }
}

/// Entry counts reported by [`SessionStore::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
    /// Number of stored entries, expired or not.
    pub total: usize,
    /// Number of entries still within the TTL.
    pub valid: usize,
}

/// Derives the cache key for an absolute repository path.
///
/// The key is the first 128 bits of the path's SHA-256 digest as lowercase
/// hex, so it is stable across processes and restarts.
pub fn cache_key(repo_path: &str) -> String {
    let digest = Sha256::digest(repo_path.as_bytes());
    digest[..CACHE_KEY_BYTES]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Thread-safe, file-backed session cache.
///
/// Reads (`get`, `status`) share a read lock; mutations (`set`, `touch`,
/// `clear`) hold the write lock for the update and the file rewrite.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, CachedSession>>,
    ttl: TimeDelta,
    cache_dir: PathBuf,
    identity: Arc<dyn RepositoryIdentity>,
}

impl SessionStore {
    /// Opens the store in `cache_dir`, loading any existing cache file.
    ///
    /// # Errors
    ///
    /// Fails if `ttl` is zero or out of range, if an existing cache file
    /// cannot be read, or if it does not contain a valid session mapping. A
    /// missing file yields an empty store.
    pub fn open<P: Into<PathBuf>>(
        cache_dir: P,
        ttl: Duration,
        identity: Arc<dyn RepositoryIdentity>,
    ) -> Result<Self, CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl(ttl));
        }
        let ttl_delta = TimeDelta::from_std(ttl).map_err(|_| CacheError::InvalidTtl(ttl))?;

        let cache_dir = cache_dir.into();
        let sessions = load(&cache_dir.join(SESSIONS_FILE))?;
        debug!(
            cache_dir = %cache_dir.display(),
            entries = sessions.len(),
            ttl_secs = ttl.as_secs_f64(),
            "Opened session cache"
        );

        Ok(Self {
            sessions: RwLock::new(sessions),
            ttl: ttl_delta,
            cache_dir,
            identity,
        })
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        // Constructed from a std Duration, so the conversion cannot fail.
        self.ttl.to_std().unwrap_or_default()
    }

    /// Returns the directory holding the cache file.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path of the cache file.
    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(SESSIONS_FILE)
    }

    /// Looks up the live session for the current repository.
    ///
    /// Returns `Ok(None)` when there is no entry or the entry has outlived
    /// the TTL.
    ///
    /// # Errors
    ///
    /// Fails only if the repository identity cannot be resolved.
    pub fn get(&self) -> Result<Option<CachedSession>, CacheError> {
        let sessions = self.read()?;
        let key = self.current_key()?.0;

        let Some(session) = sessions.get(&key) else {
            debug!(key = %key, "Session cache miss");
            return Ok(None);
        };

        if session.is_expired(self.ttl, Utc::now()) {
            debug!(key = %key, session_id = %session.session_id, "Cached session expired");
            return Ok(None);
        }

        debug!(key = %key, session_id = %session.session_id, "Session cache hit");
        Ok(Some(session.clone()))
    }

    /// Stores `session_id` for the current repository and persists.
    ///
    /// Overwrites any previous entry, resetting its creation time.
    ///
    /// # Errors
    ///
    /// Fails if the repository identity cannot be resolved or the cache
    /// file cannot be written. The entry stays in memory on a write failure.
    pub fn set(&self, session_id: &str) -> Result<(), CacheError> {
        let mut sessions = self.write()?;
        let (key, repo_path) = self.current_key()?;
        let now = Utc::now();

        sessions.insert(
            key.clone(),
            CachedSession {
                session_id: session_id.to_string(),
                repo_path,
                created_at: now,
                last_used_at: now,
            },
        );
        info!(key = %key, session_id = %session_id, "Cached backend session");

        self.persist(&sessions)
    }

    /// Marks the entry holding `session_id` as used now and persists.
    ///
    /// Entries are matched by session ID rather than by repository key, so a
    /// session shared by several repositories is found from any of them.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::SessionNotFound`] without touching the store if
    /// no entry has this ID, or a write error if persisting fails.
    pub fn touch(&self, session_id: &str) -> Result<(), CacheError> {
        let mut sessions = self.write()?;

        let session = sessions
            .values_mut()
            .find(|session| session.session_id == session_id)
            .ok_or_else(|| CacheError::SessionNotFound(session_id.to_string()))?;
        session.last_used_at = Utc::now();
        debug!(session_id = %session_id, "Updated session last-used time");

        self.persist(&sessions)
    }

    /// Removes every entry and persists the empty store.
    ///
    /// # Errors
    ///
    /// Fails only if the cache file cannot be written.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut sessions = self.write()?;
        let removed = sessions.len();
        sessions.clear();
        info!(removed, "Cleared session cache");

        self.persist(&sessions)
    }

    /// Counts all entries and those still within the TTL.
    ///
    /// Expired entries are counted in `total` but never purged here.
    pub fn status(&self) -> Result<CacheStatus, CacheError> {
        let sessions = self.read()?;
        let now = Utc::now();
        let valid = sessions
            .values()
            .filter(|session| !session.is_expired(self.ttl, now))
            .count();

        Ok(CacheStatus {
            total: sessions.len(),
            valid,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, CachedSession>>, CacheError> {
        self.sessions.read().map_err(|_| CacheError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, CachedSession>>, CacheError> {
        self.sessions.write().map_err(|_| CacheError::LockPoisoned)
    }

    /// Resolves the current repository and returns `(key, repo_path)`.
    fn current_key(&self) -> Result<(String, String), CacheError> {
        let repo_path = self
            .identity
            .absolute_path()
            .map_err(|e| CacheError::Identity(e.into()))?;
        Ok((cache_key(&repo_path), repo_path))
    }

    /// Rewrites the cache file with the full mapping.
    fn persist(&self, sessions: &HashMap<String, CachedSession>) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::CreateDir {
            path: self.cache_dir.clone(),
            source,
        })?;

        let path = self.cache_file();
        let data = serde_json::to_string_pretty(sessions)?;
        fs::write(&path, data).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), entries = sessions.len(), "Persisted session cache");
        Ok(())
    }
}

/// Reads the mapping from `path`; a missing file is an empty mapping.
fn load(path: &Path) -> Result<HashMap<String, CachedSession>, CacheError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(source) => {
            return Err(CacheError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&data).map_err(|source| CacheError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_utils::FixedIdentity;
    use std::thread;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn open_store(dir: &Path, ttl: Duration, identity: &FixedIdentity) -> SessionStore {
        SessionStore::open(dir, ttl, Arc::new(identity.clone())).unwrap()
    }

    // ── cache_key ──────────────────────────────────────────────

    #[test]
    fn cache_key_is_deterministic() {
        assert_eq!(
            cache_key("/home/user/project"),
            cache_key("/home/user/project")
        );
    }

    #[test]
    fn cache_key_differs_for_different_paths() {
        assert_ne!(cache_key("/home/user/project"), cache_key("/home/user/other"));
        assert_ne!(cache_key("/home/user/project"), cache_key("/home/user/project/"));
    }

    #[test]
    fn cache_key_is_128_bit_lowercase_hex() {
        let key = cache_key("/home/user/project");
        assert_eq!(key.len(), 32);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    // ── construction ───────────────────────────────────────────

    #[test]
    fn open_missing_file_yields_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(
            &temp_dir.path().join("not-yet-created"),
            DAY,
            &FixedIdentity::new("/repo"),
        );

        assert_eq!(store.status().unwrap(), CacheStatus { total: 0, valid: 0 });
    }

    #[test]
    fn open_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(SESSIONS_FILE), "{ not json").unwrap();

        let result = SessionStore::open(
            temp_dir.path(),
            DAY,
            Arc::new(FixedIdentity::new("/repo")),
        );
        assert!(matches!(result, Err(CacheError::Malformed { .. })));
    }

    #[test]
    fn open_rejects_zero_ttl() {
        let temp_dir = TempDir::new().unwrap();
        let result = SessionStore::open(
            temp_dir.path(),
            Duration::ZERO,
            Arc::new(FixedIdentity::new("/repo")),
        );
        assert!(matches!(result, Err(CacheError::InvalidTtl(_))));
    }

    // ── get / set ──────────────────────────────────────────────

    #[test]
    fn set_then_get_returns_session() {
        let temp_dir = TempDir::new().unwrap();
        let identity = FixedIdentity::new("/home/user/project");
        let store = open_store(temp_dir.path(), DAY, &identity);

        store.set("abc").unwrap();
        let session = store.get().unwrap().expect("cached session");

        assert_eq!(session.session_id, "abc");
        assert_eq!(session.repo_path, "/home/user/project");
        assert_eq!(session.created_at, session.last_used_at);
        assert!(store.cache_file().exists());
    }

    #[test]
    fn get_on_empty_store_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(temp_dir.path(), DAY, &FixedIdentity::new("/repo"));
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn sessions_are_keyed_per_repository() {
        let temp_dir = TempDir::new().unwrap();
        let identity = FixedIdentity::new("/work/alpha");
        let store = open_store(temp_dir.path(), DAY, &identity);

        store.set("ses_alpha").unwrap();
        identity.switch_to("/work/beta");
        assert!(store.get().unwrap().is_none());

        store.set("ses_beta").unwrap();
        assert_eq!(store.get().unwrap().unwrap().session_id, "ses_beta");

        identity.switch_to("/work/alpha");
        assert_eq!(store.get().unwrap().unwrap().session_id, "ses_alpha");
        assert_eq!(store.status().unwrap().total, 2);
    }

    #[test]
    fn set_overwrites_existing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(temp_dir.path(), DAY, &FixedIdentity::new("/repo"));

        store.set("first").unwrap();
        store.set("second").unwrap();

        assert_eq!(store.get().unwrap().unwrap().session_id, "second");
        assert_eq!(store.status().unwrap().total, 1);
    }

    #[test]
    fn identity_failure_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(temp_dir.path(), DAY, &FixedIdentity::unresolvable());

        assert!(matches!(store.get(), Err(CacheError::Identity(_))));
        assert!(matches!(store.set("abc"), Err(CacheError::Identity(_))));
        assert_eq!(store.status().unwrap().total, 0);
    }

    #[test]
    fn expired_session_is_absent_but_still_counted() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(
            temp_dir.path(),
            Duration::from_millis(100),
            &FixedIdentity::new("/repo"),
        );

        store.set("s1").unwrap();
        assert_eq!(store.get().unwrap().unwrap().session_id, "s1");

        thread::sleep(Duration::from_millis(150));

        assert!(store.get().unwrap().is_none());
        assert_eq!(store.status().unwrap(), CacheStatus { total: 1, valid: 0 });

        let on_disk = fs::read_to_string(store.cache_file()).unwrap();
        assert!(on_disk.contains("\"s1\""));
    }

    #[test]
    fn set_after_expiry_revives_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(
            temp_dir.path(),
            Duration::from_millis(50),
            &FixedIdentity::new("/repo"),
        );

        store.set("old").unwrap();
        thread::sleep(Duration::from_millis(80));
        assert!(store.get().unwrap().is_none());

        store.set("new").unwrap();
        assert_eq!(store.get().unwrap().unwrap().session_id, "new");
        assert_eq!(store.status().unwrap(), CacheStatus { total: 1, valid: 1 });
    }

    // ── touch ──────────────────────────────────────────────────

    #[test]
    fn touch_updates_last_used_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(temp_dir.path(), DAY, &FixedIdentity::new("/repo"));

        store.set("abc").unwrap();
        let before = store.get().unwrap().unwrap();
        thread::sleep(Duration::from_millis(10));
        store.touch("abc").unwrap();
        let after = store.get().unwrap().unwrap();

        assert_eq!(after.created_at, before.created_at);
        assert!(after.last_used_at > before.last_used_at);
    }

    #[test]
    fn touch_finds_session_from_another_repository() {
        let temp_dir = TempDir::new().unwrap();
        let identity = FixedIdentity::new("/work/alpha");
        let store = open_store(temp_dir.path(), DAY, &identity);

        store.set("shared").unwrap();
        identity.switch_to("/work/beta");

        assert!(store.touch("shared").is_ok());
    }

    #[test]
    fn touch_unknown_session_is_not_found_and_leaves_store_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(temp_dir.path(), DAY, &FixedIdentity::new("/repo"));
        store.set("abc").unwrap();
        let file_before = fs::read_to_string(store.cache_file()).unwrap();
        let entry_before = store.get().unwrap();

        let err = store.touch("missing").unwrap_err();

        assert!(err.is_not_found());
        assert!(matches!(err, CacheError::SessionNotFound(ref id) if id == "missing"));
        assert_eq!(store.get().unwrap(), entry_before);
        assert_eq!(fs::read_to_string(store.cache_file()).unwrap(), file_before);
    }

    // ── clear / status ─────────────────────────────────────────

    #[test]
    fn clear_empties_store_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let identity = FixedIdentity::new("/work/alpha");
        let store = open_store(temp_dir.path(), DAY, &identity);
        store.set("a").unwrap();
        identity.switch_to("/work/beta");
        store.set("b").unwrap();

        store.clear().unwrap();

        assert_eq!(store.status().unwrap(), CacheStatus { total: 0, valid: 0 });
        let reopened = open_store(temp_dir.path(), DAY, &identity);
        assert_eq!(reopened.status().unwrap().total, 0);
    }

    #[test]
    fn clear_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("deeply").join("nested").join("cache");
        let store = open_store(&nested, DAY, &FixedIdentity::new("/repo"));

        store.clear().unwrap();
        assert!(nested.join(SESSIONS_FILE).exists());
    }

    // ── persistence ────────────────────────────────────────────

    #[test]
    fn reopened_store_reproduces_mapping() {
        let temp_dir = TempDir::new().unwrap();
        let identity = FixedIdentity::new("/work/alpha");
        let store = open_store(temp_dir.path(), DAY, &identity);
        store.set("ses_alpha").unwrap();
        identity.switch_to("/work/beta");
        store.set("ses_beta").unwrap();
        store.touch("ses_alpha").unwrap();

        let original = store.sessions.read().unwrap().clone();
        let reopened = open_store(temp_dir.path(), DAY, &identity);
        let reloaded = reopened.sessions.read().unwrap().clone();

        assert_eq!(reloaded, original);
        assert!(reloaded.contains_key(&cache_key("/work/alpha")));
    }

    #[test]
    fn persisted_file_uses_snake_case_fields() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(temp_dir.path(), DAY, &FixedIdentity::new("/repo"));
        store.set("abc").unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.cache_file()).unwrap()).unwrap();
        let entry = &json[cache_key("/repo")];
        assert_eq!(entry["session_id"], "abc");
        assert_eq!(entry["repo_path"], "/repo");
        assert!(entry["created_at"].is_string());
        assert!(entry["last_used_at"].is_string());
    }

    #[test]
    fn write_failure_keeps_in_memory_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache_dir = temp_dir.path().join("cache");
        let store = open_store(&cache_dir, DAY, &FixedIdentity::new("/repo"));
        // A regular file where the cache directory should be makes create_dir_all fail.
        fs::write(&cache_dir, "").unwrap();

        let err = store.set("abc").unwrap_err();

        assert!(matches!(err, CacheError::CreateDir { .. }));
        assert_eq!(store.get().unwrap().unwrap().session_id, "abc");
    }

    // ── concurrency ────────────────────────────────────────────

    #[test]
    fn concurrent_readers_and_writers() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(
            temp_dir.path(),
            DAY,
            &FixedIdentity::new("/repo"),
        ));
        store.set("ses_0").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..20 {
                        if i % 2 == 0 {
                            store.set(&format!("ses_{i}")).unwrap();
                            store.touch(&format!("ses_{i}")).ok();
                        } else {
                            assert!(store.get().unwrap().is_some());
                            assert_eq!(store.status().unwrap().total, 1);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = open_store(temp_dir.path(), DAY, &FixedIdentity::new("/repo"));
        assert_eq!(reopened.status().unwrap(), CacheStatus { total: 1, valid: 1 });
    }
}
