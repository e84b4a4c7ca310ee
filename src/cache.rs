// Normalized-row cache: a key-value store behind an explicit service object.
//
// The cache holds exactly two keys: the serialized normalized-row array and a
// schema version string. Any version mismatch discards the cached rows
// wholesale; there is no partial invalidation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{info, warn};

use crate::dataset::normalize::MatchRow;

const KEY_ROWS: &str = "rows";
const KEY_VERSION: &str = "schema_version";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Storage backends
// ---------------------------------------------------------------------------

/// Minimal key-value storage seam so the cache service can be tested without
/// touching a real database file.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn put(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// SQLite-backed key-value store. Pass `":memory:"` for an ephemeral
/// database (useful for tests).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and ensure the table exists.
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("cache mutex poisoned")
    }
}

impl CacheStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM cache WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO cache (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.conn()
            .execute("DELETE FROM cache WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-memory store for tests and cache-disabled runs.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .map
            .lock()
            .expect("memory store mutex poisoned")
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.map
            .lock()
            .expect("memory store mutex poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.map
            .lock()
            .expect("memory store mutex poisoned")
            .remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row cache service
// ---------------------------------------------------------------------------

/// Versioned cache of the normalized row array.
///
/// The schema version is an explicit constructor parameter rather than a
/// module-level constant baked into the lookups, so tests can exercise
/// version rollover without recompiling.
pub struct RowCache {
    store: Arc<dyn CacheStore>,
    version: String,
}

impl RowCache {
    pub fn new(store: Arc<dyn CacheStore>, version: impl Into<String>) -> Self {
        Self {
            store,
            version: version.into(),
        }
    }

    /// Load the cached rows, if present and stored under the current schema
    /// version. A version mismatch or an undecodable payload clears the
    /// cache and reports a miss; storage errors propagate.
    pub fn load(&self) -> Result<Option<Vec<MatchRow>>, CacheError> {
        match self.store.get(KEY_VERSION)? {
            Some(stored) if stored == self.version => {}
            Some(stored) => {
                info!(
                    "cache schema version changed ({} -> {}), discarding cached rows",
                    stored, self.version
                );
                self.invalidate()?;
                return Ok(None);
            }
            None => return Ok(None),
        }

        let Some(payload) = self.store.get(KEY_ROWS)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<MatchRow>>(&payload) {
            Ok(rows) => Ok(Some(rows)),
            Err(e) => {
                warn!("cached rows could not be decoded, discarding cache: {e}");
                self.invalidate()?;
                Ok(None)
            }
        }
    }

    /// Overwrite the cached rows and stamp the current schema version.
    pub fn store_rows(&self, rows: &[MatchRow]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(rows)?;
        self.store.put(KEY_ROWS, &payload)?;
        self.store.put(KEY_VERSION, &self.version)?;
        Ok(())
    }

    /// Drop both cache keys.
    pub fn invalidate(&self) -> Result<(), CacheError> {
        self.store.remove(KEY_ROWS)?;
        self.store.remove(KEY_VERSION)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::normalize::{MatchRow, Role};

    fn sample_row(player: &str) -> MatchRow {
        MatchRow {
            player_name: player.to_string(),
            hero_name: "Valla".to_string(),
            role: Role::RangedAssassin,
            map: "Cursed Hollow".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2025, 3, 14),
            date_iso: "2025-03-14".to_string(),
            winner: true,
            game_time_secs: 1_200,
            hero_kills: 5,
            deaths: 2,
            assists: 10,
            takedowns: 15,
            hero_damage: 45_000,
            siege_damage: 60_000,
            damage_taken: 30_000,
            healing_shielding: 0,
            self_healing: 8_000,
            experience: 20_000,
            spent_dead_secs: 90,
            on_fire_secs: 200,
            award: "AwardMVP".to_string(),
            replay_name: "2025-03-14 20.01.02 Cursed Hollow.StormReplay".to_string(),
            team: "1".to_string(),
            game_mode: "Custom".to_string(),
            player_level: 900,
            hero_level: 25,
        }
    }

    fn memory_cache(version: &str) -> RowCache {
        RowCache::new(Arc::new(MemoryStore::new()), version)
    }

    // ------------------------------------------------------------------
    // SqliteStore
    // ------------------------------------------------------------------

    #[test]
    fn sqlite_store_round_trip() {
        let store = SqliteStore::open(":memory:").expect("in-memory store should open");
        assert!(store.get("k").unwrap().is_none());

        store.put("k", "v1").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));

        store.put("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    // ------------------------------------------------------------------
    // RowCache
    // ------------------------------------------------------------------

    #[test]
    fn empty_cache_is_a_miss() {
        let cache = memory_cache("1");
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn store_then_load_round_trip() {
        let cache = memory_cache("1");
        let rows = vec![sample_row("Indigente"), sample_row("WatchdogMan")];

        cache.store_rows(&rows).unwrap();

        let loaded = cache.load().unwrap().expect("should hit");
        assert_eq!(loaded, rows);
    }

    #[test]
    fn version_mismatch_discards_cache() {
        let store = Arc::new(MemoryStore::new());
        // Seed under version "1" through one cache instance
        let cache_v1 = RowCache::new(store.clone(), "1");
        cache_v1.store_rows(&[sample_row("Indigente")]).unwrap();
        assert!(cache_v1.load().unwrap().is_some());

        // A cache constructed with version "2" over the same store must
        // ignore and clear it.
        let cache_v2 = RowCache::new(store, "2");
        assert!(cache_v2.load().unwrap().is_none());

        // The stale payload is gone for good: even the original version
        // misses now.
        assert!(cache_v1.load().unwrap().is_none());
    }

    #[test]
    fn undecodable_payload_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        store.put(KEY_VERSION, "1").unwrap();
        store.put(KEY_ROWS, "not json at all").unwrap();

        let cache = RowCache::new(store, "1");
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn store_rows_overwrites_previous_payload() {
        let cache = memory_cache("1");
        cache.store_rows(&[sample_row("A")]).unwrap();
        cache
            .store_rows(&[sample_row("B"), sample_row("C")])
            .unwrap();

        let loaded = cache.load().unwrap().expect("should hit");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].player_name, "B");
    }

    #[test]
    fn invalidate_clears_both_keys() {
        let cache = memory_cache("1");
        cache.store_rows(&[sample_row("A")]).unwrap();
        cache.invalidate().unwrap();
        assert!(cache.load().unwrap().is_none());
    }
}
