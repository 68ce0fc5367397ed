// cache/entry.rs - Single cache entry with TTL and access statistics
//
// Entries are value + bookkeeping: creation/expiry timestamps, access
// count and last-access time. Expiry is logical - an entry past its
// expires_at is treated as absent even before it is physically purged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One timestamped, TTL-bound cache value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "CacheEntryWire")]
pub struct CacheEntry {
    /// Unique key within the cache namespace
    pub key: String,
    /// Arbitrary JSON payload
    pub data: Value,
    /// Time-to-live in seconds from creation
    pub ttl: u64,
    /// Creation timestamp (UTC)
    pub created_at: DateTime<Utc>,
    /// Logical expiry timestamp (created_at + ttl)
    pub expires_at: DateTime<Utc>,
    /// Number of successful reads
    pub access_count: u64,
    /// Timestamp of the most recent read (creation time if never read)
    pub last_accessed: DateTime<Utc>,
}

/// Wire form of an entry as stored in the cache index.
///
/// Older indexes omit access statistics; they default to zero reads
/// with last_accessed falling back to created_at.
#[derive(Deserialize)]
struct CacheEntryWire {
    key: String,
    data: Value,
    ttl: u64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    access_count: u64,
    #[serde(default)]
    last_accessed: Option<DateTime<Utc>>,
}

impl From<CacheEntryWire> for CacheEntry {
    fn from(wire: CacheEntryWire) -> Self {
        let last_accessed = wire.last_accessed.unwrap_or(wire.created_at);
        CacheEntry {
            key: wire.key,
            data: wire.data,
            ttl: wire.ttl,
            created_at: wire.created_at,
            expires_at: wire.expires_at,
            access_count: wire.access_count,
            last_accessed,
        }
    }
}

impl CacheEntry {
    /// Create a new entry expiring `ttl` seconds from now
    pub fn new(key: impl Into<String>, data: Value, ttl: u64) -> Self {
        Self::with_created_at(key, data, ttl, Utc::now())
    }

    /// Create an entry with an explicit creation timestamp
    ///
    /// Expiry is computed from the given timestamp, so a backdated
    /// `created_at` produces an already-expired entry. Tests use this to
    /// exercise TTL behavior without sleeping.
    pub fn with_created_at(
        key: impl Into<String>,
        data: Value,
        ttl: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = created_at + Duration::seconds(ttl as i64);
        Self {
            key: key.into(),
            data,
            ttl,
            created_at,
            expires_at,
            access_count: 0,
            last_accessed: created_at,
        }
    }

    /// Check whether the entry is past its expiry timestamp
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Reset the expiry window from now
    ///
    /// # Arguments
    /// * `new_ttl` - Replacement TTL in seconds; `None` keeps the stored TTL
    pub fn refresh(&mut self, new_ttl: Option<u64>) {
        if let Some(ttl) = new_ttl {
            self.ttl = ttl;
        }
        self.expires_at = Utc::now() + Duration::seconds(self.ttl as i64);
    }

    /// Read the value, updating access statistics
    pub fn access(&mut self) -> Value {
        self.access_count += 1;
        self.last_accessed = Utc::now();
        self.data.clone()
    }
}
