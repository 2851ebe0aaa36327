//! Time-to-live cache holding one value per logical result set.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::domain::{Recall, Source};
use crate::stats::Stats;

pub const CACHE_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKey {
    FdaRecalls,
    CpscRecalls,
    Stats,
}

impl CacheKey {
    pub const ALL: [CacheKey; 3] = [CacheKey::FdaRecalls, CacheKey::CpscRecalls, CacheKey::Stats];

    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Fda => CacheKey::FdaRecalls,
            Source::Cpsc => CacheKey::CpscRecalls,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::FdaRecalls => "fda_recalls",
            CacheKey::CpscRecalls => "cpsc_recalls",
            CacheKey::Stats => "stats",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Recalls(Arc<Vec<Recall>>),
    Stats(Arc<Stats>),
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    stored_at: DateTime<Utc>,
}

pub struct FreshnessCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FreshnessCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ttl: TimeDelta::seconds(CACHE_TTL_SECS),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Returns the stored value while it is younger than the TTL. Stale
    /// entries stay in place until the next `put` overwrites them.
    pub fn get(&self, key: CacheKey) -> Option<CachedValue> {
        let now = self.clock.now();
        self.lock()
            .get(&key)
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub fn put(&self, key: CacheKey, value: CachedValue) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.lock().insert(key, entry);
    }

    pub fn invalidate_all(&self) {
        self.lock().clear();
    }

    pub fn is_valid(&self, key: CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Whether an entry exists for `key`, fresh or not.
    pub fn contains(&self, key: CacheKey) -> bool {
        self.lock().contains_key(&key)
    }

    pub fn get_recalls(&self, source: Source) -> Option<Arc<Vec<Recall>>> {
        match self.get(CacheKey::for_source(source)) {
            Some(CachedValue::Recalls(recalls)) => Some(recalls),
            _ => None,
        }
    }

    pub fn put_recalls(&self, source: Source, recalls: Arc<Vec<Recall>>) {
        self.put(CacheKey::for_source(source), CachedValue::Recalls(recalls));
    }

    pub fn get_stats(&self) -> Option<Arc<Stats>> {
        match self.get(CacheKey::Stats) {
            Some(CachedValue::Stats(stats)) => Some(stats),
            _ => None,
        }
    }

    pub fn put_stats(&self, stats: Arc<Stats>) {
        self.put(CacheKey::Stats, CachedValue::Stats(stats));
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
