use beaconstat_shared::RawStatus;
use chrono::{TimeDelta, Utc};

use crate::config::CACHE_TTL_FLOOR_SECS;
use crate::state::{CachedStatus, ServerKey, StatusCache};

/// Effective TTL for a cache write, never below the floor.
pub fn effective_ttl_secs(cache_seconds: i64) -> i64 {
    cache_seconds.max(CACHE_TTL_FLOOR_SECS)
}

/// Absent or expired entries are a miss; expired entries are dropped on the
/// way out.
pub fn lookup(cache: &StatusCache, key: &ServerKey) -> Option<RawStatus> {
    let expired = match cache.get(key) {
        Some(entry) if Utc::now() < entry.expires_at => return Some(entry.status.clone()),
        Some(_) => true,
        None => false,
    };
    if expired {
        cache.remove(key);
    }
    None
}

/// Store a fresh fetch. `cache_seconds <= 0` disables caching entirely.
pub fn store(cache: &StatusCache, key: &ServerKey, status: RawStatus, cache_seconds: i64) {
    if cache_seconds <= 0 {
        return;
    }
    let expires_at = Utc::now() + TimeDelta::seconds(effective_ttl_secs(cache_seconds));
    cache.insert(key.clone(), CachedStatus { status, expires_at });
}
