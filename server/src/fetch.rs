use beaconstat_shared::RawStatus;
use tracing::warn;

use crate::cache;
use crate::state::{AppState, ServerKey};

/// Result of the fetch stage: the working status (if any) and whether it was
/// served from cache.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: Option<RawStatus>,
    pub from_cache: bool,
}

impl FetchOutcome {
    fn fresh(status: Option<RawStatus>) -> Self {
        Self {
            status,
            from_cache: false,
        }
    }
}

/// Fetch stage: cache read-through plus the upstream HTTP call.
///
/// Forced fetches bypass the cache on both read and write; the only cache
/// write outside the normal path is the repair stage's explicit overwrite.
/// Any upstream failure (transport, non-2xx, unparseable body) degrades to
/// `None` rather than an error.
pub async fn fetch_status(
    state: &AppState,
    key: &ServerKey,
    cache_seconds: i64,
    ignore_cache: bool,
) -> FetchOutcome {
    if key.address.is_empty() {
        return FetchOutcome::fresh(None);
    }

    let use_cache = cache_seconds > 0 && !ignore_cache;
    if use_cache {
        if let Some(status) = cache::lookup(&state.status_cache, key) {
            state.observability.record_cache_hit();
            return FetchOutcome {
                status: Some(status),
                from_cache: true,
            };
        }
        state.observability.record_cache_miss();
    }

    let status = fetch_from_upstream(state, key).await;
    if use_cache && let Some(status) = &status {
        cache::store(&state.status_cache, key, status.clone(), cache_seconds);
    }

    FetchOutcome::fresh(status)
}

async fn fetch_from_upstream(state: &AppState, key: &ServerKey) -> Option<RawStatus> {
    let Some(url) = status_url(&state.config.api_base_url, key) else {
        state.observability.record_upstream_error();
        warn!(base = %state.config.api_base_url, "status API base URL is unusable");
        return None;
    };

    let resp = match state.http_client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            state.observability.record_upstream_error();
            warn!(
                status = %resp.status(),
                server = %key.full_address(),
                "status API returned an error response"
            );
            return None;
        }
        Err(e) => {
            state.observability.record_upstream_error();
            warn!(error = %e, server = %key.full_address(), "status API request failed");
            return None;
        }
    };

    match resp.json::<RawStatus>().await {
        Ok(status) => Some(status),
        Err(e) => {
            state.observability.record_upstream_error();
            warn!(
                error = %e,
                server = %key.full_address(),
                "status API returned an unparseable body"
            );
            None
        }
    }
}

/// `<base>/3/<address[:port]>`; the segment push percent-encodes the address.
pub fn status_url(base: &str, key: &ServerKey) -> Option<reqwest::Url> {
    let mut url = reqwest::Url::parse(base).ok()?;
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.push("3");
        segments.push(&key.full_address());
    }
    Some(url)
}
