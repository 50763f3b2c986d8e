use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use beaconstat_shared::RawStatus;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::warn;

use crate::config::{
    DEFAULT_MC_PORT, StatusConfig, UPSTREAM_CONNECT_TIMEOUT, UPSTREAM_HTTP_TIMEOUT,
};
use crate::last_known::LastKnownStore;

/// Cache identity for one status entry: trimmed address plus port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerKey {
    pub address: String,
    pub port: u16,
}

impl ServerKey {
    pub fn new(address: &str, port: u16) -> Self {
        Self {
            address: address.trim().to_owned(),
            port,
        }
    }

    /// `address[:port]` as the upstream API expects it; the default port is
    /// left implicit.
    pub fn full_address(&self) -> String {
        if self.port > 0 && self.port != DEFAULT_MC_PORT {
            format!("{}:{}", self.address, self.port)
        } else {
            self.address.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedStatus {
    pub status: RawStatus,
    /// Write-time expiry; a lookup past this point is a miss.
    pub expires_at: DateTime<Utc>,
}

pub type StatusCache = DashMap<ServerKey, CachedStatus>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StatusConfig>,
    pub status_cache: Arc<StatusCache>,
    pub last_known: Arc<LastKnownStore>,
    pub http_client: reqwest::Client,
    pub observability: Arc<ObservabilityCounters>,
}

impl AppState {
    pub async fn new(config: StatusConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("beaconstat/0.1")
            .timeout(UPSTREAM_HTTP_TIMEOUT)
            .connect_timeout(UPSTREAM_CONNECT_TIMEOUT)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(UPSTREAM_HTTP_TIMEOUT)
                    .connect_timeout(UPSTREAM_CONNECT_TIMEOUT)
                    .build()
            })
            .unwrap_or_else(|e| {
                panic!("failed to build timeout-configured HTTP client: {e}");
            });

        let last_known = LastKnownStore::open(&config.last_known_path).await;

        Self {
            config: Arc::new(config),
            status_cache: Arc::new(DashMap::new()),
            last_known: Arc::new(last_known),
            http_client,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    pub fn server_key(&self) -> ServerKey {
        ServerKey::new(&self.config.server_address, self.config.server_port)
    }
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    status_requests_total: AtomicU64,
    players_requests_total: AtomicU64,
    cache_hits_total: AtomicU64,
    cache_misses_total: AtomicU64,
    upstream_errors_total: AtomicU64,
    repair_fetches_total: AtomicU64,
    probe_failures_total: AtomicU64,
    last_known_writes_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub status_requests_total: u64,
    pub players_requests_total: u64,
    pub cache_hits_total: u64,
    pub cache_misses_total: u64,
    pub upstream_errors_total: u64,
    pub repair_fetches_total: u64,
    pub probe_failures_total: u64,
    pub last_known_writes_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            status_requests_total: self.status_requests_total.load(Ordering::Relaxed),
            players_requests_total: self.players_requests_total.load(Ordering::Relaxed),
            cache_hits_total: self.cache_hits_total.load(Ordering::Relaxed),
            cache_misses_total: self.cache_misses_total.load(Ordering::Relaxed),
            upstream_errors_total: self.upstream_errors_total.load(Ordering::Relaxed),
            repair_fetches_total: self.repair_fetches_total.load(Ordering::Relaxed),
            probe_failures_total: self.probe_failures_total.load(Ordering::Relaxed),
            last_known_writes_total: self.last_known_writes_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_status_request(&self) {
        self.status_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_players_request(&self) {
        self.players_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_repair_fetch(&self) {
        self.repair_fetches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_failure(&self) {
        self.probe_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_last_known_write(&self) {
        self.last_known_writes_total.fetch_add(1, Ordering::Relaxed);
    }
}
