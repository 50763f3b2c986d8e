use std::fmt::Write as _;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::resolver;
use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(serde::Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub refresh: String,
}

/// `?refresh=` uses loose truthiness: absent, empty, and `0` mean no,
/// anything else means yes.
fn refresh_requested(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed != "0"
}

pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> impl IntoResponse {
    let view = resolver::resolve_status(&state, refresh_requested(&query.refresh)).await;
    no_store_json(view)
}

pub async fn get_players(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> impl IntoResponse {
    let view = resolver::resolve_players(&state, refresh_requested(&query.refresh)).await;
    no_store_json(view)
}

/// Status responses are already cached server-side; intermediaries must not
/// add a second layer.
fn no_store_json<T: Serialize>(body: T) -> impl IntoResponse {
    ([(header::CACHE_CONTROL, "no-store")], Json(body))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "configured": !state.config.server_address.trim().is_empty(),
        "cache_entries": state.status_cache.len(),
        "observability": {
            "status_requests_total": observability.status_requests_total,
            "players_requests_total": observability.players_requests_total,
            "cache_hits_total": observability.cache_hits_total,
            "cache_misses_total": observability.cache_misses_total,
            "upstream_errors_total": observability.upstream_errors_total,
            "repair_fetches_total": observability.repair_fetches_total,
            "probe_failures_total": observability.probe_failures_total,
            "last_known_writes_total": observability.last_known_writes_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let configured = !state.config.server_address.trim().is_empty();
    let cache_entries = state.status_cache.len();
    let observability = state.observability.snapshot();

    let body = render_prometheus_metrics(configured, cache_entries, observability);

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    configured: bool,
    cache_entries: usize,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP beaconstat_configured Whether a server address is configured (1 or 0)."
    );
    let _ = writeln!(body, "# TYPE beaconstat_configured gauge");
    let _ = writeln!(body, "beaconstat_configured {}", u8::from(configured));

    let _ = writeln!(
        body,
        "# HELP beaconstat_cache_entries Current number of cached status entries."
    );
    let _ = writeln!(body, "# TYPE beaconstat_cache_entries gauge");
    let _ = writeln!(body, "beaconstat_cache_entries {cache_entries}");

    let _ = writeln!(
        body,
        "# HELP beaconstat_status_requests_total Total status card requests."
    );
    let _ = writeln!(body, "# TYPE beaconstat_status_requests_total counter");
    let _ = writeln!(
        body,
        "beaconstat_status_requests_total {}",
        observability.status_requests_total
    );

    let _ = writeln!(
        body,
        "# HELP beaconstat_players_requests_total Total player-list requests."
    );
    let _ = writeln!(body, "# TYPE beaconstat_players_requests_total counter");
    let _ = writeln!(
        body,
        "beaconstat_players_requests_total {}",
        observability.players_requests_total
    );

    let _ = writeln!(
        body,
        "# HELP beaconstat_cache_hits_total Total status lookups served from cache."
    );
    let _ = writeln!(body, "# TYPE beaconstat_cache_hits_total counter");
    let _ = writeln!(
        body,
        "beaconstat_cache_hits_total {}",
        observability.cache_hits_total
    );

    let _ = writeln!(
        body,
        "# HELP beaconstat_cache_misses_total Total status lookups that went upstream."
    );
    let _ = writeln!(body, "# TYPE beaconstat_cache_misses_total counter");
    let _ = writeln!(
        body,
        "beaconstat_cache_misses_total {}",
        observability.cache_misses_total
    );

    let _ = writeln!(
        body,
        "# HELP beaconstat_upstream_errors_total Total failed upstream status fetches."
    );
    let _ = writeln!(body, "# TYPE beaconstat_upstream_errors_total counter");
    let _ = writeln!(
        body,
        "beaconstat_upstream_errors_total {}",
        observability.upstream_errors_total
    );

    let _ = writeln!(
        body,
        "# HELP beaconstat_repair_fetches_total Total forced refetches for cached icon-less entries."
    );
    let _ = writeln!(body, "# TYPE beaconstat_repair_fetches_total counter");
    let _ = writeln!(
        body,
        "beaconstat_repair_fetches_total {}",
        observability.repair_fetches_total
    );

    let _ = writeln!(
        body,
        "# HELP beaconstat_probe_failures_total Total TCP liveness probes that failed."
    );
    let _ = writeln!(body, "# TYPE beaconstat_probe_failures_total counter");
    let _ = writeln!(
        body,
        "beaconstat_probe_failures_total {}",
        observability.probe_failures_total
    );

    let _ = writeln!(
        body,
        "# HELP beaconstat_last_known_writes_total Total last-known-good snapshot writes."
    );
    let _ = writeln!(body, "# TYPE beaconstat_last_known_writes_total counter");
    let _ = writeln!(
        body,
        "beaconstat_last_known_writes_total {}",
        observability.last_known_writes_total
    );

    body
}
