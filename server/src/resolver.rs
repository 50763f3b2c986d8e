use beaconstat_shared::{
    PercentBucket, PlayerCard, PlayersView, RawMotd, RawStatus, StatusCard, StatusView,
    normalize_player_list,
};

use crate::cache;
use crate::config::{AVATAR_BASE_URL, PlayerCountMode, StatusConfig};
use crate::fetch::{self, FetchOutcome};
use crate::last_known::{LastKnownFields, LastKnownUpdate};
use crate::probe;
use crate::state::{AppState, ServerKey};

/// Working fields after the online/offline branch, before liveness
/// confirmation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedStatus {
    pub online: bool,
    pub players_online: u32,
    pub players_max: u32,
    pub player_list: Vec<String>,
    pub version: String,
    pub motd_clean: String,
    pub motd_html: String,
    pub icon: String,
}

/// Full resolve pass for the status card.
///
/// Stages: cache/network fetch, one optional icon-repair refetch, field
/// extraction with last-known-good fallback, TCP liveness confirmation with
/// downgrade, derived-field computation.
pub async fn resolve_status(state: &AppState, force_refresh: bool) -> StatusView {
    let cfg = state.config.as_ref();
    if cfg.server_address.trim().is_empty() {
        return StatusView::NotConfigured;
    }

    state.observability.record_status_request();
    let key = state.server_key();

    let mut outcome = fetch::fetch_status(state, &key, cfg.cache_seconds, force_refresh).await;

    // Repair pass: a cached entry claiming online without an icon was written
    // from an incomplete upstream response. One forced refetch backfills it
    // and overwrites the cache; anything less useful is discarded.
    if outcome.from_cache
        && let Some(status) = &outcome.status
        && status.is_online()
        && !status.has_icon()
    {
        state.observability.record_repair_fetch();
        let fresh = fetch::fetch_status(state, &key, cfg.cache_seconds, true).await;
        if let Some(fresh_status) = fresh.status
            && fresh_status.is_online()
            && fresh_status.has_icon()
        {
            cache::store(
                &state.status_cache,
                &key,
                fresh_status.clone(),
                cfg.cache_seconds,
            );
            outcome = FetchOutcome {
                status: Some(fresh_status),
                from_cache: false,
            };
        }
    }

    let last_known = state.last_known.read().await;
    let (mut fields, update) = extract_status(outcome.status.as_ref(), &last_known, cfg);

    if fields.online
        && !update.is_empty()
        && state.last_known.write_if_changed(&update).await
    {
        state.observability.record_last_known_write();
    }

    // The API's word alone is not trusted: confirm with a TCP probe and
    // downgrade to offline when the port is unreachable.
    let mut ping_ms = None;
    if fields.online {
        match probe::measure_ping_ms(&cfg.server_address, cfg.server_port).await {
            Some(ms) => ping_ms = Some(ms),
            None => {
                state.observability.record_probe_failure();
                fields.online = false;
                fields.players_online = 0;
                fields.players_max = 0;
                fields.player_list.clear();
            }
        }
    }

    let (visible_players, extra_count) =
        truncate_player_list(&fields.player_list, cfg.player_list_limit);
    let percent = percent_full(fields.online, fields.players_online, fields.players_max);

    let title = if cfg.custom_name.is_empty() {
        cfg.server_address.clone()
    } else {
        cfg.custom_name.clone()
    };

    StatusView::Ready(StatusCard {
        initial: title_initial(&title),
        title,
        address_line: cfg.show_ip.then(|| display_address(cfg)),
        online: fields.online,
        ping_ms,
        players_label: players_label(
            cfg.player_count_mode,
            fields.players_online,
            fields.players_max,
            percent,
        ),
        players_online: fields.players_online,
        players_max: fields.players_max,
        visible_players,
        extra_count,
        percent_full: percent,
        percent_bucket: percent_bucket(percent),
        version: fields.version,
        motd_clean: fields.motd_clean,
        motd_html: fields.motd_html,
        icon: fields.icon,
        banner_url: banner_url(cfg, &key),
        player_columns: clamp_columns(cfg.player_columns),
        dark_mode: cfg.dark_mode,
    })
}

/// Resolve pass for the player-list view. Shares the status cache with the
/// card path (same key, its own TTL on write) but skips the repair stage and
/// the last-known-good machinery, and never truncates.
pub async fn resolve_players(state: &AppState, force_refresh: bool) -> PlayersView {
    let cfg = state.config.as_ref();
    if cfg.server_address.trim().is_empty() {
        return PlayersView::NotConfigured;
    }

    state.observability.record_players_request();
    let key = state.server_key();

    let outcome = fetch::fetch_status(state, &key, cfg.players_cache_seconds, force_refresh).await;
    let ping = probe::measure_ping_ms(&cfg.server_address, cfg.server_port).await;
    if ping.is_none() {
        state.observability.record_probe_failure();
    }

    let online = outcome.status.as_ref().is_some_and(RawStatus::is_online);
    if !online || ping.is_none() {
        return PlayersView::Offline;
    }

    let list = outcome
        .status
        .as_ref()
        .and_then(|status| status.players.as_ref())
        .map(|players| normalize_player_list(&players.list))
        .unwrap_or_default();

    if list.is_empty() {
        return PlayersView::Empty;
    }

    PlayersView::Online {
        count: list.len(),
        players: list
            .into_iter()
            .map(|name| PlayerCard {
                avatar_url: avatar_url(&name),
                name,
            })
            .collect(),
        player_columns: clamp_columns(cfg.player_columns),
        dark_mode: cfg.dark_mode,
    }
}

/// Field extraction plus the online/offline branch: pull fields out of the
/// raw status, fall back to last-known values when the server reports
/// offline, and collect the last-known overwrites earned by an online
/// response.
pub fn extract_status(
    status: Option<&RawStatus>,
    last_known: &LastKnownFields,
    cfg: &StatusConfig,
) -> (ExtractedStatus, LastKnownUpdate) {
    let mut out = ExtractedStatus::default();
    let mut update = LastKnownUpdate::default();

    let Some(status) = status else {
        return (out, update);
    };
    let Some(online) = status.online else {
        return (out, update);
    };
    out.online = online;

    if online {
        if let Some(version) = status.version.as_deref().filter(|v| !v.is_empty()) {
            out.version = version.to_owned();
            update.version = Some(out.version.clone());
        }

        if let Some(players) = &status.players {
            out.players_online = players.online.clamp(0, i64::from(u32::MAX)) as u32;
            out.players_max = players.max.clamp(0, i64::from(u32::MAX)) as u32;
            if cfg.show_player_list && !players.list.is_empty() {
                out.player_list = normalize_player_list(&players.list);
            }
        }

        if cfg.show_motd {
            let (clean, html) = select_motd(status.motd.as_ref());
            if !clean.is_empty() || !html.is_empty() {
                out.motd_clean = clean;
                out.motd_html = html;
                // Last write wins: storing one variant clears the other.
                update.motd_clean = Some(out.motd_clean.clone());
                update.motd_html = Some(out.motd_html.clone());
            }
        }

        if let Some(icon) = status.icon.as_deref().filter(|i| !i.is_empty()) {
            out.icon = icon.to_owned();
            update.icon = Some(out.icon.clone());
        }
    } else {
        // Stale display beats a blank card.
        out.version = last_known.version.clone();
        if cfg.show_motd {
            out.motd_clean = last_known.motd_clean.clone();
            out.motd_html = last_known.motd_html.clone();
        }
        out.icon = last_known.icon.clone();
    }

    (out, update)
}

/// MOTD variant chosen from the response: html wins over clean over raw.
/// Returns `(clean, html)`; at most one side is non-empty.
pub fn select_motd(motd: Option<&RawMotd>) -> (String, String) {
    let Some(motd) = motd else {
        return (String::new(), String::new());
    };

    if !motd.html.is_empty() {
        (String::new(), motd.html.join("<br>"))
    } else if !motd.clean.is_empty() {
        (motd.clean.join(" "), String::new())
    } else if !motd.raw.is_empty() {
        (motd.raw.join(" "), String::new())
    } else {
        (String::new(), String::new())
    }
}

/// Occupancy percent, clamped to 0..=100. Only a confirmed-online server with
/// a positive capacity has one.
pub fn percent_full(online: bool, players_online: u32, players_max: u32) -> Option<u8> {
    if !online || players_max == 0 {
        return None;
    }
    let pct = (f64::from(players_online) / f64::from(players_max) * 100.0).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}

pub fn percent_bucket(percent: Option<u8>) -> PercentBucket {
    match percent {
        Some(p) if p <= 50 => PercentBucket::Low,
        Some(p) if p <= 85 => PercentBucket::Medium,
        Some(_) => PercentBucket::High,
        None => PercentBucket::None,
    }
}

/// First `limit` names (floor of one) plus how many were cut.
pub fn truncate_player_list(list: &[String], configured_limit: usize) -> (Vec<String>, usize) {
    let limit = configured_limit.max(1);
    let visible: Vec<String> = list.iter().take(limit).cloned().collect();
    let extra = list.len().saturating_sub(visible.len());
    (visible, extra)
}

pub fn clamp_columns(cols: u8) -> u8 {
    if (1..=4).contains(&cols) { cols } else { 3 }
}

pub fn players_label(
    mode: PlayerCountMode,
    players_online: u32,
    players_max: u32,
    percent: Option<u8>,
) -> String {
    if mode == PlayerCountMode::OnlineOnly || players_max == 0 {
        return format!("Online Players: {players_online}");
    }
    if mode == PlayerCountMode::OnlinePercent
        && let Some(percent) = percent
    {
        return format!("Online Players: {players_online} ({percent}%)");
    }
    format!("Players: {players_online}/{players_max}")
}

pub fn title_initial(title: &str) -> String {
    title
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

/// Address as shown to visitors; the port is appended whenever the option is
/// on, default port included.
pub fn display_address(cfg: &StatusConfig) -> String {
    let mut address = cfg.server_address.clone();
    if cfg.show_port_in_ip && cfg.server_port > 0 {
        address.push(':');
        address.push_str(&cfg.server_port.to_string());
    }
    address
}

/// Banner image URL: the configured custom banner wins, otherwise the status
/// API's generated one. `None` when banners are disabled.
pub fn banner_url(cfg: &StatusConfig, key: &ServerKey) -> Option<String> {
    if !cfg.show_banner {
        return None;
    }
    if !cfg.custom_banner_url.is_empty() {
        return Some(cfg.custom_banner_url.clone());
    }

    let mut url = reqwest::Url::parse(&cfg.api_base_url).ok()?;
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.push("banner");
        segments.push("3");
        segments.push(&key.full_address());
    }
    Some(url.to_string())
}

pub fn avatar_url(name: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse(AVATAR_BASE_URL) else {
        return String::new();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push("avatar");
        segments.push(name);
        segments.push("32");
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::{Json, Router};
    use beaconstat_shared::{PercentBucket, PlayersView, RawMotd, RawStatus, StatusView};
    use serde_json::{Value, json};
    use tokio::task::JoinHandle;

    use super::{
        avatar_url, banner_url, clamp_columns, display_address, extract_status, percent_bucket,
        percent_full, players_label, resolve_players, resolve_status, select_motd, title_initial,
        truncate_player_list,
    };
    use crate::cache;
    use crate::config::{PlayerCountMode, StatusConfig};
    use crate::last_known::LastKnownFields;
    use crate::state::AppState;

    #[test]
    fn percent_is_rounded_and_bucketed() {
        let percent = percent_full(true, 294, 500);
        assert_eq!(percent, Some(59));
        assert_eq!(percent_bucket(percent), PercentBucket::Medium);

        assert_eq!(percent_bucket(percent_full(true, 10, 100)), PercentBucket::Low);
        assert_eq!(percent_bucket(percent_full(true, 99, 100)), PercentBucket::High);
        assert_eq!(percent_full(true, 120, 100), Some(100));
    }

    #[test]
    fn percent_needs_capacity_and_online() {
        assert_eq!(percent_full(true, 42, 0), None);
        assert_eq!(percent_full(false, 42, 100), None);
        assert_eq!(percent_bucket(None), PercentBucket::None);
    }

    #[test]
    fn truncation_keeps_input_order_and_counts_the_rest() {
        let names: Vec<String> = (0..15).map(|i| format!("player{i}")).collect();
        let (visible, extra) = truncate_player_list(&names, 10);
        assert_eq!(visible.len(), 10);
        assert_eq!(visible[0], "player0");
        assert_eq!(visible[9], "player9");
        assert_eq!(extra, 5);

        let (visible, extra) = truncate_player_list(&names, 0);
        assert_eq!(visible.len(), 1, "limit has a floor of one");
        assert_eq!(extra, 14);

        let (visible, extra) = truncate_player_list(&names[..3], 10);
        assert_eq!(visible.len(), 3);
        assert_eq!(extra, 0);
    }

    #[test]
    fn motd_priority_is_html_then_clean_then_raw() {
        let motd = RawMotd {
            clean: vec!["A block game".to_owned()],
            html: vec!["<span>A</span>".to_owned(), "<span>block game</span>".to_owned()],
            raw: vec!["§aA block game".to_owned()],
        };
        assert_eq!(
            select_motd(Some(&motd)),
            (String::new(), "<span>A</span><br><span>block game</span>".to_owned())
        );

        let motd = RawMotd {
            clean: vec!["A".to_owned(), "block game".to_owned()],
            raw: vec!["§aA block game".to_owned()],
            ..RawMotd::default()
        };
        assert_eq!(select_motd(Some(&motd)), ("A block game".to_owned(), String::new()));

        let motd = RawMotd {
            raw: vec!["§aA block game".to_owned()],
            ..RawMotd::default()
        };
        assert_eq!(select_motd(Some(&motd)), ("§aA block game".to_owned(), String::new()));

        assert_eq!(select_motd(None), (String::new(), String::new()));
    }

    #[test]
    fn extract_online_collects_last_known_overwrites() {
        let status: RawStatus = serde_json::from_value(json!({
            "online": true,
            "version": "1.21",
            "icon": "data:image/png;base64,AAAA",
            "players": {"online": 3, "max": 20, "list": ["Steve", {"name": "Alex"}]},
            "motd": {"html": ["<b>hi</b>"], "clean": ["hi"]}
        }))
        .expect("status parses");

        let cfg = StatusConfig {
            show_player_list: true,
            ..StatusConfig::default()
        };
        let (fields, update) = extract_status(Some(&status), &LastKnownFields::default(), &cfg);

        assert!(fields.online);
        assert_eq!(fields.players_online, 3);
        assert_eq!(fields.players_max, 20);
        assert_eq!(fields.player_list, vec!["Steve", "Alex"]);
        assert_eq!(fields.motd_html, "<b>hi</b>");
        assert!(fields.motd_clean.is_empty());

        assert_eq!(update.version.as_deref(), Some("1.21"));
        assert_eq!(update.icon.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(update.motd_html.as_deref(), Some("<b>hi</b>"));
        assert_eq!(update.motd_clean.as_deref(), Some(""), "the other variant is cleared");
    }

    #[test]
    fn extract_offline_falls_back_to_last_known() {
        let status: RawStatus =
            serde_json::from_value(json!({"online": false})).expect("status parses");
        let last_known = LastKnownFields {
            version: "1.20.1".to_owned(),
            motd_clean: "welcome back".to_owned(),
            icon: "data:image/png;base64,BBBB".to_owned(),
            ..LastKnownFields::default()
        };

        let cfg = StatusConfig::default();
        let (fields, update) = extract_status(Some(&status), &last_known, &cfg);

        assert!(!fields.online);
        assert_eq!(fields.version, "1.20.1");
        assert_eq!(fields.motd_clean, "welcome back");
        assert_eq!(fields.icon, "data:image/png;base64,BBBB");
        assert!(update.is_empty());
    }

    #[test]
    fn extract_without_online_field_is_offline_with_defaults() {
        let status: RawStatus =
            serde_json::from_value(json!({"version": "1.21"})).expect("status parses");
        let (fields, update) =
            extract_status(Some(&status), &LastKnownFields::default(), &StatusConfig::default());
        assert!(!fields.online);
        assert!(fields.version.is_empty());
        assert!(update.is_empty());

        let (fields, _) =
            extract_status(None, &LastKnownFields::default(), &StatusConfig::default());
        assert!(!fields.online);
    }

    #[test]
    fn extract_respects_display_toggles() {
        let status: RawStatus = serde_json::from_value(json!({
            "online": true,
            "players": {"online": 2, "max": 10, "list": ["Steve"]},
            "motd": {"clean": ["hi"]}
        }))
        .expect("status parses");

        let cfg = StatusConfig {
            show_player_list: false,
            show_motd: false,
            ..StatusConfig::default()
        };
        let (fields, update) = extract_status(Some(&status), &LastKnownFields::default(), &cfg);
        assert!(fields.player_list.is_empty());
        assert!(fields.motd_clean.is_empty());
        assert!(update.motd_clean.is_none());
    }

    #[test]
    fn player_count_labels_follow_the_mode() {
        assert_eq!(
            players_label(PlayerCountMode::OnlineMax, 314, 500, Some(63)),
            "Players: 314/500"
        );
        assert_eq!(
            players_label(PlayerCountMode::OnlineOnly, 314, 500, Some(63)),
            "Online Players: 314"
        );
        assert_eq!(
            players_label(PlayerCountMode::OnlinePercent, 314, 500, Some(63)),
            "Online Players: 314 (63%)"
        );
        // No capacity forces the online-only form whatever the mode.
        assert_eq!(
            players_label(PlayerCountMode::OnlinePercent, 314, 0, None),
            "Online Players: 314"
        );
    }

    #[test]
    fn presentation_helpers() {
        assert_eq!(title_initial("survival"), "S");
        assert_eq!(title_initial("ßerver"), "SS");
        assert_eq!(title_initial(""), "");

        assert_eq!(clamp_columns(0), 3);
        assert_eq!(clamp_columns(2), 2);
        assert_eq!(clamp_columns(9), 3);

        let cfg = StatusConfig {
            server_address: "mc.example.net".to_owned(),
            server_port: 25565,
            ..StatusConfig::default()
        };
        assert_eq!(display_address(&cfg), "mc.example.net:25565");
        let cfg = StatusConfig {
            show_port_in_ip: false,
            ..cfg
        };
        assert_eq!(display_address(&cfg), "mc.example.net");
    }

    #[test]
    fn banner_url_prefers_the_custom_override() {
        let key = crate::state::ServerKey::new("mc.example.net", 25566);

        let cfg = StatusConfig {
            show_banner: false,
            ..StatusConfig::default()
        };
        assert_eq!(banner_url(&cfg, &key), None);

        let cfg = StatusConfig {
            custom_banner_url: "https://cdn.example.net/banner.png".to_owned(),
            ..StatusConfig::default()
        };
        assert_eq!(
            banner_url(&cfg, &key).as_deref(),
            Some("https://cdn.example.net/banner.png")
        );

        let cfg = StatusConfig::default();
        assert_eq!(
            banner_url(&cfg, &key).as_deref(),
            Some("https://api.mcsrvstat.us/banner/3/mc.example.net%3A25566")
        );
    }

    #[test]
    fn avatar_url_percent_encodes_the_name() {
        assert_eq!(avatar_url("Steve"), "https://mc-heads.net/avatar/Steve/32");
        assert_eq!(
            avatar_url("Steve Fan"),
            "https://mc-heads.net/avatar/Steve%20Fan/32"
        );
    }

    // ---- integration tests against a stub upstream -------------------------

    #[derive(Clone)]
    struct StubApi {
        hits: Arc<AtomicUsize>,
        responses: Arc<Mutex<VecDeque<Value>>>,
    }

    async fn stub_status(State(stub): State<StubApi>, Path(_addr): Path<String>) -> Json<Value> {
        stub.hits.fetch_add(1, Ordering::SeqCst);
        let mut responses = stub.responses.lock().expect("stub lock");
        let value = if responses.len() > 1 {
            responses.pop_front().expect("non-empty queue")
        } else {
            responses
                .front()
                .cloned()
                .unwrap_or_else(|| json!({"online": false}))
        };
        Json(value)
    }

    /// Serves `/3/{addr}` with the queued responses (the last one repeats)
    /// and counts upstream hits. The listener doubles as the TCP probe
    /// target.
    async fn spawn_stub_api(responses: Vec<Value>) -> (SocketAddr, Arc<AtomicUsize>, JoinHandle<()>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let stub = StubApi {
            hits: Arc::clone(&hits),
            responses: Arc::new(Mutex::new(responses.into())),
        };
        let app = Router::new()
            .route("/3/{addr}", axum::routing::get(stub_status))
            .with_state(stub);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub");
        });
        (addr, hits, handle)
    }

    fn temp_last_known(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("beaconstat-resolver-{}-{name}.json", std::process::id()))
    }

    async fn test_state(
        name: &str,
        api_addr: SocketAddr,
        probe_port: u16,
        cache_seconds: i64,
    ) -> AppState {
        let path = temp_last_known(name);
        let _ = tokio::fs::remove_file(&path).await;
        let config = StatusConfig {
            server_address: "127.0.0.1".to_owned(),
            server_port: probe_port,
            cache_seconds,
            players_cache_seconds: cache_seconds,
            show_player_list: true,
            api_base_url: format!("http://{api_addr}"),
            last_known_path: path,
            ..StatusConfig::default()
        };
        AppState::new(config).await
    }

    async fn cleanup(state: &AppState) {
        let _ = tokio::fs::remove_file(&state.config.last_known_path).await;
    }

    fn online_payload() -> Value {
        json!({
            "online": true,
            "version": "1.21",
            "icon": "data:image/png;base64,AAAA",
            "players": {"online": 2, "max": 10, "list": ["Steve", "Alex"]},
            "motd": {"clean": ["A block game"]}
        })
    }

    #[tokio::test]
    async fn upstream_is_fetched_once_while_the_cache_is_warm() {
        let (api_addr, hits, server) = spawn_stub_api(vec![online_payload()]).await;
        let state = test_state("warm-cache", api_addr, api_addr.port(), 30).await;

        let first = resolve_status(&state, false).await;
        let second = resolve_status(&state, false).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1, "second resolve must hit the cache");

        let StatusView::Ready(card) = first else {
            panic!("expected a ready card");
        };
        assert!(card.online);
        assert!(card.ping_ms.is_some());
        assert_eq!(card.players_online, 2);
        assert_eq!(card.visible_players, vec!["Steve", "Alex"]);
        assert_eq!(card.motd_clean, "A block game");
        assert_eq!(card.percent_full, Some(20));
        assert_eq!(card.percent_bucket, PercentBucket::Low);
        assert!(matches!(second, StatusView::Ready(c) if c.online));

        cleanup(&state).await;
        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn force_refresh_bypasses_the_cache() {
        let (api_addr, hits, server) = spawn_stub_api(vec![online_payload()]).await;
        let state = test_state("force-refresh", api_addr, api_addr.port(), 30).await;

        resolve_status(&state, false).await;
        resolve_status(&state, true).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        cleanup(&state).await;
        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn missing_address_short_circuits_without_network() {
        let (api_addr, hits, server) = spawn_stub_api(vec![online_payload()]).await;
        let mut state = test_state("not-configured", api_addr, api_addr.port(), 30).await;
        let mut config = (*state.config).clone();
        config.server_address = String::new();
        state.config = Arc::new(config);

        assert_eq!(resolve_status(&state, false).await, StatusView::NotConfigured);
        assert_eq!(resolve_players(&state, false).await, PlayersView::NotConfigured);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        cleanup(&state).await;
        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn repair_fetch_backfills_a_cached_iconless_entry() {
        let (api_addr, hits, server) = spawn_stub_api(vec![online_payload()]).await;
        let state = test_state("repair", api_addr, api_addr.port(), 30).await;

        // Simulate an earlier incomplete cache write: online, no icon.
        let key = state.server_key();
        let stale: RawStatus =
            serde_json::from_value(json!({"online": true, "players": {"online": 1, "max": 10}}))
                .expect("stale status parses");
        cache::store(&state.status_cache, &key, stale, 30);

        let view = resolve_status(&state, false).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1, "exactly one repair fetch");

        let StatusView::Ready(card) = view else {
            panic!("expected a ready card");
        };
        assert_eq!(card.icon, "data:image/png;base64,AAAA");

        let repaired = cache::lookup(&state.status_cache, &key).expect("cache was overwritten");
        assert!(repaired.has_icon());

        cleanup(&state).await;
        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn offline_card_reports_last_known_fields() {
        let (api_addr, _hits, server) = spawn_stub_api(vec![json!({"online": false})]).await;
        let state = test_state("offline-fallback", api_addr, api_addr.port(), 30).await;

        tokio::fs::write(
            &state.config.last_known_path,
            serde_json::to_vec(&LastKnownFields {
                version: "1.20.1".to_owned(),
                icon: "data:image/png;base64,BBBB".to_owned(),
                ..LastKnownFields::default()
            })
            .expect("serialize seed"),
        )
        .await
        .expect("seed last-known file");
        // Reopen so the seeded file is actually loaded.
        let state = AppState::new((*state.config).clone()).await;

        let StatusView::Ready(card) = resolve_status(&state, false).await else {
            panic!("expected a ready card");
        };
        assert!(!card.online);
        assert_eq!(card.version, "1.20.1");
        assert_eq!(card.icon, "data:image/png;base64,BBBB");
        assert_eq!(card.ping_ms, None);
        assert_eq!(card.percent_full, None);
        assert_eq!(card.percent_bucket, PercentBucket::None);

        cleanup(&state).await;
        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn reported_online_is_downgraded_when_the_probe_fails() {
        let (api_addr, _hits, server) = spawn_stub_api(vec![online_payload()]).await;

        // Grab a port that nothing listens on for the probe target.
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind probe placeholder");
        let closed_port = closed.local_addr().expect("placeholder addr").port();
        drop(closed);

        let state = test_state("downgrade", api_addr, closed_port, 30).await;
        let StatusView::Ready(card) = resolve_status(&state, false).await else {
            panic!("expected a ready card");
        };

        assert!(!card.online);
        assert_eq!(card.ping_ms, None);
        assert_eq!(card.players_online, 0);
        assert_eq!(card.players_max, 0);
        assert!(card.visible_players.is_empty());
        assert_eq!(card.extra_count, 0);
        assert_eq!(card.percent_full, None);

        cleanup(&state).await;
        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn players_view_lists_everyone_unbounded() {
        let names: Vec<Value> = (0..15).map(|i| json!(format!("player{i}"))).collect();
        let payload = json!({
            "online": true,
            "players": {"online": 15, "max": 100, "list": names}
        });
        let (api_addr, _hits, server) = spawn_stub_api(vec![payload]).await;
        let state = test_state("players-online", api_addr, api_addr.port(), 30).await;

        let PlayersView::Online { count, players, .. } = resolve_players(&state, false).await
        else {
            panic!("expected an online list");
        };
        assert_eq!(count, 15);
        assert_eq!(players.len(), 15, "the players view never truncates");
        assert_eq!(players[0].name, "player0");
        assert_eq!(players[0].avatar_url, "https://mc-heads.net/avatar/player0/32");

        cleanup(&state).await;
        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn players_view_reports_empty_and_offline_states() {
        let (api_addr, _hits, server) =
            spawn_stub_api(vec![json!({"online": true, "players": {"online": 0, "max": 10}})])
                .await;
        let state = test_state("players-empty", api_addr, api_addr.port(), 30).await;
        assert_eq!(resolve_players(&state, false).await, PlayersView::Empty);
        cleanup(&state).await;
        server.abort();
        let _ = server.await;

        let (api_addr, _hits, server) = spawn_stub_api(vec![json!({"online": false})]).await;
        let state = test_state("players-offline", api_addr, api_addr.port(), 30).await;
        assert_eq!(resolve_players(&state, false).await, PlayersView::Offline);
        cleanup(&state).await;
        server.abort();
        let _ = server.await;
    }
}
