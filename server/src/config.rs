use std::path::PathBuf;
use std::time::Duration;

pub const STATUS_API_BASE_URL: &str = "https://api.mcsrvstat.us";
pub const AVATAR_BASE_URL: &str = "https://mc-heads.net";

pub const DEFAULT_MC_PORT: u16 = 25565;
pub const DEFAULT_CACHE_SECONDS: i64 = 30;
pub const DEFAULT_PLAYERS_CACHE_SECONDS: i64 = 5;
/// Stored TTLs never go below this; a tiny configured TTL would refetch on
/// nearly every request.
pub const CACHE_TTL_FLOOR_SECS: i64 = 5;
pub const DEFAULT_PLAYER_LIST_LIMIT: usize = 10;
pub const DEFAULT_PLAYER_COLUMNS: u8 = 3;
pub const DEFAULT_LAST_KNOWN_PATH: &str = "last_known.json";

pub const UPSTREAM_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
pub const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// How the player count on the status card is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerCountMode {
    /// "Players: 314/500"
    #[default]
    OnlineMax,
    /// "Online Players: 314"
    OnlineOnly,
    /// "Online Players: 314 (63%)"
    OnlinePercent,
}

impl PlayerCountMode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "online_only" => Self::OnlineOnly,
            "online_percent" => Self::OnlinePercent,
            _ => Self::OnlineMax,
        }
    }
}

/// Immutable per-process configuration, read from the environment once at
/// startup. Last-known-good state lives in its own store, not here.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub server_address: String,
    pub server_port: u16,
    pub cache_seconds: i64,
    pub players_cache_seconds: i64,
    pub custom_name: String,
    pub custom_banner_url: String,
    pub show_ip: bool,
    pub show_port_in_ip: bool,
    pub show_motd: bool,
    pub show_banner: bool,
    pub show_player_list: bool,
    pub player_list_limit: usize,
    pub player_columns: u8,
    pub dark_mode: bool,
    pub player_count_mode: PlayerCountMode,
    pub api_base_url: String,
    pub last_known_path: PathBuf,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            server_port: DEFAULT_MC_PORT,
            cache_seconds: DEFAULT_CACHE_SECONDS,
            players_cache_seconds: DEFAULT_PLAYERS_CACHE_SECONDS,
            custom_name: String::new(),
            custom_banner_url: String::new(),
            show_ip: true,
            show_port_in_ip: true,
            show_motd: true,
            show_banner: true,
            show_player_list: false,
            player_list_limit: DEFAULT_PLAYER_LIST_LIMIT,
            player_columns: DEFAULT_PLAYER_COLUMNS,
            dark_mode: false,
            player_count_mode: PlayerCountMode::default(),
            api_base_url: STATUS_API_BASE_URL.to_owned(),
            last_known_path: PathBuf::from(DEFAULT_LAST_KNOWN_PATH),
        }
    }
}

impl StatusConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_address: string_env("MC_ADDRESS", &defaults.server_address),
            server_port: parse_env("MC_PORT", defaults.server_port),
            cache_seconds: parse_env("CACHE_SECONDS", defaults.cache_seconds),
            players_cache_seconds: parse_env(
                "PLAYERS_CACHE_SECONDS",
                defaults.players_cache_seconds,
            ),
            custom_name: string_env("CUSTOM_NAME", &defaults.custom_name),
            custom_banner_url: string_env("CUSTOM_BANNER_URL", &defaults.custom_banner_url),
            show_ip: flag_env("SHOW_IP", defaults.show_ip),
            show_port_in_ip: flag_env("SHOW_PORT_IN_IP", defaults.show_port_in_ip),
            show_motd: flag_env("SHOW_MOTD", defaults.show_motd),
            show_banner: flag_env("SHOW_BANNER", defaults.show_banner),
            show_player_list: flag_env("SHOW_PLAYER_LIST", defaults.show_player_list),
            player_list_limit: parse_env("PLAYER_LIST_LIMIT", defaults.player_list_limit),
            player_columns: parse_env("PLAYER_COLUMNS", defaults.player_columns),
            dark_mode: flag_env("DARK_MODE", defaults.dark_mode),
            player_count_mode: std::env::var("PLAYER_COUNT_MODE")
                .map(|value| PlayerCountMode::parse(&value))
                .unwrap_or(defaults.player_count_mode),
            api_base_url: string_env("STATUS_API_BASE_URL", &defaults.api_base_url),
            last_known_path: std::env::var("LAST_KNOWN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.last_known_path),
        }
    }
}

pub fn http_port() -> u16 {
    parse_env("HTTP_PORT", DEFAULT_HTTP_PORT)
}

fn string_env(name: &str, default: &str) -> String {
    std::env::var(name)
        .map(|value| value.trim().to_owned())
        .unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn flag_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(default)
}
