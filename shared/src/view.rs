use serde::{Deserialize, Serialize};

/// Occupancy bucket derived from the percent-full value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentBucket {
    Low,
    Medium,
    High,
    None,
}

/// Fully resolved status card, ready for a front-end to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCard {
    pub title: String,
    /// Uppercased first character of the title, shown when no icon exists.
    pub initial: String,
    /// Present only when the address line is enabled.
    pub address_line: Option<String>,
    pub online: bool,
    pub ping_ms: Option<u32>,
    pub players_online: u32,
    pub players_max: u32,
    /// Pre-rendered count text honoring the configured display mode.
    pub players_label: String,
    pub visible_players: Vec<String>,
    pub extra_count: usize,
    pub percent_full: Option<u8>,
    pub percent_bucket: PercentBucket,
    pub version: String,
    pub motd_clean: String,
    pub motd_html: String,
    pub icon: String,
    pub banner_url: Option<String>,
    pub player_columns: u8,
    pub dark_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusView {
    /// No server address configured; nothing was fetched.
    NotConfigured,
    Ready(StatusCard),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCard {
    pub name: String,
    pub avatar_url: String,
}

/// Outcome of the player-list path. Offline and empty results are explicit
/// states rather than an empty card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayersView {
    NotConfigured,
    Offline,
    Empty,
    Online {
        count: usize,
        players: Vec<PlayerCard>,
        player_columns: u8,
        dark_mode: bool,
    },
}
