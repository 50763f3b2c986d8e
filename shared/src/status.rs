use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw response from the mcsrvstat.us v3 status API.
///
/// Every section is optional: the API omits fields freely depending on the
/// server, so a missing field means "absent", never an error. A response
/// without `online` is treated as unusable by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatus {
    pub online: Option<bool>,
    pub players: Option<RawPlayers>,
    pub motd: Option<RawMotd>,
    pub icon: Option<String>,
    pub version: Option<String>,
}

impl RawStatus {
    pub fn is_online(&self) -> bool {
        self.online == Some(true)
    }

    pub fn has_icon(&self) -> bool {
        self.icon.as_deref().is_some_and(|icon| !icon.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlayers {
    #[serde(default)]
    pub online: i64,
    #[serde(default)]
    pub max: i64,
    /// Entries are either bare name strings or objects carrying a `name`
    /// field; kept untyped and flattened by [`normalize_player_list`].
    #[serde(default)]
    pub list: Vec<Value>,
}

/// The MOTD comes in up to three parallel encodings, each a list of lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMotd {
    #[serde(default)]
    pub clean: Vec<String>,
    #[serde(default)]
    pub html: Vec<String>,
    #[serde(default)]
    pub raw: Vec<String>,
}

/// Flatten the API's player list into plain names.
///
/// Object entries without a non-empty `name` are dropped, as are entries of
/// any other JSON type.
pub fn normalize_player_list(raw: &[Value]) -> Vec<String> {
    let mut names = Vec::with_capacity(raw.len());
    for entry in raw {
        match entry {
            Value::String(name) => names.push(name.clone()),
            Value::Object(map) => {
                if let Some(name) = map.get("name").and_then(Value::as_str)
                    && !name.is_empty()
                {
                    names.push(name.to_owned());
                }
            }
            _ => {}
        }
    }
    names
}
