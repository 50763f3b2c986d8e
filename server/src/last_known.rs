use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Server fields retained across offline periods. Refreshed only by
/// successful online fetches, never cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastKnownFields {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub motd_clean: String,
    #[serde(default)]
    pub motd_html: String,
    #[serde(default)]
    pub icon: String,
}

/// Field overwrites collected by one resolve pass. `None` leaves the stored
/// field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastKnownUpdate {
    pub version: Option<String>,
    pub motd_clean: Option<String>,
    pub motd_html: Option<String>,
    pub icon: Option<String>,
}

impl LastKnownUpdate {
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.motd_clean.is_none()
            && self.motd_html.is_none()
            && self.icon.is_none()
    }

    fn apply(&self, fields: &mut LastKnownFields) {
        if let Some(version) = &self.version {
            fields.version = version.clone();
        }
        if let Some(motd_clean) = &self.motd_clean {
            fields.motd_clean = motd_clean.clone();
        }
        if let Some(motd_html) = &self.motd_html {
            fields.motd_html = motd_html.clone();
        }
        if let Some(icon) = &self.icon {
            fields.icon = icon.clone();
        }
    }
}

/// File-backed last-known-good store. One resolve pass produces at most one
/// write, and only when a field actually changed.
pub struct LastKnownStore {
    path: PathBuf,
    fields: RwLock<LastKnownFields>,
}

impl LastKnownStore {
    /// Load the persisted fields, falling back to defaults when the file is
    /// missing or unreadable.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let fields = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(
                        error = %e,
                        path = %path.display(),
                        "last-known file is corrupt, starting fresh"
                    );
                    LastKnownFields::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LastKnownFields::default(),
            Err(e) => {
                warn!(
                    error = %e,
                    path = %path.display(),
                    "failed to read last-known file, starting fresh"
                );
                LastKnownFields::default()
            }
        };

        Self {
            path,
            fields: RwLock::new(fields),
        }
    }

    pub async fn read(&self) -> LastKnownFields {
        self.fields.read().await.clone()
    }

    /// Apply `update` and rewrite the file only when a field changed.
    /// Returns whether anything was written.
    pub async fn write_if_changed(&self, update: &LastKnownUpdate) -> bool {
        if update.is_empty() {
            return false;
        }

        let snapshot = {
            let mut fields = self.fields.write().await;
            let mut next = fields.clone();
            update.apply(&mut next);
            if next == *fields {
                return false;
            }
            *fields = next;
            fields.clone()
        };

        match serde_json::to_vec_pretty(&snapshot) {
            Ok(bytes) => {
                if let Err(e) = fs::write(&self.path, bytes).await {
                    warn!(
                        error = %e,
                        path = %self.path.display(),
                        "failed to persist last-known fields"
                    );
                } else {
                    info!(path = %self.path.display(), "persisted last-known server fields");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize last-known fields"),
        }

        true
    }
}
