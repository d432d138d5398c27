use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};
use crate::domain::member::Member;

const CONFIG_FILE: &str = "labrxiv.toml";
const ENV_PREFIX: &str = "LABRXIV_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub ingest: IngestSettings,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Postgres,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Connection string for the sqlite and postgres backends.
    pub database_url: String,
    /// Document path for the json backend.
    pub json_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    pub category: String,
    pub max_pages: u32,
    pub page_delay_ms: u64,
    /// Default triage window (trailing days) when the caller gives no range.
    pub window_days: i64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_url: "sqlite://labrxiv.db".to_string(),
            json_path: "labrxiv.json".to_string(),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            category: "neuroscience".to_string(),
            max_pages: 5,
            page_delay_ms: 500,
            window_days: 7,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            ingest: IngestSettings::default(),
            members: vec![
                Member::new("Albert", "#3498db"),
                Member::new("Shinsuke", "#2ecc71"),
                Member::new("Jaeson", "#e67e22"),
                Member::new("Brian", "#e74c3c"),
            ],
        }
    }
}

impl Settings {
    /// Defaults, overridden by labrxiv.toml, overridden by LABRXIV_* env vars
    /// (nested keys separated with `__`, e.g. LABRXIV_STORAGE__BACKEND=json).
    pub fn load() -> Result<Self> {
        Self::figment().extract().map_err(|e| {
            AppError::ConfigError(format!("Failed to load configuration: {}", e))
        })
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn roster(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }
}
