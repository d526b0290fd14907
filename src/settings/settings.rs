use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub io: Io,
    pub store: Store,
    pub cache: Cache,
    pub auth: Auth,
    pub hasher: Hasher,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Http {
    pub address: String,
}

impl Default for Http {
    fn default() -> Self {
        Http {
            address: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Log {
    pub filter: String,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            filter: "info".to_string(),
        }
    }
}

/// Deadline applied to every store and cache round trip.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Io {
    pub timeout_ms: u64,
}

impl Default for Io {
    fn default() -> Self {
        Io { timeout_ms: 3_000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Store {
    pub backend: String, // "memory" or "mysql"
    pub dsn: String,
    pub max_connections: u32,
}

impl Default for Store {
    fn default() -> Self {
        Store {
            backend: "memory".to_string(),
            dsn: String::new(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub backend: String, // "memory" or "redis"
    pub dsn: String,
    /// Namespace for every key this process writes.
    pub prefix: String,
    pub ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Cache {
            backend: "memory".to_string(),
            dsn: String::new(),
            prefix: "adboard".to_string(),
            ttl_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Auth {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl Default for Auth {
    fn default() -> Self {
        Auth {
            issuer: "adboard.auth".to_string(),
            audience: "adboard-client".to_string(),
            access_ttl_secs: 5 * 60,
            refresh_ttl_secs: 3 * 60 * 60,
        }
    }
}

/// Argon2id cost. Lower it only for tests.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hasher {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Hasher {
    fn default() -> Self {
        Hasher {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Layer the settings file under `ADBOARD__<SECTION>__<FIELD>` environment overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("ADBOARD")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
