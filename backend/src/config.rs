use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub server_addr: String,
    pub log_json: bool,
    /// Upper bound applied to `limit` on article listings. Unbounded when unset.
    pub max_page_limit: Option<i64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("storage", "postgres")?
            .set_default("run_migrations", true)?
            .set_default("server_addr", "0.0.0.0:3000")?
            .set_default("log_json", false)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("NEWSROOM"))
            .build()?;

        s.try_deserialize()
    }

    /// Settings for an in-process server backed by [`crate::store::MemoryStore`].
    pub fn in_memory(server_addr: impl Into<String>) -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            run_migrations: false,
            server_addr: server_addr.into(),
            log_json: false,
            max_page_limit: None,
        }
    }
}
