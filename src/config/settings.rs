//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Which document store backs the repositories
    pub store: StoreSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Argon2id cost parameters for stored passwords
    pub password: PasswordSettings,

    /// Logging configuration
    pub telemetry: TelemetrySettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Document store selection.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
}

/// Supported document store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSONB documents in PostgreSQL
    Postgres,
    /// Process-local store; contents are lost on exit
    Memory,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: Option<String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// Argon2id password hashing cost.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordSettings {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    /// Default filter directive, overridden by RUST_LOG
    pub filter: String,

    /// Human-readable or JSON lines
    pub format: LogFormat,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the postgres backend is selected without a database URL.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Self::builder(&environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__DATABASE__MAX_CONNECTIONS=20 -> database.max_connections = 20
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    /// Default values shared by [`Settings::load`] and tests.
    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("store.backend", "postgres")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("password.memory_kib", 19456)?
            .set_default("password.iterations", 2)?
            .set_default("password.parallelism", 1)?
            .set_default("telemetry.filter", "info,chat_store=debug,sqlx=warn")?
            .set_default("telemetry.format", "pretty")
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.store.backend == StoreBackend::Postgres
            && self.database.url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Message(
                "database.url (or DATABASE_URL) is required for the postgres store backend".into(),
            ));
        }
        Ok(self)
    }

    /// Settings for a process-local store with cheap password hashing.
    pub fn in_memory() -> Self {
        Self {
            store: StoreSettings {
                backend: StoreBackend::Memory,
            },
            database: DatabaseSettings {
                url: None,
                max_connections: 1,
                min_connections: 0,
                acquire_timeout: 5,
            },
            password: PasswordSettings::low_cost(),
            telemetry: TelemetrySettings {
                filter: "warn".into(),
                format: LogFormat::Pretty,
            },
            environment: "test".into(),
        }
    }
}

impl PasswordSettings {
    /// Minimal Argon2id cost, for tests and throwaway stores only.
    pub fn low_cost() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }
}

impl DatabaseSettings {
    /// Get the connection URL, if configured.
    pub fn connection_url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}
