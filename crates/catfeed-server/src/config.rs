//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/catfeed";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default Elasticsearch host.
pub const DEFAULT_ELASTIC_HOST: &str = "localhost";

/// Default Elasticsearch port.
pub const DEFAULT_ELASTIC_PORT: u16 = 9200;

/// Default Elasticsearch user.
pub const DEFAULT_ELASTIC_USER: &str = "elastic";

/// Name of the search index holding SKU documents.
pub const DEFAULT_ELASTIC_INDEX: &str = "products";

/// Analyzer applied to the text fields of the SKU mapping.
pub const DEFAULT_ELASTIC_ANALYZER: &str = "russian";

/// Default Elasticsearch request timeout in seconds.
pub const DEFAULT_ELASTIC_TIMEOUT_SECS: u64 = 30;

/// Default directory scanned for feed files.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default retention window for finished job progress entries, in seconds.
pub const DEFAULT_PROGRESS_RETENTION_SECS: u64 = 3600;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub elastic: ElasticConfig,
    pub feeds: FeedConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Elasticsearch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub index: String,
    pub analyzer: String,
    pub timeout_secs: u64,
}

impl ElasticConfig {
    /// Base URL of the Elasticsearch node
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Feed directory and job bookkeeping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub data_dir: String,
    pub progress_retention_secs: u64,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("CATFEED_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("CATFEED_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("CATFEED_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            elastic: ElasticConfig {
                host: std::env::var("ELASTIC_HOST")
                    .unwrap_or_else(|_| DEFAULT_ELASTIC_HOST.to_string()),
                port: std::env::var("ELASTIC_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_ELASTIC_PORT),
                username: std::env::var("ELASTIC_USER")
                    .unwrap_or_else(|_| DEFAULT_ELASTIC_USER.to_string()),
                password: std::env::var("ELASTIC_PASSWORD").unwrap_or_default(),
                index: std::env::var("ELASTIC_INDEX")
                    .unwrap_or_else(|_| DEFAULT_ELASTIC_INDEX.to_string()),
                analyzer: std::env::var("ELASTIC_ANALYZER")
                    .unwrap_or_else(|_| DEFAULT_ELASTIC_ANALYZER.to_string()),
                timeout_secs: std::env::var("ELASTIC_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_ELASTIC_TIMEOUT_SECS),
            },
            feeds: FeedConfig {
                data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
                progress_retention_secs: std::env::var("PROGRESS_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PROGRESS_RETENTION_SECS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.elastic.index.is_empty() {
            anyhow::bail!("Elasticsearch index name cannot be empty");
        }

        if self.feeds.data_dir.is_empty() {
            anyhow::bail!("Feed data directory cannot be empty");
        }

        if self.elastic.password.is_empty() {
            tracing::warn!("No Elasticsearch password configured - requests will be unauthenticated");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            elastic: ElasticConfig {
                host: DEFAULT_ELASTIC_HOST.to_string(),
                port: DEFAULT_ELASTIC_PORT,
                username: DEFAULT_ELASTIC_USER.to_string(),
                password: String::new(),
                index: DEFAULT_ELASTIC_INDEX.to_string(),
                analyzer: DEFAULT_ELASTIC_ANALYZER.to_string(),
                timeout_secs: DEFAULT_ELASTIC_TIMEOUT_SECS,
            },
            feeds: FeedConfig {
                data_dir: DEFAULT_DATA_DIR.to_string(),
                progress_retention_secs: DEFAULT_PROGRESS_RETENTION_SECS,
            },
        }
    }
}
