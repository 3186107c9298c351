//! Configuration management

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::storage::config::StorageConfig;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default cap on an uploaded CSV (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/challan";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Challan lookup endpoint.
pub const DEFAULT_ENRICHMENT_ENDPOINT: &str = "https://api.instantpay.in/identity/vehicleChallan";

/// Fixed auth code sent with every lookup.
pub const DEFAULT_ENRICHMENT_AUTH_CODE: &str = "1";

pub const DEFAULT_ENRICHMENT_LATITUDE: &str = "11.1019";

pub const DEFAULT_ENRICHMENT_LONGITUDE: &str = "26.9109";

/// Per-request timeout for challan lookups in seconds.
pub const DEFAULT_ENRICHMENT_TIMEOUT_SECS: u64 = 30;

/// Public IP echo service.
pub const DEFAULT_EGRESS_IP_URL: &str = "https://api.ipify.org?format=json";

/// Egress IP used when the echo service has never answered.
pub const DEFAULT_EGRESS_FALLBACK_IP: &str = "14.142.186.142";

/// Per-request timeout for the IP echo service in seconds.
pub const DEFAULT_EGRESS_TIMEOUT_SECS: u64 = 10;

/// Bucket ceiling (1 GiB).
pub const DEFAULT_QUOTA_SIZE_LIMIT_BYTES: u64 = 1024 * 1024 * 1024;

/// Headroom kept below the ceiling after eviction (200 MiB).
pub const DEFAULT_QUOTA_DELETE_TARGET_BYTES: u64 = 200 * 1024 * 1024;

/// Maximum number of objects considered by one eviction pass.
pub const DEFAULT_QUOTA_LIST_LIMIT: usize = 1000;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub enrichment: EnrichmentConfig,
    pub egress: EgressConfig,
    pub quota: QuotaConfig,
    pub storage: StorageConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Challan lookup service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub endpoint: String,
    pub auth_code: String,
    pub client_id: String,
    pub client_secret: String,
    pub latitude: String,
    pub longitude: String,
    pub timeout_secs: u64,
}

// Keeps the client secret out of logs.
impl std::fmt::Debug for EnrichmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentConfig")
            .field("endpoint", &self.endpoint)
            .field("auth_code", &self.auth_code)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Egress IP resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressConfig {
    pub lookup_url: String,
    pub fallback_ip: String,
    pub timeout_secs: u64,
}

/// Bucket quota configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub size_limit_bytes: u64,
    pub delete_target_bytes: u64,
    pub list_limit: usize,
}

impl QuotaConfig {
    /// Total size the bucket is trimmed down to once it goes over.
    pub fn threshold_bytes(&self) -> u64 {
        self.size_limit_bytes.saturating_sub(self.delete_target_bytes)
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENRICHMENT_ENDPOINT.to_string(),
            auth_code: DEFAULT_ENRICHMENT_AUTH_CODE.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            latitude: DEFAULT_ENRICHMENT_LATITUDE.to_string(),
            longitude: DEFAULT_ENRICHMENT_LONGITUDE.to_string(),
            timeout_secs: DEFAULT_ENRICHMENT_TIMEOUT_SECS,
        }
    }
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            lookup_url: DEFAULT_EGRESS_IP_URL.to_string(),
            fallback_ip: DEFAULT_EGRESS_FALLBACK_IP.to_string(),
            timeout_secs: DEFAULT_EGRESS_TIMEOUT_SECS,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            size_limit_bytes: DEFAULT_QUOTA_SIZE_LIMIT_BYTES,
            delete_target_bytes: DEFAULT_QUOTA_DELETE_TARGET_BYTES,
            list_limit: DEFAULT_QUOTA_LIST_LIMIT,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env_string("CHALLAN_HOST", DEFAULT_SERVER_HOST),
                port: env_or("CHALLAN_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "CHALLAN_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
                max_upload_bytes: env_or("CHALLAN_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            },
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            enrichment: EnrichmentConfig {
                endpoint: env_string("ENRICHMENT_ENDPOINT", DEFAULT_ENRICHMENT_ENDPOINT),
                auth_code: env_string("IPAY_AUTH_CODE", DEFAULT_ENRICHMENT_AUTH_CODE),
                client_id: env_string("IPAY_CLIENT_ID", ""),
                client_secret: env_string("IPAY_CLIENT_SECRET", ""),
                latitude: env_string("ENRICHMENT_LATITUDE", DEFAULT_ENRICHMENT_LATITUDE),
                longitude: env_string("ENRICHMENT_LONGITUDE", DEFAULT_ENRICHMENT_LONGITUDE),
                timeout_secs: env_or("ENRICHMENT_TIMEOUT_SECS", DEFAULT_ENRICHMENT_TIMEOUT_SECS),
            },
            egress: EgressConfig {
                lookup_url: env_string("EGRESS_IP_URL", DEFAULT_EGRESS_IP_URL),
                fallback_ip: env_string("EGRESS_FALLBACK_IP", DEFAULT_EGRESS_FALLBACK_IP),
                timeout_secs: env_or("EGRESS_TIMEOUT_SECS", DEFAULT_EGRESS_TIMEOUT_SECS),
            },
            quota: QuotaConfig {
                size_limit_bytes: env_or("QUOTA_SIZE_LIMIT_BYTES", DEFAULT_QUOTA_SIZE_LIMIT_BYTES),
                delete_target_bytes: env_or(
                    "QUOTA_DELETE_TARGET_BYTES",
                    DEFAULT_QUOTA_DELETE_TARGET_BYTES,
                ),
                list_limit: env_or("QUOTA_LIST_LIMIT", DEFAULT_QUOTA_LIST_LIMIT),
            },
            storage: StorageConfig::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("Maximum upload size must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.enrichment.endpoint.trim().is_empty() {
            anyhow::bail!("Enrichment endpoint cannot be empty");
        }

        if self.egress.fallback_ip.trim().is_empty() {
            anyhow::bail!("Egress fallback IP cannot be empty");
        }

        if self.quota.delete_target_bytes > self.quota.size_limit_bytes {
            anyhow::bail!(
                "Quota delete target ({} bytes) cannot exceed the size limit ({} bytes)",
                self.quota.delete_target_bytes,
                self.quota.size_limit_bytes
            );
        }

        if self.quota.list_limit == 0 {
            anyhow::bail!("Quota list limit must be greater than 0");
        }

        if self.storage.bucket.trim().is_empty() {
            anyhow::bail!("Storage bucket cannot be empty");
        }

        if self.enrichment.client_id.is_empty() || self.enrichment.client_secret.is_empty() {
            tracing::warn!("IPAY_CLIENT_ID/IPAY_CLIENT_SECRET not set - challan lookups will be rejected");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
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
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            enrichment: EnrichmentConfig::default(),
            egress: EgressConfig::default(),
            quota: QuotaConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quota.threshold_bytes(), 824 * 1024 * 1024);
    }

    #[test]
    fn test_delete_target_above_limit_is_rejected() {
        let mut config = Config::default();
        config.quota.delete_target_bytes = config.quota.size_limit_bytes + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_pool_bounds_are_rejected() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_secret_is_redacted_in_debug() {
        let config = EnrichmentConfig {
            client_secret: "super-secret".to_string(),
            ..EnrichmentConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    #[serial]
    fn test_load_reads_pipeline_overrides() {
        std::env::set_var("QUOTA_SIZE_LIMIT_BYTES", "5000");
        std::env::set_var("QUOTA_DELETE_TARGET_BYTES", "1000");
        std::env::set_var("EGRESS_FALLBACK_IP", "10.0.0.1");
        std::env::set_var("CHALLAN_PORT", "not-a-port");

        let config = Config::load().expect("config should load");

        std::env::remove_var("QUOTA_SIZE_LIMIT_BYTES");
        std::env::remove_var("QUOTA_DELETE_TARGET_BYTES");
        std::env::remove_var("EGRESS_FALLBACK_IP");
        std::env::remove_var("CHALLAN_PORT");

        assert_eq!(config.quota.threshold_bytes(), 4000);
        assert_eq!(config.egress.fallback_ip, "10.0.0.1");
        assert_eq!(config.server.port, DEFAULT_SERVER_PORT);
    }
}
