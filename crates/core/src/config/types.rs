use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::auth::ActorRole;
use crate::pricing::{PriceTable, PricingError, RateEntry, DEFAULT_COMMISSION_RATE};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Keys accepted when `method = "api_key"`.
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Identity headers set by a trusted gateway.
    Header,
    /// Static API keys mapped to identities.
    ApiKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Header => "header",
            AuthMethod::ApiKey => "api_key",
        }
    }
}

/// One accepted API key and the identity it authenticates as.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
    pub role: ActorRole,
    #[serde(default)]
    pub clinic_id: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("labflow.db")
}

/// Object storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Required when `backend = "fs"`.
    #[serde(default)]
    pub fs: Option<FsStorageConfig>,
    /// Required when `backend = "http"`.
    #[serde(default)]
    pub http: Option<HttpStorageConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            fs: Some(FsStorageConfig {
                root: default_storage_root(),
            }),
            http: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Fs,
    Http,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Fs => "fs",
            StorageBackend::Http => "http",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FsStorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("objects")
}

/// Remote bucket gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpStorageConfig {
    /// Base URL objects are addressed under (e.g., "https://files.example.com/cases")
    pub base_url: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

/// Pricing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,
    /// Overrides built-in rates for the products it names.
    #[serde(default)]
    pub rates: Vec<RateEntry>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            commission_rate: default_commission_rate(),
            rates: Vec::new(),
        }
    }
}

fn default_commission_rate() -> Decimal {
    DEFAULT_COMMISSION_RATE
}

impl PricingConfig {
    pub fn price_table(&self) -> Result<PriceTable, PricingError> {
        let rates = crate::pricing::merge_rates(self.rates.clone());
        PriceTable::new(rates, self.commission_rate)
    }
}

/// Batch export configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Number of storage fetches in flight while assembling an archive
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

fn default_fetch_concurrency() -> usize {
    4
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: SanitizedStorageConfig,
    pub pricing: SanitizedPricingConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_keys_configured: usize,
}

/// Sanitized storage config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<SanitizedHttpStorageConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedHttpStorageConfig {
    pub base_url: String,
    pub token_configured: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPricingConfig {
    pub commission_rate: Decimal,
    pub custom_rates: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
                api_keys_configured: config.auth.api_keys.len(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            storage: SanitizedStorageConfig {
                backend: config.storage.backend.as_str().to_string(),
                fs_root: config.storage.fs.as_ref().map(|fs| fs.root.clone()),
                http: config
                    .storage
                    .http
                    .as_ref()
                    .map(|h| SanitizedHttpStorageConfig {
                        base_url: h.base_url.clone(),
                        token_configured: h.token.as_ref().is_some_and(|t| !t.is_empty()),
                        timeout_secs: h.timeout_secs,
                    }),
            },
            pricing: SanitizedPricingConfig {
                commission_rate: config.pricing.commission_rate,
                custom_rates: config.pricing.rates.len(),
            },
            export: config.export.clone(),
        }
    }
}
