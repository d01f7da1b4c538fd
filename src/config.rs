use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;

/// Default upload ceiling: 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    /// Public base URL of this service, used to build absolute document links.
    pub app_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub enabled: bool,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub max_file_size: usize,
}

impl StorageConfig {
    /// Storage is usable only when the feature flag is on and every
    /// connection setting is present.
    pub fn is_configured(&self) -> bool {
        self.enabled
            && self.bucket.is_some()
            && self.region.is_some()
            && self.access_key_id.is_some()
            && self.secret_access_key.is_some()
    }

    pub fn bucket(&self) -> &str {
        self.bucket.as_deref().unwrap_or_default()
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub enabled: bool,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Ask the model for a JSON-schema constrained reply instead of plain text.
    pub structured_output: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            server: ServerConfig {
                port: parse_var("PORT", &or("PORT", "3000"))?,
                host: or("HOST", "0.0.0.0"),
                cors_allowed_origins: or("ALLOWED_ORIGINS", "http://localhost:3000")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                app_url: var("APP_URL"),
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?,
                max_connections: parse_var("DB_MAX_CONNECTIONS", &or("DB_MAX_CONNECTIONS", "10"))?,
                min_connections: parse_var("DB_MIN_CONNECTIONS", &or("DB_MIN_CONNECTIONS", "1"))?,
            },
            storage: StorageConfig {
                enabled: parse_var(
                    "ENABLE_EXPENSE_DOCUMENTS",
                    &or("ENABLE_EXPENSE_DOCUMENTS", "false"),
                )?,
                bucket: var("S3_UPLOAD_BUCKET"),
                region: var("S3_UPLOAD_REGION"),
                access_key_id: var("S3_UPLOAD_KEY"),
                secret_access_key: var("S3_UPLOAD_SECRET"),
                endpoint: var("S3_UPLOAD_ENDPOINT"),
                max_file_size: match var("S3_MAX_FILE_SIZE") {
                    Some(v) => parse_var("S3_MAX_FILE_SIZE", &v)?,
                    None => DEFAULT_MAX_FILE_SIZE,
                },
            },
            extraction: ExtractionConfig {
                enabled: parse_var(
                    "ENABLE_RECEIPT_EXTRACT",
                    &or("ENABLE_RECEIPT_EXTRACT", "false"),
                )?,
                api_key: or("OPENAI_API_KEY", ""),
                base_url: or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                model: or("OPENAI_IMAGE_MODEL", "gpt-5-nano"),
                structured_output: parse_var(
                    "RECEIPT_STRUCTURED_OUTPUT",
                    &or("RECEIPT_STRUCTURED_OUTPUT", "false"),
                )?,
            },
        })
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {value:?}"))
}
