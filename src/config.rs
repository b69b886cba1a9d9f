//! Configuration bundle
//!
//! Connection parameters come from the environment (a `.env` file is loaded by
//! the binary first). The database and table names are fixed.

use crate::error::{LookupError, Result};
use std::path::PathBuf;

pub const DATABASE: &str = "FREE_COMPANY_DATASET";
pub const TABLE: &str = "FREECOMPANYDATASET";

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "savorlocal";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub reference: ReferenceConfig,
    pub geocoder: GeocoderConfig,
    pub dataset: DatasetConfig,
}

/// Text resources backing the form's select boxes.
#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    pub industry_file: PathBuf,
    pub size_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
}

/// Where company rows come from.
#[derive(Debug, Clone)]
pub enum DatasetConfig {
    Warehouse(WarehouseConfig),
    /// CSV or Parquet extract read with Polars.
    Local(PathBuf),
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub base_url: String,
    pub token: String,
    pub token_type: String,
    pub database: String,
    pub schema: String,
    pub table: String,
    pub warehouse: Option<String>,
    pub role: Option<String>,
}

impl AppConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let geocoder = GeocoderConfig {
            base_url: get("GEOCODER_URL")
                .unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            user_agent: get("GEOCODER_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        };

        let dataset = match get("SAVORLOCAL_DATASET") {
            Some(path) => DatasetConfig::Local(PathBuf::from(path)),
            None => DatasetConfig::Warehouse(WarehouseConfig::from_lookup(&get)?),
        };

        Ok(Self {
            reference: ReferenceConfig::from_lookup(&lookup),
            geocoder,
            dataset,
        })
    }
}

impl ReferenceConfig {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };
        Self {
            industry_file: path("SAVORLOCAL_INDUSTRY_FILE", "industry.txt"),
            size_file: path("SAVORLOCAL_SIZE_FILE", "size.txt"),
        }
    }
}

impl WarehouseConfig {
    fn from_lookup<F>(get: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match get("SNOWFLAKE_HOST") {
            Some(host) => host,
            None => {
                let account = get("SNOWFLAKE_ACCOUNT").ok_or_else(|| {
                    LookupError::Config(
                        "SNOWFLAKE_ACCOUNT is not set (or set SAVORLOCAL_DATASET for a local extract)"
                            .to_string(),
                    )
                })?;
                format!("https://{}.snowflakecomputing.com", account)
            }
        };
        let token = get("SNOWFLAKE_TOKEN")
            .ok_or_else(|| LookupError::Config("SNOWFLAKE_TOKEN is not set".to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            token_type: get("SNOWFLAKE_TOKEN_TYPE").unwrap_or_else(|| "KEYPAIR_JWT".to_string()),
            database: DATABASE.to_string(),
            schema: get("SNOWFLAKE_SCHEMA").unwrap_or_else(|| "PUBLIC".to_string()),
            table: TABLE.to_string(),
            warehouse: get("SNOWFLAKE_WAREHOUSE"),
            role: get("SNOWFLAKE_ROLE"),
        })
    }
}
