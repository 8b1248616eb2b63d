use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::throttle::Throttle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("input file not found: {0}")]
    MissingInput(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub currency: String,
    pub page_size: usize,
    pub stock_location_id: Option<String>,
    pub shipping_profile_id: Option<String>,
    pub sales_channel_id: Option<String>,
    pub product_status: String,
    pub throttle: Throttle,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            currency: "eur".into(),
            page_size: 100,
            stock_location_id: None,
            shipping_profile_id: None,
            sales_channel_id: None,
            product_status: "published".into(),
            throttle: Throttle::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let throttle = Throttle {
            delay: Duration::from_millis(env_parse("REQUEST_DELAY_MS").unwrap_or(250)),
            base_backoff: Duration::from_millis(env_parse("RATE_LIMIT_BACKOFF_MS").unwrap_or(1000)),
            max_retries: env_parse("RATE_LIMIT_MAX_RETRIES").unwrap_or(5),
        };
        Self {
            currency: env_string("TARGET_CURRENCY")
                .map(|value| value.to_lowercase())
                .unwrap_or(defaults.currency),
            page_size: env_parse::<usize>("CATALOG_PAGE_SIZE")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.page_size),
            stock_location_id: env_string("MEDUSA_STOCK_LOCATION_ID"),
            shipping_profile_id: env_string("MEDUSA_SHIPPING_PROFILE_ID"),
            sales_channel_id: env_string("MEDUSA_SALES_CHANNEL_ID"),
            product_status: env_string("PRODUCT_STATUS").unwrap_or(defaults.product_status),
            throttle,
        }
    }

    pub fn require_stock_location(&self) -> Result<&str, ConfigError> {
        self.stock_location_id
            .as_deref()
            .ok_or(ConfigError::MissingVar("MEDUSA_STOCK_LOCATION_ID"))
    }
}

pub fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

pub fn parse_delimiter(raw: &str) -> Result<u8, ConfigError> {
    let value = match raw {
        "\\t" | "tab" => "\t",
        other => other,
    };
    match value.as_bytes() {
        [byte] if *byte != b'"' && *byte != b'\n' => Ok(*byte),
        _ => Err(ConfigError::InvalidValue {
            key: "delimiter",
            value: raw.to_string(),
        }),
    }
}
