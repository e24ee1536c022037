//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `NATS_URL` - NATS server for domain events; events are only logged when unset
//! - `BACKUP_DIR` - Directory for JSON backups (default: ./backup)
//! - `SHIPPING_FEE` - Flat shipping fee in VND (default: 30000)
//! - `VAT_RATE` - VAT as a fraction (default: 0.08)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub nats_url: Option<String>,
    pub backup_dir: PathBuf,
    pub db_max_connections: u32,
    pub pricing: PricingConfig,
}

/// Store-wide inputs to checkout pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    pub shipping_fee: Decimal,
    pub vat_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { shipping_fee: Decimal::new(30_000, 0), vat_rate: Decimal::new(8, 2) }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".into()))?;
        let defaults = PricingConfig::default();

        let vat_rate: Decimal = parse_or(&lookup, "VAT_RATE", defaults.vat_rate)?;
        if vat_rate.is_sign_negative() || vat_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar("VAT_RATE".into(), "must be a fraction in [0, 1)".into()));
        }
        let shipping_fee: Decimal = parse_or(&lookup, "SHIPPING_FEE", defaults.shipping_fee)?;
        if shipping_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar("SHIPPING_FEE".into(), "must not be negative".into()));
        }

        Ok(Self {
            database_url,
            host: parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&lookup, "PORT", 8083)?,
            nats_url: lookup("NATS_URL").filter(|v| !v.trim().is_empty()),
            backup_dir: lookup("BACKUP_DIR").map_or_else(|| PathBuf::from("./backup"), PathBuf::from),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            pricing: PricingConfig { shipping_fee, vat_rate },
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.into(), e.to_string())),
    }
}
