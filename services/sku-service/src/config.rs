use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use epg_sku::{OrgPrefix, SkuFormat, DEFAULT_ORG_PREFIX, DEFAULT_SEQUENCE_WIDTH};

use crate::allocator::{PrefixConfigError, PrefixResolver};
use crate::db::DbConfig;

/// Where allocation state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Single-process only; counters are lost on restart.
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => bail!("unknown storage backend '{other}' (expected postgres or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub storage: StorageBackend,
    pub prefix_file: Option<PathBuf>,
    pub sku_format: SkuFormat,
    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.database = DbConfig::from_env();
        Ok(config)
    }

    /// Builds the service settings from a variable lookup.
    ///
    /// Database settings are left at their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = lookup("EPG_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse::<SocketAddr>()
            .context("EPG_LISTEN_ADDR")?;

        let log_level = lookup("EPG_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let dev_mode = lookup("EPG_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let storage = lookup("EPG_STORAGE")
            .map(|v| v.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::Postgres);

        let prefix_file = lookup("EPG_PREFIX_FILE").map(PathBuf::from);

        let org_prefix = lookup("EPG_SKU_ORG_PREFIX")
            .unwrap_or_else(|| DEFAULT_ORG_PREFIX.to_string());
        let org_prefix =
            OrgPrefix::parse(&org_prefix.trim().to_ascii_uppercase()).context("EPG_SKU_ORG_PREFIX")?;

        let sequence_width = match lookup("EPG_SKU_SEQUENCE_WIDTH") {
            Some(v) => v.trim().parse::<usize>().context("EPG_SKU_SEQUENCE_WIDTH")?,
            None => DEFAULT_SEQUENCE_WIDTH,
        };
        let sku_format =
            SkuFormat::new(org_prefix, sequence_width).context("EPG_SKU_SEQUENCE_WIDTH")?;

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            storage,
            prefix_file,
            sku_format,
            database: DbConfig::default(),
        })
    }

    /// Loads the configured prefix table, or the built-in one.
    pub fn prefix_resolver(&self) -> Result<PrefixResolver, PrefixConfigError> {
        match &self.prefix_file {
            Some(path) => PrefixResolver::load(path),
            None => Ok(PrefixResolver::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.dev_mode);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.sku_format, SkuFormat::default());
        assert!(config.prefix_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("EPG_DEV", "true"),
            ("EPG_STORAGE", "memory"),
            ("EPG_SKU_ORG_PREFIX", "rnt"),
            ("EPG_SKU_SEQUENCE_WIDTH", "6"),
        ]))
        .unwrap();
        assert!(config.dev_mode);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.sku_format.org_prefix().as_str(), "RNT");
        assert_eq!(config.sku_format.sequence_width(), 6);
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_lookup(lookup(&[("EPG_STORAGE", "redis")])).is_err());
        assert!(Config::from_lookup(lookup(&[("EPG_SKU_ORG_PREFIX", "EPGX")])).is_err());
        assert!(Config::from_lookup(lookup(&[("EPG_SKU_SEQUENCE_WIDTH", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("EPG_SKU_SEQUENCE_WIDTH", "four")])).is_err());
        assert!(Config::from_lookup(lookup(&[("EPG_LISTEN_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn test_missing_prefix_file() {
        let config =
            Config::from_lookup(lookup(&[("EPG_PREFIX_FILE", "/nonexistent/prefixes.toml")]))
                .unwrap();
        assert!(config.prefix_resolver().is_err());
    }
}
