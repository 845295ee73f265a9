// Daemon Settings
// Layers: built-in defaults < config file < SALONQ_* environment

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use salonq_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use salonq_core::application::constants::{DEFAULT_RESET_AT, DEFAULT_ROOM_CAPACITY};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SALONQ";
const CONFIG_PATH_VAR: &str = "SALONQ_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "~/.salonq/config.toml";
const DEFAULT_DB_PATH: &str = "~/.salonq/salonq.db";
const DEFAULT_RATE_LIMIT_BURST: i64 = 200;
const DEFAULT_RATE_LIMIT_RATE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    /// Local wall-clock time of the nightly reset, `HH:MM`
    pub reset_at: String,
    pub log_format: LogFormat,
    /// Daily rolling log files are written here when set
    #[serde(default)]
    pub log_dir: Option<String>,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
    pub room_capacity: usize,
}

impl DaemonConfig {
    /// Load from `SALONQ_CONFIG` (or `~/.salonq/config.toml`) and the environment
    pub fn load() -> Result<Self> {
        let file = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => PathBuf::from(shellexpand::tilde(&path).as_ref()),
            Err(_) => PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref()),
        };
        Self::load_from(&file, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(file: &Path, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("rpc_host", DEFAULT_RPC_HOST)?
            .set_default("rpc_port", i64::from(DEFAULT_RPC_PORT))?
            .set_default("reset_at", DEFAULT_RESET_AT)?
            .set_default("log_format", "pretty")?
            .set_default("rate_limit_burst", DEFAULT_RATE_LIMIT_BURST)?
            .set_default("rate_limit_rate", DEFAULT_RATE_LIMIT_RATE)?
            .set_default("room_capacity", DEFAULT_ROOM_CAPACITY as i64)?
            .add_source(File::from(file).required(false))
            .add_source(env.try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read configuration ({})", file.display()))?;

        config
            .try_deserialize()
            .context("Invalid daemon configuration")
    }

    /// Database file with `~` expanded
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).as_ref())
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig::load_from(&dir.path().join("missing.toml"), env(&[])).unwrap();

        assert_eq!(config.rpc_host, "127.0.0.1");
        assert_eq!(config.rpc_port, 9630);
        assert_eq!(config.reset_at, "00:00");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.log_dir.is_none());
        assert_eq!(config.rate_limit_burst, 200);
        assert_eq!(config.rate_limit_rate, 100);
        assert_eq!(config.room_capacity, 64);
        assert!(config.database_path().ends_with(".salonq/salonq.db"));
    }

    #[test]
    fn test_file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            "rpc_port = 7000\nreset_at = \"03:30\"\nlog_format = \"json\"\n",
        )
        .unwrap();

        let config = DaemonConfig::load_from(
            &file,
            env(&[("SALONQ_RPC_PORT", "7100"), ("SALONQ_ROOM_CAPACITY", "8")]),
        )
        .unwrap();

        assert_eq!(config.rpc_port, 7100);
        assert_eq!(config.reset_at, "03:30");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.room_capacity, 8);
    }

    #[test]
    fn test_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        assert!(DaemonConfig::load_from(&missing, env(&[("SALONQ_RPC_PORT", "huge")])).is_err());
        assert!(
            DaemonConfig::load_from(&missing, env(&[("SALONQ_LOG_FORMAT", "xml")])).is_err()
        );
    }
}
