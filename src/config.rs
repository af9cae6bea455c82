use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::balance::cache::DEFAULT_BALANCE_TTL;
use crate::error::LedgerError;
use crate::reconcile::{ReconcilerConfig, ReconcilerSettings};
use crate::retry::{RetryPolicy, RetrySettings};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Unmute the `LEDGER_TRACE` target (per-candidate decisions)
    pub enable_tracing: bool,
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub reconciler: ReconcilerSettings,
    /// Not-found retry for operation route lookups
    #[serde(default)]
    pub route_lookup: RetrySettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    pub balance_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            balance_ttl_secs: DEFAULT_BALANCE_TTL.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn balance_ttl(&self) -> Duration {
        if self.balance_ttl_secs == 0 {
            DEFAULT_BALANCE_TTL
        } else {
            Duration::from_secs(self.balance_ttl_secs)
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, LedgerError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| LedgerError::Config(format!("read {config_path}: {e}")))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, LedgerError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig::from_settings(&self.reconciler)
    }

    pub fn route_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_settings(&self.route_lookup)
    }
}
