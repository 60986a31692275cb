//! kedactl configuration stored at `~/.kedactl/config.json`.
//!
//! The file is optional and only holds CLI defaults; workload state always
//! lives in the cluster. Any field left out falls back to the built-in default.
//!
//! The kubeconfig resolution chain (highest priority first):
//! 1. Explicit `--kubeconfig` flag
//! 2. `KEDACTL_KUBECONFIG` environment variable
//! 3. `kubeconfig` in `~/.kedactl/config.json`
//! 4. Fall back to kube defaults (`KUBECONFIG` env / `~/.kube/config` / in-cluster)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;
use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".kedactl";
const CONFIG_FILE_NAME: &str = "config.json";
const KEDACTL_KUBECONFIG_ENV: &str = "KEDACTL_KUBECONFIG";

/// Default number of KEDA operator readiness checks
pub const DEFAULT_KEDA_READY_ATTEMPTS: u32 = 10;
/// Default delay between KEDA operator readiness checks
pub const DEFAULT_KEDA_READY_INTERVAL_SECS: u64 = 5;
/// Default number of Deployment read-back attempts after `helm install`
pub const DEFAULT_READBACK_ATTEMPTS: u32 = 6;

/// Persistent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct KedactlConfig {
    /// Kubeconfig path used when neither flag nor env var is set
    pub kubeconfig: Option<String>,
    /// Chart used by `create-deployment --strategy helm` without `--chart-path`
    pub chart_path: Option<String>,
    /// Number of KEDA operator readiness checks
    pub keda_ready_attempts: Option<u32>,
    /// Seconds between KEDA operator readiness checks
    pub keda_ready_interval_secs: Option<u64>,
    /// Number of Deployment read-back attempts after `helm install`
    pub readback_attempts: Option<u32>,
}

impl KedactlConfig {
    /// Fixed-interval poll budget for the KEDA operator, at least one check
    pub fn keda_readiness(&self) -> RetryConfig {
        RetryConfig::fixed(
            self.keda_ready_attempts
                .unwrap_or(DEFAULT_KEDA_READY_ATTEMPTS)
                .max(1),
            Duration::from_secs(
                self.keda_ready_interval_secs
                    .unwrap_or(DEFAULT_KEDA_READY_INTERVAL_SECS),
            ),
        )
    }

    /// Backoff budget for reading the Deployment back after a Helm release,
    /// at least one read
    pub fn helm_readback(&self) -> RetryConfig {
        RetryConfig::with_max_attempts(
            self.readback_attempts
                .unwrap_or(DEFAULT_READBACK_ATTEMPTS)
                .max(1),
        )
    }
}

/// Returns `~/.kedactl/`.
pub fn kedactl_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::validation("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Path to `~/.kedactl/config.json`.
pub fn config_path() -> Result<PathBuf> {
    Ok(kedactl_dir()?.join(CONFIG_FILE_NAME))
}

/// Load config from `~/.kedactl/config.json`, returning default if missing.
pub fn load_config() -> Result<KedactlConfig> {
    load_config_from(&config_path()?)
}

/// Load config from an explicit path, returning default if missing.
pub fn load_config_from(path: &Path) -> Result<KedactlConfig> {
    if !path.exists() {
        return Ok(KedactlConfig::default());
    }
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| {
        Error::validation(format!("failed to parse {}: {}", path.display(), e))
    })
}

/// Resolve a kubeconfig path using the priority chain.
///
/// Returns `Some(path)` if a kubeconfig is configured, `None` to use kube defaults.
pub fn resolve_kubeconfig(explicit: Option<&str>, config: &KedactlConfig) -> Option<String> {
    resolve_kubeconfig_with_env(explicit, std::env::var(KEDACTL_KUBECONFIG_ENV).ok(), config)
}

fn resolve_kubeconfig_with_env(
    explicit: Option<&str>,
    env: Option<String>,
    config: &KedactlConfig,
) -> Option<String> {
    if let Some(path) = explicit {
        return Some(path.to_string());
    }

    if let Some(path) = env.filter(|p| !p.is_empty()) {
        return Some(path);
    }

    config.kubeconfig.clone().filter(|p| !p.is_empty())
}
