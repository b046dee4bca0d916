use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{PolicyName, PolicyTable};

/// Backoff constants for one named policy (`[policies.<name>]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverride {
    /// Delay in seconds before the first retry (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Ceiling in seconds for the exponential schedule, before jitter.
    pub max_backoff_secs: f64,
}

/// Global configuration loaded from `~/.config/throttle/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Optional `tracing` filter directive; `RUST_LOG` still takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    /// Per-policy overrides keyed by policy label; missing entries use built-ins.
    #[serde(default)]
    pub policies: BTreeMap<String, PolicyOverride>,
}

impl ThrottleConfig {
    /// Built-in policy table with this config's overrides applied.
    pub fn policy_table(&self) -> Result<PolicyTable> {
        PolicyTable::from_config(self)
    }
}

impl PolicyTable {
    pub fn from_config(cfg: &ThrottleConfig) -> Result<Self> {
        let mut table = PolicyTable::default();
        for (label, ov) in &cfg.policies {
            let name: PolicyName = label.parse()?;
            let base = secs_to_duration(ov.base_delay_secs)
                .with_context(|| format!("policies.{label}.base_delay_secs"))?;
            let max = secs_to_duration(ov.max_backoff_secs)
                .with_context(|| format!("policies.{label}.max_backoff_secs"))?;
            if base.is_zero() {
                bail!("policies.{label}.base_delay_secs must be greater than zero");
            }
            if max < base {
                bail!("policies.{label}: max_backoff_secs is smaller than base_delay_secs");
            }
            table.set_delays(name, base, max);
        }
        Ok(table)
    }
}

fn secs_to_duration(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid duration: {secs}"))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("throttle")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<ThrottleConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ThrottleConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.policy_table()?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ThrottleConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ThrottleConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}
