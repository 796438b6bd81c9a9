use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::{Ipv6Addr, SocketAddr};

use crate::scorer::{DEFAULT_FEATURE_MEAN, DEFAULT_FEATURE_STD_DEV, DEFAULT_SEED, SeedMode};

pub const DEFAULT_PORT: u16 = 50051;

/// What the service does with an offer document it cannot extract trips from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidInputPolicy {
    /// Answer the call with an `INVALID_ARGUMENT` status.
    #[default]
    Reject,
    /// Terminate the process with the error's exit code.
    Exit,
}

/// Runtime settings of the categorizer.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "listen_addr": "[::]:50051",
///   "seed": 830,
///   "seed_mode": "per_call",
///   "on_invalid_input": "reject",
///   "feature_mean": 0.3,
///   "feature_std_dev": 0.2
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub seed: u64,
    pub seed_mode: SeedMode,
    pub on_invalid_input: InvalidInputPolicy,
    pub feature_mean: f64,
    pub feature_std_dev: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv6Addr::UNSPECIFIED, DEFAULT_PORT)),
            seed: DEFAULT_SEED,
            seed_mode: SeedMode::default(),
            on_invalid_input: InvalidInputPolicy::default(),
            feature_mean: DEFAULT_FEATURE_MEAN,
            feature_std_dev: DEFAULT_FEATURE_STD_DEV,
        }
    }
}

impl ServiceConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("Invalid config file '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Loads `path` when given, the defaults otherwise.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
