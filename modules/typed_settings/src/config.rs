//! Configuration for the settings store

use crate::domain::SharingPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Settings store configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// JSON file holding the settings; in-memory store when absent
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Pretty-print the JSON file
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// How long a shared setting keeps observing after its last subscriber leaves
    #[serde(default = "default_grace_period", with = "humantime_serde")]
    pub grace_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_path: None,
            pretty: true,
            grace_period: default_grace_period(),
        }
    }
}

impl Config {
    /// Sharing policy for `materialize` derived from `grace_period`
    pub fn sharing_policy(&self) -> SharingPolicy {
        SharingPolicy::WhileSubscribed {
            grace: self.grace_period,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_grace_period() -> Duration {
    Duration::from_secs(5)
}
