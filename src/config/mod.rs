mod basic;
mod reconciler;
mod relation;

pub use basic::BasicConfig;
pub use reconciler::ReconcilerConfig;
pub use relation::RelationEndpoint;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core daemon settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Desired state for the reconciler (see `reconciler` table in config.toml).
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Database relation facts, if the dependency is currently related
    /// (see `relation` table in config.toml). Absent means no relation.
    #[serde(default)]
    pub relation: Option<RelationEndpoint>,
}

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    fn figment(path: &Path) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.is_file() {
            figment.merge(Toml::file(path))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and the given TOML file if
    /// present. The reconciler tolerates an incomplete desired state (it
    /// publishes `WaitingForConfig`), so no field is required here.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    /// Loads from `config.toml` in the working directory.
    pub fn from_default_file() -> Result<Self, figment::Error> {
        Self::load(PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
