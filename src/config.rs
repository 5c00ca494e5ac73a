use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::topology::Topology;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matching: MatchingConfig,
    pub topology_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub case_sensitive: bool,
    /// Minimum byte offset at which "IAM COMPLIANCE" must occur in the current
    /// group name for the IAM final-approval row to fire. Older deployments
    /// used 2 here.
    pub iam_min_offset: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            iam_min_offset: 0,
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        // relative topology paths resolve against the config file's directory
        if let (Some(topology), Some(dir)) = (config.topology_path.as_ref(), path.parent()) {
            if topology.is_relative() {
                config.topology_path = Some(dir.join(topology));
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// The configured topology, or the built-in one when no path is set.
    pub fn topology(&self) -> Result<Topology, ConfigError> {
        match &self.topology_path {
            None => Ok(Topology::builtin()),
            Some(path) => {
                let contents =
                    fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
                        path: path.clone(),
                        source,
                    })?;
                Topology::from_toml(&contents)
            }
        }
    }
}
