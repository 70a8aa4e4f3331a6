use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tabulate::{RunMode, UnknownRunMode};

fn default_weight() -> f64 {
    1.
}

fn default_luminosity() -> f64 {
    10_000.
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read run configuration from {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed run configuration in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Run parameters, usually read from a YAML file
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Per-event debug logging
    #[serde(default)]
    pub verbose: bool,
    /// Whether the input is real data
    pub is_data: bool,
    /// Input type (0: B2G ntuple, 1: jet-toolbox collections)
    pub in_type: i32,
    /// Cross section of the sample
    pub sigma: f64,
    /// Event weight
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Jet selection threshold
    pub cut_pt: f64,
    /// Correction-set version, e.g. "Summer15_25nsV6"
    pub jec_version: String,
    /// Directory holding the correction parameter files
    #[serde(default)]
    pub jec_dir: PathBuf,
    /// Integrated luminosity in inverse pb
    #[serde(default = "default_luminosity")]
    pub luminosity: f64,
}

impl RunConfig {
    /// Read a run configuration from the YAML file at `path`
    pub fn from_yaml_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|source| {
            ConfigError::Parse {
                path: path.to_owned(),
                source,
            }
        })
    }

    /// The configured run mode
    ///
    /// Rejecting unknown input types here keeps bad configurations from
    /// reaching the event loop.
    pub fn mode(&self) -> Result<RunMode, UnknownRunMode> {
        RunMode::try_from(self.in_type)
    }
}
