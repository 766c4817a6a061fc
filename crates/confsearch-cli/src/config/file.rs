use super::defaults::DefaultsConfig;
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_conformers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_window: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perturbation: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMinimizationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps_per_cycle: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_constant: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConstraintsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub atoms: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_displacement: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// Contents of a TOML configuration file. Every key is optional.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<FileSearchConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimization: Option<FileMinimizationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<FileConstraintsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<FileOutputConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// A file that spells out every default value.
    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self {
            search: Some(FileSearchConfig {
                num_conformers: Some(defaults.num_conformers),
                rms_threshold: Some(defaults.rms_threshold),
                energy_window: Some(defaults.energy_window),
                random_seed: None,
                perturbation: Some(defaults.perturbation),
            }),
            minimization: Some(FileMinimizationConfig {
                max_cycles: Some(defaults.max_cycles),
                max_steps_per_cycle: Some(defaults.max_steps_per_cycle),
                force_constant: Some(defaults.force_constant),
            }),
            constraints: None,
            output: Some(FileOutputConfig {
                directory: Some(defaults.output_dir.clone()),
            }),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| CliError::Config(e.to_string()))
    }
}
