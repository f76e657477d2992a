use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calibration::EngineConfig;
use crate::simulate::SimulationConfig;
use crate::Result;

/// Everything one run of the calibration tool needs, read from a TOML file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// JSON file holding one calibration record or a list of them
    #[serde(default)]
    pub input_file: Option<PathBuf>,
    /// Reports are written to `<output_prefix>_<instrument>.txt`, or when creating a template,
    /// the template is written to `output_prefix` itself
    #[serde(default)]
    pub output_prefix: Option<String>,
    /// Print each report to the terminal
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub create_template: bool,
    /// Ignore measured counts and simulate them from the measured EU
    #[serde(default)]
    pub simulate: Option<SimulationConfig>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RunConfig {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid run configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        log::debug!("run configuration {config:?}");
        Ok(config)
    }
}
