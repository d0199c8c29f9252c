use crate::config::Config;
use crate::error::{ConfigError, Error};
use crate::policy::ActionEvent;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The outcome of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    /// The number of steps simulated.
    pub steps: usize,
    /// The emissions of the whole run summed over every area, in mg.
    pub total_emissions: f64,
    /// The total of the reference run this one is compared to.
    pub reference_emissions: Option<f64>,
    /// Every action applied, reverted or failed, in order.
    pub events: Vec<ActionEvent>,
    /// The configuration of the run.
    pub config: Config,
}

/// The total emissions of a run made without actions, used as a baseline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub total_emissions: f64,
    pub steps: usize,
}

impl Report {
    /// The emission reduction relative to the reference run, in percent.
    pub fn reduction_percent(&self) -> Option<f64> {
        let reference = self.reference_emissions?;
        (reference != 0.0).then(|| (reference - self.total_emissions) / reference * 100.0)
    }

    /// The number of successful activations.
    pub fn activations(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ActionEvent::Activated { .. }))
            .count()
    }

    /// The baseline this run provides to other runs.
    pub fn reference(&self) -> Reference {
        Reference {
            total_emissions: self.total_emissions,
            steps: self.steps,
        }
    }

    /// Writes the end of run statistics to the log.
    pub fn log_summary(&self) {
        info!("Total emissions = {} mg", self.total_emissions);
        if let Some(reduction) = self.reduction_percent() {
            info!("Reduction percentage of emissions = {} %", reduction);
        }
        info!(
            "{} steps, {} actions applied, with the configuration: {:?}",
            self.steps,
            self.activations(),
            self.config
        );
    }
}

impl Reference {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let missing = |reason: String| ConfigError::MissingReference {
            path: path.to_owned(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| missing(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| missing(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let failed = |reason: String| Error::ReferenceWrite {
            path: path.to_owned(),
            reason,
        };
        let content = serde_json::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))
    }
}
