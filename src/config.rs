use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The settings of a monitoring run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The grid has `cells_number × cells_number` areas.
    pub cells_number: usize,
    /// The number of steps summed when comparing an area's emissions to the threshold.
    pub window_size: usize,
    /// The windowed emissions, in mg, at which actions are applied to an area.
    pub emissions_threshold: f64,
    /// The number of steps to simulate.
    pub steps: usize,
    /// Lower the speed of the lanes of polluted areas.
    pub limit_speed: bool,
    /// Shorten the traffic light phases of speed limited areas.
    pub adjust_traffic_lights: bool,
    /// Close polluted areas that have vehicles inside.
    pub lock_area: bool,
    /// Route vehicles with travel time weights updated every step.
    pub weight_routing: bool,
    /// The fraction of the initial speed kept when limiting speed.
    pub speed_factor: f64,
    /// The fraction of the phase durations kept when adjusting traffic lights.
    pub traffic_lights_factor: f64,
    /// The speed of the lanes of a locked area, in m/s.
    pub lock_speed: f64,
    /// Monitor emissions without applying any action.
    pub without_actions: bool,
    /// Where the reference total is written in without-actions mode, and read otherwise.
    pub reference: Option<PathBuf>,
    /// Add the grid to the simulator as polygons.
    pub draw_grid: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cells_number: 10,
            window_size: 100,
            emissions_threshold: 500_000.0,
            steps: 200,
            limit_speed: true,
            adjust_traffic_lights: true,
            lock_area: false,
            weight_routing: false,
            speed_factor: 0.5,
            traffic_lights_factor: 0.5,
            lock_speed: 0.1,
            without_actions: false,
            reference: None,
            draw_grid: true,
        }
    }
}

impl Config {
    /// Reads a configuration from a JSON file. Missing fields take their default value.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let unreadable = |reason: String| ConfigError::Unreadable {
            path: path.to_owned(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cells_number == 0 {
            return Err(ConfigError::InvalidGridSize);
        }
        if self.window_size == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        if !(self.emissions_threshold > 0.0) {
            return Err(ConfigError::InvalidThreshold(self.emissions_threshold));
        }
        for (name, value) in [
            ("speed_factor", self.speed_factor),
            ("traffic_lights_factor", self.traffic_lights_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidFactor { name, value });
            }
        }
        if !(self.lock_speed >= 0.0) {
            return Err(ConfigError::InvalidLockSpeed(self.lock_speed));
        }
        Ok(())
    }

    /// Returns true if the run may apply any action.
    pub fn actions_enabled(&self) -> bool {
        !self.without_actions
            && (self.limit_speed || self.adjust_traffic_lights || self.lock_area || self.weight_routing)
    }
}
