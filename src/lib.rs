//! Monitors the pollutant emissions of a road traffic simulation over a grid of areas,
//! and reacts to polluted areas by limiting their speed, shortening their traffic
//! light phases, and locking them. Every action is reverted once the area is clean.

pub use cgmath;
pub use config::Config;
pub use controller::{run, Aborted, Controller};
pub use emission::{sample_vehicles, Pollutants, VehicleSample};
pub use error::{ActionError, ConfigError, Error, ObjectKind, SimulationError};
pub use grid::{Area, Grid};
pub use network::{Lane, Logic, Phase, TrafficLight};
pub use policy::{Action, ActionEvent, AreaState, Policy, SpeedState};
pub use report::{Reference, Report};
pub use simulator::{Color, Simulator};
pub use util::Interval;
pub use window::EmissionSeries;

pub mod actions;
mod config;
mod controller;
mod emission;
mod error;
mod grid;
pub mod math;
mod network;
mod policy;
mod report;
pub mod sim;
mod simulator;
mod util;
mod window;
