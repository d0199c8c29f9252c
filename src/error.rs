//! Error types.
//!
//! Failures are split by how far they reach: a [ConfigError] stops the run before it starts,
//! a [SimulationError] means the simulator connection is unusable and aborts the run, and an
//! [ActionError] only concerns a single lane, traffic light or vehicle call.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top level error of a run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Could not write reference file {}: {reason}", .path.display())]
    ReferenceWrite { path: PathBuf, reason: String },
}

/// Invalid or missing configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Grid cell count must be positive")]
    InvalidGridSize,

    #[error("Window size must be positive")]
    InvalidWindow,

    #[error("Emission threshold must be positive, got {0}")]
    InvalidThreshold(f64),

    #[error("{name} must be within [0, 1], got {value}")]
    InvalidFactor { name: &'static str, value: f64 },

    #[error("Lock speed must be non-negative, got {0}")]
    InvalidLockSpeed(f64),

    #[error("Reference file {} is unavailable: {reason}", .path.display())]
    MissingReference { path: PathBuf, reason: String },

    #[error("Could not read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Invalid scenario: {0}")]
    Scenario(String),
}

/// Failure of the connection to the simulator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Could not connect to the simulator: {0}")]
    Connection(String),

    #[error("Connection to the simulator is closed")]
    Closed,

    #[error("Unknown {kind} '{id}'")]
    UnknownObject { kind: ObjectKind, id: String },
}

/// Failure of a single action call on the simulator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Unknown {kind} '{id}'")]
    UnknownObject { kind: ObjectKind, id: String },

    #[error("{kind} '{id}' rejected the change: {reason}")]
    Rejected {
        kind: ObjectKind,
        id: String,
        reason: String,
    },

    #[error("Connection to the simulator is closed")]
    Closed,
}

/// The kind of simulator object an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Lane,
    TrafficLight,
    Vehicle,
    Polygon,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::Lane => "lane",
            ObjectKind::TrafficLight => "traffic light",
            ObjectKind::Vehicle => "vehicle",
            ObjectKind::Polygon => "polygon",
        })
    }
}
