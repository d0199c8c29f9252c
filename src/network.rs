//! The static part of the road network: lanes, traffic lights and their signal programs,
//! and which of them belong to which area of the grid.

use crate::error::SimulationError;
use crate::grid::Grid;
use crate::math::Point2d;
use crate::simulator::Simulator;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A lane of the road network.
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    pub id: String,
    /// The centre line of the lane.
    pub shape: Vec<Point2d>,
    /// The maximum speed in m/s before any action modified it.
    pub initial_max_speed: f64,
}

/// A traffic light with a copy of its signal programs, as they were before any action.
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficLight {
    pub id: String,
    pub logics: Vec<Logic>,
    /// The program ID of the logic that was running.
    pub active_program: String,
}

impl TrafficLight {
    /// The logics in the order they are pushed to the simulator: the running one last,
    /// since pushing a logic also switches the traffic light to it.
    pub fn logics_running_last(&self) -> impl Iterator<Item = &Logic> {
        let (running, others): (Vec<_>, Vec<_>) = self
            .logics
            .iter()
            .partition(|logic| logic.program_id == self.active_program);
        others.into_iter().chain(running)
    }
}

/// A signal program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Logic {
    pub program_id: String,
    /// The phases, in cycle order.
    pub phases: Vec<Phase>,
}

/// A signal timing state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Duration in s.
    pub duration: f64,
    /// Minimum duration in s.
    pub min_duration: f64,
    /// Maximum duration in s.
    pub max_duration: f64,
    /// The signal state of each controlled lane, e.g. `"GGrr"`.
    pub state: String,
}

impl Phase {
    /// Creates a fixed-time phase.
    pub fn new(duration: f64, state: impl Into<String>) -> Self {
        Self {
            duration,
            min_duration: duration,
            max_duration: duration,
            state: state.into(),
        }
    }

    /// Scales the duration and its bounds by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            duration: self.duration * factor,
            min_duration: self.min_duration * factor,
            max_duration: self.max_duration * factor,
            state: self.state.clone(),
        }
    }
}

impl Logic {
    /// Scales the duration of every phase by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            program_id: self.program_id.clone(),
            phases: self.phases.iter().map(|p| p.scaled(factor)).collect(),
        }
    }

    /// The duration of a full cycle in s.
    pub fn cycle_time(&self) -> f64 {
        self.phases.iter().map(|p| p.duration).sum()
    }
}

/// Reads every lane of the network, recording its current speed as the initial one.
pub fn read_lanes<S: Simulator + ?Sized>(sim: &S) -> Result<Vec<Lane>, SimulationError> {
    sim.lane_ids()?
        .into_iter()
        .map(|id| {
            let shape = sim.lane_shape(&id)?;
            let initial_max_speed = sim.lane_max_speed(&id)?;
            Ok(Lane {
                id,
                shape,
                initial_max_speed,
            })
        })
        .collect()
}

/// Attaches to every area of the grid the lanes crossing it, and the traffic lights
/// controlling at least one of those lanes.
///
/// The network is static during a run, so this is done once before the first step.
pub fn index_network<S: Simulator + ?Sized>(
    grid: &mut Grid,
    sim: &S,
) -> Result<(), SimulationError> {
    let lanes = read_lanes(sim)?.into_iter().map(Rc::new).collect::<Vec<_>>();

    let controllers = sim
        .traffic_light_ids()?
        .into_iter()
        .map(|id| {
            let lanes = sim.controlled_lanes(&id)?.into_iter().collect::<HashSet<_>>();
            Ok((id, lanes))
        })
        .collect::<Result<Vec<_>, SimulationError>>()?;

    // Programs are fetched lazily, and shared between the areas of a traffic light
    let mut programs: HashMap<&str, Rc<TrafficLight>> = HashMap::new();

    for area in grid.areas_mut() {
        for lane in &lanes {
            if !area.rect().intersects_polyline(&lane.shape) {
                continue;
            }
            area.add_lane(lane.clone());

            for (tl_id, controlled) in &controllers {
                if !controlled.contains(&lane.id) || area.has_traffic_light(tl_id) {
                    continue;
                }
                let light = match programs.get(tl_id.as_str()) {
                    Some(light) => light.clone(),
                    None => {
                        let light = Rc::new(TrafficLight {
                            id: tl_id.clone(),
                            logics: sim.signal_programs(tl_id)?,
                            active_program: sim.active_program(tl_id)?,
                        });
                        programs.insert(tl_id.as_str(), light.clone());
                        light
                    }
                };
                area.add_traffic_light(light);
            }
        }
        debug!(
            "{}: {} lanes, {} traffic lights",
            area.name(),
            area.lanes().len(),
            area.traffic_lights().len()
        );
    }

    Ok(())
}
