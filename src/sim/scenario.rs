use crate::error::ConfigError;
use crate::math::{rot90, Point2d, Vector2d};
use crate::network::{Logic, Phase};
use cgmath::prelude::*;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A network with its traffic lights and travel demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// The duration of a step in s.
    #[serde(default = "default_step_length")]
    pub step_length: f64,
    /// The standard deviation of the desired speed adjustment of vehicles.
    #[serde(default)]
    pub speed_dev: f64,
    /// Seeds the random speed adjustments.
    #[serde(default)]
    pub seed: u64,
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    #[serde(default)]
    pub traffic_lights: Vec<TrafficLightSpec>,
    #[serde(default)]
    pub trips: Vec<TripSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub id: String,
    pub shape: Vec<Point2d>,
    /// Speed limit in m/s.
    pub speed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightSpec {
    pub id: String,
    /// The controlled links, in signal index order.
    pub controlled: Vec<String>,
    pub logics: Vec<Logic>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripSpec {
    pub id: String,
    /// The step at which the vehicle departs.
    pub depart: usize,
    pub from: String,
    pub to: String,
}

/// The parameters of a generated street grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManhattanParams {
    /// The number of blocks along each axis.
    pub blocks: usize,
    /// The length of a block in m.
    pub block_length: f64,
    /// The speed limit in m/s.
    pub speed: f64,
    /// The number of trips to generate.
    pub trips: usize,
    /// Trips depart uniformly within this many steps.
    pub horizon: usize,
    pub seed: u64,
}

impl Default for ManhattanParams {
    fn default() -> Self {
        Self {
            blocks: 4,
            block_length: 200.0,
            speed: 13.89,
            trips: 400,
            horizon: 150,
            seed: 42,
        }
    }
}

fn default_step_length() -> f64 {
    1.0
}

/// The distance between the centre line of a street and each of its lanes, in m.
const LANE_OFFSET: f64 = 1.6;

impl Scenario {
    /// Reads a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let unreadable = |reason: String| ConfigError::Unreadable {
            path: path.to_owned(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))
    }

    /// Checks that the scenario is consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Scenario(msg));

        if !(self.step_length > 0.0) {
            return invalid(format!("step length must be positive, got {}", self.step_length));
        }
        if !(self.speed_dev >= 0.0) {
            return invalid(format!("speed deviation must be non-negative, got {}", self.speed_dev));
        }

        let mut links = HashSet::new();
        for link in &self.links {
            if !links.insert(link.id.as_str()) {
                return invalid(format!("duplicate link {}", link.id));
            }
            if link.shape.len() < 2 {
                return invalid(format!("link {} needs at least two points", link.id));
            }
            if !(link.speed > 0.0) {
                return invalid(format!("link {} needs a positive speed", link.id));
            }
        }

        let known = |id: &str| match links.contains(id) {
            true => Ok(()),
            false => Err(ConfigError::Scenario(format!("unknown link {}", id))),
        };
        for connection in &self.connections {
            known(&connection.from)?;
            known(&connection.to)?;
        }
        for light in &self.traffic_lights {
            for link in &light.controlled {
                known(link)?;
            }
            let phases = light.logics.iter().flat_map(|l| &l.phases);
            for phase in phases {
                if phase.state.chars().count() != light.controlled.len() {
                    return invalid(format!(
                        "traffic light {}: state '{}' does not match {} controlled links",
                        light.id,
                        phase.state,
                        light.controlled.len()
                    ));
                }
                if !(phase.duration >= 0.0) {
                    return invalid(format!("traffic light {}: negative duration", light.id));
                }
            }
        }
        for trip in &self.trips {
            known(&trip.from)?;
            known(&trip.to)?;
        }
        if !self.trips.iter().map(|t| &t.id).all_unique() {
            return invalid("duplicate trip id".into());
        }
        Ok(())
    }

    /// Generates a square street grid with a two-way street between every pair of
    /// adjacent junctions, a fixed-time traffic light at every junction with at least
    /// three approaches, and random trips.
    pub fn manhattan(params: &ManhattanParams) -> Self {
        let n = params.blocks;
        let node = |x: usize, y: usize| {
            Point2d::new(x as f64 * params.block_length, y as f64 * params.block_length)
        };
        let name = |a: (usize, usize), b: (usize, usize)| format!("{}_{}to{}_{}", a.0, a.1, b.0, b.1);

        // Directed streets between adjacent junctions
        let mut streets = vec![];
        for x in 0..=n {
            for y in 0..=n {
                if x < n {
                    streets.push(((x, y), (x + 1, y)));
                    streets.push(((x + 1, y), (x, y)));
                }
                if y < n {
                    streets.push(((x, y), (x, y + 1)));
                    streets.push(((x, y + 1), (x, y)));
                }
            }
        }

        let links = streets
            .iter()
            .map(|&(a, b)| {
                let (pa, pb) = (node(a.0, a.1), node(b.0, b.1));
                let dir: Vector2d = (pb - pa).normalize();
                // Drive on the right
                let offset = -rot90(dir) * LANE_OFFSET;
                LinkSpec {
                    id: name(a, b),
                    shape: vec![pa + offset, pb + offset],
                    speed: params.speed,
                }
            })
            .collect::<Vec<_>>();

        // Any turn except a U-turn
        let connections = iproduct_streets(&streets)
            .map(|(from, to)| ConnectionSpec {
                from: name(from.0, from.1),
                to: name(to.0, to.1),
            })
            .collect();

        let mut traffic_lights = vec![];
        for x in 0..=n {
            for y in 0..=n {
                let incoming = streets
                    .iter()
                    .filter(|(_, b)| *b == (x, y))
                    .collect::<Vec<_>>();
                if incoming.len() < 3 {
                    continue;
                }
                let vertical = incoming.iter().map(|(a, _)| a.0 == x).collect::<Vec<_>>();
                let state = |green: bool, signal: char| -> String {
                    vertical
                        .iter()
                        .map(|v| if *v == green { signal } else { 'r' })
                        .collect()
                };
                let logic = Logic {
                    program_id: "0".into(),
                    phases: vec![
                        Phase {
                            duration: 31.0,
                            min_duration: 10.0,
                            max_duration: 50.0,
                            state: state(true, 'G'),
                        },
                        Phase::new(4.0, state(true, 'y')),
                        Phase {
                            duration: 31.0,
                            min_duration: 10.0,
                            max_duration: 50.0,
                            state: state(false, 'G'),
                        },
                        Phase::new(4.0, state(false, 'y')),
                    ],
                };
                traffic_lights.push(TrafficLightSpec {
                    id: format!("{}_{}", x, y),
                    controlled: incoming.iter().map(|(a, b)| name(*a, *b)).collect(),
                    logics: vec![logic],
                });
            }
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trips = if links.len() < 2 {
            vec![]
        } else {
            (0..params.trips)
                .map(|i| {
                    let from = rng.gen_range(0..links.len());
                    let to = (from + rng.gen_range(1..links.len())) % links.len();
                    TripSpec {
                        id: format!("veh{}", i),
                        depart: rng.gen_range(0..params.horizon.max(1)),
                        from: links[from].id.clone(),
                        to: links[to].id.clone(),
                    }
                })
                .collect()
        };

        Self {
            step_length: default_step_length(),
            speed_dev: 0.1,
            seed: params.seed,
            links,
            connections,
            traffic_lights,
            trips,
        }
    }
}

type Street = ((usize, usize), (usize, usize));

/// Pairs of consecutive streets, excluding U-turns.
fn iproduct_streets(streets: &[Street]) -> impl Iterator<Item = (Street, Street)> + '_ {
    itertools::iproduct!(streets.iter().copied(), streets.iter().copied())
        .filter(|(from, to)| from.1 == to.0 && from.0 != to.1)
}
