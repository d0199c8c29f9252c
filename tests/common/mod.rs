//! A scripted simulator which records the calls made to it.

#![allow(dead_code)]

use std::collections::HashSet;
use traffic_emissions::math::{Point2d, Rect};
use traffic_emissions::{
    ActionError, Color, Logic, ObjectKind, Phase, Pollutants, SimulationError, Simulator,
};

/// A call that modifies the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SetSpeed(String, f64),
    SetProgram(String, Logic),
    Reroute(String),
    Remove(String),
    AdjustWeights,
    PolygonColor(String, Color, bool),
}

pub struct FakeLane {
    pub id: String,
    pub shape: Vec<Point2d>,
    pub initial_speed: f64,
    pub speed: f64,
}

pub struct FakeLight {
    pub id: String,
    pub controlled: Vec<String>,
    pub logics: Vec<Logic>,
    /// The program ID of the running logic.
    pub active: String,
}

pub struct FakeVehicle {
    pub id: String,
    pub pos: Point2d,
    /// The emissions of a step at the initial speed of `lane`.
    pub emissions: f64,
    /// When set, emissions scale with the current speed of this lane.
    pub lane: Option<String>,
}

pub struct FakeSim {
    pub boundary: Rect,
    pub lanes: Vec<FakeLane>,
    pub lights: Vec<FakeLight>,
    pub vehicles: Vec<FakeVehicle>,
    pub calls: Vec<Call>,
    /// Writes to these objects are rejected.
    pub failing: HashSet<String>,
    /// Vehicles which cannot be rerouted.
    pub stuck: HashSet<String>,
    /// The step at which the connection is lost.
    pub lost_at: Option<usize>,
    pub steps: usize,
    pub closed: usize,
}

impl FakeSim {
    /// A 100 m square network, with one lane and one traffic light in the middle of
    /// each quadrant, and a vehicle in each of the quadrants `(0,0)`, `(1,0)` and `(0,1)`
    /// of a 2×2 grid, emitting `emissions` per step.
    pub fn quadrants(emissions: f64) -> Self {
        let mut sim = Self {
            boundary: Rect::new(Point2d::new(0.0, 0.0), Point2d::new(100.0, 100.0)),
            lanes: vec![],
            lights: vec![],
            vehicles: vec![],
            calls: vec![],
            failing: HashSet::new(),
            stuck: HashSet::new(),
            lost_at: None,
            steps: 0,
            closed: 0,
        };
        for (i, j) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let (x, y) = (i as f64 * 50.0, j as f64 * 50.0);
            let lane = format!("lane{}{}", i, j);
            sim.lanes.push(FakeLane {
                id: lane.clone(),
                shape: vec![Point2d::new(x + 10.0, y + 25.0), Point2d::new(x + 40.0, y + 25.0)],
                initial_speed: 10.0,
                speed: 10.0,
            });
            sim.lights.push(FakeLight {
                id: format!("tl{}{}", i, j),
                controlled: vec![lane.clone()],
                logics: vec![Logic {
                    program_id: "0".into(),
                    phases: vec![Phase::new(30.0, "G"), Phase::new(30.0, "r")],
                }],
                active: "0".into(),
            });
            if (i, j) != (1, 1) {
                sim.vehicles.push(FakeVehicle {
                    id: format!("veh{}{}", i, j),
                    pos: Point2d::new(x + 25.0, y + 25.0),
                    emissions,
                    lane: Some(lane),
                });
            }
        }
        sim
    }

    /// Makes every vehicle emit a constant amount, whatever the lane speeds.
    pub fn constant_emissions(mut self) -> Self {
        for vehicle in &mut self.vehicles {
            vehicle.lane = None;
        }
        self
    }

    pub fn set_emissions(&mut self, emissions: f64) {
        for vehicle in &mut self.vehicles {
            vehicle.emissions = emissions;
        }
    }

    /// Adds a lane next to the one of quadrant `(i, j)`, controlled by a new traffic
    /// light. Both are named after the quadrant with the suffix `a`.
    pub fn with_second_lane(mut self, i: usize, j: usize) -> Self {
        let (x, y) = (i as f64 * 50.0, j as f64 * 50.0);
        let lane = format!("lane{}{}a", i, j);
        self.lanes.push(FakeLane {
            id: lane.clone(),
            shape: vec![Point2d::new(x + 10.0, y + 35.0), Point2d::new(x + 40.0, y + 35.0)],
            initial_speed: 10.0,
            speed: 10.0,
        });
        self.lights.push(FakeLight {
            id: format!("tl{}{}a", i, j),
            controlled: vec![lane],
            logics: vec![Logic {
                program_id: "0".into(),
                phases: vec![Phase::new(30.0, "G"), Phase::new(30.0, "r")],
            }],
            active: "0".into(),
        });
        self
    }

    pub fn lane(&self, id: &str) -> &FakeLane {
        self.lanes.iter().find(|l| l.id == id).unwrap()
    }

    pub fn light(&self, id: &str) -> &FakeLight {
        self.lights.iter().find(|l| l.id == id).unwrap()
    }

    /// The calls made to an object.
    pub fn calls_to(&self, id: &str) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|call| match call {
                Call::SetSpeed(x, _)
                | Call::SetProgram(x, _)
                | Call::Reroute(x)
                | Call::Remove(x)
                | Call::PolygonColor(x, _, _) => x == id,
                Call::AdjustWeights => false,
            })
            .collect()
    }

    fn check(&self, kind: ObjectKind, id: &str) -> Result<(), ActionError> {
        match self.failing.contains(id) {
            true => Err(ActionError::Rejected {
                kind,
                id: id.to_owned(),
                reason: "scripted failure".into(),
            }),
            false => Ok(()),
        }
    }

    fn vehicle(&self, id: &str) -> Result<&FakeVehicle, SimulationError> {
        self.vehicles
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| SimulationError::UnknownObject {
                kind: ObjectKind::Vehicle,
                id: id.to_owned(),
            })
    }

    fn known_vehicle(&self, id: &str) -> Result<(), ActionError> {
        match self.vehicles.iter().any(|v| v.id == id) {
            true => Ok(()),
            false => Err(ActionError::UnknownObject {
                kind: ObjectKind::Vehicle,
                id: id.to_owned(),
            }),
        }
    }

    fn lane_mut(&mut self, id: &str) -> Result<&mut FakeLane, ActionError> {
        self.lanes
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| ActionError::UnknownObject {
                kind: ObjectKind::Lane,
                id: id.to_owned(),
            })
    }
}

impl Simulator for FakeSim {
    fn net_boundary(&self) -> Result<Rect, SimulationError> {
        Ok(self.boundary)
    }

    fn lane_ids(&self) -> Result<Vec<String>, SimulationError> {
        Ok(self.lanes.iter().map(|l| l.id.clone()).collect())
    }

    fn lane_shape(&self, lane_id: &str) -> Result<Vec<Point2d>, SimulationError> {
        Ok(self.lane(lane_id).shape.clone())
    }

    fn lane_max_speed(&self, lane_id: &str) -> Result<f64, SimulationError> {
        Ok(self.lane(lane_id).speed)
    }

    fn traffic_light_ids(&self) -> Result<Vec<String>, SimulationError> {
        Ok(self.lights.iter().map(|l| l.id.clone()).collect())
    }

    fn controlled_lanes(&self, tl_id: &str) -> Result<Vec<String>, SimulationError> {
        Ok(self.light(tl_id).controlled.clone())
    }

    fn signal_programs(&self, tl_id: &str) -> Result<Vec<Logic>, SimulationError> {
        Ok(self.light(tl_id).logics.clone())
    }

    fn active_program(&self, tl_id: &str) -> Result<String, SimulationError> {
        Ok(self.light(tl_id).active.clone())
    }

    fn vehicle_ids(&self) -> Result<Vec<String>, SimulationError> {
        Ok(self.vehicles.iter().map(|v| v.id.clone()).collect())
    }

    fn vehicle_position(&self, vehicle_id: &str) -> Result<Point2d, SimulationError> {
        Ok(self.vehicle(vehicle_id)?.pos)
    }

    fn vehicle_emissions(&self, vehicle_id: &str) -> Result<Pollutants, SimulationError> {
        let vehicle = self.vehicle(vehicle_id)?;
        let scale = match &vehicle.lane {
            Some(lane) => {
                let lane = self.lane(lane);
                lane.speed / lane.initial_speed
            }
            None => 1.0,
        };
        Ok(Pollutants {
            co2: vehicle.emissions * scale,
            ..Default::default()
        })
    }

    fn step(&mut self) -> Result<(), SimulationError> {
        if self.closed > 0 {
            return Err(SimulationError::Closed);
        }
        if self.lost_at == Some(self.steps + 1) {
            return Err(SimulationError::Connection("connection reset".into()));
        }
        self.steps += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.closed += 1;
    }

    fn set_lane_max_speed(&mut self, lane_id: &str, speed: f64) -> Result<(), ActionError> {
        self.calls.push(Call::SetSpeed(lane_id.to_owned(), speed));
        self.check(ObjectKind::Lane, lane_id)?;
        self.lane_mut(lane_id)?.speed = speed;
        Ok(())
    }

    fn set_signal_program(&mut self, tl_id: &str, logic: &Logic) -> Result<(), ActionError> {
        self.calls.push(Call::SetProgram(tl_id.to_owned(), logic.clone()));
        self.check(ObjectKind::TrafficLight, tl_id)?;
        let light = self
            .lights
            .iter_mut()
            .find(|l| l.id == tl_id)
            .ok_or_else(|| ActionError::UnknownObject {
                kind: ObjectKind::TrafficLight,
                id: tl_id.to_owned(),
            })?;
        for current in light.logics.iter_mut() {
            if current.program_id == logic.program_id {
                *current = logic.clone();
            }
        }
        light.active = logic.program_id.clone();
        Ok(())
    }

    fn reroute_vehicle(&mut self, vehicle_id: &str) -> Result<(), ActionError> {
        self.calls.push(Call::Reroute(vehicle_id.to_owned()));
        self.check(ObjectKind::Vehicle, vehicle_id)?;
        self.known_vehicle(vehicle_id)?;
        match self.stuck.contains(vehicle_id) {
            true => Err(ActionError::Rejected {
                kind: ObjectKind::Vehicle,
                id: vehicle_id.to_owned(),
                reason: "no route".into(),
            }),
            false => Ok(()),
        }
    }

    fn remove_vehicle(&mut self, vehicle_id: &str) -> Result<(), ActionError> {
        self.calls.push(Call::Remove(vehicle_id.to_owned()));
        self.known_vehicle(vehicle_id)?;
        self.vehicles.retain(|v| v.id != vehicle_id);
        Ok(())
    }

    fn adjust_edge_weights(&mut self) -> Result<(), ActionError> {
        self.calls.push(Call::AdjustWeights);
        Ok(())
    }

    fn set_polygon_color(&mut self, name: &str, color: Color, filled: bool) -> Result<(), ActionError> {
        self.calls.push(Call::PolygonColor(name.to_owned(), color, filled));
        Ok(())
    }
}
