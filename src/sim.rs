//! A small headless traffic simulation.
//!
//! Vehicles drive along their route at the speed limit of each link, stop at red
//! signals, and emit pollutants depending on their speed and acceleration. There is
//! no car following or lane changing. It implements [Simulator], so it can be
//! monitored in place of an external simulator.

use crate::emission::Pollutants;
use crate::error::{ActionError, ConfigError, ObjectKind, SimulationError};
use crate::math::{polyline_bounds, Point2d, Rect};
use crate::network::Logic;
use crate::simulator::{Color, Simulator};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;

pub use light::TrafficLight;
pub use link::{Link, LinkAttributes, TrafficControl};
pub use scenario::{
    ConnectionSpec, LinkSpec, ManhattanParams, Scenario, TrafficLightSpec, TripSpec,
};
pub use vehicle::{Vehicle, VehicleAttributes};

mod light;
mod link;
mod routing;
mod scenario;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Link].
    pub struct LinkId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [TrafficLight].
    pub struct TrafficLightId;
}

type LinkSet = SlotMap<LinkId, Link>;
type VehicleSet = SlotMap<VehicleId, Vehicle>;

/// A vehicle waiting to depart.
#[derive(Clone, Debug)]
pub struct Trip {
    pub name: String,
    /// The frame at which the vehicle enters the simulation.
    pub depart: usize,
    pub from: LinkId,
    pub to: LinkId,
}

/// A display polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub shape: Vec<Point2d>,
    pub color: Color,
    pub filled: bool,
}

/// A traffic simulation.
pub struct Simulation {
    /// The links in the network.
    links: LinkSet,
    link_names: HashMap<String, LinkId>,
    /// The traffic lights.
    lights: SlotMap<TrafficLightId, TrafficLight>,
    light_names: HashMap<String, TrafficLightId>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    vehicle_names: HashMap<String, VehicleId>,
    /// Trips yet to depart, latest first.
    trips: Vec<Trip>,
    /// The attributes given to departing vehicles.
    attributes: VehicleAttributes,
    /// The standard deviation of the desired speed adjustment of departing vehicles.
    speed_dev: f64,
    rng: StdRng,
    /// Display polygons, by name.
    polygons: HashMap<String, Polygon>,
    /// The duration of a frame in s.
    dt: f64,
    /// The current frame of simulation.
    frame: usize,
    /// The number of vehicles which reached their destination.
    arrived: usize,
    closed: bool,
}

impl Simulation {
    /// Creates an empty simulation advancing by `dt` seconds per frame.
    pub fn new(dt: f64) -> Self {
        Self {
            links: Default::default(),
            link_names: Default::default(),
            lights: Default::default(),
            light_names: Default::default(),
            vehicles: Default::default(),
            vehicle_names: Default::default(),
            trips: vec![],
            attributes: Default::default(),
            speed_dev: 0.0,
            rng: StdRng::seed_from_u64(0),
            polygons: Default::default(),
            dt,
            frame: 0,
            arrived: 0,
            closed: false,
        }
    }

    /// Builds the simulation described by a scenario.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, ConfigError> {
        scenario.validate()?;
        let mut sim = Self::new(scenario.step_length);
        sim.speed_dev = scenario.speed_dev;
        sim.rng = StdRng::seed_from_u64(scenario.seed);

        for spec in &scenario.links {
            sim.add_link(&LinkAttributes {
                name: &spec.id,
                points: &spec.shape,
                speed_limit: spec.speed,
            });
        }
        for spec in &scenario.connections {
            let (from, to) = (sim.link_names[&spec.from], sim.link_names[&spec.to]);
            sim.add_link_connection(from, to);
        }
        for spec in &scenario.traffic_lights {
            let controlled = spec.controlled.iter().map(|l| sim.link_names[l]).collect::<Vec<_>>();
            sim.add_traffic_light(&spec.id, controlled, spec.logics.clone());
        }
        for spec in &scenario.trips {
            let trip = Trip {
                name: spec.id.clone(),
                depart: spec.depart,
                from: sim.link_names[&spec.from],
                to: sim.link_names[&spec.to],
            };
            sim.add_trip(trip);
        }
        Ok(sim)
    }

    /// Adds a link to the network.
    pub fn add_link(&mut self, attributes: &LinkAttributes) -> LinkId {
        let id = self.links.insert_with_key(|id| Link::new(id, attributes));
        self.link_names.insert(attributes.name.to_owned(), id);
        id
    }

    /// Specifies that the end of the `from` link connects to the start of the `to` link.
    pub fn add_link_connection(&mut self, from: LinkId, to: LinkId) {
        self.links[from].add_link_out(to);
    }

    /// Adds a traffic light. The `i`-th character of each phase state controls
    /// the `i`-th link of `controlled`.
    pub fn add_traffic_light(
        &mut self,
        name: &str,
        controlled: Vec<LinkId>,
        logics: Vec<Logic>,
    ) -> TrafficLightId {
        let id = self
            .lights
            .insert_with_key(|id| TrafficLight::new(id, name, controlled, logics));
        self.light_names.insert(name.to_owned(), id);
        id
    }

    /// Schedules a vehicle departure.
    pub fn add_trip(&mut self, trip: Trip) {
        let idx = self.trips.partition_point(|t| t.depart > trip.depart);
        self.trips.insert(idx, trip);
    }

    /// Adds a vehicle at the start of `from`, routed towards `to`.
    /// Returns `None` if `to` cannot be reached.
    pub fn add_vehicle(
        &mut self,
        name: &str,
        attributes: &VehicleAttributes,
        from: LinkId,
        to: LinkId,
    ) -> Option<VehicleId> {
        let route = routing::find_route(from, to, &self.links)?;
        let vehicle_id = self.vehicles.insert_with_key(|id| {
            let mut vehicle = Vehicle::new(id, name, attributes, route);
            vehicle.update_coords(&self.links);
            vehicle
        });
        self.vehicle_names.insert(name.to_owned(), vehicle_id);
        Some(vehicle_id)
    }

    /// Removes a vehicle from the simulation.
    pub fn remove_vehicle_by_id(&mut self, id: VehicleId) {
        if let Some(vehicle) = self.vehicles.remove(id) {
            self.vehicle_names.remove(vehicle.name());
        }
    }

    /// Recomputes the route of a vehicle from its current link.
    /// Returns false, leaving the route unchanged, if the destination cannot be reached.
    pub fn reroute(&mut self, vehicle_id: VehicleId) -> bool {
        let vehicle = &self.vehicles[vehicle_id];
        match routing::find_route(vehicle.link_id(), vehicle.destination(), &self.links) {
            Some(route) => {
                self.vehicles[vehicle_id].set_route(route);
                true
            }
            None => false,
        }
    }

    /// Advances the simulation by one frame.
    pub fn advance(&mut self) {
        self.spawn_departures();
        self.update_lights();
        self.apply_accelerations();
        self.integrate();
        self.advance_vehicles();
        self.update_vehicle_coords();
        self.frame += 1;
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// The number of vehicles which reached their destination.
    pub fn arrived(&self) -> usize {
        self.arrived
    }

    /// The number of trips yet to depart.
    pub fn pending_trips(&self) -> usize {
        self.trips.len()
    }

    /// Returns an iterator over all the links in the simulation.
    pub fn iter_links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Returns an iterator over all the traffic lights in the simulation.
    pub fn iter_lights(&self) -> impl Iterator<Item = (TrafficLightId, &TrafficLight)> {
        self.lights.iter()
    }

    /// Gets a reference to the link with the given ID.
    pub fn get_link(&self, link_id: LinkId) -> &Link {
        &self.links[link_id]
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.link_names.get(name).copied()
    }

    pub fn vehicle_id(&self, name: &str) -> Option<VehicleId> {
        self.vehicle_names.get(name).copied()
    }

    pub fn light_id(&self, name: &str) -> Option<TrafficLightId> {
        self.light_names.get(name).copied()
    }

    pub fn get_light(&self, light_id: TrafficLightId) -> &TrafficLight {
        &self.lights[light_id]
    }

    /// Gets a display polygon by name.
    pub fn polygon(&self, name: &str) -> Option<&Polygon> {
        self.polygons.get(name)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Inserts the vehicles whose departure time has come.
    fn spawn_departures(&mut self) {
        while self.trips.last().map_or(false, |t| t.depart <= self.frame) {
            let Some(trip) = self.trips.pop() else { break };
            if self.vehicle_names.contains_key(&trip.name) {
                warn!("Vehicle {} already exists, trip skipped", trip.name);
                continue;
            }
            let attributes = self.attributes;
            match self.add_vehicle(&trip.name, &attributes, trip.from, trip.to) {
                Some(vehicle_id) => {
                    if self.speed_dev > 0.0 {
                        let factor = Normal::new(1.0, self.speed_dev)
                            .map(|distr| distr.sample(&mut self.rng).clamp(0.75, 1.25))
                            .unwrap_or(1.0);
                        self.vehicles[vehicle_id].set_velocity_adjust(factor);
                    }
                }
                None => warn!("No route for trip {}, skipped", trip.name),
            }
        }
    }

    /// Updates the traffic lights.
    fn update_lights(&mut self) {
        for (_, light) in &mut self.lights {
            light.step(self.dt);
            for (link_id, control) in light.get_states() {
                self.links[link_id].set_control(control);
            }
        }
    }

    /// Calculates the accelerations of the vehicles.
    fn apply_accelerations(&mut self) {
        for (_, vehicle) in &mut self.vehicles {
            vehicle.update_acceleration(&self.links, self.dt);
        }
    }

    /// Integrates the velocities and positions of all vehicles.
    fn integrate(&mut self) {
        for (_, vehicle) in &mut self.vehicles {
            vehicle.integrate(self.dt);
        }
    }

    /// Moves vehicles which reached the end of their link to the next one,
    /// and removes those at the end of their route.
    fn advance_vehicles(&mut self) {
        let exited = self
            .vehicles
            .iter_mut()
            .filter_map(|(id, vehicle)| vehicle.advance(&self.links).then(|| id))
            .collect::<Vec<_>>();

        for vehicle_id in exited {
            self.remove_vehicle_by_id(vehicle_id);
            self.arrived += 1;
        }
    }

    /// Updates the world coordinates of all the vehicles.
    fn update_vehicle_coords(&mut self) {
        for (_, vehicle) in &mut self.vehicles {
            vehicle.update_coords(&self.links);
        }
    }

    fn check_open(&self) -> Result<(), SimulationError> {
        match self.closed {
            true => Err(SimulationError::Closed),
            false => Ok(()),
        }
    }

    fn check_open_for_action(&self) -> Result<(), ActionError> {
        match self.closed {
            true => Err(ActionError::Closed),
            false => Ok(()),
        }
    }

    fn lookup_link(&self, name: &str) -> Result<&Link, SimulationError> {
        self.check_open()?;
        self.link_id(name)
            .map(|id| &self.links[id])
            .ok_or_else(|| unknown(ObjectKind::Lane, name))
    }

    fn lookup_light(&self, name: &str) -> Result<&TrafficLight, SimulationError> {
        self.check_open()?;
        self.light_id(name)
            .map(|id| &self.lights[id])
            .ok_or_else(|| unknown(ObjectKind::TrafficLight, name))
    }

    fn lookup_vehicle(&self, name: &str) -> Result<&Vehicle, SimulationError> {
        self.check_open()?;
        self.vehicle_id(name)
            .map(|id| &self.vehicles[id])
            .ok_or_else(|| unknown(ObjectKind::Vehicle, name))
    }

    fn vehicle_for_action(&self, name: &str) -> Result<VehicleId, ActionError> {
        self.check_open_for_action()?;
        self.vehicle_id(name).ok_or_else(|| ActionError::UnknownObject {
            kind: ObjectKind::Vehicle,
            id: name.to_owned(),
        })
    }
}

fn unknown(kind: ObjectKind, id: &str) -> SimulationError {
    SimulationError::UnknownObject {
        kind,
        id: id.to_owned(),
    }
}

impl Simulator for Simulation {
    fn net_boundary(&self) -> Result<Rect, SimulationError> {
        self.check_open()?;
        polyline_bounds(self.links.values().map(|link| link.points()))
            .ok_or_else(|| SimulationError::Connection("the network has no lanes".into()))
    }

    fn lane_ids(&self) -> Result<Vec<String>, SimulationError> {
        self.check_open()?;
        Ok(self.links.values().map(|l| l.name().to_owned()).collect())
    }

    fn lane_shape(&self, lane_id: &str) -> Result<Vec<Point2d>, SimulationError> {
        Ok(self.lookup_link(lane_id)?.points().to_vec())
    }

    fn lane_max_speed(&self, lane_id: &str) -> Result<f64, SimulationError> {
        Ok(self.lookup_link(lane_id)?.speed_limit())
    }

    fn traffic_light_ids(&self) -> Result<Vec<String>, SimulationError> {
        self.check_open()?;
        Ok(self.lights.values().map(|l| l.name().to_owned()).collect())
    }

    fn controlled_lanes(&self, tl_id: &str) -> Result<Vec<String>, SimulationError> {
        let light = self.lookup_light(tl_id)?;
        Ok(light
            .controlled_links()
            .iter()
            .map(|id| self.links[*id].name().to_owned())
            .collect())
    }

    fn signal_programs(&self, tl_id: &str) -> Result<Vec<Logic>, SimulationError> {
        Ok(self.lookup_light(tl_id)?.logics().to_vec())
    }

    fn active_program(&self, tl_id: &str) -> Result<String, SimulationError> {
        let light = self.lookup_light(tl_id)?;
        Ok(light
            .active_logic()
            .map(|logic| logic.program_id.clone())
            .unwrap_or_default())
    }

    fn vehicle_ids(&self) -> Result<Vec<String>, SimulationError> {
        self.check_open()?;
        Ok(self.vehicles.values().map(|v| v.name().to_owned()).collect())
    }

    fn vehicle_position(&self, vehicle_id: &str) -> Result<Point2d, SimulationError> {
        Ok(self.lookup_vehicle(vehicle_id)?.position())
    }

    fn vehicle_emissions(&self, vehicle_id: &str) -> Result<Pollutants, SimulationError> {
        Ok(self.lookup_vehicle(vehicle_id)?.emissions())
    }

    fn step(&mut self) -> Result<(), SimulationError> {
        self.check_open()?;
        self.advance();
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            debug!(
                "Closing simulation at frame {}: {} vehicles arrived, {} active",
                self.frame,
                self.arrived,
                self.vehicles.len()
            );
        }
        self.closed = true;
    }

    fn set_lane_max_speed(&mut self, lane_id: &str, speed: f64) -> Result<(), ActionError> {
        self.check_open_for_action()?;
        let link_id = self.link_id(lane_id).ok_or_else(|| ActionError::UnknownObject {
            kind: ObjectKind::Lane,
            id: lane_id.to_owned(),
        })?;
        if !(speed >= 0.0 && speed.is_finite()) {
            return Err(ActionError::Rejected {
                kind: ObjectKind::Lane,
                id: lane_id.to_owned(),
                reason: format!("invalid speed {}", speed),
            });
        }
        self.links[link_id].set_speed_limit(speed);
        Ok(())
    }

    fn set_signal_program(&mut self, tl_id: &str, logic: &Logic) -> Result<(), ActionError> {
        self.check_open_for_action()?;
        let light_id = self.light_id(tl_id).ok_or_else(|| ActionError::UnknownObject {
            kind: ObjectKind::TrafficLight,
            id: tl_id.to_owned(),
        })?;
        self.lights[light_id]
            .set_program(logic.clone())
            .map_err(|reason| ActionError::Rejected {
                kind: ObjectKind::TrafficLight,
                id: tl_id.to_owned(),
                reason,
            })
    }

    fn reroute_vehicle(&mut self, vehicle_id: &str) -> Result<(), ActionError> {
        let id = self.vehicle_for_action(vehicle_id)?;
        match self.reroute(id) {
            true => Ok(()),
            false => Err(ActionError::Rejected {
                kind: ObjectKind::Vehicle,
                id: vehicle_id.to_owned(),
                reason: "no route to destination".into(),
            }),
        }
    }

    fn remove_vehicle(&mut self, vehicle_id: &str) -> Result<(), ActionError> {
        let id = self.vehicle_for_action(vehicle_id)?;
        self.remove_vehicle_by_id(id);
        Ok(())
    }

    fn adjust_edge_weights(&mut self) -> Result<(), ActionError> {
        self.check_open_for_action()?;
        let mut observed: HashMap<LinkId, (f64, usize)> = HashMap::new();
        for vehicle in self.vehicles.values() {
            let entry = observed.entry(vehicle.link_id()).or_insert((0.0, 0));
            entry.0 += vehicle.vel();
            entry.1 += 1;
        }
        for (link_id, link) in &mut self.links {
            let speed = observed.get(&link_id).map(|(sum, cnt)| sum / *cnt as f64);
            link.set_observed_speed(speed);
        }
        let vehicle_ids = self.vehicles.keys().collect::<Vec<_>>();
        for vehicle_id in vehicle_ids {
            self.reroute(vehicle_id);
        }
        Ok(())
    }

    fn add_polygon(&mut self, name: &str, shape: &[Point2d], color: Color) -> Result<(), ActionError> {
        self.check_open_for_action()?;
        self.polygons.insert(
            name.to_owned(),
            Polygon {
                shape: shape.to_vec(),
                color,
                filled: false,
            },
        );
        Ok(())
    }

    fn set_polygon_color(&mut self, name: &str, color: Color, filled: bool) -> Result<(), ActionError> {
        self.check_open_for_action()?;
        let polygon = self
            .polygons
            .get_mut(name)
            .ok_or_else(|| ActionError::UnknownObject {
                kind: ObjectKind::Polygon,
                id: name.to_owned(),
            })?;
        polygon.color = color;
        polygon.filled = filled;
        Ok(())
    }
}
