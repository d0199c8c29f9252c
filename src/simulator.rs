use crate::emission::Pollutants;
use crate::error::{ActionError, SimulationError};
use crate::math::{Point2d, Rect};
use crate::network::Logic;

/// An RGB display colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const GREEN: Color = Color(0, 255, 0);
    pub const RED: Color = Color(255, 0, 0);
}

/// The traffic simulator that is monitored and acted upon.
///
/// Reads fail with a [SimulationError], which means the connection can no longer be
/// relied upon. Writes fail with an [ActionError], which only concerns the object
/// being modified.
pub trait Simulator {
    /// The rectangle bounding the road network.
    fn net_boundary(&self) -> Result<Rect, SimulationError>;

    /// The IDs of every lane in the network.
    fn lane_ids(&self) -> Result<Vec<String>, SimulationError>;

    /// The centre line of a lane.
    fn lane_shape(&self, lane_id: &str) -> Result<Vec<Point2d>, SimulationError>;

    /// The current maximum speed of a lane in m/s.
    fn lane_max_speed(&self, lane_id: &str) -> Result<f64, SimulationError>;

    /// The IDs of every traffic light.
    fn traffic_light_ids(&self) -> Result<Vec<String>, SimulationError>;

    /// The lanes controlled by a traffic light, in signal index order.
    fn controlled_lanes(&self, tl_id: &str) -> Result<Vec<String>, SimulationError>;

    /// Every signal program of a traffic light.
    fn signal_programs(&self, tl_id: &str) -> Result<Vec<Logic>, SimulationError>;

    /// The program ID of the logic a traffic light is running.
    fn active_program(&self, tl_id: &str) -> Result<String, SimulationError>;

    /// The IDs of the vehicles currently in the simulation.
    fn vehicle_ids(&self) -> Result<Vec<String>, SimulationError>;

    fn vehicle_position(&self, vehicle_id: &str) -> Result<Point2d, SimulationError>;

    /// The pollutants emitted by a vehicle during the last step.
    fn vehicle_emissions(&self, vehicle_id: &str) -> Result<Pollutants, SimulationError>;

    /// Advances the simulation by one step.
    fn step(&mut self) -> Result<(), SimulationError>;

    /// Closes the connection. Must be safe to call more than once.
    fn close(&mut self);

    fn set_lane_max_speed(&mut self, lane_id: &str, speed: f64) -> Result<(), ActionError>;

    /// Replaces the signal program of a traffic light which has the same program ID,
    /// and switches the traffic light to it.
    fn set_signal_program(&mut self, tl_id: &str, logic: &Logic) -> Result<(), ActionError>;

    /// Recomputes the route of a vehicle from its current position based on travel times.
    fn reroute_vehicle(&mut self, vehicle_id: &str) -> Result<(), ActionError>;

    fn remove_vehicle(&mut self, vehicle_id: &str) -> Result<(), ActionError>;

    /// Updates the edge weights used for routing from current traffic conditions
    /// and reroutes vehicles accordingly.
    fn adjust_edge_weights(&mut self) -> Result<(), ActionError>;

    /// Adds a named polygon for display. Headless simulators may ignore it.
    fn add_polygon(
        &mut self,
        _name: &str,
        _shape: &[Point2d],
        _color: Color,
    ) -> Result<(), ActionError> {
        Ok(())
    }

    /// Changes the display of a named polygon. Headless simulators may ignore it.
    fn set_polygon_color(
        &mut self,
        _name: &str,
        _color: Color,
        _filled: bool,
    ) -> Result<(), ActionError> {
        Ok(())
    }
}

impl<S: Simulator + ?Sized> Simulator for &mut S {
    fn net_boundary(&self) -> Result<Rect, SimulationError> {
        (**self).net_boundary()
    }

    fn lane_ids(&self) -> Result<Vec<String>, SimulationError> {
        (**self).lane_ids()
    }

    fn lane_shape(&self, lane_id: &str) -> Result<Vec<Point2d>, SimulationError> {
        (**self).lane_shape(lane_id)
    }

    fn lane_max_speed(&self, lane_id: &str) -> Result<f64, SimulationError> {
        (**self).lane_max_speed(lane_id)
    }

    fn traffic_light_ids(&self) -> Result<Vec<String>, SimulationError> {
        (**self).traffic_light_ids()
    }

    fn controlled_lanes(&self, tl_id: &str) -> Result<Vec<String>, SimulationError> {
        (**self).controlled_lanes(tl_id)
    }

    fn signal_programs(&self, tl_id: &str) -> Result<Vec<Logic>, SimulationError> {
        (**self).signal_programs(tl_id)
    }

    fn active_program(&self, tl_id: &str) -> Result<String, SimulationError> {
        (**self).active_program(tl_id)
    }

    fn vehicle_ids(&self) -> Result<Vec<String>, SimulationError> {
        (**self).vehicle_ids()
    }

    fn vehicle_position(&self, vehicle_id: &str) -> Result<Point2d, SimulationError> {
        (**self).vehicle_position(vehicle_id)
    }

    fn vehicle_emissions(&self, vehicle_id: &str) -> Result<Pollutants, SimulationError> {
        (**self).vehicle_emissions(vehicle_id)
    }

    fn step(&mut self) -> Result<(), SimulationError> {
        (**self).step()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn set_lane_max_speed(&mut self, lane_id: &str, speed: f64) -> Result<(), ActionError> {
        (**self).set_lane_max_speed(lane_id, speed)
    }

    fn set_signal_program(&mut self, tl_id: &str, logic: &Logic) -> Result<(), ActionError> {
        (**self).set_signal_program(tl_id, logic)
    }

    fn reroute_vehicle(&mut self, vehicle_id: &str) -> Result<(), ActionError> {
        (**self).reroute_vehicle(vehicle_id)
    }

    fn remove_vehicle(&mut self, vehicle_id: &str) -> Result<(), ActionError> {
        (**self).remove_vehicle(vehicle_id)
    }

    fn adjust_edge_weights(&mut self) -> Result<(), ActionError> {
        (**self).adjust_edge_weights()
    }

    fn add_polygon(
        &mut self,
        name: &str,
        shape: &[Point2d],
        color: Color,
    ) -> Result<(), ActionError> {
        (**self).add_polygon(name, shape, color)
    }

    fn set_polygon_color(
        &mut self,
        name: &str,
        color: Color,
        filled: bool,
    ) -> Result<(), ActionError> {
        (**self).set_polygon_color(name, color, filled)
    }
}
