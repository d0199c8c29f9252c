//! The simulator calls that apply and revert the actions on an area.
//!
//! Applying stops at the first failed call and reports it. Restoring attempts every
//! object and reports the first failure.

use crate::error::ActionError;
use crate::network::{Lane, TrafficLight};
use crate::simulator::{Color, Simulator};
use log::debug;
use std::collections::HashSet;
use std::rc::Rc;

/// Sets the maximum speed of every lane to `factor` times its initial maximum speed.
pub fn limit_speed<S: Simulator + ?Sized>(
    sim: &mut S,
    lanes: &[Rc<Lane>],
    factor: f64,
) -> Result<(), ActionError> {
    for lane in lanes {
        sim.set_lane_max_speed(&lane.id, lane.initial_max_speed * factor)?;
    }
    Ok(())
}

/// Restores the initial maximum speed of every lane.
///
/// Every lane is attempted even after a failure; the first failure is returned.
pub fn restore_speed<S: Simulator + ?Sized>(
    sim: &mut S,
    lanes: &[Rc<Lane>],
) -> Result<(), ActionError> {
    first_error(
        lanes
            .iter()
            .map(|lane| sim.set_lane_max_speed(&lane.id, lane.initial_max_speed)),
    )
}

/// Shortens every phase of every program of the traffic lights by `factor`.
/// The program that was running is pushed last so it keeps running.
pub fn adjust_traffic_lights<S: Simulator + ?Sized>(
    sim: &mut S,
    lights: &[Rc<TrafficLight>],
    factor: f64,
) -> Result<(), ActionError> {
    for light in lights {
        for logic in light.logics_running_last() {
            sim.set_signal_program(&light.id, &logic.scaled(factor))?;
        }
    }
    Ok(())
}

/// Pushes the recorded programs of the traffic lights back to the simulator, leaving
/// each traffic light on the program it was running.
///
/// Every traffic light is attempted even after a failure; the first failure is returned.
pub fn restore_traffic_lights<S: Simulator + ?Sized>(
    sim: &mut S,
    lights: &[Rc<TrafficLight>],
) -> Result<(), ActionError> {
    first_error(lights.iter().map(|light| {
        light
            .logics_running_last()
            .try_for_each(|logic| sim.set_signal_program(&light.id, logic))
    }))
}

/// Bars entry into an area by bringing its lanes down to `lock_speed`, then sends the
/// vehicles inside on another route. A vehicle that cannot be rerouted is removed, and
/// added to `removed`.
pub fn lock_area<S: Simulator + ?Sized>(
    sim: &mut S,
    lanes: &[Rc<Lane>],
    lock_speed: f64,
    occupants: &[&str],
    removed: &mut HashSet<String>,
) -> Result<(), ActionError> {
    for lane in lanes {
        sim.set_lane_max_speed(&lane.id, lock_speed)?;
    }
    for vehicle_id in occupants {
        if let Err(err) = sim.reroute_vehicle(vehicle_id) {
            debug!("Removing {}: {}", vehicle_id, err);
            sim.remove_vehicle(vehicle_id)?;
            removed.insert(vehicle_id.to_string());
        }
    }
    Ok(())
}

/// Marks the area polygon as alerting.
pub fn highlight_area<S: Simulator + ?Sized>(sim: &mut S, name: &str) -> Result<(), ActionError> {
    sim.set_polygon_color(name, Color::RED, true)
}

/// Returns the area polygon to its default display.
pub fn reset_area_color<S: Simulator + ?Sized>(
    sim: &mut S,
    name: &str,
) -> Result<(), ActionError> {
    sim.set_polygon_color(name, Color::GREEN, false)
}

/// Consumes every result, returning the first failure.
fn first_error(results: impl Iterator<Item = Result<(), ActionError>>) -> Result<(), ActionError> {
    results.fold(Ok(()), |acc, result| acc.and(result))
}
