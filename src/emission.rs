use crate::error::SimulationError;
use crate::math::Point2d;
use crate::simulator::Simulator;
use serde::{Deserialize, Serialize};

/// The pollutants emitted by a vehicle during one step, in mg.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub co: f64,
    pub nox: f64,
    pub hc: f64,
    pub pmx: f64,
    pub co2: f64,
}

impl Pollutants {
    /// The sum of the five pollutant quantities.
    pub fn total(&self) -> f64 {
        self.co + self.nox + self.hc + self.pmx + self.co2
    }

    /// Scales every quantity by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            co: self.co * factor,
            nox: self.nox * factor,
            hc: self.hc * factor,
            pmx: self.pmx * factor,
            co2: self.co2 * factor,
        }
    }
}

/// A snapshot of a vehicle taken after a simulation step.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleSample {
    pub id: String,
    pub pos: Point2d,
    /// Total emissions during the step, in mg.
    pub emissions: f64,
}

/// Reads the position and emissions of every active vehicle.
pub fn sample_vehicles<S: Simulator + ?Sized>(
    sim: &S,
) -> Result<Vec<VehicleSample>, SimulationError> {
    sim.vehicle_ids()?
        .into_iter()
        .map(|id| {
            let pos = sim.vehicle_position(&id)?;
            let emissions = sim.vehicle_emissions(&id)?.total();
            Ok(VehicleSample { id, pos, emissions })
        })
        .collect()
}
