use crate::config::Config;
use crate::emission::sample_vehicles;
use crate::error::Error;
use crate::grid::Grid;
use crate::network::index_network;
use crate::policy::{ActionEvent, Policy};
use crate::report::{Reference, Report};
use crate::simulator::{Color, Simulator};
use log::{error, info, warn};
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;

/// A run that ended on a fatal error, with the statistics collected until then.
#[derive(Error, Debug)]
#[error("Simulation aborted after {} steps: {}", .report.steps, .error)]
pub struct Aborted {
    pub report: Report,
    #[source]
    pub error: Error,
}

/// Owns the simulator, and closes it when dropped.
struct Connection<S: Simulator> {
    sim: S,
    open: bool,
}

impl<S: Simulator> Connection<S> {
    fn new(sim: S) -> Self {
        Self { sim, open: true }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.sim.close();
            info!("End of the simulation");
        }
    }
}

impl<S: Simulator> Deref for Connection<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.sim
    }
}

impl<S: Simulator> DerefMut for Connection<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.sim
    }
}

impl<S: Simulator> Drop for Connection<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Monitors the emissions of a simulation and applies the policy to every area.
pub struct Controller<S: Simulator> {
    /// The simulator connection.
    sim: Connection<S>,
    config: Config,
    policy: Policy,
    grid: Grid,
    /// The baseline to compare the run against.
    reference: Option<Reference>,
    /// The number of steps simulated so far.
    steps: usize,
    /// The actions applied, reverted or failed so far.
    events: Vec<ActionEvent>,
}

impl<S: Simulator> Controller<S> {
    /// Takes ownership of the simulator, builds the grid over its network and indexes
    /// the lanes and traffic lights of every area.
    ///
    /// The simulator is closed if this fails.
    pub fn new(config: Config, sim: S) -> Result<Self, Error> {
        let mut sim = Connection::new(sim);
        config.validate()?;
        let reference = match (&config.reference, config.without_actions) {
            (Some(path), false) => Some(Reference::load(path)?),
            _ => None,
        };

        info!("Loading data for the simulation");
        let start = Instant::now();
        let mut grid = Grid::new(sim.net_boundary()?, config.cells_number)?;
        if config.draw_grid {
            for area in grid.areas() {
                let shape = area.rect().corners();
                if let Err(err) = sim.add_polygon(area.name(), &shape, Color::GREEN) {
                    warn!("Could not draw {}: {}", area.name(), err);
                }
            }
        }
        index_network(&mut grid, &*sim)?;
        info!("Data loaded ({:.2}s)", start.elapsed().as_secs_f64());

        Ok(Self {
            sim,
            policy: Policy::new(&config),
            config,
            grid,
            reference,
            steps: 0,
            events: vec![],
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The number of steps simulated so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn events(&self) -> &[ActionEvent] {
        &self.events
    }

    pub fn simulator(&self) -> &S {
        &self.sim
    }

    pub fn simulator_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// Advances the simulation by one step, records the emissions of every area
    /// and applies the policy to each of them in grid order.
    pub fn step(&mut self) -> Result<(), Error> {
        self.sim.step()?;
        let vehicles = sample_vehicles(&*self.sim)?;

        // Vehicles on a shared cell edge may be removed by the lock of a neighbouring area
        let mut removed: HashSet<String> = HashSet::new();
        for area in self.grid.areas_mut() {
            area.record_step(&vehicles);
            let mut occupants = area.occupants(&vehicles);
            occupants.retain(|id| !removed.contains(*id));
            let events = self.policy.evaluate(area, &occupants, &mut removed, &mut *self.sim);
            for event in &events {
                if event.is_failure() {
                    warn!("{}", event);
                } else {
                    info!("{}", event);
                }
            }
            self.events.extend(events);
        }

        if self.config.weight_routing && !self.config.without_actions {
            match self.sim.adjust_edge_weights() {
                Ok(()) => info!("Action - Lane weights adjusted"),
                Err(err) => warn!("Could not adjust lane weights: {}", err),
            }
        }

        self.steps += 1;
        Ok(())
    }

    /// Steps until the configured number of steps is reached or `interrupt` is raised.
    pub fn run(&mut self, interrupt: &AtomicBool) -> Result<(), Error> {
        info!("Start of the simulation");
        while self.steps < self.config.steps {
            if interrupt.load(Ordering::Relaxed) {
                warn!("Interrupted after {} steps", self.steps);
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    /// Closes the simulator and reports the run.
    pub fn finish(mut self) -> Report {
        self.sim.close();
        let report = Report {
            steps: self.steps,
            total_emissions: self.grid.total_emissions(),
            reference_emissions: self.reference.map(|r| r.total_emissions),
            events: std::mem::take(&mut self.events),
            config: self.config.clone(),
        };
        report.log_summary();
        report
    }
}

/// Runs a whole simulation.
///
/// The simulator is closed and the statistics are reported on every exit path. In
/// without-actions mode the total is saved as the reference when a path is configured.
pub fn run<S: Simulator>(config: Config, sim: S, interrupt: &AtomicBool) -> Result<Report, Aborted> {
    let reference_out = match (&config.reference, config.without_actions) {
        (Some(path), true) => Some(path.clone()),
        _ => None,
    };

    let mut controller = match Controller::new(config.clone(), sim) {
        Ok(controller) => controller,
        Err(error) => {
            error!("{}", error);
            let report = Report {
                config,
                ..Default::default()
            };
            return Err(Aborted { report, error });
        }
    };

    let outcome = controller.run(interrupt);
    let report = controller.finish();
    let outcome = outcome.and_then(|()| match &reference_out {
        Some(path) => {
            report.reference().save(path)?;
            info!("Reference written to {}", path.display());
            Ok(())
        }
        None => Ok(()),
    });

    match outcome {
        Ok(()) => Ok(report),
        Err(error) => {
            error!("{}", error);
            Err(Aborted { report, error })
        }
    }
}
