use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::info;
use structopt::StructOpt;
use traffic_emissions::sim::{ManhattanParams, Scenario, Simulation};
use traffic_emissions::{run, Config};

#[derive(StructOpt)]
#[structopt(
    name = "traffic-emissions",
    about = "Monitors the emissions of a traffic simulation over a grid, and acts on polluted areas"
)]
struct Flags {
    /// A JSON configuration file. Flags given on the command line take precedence.
    #[structopt(long)]
    config: Option<PathBuf>,
    /// A JSON scenario to simulate. Without one, a generated street grid is used.
    #[structopt(long)]
    scenario: Option<PathBuf>,
    /// The number of steps to simulate.
    #[structopt(long)]
    steps: Option<usize>,
    /// The number of areas along each side of the grid.
    #[structopt(long)]
    cells: Option<usize>,
    /// The number of steps summed when comparing emissions to the threshold.
    #[structopt(long)]
    window: Option<usize>,
    /// The windowed emissions of an area, in mg, at which actions apply.
    #[structopt(long)]
    threshold: Option<f64>,
    /// Only monitor emissions, and write the total to the reference file.
    #[structopt(long)]
    without_actions: bool,
    /// The reference file.
    #[structopt(long = "ref")]
    reference: Option<PathBuf>,
    /// Write the log to this file instead of stderr.
    #[structopt(long)]
    log_file: Option<PathBuf>,
    /// Seeds the generated street grid.
    #[structopt(long)]
    seed: Option<u64>,
}

impl Flags {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(cells) = self.cells {
            config.cells_number = cells;
        }
        if let Some(window) = self.window {
            config.window_size = window;
        }
        if let Some(threshold) = self.threshold {
            config.emissions_threshold = threshold;
        }
        if self.without_actions {
            config.without_actions = true;
        }
        if self.reference.is_some() {
            config.reference = self.reference.clone();
        }
        Ok(config)
    }

    fn scenario(&self) -> Result<Scenario> {
        match &self.scenario {
            Some(path) => Ok(Scenario::load(path)?),
            None => {
                let mut params = ManhattanParams::default();
                if let Some(seed) = self.seed {
                    params.seed = seed;
                }
                Ok(Scenario::manhattan(&params))
            }
        }
    }
}

fn setup_logger(log_file: Option<&PathBuf>) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Could not create log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let flags = Flags::from_args();
    setup_logger(flags.log_file.as_ref())?;

    let config = flags.config()?;
    let scenario = flags.scenario()?;
    let sim = Simulation::from_scenario(&scenario)?;
    info!(
        "Simulating {} links, {} traffic lights and {} trips",
        scenario.links.len(),
        scenario.traffic_lights.len(),
        scenario.trips.len()
    );

    let report = run(config, sim, &AtomicBool::new(false))?;
    if let Some(reduction) = report.reduction_percent() {
        println!("{:.2}% less emissions than the reference", reduction);
    }
    println!("Total emissions: {:.0} mg", report.total_emissions);
    Ok(())
}
