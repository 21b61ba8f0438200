//! Application shell: argument parsing, configuration and run assembly.

use std::path::Path;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::{Args, SimConfig, SimulationModel};
use crate::energy::Interactions;
use crate::geometry::Box3;
use crate::input::{read_bonds, read_configuration};
use crate::molecules::Molecules;
use crate::montecarlo::{MonteCarlo, RunParameters};
use crate::neighbors::NeighborTable;
use crate::output::RunRecorder;
use crate::topology::BondTable;

/// Install the logging subscriber. Called once by the driver before anything
/// else runs.
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
}

pub struct Application {
    args: Args,
    config: SimConfig,
}

impl Application {
    /// Parse the command line, load the parameter file and fold the CLI
    /// overrides in.
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let mut config = SimConfig::from_file(&args.config_file)?;
        if let Some(time_steps) = args.time_steps {
            config.simulation.time_steps = time_steps;
        }
        if let Some(temperature) = args.temperature {
            config.system.temperature = temperature;
        }
        if let Some(seed) = args.seed {
            config.simulation.seed = Some(seed);
        }
        config.validate()?;
        Ok(Application { args, config })
    }

    pub fn run(self) -> Result<()> {
        let Application { args, config } = self;
        let folder = Path::new(&args.folder);

        let configuration = read_configuration(Path::new(&args.positions))?;
        let n_particles = configuration.n_particles();
        let cell = Box3::from_density(n_particles, config.system.density);
        info!(
            "{} particles at density {} in a box of edge {:.6}",
            n_particles,
            config.system.density,
            cell.length()
        );

        let diameters = configuration
            .particle_types
            .iter()
            .map(|&particle_type| config.diameter_for(particle_type))
            .collect::<Result<Vec<f64>>>()?;

        // Enforce the wrapped-coordinate invariant on whatever the input
        // carried; startup wrapping does not count as box crossings.
        let positions = configuration
            .positions
            .iter()
            .map(|position| cell.wrap(position).0)
            .collect();

        let bonds = match config.system.model {
            SimulationModel::Polymer => {
                let bond_path = folder.join("bonds.txt");
                let edges = read_bonds(&bond_path, n_particles)?;
                let table = BondTable::from_edges(n_particles, &edges)?;
                info!("loaded {} bonds from {}", table.n_bonds(), bond_path.display());
                Some(table)
            }
            SimulationModel::Atomic => None,
        };

        let system = Molecules::new(
            cell,
            positions,
            diameters,
            configuration.molecule_types,
            configuration.particle_types,
            bonds,
        );

        let interactions = match config.system.model {
            SimulationModel::Atomic => {
                Interactions::atomic(config.potential.rc, config.lj_shift())
            }
            SimulationModel::Polymer => {
                let fene = config
                    .potential
                    .fene
                    .ok_or_else(|| eyre!("the polymer model requires FENE parameters"))?;
                Interactions::polymer(
                    config.potential.rc,
                    config.lj_shift(),
                    fene.r0,
                    fene.k,
                    config.potential.bond_model,
                )
            }
        };

        let neighbors = NeighborTable::new(
            config.neighbors.method,
            config.potential.rc,
            config.neighbors.r_skin,
            n_particles,
        );

        let rng = match config.simulation.seed {
            Some(seed) => {
                info!("seeding the RNG with {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        let params = RunParameters {
            temperature: config.system.temperature,
            r_box: config.moves.r_box,
            time_steps: config.simulation.time_steps,
            swap_fraction: config.moves.swap.then_some(config.moves.swap_fraction),
            log_pressure: config.simulation.log_pressure,
        };

        let mut engine = MonteCarlo::new(system, interactions, neighbors, params, rng)?;
        info!(
            "initial energy per particle: {:.6}",
            engine.energy_per_particle()
        );

        let mut recorder = RunRecorder::create(
            folder,
            config.simulation.time_steps,
            config.simulation.save_update,
        )?;
        engine.run(&mut recorder)?;
        info!(
            "simulation finished after {} sweeps",
            config.simulation.time_steps
        );
        Ok(())
    }
}
