//! Command-line argument parsing.

use clap::Parser;

/// Swap Monte Carlo simulation driven by a YAML parameter file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML parameter file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Path to the initial configuration (N, comment, then
    /// "molecule_type particle_type x y z" rows)
    #[arg(short, long)]
    pub positions: String,

    /// Run folder: outputs land here and bonds.txt is looked up here
    #[arg(short, long, default_value = ".")]
    pub folder: String,

    /// Override the number of time steps
    #[arg(long)]
    pub time_steps: Option<usize>,

    /// Override the temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Override the RNG seed
    #[arg(long)]
    pub seed: Option<u64>,
}
