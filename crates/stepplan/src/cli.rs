use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "stepplan",
    author,
    version,
    about = "Plan and dry-run multi-pass GPGPU simulations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a simulation file and print its textures, passes, and samples.
    Plan(PlanArgs),
    /// Advance a simulation without a GPU, printing the slots each pass binds.
    Run(RunArgs),
}

/// Overrides applied on top of the simulation file before validation.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Simulation description (TOML).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Render targets bindable per pass.
    #[arg(long, value_name = "N", env = "STEPPLAN_TEXTURES_MAX")]
    pub textures_max: Option<usize>,

    /// Steps of history kept in the ping-pong ring.
    #[arg(long, value_name = "N")]
    pub steps: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the plan as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Number of ticks to advance.
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub ticks: u64,

    /// Seconds the simulated host clock moves per tick under wall-clock timing.
    #[arg(long, value_name = "SECONDS", default_value_t = 1.0 / 60.0)]
    pub frame_time: f64,
}

pub fn parse() -> Cli {
    Cli::parse()
}
