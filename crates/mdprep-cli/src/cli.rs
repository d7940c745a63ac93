use clap::{Args, Parser, Subcommand};
use mdprep::core::presets::Preset;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The mdprep developers",
    version,
    about = "mdprep CLI - Build and edit GROMACS run parameter files and summarize secondary-structure matrices.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, inspect and edit `.mdp` run parameter files.
    Mdp(MdpArgs),
    /// Inspect and summarize `.xpm` secondary-structure matrices from `gmx do_dssp`.
    Xpm(XpmArgs),
}

#[derive(Args, Debug)]
pub struct MdpArgs {
    #[command(subcommand)]
    pub command: MdpCommands,
}

#[derive(Subcommand, Debug)]
pub enum MdpCommands {
    /// Write one of the stock parameter files, optionally customized.
    Preset(PresetArgs),
    /// Print a parameter value, or a whole group when NAME is a group title.
    Get {
        /// Path to the `.mdp` file.
        #[arg(required = true, value_name = "FILE")]
        file: PathBuf,
        /// Parameter key or group title.
        #[arg(required = true, value_name = "NAME")]
        name: String,
    },
    /// Change parameters in an existing file.
    Set(SetArgs),
    /// Convert durations in ps into step counts using the file's `dt`.
    Steps {
        /// Path to the `.mdp` file.
        #[arg(required = true, value_name = "FILE")]
        file: PathBuf,
        /// One or more durations in ps.
        #[arg(required = true, value_name = "TIME", num_args(1..))]
        times: Vec<f64>,
    },
}

/// Arguments for the `mdp preset` subcommand.
#[derive(Args, Debug)]
pub struct PresetArgs {
    /// Preset to start from (minimize-vacuum, minimize-solvated, explicit-solvent,
    /// posres-explicit-solvent). May instead be given in the config file.
    #[arg(value_name = "NAME")]
    pub preset: Option<Preset>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the result to this path instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Overwrite the output file if it already exists.
    #[arg(short, long, requires = "output")]
    pub force: bool,

    // --- Coupling Overrides ---
    /// Reference temperature in K for every coupling group.
    #[arg(short, long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Thermostat coupling time in ps.
    #[arg(long, value_name = "PS", conflicts_with = "gamma")]
    pub tau_t: Option<f64>,

    /// Friction coefficient in 1/ps; `tau_t` is set to its inverse.
    #[arg(long, value_name = "PER_PS")]
    pub gamma: Option<f64>,

    /// Random seed for the stochastic integrator and velocity generation.
    #[arg(long, value_name = "INT")]
    pub seed: Option<i64>,

    /// Override `coupling.velocity-generation` from the config file.
    #[command(flatten)]
    pub velocity_generation: VelocityGeneration,

    /// Set a parameter, overriding the preset and config file.
    /// Can be used multiple times. Example: -S nsteps=500000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// A group to handle mutually exclusive velocity-generation flags.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct VelocityGeneration {
    /// Generate initial velocities at the reference temperature.
    #[arg(long)]
    pub velocity_generation: bool,
    /// Do not generate initial velocities.
    #[arg(long)]
    pub no_velocity_generation: bool,
}

impl VelocityGeneration {
    pub fn as_option(self) -> Option<bool> {
        match (self.velocity_generation, self.no_velocity_generation) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Arguments for the `mdp set` subcommand.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Path to the `.mdp` file to edit.
    #[arg(required = true, value_name = "FILE")]
    pub file: PathBuf,

    /// Parameter assignment. Can be used multiple times.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", required = true, num_args(1..))]
    pub set_values: Vec<String>,

    /// Write the edited file here instead of modifying FILE in place.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Overwrite the output file if it already exists.
    #[arg(short, long, requires = "output")]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct XpmArgs {
    #[command(subcommand)]
    pub command: XpmCommands,
}

#[derive(Subcommand, Debug)]
pub enum XpmCommands {
    /// Show dimensions, legend and axis extents of a matrix.
    Info {
        /// Path to the `.xpm` file.
        #[arg(required = true, value_name = "FILE")]
        file: PathBuf,
    },
    /// Aggregate one or more matrices into per-time secondary-structure percentages.
    Stats(StatsArgs),
}

/// Arguments for the `xpm stats` subcommand.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// One or more `.xpm` files; columns sharing a time are pooled.
    #[arg(required = true, value_name = "FILE", num_args(1..))]
    pub files: Vec<PathBuf>,

    /// Legend name to report separately (e.g. "A-Helix"). Everything else is
    /// counted as "other". Reports every category when omitted.
    #[arg(short, long, value_name = "NAME")]
    pub keep: Vec<String>,

    /// Write CSV here instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_preset_with_coupling_flags() {
        let cli = Cli::parse_from([
            "mdprep",
            "-vv",
            "mdp",
            "preset",
            "explicit-solvent",
            "--gamma",
            "1.0",
            "--no-velocity-generation",
            "-S",
            "nsteps=100",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Mdp(MdpArgs {
            command: MdpCommands::Preset(args),
        }) = cli.command
        else {
            panic!("Expected 'mdp preset' subcommand");
        };
        assert_eq!(args.preset, Some(Preset::ExplicitSolvent));
        assert_eq!(args.gamma, Some(1.0));
        assert_eq!(args.velocity_generation.as_option(), Some(false));
        assert_eq!(args.set_values, vec!["nsteps=100"]);
    }

    #[test]
    fn tau_t_and_gamma_conflict() {
        let result = Cli::try_parse_from([
            "mdprep", "mdp", "preset", "--tau-t", "1", "--gamma", "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn velocity_flags_are_exclusive() {
        let result = Cli::try_parse_from([
            "mdprep",
            "mdp",
            "preset",
            "--velocity-generation",
            "--no-velocity-generation",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_preset_is_rejected() {
        assert!(Cli::try_parse_from(["mdprep", "mdp", "preset", "npt"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mdprep", "-q", "-v", "xpm", "info", "ss.xpm"]).is_err());
    }

    #[test]
    fn parses_stats_with_keep_list() {
        let cli = Cli::parse_from([
            "mdprep", "xpm", "stats", "a.xpm", "b.xpm", "-k", "A-Helix", "-k", "B-Sheet",
        ]);
        let Commands::Xpm(XpmArgs {
            command: XpmCommands::Stats(args),
        }) = cli.command
        else {
            panic!("Expected 'xpm stats' subcommand");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.keep, vec!["A-Helix", "B-Sheet"]);
        assert!(args.output.is_none());
    }
}
