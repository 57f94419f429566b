use anyhow::Result;
use clap::Parser;
use flowdef::install::{InstallOptions, install, validate};
use std::path::PathBuf;

/// flowdef - Flow libdef installer
///
/// Finds library definitions for your project's dependencies in a local
/// checkout of the flow-typed definitions repository and installs them into
/// ./flow-typed/npm.
///
/// Examples:
///   flowdef install                  # Install libdefs for every package.json dependency
///   flowdef install lodash@^4.2.0    # Install a libdef for one dependency
///   flowdef validate                 # Lint the whole libdef repository
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Libdef repository directory (defaults to ~/.flowdef/definitions; also via FLOWDEF_DEFS_DIR)
    #[arg(
        long = "defs-dir",
        short = 'd',
        env = "FLOWDEF_DEFS_DIR",
        value_name = "PATH",
        global = true
    )]
    pub defs_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install libdefs into the ./flow-typed directory
    Install(InstallArgs),

    /// Check every libdef in the repository and report all problems
    Validate(ValidateArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Explicit libdefs to install, in the format "foo@1.2.3" (defaults to
    /// all package.json dependencies)
    #[arg(value_name = "PKG@RANGE")]
    pub packages: Vec<String>,

    /// The Flow version that installed libdefs must be compatible with
    #[arg(long = "flow-version", short = 'f', value_name = "VERSION")]
    pub flow_version: Option<String>,

    /// If a libdef is already present locally, overwrite it with the latest
    /// matching version
    #[arg(long, short)]
    pub overwrite: bool,

    /// Print additional, verbose info while installing libdefs
    #[arg(long)]
    pub verbose: bool,
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = flowdef::runtime::RealRuntime;

    match cli.command {
        Commands::Install(args) => install(
            &runtime,
            InstallOptions {
                explicit_libdefs: args.packages,
                flow_version: args.flow_version,
                overwrite: args.overwrite,
                verbose: args.verbose,
                defs_dir: cli.defs_dir,
            },
        ),
        Commands::Validate(_args) => validate(&runtime, cli.defs_dir),
    }
}
