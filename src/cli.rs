//! Command-line interface of the `vic-params` binary

use crate::config::RegridBackend;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Derive VIC parameter files from regridded soil, climate and vegetation data
#[derive(Parser, Debug)]
#[command(
    version,
    name = "vic-params",
    about = "Generate VIC land-surface model parameter files"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,
}

/// Options shared by the commands that read a run configuration
#[derive(ClapArgs, Debug, Clone)]
pub struct RunOptions {
    /// Path to the TOML run configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the configured regridding backend
    #[arg(long, value_enum)]
    pub regridder: Option<RegridBackend>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regrid every source dataset onto the domain grid
    Regrid(RunOptions),

    /// Classify hydroclimates from the regridded Köppen-Geiger and permafrost maps
    Hydroclimate(RunOptions),

    /// Derive all parameters from regridded inputs and write the parameter file
    Build(RunOptions),

    /// Regrid, classify and build in one go
    Run(RunOptions),

    /// Inspect a NetCDF file
    Inspect(InspectArgs),

    /// Print the USDA texture class of a sand/clay/silt mix in percent
    Classify {
        sand: f64,
        clay: f64,
        silt: f64,
    },

    /// Convert SoilGrids and WorldClim GeoTIFFs into NetCDF
    #[cfg(feature = "geotiff")]
    ConvertGeotiff(ConvertArgs),
}

#[derive(ClapArgs, Debug)]
pub struct InspectArgs {
    /// Path to the NetCDF file
    pub file: PathBuf,

    /// List all variables and dimensions
    #[arg(long)]
    pub list_vars: bool,

    /// Describe a specific variable (data type, shape, and attributes)
    #[arg(long)]
    pub describe: Option<String>,

    /// Compute quick statistics (min/mean/max/std) for a variable
    #[arg(long)]
    pub summary: Option<String>,

    /// Check the file against the parameter file layout
    #[arg(long)]
    pub validate: bool,
}

#[cfg(feature = "geotiff")]
#[derive(ClapArgs, Debug)]
pub struct ConvertArgs {
    /// Path to the TOML run configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Only convert SoilGrids layers
    #[arg(long, conflicts_with = "worldclim_only")]
    pub soil_only: bool,

    /// Only convert WorldClim months
    #[arg(long)]
    pub worldclim_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_run_with_override() {
        let args = Args::parse_from([
            "vic-params",
            "-t",
            "4",
            "build",
            "--config",
            "run.toml",
            "--regridder",
            "cdo",
        ]);
        assert_eq!(args.threads, Some(4));
        match args.command {
            Command::Build(options) => {
                assert_eq!(options.config, PathBuf::from("run.toml"));
                assert_eq!(options.regridder, Some(RegridBackend::Cdo));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_classify() {
        let args = Args::parse_from(["vic-params", "classify", "40", "20", "40"]);
        assert!(matches!(args.command, Command::Classify { sand, .. } if sand == 40.0));
    }
}
