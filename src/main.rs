//! Entry point for the vic-params application.
//! Handles CLI parsing, logging setup, and dispatches to the pipeline stages.

use clap::Parser;
use netcdf::open;
use std::error::Error;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vic_params::cli::{Args, Command, InspectArgs, RunOptions};
use vic_params::config::Config;
use vic_params::metadata::{
    compute_variable_summary, describe_variable, list_variables_and_dimensions, print_metadata,
    validate_parameter_file,
};
use vic_params::parallel::ParallelConfig;
use vic_params::pipeline;
use vic_params::regrid::{regridder_for, Regridder};
use vic_params::soil::{classify, SoilHydraulics};

fn setup_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load(options: &RunOptions) -> Result<(Config, Box<dyn Regridder>), Box<dyn Error>> {
    let mut config = Config::from_file(&options.config)?;
    if let Some(backend) = options.regridder {
        config.parameter_specs.regridder = backend;
    }
    let specs = &config.parameter_specs;
    let regridder = regridder_for(specs.regridder, &specs.cdo_binary);
    info!(config = %options.config.display(), grid = %specs.grid, "loaded configuration");
    Ok((config, regridder))
}

fn inspect(args: &InspectArgs) -> Result<(), Box<dyn Error>> {
    let file = open(&args.file)?;
    let path: &Path = &args.file;

    if args.list_vars {
        list_variables_and_dimensions(&file)?;
    } else if let Some(var) = &args.describe {
        describe_variable(&file, path, var)?;
    } else if let Some(var) = &args.summary {
        let summary = compute_variable_summary(&file, path, var)?;
        println!("\nSummary for {}\n{}", var, summary);
    } else if args.validate {
        let report = validate_parameter_file(&file)?;
        println!("{}", report);
        if !report.is_valid() {
            return Err(format!("{} is not a valid parameter file", path.display()).into());
        }
    } else {
        print_metadata(&file)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_logging(args.verbose)?;
    ParallelConfig::new(args.threads).setup_global_pool()?;

    match &args.command {
        Command::Regrid(options) => {
            let (config, regridder) = load(options)?;
            let jobs = pipeline::run_regrid(&config, regridder.as_ref())?;
            info!(jobs, "regridding complete");
        }
        Command::Hydroclimate(options) => {
            let (config, _) = load(options)?;
            let masks = pipeline::make_hydroclimate_masks(&config)?;
            for (class, cells) in masks.counts() {
                info!(class = class.name(), cells, "hydroclimate class");
            }
        }
        Command::Build(options) => {
            let (config, _) = load(options)?;
            let set = pipeline::build_parameters(&config)?;
            let output = pipeline::write_parameters(&config, &set)?;
            println!("Saved parameters to {}", output.display());
        }
        Command::Run(options) => {
            let (config, regridder) = load(options)?;
            let output = pipeline::run_all(&config, regridder.as_ref())?;
            println!("Saved parameters to {}", output.display());
        }
        Command::Inspect(inspect_args) => inspect(inspect_args)?,
        Command::Classify { sand, clay, silt } => {
            let texture = classify(*sand, *clay, *silt);
            match texture {
                Some(texture) => println!("{} ({})", texture, texture.code()),
                None => println!("unclassified, using loam"),
            }
            let row = SoilHydraulics::for_class(texture);
            println!("   Ksat: {:.2} mm/day", row.ksat_mm_per_day());
            println!("   b: {}", row.b);
            println!("   expt: {:.3}", row.expt());
            println!("   bubble: {:.3}", row.bubble());
            println!("   Wpwp: {}", row.wpwp_fract);
            println!("   Wcr: {}", row.wcr_fract);
            println!("   resid_moist: {}", row.resid_moist);
            println!("   quartz: {}", row.quartz);
            println!("   bulk_density: {}", row.bulk_density);
        }
        #[cfg(feature = "geotiff")]
        Command::ConvertGeotiff(convert) => convert_geotiff(convert)?,
    }

    Ok(())
}

#[cfg(feature = "geotiff")]
fn convert_geotiff(args: &vic_params::cli::ConvertArgs) -> Result<(), Box<dyn Error>> {
    use vic_params::geotiff::{batch_convert_soilgrids, batch_convert_worldclim};

    let config = Config::from_file(&args.config)?;
    if !args.worldclim_only {
        let dir = config
            .soil
            .geotiff_dir
            .as_ref()
            .ok_or("soil.geotiff_dir is not configured")?;
        let written = batch_convert_soilgrids(dir, &config.soil.netcdf_dir)?;
        info!(files = written.len(), "converted SoilGrids");
    }
    if !args.soil_only {
        let dir = config
            .worldclim
            .geotiff_dir
            .as_ref()
            .ok_or("worldclim.geotiff_dir is not configured")?;
        let written = batch_convert_worldclim(dir, &config.worldclim.netcdf_dir)?;
        info!(files = written.len(), "converted WorldClim");
    }
    Ok(())
}
