//! vic_params: gridded parameter files for the VIC land-surface model
//!
//! Builds the VIC 5 image-driver parameter file for an arbitrary domain from
//! global source datasets: SoilGrids soil texture, WorldClim climatology,
//! CLM vegetation, Köppen-Geiger climate zones, permafrost extent and GTOPO30
//! elevation. Every source is regridded onto the domain grid, then the soil,
//! vegetation, baseflow and climate parameters are derived cell by cell using
//! parallel processing.
//!
//! ## Module Organization
//!
//! - [`config`]: TOML run configuration
//! - [`domain`]: the target grid and its land mask
//! - [`regrid`]: regridding backends and the catalogue of source datasets
//! - [`soil`]: texture classes, hydraulic parameters and layer aggregation
//! - [`vegetation`]: vegetation tiles from plant functional type cover
//! - [`hydroclimate`]: climate and permafrost classes
//! - [`baseflow`]: baseflow parameters from reference cells per class
//! - [`climate`]: annual temperature, precipitation and time zone offset
//! - [`pipeline`]: the stages of a complete run
//! - [`schema`] and [`params`]: layout and in-memory form of the parameter file
//! - [`netcdf_io`]: NetCDF reading and writing
//! - [`metadata`]: file inspection and parameter file validation
//! - [`statistics`]: NaN-aware reductions over array axes
//! - [`parallel`]: thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use vic_params::prelude::*;
//!
//! let config = Config::from_file(Path::new("run.toml")).unwrap();
//! let regridder = NativeRegridder::new();
//! let output = vic_params::pipeline::run_all(&config, &regridder).unwrap();
//! println!("wrote {}", output.display());
//! ```

pub mod baseflow;
pub mod cli;
pub mod climate;
pub mod config;
pub mod domain;
pub mod errors;
#[cfg(feature = "geotiff")]
pub mod geotiff;
pub mod hydroclimate;
pub mod metadata;
pub mod netcdf_io;
pub mod parallel;
pub mod params;
pub mod pipeline;
pub mod regrid;
pub mod schema;
pub mod soil;
pub mod statistics;
pub mod vegetation;

pub use errors::{Result, VicParamsError};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{Config, RegridBackend};
    pub use crate::domain::Domain;
    pub use crate::errors::{Result, VicParamsError};
    pub use crate::hydroclimate::{HydroclimateClass, HydroclimateMasks};
    pub use crate::netcdf_io::ParameterWriter;
    pub use crate::parallel::ParallelConfig;
    pub use crate::params::{ParamArray, ParameterSet};
    pub use crate::regrid::{CdoRegridder, NativeRegridder, RegridJob, Regridder};
    pub use crate::soil::SoilTexture;
    pub use crate::statistics::{StatOperation, StatisticalReduction};
}
