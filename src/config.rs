//! Run configuration
//!
//! A single TOML file describes the target domain, where every source dataset
//! lives, and the handful of constants the derivations need. Sections mirror
//! the source datasets:
//!
//! ```toml
//! [parameter_specs]
//! domain_file = "/data/domain.wr50a.nc"
//! grid = "wr50a"
//! output_dir = "/data/params"
//!
//! [soil]
//! netcdf_dir = "/data/soilgrids/netcdf"
//!
//! [worldclim]
//! netcdf_dir = "/data/worldclim/netcdf"
//!
//! [hydroclimate]
//! dir = "/data/hydroclimate"
//! koppen_filename = "koppen_geiger.nc"
//! brown_filename = "permafrost_extent.nc"
//!
//! [vegetation]
//! dir = "/data/clm"
//! filename = "mksrf_lai.nc"
//! pft_filename = "mksrf_pft.nc"
//!
//! [gtopo]
//! dir = "/data/gtopo"
//! filename = "gtopo30.nc"
//!
//! [baseflow]
//! soil_file = "/data/vic/soil_param.txt"
//! ```

use crate::errors::{Result, VicParamsError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Which implementation performs the crop/range/fill/remap chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RegridBackend {
    /// In-process nearest-neighbour remapping
    #[default]
    Native,
    /// External `cdo` binary
    Cdo,
}

/// Complete run configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub parameter_specs: ParameterSpecs,
    #[serde(default)]
    pub soil: SoilConfig,
    pub worldclim: WorldClimConfig,
    pub hydroclimate: HydroclimateConfig,
    pub vegetation: VegetationConfig,
    pub gtopo: GtopoConfig,
    #[serde(default)]
    pub other: OtherConfig,
    pub baseflow: BaseflowConfig,
    #[serde(default)]
    pub constants: ConstantsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterSpecs {
    /// Domain file defining the target grid and land mask
    pub domain_file: PathBuf,
    /// Short grid name, used in every output file name
    pub grid: String,
    /// Directory receiving regridded inputs, masks and the parameter file
    pub output_dir: PathBuf,
    /// Explicit parameter file path, defaults to `vic_params_<grid>.nc`
    pub output_file: Option<PathBuf>,
    #[serde(default)]
    pub regridder: RegridBackend,
    #[serde(default = "default_cdo_binary")]
    pub cdo_binary: String,
}

impl ParameterSpecs {
    /// Path of the final parameter file
    pub fn output_path(&self) -> PathBuf {
        match &self.output_file {
            Some(path) => path.clone(),
            None => self.output_dir.join(format!("vic_params_{}.nc", self.grid)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SoilConfig {
    /// Directory holding `<var>_sl<n>.nc` SoilGrids NetCDFs
    pub netcdf_dir: PathBuf,
    /// Directory holding the SoilGrids 1 km GeoTIFFs
    pub geotiff_dir: Option<PathBuf>,
    /// Emit `organic`, `bulk_density_comb` and `soil_density_org`
    pub organic_fract: bool,
    /// Total soil column depth in metres when bedrock depth is not used
    pub total_depth: f64,
    /// Derive total depth from SoilGrids depth to bedrock (BDTICM, cm)
    pub use_bedrock_depth: bool,
    pub min_total_depth: f64,
    pub max_total_depth: f64,
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            netcdf_dir: PathBuf::from("."),
            geotiff_dir: None,
            organic_fract: false,
            total_depth: 2.0,
            use_bedrock_depth: false,
            min_total_depth: 0.7,
            max_total_depth: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldClimConfig {
    /// Directory holding `tavg_<MM>.nc` and `prec_<MM>.nc`
    pub netcdf_dir: PathBuf,
    /// Directory holding the original `wc2.0_10m_<var>` GeoTIFF folders
    pub geotiff_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HydroclimateConfig {
    pub dir: PathBuf,
    pub koppen_filename: String,
    #[serde(default = "default_band")]
    pub koppen_variable: String,
    pub brown_filename: String,
    #[serde(default = "default_permafrost_variable")]
    pub permafrost_variable: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VegetationConfig {
    pub dir: PathBuf,
    /// CLM surface file with monthly LAI and canopy top height
    pub filename: String,
    #[serde(default = "default_lai_variable")]
    pub lai_variable: String,
    #[serde(default = "default_height_variable")]
    pub height_variable: String,
    /// CLM surface file with PFT cover percentages
    pub pft_filename: String,
    #[serde(default = "default_pft_variable")]
    pub pft_variable: String,
    #[serde(default)]
    pub max_snow_albedo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GtopoConfig {
    pub dir: PathBuf,
    pub filename: String,
    #[serde(default = "default_band")]
    pub variable: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtherConfig {
    /// Existing parameter file to take `off_gmt` from; computed from longitude otherwise
    pub off_gmt_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseflowConfig {
    /// VIC ASCII soil parameter file with reference baseflow values
    pub soil_file: PathBuf,
    #[serde(default)]
    pub fallback: BaseflowValues,
}

/// Baseflow and infiltration values for one cell
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BaseflowValues {
    pub infilt: f64,
    pub ds: f64,
    pub dsmax: f64,
    pub ws: f64,
    pub c: f64,
}

impl Default for BaseflowValues {
    fn default() -> Self {
        Self {
            infilt: 0.2,
            ds: 0.001,
            dsmax: 10.0,
            ws: 0.9,
            c: 2.0,
        }
    }
}

/// Spatially uniform parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConstantsConfig {
    /// Bare soil surface roughness (m)
    pub rough: f64,
    /// Snow surface roughness (m)
    pub snow_rough: f64,
    /// Soil thermal damping depth (m)
    pub dp: f64,
    pub fs_active: i32,
    /// Mineral particle density (kg/m3)
    pub soil_density: f64,
    /// Organic particle density (kg/m3)
    pub soil_density_org: f64,
    pub phi_s: f64,
}

impl Default for ConstantsConfig {
    fn default() -> Self {
        Self {
            rough: 0.001,
            snow_rough: 0.0005,
            dp: 4.0,
            fs_active: 0,
            soil_density: 2685.0,
            soil_density_org: 1300.0,
            phi_s: -999.0,
        }
    }
}

fn default_cdo_binary() -> String {
    "cdo".to_string()
}

fn default_band() -> String {
    "Band1".to_string()
}

fn default_permafrost_variable() -> String {
    "NCSCDv2".to_string()
}

fn default_lai_variable() -> String {
    "MONTHLY_LAI".to_string()
}

fn default_height_variable() -> String {
    "MONTHLY_HEIGHT_TOP".to_string()
}

fn default_pft_variable() -> String {
    "PCT_PFT".to_string()
}

impl Config {
    /// Read, parse and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the derivations cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(VicParamsError::InvalidConfig { message });

        if self.parameter_specs.grid.trim().is_empty() {
            return invalid("parameter_specs.grid must not be empty".to_string());
        }

        let soil = &self.soil;
        // the third model layer needs at least 0.1 m above it
        if soil.min_total_depth < 0.6 {
            return invalid(format!(
                "soil.min_total_depth must be at least 0.6 m, got {}",
                soil.min_total_depth
            ));
        }
        if soil.min_total_depth > soil.max_total_depth {
            return invalid(format!(
                "soil.min_total_depth ({}) exceeds soil.max_total_depth ({})",
                soil.min_total_depth, soil.max_total_depth
            ));
        }
        // also the fallback for cells without a bedrock depth
        if !(soil.min_total_depth..=soil.max_total_depth).contains(&soil.total_depth) {
            return invalid(format!(
                "soil.total_depth {} lies outside [{}, {}]",
                soil.total_depth, soil.min_total_depth, soil.max_total_depth
            ));
        }

        let constants = &self.constants;
        if constants.soil_density <= 0.0 || constants.soil_density_org <= 0.0 {
            return invalid("particle densities must be positive".to_string());
        }
        if !(0..=1).contains(&constants.fs_active) {
            return invalid(format!(
                "constants.fs_active must be 0 or 1, got {}",
                constants.fs_active
            ));
        }

        Ok(())
    }
}
