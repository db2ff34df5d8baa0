//! Centralized error handling for vic_params
//!
//! Every stage of the pipeline (configuration, regridding, derivation, NetCDF
//! output) reports failures through [`VicParamsError`]. A failure aborts the run.

use std::fmt;
use std::path::PathBuf;

/// Main error type for vic_params operations
#[derive(Debug)]
pub enum VicParamsError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Configuration file could not be parsed
    ConfigParse(toml::de::Error),

    /// Configuration parsed but holds an unusable value
    InvalidConfig { message: String },

    /// Variable not found in NetCDF file
    VariableNotFound { var: String, file: PathBuf },

    /// Array does not have the shape the domain requires
    ShapeMismatch {
        var: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A soil layer could not be mapped to source depth nodes
    LayerAssignment { layer: usize, total_depth: f64 },

    /// Plant functional type index outside 0..=16
    InvalidPft(i64),

    /// No row of the soil parameter file falls in a hydroclimate reference box
    ReferenceCellNotFound { class: String },

    /// Malformed row in a VIC soil parameter file
    SoilFileParse { line: usize, message: String },

    /// In-process regridding failure
    Regrid { job: String, message: String },

    /// The external CDO process failed
    CdoFailed {
        job: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// GDAL raster errors
    #[cfg(feature = "geotiff")]
    GdalError(gdal::errors::GdalError),

    /// Generic error
    Generic(String),
}

impl fmt::Display for VicParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VicParamsError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            VicParamsError::IoError(e) => write!(f, "I/O error: {}", e),
            VicParamsError::ConfigParse(e) => write!(f, "Configuration parse error: {}", e),
            VicParamsError::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            VicParamsError::VariableNotFound { var, file } => {
                write!(f, "Variable '{}' not found in {}", var, file.display())
            }
            VicParamsError::ShapeMismatch {
                var,
                expected,
                found,
            } => write!(
                f,
                "Variable '{}' has shape {:?}, expected {:?}",
                var, found, expected
            ),
            VicParamsError::LayerAssignment { layer, total_depth } => write!(
                f,
                "Soil layer {} could not be assigned for total depth {} m",
                layer, total_depth
            ),
            VicParamsError::InvalidPft(pft) => write!(f, "{} is not a PFT", pft),
            VicParamsError::ReferenceCellNotFound { class } => write!(
                f,
                "No reference cell for hydroclimate class '{}' in soil parameter file",
                class
            ),
            VicParamsError::SoilFileParse { line, message } => {
                write!(f, "Soil parameter file line {}: {}", line, message)
            }
            VicParamsError::Regrid { job, message } => {
                write!(f, "Regridding '{}' failed: {}", job, message)
            }
            VicParamsError::CdoFailed {
                job,
                status,
                stderr,
            } => match status {
                Some(code) => write!(f, "cdo exited with status {} for '{}': {}", code, job, stderr),
                None => write!(f, "cdo was terminated by a signal for '{}': {}", job, stderr),
            },
            VicParamsError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            VicParamsError::ArrayError(e) => write!(f, "Array error: {}", e),
            #[cfg(feature = "geotiff")]
            VicParamsError::GdalError(e) => write!(f, "GDAL error: {}", e),
            VicParamsError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for VicParamsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VicParamsError::NetCDFError(e) => Some(e),
            VicParamsError::IoError(e) => Some(e),
            VicParamsError::ConfigParse(e) => Some(e),
            VicParamsError::ArrayError(e) => Some(e),
            #[cfg(feature = "geotiff")]
            VicParamsError::GdalError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for VicParamsError {
    fn from(error: netcdf::Error) -> Self {
        VicParamsError::NetCDFError(error)
    }
}

impl From<std::io::Error> for VicParamsError {
    fn from(error: std::io::Error) -> Self {
        VicParamsError::IoError(error)
    }
}

impl From<toml::de::Error> for VicParamsError {
    fn from(error: toml::de::Error) -> Self {
        VicParamsError::ConfigParse(error)
    }
}

impl From<ndarray::ShapeError> for VicParamsError {
    fn from(error: ndarray::ShapeError) -> Self {
        VicParamsError::ArrayError(error)
    }
}

#[cfg(feature = "geotiff")]
impl From<gdal::errors::GdalError> for VicParamsError {
    fn from(error: gdal::errors::GdalError) -> Self {
        VicParamsError::GdalError(error)
    }
}

impl From<String> for VicParamsError {
    fn from(error: String) -> Self {
        VicParamsError::Generic(error)
    }
}

impl From<&str> for VicParamsError {
    fn from(error: &str) -> Self {
        VicParamsError::Generic(error.to_string())
    }
}

/// Result type alias for vic_params operations
pub type Result<T> = std::result::Result<T, VicParamsError>;
