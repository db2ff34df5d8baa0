//! Regridding source datasets onto the domain grid
//!
//! Every source goes through the same chain: select one variable, crop to a
//! lon/lat box, turn values outside a valid range into missing, fill missing
//! values from their nearest valid neighbour, and remap to the domain with
//! nearest-neighbour interpolation. Each step is optional per [`RegridJob`].
//!
//! Two backends implement the chain:
//!
//! - [`CdoRegridder`] runs the external `cdo` binary as one chained command
//! - [`NativeRegridder`] does the same in-process for lon/lat sources

pub mod catalog;
pub mod cdo;
pub mod native;

use crate::config::RegridBackend;
use crate::errors::Result;
use std::fmt;
use std::path::{Path, PathBuf};

pub use catalog::{RegriddedPaths, SourceCatalog};
pub use cdo::{cdo_args, CdoRegridder};
pub use native::NativeRegridder;

/// Geographic crop box in degrees, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLatBox {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl LonLatBox {
    pub const fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            west,
            east,
            south,
            north,
        }
    }

    /// Longitude is compared after wrapping to `[-180, 180)`
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.contains_lon(lon) && self.contains_lat(lat)
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        if self.east - self.west >= 360.0 {
            return true;
        }
        let lon = normalize_lon(lon);
        lon >= self.west && lon <= self.east
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.south && lat <= self.north
    }

    /// `west,east,south,north` as CDO expects it
    pub fn cdo_arg(&self) -> String {
        format!("{},{},{},{}", self.west, self.east, self.south, self.north)
    }
}

/// Values outside `[min, max]` become missing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn cdo_arg(&self) -> String {
        format!("{},{}", self.min, self.max)
    }
}

/// One source file to bring onto the domain grid
#[derive(Debug, Clone, PartialEq)]
pub struct RegridJob {
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Variable to keep
    pub variable: Option<String>,
    pub bbox: Option<LonLatBox>,
    pub valid_range: Option<ValidRange>,
    /// Replace missing source values by their nearest valid neighbour
    pub fill_missing: bool,
}

impl RegridJob {
    pub fn new(name: impl Into<String>, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            output: output.into(),
            variable: None,
            bbox: None,
            valid_range: None,
            fill_missing: false,
        }
    }

    pub fn select(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn crop(mut self, bbox: LonLatBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Mask values outside `[min, max]` and fill the gaps from valid neighbours
    pub fn valid_range(mut self, min: f64, max: f64) -> Self {
        self.valid_range = Some(ValidRange::new(min, max));
        self.fill_missing = true;
        self
    }
}

impl fmt::Display for RegridJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.name, self.input.display(), self.output.display())
    }
}

/// A backend able to run a [`RegridJob`]
pub trait Regridder: Send + Sync {
    /// Short backend name for logging
    fn name(&self) -> &'static str;

    /// Regrid `job.input` onto the grid of `domain_path`, writing `job.output`
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read, its coordinates are not
    /// understood, or the output cannot be written.
    fn regrid(&self, job: &RegridJob, domain_path: &Path) -> Result<()>;
}

/// Backend for the configured [`RegridBackend`]
pub fn regridder_for(backend: RegridBackend, cdo_binary: &str) -> Box<dyn Regridder> {
    match backend {
        RegridBackend::Native => Box::new(NativeRegridder::new()),
        RegridBackend::Cdo => Box::new(CdoRegridder::new(cdo_binary)),
    }
}

/// Wrap a longitude to `[-180, 180)`
pub fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Central angle in radians between two lon/lat points in degrees
pub fn great_circle(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn crop_box_wraps_longitude() {
        let bbox = LonLatBox::new(-180.0, 180.0, 15.0, 90.0);
        assert!(bbox.contains(350.0, 60.0));
        assert!(!bbox.contains(10.0, 10.0));

        let east = LonLatBox::new(100.0, 120.0, 0.0, 10.0);
        assert!(east.contains(110.0, 5.0));
        assert!(!east.contains(-110.0, 5.0));
        assert_eq!(east.cdo_arg(), "100,120,0,10");
    }

    #[test]
    fn job_builder() {
        let job = RegridJob::new("clay_sl1", "in.nc", "out.nc")
            .select("clay")
            .valid_range(0.0, 100.0);
        assert!(job.fill_missing);
        assert_eq!(job.variable.as_deref(), Some("clay"));
        assert!(job.valid_range.unwrap().contains(100.0));
        assert!(!job.valid_range.unwrap().contains(100.5));
    }

    #[test]
    fn distances() {
        assert_relative_eq!(normalize_lon(190.0), -170.0);
        assert_relative_eq!(normalize_lon(-180.0), -180.0);
        assert_relative_eq!(
            great_circle(0.0, 0.0, 90.0, 0.0),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
        assert_relative_eq!(great_circle(179.5, 10.0, -179.5, 10.0), great_circle(0.0, 10.0, 1.0, 10.0), epsilon = 1e-12);
    }
}
