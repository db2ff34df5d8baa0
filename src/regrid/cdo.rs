//! Regridding through the external CDO binary

use super::{RegridJob, Regridder};
use crate::errors::{Result, VicParamsError};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// Runs each job as a single chained `cdo` command
#[derive(Debug, Clone)]
pub struct CdoRegridder {
    binary: String,
}

impl CdoRegridder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for CdoRegridder {
    fn default() -> Self {
        Self::new("cdo")
    }
}

/// Arguments for `cdo`, innermost operator last
///
/// ```
/// use vic_params::regrid::{cdo_args, RegridJob};
/// use std::path::Path;
///
/// let job = RegridJob::new("koppen", "kg.nc", "kg_grid.nc").select("Band1");
/// let args = cdo_args(&job, Path::new("domain.nc"));
/// assert_eq!(args, ["-O", "remapnn,domain.nc", "-selname,Band1", "kg.nc", "kg_grid.nc"]);
/// ```
pub fn cdo_args(job: &RegridJob, domain_path: &Path) -> Vec<String> {
    let mut args = vec!["-O".to_string(), format!("remapnn,{}", domain_path.display())];
    if job.fill_missing {
        args.push("-setmisstonn".to_string());
    }
    if let Some(range) = &job.valid_range {
        args.push(format!("-setvrange,{}", range.cdo_arg()));
    }
    if let Some(bbox) = &job.bbox {
        args.push(format!("-sellonlatbox,{}", bbox.cdo_arg()));
    }
    if let Some(variable) = &job.variable {
        args.push(format!("-selname,{}", variable));
    }
    args.push(job.input.display().to_string());
    args.push(job.output.display().to_string());
    args
}

impl Regridder for CdoRegridder {
    fn name(&self) -> &'static str {
        "cdo"
    }

    fn regrid(&self, job: &RegridJob, domain_path: &Path) -> Result<()> {
        let args = cdo_args(job, domain_path);
        debug!(binary = %self.binary, args = ?args, "running cdo");

        let output = Command::new(&self.binary).args(&args).output()?;
        if !output.status.success() {
            return Err(VicParamsError::CdoFailed {
                job: job.name.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(job = %job.name, output = %job.output.display(), "regridded with cdo");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regrid::LonLatBox;

    #[test]
    fn full_chain_order() {
        let job = RegridJob::new("clay_sl1", "/src/clay_sl1.nc", "/out/clay_sl1_wr50a.nc")
            .select("clay")
            .crop(LonLatBox::new(-180.0, 180.0, 15.0, 90.0))
            .valid_range(0.0, 100.0);
        let args = cdo_args(&job, Path::new("/d/domain.nc"));
        assert_eq!(
            args,
            [
                "-O",
                "remapnn,/d/domain.nc",
                "-setmisstonn",
                "-setvrange,0,100",
                "-sellonlatbox,-180,180,15,90",
                "-selname,clay",
                "/src/clay_sl1.nc",
                "/out/clay_sl1_wr50a.nc",
            ]
        );
    }

    #[test]
    fn missing_binary_is_an_error() {
        let regridder = CdoRegridder::new("/nonexistent/cdo-binary");
        let job = RegridJob::new("x", "in.nc", "out.nc");
        assert!(regridder.regrid(&job, Path::new("domain.nc")).is_err());
    }
}
