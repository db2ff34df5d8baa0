//! Every regridding job of a full run and where its product lands

use super::{LonLatBox, RegridJob};
use crate::config::Config;
use std::path::{Path, PathBuf};

/// SoilGrids depth nodes per variable
pub const SOIL_LAYERS: usize = 7;

/// Crop box applied to most sources
pub const NORTHERN_BOX: LonLatBox = LonLatBox::new(-180.0, 180.0, 15.0, 90.0);

/// Crop box of the GTOPO elevation
pub const GTOPO_BOX: LonLatBox = LonLatBox::new(-180.0, 180.0, 16.5, 90.0);

/// Soil texture variables, always regridded
pub const TEXTURE_VARIABLES: [&str; 4] = ["clay", "sand", "silt", "coarse"];

pub const WORLDCLIM_VARIABLES: [&str; 2] = ["tavg", "prec"];

/// Paths of the regridded products of one grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegriddedPaths {
    dir: PathBuf,
    grid: String,
}

impl RegriddedPaths {
    pub fn new(dir: impl Into<PathBuf>, grid: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            grid: grid.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.parameter_specs.output_dir,
            &config.parameter_specs.grid,
        )
    }

    fn file(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.nc", stem, self.grid))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `layer` counts from 1
    pub fn soil(&self, variable: &str, layer: usize) -> PathBuf {
        self.file(&format!("{}_sl{}", variable, layer))
    }

    pub fn bedrock(&self) -> PathBuf {
        self.file("bedrock")
    }

    /// `month` counts from 1
    pub fn worldclim(&self, variable: &str, month: usize) -> PathBuf {
        self.file(&format!("{}_{:02}", variable, month))
    }

    pub fn koppen(&self) -> PathBuf {
        self.file("koppen_geiger")
    }

    pub fn permafrost(&self) -> PathBuf {
        self.file("permafrost_extent")
    }

    pub fn lai(&self) -> PathBuf {
        self.file("lai")
    }

    pub fn veg_height(&self) -> PathBuf {
        self.file("veg_height")
    }

    pub fn pct_pft(&self) -> PathBuf {
        self.file("pct_pft")
    }

    pub fn elevation(&self) -> PathBuf {
        self.file("elevation")
    }

    pub fn off_gmt(&self) -> PathBuf {
        self.file("off_gmt")
    }

    pub fn hydroclimate_masks(&self) -> PathBuf {
        self.file("hydroclimate_masks")
    }
}

/// Ordered list of regridding jobs
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    jobs: Vec<RegridJob>,
}

impl SourceCatalog {
    /// All jobs a configuration asks for
    ///
    /// Bulk density and organic carbon are only regridded when organic soil
    /// parameters are enabled, depth to bedrock only when it sets the total
    /// soil depth, and `off_gmt` only when a source file is configured.
    pub fn from_config(config: &Config) -> Self {
        let paths = RegriddedPaths::from_config(config);
        let mut jobs = Vec::new();

        let soil_dir = &config.soil.netcdf_dir;
        let mut soil_variables: Vec<(&str, f64, f64)> =
            TEXTURE_VARIABLES.iter().map(|&v| (v, 0.0, 100.0)).collect();
        if config.soil.organic_fract {
            soil_variables.push(("bulk_density", 50.0, 3000.0));
            soil_variables.push(("organic_fract", 0.0, 500.0));
        }
        for (variable, min, max) in soil_variables {
            for layer in 1..=SOIL_LAYERS {
                jobs.push(
                    RegridJob::new(
                        format!("{}_sl{}", variable, layer),
                        soil_dir.join(format!("{}_sl{}.nc", variable, layer)),
                        paths.soil(variable, layer),
                    )
                    .select(variable)
                    .crop(NORTHERN_BOX)
                    .valid_range(min, max),
                );
            }
        }
        if config.soil.use_bedrock_depth {
            jobs.push(
                RegridJob::new("bedrock", soil_dir.join("bedrock_sl1.nc"), paths.bedrock())
                    .select("bedrock")
                    .crop(NORTHERN_BOX)
                    .valid_range(0.0, 100_000.0),
            );
        }

        for variable in WORLDCLIM_VARIABLES {
            for month in 1..=12 {
                jobs.push(
                    RegridJob::new(
                        format!("{}_{:02}", variable, month),
                        config
                            .worldclim
                            .netcdf_dir
                            .join(format!("{}_{:02}.nc", variable, month)),
                        paths.worldclim(variable, month),
                    )
                    .select(variable)
                    .crop(NORTHERN_BOX)
                    .valid_range(-1000.0, 1000.0),
                );
            }
        }

        let hydro = &config.hydroclimate;
        jobs.push(
            RegridJob::new("koppen_geiger", hydro.dir.join(&hydro.koppen_filename), paths.koppen())
                .select(&hydro.koppen_variable)
                .crop(NORTHERN_BOX)
                .valid_range(1.0, 32.0),
        );
        jobs.push(
            RegridJob::new("permafrost", hydro.dir.join(&hydro.brown_filename), paths.permafrost())
                .select(&hydro.permafrost_variable),
        );

        let veg = &config.vegetation;
        jobs.push(
            RegridJob::new("lai", veg.dir.join(&veg.filename), paths.lai())
                .select(&veg.lai_variable)
                .crop(NORTHERN_BOX)
                .valid_range(0.0, 7.0),
        );
        jobs.push(
            RegridJob::new("veg_height", veg.dir.join(&veg.filename), paths.veg_height())
                .select(&veg.height_variable)
                .crop(NORTHERN_BOX)
                .valid_range(0.0, 52.5),
        );
        jobs.push(
            RegridJob::new("pct_pft", veg.dir.join(&veg.pft_filename), paths.pct_pft())
                .select(&veg.pft_variable)
                .crop(NORTHERN_BOX)
                .valid_range(0.0, 100.0),
        );

        let gtopo = &config.gtopo;
        jobs.push(
            RegridJob::new("gtopo", gtopo.dir.join(&gtopo.filename), paths.elevation())
                .select(&gtopo.variable)
                .crop(GTOPO_BOX),
        );

        if let Some(source) = &config.other.off_gmt_file {
            jobs.push(
                RegridJob::new("off_gmt", source, paths.off_gmt())
                    .select("off_gmt")
                    .valid_range(-43_198_560_000_000.0, 43_199_280_000_000.0),
            );
        }

        Self { jobs }
    }

    pub fn jobs(&self) -> &[RegridJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegridJob> {
        self.jobs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[parameter_specs]
domain_file = "/d/domain.nc"
grid = "wr50a"
output_dir = "/out"

[soil]
netcdf_dir = "/soil"

[worldclim]
netcdf_dir = "/wc"

[hydroclimate]
dir = "/hc"
koppen_filename = "kg.nc"
brown_filename = "pf.nc"

[vegetation]
dir = "/veg"
filename = "lai.nc"
pft_filename = "pft.nc"

[gtopo]
dir = "/gtopo"
filename = "gtopo30.nc"

[baseflow]
soil_file = "/vic/soil.txt"
"#;

    #[test]
    fn default_run_jobs() {
        let config = Config::from_toml_str(CONFIG).unwrap();
        let catalog = SourceCatalog::from_config(&config);
        // 4 soil variables x 7 layers, 24 climate months, koppen, permafrost,
        // lai, height, pft, gtopo
        assert_eq!(catalog.len(), 28 + 24 + 6);

        let clay = &catalog.jobs()[0];
        assert_eq!(clay.input, PathBuf::from("/soil/clay_sl1.nc"));
        assert_eq!(clay.output, PathBuf::from("/out/clay_sl1_wr50a.nc"));

        let permafrost = catalog.iter().find(|j| j.name == "permafrost").unwrap();
        assert!(permafrost.bbox.is_none());
        assert!(permafrost.valid_range.is_none());
        assert!(!permafrost.fill_missing);

        let gtopo = catalog.iter().find(|j| j.name == "gtopo").unwrap();
        assert_eq!(gtopo.bbox, Some(GTOPO_BOX));
        assert!(!gtopo.fill_missing);
    }

    #[test]
    fn optional_jobs_follow_config() {
        let mut config = Config::from_toml_str(CONFIG).unwrap();
        config.soil.organic_fract = true;
        config.soil.use_bedrock_depth = true;
        config.other.off_gmt_file = Some(PathBuf::from("/old/params.nc"));

        let catalog = SourceCatalog::from_config(&config);
        assert_eq!(catalog.len(), 42 + 24 + 6 + 2);
        let off_gmt = catalog.iter().find(|j| j.name == "off_gmt").unwrap();
        assert!(off_gmt.bbox.is_none());
        assert!(off_gmt.fill_missing);
    }

    #[test]
    fn product_names() {
        let paths = RegriddedPaths::new("/out", "g");
        assert_eq!(paths.worldclim("tavg", 3), PathBuf::from("/out/tavg_03_g.nc"));
        assert_eq!(paths.hydroclimate_masks(), PathBuf::from("/out/hydroclimate_masks_g.nc"));
    }
}
