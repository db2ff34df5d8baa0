//! End-to-end parameter generation
//!
//! A full run has three stages that can also be invoked separately:
//!
//! 1. [`run_regrid`] brings every source onto the domain grid
//! 2. [`make_hydroclimate_masks`] classifies cells for the baseflow lookup
//! 3. [`build_parameters`] derives all variables, [`write_parameters`] writes them
//!
//! Each stage reads what the previous one wrote in the output directory, so a
//! failed run can be resumed by hand from the stage that failed.

use crate::baseflow::{assign_baseflow, SoilParamFile};
use crate::climate::{annual_precipitation, avg_temperature, off_gmt_from_longitude};
use crate::config::Config;
use crate::domain::Domain;
use crate::errors::{Result, VicParamsError};
use crate::hydroclimate::{classify_masks, HydroclimateMasks};
use crate::netcdf_io::{read_grid, ParameterWriter, FILL_I32};
use crate::params::ParameterSet;
use crate::regrid::catalog::SOIL_LAYERS;
use crate::regrid::{RegriddedPaths, Regridder, SourceCatalog};
use crate::schema::{N_LAYER, N_MONTH, N_ROOT_ZONE, N_VEG_CLASS, N_VERTEX};
use crate::soil::{derive_soil_parameters, total_depth, SoilInputs, SoilOptions};
use crate::vegetation::{derive_vegetation_parameters, VegLibrary, VegetationInputs, VegetationOptions};
use ndarray::{stack, Array1, Array2, Array3, ArrayD, Axis, Ix2, Ix3, Ix4, Slice};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Regrid every source of the catalogue; returns the number of jobs run
pub fn run_regrid(config: &Config, regridder: &dyn Regridder) -> Result<usize> {
    fs::create_dir_all(&config.parameter_specs.output_dir)?;
    let catalog = SourceCatalog::from_config(config);
    let domain_path = &config.parameter_specs.domain_file;

    info!(jobs = catalog.len(), backend = regridder.name(), "regridding sources");
    for (n, job) in catalog.iter().enumerate() {
        let start = Instant::now();
        regridder.regrid(job, domain_path)?;
        info!(
            job = %job.name,
            step = n + 1,
            of = catalog.len(),
            seconds = start.elapsed().as_secs_f64(),
            "job done"
        );
    }
    Ok(catalog.len())
}

/// Classify hydroclimates from the regridded Köppen and permafrost maps
///
/// The masks are also written to `hydroclimate_masks_<grid>.nc`.
pub fn make_hydroclimate_masks(config: &Config) -> Result<HydroclimateMasks> {
    let domain = Domain::open(&config.parameter_specs.domain_file)?;
    let paths = RegriddedPaths::from_config(config);
    let grid = domain.shape();

    let koppen = read_field(&paths.koppen(), &config.hydroclimate.koppen_variable, grid)?;
    let permafrost = read_field(&paths.permafrost(), &config.hydroclimate.permafrost_variable, grid)?;

    let masks = classify_masks(&domain, &koppen, &permafrost)?;
    masks.write(&paths.hydroclimate_masks(), &domain)?;
    Ok(masks)
}

/// Derive every parameter file variable from the regridded inputs
///
/// # Errors
///
/// Fails if a regridded input is missing or misshapen, a derivation fails,
/// or a required variable of the parameter file was not produced.
pub fn build_parameters(config: &Config) -> Result<ParameterSet> {
    let domain = Domain::open(&config.parameter_specs.domain_file)?;
    let paths = RegriddedPaths::from_config(config);
    let mut set = ParameterSet::new();

    insert_index_variables(&mut set)?;
    insert_geometry(&mut set, &domain)?;

    let start = Instant::now();
    let soil = read_soil_inputs(config, &paths, &domain)?;
    derive_soil_parameters(
        &soil,
        &domain,
        &config.constants,
        SoilOptions {
            organic_fract: config.soil.organic_fract,
        },
    )?
    .insert_into(&mut set)?;
    info!(seconds = start.elapsed().as_secs_f64(), "soil parameters done");

    let vegetation = read_vegetation_inputs(config, &paths, &domain)?;
    derive_vegetation_parameters(
        &vegetation,
        &domain,
        &VegLibrary::nldas(),
        VegetationOptions {
            max_snow_albedo: config.vegetation.max_snow_albedo,
        },
    )?
    .insert_into(&mut set)?;

    let masks_path = paths.hydroclimate_masks();
    let masks = if masks_path.exists() {
        HydroclimateMasks::read(&masks_path)?
    } else {
        warn!(path = %masks_path.display(), "no hydroclimate mask file, classifying now");
        make_hydroclimate_masks(config)?
    };
    let soil_file = SoilParamFile::open(&config.baseflow.soil_file)?;
    assign_baseflow(&domain, &masks, &soil_file, config.baseflow.fallback)?.insert_into(&mut set)?;

    insert_climate(&mut set, config, &paths, &domain)?;
    insert_constants(&mut set, config, &domain)?;

    let missing = set.missing_required();
    if !missing.is_empty() {
        return Err(VicParamsError::Generic(format!(
            "parameter set is missing required variables: {}",
            missing.join(", ")
        )));
    }

    info!(variables = set.len(), "parameter set complete");
    Ok(set)
}

/// Write the parameter set to the configured output path
pub fn write_parameters(config: &Config, set: &ParameterSet) -> Result<PathBuf> {
    let domain = Domain::open(&config.parameter_specs.domain_file)?;
    let output = config.parameter_specs.output_path();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    ParameterWriter::new(&output)
        .with_title(format!("VIC parameters for {}", config.parameter_specs.grid))
        .write(&domain, set)?;
    Ok(output)
}

/// Regrid, classify, derive and write in one go
pub fn run_all(config: &Config, regridder: &dyn Regridder) -> Result<PathBuf> {
    let start = Instant::now();
    run_regrid(config, regridder)?;
    make_hydroclimate_masks(config)?;
    let set = build_parameters(config)?;
    let output = write_parameters(config, &set)?;
    info!(
        output = %output.display(),
        seconds = start.elapsed().as_secs_f64(),
        "run complete"
    );
    Ok(output)
}

/// Read a regridded variable, keeping the first `leading[k]` entries of each
/// leading axis; extra singleton axes in front are dropped
fn read_leading(path: &Path, name: &str, grid: (usize, usize), leading: &[usize]) -> Result<ArrayD<f64>> {
    let mut data = read_grid(path, name, grid)?;
    let found = data.shape().to_vec();
    while data.ndim() > leading.len() + 2 && data.shape()[0] == 1 {
        data = data.index_axis_move(Axis(0), 0);
    }

    let too_small = data.shape().iter().zip(leading).any(|(&have, &want)| have < want);
    if data.ndim() != leading.len() + 2 || too_small {
        let mut expected = leading.to_vec();
        expected.extend([grid.0, grid.1]);
        return Err(VicParamsError::ShapeMismatch {
            var: name.to_string(),
            expected,
            found,
        });
    }

    let mut view = data.view();
    for (axis, &len) in leading.iter().enumerate() {
        if view.shape()[axis] > len {
            warn!(var = name, axis, keep = len, "ignoring extra entries");
            view.slice_axis_inplace(Axis(axis), Slice::from(..len));
        }
    }
    Ok(view.to_owned())
}

fn read_field(path: &Path, name: &str, grid: (usize, usize)) -> Result<Array2<f64>> {
    Ok(read_leading(path, name, grid, &[])?.into_dimensionality::<Ix2>()?)
}

/// Stack one `(nj, ni)` field per file along a new first axis
fn read_stacked(files: &[PathBuf], name: &str, grid: (usize, usize)) -> Result<Array3<f64>> {
    let fields = files
        .iter()
        .map(|path| read_field(path, name, grid))
        .collect::<Result<Vec<_>>>()?;
    let views: Vec<_> = fields.iter().map(|f| f.view()).collect();
    Ok(stack(Axis(0), &views)?)
}

fn read_soil_layers(paths: &RegriddedPaths, variable: &str, grid: (usize, usize)) -> Result<Array3<f64>> {
    let files: Vec<PathBuf> = (1..=SOIL_LAYERS).map(|l| paths.soil(variable, l)).collect();
    read_stacked(&files, variable, grid)
}

fn read_soil_inputs(config: &Config, paths: &RegriddedPaths, domain: &Domain) -> Result<SoilInputs> {
    let grid = domain.shape();
    let (bulk_density, organic) = if config.soil.organic_fract {
        (
            Some(read_soil_layers(paths, "bulk_density", grid)?),
            Some(read_soil_layers(paths, "organic_fract", grid)?),
        )
    } else {
        (None, None)
    };

    let bedrock = if config.soil.use_bedrock_depth {
        Some(read_field(&paths.bedrock(), "bedrock", grid)?)
    } else {
        None
    };

    Ok(SoilInputs {
        sand: read_soil_layers(paths, "sand", grid)?,
        clay: read_soil_layers(paths, "clay", grid)?,
        silt: read_soil_layers(paths, "silt", grid)?,
        bulk_density,
        organic,
        total_depth: total_depth(domain, bedrock.as_ref(), &config.soil),
    })
}

fn read_vegetation_inputs(
    config: &Config,
    paths: &RegriddedPaths,
    domain: &Domain,
) -> Result<VegetationInputs> {
    let grid = domain.shape();
    let veg = &config.vegetation;
    Ok(VegetationInputs {
        pct_pft: read_leading(&paths.pct_pft(), &veg.pft_variable, grid, &[N_VEG_CLASS])?
            .into_dimensionality::<Ix3>()?,
        lai: read_leading(&paths.lai(), &veg.lai_variable, grid, &[N_MONTH, N_VEG_CLASS])?
            .into_dimensionality::<Ix4>()?,
        height: read_leading(&paths.veg_height(), &veg.height_variable, grid, &[N_MONTH, N_VEG_CLASS])?
            .into_dimensionality::<Ix4>()?,
    })
}

fn insert_index_variables(set: &mut ParameterSet) -> Result<()> {
    let range = |first: i32, n: usize| Array1::from_iter((0..n as i32).map(|k| first + k));
    set.insert_int("veg_class", range(1, N_VEG_CLASS))?;
    set.insert_int("month", range(1, N_MONTH))?;
    set.insert_int("nlayer", range(0, N_LAYER))?;
    set.insert_int("root_zone", range(1, N_ROOT_ZONE))?;
    Ok(())
}

fn insert_geometry(set: &mut ParameterSet, domain: &Domain) -> Result<()> {
    set.insert_float("xc", domain.xc.clone())?;
    set.insert_float("yc", domain.yc.clone())?;

    // corners move from (nj, ni, nv) to (nv4, nj, ni)
    for (name, corners) in [("xv", &domain.xv), ("yv", &domain.yv)] {
        match corners {
            Some(c) if c.shape()[2] == N_VERTEX => {
                let rolled = c.view().permuted_axes([2, 0, 1]).as_standard_layout().to_owned();
                set.insert_float(name, rolled)?;
            }
            Some(c) => {
                warn!(var = name, vertices = c.shape()[2], "domain corners are not quadrilaterals, skipped");
            }
            None => {}
        }
    }

    let mut lats = domain.yc.clone();
    let mut lons = domain.xc.clone();
    domain.mask_in_place(&mut lats)?;
    domain.mask_in_place(&mut lons)?;
    set.insert_float("lats", lats)?;
    set.insert_float("lons", lons)?;

    set.insert_int("mask", domain.mask.clone())?;
    set.insert_int("run_cell", domain.mask.clone())?;
    let mut gridcell = domain.gridcell_numbers();
    domain.mask_int_in_place(&mut gridcell, FILL_I32)?;
    set.insert_int("gridcell", gridcell)?;
    Ok(())
}

fn insert_climate(
    set: &mut ParameterSet,
    config: &Config,
    paths: &RegriddedPaths,
    domain: &Domain,
) -> Result<()> {
    let grid = domain.shape();
    let months = |variable: &str| -> Vec<PathBuf> {
        (1..=N_MONTH).map(|m| paths.worldclim(variable, m)).collect()
    };

    let mut avg_t = avg_temperature(&read_stacked(&months("tavg"), "tavg", grid)?)?;
    let mut annual_prec = annual_precipitation(&read_stacked(&months("prec"), "prec", grid)?)?;
    let mut elev = read_field(&paths.elevation(), &config.gtopo.variable, grid)?;
    let mut off_gmt = if config.other.off_gmt_file.is_some() {
        read_field(&paths.off_gmt(), "off_gmt", grid)?
    } else {
        off_gmt_from_longitude(&domain.xc)
    };

    for field in [&mut avg_t, &mut annual_prec, &mut elev, &mut off_gmt] {
        domain.mask_in_place(field)?;
    }
    set.insert_float("avg_T", avg_t)?;
    set.insert_float("annual_prec", annual_prec)?;
    set.insert_float("elev", elev)?;
    set.insert_float("off_gmt", off_gmt)?;
    Ok(())
}

fn insert_constants(set: &mut ParameterSet, config: &Config, domain: &Domain) -> Result<()> {
    let constants = &config.constants;
    for (name, value) in [
        ("rough", constants.rough),
        ("snow_rough", constants.snow_rough),
        ("dp", constants.dp),
    ] {
        set.insert_float(name, domain.nan_mask().mapv(|m| m * value))?;
    }

    let mut fs_active = Array2::from_elem(domain.shape(), constants.fs_active);
    domain.mask_int_in_place(&mut fs_active, FILL_I32)?;
    set.insert_int("fs_active", fs_active)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn index_variables() {
        let mut set = ParameterSet::new();
        insert_index_variables(&mut set).unwrap();
        let veg_class = set.get("veg_class").unwrap().as_int().unwrap();
        assert_eq!(veg_class.len(), 17);
        assert_eq!(veg_class[[16]], 17);
        assert_eq!(set.get("nlayer").unwrap().as_int().unwrap()[[0]], 0);
    }

    #[test]
    fn geometry_rolls_corners() {
        let mut domain = Domain::from_parts(
            array![[1, 0]],
            array![[10.0, 11.0]],
            array![[50.0, 50.0]],
        )
        .unwrap();
        let corners = Array3::from_shape_fn((1, 2, 4), |(_, i, v)| i as f64 * 10.0 + v as f64);
        domain.xv = Some(corners.clone());
        domain.yv = Some(corners);

        let mut set = ParameterSet::new();
        insert_geometry(&mut set, &domain).unwrap();

        let xv = set.get("xv").unwrap().as_float().unwrap();
        assert_eq!(xv.shape(), &[4, 1, 2]);
        assert_eq!(xv[[3, 0, 1]], 13.0);

        let gridcell = set.get("gridcell").unwrap().as_int().unwrap();
        assert_eq!(gridcell[[0, 0]], 1);
        assert_eq!(gridcell[[0, 1]], FILL_I32);
        assert!(set.get("lats").unwrap().as_float().unwrap()[[0, 1]].is_nan());
    }
}
