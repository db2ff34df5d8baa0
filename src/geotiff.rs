//! GeoTIFF to NetCDF conversion
//!
//! Source rasters (SoilGrids, WorldClim) ship as GeoTIFFs. They are turned
//! into NetCDF files with 2-D `xc`/`yc` cell centres in geographic
//! coordinates so that both regridding backends can read them.

use crate::errors::{Result, VicParamsError};
use crate::netcdf_io::FILL_F64;
use chrono::Utc;
use gdal::raster::Buffer;
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::Dataset;
use netcdf::create;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// SoilGrids variable names and their file codes
pub const SOILGRIDS_CODES: [(&str, &str); 6] = [
    ("clay", "CLYPPT"),
    ("sand", "SNDPPT"),
    ("silt", "SLTPPT"),
    ("coarse", "CRFVOL"),
    ("bulk_density", "BLDFIE"),
    ("organic_fract", "ORCDRC"),
];

/// Variables that must exist for every depth node
const REQUIRED_SOILGRIDS: [&str; 4] = ["clay", "sand", "silt", "coarse"];

/// Convert band 1 of `input` into a NetCDF variable `var_name`
///
/// Pixel centres are transformed to EPSG:4326. Nodata pixels are written as
/// fill values.
pub fn convert_geotiff(input: &Path, output: &Path, var_name: &str) -> Result<()> {
    let dataset = Dataset::open(input)?;
    let (cols, rows) = dataset.raster_size();
    let gt = dataset.geo_transform()?;

    let band = dataset.rasterband(1)?;
    let no_data = band.no_data_value();
    let buffer: Buffer<f64> = band.read_as::<f64>((0, 0), (cols, rows), (cols, rows), None)?;
    let values: Vec<f64> = buffer
        .data()
        .iter()
        .map(|&v| {
            let missing = v.is_nan() || no_data.map_or(false, |nd| v == nd);
            if missing {
                FILL_F64
            } else {
                v
            }
        })
        .collect();

    let source_srs = dataset.spatial_ref()?;
    let geographic = source_srs.is_geographic();

    // pixel centres in source coordinates, row major
    let mut xs = Vec::with_capacity(cols * rows);
    let mut ys = Vec::with_capacity(cols * rows);
    for j in 0..rows {
        for i in 0..cols {
            let (px, py) = (i as f64 + 0.5, j as f64 + 0.5);
            xs.push(gt[0] + px * gt[1] + py * gt[2]);
            ys.push(gt[3] + px * gt[4] + py * gt[5]);
        }
    }

    let (lons, lats) = if geographic {
        (xs, ys)
    } else {
        let target = SpatialRef::from_epsg(4326)?;
        let transform = CoordTransform::new(&source_srs, &target)?;
        let mut zs: [f64; 0] = [];
        transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
        // EPSG:4326 uses latitude, longitude axis order
        (ys, xs)
    };

    if output.exists() {
        fs::remove_file(output)?;
    }
    let mut file = create(output)?;
    file.add_dimension("nj", rows)?;
    file.add_dimension("ni", cols)?;

    for (name, data, units, long_name) in [
        ("xc", &lons, "degrees_east", "longitude of grid cell center"),
        ("yc", &lats, "degrees_north", "latitude of grid cell center"),
    ] {
        let mut var = file.add_variable::<f64>(name, &["nj", "ni"])?;
        var.put_attribute("units", units)?;
        var.put_attribute("long_name", long_name)?;
        var.put_values(data.as_slice(), ..)?;
    }

    // rectilinear axes let the native regridder search by coordinate
    if geographic && gt[2] == 0.0 && gt[4] == 0.0 {
        let lon_axis: Vec<f64> = (0..cols).map(|i| lons[i]).collect();
        let lat_axis: Vec<f64> = (0..rows).map(|j| lats[j * cols]).collect();
        let mut lon = file.add_variable::<f64>("lon", &["ni"])?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_values(&lon_axis, ..)?;
        let mut lat = file.add_variable::<f64>("lat", &["nj"])?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_values(&lat_axis, ..)?;
    }

    {
        let mut var = file.add_variable::<f64>(var_name, &["nj", "ni"])?;
        var.put_attribute("_FillValue", FILL_F64)?;
        var.put_attribute("coordinates", "xc yc")?;
        var.put_values(&values, ..)?;
    }

    file.add_attribute(
        "history",
        format!(
            "Converted from {} by vic_params on {}",
            input.display(),
            Utc::now().to_rfc3339()
        ),
    )?;

    info!(input = %input.display(), output = %output.display(), rows, cols, "converted GeoTIFF");
    Ok(())
}

/// Convert the SoilGrids 1 km layers found in `geotiff_dir`
///
/// Texture layers must all exist; bulk density, organic carbon and depth to
/// bedrock are converted when present.
pub fn batch_convert_soilgrids(geotiff_dir: &Path, netcdf_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(netcdf_dir)?;
    let mut written = Vec::new();

    for (variable, code) in SOILGRIDS_CODES {
        for layer in 1..=7 {
            let input = geotiff_dir.join(format!("{}_M_sl{}_1km_ll.tif", code, layer));
            if !input.exists() {
                if REQUIRED_SOILGRIDS.contains(&variable) {
                    return Err(VicParamsError::Generic(format!(
                        "missing SoilGrids layer {}",
                        input.display()
                    )));
                }
                warn!(input = %input.display(), "skipping missing optional SoilGrids layer");
                continue;
            }
            let output = netcdf_dir.join(format!("{}_sl{}.nc", variable, layer));
            convert_geotiff(&input, &output, variable)?;
            written.push(output);
        }
    }

    let bedrock = geotiff_dir.join("BDTICM_M_1km_ll.tif");
    if bedrock.exists() {
        let output = netcdf_dir.join("bedrock_sl1.nc");
        convert_geotiff(&bedrock, &output, "bedrock")?;
        written.push(output);
    }

    Ok(written)
}

/// Convert the WorldClim 2.0 10-minute monthly temperature and precipitation
pub fn batch_convert_worldclim(geotiff_dir: &Path, netcdf_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(netcdf_dir)?;
    let mut written = Vec::new();

    for variable in ["prec", "tavg"] {
        let subdir = geotiff_dir.join(format!("wc2.0_10m_{}", variable));
        for month in 1..=12 {
            let input = subdir.join(format!("wc2.0_10m_{}_{:02}.tif", variable, month));
            let output = netcdf_dir.join(format!("{}_{:02}.nc", variable, month));
            convert_geotiff(&input, &output, variable)?;
            written.push(output);
        }
    }

    Ok(written)
}
