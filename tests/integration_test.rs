//! End-to-end tests: regridding onto a domain and building a parameter file
//! from synthetic source datasets.

use approx::assert_relative_eq;
use netcdf::{create, open};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use vic_params::config::Config;
use vic_params::hydroclimate::{HydroclimateClass, HydroclimateMasks};
use vic_params::metadata::validate_parameter_file;
use vic_params::netcdf_io::{read_grid, FILL_I32};
use vic_params::pipeline::{build_parameters, make_hydroclimate_masks, run_regrid, write_parameters};
use vic_params::regrid::{NativeRegridder, RegridJob, RegriddedPaths, Regridder};

const LATS: [f64; 4] = [59.5, 60.5, 61.5, 62.5];
const LONS: [f64; 4] = [8.5, 9.5, 10.5, 11.5];

fn write_domain(path: &Path, mask: &[i32], xc: &[f64], yc: &[f64], shape: (usize, usize)) {
    let mut file = create(path).expect("Failed to create domain");
    file.add_dimension("nj", shape.0).unwrap();
    file.add_dimension("ni", shape.1).unwrap();
    file.add_variable::<i32>("mask", &["nj", "ni"])
        .unwrap()
        .put_values(mask, ..)
        .unwrap();
    file.add_variable::<f64>("xc", &["nj", "ni"])
        .unwrap()
        .put_values(xc, ..)
        .unwrap();
    file.add_variable::<f64>("yc", &["nj", "ni"])
        .unwrap()
        .put_values(yc, ..)
        .unwrap();
}

/// Source on a lat/lon grid with optional leading dimensions
fn write_source(
    path: &Path,
    var: &str,
    lats: &[f64],
    lons: &[f64],
    leading: &[(&str, usize)],
    values: &[f64],
) {
    let mut file = create(path).expect("Failed to create source");
    let mut dims: Vec<&str> = Vec::new();
    for &(name, len) in leading {
        file.add_dimension(name, len).unwrap();
        dims.push(name);
    }
    file.add_dimension("lat", lats.len()).unwrap();
    file.add_dimension("lon", lons.len()).unwrap();
    dims.extend(["lat", "lon"]);

    file.add_variable::<f64>("lat", &["lat"])
        .unwrap()
        .put_values(lats, ..)
        .unwrap();
    file.add_variable::<f64>("lon", &["lon"])
        .unwrap()
        .put_values(lons, ..)
        .unwrap();

    let mut data = file.add_variable::<f64>(var, &dims).unwrap();
    data.put_attribute("units", "1").unwrap();
    data.put_values(values, ..).unwrap();
}

/// Same value in every cell of each leading slice
fn write_constant(path: &Path, var: &str, leading: &[(&str, usize)], value: impl Fn(usize) -> f64) {
    let cells = LATS.len() * LONS.len();
    let slices: usize = leading.iter().map(|&(_, n)| n).product();
    let values: Vec<f64> = (0..slices * cells).map(|k| value(k / cells)).collect();
    write_source(path, var, &LATS, &LONS, leading, &values);
}

#[test]
fn native_regrid_fills_invalid_sources_on_active_cells() {
    let dir = tempdir().unwrap();
    let domain_path = dir.path().join("domain.nc");
    // active cell on (60.5, 9.5), inactive cell on (60.5, 8.5)
    write_domain(&domain_path, &[1, 0], &[9.5, 8.5], &[60.5, 60.5], (1, 2));

    let lons = [8.5, 9.5, 10.2, 11.5];
    let mut values: Vec<f64> = (0..16).map(|k| ((k / 4) * 10 + k % 4) as f64).collect();
    values[4] = 500.0;
    values[5] = 500.0;
    let input = dir.path().join("clay_sl1.nc");
    write_source(&input, "clay", &LATS, &lons, &[], &values);

    let output = dir.path().join("clay_sl1_test.nc");
    let job = RegridJob::new("clay_sl1", &input, &output)
        .select("clay")
        .valid_range(0.0, 100.0);
    NativeRegridder::new().regrid(&job, &domain_path).unwrap();

    let result = read_grid(&output, "clay", (1, 2)).unwrap();
    // nearest valid neighbour of the masked source cell lies 0.7 degrees east
    assert_relative_eq!(result[[0, 0]], 12.0);
    assert!(result[[0, 1]].is_nan());

    let file = open(&output).unwrap();
    assert!(file.variable("xc").is_some());
    assert!(file.attribute("history").is_some());
}

#[test]
fn native_regrid_keeps_leading_dimensions() {
    let dir = tempdir().unwrap();
    let domain_path = dir.path().join("domain.nc");
    write_domain(&domain_path, &[1, 1], &[9.5, 10.5], &[60.5, 61.5], (1, 2));

    let input = dir.path().join("lai.nc");
    write_constant(&input, "MONTHLY_LAI", &[("time", 3)], |t| t as f64 + 1.0);

    let output = dir.path().join("lai_test.nc");
    let job = RegridJob::new("lai", &input, &output).select("MONTHLY_LAI");
    NativeRegridder::new().regrid(&job, &domain_path).unwrap();

    let result = read_grid(&output, "MONTHLY_LAI", (1, 2)).unwrap();
    assert_eq!(result.shape(), &[3, 1, 2]);
    assert_relative_eq!(result[[2, 0, 1]], 3.0);
}

fn write_sources(dir: &TempDir) -> Config {
    let root = dir.path();
    let sub = |name: &str| {
        let path = root.join(name);
        fs::create_dir_all(&path).unwrap();
        path
    };
    let (soil, wc, hc, veg, dem) = (sub("soil"), sub("wc"), sub("hc"), sub("veg"), sub("dem"));

    write_domain(
        &root.join("domain.nc"),
        &[1, 1, 1, 0],
        &[9.5, 10.5, 9.5, 10.5],
        &[60.5, 60.5, 61.5, 61.5],
        (2, 2),
    );

    for (var, value) in [("sand", 40.0), ("clay", 20.0), ("silt", 40.0), ("coarse", 5.0)] {
        for layer in 1..=7 {
            write_constant(&soil.join(format!("{}_sl{}.nc", var, layer)), var, &[], |_| value);
        }
    }
    for month in 1..=12 {
        write_constant(&wc.join(format!("tavg_{:02}.nc", month)), "tavg", &[], |_| month as f64);
        write_constant(&wc.join(format!("prec_{:02}.nc", month)), "prec", &[], |_| 10.0);
    }

    write_constant(&hc.join("kg.nc"), "Band1", &[], |_| 5.0);
    write_constant(&hc.join("pf.nc"), "NCSCDv2", &[], |_| 0.0);

    let monthly = [("time", 12), ("lsmpft", 17)];
    {
        write_constant(&veg.join("lai.nc"), "MONTHLY_LAI", &monthly, |_| 2.0);
        // both monthly variables live in the same CLM file
        let mut file = netcdf::append(veg.join("lai.nc")).unwrap();
        let values = vec![5.0; 12 * 17 * LATS.len() * LONS.len()];
        let mut height = file
            .add_variable::<f64>("MONTHLY_HEIGHT_TOP", &["time", "lsmpft", "lat", "lon"])
            .unwrap();
        height.put_values(&values, ..).unwrap();
    }
    write_constant(&veg.join("pft.nc"), "PCT_PFT", &[("lsmpft", 17)], |v| {
        if v == 1 {
            100.0
        } else {
            0.0
        }
    });

    write_constant(&dem.join("gtopo.nc"), "Band1", &[], |_| 250.0);

    // reference row inside the arid box
    let soil_file = root.join("soil_param.txt");
    fs::write(&soil_file, "1 1 39.0 105.0 0.3 0.002 12.0 0.8 2.0\n").unwrap();

    let text = format!(
        r#"
[parameter_specs]
domain_file = "{root}/domain.nc"
grid = "test"
output_dir = "{root}/out"

[soil]
netcdf_dir = "{root}/soil"

[worldclim]
netcdf_dir = "{root}/wc"

[hydroclimate]
dir = "{root}/hc"
koppen_filename = "kg.nc"
brown_filename = "pf.nc"

[vegetation]
dir = "{root}/veg"
filename = "lai.nc"
pft_filename = "pft.nc"

[gtopo]
dir = "{root}/dem"
filename = "gtopo.nc"

[baseflow]
soil_file = "{root}/soil_param.txt"
"#,
        root = root.display()
    );
    Config::from_toml_str(&text).unwrap()
}

#[test]
fn full_run_builds_a_valid_parameter_file() {
    let dir = tempdir().unwrap();
    let config = write_sources(&dir);

    let jobs = run_regrid(&config, &NativeRegridder::new()).unwrap();
    assert_eq!(jobs, 28 + 24 + 6);

    let masks = make_hydroclimate_masks(&config).unwrap();
    let arid = masks.get(HydroclimateClass::Arid);
    assert_eq!(arid.iter().filter(|&&m| m == 1).count(), 3);
    assert_eq!(arid[[1, 1]], 0);

    let paths = RegriddedPaths::from_config(&config);
    let reread = HydroclimateMasks::read(&paths.hydroclimate_masks()).unwrap();
    assert_eq!(reread.get(HydroclimateClass::Arid), arid);
    assert_eq!(reread.land(), masks.land());

    let set = build_parameters(&config).unwrap();
    let float = |name: &str| set.get(name).unwrap().as_float().unwrap().clone();

    let dsmax = float("Dsmax");
    assert_relative_eq!(dsmax[[0, 0]], 12.0);
    assert!(dsmax[[1, 1]].is_nan());

    assert_relative_eq!(float("avg_T")[[0, 1]], 6.5);
    assert_relative_eq!(float("annual_prec")[[1, 0]], 120.0);
    assert_relative_eq!(float("elev")[[0, 0]], 250.0);
    assert!(float("elev")[[1, 1]].is_nan());
    assert_relative_eq!(float("off_gmt")[[0, 0]], 9.5 * 24.0 / 360.0, epsilon = 1e-12);

    let lai = float("LAI");
    assert_eq!(lai.shape(), &[17, 12, 2, 2]);
    assert_relative_eq!(lai[[1, 0, 0, 0]], 2.0);

    let fs_active = set.get("fs_active").unwrap().as_int().unwrap();
    assert_eq!(fs_active[[0, 0]], 0);
    assert_eq!(fs_active[[1, 1]], FILL_I32);

    let output = write_parameters(&config, &set).unwrap();
    assert_eq!(output, config.parameter_specs.output_path());

    let file = open(&output).unwrap();
    let report = validate_parameter_file(&file).unwrap();
    assert!(report.is_valid(), "{}", report);
    assert!(report.unknown.is_empty());
}
