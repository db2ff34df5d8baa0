//! In-process nearest-neighbour regridding
//!
//! Sources are either rectilinear, with 1-D longitude and latitude axes, or
//! carry 2-D cell centre coordinates (`xc`/`yc`). Rectilinear sources are
//! searched on their sorted axes; 2-D sources are searched exhaustively,
//! which suits the coarse parameter files they usually come from.
//!
//! The nearest source cell is chosen by great-circle distance. When the job
//! fills missing values, an active domain cell whose nearest source value is
//! missing takes the nearest valid source value instead.

use super::{great_circle, normalize_lon, LonLatBox, RegridJob, Regridder};
use crate::domain::Domain;
use crate::errors::{Result, VicParamsError};
use crate::netcdf_io::{copy_attributes, create_grid_file, read_variable, FILL_F64};
use chrono::Utc;
use ndarray::{ArrayD, ArrayView2, Axis, Ix2};
use netcdf::{open, File, Variable};
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info};

const COORDINATE_NAMES: &[&str] = &["xc", "yc", "lon", "lat", "longitude", "latitude", "x", "y"];

/// Nearest-neighbour remapping without external tools
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRegridder;

impl NativeRegridder {
    pub fn new() -> Self {
        Self
    }
}

/// One coordinate axis sorted by value, keeping source indices
#[derive(Debug)]
struct SortedAxis {
    values: Vec<(f64, usize)>,
    periodic: bool,
}

impl SortedAxis {
    fn new(mut values: Vec<(f64, usize)>, longitude: bool) -> Self {
        values.retain(|(v, _)| v.is_finite());
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let periodic = longitude && values.len() > 1 && {
            let first = values[0].0;
            let last = values[values.len() - 1].0;
            let step = (last - first) / (values.len() - 1) as f64;
            last - first + step >= 359.999
        };
        Self { values, periodic }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    /// Positions bracketing `v`, plus both ends on a periodic axis
    fn candidates(&self, v: f64) -> Vec<usize> {
        let n = self.values.len();
        let p = self.values.partition_point(|&(c, _)| c < v);
        let mut c = Vec::with_capacity(4);
        if p > 0 {
            c.push(p - 1);
        }
        if p < n {
            c.push(p);
        }
        if self.periodic {
            c.push(0);
            c.push(n - 1);
        }
        c
    }

    /// Smallest coordinate distance (degrees) from `v` to any position at
    /// least `k` steps away from `centre`; infinite once the axis is exhausted
    fn gap_beyond(&self, centre: usize, k: usize, v: f64) -> f64 {
        let n = self.values.len();
        if self.periodic {
            if 2 * k > n {
                return f64::INFINITY;
            }
            let angular = |pos: isize| {
                let c = self.values[pos.rem_euclid(n as isize) as usize].0;
                let d = (c - v).rem_euclid(360.0);
                d.min(360.0 - d)
            };
            let (c, k) = (centre as isize, k as isize);
            return angular(c + k).min(angular(c - k));
        }
        let above = (centre + k < n).then(|| (self.values[centre + k].0 - v).max(0.0));
        let below = (centre >= k).then(|| (v - self.values[centre - k].0).max(0.0));
        match (above, below) {
            (Some(a), Some(b)) => a.min(b),
            (Some(d), None) | (None, Some(d)) => d,
            (None, None) => f64::INFINITY,
        }
    }

    fn wrap(&self, pos: isize) -> Option<usize> {
        let n = self.values.len() as isize;
        if self.periodic {
            Some(pos.rem_euclid(n) as usize)
        } else if (0..n).contains(&pos) {
            Some(pos as usize)
        } else {
            None
        }
    }
}

/// Lower bound (radians) on the great-circle distance from latitude `lat` to
/// any point at least `dlon` degrees of longitude away
fn meridian_bound(lat: f64, dlon: f64) -> f64 {
    if dlon.is_infinite() {
        return f64::INFINITY;
    }
    let dlon = dlon.min(90.0).to_radians();
    (lat.to_radians().cos().abs() * dlon.sin()).min(1.0).asin()
}

/// Source cell centres
#[derive(Debug)]
enum SourceGrid {
    Rectilinear { lat: SortedAxis, lon: SortedAxis },
    /// `(lon, lat, j, i)` of every cell inside the crop box
    Scattered(Vec<(f64, f64, usize, usize)>),
}

/// Location of the nearest source cell: sorted-axis positions for a
/// rectilinear grid, `(point, 0)` for scattered points
type Located = (usize, usize);

impl SourceGrid {
    fn nearest(&self, lon: f64, lat: f64) -> Option<Located> {
        let mut best: Option<(f64, Located)> = None;
        let mut consider = |d: f64, loc: Located| {
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, loc));
            }
        };

        match self {
            SourceGrid::Rectilinear { lat: lat_axis, lon: lon_axis } => {
                for la in lat_axis.candidates(lat) {
                    for lo in lon_axis.candidates(normalize_lon(lon)) {
                        let d = great_circle(lon, lat, lon_axis.values[lo].0, lat_axis.values[la].0);
                        consider(d, (la, lo));
                    }
                }
            }
            SourceGrid::Scattered(points) => {
                for (k, &(plon, plat, _, _)) in points.iter().enumerate() {
                    consider(great_circle(lon, lat, plon, plat), (k, 0));
                }
            }
        }
        best.map(|(_, loc)| loc)
    }

    /// Source `(j, i)` of a located cell
    fn index(&self, loc: Located) -> (usize, usize) {
        match self {
            SourceGrid::Rectilinear { lat, lon } => (lat.values[loc.0].1, lon.values[loc.1].1),
            SourceGrid::Scattered(points) => (points[loc.0].2, points[loc.0].3),
        }
    }

    /// Nearest finite value, searching outwards from `loc`
    fn nearest_valid(&self, slice: &ArrayView2<f64>, lon: f64, lat: f64, loc: Located) -> Option<f64> {
        let mut best: Option<(f64, f64)> = None;
        fn consider(best: &mut Option<(f64, f64)>, d: f64, v: f64) {
            if v.is_finite() && best.map_or(true, |(bd, _)| d < bd) {
                *best = Some((d, v));
            }
        }

        match self {
            SourceGrid::Rectilinear { lat: lat_axis, lon: lon_axis } => {
                let max_r = lat_axis.len().max(lon_axis.len()) as isize;
                let (c_la, c_lo) = (loc.0 as isize, loc.1 as isize);
                let target_lon = normalize_lon(lon);

                for r in 1..=max_r {
                    for da in -r..=r {
                        let on_edge = da.abs() == r;
                        let dbs: Vec<isize> = if on_edge { (-r..=r).collect() } else { vec![-r, r] };
                        let la = c_la + da;
                        if la < 0 || la >= lat_axis.len() as isize {
                            continue;
                        }
                        let la = la as usize;
                        for db in dbs {
                            if let Some(lo) = lon_axis.wrap(c_lo + db) {
                                let (plat, j) = lat_axis.values[la];
                                let (plon, i) = lon_axis.values[lo];
                                consider(&mut best, great_circle(lon, lat, plon, plat), slice[[j, i]]);
                            }
                        }
                    }
                    // every cell of a later ring is at least this far away
                    let next = r as usize + 1;
                    let lat_gap = lat_axis.gap_beyond(loc.0, next, lat);
                    let lon_gap = lon_axis.gap_beyond(loc.1, next, target_lon);
                    if lat_gap.is_infinite() && lon_gap.is_infinite() {
                        break;
                    }
                    let bound = lat_gap.to_radians().min(meridian_bound(lat, lon_gap));
                    if best.map_or(false, |(d, _)| d <= bound) {
                        break;
                    }
                }
            }
            SourceGrid::Scattered(points) => {
                for &(plon, plat, j, i) in points {
                    consider(&mut best, great_circle(lon, lat, plon, plat), slice[[j, i]]);
                }
            }
        }
        best.map(|(_, v)| v)
    }
}

fn regrid_error(job: &RegridJob, message: impl Into<String>) -> VicParamsError {
    VicParamsError::Regrid {
        job: job.name.clone(),
        message: message.into(),
    }
}

/// First of `names` that is a variable of exactly `shape`
fn find_coordinate(file: &File, path: &Path, names: &[&str], shape: &[usize]) -> Result<Option<ArrayD<f64>>> {
    for name in names {
        if let Some(var) = file.variable(name) {
            let var_shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
            if var_shape == shape {
                return Ok(Some(read_variable(file, path, name)?));
            }
        }
    }
    Ok(None)
}

fn source_grid(
    file: &File,
    job: &RegridJob,
    dims: &[String],
    ny: usize,
    nx: usize,
) -> Result<SourceGrid> {
    let nd = dims.len();
    let lon_names = [dims[nd - 1].as_str(), "lon", "longitude", "x"];
    let lat_names = [dims[nd - 2].as_str(), "lat", "latitude", "y"];
    let bbox = job.bbox;

    let lons = find_coordinate(file, &job.input, &lon_names, &[nx])?;
    let lats = find_coordinate(file, &job.input, &lat_names, &[ny])?;
    if let (Some(lons), Some(lats)) = (lons, lats) {
        let keep_lon = |v: f64| bbox.map_or(true, |b: LonLatBox| b.contains_lon(v));
        let keep_lat = |v: f64| bbox.map_or(true, |b: LonLatBox| b.contains_lat(v));

        let lon = SortedAxis::new(
            lons.iter()
                .enumerate()
                .filter(|(_, &v)| keep_lon(v))
                .map(|(i, &v)| (normalize_lon(v), i))
                .collect(),
            true,
        );
        let lat = SortedAxis::new(
            lats.iter()
                .enumerate()
                .filter(|(_, &v)| keep_lat(v))
                .map(|(j, &v)| (v, j))
                .collect(),
            false,
        );
        if lon.len() == 0 || lat.len() == 0 {
            return Err(regrid_error(job, "no source cells inside the crop box"));
        }
        debug!(job = %job.name, nlat = lat.len(), nlon = lon.len(), periodic = lon.periodic, "rectilinear source");
        return Ok(SourceGrid::Rectilinear { lat, lon });
    }

    for (x_name, y_name) in [("xc", "yc"), ("lon", "lat"), ("longitude", "latitude")] {
        let xs = find_coordinate(file, &job.input, &[x_name], &[ny, nx])?;
        let ys = find_coordinate(file, &job.input, &[y_name], &[ny, nx])?;
        if let (Some(xs), Some(ys)) = (xs, ys) {
            let xs = xs.into_dimensionality::<Ix2>()?;
            let ys = ys.into_dimensionality::<Ix2>()?;
            let points: Vec<(f64, f64, usize, usize)> = xs
                .indexed_iter()
                .filter_map(|((j, i), &lon)| {
                    let lat = ys[[j, i]];
                    let inside = lon.is_finite()
                        && lat.is_finite()
                        && bbox.map_or(true, |b| b.contains(lon, lat));
                    inside.then_some((lon, lat, j, i))
                })
                .collect();
            if points.is_empty() {
                return Err(regrid_error(job, "no source cells inside the crop box"));
            }
            debug!(job = %job.name, points = points.len(), "2-D coordinate source");
            return Ok(SourceGrid::Scattered(points));
        }
    }

    Err(regrid_error(
        job,
        format!("no lon/lat coordinates for dimensions {:?}", &dims[nd - 2..]),
    ))
}

fn select_variable<'f>(file: &'f File, job: &RegridJob) -> Result<Variable<'f>> {
    match &job.variable {
        Some(name) => file
            .variable(name)
            .ok_or_else(|| VicParamsError::VariableNotFound {
                var: name.clone(),
                file: job.input.clone(),
            }),
        None => file
            .variables()
            .find(|v| v.dimensions().len() >= 2 && !COORDINATE_NAMES.contains(&v.name().as_str()))
            .ok_or_else(|| regrid_error(job, "no gridded variable in source")),
    }
}

impl Regridder for NativeRegridder {
    fn name(&self) -> &'static str {
        "native"
    }

    fn regrid(&self, job: &RegridJob, domain_path: &Path) -> Result<()> {
        let domain = Domain::open(domain_path)?;
        let source = open(&job.input)?;
        let var = select_variable(&source, job)?;
        let var_name = var.name();

        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if shape.len() < 2 {
            return Err(regrid_error(job, format!("'{}' is not gridded", var_name)));
        }
        let nd = shape.len();
        let (ny, nx) = (shape[nd - 2], shape[nd - 1]);
        let leading = &shape[..nd - 2];
        let nslices: usize = leading.iter().product();

        let grid = source_grid(&source, job, &dims, ny, nx)?;

        let mut data = read_variable(&source, &job.input, &var_name)?
            .into_shape((nslices, ny, nx))?;
        if let Some(range) = job.valid_range {
            data.mapv_inplace(|v| if range.contains(v) { v } else { f64::NAN });
        }

        let (nj, ni) = domain.shape();
        let targets: Vec<(f64, f64, bool)> = (0..nj * ni)
            .map(|k| {
                let (j, i) = (k / ni, k % ni);
                (domain.xc[[j, i]], domain.yc[[j, i]], domain.is_active(j, i))
            })
            .collect();

        let nearest: Vec<Option<Located>> = targets
            .par_iter()
            .map(|&(lon, lat, _)| {
                if lon.is_finite() && lat.is_finite() {
                    grid.nearest(lon, lat)
                } else {
                    None
                }
            })
            .collect();

        let mut values = Vec::with_capacity(nslices * nj * ni);
        for s in 0..nslices {
            let slice = data.index_axis(Axis(0), s);
            let remapped: Vec<f64> = targets
                .par_iter()
                .zip(nearest.par_iter())
                .map(|(&(lon, lat, active), loc)| {
                    let Some(loc) = *loc else {
                        return f64::NAN;
                    };
                    let (j, i) = grid.index(loc);
                    let v = slice[[j, i]];
                    if v.is_nan() && job.fill_missing && active {
                        grid.nearest_valid(&slice, lon, lat, loc).unwrap_or(f64::NAN)
                    } else {
                        v
                    }
                })
                .collect();
            values.extend(remapped);
        }

        let mut output = create_grid_file(&job.output, &domain)?;
        let mut out_dims: Vec<&str> = Vec::with_capacity(nd);
        for (name, &len) in dims[..nd - 2].iter().zip(leading) {
            output.add_dimension(name, len)?;
            out_dims.push(name.as_str());
        }
        out_dims.extend(["nj", "ni"]);

        {
            let mut out_var = output.add_variable::<f64>(&var_name, &out_dims)?;
            copy_attributes(&var, &mut out_var)?;
            out_var.put_attribute("_FillValue", FILL_F64)?;
            out_var.put_attribute("coordinates", "xc yc")?;
            let filled: Vec<f64> = values
                .iter()
                .map(|&v| if v.is_nan() { FILL_F64 } else { v })
                .collect();
            out_var.put_values(&filled, ..)?;
        }

        output.add_attribute(
            "history",
            format!(
                "Remapped from {} by vic_params nearest neighbour on {}",
                job.input.display(),
                Utc::now().to_rfc3339()
            ),
        )?;

        info!(
            job = %job.name,
            variable = %var_name,
            slices = nslices,
            output = %job.output.display(),
            "regridded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_candidates_wrap_when_periodic() {
        let lons: Vec<(f64, usize)> = (0..360).map(|i| (normalize_lon(i as f64 + 0.5), i)).collect();
        let axis = SortedAxis::new(lons, true);
        assert!(axis.periodic);
        let c = axis.candidates(179.9);
        assert!(c.contains(&0));
        assert_eq!(axis.wrap(-1), Some(359));

        let lats = SortedAxis::new(vec![(10.0, 0), (0.0, 1), (5.0, 2)], false);
        assert!(!lats.periodic);
        assert_eq!(lats.values[0], (0.0, 1));
        assert_eq!(lats.wrap(3), None);
    }

    #[test]
    fn ring_search_finds_nearest_valid() {
        let lat = SortedAxis::new((0..5).map(|j| (j as f64, j)).collect(), false);
        let lon = SortedAxis::new((0..5).map(|i| (i as f64, i)).collect(), true);
        let grid = SourceGrid::Rectilinear { lat, lon };

        let mut data = ndarray::Array2::<f64>::from_elem((5, 5), f64::NAN);
        data[[4, 4]] = 7.0;
        data[[2, 4]] = 3.0;

        let loc = grid.nearest(0.1, 0.1).unwrap();
        assert_eq!(grid.index(loc), (0, 0));
        let v = grid.nearest_valid(&data.view(), 0.1, 0.1, loc).unwrap();
        assert_eq!(v, 3.0);
    }

    #[test]
    fn ring_search_reaches_past_first_hit_near_the_pole() {
        let lat = SortedAxis::new((0..3).map(|j| (79.0 + j as f64, j)).collect(), false);
        let lon = SortedAxis::new((0..11).map(|i| (i as f64, i)).collect(), true);
        let grid = SourceGrid::Rectilinear { lat, lon };

        // one row north is farther than four columns east at 80N
        let mut data = ndarray::Array2::<f64>::from_elem((3, 11), f64::NAN);
        data[[2, 0]] = 1.0;
        data[[1, 4]] = 2.0;
        assert!(great_circle(0.0, 80.0, 4.0, 80.0) < great_circle(0.0, 80.0, 0.0, 81.0));

        let loc = grid.nearest(0.0, 80.0).unwrap();
        assert_eq!(grid.index(loc), (1, 0));
        let v = grid.nearest_valid(&data.view(), 0.0, 80.0, loc).unwrap();
        assert_eq!(v, 2.0);
    }

    #[test]
    fn meridian_bound_is_a_lower_bound() {
        for lat in [0.0, 45.0, 80.0, 89.0] {
            for dlon in [1.0, 4.0, 30.0, 120.0] {
                for other_lat in [lat - 1.0, lat, lat + 0.5] {
                    let d = great_circle(0.0, lat, dlon, other_lat);
                    assert!(meridian_bound(lat, dlon) <= d + 1e-12);
                }
            }
        }
        assert!(meridian_bound(60.0, f64::INFINITY).is_infinite());
    }
}
