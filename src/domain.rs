//! Target model grid
//!
//! The domain file defines the `(nj, ni)` grid every parameter is written on,
//! the land mask that decides which cells are active, and the cell centre and
//! corner coordinates copied into the parameter file.

use crate::errors::{Result, VicParamsError};
use crate::netcdf_io::{read_variable, read_variable_opt};
use ndarray::{Array, Array2, Array3, Dimension, Ix2, Ix3};
use netcdf::open;
use std::path::{Path, PathBuf};
use tracing::info;

/// Target grid read from a domain NetCDF
#[derive(Debug, Clone)]
pub struct Domain {
    pub path: PathBuf,
    /// 1 for active (land) cells, 0 otherwise
    pub mask: Array2<i32>,
    /// Cell centre longitudes
    pub xc: Array2<f64>,
    /// Cell centre latitudes
    pub yc: Array2<f64>,
    /// Corner longitudes as `(nj, ni, nv)`
    pub xv: Option<Array3<f64>>,
    /// Corner latitudes as `(nj, ni, nv)`
    pub yv: Option<Array3<f64>>,
}

impl Domain {
    /// Read `mask`, `xc`, `yc` and, when present, the corners `xv` and `yv`
    pub fn open(path: &Path) -> Result<Self> {
        let file = open(path)?;

        let mask = read_variable(&file, path, "mask")?.into_dimensionality::<Ix2>()?;
        let xc = read_variable(&file, path, "xc")?.into_dimensionality::<Ix2>()?;
        let yc = read_variable(&file, path, "yc")?.into_dimensionality::<Ix2>()?;

        let xv = read_variable_opt(&file, "xv")?
            .map(|a| a.into_dimensionality::<Ix3>())
            .transpose()?;
        let yv = read_variable_opt(&file, "yv")?
            .map(|a| a.into_dimensionality::<Ix3>())
            .transpose()?;

        // NaN mask entries (fill) count as inactive
        let mask = mask.mapv(|m| if m.is_finite() && m.round() == 1.0 { 1 } else { 0 });

        let mut domain = Self::from_parts(mask, xc, yc)?;
        domain.path = path.to_path_buf();
        domain.xv = xv;
        domain.yv = yv;
        domain.check_corners()?;

        info!(
            path = %path.display(),
            nj = domain.shape().0,
            ni = domain.shape().1,
            active = domain.active_count(),
            "loaded domain"
        );

        Ok(domain)
    }

    /// Build a domain from in-memory arrays
    pub fn from_parts(mask: Array2<i32>, xc: Array2<f64>, yc: Array2<f64>) -> Result<Self> {
        for (name, shape) in [("xc", xc.shape()), ("yc", yc.shape())] {
            if shape != mask.shape() {
                return Err(VicParamsError::ShapeMismatch {
                    var: name.to_string(),
                    expected: mask.shape().to_vec(),
                    found: shape.to_vec(),
                });
            }
        }

        Ok(Self {
            path: PathBuf::new(),
            mask,
            xc,
            yc,
            xv: None,
            yv: None,
        })
    }

    fn check_corners(&self) -> Result<()> {
        let (nj, ni) = self.shape();
        for (name, corners) in [("xv", &self.xv), ("yv", &self.yv)] {
            if let Some(c) = corners {
                if c.shape()[0] != nj || c.shape()[1] != ni {
                    return Err(VicParamsError::ShapeMismatch {
                        var: name.to_string(),
                        expected: vec![nj, ni, c.shape()[2]],
                        found: c.shape().to_vec(),
                    });
                }
            }
        }
        Ok(())
    }

    /// `(nj, ni)`
    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    pub fn is_active(&self, j: usize, i: usize) -> bool {
        self.mask[[j, i]] == 1
    }

    pub fn active_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m == 1).count()
    }

    /// 1.0 on active cells and NaN elsewhere
    pub fn nan_mask(&self) -> Array2<f64> {
        self.mask.mapv(|m| if m == 1 { 1.0 } else { f64::NAN })
    }

    /// Set every inactive cell of an array whose trailing axes are `(nj, ni)` to NaN
    pub fn mask_in_place<D: Dimension>(&self, array: &mut Array<f64, D>) -> Result<()> {
        self.mask_with(array, f64::NAN)
    }

    /// Integer counterpart of [`Domain::mask_in_place`]
    pub fn mask_int_in_place<D: Dimension>(&self, array: &mut Array<i32, D>, fill: i32) -> Result<()> {
        self.mask_with(array, fill)
    }

    fn mask_with<T: Copy, D: Dimension>(&self, array: &mut Array<T, D>, fill: T) -> Result<()> {
        let (nj, ni) = self.shape();
        let shape = array.shape().to_vec();
        let nd = shape.len();
        if nd < 2 || shape[nd - 2] != nj || shape[nd - 1] != ni {
            return Err(VicParamsError::ShapeMismatch {
                var: "masked array".to_string(),
                expected: vec![nj, ni],
                found: shape,
            });
        }

        let mut view = array.view_mut().into_dyn();
        for (idx, value) in view.indexed_iter_mut() {
            let idx = idx.slice();
            if self.mask[[idx[nd - 2], idx[nd - 1]]] != 1 {
                *value = fill;
            }
        }
        Ok(())
    }

    /// 1-based row-major cell numbers
    pub fn gridcell_numbers(&self) -> Array2<i32> {
        let (nj, ni) = self.shape();
        Array2::from_shape_fn((nj, ni), |(j, i)| (j * ni + i + 1) as i32)
    }
}
