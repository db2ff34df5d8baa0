use super::library::{VegClassParams, VegLibrary};
use super::pft::{self, Pft, N_PFT};
use crate::domain::Domain;
use crate::errors::{Result, VicParamsError};
use crate::netcdf_io::FILL_I32;
use crate::params::ParameterSet;
use crate::schema::{N_MONTH, N_ROOT_ZONE};
use ndarray::{Array2, Array3, Array4};
use tracing::{info, warn};

/// Regridded CLM vegetation fields
#[derive(Debug, Clone)]
pub struct VegetationInputs {
    /// Cover percentage per PFT as `(17, nj, ni)`
    pub pct_pft: Array3<f64>,
    /// Monthly LAI as `(12, 17, nj, ni)`
    pub lai: Array4<f64>,
    /// Monthly canopy top height (m) as `(12, 17, nj, ni)`
    pub height: Array4<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VegetationOptions {
    pub max_snow_albedo: bool,
}

/// Vegetation parameters, one tile per PFT
#[derive(Debug, Clone)]
pub struct VegetationParameters {
    pub cv: Array3<f64>,
    pub nveg: Array2<i32>,
    pub trunk_ratio: Array3<f64>,
    pub rarc: Array3<f64>,
    pub rmin: Array3<f64>,
    pub wind_h: Array3<f64>,
    pub rgl: Array3<f64>,
    pub rad_atten: Array3<f64>,
    pub wind_atten: Array3<f64>,
    pub max_snow_albedo: Option<Array3<f64>>,
    /// `(veg_class, month, nj, ni)`
    pub albedo: Array4<f64>,
    pub lai: Array4<f64>,
    pub overstory: Array3<i32>,
    pub displacement: Array4<f64>,
    pub veg_rough: Array4<f64>,
    /// `(veg_class, root_zone, nj, ni)`
    pub root_depth: Array4<f64>,
    pub root_fract: Array4<f64>,
}

impl VegetationParameters {
    pub fn insert_into(self, set: &mut ParameterSet) -> Result<()> {
        set.insert_float("Cv", self.cv)?;
        set.insert_int("Nveg", self.nveg)?;
        set.insert_float("trunk_ratio", self.trunk_ratio)?;
        set.insert_float("rarc", self.rarc)?;
        set.insert_float("rmin", self.rmin)?;
        set.insert_float("wind_h", self.wind_h)?;
        set.insert_float("RGL", self.rgl)?;
        set.insert_float("rad_atten", self.rad_atten)?;
        set.insert_float("wind_atten", self.wind_atten)?;
        if let Some(max_snow_albedo) = self.max_snow_albedo {
            set.insert_float("max_snow_albedo", max_snow_albedo)?;
        }
        set.insert_float("albedo", self.albedo)?;
        set.insert_float("LAI", self.lai)?;
        set.insert_int("overstory", self.overstory)?;
        set.insert_float("displacement", self.displacement)?;
        set.insert_float("veg_rough", self.veg_rough)?;
        set.insert_float("root_depth", self.root_depth)?;
        set.insert_float("root_fract", self.root_fract)?;
        Ok(())
    }
}

fn check_shape(name: &str, found: &[usize], expected: &[usize]) -> Result<()> {
    if found != expected {
        return Err(VicParamsError::ShapeMismatch {
            var: name.to_string(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }
    Ok(())
}

/// Derive every vegetation parameter from CLM cover, LAI and canopy height
///
/// Library constants come from the NLDAS class of each PFT tile. Missing LAI
/// or height on an active cell is treated as zero.
pub fn derive_vegetation_parameters(
    inputs: &VegetationInputs,
    domain: &Domain,
    library: &VegLibrary,
    options: VegetationOptions,
) -> Result<VegetationParameters> {
    let (nj, ni) = domain.shape();
    check_shape("PCT_PFT", inputs.pct_pft.shape(), &[N_PFT, nj, ni])?;
    check_shape("LAI", inputs.lai.shape(), &[N_MONTH, N_PFT, nj, ni])?;
    check_shape("height", inputs.height.shape(), &[N_MONTH, N_PFT, nj, ni])?;

    info!(cells = domain.active_count(), "deriving vegetation parameters");

    let pfts: Vec<Pft> = Pft::all().collect();
    let active = |j: usize, i: usize| domain.is_active(j, i);

    let cv = Array3::from_shape_fn((N_PFT, nj, ni), |(v, j, i)| {
        if active(j, i) {
            pft::cv_from_percent(inputs.pct_pft[[v, j, i]])
        } else {
            f64::NAN
        }
    });

    let mut missing_cover = 0usize;
    let nveg = Array2::from_shape_fn((nj, ni), |(j, i)| {
        if !active(j, i) {
            return FILL_I32;
        }
        let percents: Vec<f64> = (0..N_PFT).map(|v| inputs.pct_pft[[v, j, i]]).collect();
        if percents.iter().all(|p| p.is_nan()) {
            missing_cover += 1;
        }
        pft::count_active_pfts(&percents) as i32
    });
    if missing_cover > 0 {
        warn!(cells = missing_cover, "active cells without PFT cover");
    }

    let per_class = |f: fn(&VegClassParams) -> f64| -> Array3<f64> {
        Array3::from_shape_fn((N_PFT, nj, ni), |(v, j, i)| {
            if active(j, i) {
                f(library.get(pfts[v].nldas()))
            } else {
                f64::NAN
            }
        })
    };

    let monthly = |source: &Array4<f64>, scale: f64| -> Array4<f64> {
        Array4::from_shape_fn((N_PFT, N_MONTH, nj, ni), |(v, m, j, i)| {
            if !active(j, i) {
                return f64::NAN;
            }
            let value = source[[m, v, j, i]];
            if value.is_nan() {
                0.0
            } else {
                scale * value
            }
        })
    };

    let albedo = Array4::from_shape_fn((N_PFT, N_MONTH, nj, ni), |(v, _, j, i)| {
        if active(j, i) {
            library.get(pfts[v].nldas()).albedo
        } else {
            f64::NAN
        }
    });

    let overstory = Array3::from_shape_fn((N_PFT, nj, ni), |(v, j, i)| {
        if active(j, i) {
            i32::from(pfts[v].nldas().is_overstory())
        } else {
            FILL_I32
        }
    });

    let root_fract = Array4::from_shape_fn((N_PFT, N_ROOT_ZONE, nj, ni), |(v, z, j, i)| {
        pft::root_fract(cv[[v, j, i]], pfts[v], z)
    });
    // missing cover on an active cell gives no roots
    let root_depth = Array4::from_shape_fn((N_PFT, N_ROOT_ZONE, nj, ni), |(v, z, j, i)| {
        if active(j, i) {
            pft::root_depth(cv[[v, j, i]], z)
        } else {
            f64::NAN
        }
    });

    Ok(VegetationParameters {
        trunk_ratio: per_class(|p| p.trunk_ratio),
        rarc: per_class(|p| p.rarc),
        rmin: per_class(|p| p.rmin),
        wind_h: per_class(|p| p.wind_h),
        rgl: per_class(|p| p.rgl),
        rad_atten: per_class(|p| p.rad_atten),
        wind_atten: per_class(|p| p.wind_atten),
        max_snow_albedo: options
            .max_snow_albedo
            .then(|| per_class(|p| p.max_snow_albedo)),
        albedo,
        lai: monthly(&inputs.lai, 1.0),
        overstory,
        displacement: monthly(&inputs.height, pft::displacement(1.0)),
        veg_rough: monthly(&inputs.height, pft::roughness(1.0)),
        root_depth,
        root_fract,
        cv,
        nveg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn inputs() -> VegetationInputs {
        let mut pct_pft = Array3::zeros((N_PFT, 1, 2));
        pct_pft[[0, 0, 0]] = 20.0;
        pct_pft[[1, 0, 0]] = 50.0;
        pct_pft[[13, 0, 0]] = 30.0;
        pct_pft[[0, 0, 1]] = 100.0;
        let mut height = Array4::zeros((N_MONTH, N_PFT, 1, 2));
        height.fill(10.0);
        VegetationInputs {
            pct_pft,
            lai: Array4::from_elem((N_MONTH, N_PFT, 1, 2), 2.5),
            height,
        }
    }

    fn domain() -> Domain {
        Domain::from_parts(array![[1, 1]], array![[0.0, 1.0]], array![[60.0, 60.0]]).unwrap()
    }

    #[test]
    fn tiles_follow_cover() {
        let params = derive_vegetation_parameters(
            &inputs(),
            &domain(),
            &VegLibrary::nldas(),
            VegetationOptions::default(),
        )
        .unwrap();

        assert_eq!(params.nveg[[0, 0]], 2);
        assert_eq!(params.nveg[[0, 1]], 0);
        assert_relative_eq!(params.cv[[1, 0, 0]], 0.5);
        assert_eq!(params.overstory[[1, 0, 0]], 1);
        assert_eq!(params.overstory[[13, 0, 0]], 0);
        assert_eq!(params.rmin[[1, 0, 0]], 250.0);
        assert_eq!(params.root_fract[[1, 0, 0, 0]], 0.3);
        assert_eq!(params.root_fract[[13, 1, 0, 0]], 0.3);
        assert_eq!(params.root_depth[[5, 0, 0, 0]], 0.0);
        assert_relative_eq!(params.displacement[[1, 4, 0, 0]], 6.7, max_relative = 1e-12);
        assert_relative_eq!(params.veg_rough[[1, 4, 0, 0]], 1.23, max_relative = 1e-12);
        assert_eq!(params.lai[[13, 11, 0, 1]], 2.5);
        assert!(params.max_snow_albedo.is_none());
    }

    #[test]
    fn inactive_cells_are_masked() {
        let domain =
            Domain::from_parts(array![[1, 0]], array![[0.0, 1.0]], array![[60.0, 60.0]]).unwrap();
        let params = derive_vegetation_parameters(
            &inputs(),
            &domain,
            &VegLibrary::nldas(),
            VegetationOptions {
                max_snow_albedo: true,
            },
        )
        .unwrap();
        assert!(params.cv[[0, 0, 1]].is_nan());
        assert!(params.albedo[[3, 2, 0, 1]].is_nan());
        assert_eq!(params.nveg[[0, 1]], FILL_I32);
        assert!(params.max_snow_albedo.unwrap()[[0, 0, 1]].is_nan());
        assert!(params.root_depth[[0, 0, 0, 1]].is_nan());
    }

    #[test]
    fn missing_cover_has_no_roots() {
        let mut inputs = inputs();
        for v in 0..N_PFT {
            inputs.pct_pft[[v, 0, 1]] = f64::NAN;
        }
        let params = derive_vegetation_parameters(
            &inputs,
            &domain(),
            &VegLibrary::nldas(),
            VegetationOptions::default(),
        )
        .unwrap();

        assert!(params.cv[[0, 0, 1]].is_nan());
        assert!(params.root_fract[[0, 0, 0, 1]].is_nan());
        assert_eq!(params.root_depth[[0, 0, 0, 1]], 0.0);
        assert_eq!(params.root_depth[[0, 1, 0, 1]], 0.0);
        assert_eq!(params.root_depth[[1, 1, 0, 0]], 0.7);
    }

    #[test]
    fn rejects_misshapen_lai() {
        let mut bad = inputs();
        bad.lai = Array4::zeros((N_PFT, N_MONTH, 1, 2));
        assert!(derive_vegetation_parameters(
            &bad,
            &domain(),
            &VegLibrary::nldas(),
            VegetationOptions::default()
        )
        .is_err());
    }
}
