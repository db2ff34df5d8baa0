//! NLDAS vegetation library
//!
//! Canopy constants for the twelve NLDAS (UMD) vegetation classes as used by
//! the LDAS VIC setups. Maximum snow albedo follows Barlage et al. (2005).

use super::pft::NldasClass;

/// Constants of one vegetation class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VegClassParams {
    pub name: &'static str,
    /// Architectural resistance (s/m)
    pub rarc: f64,
    /// Minimum stomatal resistance (s/m)
    pub rmin: f64,
    /// Wind measurement height (m)
    pub wind_h: f64,
    /// Minimum shortwave for transpiration (W/m2)
    pub rgl: f64,
    pub rad_atten: f64,
    pub wind_atten: f64,
    pub trunk_ratio: f64,
    pub albedo: f64,
    pub max_snow_albedo: f64,
}

#[allow(clippy::too_many_arguments)]
const fn class(
    name: &'static str,
    rarc: f64,
    rmin: f64,
    wind_h: f64,
    rgl: f64,
    trunk_ratio: f64,
    albedo: f64,
    max_snow_albedo: f64,
) -> VegClassParams {
    VegClassParams {
        name,
        rarc,
        rmin,
        wind_h,
        rgl,
        rad_atten: 0.5,
        wind_atten: 0.5,
        trunk_ratio,
        albedo,
        max_snow_albedo,
    }
}

const NLDAS_CLASSES: [VegClassParams; 12] = [
    class("evergreen needleleaf forest", 60.0, 250.0, 10.0, 30.0, 0.2, 0.12, 0.46),
    class("deciduous needleleaf forest", 60.0, 150.0, 10.0, 30.0, 0.2, 0.18, 0.55),
    class("evergreen broadleaf forest", 60.0, 250.0, 10.0, 30.0, 0.2, 0.12, 0.46),
    class("deciduous broadleaf forest", 60.0, 150.0, 10.0, 30.0, 0.2, 0.18, 0.52),
    class("mixed forest", 60.0, 200.0, 10.0, 30.0, 0.2, 0.18, 0.51),
    class("woodland", 60.0, 200.0, 10.0, 30.0, 0.2, 0.18, 0.55),
    class("wooded grassland", 50.0, 125.0, 2.0, 50.0, 0.2, 0.19, 0.72),
    class("closed shrubland", 50.0, 135.0, 2.0, 50.0, 0.2, 0.19, 0.75),
    class("open shrubland", 50.0, 135.0, 2.0, 50.0, 0.2, 0.19, 0.80),
    class("grassland", 25.0, 120.0, 2.0, 75.0, 0.2, 0.20, 0.80),
    class("cropland", 25.0, 120.0, 2.0, 100.0, 0.2, 0.10, 0.80),
    class("bare soil", 2.0, 100.0, 2.0, 100.0, 0.2, 0.20, 0.85),
];

/// Lookup of class constants by NLDAS class
#[derive(Debug, Clone)]
pub struct VegLibrary {
    classes: [VegClassParams; 12],
}

impl Default for VegLibrary {
    fn default() -> Self {
        Self::nldas()
    }
}

impl VegLibrary {
    pub fn nldas() -> Self {
        Self {
            classes: NLDAS_CLASSES,
        }
    }

    pub fn get(&self, class: NldasClass) -> &VegClassParams {
        &self.classes[class.index()]
    }
}
