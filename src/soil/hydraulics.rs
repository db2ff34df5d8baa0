//! Class-specific hydraulic coefficients
//!
//! Values from Carsel & Parrish (1988, table 3), the VIC soil texture table
//! and the Noah-MP soil characteristics. The silt class has no entry in
//! Carsel & Parrish and borrows `b` from silty clay loam.

use super::texture::SoilTexture;

/// cm/h to mm/day
const KSAT_CM_H_TO_MM_DAY: f64 = 240.0;

const MM_PER_M: f64 = 1000.0;

/// Hydraulic properties of one texture class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilHydraulics {
    /// Saturated conductivity (cm/h)
    pub ksat: f64,
    /// Campbell pore-size distribution exponent
    pub b: f64,
    /// Volumetric moisture at wilting point
    pub wpwp_fract: f64,
    /// Volumetric moisture at the critical point
    pub wcr_fract: f64,
    pub resid_moist: f64,
    pub quartz: f64,
    /// Mineral bulk density (kg/m3)
    pub bulk_density: f64,
}

const fn row(
    ksat: f64,
    b: f64,
    wpwp_fract: f64,
    wcr_fract: f64,
    resid_moist: f64,
    quartz: f64,
    bulk_density: f64,
) -> SoilHydraulics {
    SoilHydraulics {
        ksat,
        b,
        wpwp_fract,
        wcr_fract,
        resid_moist,
        quartz,
        bulk_density,
    }
}

/// Rows indexed by class code minus one
const TABLE: [SoilHydraulics; 12] = [
    row(38.41, 2.79, 0.033, 0.091, 0.02, 0.92, 1490.0),
    row(10.87, 4.26, 0.055, 0.125, 0.035, 0.82, 1520.0),
    row(5.24, 4.74, 0.095, 0.207, 0.041, 0.60, 1570.0),
    row(3.96, 5.33, 0.133, 0.33, 0.015, 0.25, 1420.0),
    row(8.59, 8.72, 0.208, 0.366, 0.04, 0.10, 1280.0),
    row(1.97, 5.25, 0.117, 0.27, 0.027, 0.40, 1490.0),
    row(2.4, 6.77, 0.148, 0.255, 0.068, 0.60, 1600.0),
    row(4.57, 8.72, 0.208, 0.366, 0.04, 0.10, 1380.0),
    row(1.77, 8.17, 0.197, 0.318, 0.075, 0.35, 1430.0),
    row(1.19, 10.73, 0.239, 0.339, 0.109, 0.52, 1570.0),
    row(2.95, 10.39, 0.250, 0.387, 0.056, 0.10, 1350.0),
    row(3.18, 11.55, 0.272, 0.396, 0.09, 0.25, 1390.0),
];

impl SoilHydraulics {
    /// Table row for a class; unclassified soil uses the loam row
    pub fn for_class(texture: Option<SoilTexture>) -> Self {
        let texture = texture.unwrap_or(SoilTexture::Loam);
        TABLE[(texture.code() - 1) as usize]
    }

    /// All-NaN row for cells without data
    pub fn missing() -> Self {
        row(
            f64::NAN,
            f64::NAN,
            f64::NAN,
            f64::NAN,
            f64::NAN,
            f64::NAN,
            f64::NAN,
        )
    }

    pub fn ksat_mm_per_day(&self) -> f64 {
        self.ksat * KSAT_CM_H_TO_MM_DAY
    }

    /// Exponent n = 3 + 2b of the Campbell conductivity curve
    pub fn expt(&self) -> f64 {
        expt_from_b(self.b)
    }

    /// Bubbling pressure (cm)
    pub fn bubble(&self) -> f64 {
        bubble_from_expt(self.expt())
    }
}

pub fn expt_from_b(b: f64) -> f64 {
    3.0 + 2.0 * b
}

/// Bubbling pressure (cm) from the conductivity exponent, after Cosby et al.
pub fn bubble_from_expt(expt: f64) -> f64 {
    0.32 * expt + 4.3
}

/// A texture class code has been assigned
pub fn is_soil_class(code: i32) -> bool {
    code > 0
}

/// A parameter holds an assigned value
pub fn is_param_value(value: f64) -> bool {
    value > 0.0
}

pub fn porosity(bulk_density: f64, soil_density: f64) -> f64 {
    1.0 - bulk_density / soil_density
}

/// Saturated layer moisture (mm)
pub fn init_moist(porosity: f64, depth_m: f64) -> f64 {
    porosity * depth_m * MM_PER_M
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sand_row() {
        let sand = SoilHydraulics::for_class(Some(SoilTexture::Sand));
        assert_relative_eq!(sand.ksat_mm_per_day(), 38.41 * 240.0);
        assert_relative_eq!(sand.expt(), 8.58);
        assert_relative_eq!(sand.bubble(), 0.32 * 8.58 + 4.3);
        assert_eq!(sand.bulk_density, 1490.0);
    }

    #[test]
    fn unclassified_uses_loam() {
        assert_eq!(
            SoilHydraulics::for_class(None),
            SoilHydraulics::for_class(Some(SoilTexture::Loam))
        );
    }

    #[test]
    fn missing_is_nan() {
        let missing = SoilHydraulics::missing();
        assert!(missing.ksat.is_nan());
        assert!(missing.expt().is_nan());
        assert!(!is_param_value(missing.quartz));
    }

    #[test]
    fn saturated_initial_moisture() {
        let phi = porosity(1490.0, 2685.0);
        assert_relative_eq!(phi, 1.0 - 1490.0 / 2685.0);
        assert_relative_eq!(init_moist(phi, 0.1), phi * 100.0);
        assert!(is_soil_class(12));
        assert!(!is_soil_class(0));
    }
}
