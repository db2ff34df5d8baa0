//! Hydroclimate classes from Köppen-Geiger climate and permafrost extent
//!
//! Cells are grouped into nine classes that decide which reference cell the
//! baseflow parameters are taken from. Each class is a mask evaluated on its
//! own, so the Köppen code 8 falls in both the arid and the temperate/dry
//! class.

use crate::domain::Domain;
use crate::errors::{Result, VicParamsError};
use crate::netcdf_io::{read_variable, MaskWriter};
use ndarray::{Array2, Ix2};
use netcdf::open;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HydroclimateClass {
    Arid,
    TemperateDry,
    ColdDryPerma,
    ColdDryNoPerma,
    ColdWdsWsPerma,
    ColdWdsWsNoPerma,
    ColdWdsCsPerma,
    ColdWdsCsNoPerma,
    Polar,
}

impl HydroclimateClass {
    pub const ALL: [HydroclimateClass; 9] = [
        HydroclimateClass::Arid,
        HydroclimateClass::TemperateDry,
        HydroclimateClass::ColdDryPerma,
        HydroclimateClass::ColdDryNoPerma,
        HydroclimateClass::ColdWdsWsPerma,
        HydroclimateClass::ColdWdsWsNoPerma,
        HydroclimateClass::ColdWdsCsPerma,
        HydroclimateClass::ColdWdsCsNoPerma,
        HydroclimateClass::Polar,
    ];

    /// Variable name of the class mask
    pub fn name(self) -> &'static str {
        match self {
            HydroclimateClass::Arid => "arid",
            HydroclimateClass::TemperateDry => "temperate_dry",
            HydroclimateClass::ColdDryPerma => "cold_dry_perma",
            HydroclimateClass::ColdDryNoPerma => "cold_dry_noperma",
            HydroclimateClass::ColdWdsWsPerma => "cold_wds_ws_perma",
            HydroclimateClass::ColdWdsWsNoPerma => "cold_wds_ws_noperma",
            HydroclimateClass::ColdWdsCsPerma => "cold_wds_cs_perma",
            HydroclimateClass::ColdWdsCsNoPerma => "cold_wds_cs_noperma",
            HydroclimateClass::Polar => "polar",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            HydroclimateClass::Arid => "arid",
            HydroclimateClass::TemperateDry => "temperate and dry",
            HydroclimateClass::ColdDryPerma => "cold and dry with permafrost",
            HydroclimateClass::ColdDryNoPerma => "cold and dry no permafrost",
            HydroclimateClass::ColdWdsWsPerma => {
                "Cold/Without Dry Season/Warm Summers with permafrost"
            }
            HydroclimateClass::ColdWdsWsNoPerma => {
                "Cold/Without Dry Season/Warm Summers no permafrost"
            }
            HydroclimateClass::ColdWdsCsPerma => {
                "Cold/Without Dry Season/Cold Summers with permafrost"
            }
            HydroclimateClass::ColdWdsCsNoPerma => {
                "Cold/Without Dry Season/Cold Summers no permafrost"
            }
            HydroclimateClass::Polar => "polar",
        }
    }

    /// Inclusive Köppen-Geiger code range
    pub fn koppen_range(self) -> (f64, f64) {
        match self {
            HydroclimateClass::Arid => (f64::NEG_INFINITY, 8.0),
            HydroclimateClass::TemperateDry => (8.0, 16.0),
            HydroclimateClass::ColdDryPerma | HydroclimateClass::ColdDryNoPerma => (17.0, 24.0),
            HydroclimateClass::ColdWdsWsPerma | HydroclimateClass::ColdWdsWsNoPerma => {
                (25.0, 26.0)
            }
            HydroclimateClass::ColdWdsCsPerma | HydroclimateClass::ColdWdsCsNoPerma => {
                (27.0, 28.0)
            }
            HydroclimateClass::Polar => (29.0, 32.0),
        }
    }

    /// `Some(true)` if the class needs permafrost, `Some(false)` if it excludes it
    pub fn permafrost(self) -> Option<bool> {
        match self {
            HydroclimateClass::ColdDryPerma
            | HydroclimateClass::ColdWdsWsPerma
            | HydroclimateClass::ColdWdsCsPerma => Some(true),
            HydroclimateClass::ColdDryNoPerma
            | HydroclimateClass::ColdWdsWsNoPerma
            | HydroclimateClass::ColdWdsCsNoPerma => Some(false),
            _ => None,
        }
    }

    /// Whether a cell with this Köppen code and permafrost flag belongs to the class
    ///
    /// Only a permafrost value of exactly 1 counts as permafrost.
    pub fn matches(self, koppen: f64, permafrost: f64) -> bool {
        let (low, high) = self.koppen_range();
        if !(koppen >= low && koppen <= high) {
            return false;
        }
        match self.permafrost() {
            Some(true) => permafrost == 1.0,
            Some(false) => permafrost != 1.0,
            None => true,
        }
    }
}

impl fmt::Display for HydroclimateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One 0/1 mask per class on the domain grid
#[derive(Debug, Clone)]
pub struct HydroclimateMasks {
    masks: Vec<Array2<i32>>,
    land: Array2<i32>,
}

impl HydroclimateMasks {
    pub fn get(&self, class: HydroclimateClass) -> &Array2<i32> {
        &self.masks[class as usize]
    }

    pub fn land(&self) -> &Array2<i32> {
        &self.land
    }

    /// Number of cells in each class
    pub fn counts(&self) -> Vec<(HydroclimateClass, usize)> {
        HydroclimateClass::ALL
            .iter()
            .map(|&c| (c, self.get(c).iter().filter(|&&v| v == 1).count()))
            .collect()
    }

    /// Write `mask_land` and every class mask as int32 layers
    pub fn write(&self, path: &Path, domain: &Domain) -> Result<()> {
        let mut writer = MaskWriter::create(path, domain)?;
        writer.add_mask("mask_land", &self.land, "land mask", "gridcells that are land")?;
        for class in HydroclimateClass::ALL {
            let description = format!("{} mask", class.name());
            writer.add_mask(class.name(), self.get(class), &description, class.long_name())?;
        }
        writer.finish("Hydroclimate classes")
    }

    /// Read masks written by [`HydroclimateMasks::write`]
    pub fn read(path: &Path) -> Result<Self> {
        let file = open(path)?;
        let as_mask = |name: &str| -> Result<Array2<i32>> {
            let data = read_variable(&file, path, name)?.into_dimensionality::<Ix2>()?;
            Ok(data.mapv(|v| if v == 1.0 { 1 } else { 0 }))
        };

        let land = as_mask("mask_land")?;
        let masks = HydroclimateClass::ALL
            .iter()
            .map(|c| as_mask(c.name()))
            .collect::<Result<Vec<_>>>()?;

        debug!(path = %path.display(), "read hydroclimate masks");
        Ok(Self { masks, land })
    }
}

/// Classify every active cell from regridded Köppen codes and permafrost extent
pub fn classify_masks(
    domain: &Domain,
    koppen: &Array2<f64>,
    permafrost: &Array2<f64>,
) -> Result<HydroclimateMasks> {
    let shape = domain.shape();
    for (name, array) in [("koppen", koppen), ("permafrost", permafrost)] {
        if array.dim() != shape {
            return Err(VicParamsError::ShapeMismatch {
                var: name.to_string(),
                expected: vec![shape.0, shape.1],
                found: array.shape().to_vec(),
            });
        }
    }

    let masks: Vec<Array2<i32>> = HydroclimateClass::ALL
        .iter()
        .map(|&class| {
            Array2::from_shape_fn(shape, |(j, i)| {
                i32::from(
                    domain.is_active(j, i) && class.matches(koppen[[j, i]], permafrost[[j, i]]),
                )
            })
        })
        .collect();

    let result = HydroclimateMasks {
        masks,
        land: domain.mask.clone(),
    };
    for (class, count) in result.counts() {
        info!(class = class.name(), cells = count, "hydroclimate class");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn koppen_ranges_overlap_at_eight() {
        assert!(HydroclimateClass::Arid.matches(8.0, 0.0));
        assert!(HydroclimateClass::TemperateDry.matches(8.0, 0.0));
        assert!(HydroclimateClass::Arid.matches(1.0, f64::NAN));
        assert!(!HydroclimateClass::Arid.matches(f64::NAN, 0.0));
    }

    #[test]
    fn permafrost_splits_cold_classes() {
        assert!(HydroclimateClass::ColdDryPerma.matches(20.0, 1.0));
        assert!(!HydroclimateClass::ColdDryNoPerma.matches(20.0, 1.0));
        assert!(HydroclimateClass::ColdDryNoPerma.matches(20.0, 2.0));
        assert!(HydroclimateClass::ColdWdsCsNoPerma.matches(28.0, f64::NAN));
        assert!(HydroclimateClass::Polar.matches(30.0, 1.0));
    }

    #[test]
    fn inactive_cells_are_unclassified() {
        let domain = Domain::from_parts(
            array![[1, 0, 1]],
            array![[0.0, 1.0, 2.0]],
            array![[60.0, 60.0, 60.0]],
        )
        .unwrap();
        let koppen = array![[5.0, 5.0, 26.0]];
        let permafrost = array![[0.0, 0.0, 1.0]];
        let masks = classify_masks(&domain, &koppen, &permafrost).unwrap();
        assert_eq!(masks.get(HydroclimateClass::Arid), &array![[1, 0, 0]]);
        assert_eq!(masks.get(HydroclimateClass::ColdWdsWsPerma), &array![[0, 0, 1]]);
        assert_eq!(masks.land(), &array![[1, 0, 1]]);
    }
}
