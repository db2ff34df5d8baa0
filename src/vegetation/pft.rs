//! CLM plant functional types and their NLDAS vegetation classes

use crate::errors::{Result, VicParamsError};
use std::fmt;

/// Number of CLM plant functional types
pub const N_PFT: usize = 17;

const PFT_NAMES: [&str; N_PFT] = [
    "bare ground",
    "needleleaf evergreen temperate tree",
    "needleleaf evergreen boreal tree",
    "needleleaf deciduous boreal tree",
    "broadleaf evergreen tropical tree",
    "broadleaf evergreen temperate tree",
    "broadleaf deciduous tropical tree",
    "broadleaf deciduous temperate tree",
    "broadleaf deciduous boreal tree",
    "broadleaf evergreen temperate shrub",
    "broadleaf deciduous temperate shrub",
    "broadleaf deciduous boreal shrub",
    "c3 arctic grass",
    "c3 non-arctic grass",
    "c4 grass",
    "crop",
    "second crop",
];

/// A CLM plant functional type, `0..=16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pft(u8);

impl Pft {
    pub const BARE: Pft = Pft(0);

    pub fn new(id: i64) -> Result<Self> {
        if (0..N_PFT as i64).contains(&id) {
            Ok(Pft(id as u8))
        } else {
            Err(VicParamsError::InvalidPft(id))
        }
    }

    /// All types in index order
    pub fn all() -> impl Iterator<Item = Pft> {
        (0..N_PFT as u8).map(Pft)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn name(self) -> &'static str {
        PFT_NAMES[self.index()]
    }

    pub fn nldas(self) -> NldasClass {
        let class = match self.0 {
            0 => 11,
            1 | 2 => 0,
            3 => 1,
            4 | 5 => 2,
            6..=8 => 3,
            9..=11 => 8,
            12..=14 => 9,
            15 => 10,
            // second crop shares the broadleaf evergreen class
            _ => 2,
        };
        NldasClass(class)
    }
}

impl fmt::Display for Pft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// NLDAS vegetation library class, `0..=11`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NldasClass(u8);

impl NldasClass {
    pub const BARE: NldasClass = NldasClass(11);

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Forest and woodland classes have an overstory
    pub fn is_overstory(self) -> bool {
        self.0 <= 5
    }
}

/// NLDAS class for a raw PFT id
pub fn map_pft_to_nldas(pft: i64) -> Result<NldasClass> {
    Ok(Pft::new(pft)?.nldas())
}

pub fn is_overstory(nldas: NldasClass) -> bool {
    nldas.is_overstory()
}

/// Tile fraction from a cover percentage
pub fn cv_from_percent(percent: f64) -> f64 {
    percent / 100.0
}

/// Number of vegetated tiles from the 17 PFT percentages of one cell
///
/// Bare ground is not counted, so a purely bare cell has no tiles.
pub fn count_active_pfts(percents: &[f64]) -> usize {
    percents
        .iter()
        .skip(1)
        .filter(|&&p| p != 0.0 && !p.is_nan())
        .count()
}

/// Fraction of roots in `zone` (0 upper, 1 lower)
///
/// Uncovered tiles get no roots and NaN cover stays NaN.
pub fn root_fract(cv: f64, pft: Pft, zone: usize) -> f64 {
    if cv.is_nan() {
        return cv;
    }
    if cv <= 0.0 {
        return 0.0;
    }
    let (upper, lower) = match pft.nldas().0 {
        0..=5 => (0.3, 0.7),
        6 | 7 => (0.6, 0.4),
        8..=10 => (0.7, 0.3),
        _ => (0.0, 0.0),
    };
    if zone == 0 {
        upper
    } else {
        lower
    }
}

/// Root zone thickness (m) in `zone` (0 upper, 1 lower)
pub fn root_depth(cv: f64, zone: usize) -> f64 {
    if cv > 0.0 {
        if zone == 0 {
            0.3
        } else {
            0.7
        }
    } else {
        0.0
    }
}

/// Displacement height (m) from canopy height
pub fn displacement(height: f64) -> f64 {
    0.67 * height
}

/// Roughness length (m) from canopy height
pub fn roughness(height: f64) -> f64 {
    0.123 * height
}
