//! USDA/ARS soil texture classes

use std::fmt;

/// The twelve texture classes, numbered as in the VIC soil texture table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SoilTexture {
    Sand = 1,
    LoamySand = 2,
    SandyLoam = 3,
    SiltLoam = 4,
    Silt = 5,
    Loam = 6,
    SandyClayLoam = 7,
    SiltyClayLoam = 8,
    ClayLoam = 9,
    SandyClay = 10,
    SiltyClay = 11,
    Clay = 12,
}

impl SoilTexture {
    pub const ALL: [SoilTexture; 12] = [
        SoilTexture::Sand,
        SoilTexture::LoamySand,
        SoilTexture::SandyLoam,
        SoilTexture::SiltLoam,
        SoilTexture::Silt,
        SoilTexture::Loam,
        SoilTexture::SandyClayLoam,
        SoilTexture::SiltyClayLoam,
        SoilTexture::ClayLoam,
        SoilTexture::SandyClay,
        SoilTexture::SiltyClay,
        SoilTexture::Clay,
    ];

    /// Class for a numeric code in `1..=12`
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            SoilTexture::Sand => "sand",
            SoilTexture::LoamySand => "loamy sand",
            SoilTexture::SandyLoam => "sandy loam",
            SoilTexture::SiltLoam => "silt loam",
            SoilTexture::Silt => "silt",
            SoilTexture::Loam => "loam",
            SoilTexture::SandyClayLoam => "sandy clay loam",
            SoilTexture::SiltyClayLoam => "silty clay loam",
            SoilTexture::ClayLoam => "clay loam",
            SoilTexture::SandyClay => "sandy clay",
            SoilTexture::SiltyClay => "silty clay",
            SoilTexture::Clay => "clay",
        }
    }
}

impl fmt::Display for SoilTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify sand, clay and silt percentages into a texture class
///
/// Rules are tried in order and the first match wins. A NaN clay fraction is
/// classified as clay. Returns `None` when no rule matches, which happens for
/// fractions that do not add up to a point inside the texture triangle.
pub fn classify(sand: f64, clay: f64, silt: f64) -> Option<SoilTexture> {
    let silt_clay = silt + 1.5 * clay;
    let silt_2clay = silt + 2.0 * clay;

    if silt_clay < 15.0 {
        Some(SoilTexture::Sand)
    } else if silt_clay >= 15.0 && silt_2clay < 30.0 {
        Some(SoilTexture::LoamySand)
    } else if (clay >= 7.0 && clay < 20.0 && sand > 52.0 && silt_2clay >= 30.0)
        || (clay < 7.0 && silt < 50.0 && silt_2clay >= 30.0)
    {
        Some(SoilTexture::SandyLoam)
    } else if clay >= 7.0 && clay < 27.0 && silt >= 28.0 && silt < 50.0 && sand <= 52.0 {
        Some(SoilTexture::Loam)
    } else if (silt >= 50.0 && clay >= 12.0 && clay < 27.0)
        || (silt >= 50.0 && silt < 80.0 && clay < 12.0)
    {
        Some(SoilTexture::SiltLoam)
    } else if silt >= 80.0 && clay < 12.0 {
        Some(SoilTexture::Silt)
    } else if clay >= 20.0 && clay < 35.0 && silt < 28.0 && sand > 45.0 {
        Some(SoilTexture::SandyClayLoam)
    } else if clay >= 27.0 && clay < 40.0 && sand > 20.0 && sand <= 45.0 {
        Some(SoilTexture::ClayLoam)
    } else if clay >= 27.0 && clay < 40.0 && sand <= 20.0 {
        Some(SoilTexture::SiltyClayLoam)
    } else if clay >= 35.0 && sand > 45.0 {
        Some(SoilTexture::SandyClay)
    } else if clay >= 40.0 && silt >= 40.0 {
        Some(SoilTexture::SiltyClay)
    } else if clay >= 40.0 && sand <= 45.0 && silt < 40.0 {
        Some(SoilTexture::Clay)
    } else if clay.is_nan() {
        Some(SoilTexture::Clay)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_triangle_corners() {
        assert_eq!(classify(92.0, 3.0, 5.0), Some(SoilTexture::Sand));
        assert_eq!(classify(82.0, 6.0, 12.0), Some(SoilTexture::LoamySand));
        assert_eq!(classify(65.0, 10.0, 25.0), Some(SoilTexture::SandyLoam));
        assert_eq!(classify(40.0, 20.0, 40.0), Some(SoilTexture::Loam));
        assert_eq!(classify(20.0, 15.0, 65.0), Some(SoilTexture::SiltLoam));
        assert_eq!(classify(5.0, 5.0, 90.0), Some(SoilTexture::Silt));
        assert_eq!(classify(60.0, 25.0, 15.0), Some(SoilTexture::SandyClayLoam));
        assert_eq!(classify(10.0, 33.0, 57.0), Some(SoilTexture::SiltyClayLoam));
        assert_eq!(classify(32.0, 33.0, 35.0), Some(SoilTexture::ClayLoam));
        assert_eq!(classify(50.0, 40.0, 10.0), Some(SoilTexture::SandyClay));
        assert_eq!(classify(5.0, 45.0, 50.0), Some(SoilTexture::SiltyClay));
        assert_eq!(classify(20.0, 60.0, 20.0), Some(SoilTexture::Clay));
    }

    #[test]
    fn class_boundaries() {
        assert_eq!(classify(55.0, 34.0, 11.0), Some(SoilTexture::SandyClayLoam));
        assert_eq!(classify(50.0, 35.0, 15.0), Some(SoilTexture::SandyClay));
        // silt + 1.5 * clay exactly 15 is no longer sand
        assert_eq!(classify(85.0, 2.0, 12.0), Some(SoilTexture::LoamySand));
    }

    #[test]
    fn nan_clay_is_clay() {
        assert_eq!(classify(f64::NAN, f64::NAN, f64::NAN), Some(SoilTexture::Clay));
    }

    #[test]
    fn unmatched_fractions_are_unclassified() {
        // clay 20..27 with low sand and silt matches no rule
        assert_eq!(classify(10.0, 22.0, 20.0), None);
    }

    #[test]
    fn codes_round_trip() {
        for texture in SoilTexture::ALL {
            assert_eq!(SoilTexture::from_code(texture.code()), Some(texture));
        }
        assert_eq!(SoilTexture::from_code(0), None);
        assert_eq!(SoilTexture::from_code(13), None);
    }
}
