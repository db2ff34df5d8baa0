//! Layout of the parameter file
//!
//! Every variable the parameter file may contain, with its dimensions,
//! attributes and storage type. The writer and the validator both work from
//! this table.

/// Number of vegetation tiles, one per plant functional type
pub const N_VEG_CLASS: usize = 17;
pub const N_MONTH: usize = 12;
pub const N_LAYER: usize = 3;
pub const N_ROOT_ZONE: usize = 2;
pub const N_VERTEX: usize = 4;

/// Dimensions of the parameter file, in definition order
pub const DIMENSIONS: &[&str] = &["veg_class", "month", "nlayer", "root_zone", "nv4", "nj", "ni"];

/// Length of a parameter file dimension on a grid of `(nj, ni)`
pub fn dimension_len(name: &str, grid_shape: (usize, usize)) -> Option<usize> {
    match name {
        "veg_class" => Some(N_VEG_CLASS),
        "month" => Some(N_MONTH),
        "nlayer" => Some(N_LAYER),
        "root_zone" => Some(N_ROOT_ZONE),
        "nv4" => Some(N_VERTEX),
        "nj" => Some(grid_shape.0),
        "ni" => Some(grid_shape.1),
        _ => None,
    }
}

/// On-disk type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Float,
    Int,
}

/// One variable of the parameter file
#[derive(Debug, Clone, Copy)]
pub struct VarSpec {
    pub name: &'static str,
    pub dims: &'static [&'static str],
    pub units: &'static str,
    pub description: &'static str,
    pub long_name: &'static str,
    pub kind: StorageKind,
    /// Whether a `_FillValue` attribute is written
    pub has_fill: bool,
    /// Whether a complete parameter file must contain it
    pub required: bool,
}

impl VarSpec {
    /// Whether the trailing dimensions are `(nj, ni)`
    pub fn on_grid(&self) -> bool {
        self.dims.ends_with(&["nj", "ni"])
    }
}

/// Expected array shape of `spec` on a grid of `(nj, ni)`
pub fn expected_shape(spec: &VarSpec, grid_shape: (usize, usize)) -> Vec<usize> {
    spec.dims
        .iter()
        .filter_map(|d| dimension_len(d, grid_shape))
        .collect()
}

const GRID: &[&str] = &["nj", "ni"];
const VEG: &[&str] = &["veg_class", "nj", "ni"];
const VEG_MONTH: &[&str] = &["veg_class", "month", "nj", "ni"];
const VEG_ROOT: &[&str] = &["veg_class", "root_zone", "nj", "ni"];
const LAYER: &[&str] = &["nlayer", "nj", "ni"];
const VERTEX: &[&str] = &["nv4", "nj", "ni"];

const fn float(
    name: &'static str,
    dims: &'static [&'static str],
    units: &'static str,
    description: &'static str,
) -> VarSpec {
    VarSpec {
        name,
        dims,
        units,
        description,
        long_name: name,
        kind: StorageKind::Float,
        has_fill: true,
        required: true,
    }
}

const fn int(
    name: &'static str,
    dims: &'static [&'static str],
    units: &'static str,
    description: &'static str,
) -> VarSpec {
    VarSpec {
        name,
        dims,
        units,
        description,
        long_name: name,
        kind: StorageKind::Int,
        has_fill: true,
        required: true,
    }
}

const fn optional(spec: VarSpec) -> VarSpec {
    VarSpec {
        required: false,
        ..spec
    }
}

const fn no_fill(spec: VarSpec) -> VarSpec {
    VarSpec {
        has_fill: false,
        ..spec
    }
}

const fn named(spec: VarSpec, long_name: &'static str) -> VarSpec {
    VarSpec { long_name, ..spec }
}

/// Every variable the parameter file can hold
pub const VARIABLES: &[VarSpec] = &[
    // index variables
    named(no_fill(int("veg_class", &["veg_class"], "N/A", "")), "vegetation class"),
    named(no_fill(int("month", &["month"], "N/A", "")), "month of year"),
    named(no_fill(int("nlayer", &["nlayer"], "N/A", "")), "soil layer"),
    named(no_fill(int("root_zone", &["root_zone"], "N/A", "")), "root zone"),
    // geometry
    named(
        no_fill(float("xc", GRID, "degrees_east", "")),
        "longitude of gridcell center",
    ),
    named(
        no_fill(float("yc", GRID, "degrees_north", "")),
        "latitude of gridcell center",
    ),
    optional(named(
        no_fill(float("xv", VERTEX, "degrees_east", "")),
        "longitude of grid cell vertices",
    )),
    optional(named(
        no_fill(float("yv", VERTEX, "degrees_north", "")),
        "latitude of grid cell vertices",
    )),
    float("lats", GRID, "degrees", "Latitude of grid cell"),
    float("lons", GRID, "degrees", "Longitude of grid cell"),
    int("mask", GRID, "N/A", "0 value indicates cell is not active"),
    int("run_cell", GRID, "N/A", ""),
    int("gridcell", GRID, "N/A", "Grid cell number"),
    // vegetation
    float("Cv", VEG, "fraction", "Fraction of grid cell covered by vegetation tile"),
    int("Nveg", GRID, "N/A", "Number of vegetation tiles in the grid cell"),
    float(
        "trunk_ratio",
        VEG,
        "fraction",
        "Ratio of total tree height that is trunk (no branches)",
    ),
    float("rarc", VEG, "s/m", "Architectural resistance of vegetation type (~2 s/m)"),
    float("rmin", VEG, "s/m", "Minimum stomatal resistance of vegetation type (~100 s/m)"),
    float("wind_h", VEG, "m", "Height at which wind speed is measured"),
    float(
        "RGL",
        VEG,
        "W/m^2",
        "Minimum incoming shortwave radiation at which there will be transpiration",
    ),
    float("rad_atten", VEG, "fraction", "Radiation attenuation factor"),
    float("wind_atten", VEG, "fraction", "Wind speed attenuation through the overstory"),
    optional(float(
        "max_snow_albedo",
        VEG,
        "fraction",
        "Maximum snow albedo from Barlage et al 2005",
    )),
    float("albedo", VEG_MONTH, "fraction", "Shortwave albedo for vegetation type"),
    float("LAI", VEG_MONTH, "N/A", "Leaf Area Index, one per month"),
    int(
        "overstory",
        VEG,
        "N/A",
        "Flag to indicate whether or not the current vegetation type has an overstory",
    ),
    float(
        "displacement",
        VEG_MONTH,
        "m",
        "Vegetation displacement height (typically 0.67 * vegetation height)",
    ),
    float(
        "veg_rough",
        VEG_MONTH,
        "m",
        "Vegetation roughness length (typically 0.123 * vegetation height)",
    ),
    float(
        "root_depth",
        VEG_ROOT,
        "m",
        "Root zone thickness (sum of depths is total depth of root penetration)",
    ),
    float("root_fract", VEG_ROOT, "fraction", "Fraction of root in the current root zone"),
    // climate and terrain
    float("elev", GRID, "m", "Average elevation of grid cell"),
    float(
        "avg_T",
        GRID,
        "C",
        "Average soil temperature, used as the bottom boundary for soil heat flux solutions",
    ),
    float("annual_prec", GRID, "mm", "Average annual precipitation"),
    float("off_gmt", GRID, "hours", "Time zone offset from GMT"),
    // soil surface
    float("rough", GRID, "m", "Surface roughness of bare soil"),
    float("snow_rough", GRID, "m", "Surface roughness of snowpack"),
    float(
        "dp",
        GRID,
        "m",
        "Soil thermal damping depth (depth at which soil temperature remains constant through the year, ~4 m)",
    ),
    int(
        "fs_active",
        GRID,
        "binary",
        "If set to 1, then frozen soil algorithm is activated for the grid cell",
    ),
    // baseflow
    float(
        "infilt",
        GRID,
        "mm/day",
        "Variable infiltration curve parameter (binfilt)",
    ),
    float("Ds", GRID, "fraction", "Fraction of Dsmax where non-linear baseflow begins"),
    float("Dsmax", GRID, "mm/day", "Maximum velocity of baseflow"),
    float(
        "Ws",
        GRID,
        "fraction",
        "Fraction of maximum soil moisture where non-linear baseflow occurs",
    ),
    float("c", GRID, "N/A", "Exponent used in baseflow curve, normally set to 2"),
    // soil layers
    float("depth", LAYER, "m", "Thickness of each soil moisture layer"),
    float("Ksat", LAYER, "mm/day", "Saturated hydraulic conductivity"),
    float(
        "expt",
        LAYER,
        "N/A",
        "Exponent n (=3+2/lambda) in Campbell's eqt for Ksat, where lambda = soil pore size distribution parameter",
    ),
    float("bubble", LAYER, "cm", "Bubbling pressure of soil. Values should be > 0"),
    float("resid_moist", LAYER, "fraction", "Soil moisture layer residual moisture"),
    float("quartz", LAYER, "fraction", "Quartz content of soil"),
    float("bulk_density", LAYER, "kg/m3", "Mineral bulk density of soil layer"),
    optional(named(
        float("bulk_density_comb", LAYER, "kg/m3", "Soil bulk density of soil layer"),
        "bulk_density",
    )),
    optional(named(
        float("organic", LAYER, "fraction", "Soil organic carbon fraction"),
        "organic_fract",
    )),
    float(
        "soil_density",
        LAYER,
        "kg/m3",
        "Soil particle density, normally 2685 kg/m3",
    ),
    optional(named(
        float(
            "soil_density_org",
            LAYER,
            "kg/m3",
            "Organic matter particle density, normally 1300 kg/m3",
        ),
        "soil_dens_org",
    )),
    float(
        "Wpwp_FRACT",
        LAYER,
        "fraction",
        "Fractional soil moisture content at the wilting point (fraction of maximum moisture)",
    ),
    float(
        "Wcr_FRACT",
        LAYER,
        "fraction",
        "Fractional soil moisture content at the critical point (~70% of field capacity) (fraction of maximum moisture)",
    ),
    float("init_moist", LAYER, "mm", "Initial layer moisture content"),
    float("phi_s", LAYER, "mm/mm", "Soil moisture diffusion parameter"),
];

/// Look up a variable by name
pub fn find(name: &str) -> Option<&'static VarSpec> {
    VARIABLES.iter().find(|v| v.name == name)
}

/// Variables every complete parameter file contains
pub fn required() -> impl Iterator<Item = &'static VarSpec> {
    VARIABLES.iter().filter(|v| v.required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = VARIABLES.iter().map(|v| v.name).collect();
        assert_eq!(names.len(), VARIABLES.len());
    }

    #[test]
    fn every_dimension_is_declared() {
        for spec in VARIABLES {
            for dim in spec.dims {
                assert!(DIMENSIONS.contains(dim), "{} uses {}", spec.name, dim);
            }
        }
    }

    #[test]
    fn shapes_follow_dimensions() {
        let lai = find("LAI").unwrap();
        assert_eq!(expected_shape(lai, (5, 7)), vec![17, 12, 5, 7]);
        assert!(lai.on_grid());
        assert!(!find("veg_class").unwrap().on_grid());
        assert!(!find("organic").unwrap().required);
        assert_eq!(find("Nveg").unwrap().kind, StorageKind::Int);
    }
}
