//! Baseflow and infiltration parameters from reference cells
//!
//! An existing VIC ASCII soil parameter file supplies calibrated `infilt`,
//! `Ds`, `Dsmax`, `Ws` and `c`. For every hydroclimate class one reference
//! cell, the first row inside a fixed lat/lon box, donates its values to all
//! cells of that class.

use crate::config::BaseflowValues;
use crate::domain::Domain;
use crate::errors::{Result, VicParamsError};
use crate::hydroclimate::{HydroclimateClass, HydroclimateMasks};
use crate::params::ParameterSet;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Leading columns of a soil parameter row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilParamRow {
    pub run_cell: i32,
    pub gridcell: i64,
    pub lat: f64,
    pub lon: f64,
    pub values: BaseflowValues,
}

/// Rows of a VIC ASCII soil parameter file
#[derive(Debug, Clone, Default)]
pub struct SoilParamFile {
    pub rows: Vec<SoilParamRow>,
}

impl SoilParamFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let parsed = Self::parse(BufReader::new(file))?;
        info!(path = %path.display(), rows = parsed.rows.len(), "read soil parameter file");
        Ok(parsed)
    }

    /// Parse whitespace-separated rows; blank lines and `#` comments are skipped
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            rows.push(parse_row(trimmed, index + 1)?);
        }
        Ok(Self { rows })
    }

    /// First row strictly inside `bbox`
    pub fn find_in_box(&self, bbox: &ReferenceBox) -> Option<&SoilParamRow> {
        self.rows.iter().find(|r| bbox.contains(r.lat, r.lon))
    }
}

fn parse_row(line: &str, line_number: usize) -> Result<SoilParamRow> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 9 {
        return Err(VicParamsError::SoilFileParse {
            line: line_number,
            message: format!("expected at least 9 columns, found {}", fields.len()),
        });
    }

    let number = |column: usize| -> Result<f64> {
        fields[column]
            .parse::<f64>()
            .map_err(|e| VicParamsError::SoilFileParse {
                line: line_number,
                message: format!("column {}: '{}': {}", column + 1, fields[column], e),
            })
    };

    Ok(SoilParamRow {
        run_cell: number(0)? as i32,
        gridcell: number(1)? as i64,
        lat: number(2)?,
        lon: number(3)?,
        values: BaseflowValues {
            infilt: number(4)?,
            ds: number(5)?,
            dsmax: number(6)?,
            ws: number(7)?,
            c: number(8)?,
        },
    })
}

/// Open lat/lon box holding a class's reference cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl ReferenceBox {
    const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat > self.lat_min && lat < self.lat_max && lon > self.lon_min && lon < self.lon_max
    }
}

/// Reference box of each hydroclimate class
pub fn reference_box(class: HydroclimateClass) -> ReferenceBox {
    match class {
        HydroclimateClass::Arid => ReferenceBox::new(38.0, 40.0, 104.0, 107.0),
        HydroclimateClass::TemperateDry => ReferenceBox::new(30.0, 32.0, 114.0, 116.0),
        HydroclimateClass::ColdDryPerma => ReferenceBox::new(55.0, 59.0, 115.0, 118.0),
        HydroclimateClass::ColdDryNoPerma => ReferenceBox::new(59.0, 62.0, 141.0, 144.0),
        HydroclimateClass::ColdWdsWsPerma => ReferenceBox::new(46.0, 49.0, -120.0, -117.0),
        HydroclimateClass::ColdWdsWsNoPerma => ReferenceBox::new(52.0, 54.0, 34.0, 36.0),
        HydroclimateClass::ColdWdsCsPerma => ReferenceBox::new(63.0, 66.0, 159.0, 162.0),
        HydroclimateClass::ColdWdsCsNoPerma => ReferenceBox::new(60.0, 63.0, 22.0, 24.0),
        HydroclimateClass::Polar => ReferenceBox::new(68.0, 71.0, -73.0, -69.0),
    }
}

/// Gridded baseflow parameters
#[derive(Debug, Clone)]
pub struct BaseflowParameters {
    pub infilt: Array2<f64>,
    pub ds: Array2<f64>,
    pub dsmax: Array2<f64>,
    pub ws: Array2<f64>,
    pub c: Array2<f64>,
}

impl BaseflowParameters {
    fn filled(domain: &Domain, values: BaseflowValues) -> Self {
        let grid = |v: f64| domain.nan_mask().mapv(|m| m * v);
        Self {
            infilt: grid(values.infilt),
            ds: grid(values.ds),
            dsmax: grid(values.dsmax),
            ws: grid(values.ws),
            c: grid(values.c),
        }
    }

    fn set(&mut self, j: usize, i: usize, values: &BaseflowValues) {
        self.infilt[[j, i]] = values.infilt;
        self.ds[[j, i]] = values.ds;
        self.dsmax[[j, i]] = values.dsmax;
        self.ws[[j, i]] = values.ws;
        self.c[[j, i]] = values.c;
    }

    pub fn insert_into(self, set: &mut ParameterSet) -> Result<()> {
        set.insert_float("infilt", self.infilt)?;
        set.insert_float("Ds", self.ds)?;
        set.insert_float("Dsmax", self.dsmax)?;
        set.insert_float("Ws", self.ws)?;
        set.insert_float("c", self.c)?;
        Ok(())
    }
}

/// Assign reference-cell values to every classified cell
///
/// Classes are applied in [`HydroclimateClass::ALL`] order so a cell in two
/// classes keeps the later one. Active cells in no class keep `fallback`.
///
/// # Errors
///
/// Returns [`VicParamsError::ReferenceCellNotFound`] when a class has cells
/// but the soil file has no row in its reference box.
pub fn assign_baseflow(
    domain: &Domain,
    masks: &HydroclimateMasks,
    soil_file: &SoilParamFile,
    fallback: BaseflowValues,
) -> Result<BaseflowParameters> {
    let mut params = BaseflowParameters::filled(domain, fallback);
    let mut assigned = Array2::<bool>::from_elem(domain.shape(), false);

    for class in HydroclimateClass::ALL {
        let mask = masks.get(class);
        if !mask.iter().any(|&m| m == 1) {
            continue;
        }
        let reference = soil_file
            .find_in_box(&reference_box(class))
            .ok_or_else(|| VicParamsError::ReferenceCellNotFound {
                class: class.name().to_string(),
            })?;
        info!(
            class = class.name(),
            gridcell = reference.gridcell,
            lat = reference.lat,
            lon = reference.lon,
            "baseflow reference cell"
        );

        for ((j, i), &m) in mask.indexed_iter() {
            if m == 1 && domain.is_active(j, i) {
                params.set(j, i, &reference.values);
                assigned[[j, i]] = true;
            }
        }
    }

    let unassigned = assigned
        .indexed_iter()
        .filter(|&((j, i), &done)| !done && domain.is_active(j, i))
        .count();
    if unassigned > 0 {
        warn!(cells = unassigned, "active cells in no hydroclimate class use fallback baseflow values");
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOIL_FILE: &str = "\
# run gridcell lat lon infilt Ds Dsmax Ws c
1 101 39.5 105.5 0.30 0.002 12.0 0.80 2.0 0.1 0.2
1 102 69.5 -70.0 0.05 0.010 5.0 0.70 2.0

1 103 39.2 106.0 0.99 0.999 99.0 0.99 9.0
";

    #[test]
    fn parses_rows_and_skips_comments() {
        let file = SoilParamFile::parse(SOIL_FILE.as_bytes()).unwrap();
        assert_eq!(file.rows.len(), 3);
        assert_eq!(file.rows[0].gridcell, 101);
        assert_eq!(file.rows[1].values.dsmax, 5.0);
    }

    #[test]
    fn rejects_short_rows() {
        let err = SoilParamFile::parse("1 2 3 4 5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, VicParamsError::SoilFileParse { line: 1, .. }));
        let err = SoilParamFile::parse("1 2 3 4 5 6 7 8 x\n".as_bytes()).unwrap_err();
        assert!(matches!(err, VicParamsError::SoilFileParse { .. }));
    }

    #[test]
    fn first_row_in_box_wins() {
        let file = SoilParamFile::parse(SOIL_FILE.as_bytes()).unwrap();
        let row = file.find_in_box(&reference_box(HydroclimateClass::Arid)).unwrap();
        assert_eq!(row.gridcell, 101);
        // boxes are open
        assert!(!reference_box(HydroclimateClass::Arid).contains(40.0, 105.0));
    }

    #[test]
    fn assigns_reference_and_fallback_values() {
        use crate::hydroclimate::classify_masks;
        use ndarray::array;

        let domain = Domain::from_parts(
            array![[1, 1, 0]],
            array![[0.0, 1.0, 2.0]],
            array![[0.0, 0.0, 0.0]],
        )
        .unwrap();
        let masks = classify_masks(
            &domain,
            &array![[5.0, f64::NAN, 5.0]],
            &array![[0.0, 0.0, 0.0]],
        )
        .unwrap();
        let file = SoilParamFile::parse(SOIL_FILE.as_bytes()).unwrap();
        let fallback = BaseflowValues::default();

        let params = assign_baseflow(&domain, &masks, &file, fallback).unwrap();
        assert_eq!(params.dsmax[[0, 0]], 12.0);
        assert_eq!(params.dsmax[[0, 1]], fallback.dsmax);
        assert!(params.dsmax[[0, 2]].is_nan());

        // a polar cell with no polar row in the file
        let masks = classify_masks(
            &domain,
            &array![[30.0, 5.0, 5.0]],
            &array![[0.0, 0.0, 0.0]],
        )
        .unwrap();
        let arid_only = SoilParamFile {
            rows: vec![file.rows[0]],
        };
        let err = assign_baseflow(&domain, &masks, &arid_only, fallback).unwrap_err();
        assert!(matches!(err, VicParamsError::ReferenceCellNotFound { .. }));
    }

    #[test]
    fn later_class_overwrites_earlier() {
        use crate::hydroclimate::classify_masks;
        use ndarray::array;

        let domain = Domain::from_parts(
            array![[1, 1, 1]],
            array![[0.0, 1.0, 2.0]],
            array![[30.0, 30.0, 30.0]],
        )
        .unwrap();
        // code 8 is both arid and temperate_dry
        let masks = classify_masks(
            &domain,
            &array![[8.0, 5.0, 12.0]],
            &array![[0.0, 0.0, 0.0]],
        )
        .unwrap();
        assert_eq!(masks.get(HydroclimateClass::Arid)[[0, 0]], 1);
        assert_eq!(masks.get(HydroclimateClass::TemperateDry)[[0, 0]], 1);

        let file = SoilParamFile::parse(
            "\
1 201 39.5 105.5 0.30 0.002 12.0 0.80 2.0
1 202 31.0 115.0 0.10 0.020 25.0 0.60 2.0
"
            .as_bytes(),
        )
        .unwrap();

        let params = assign_baseflow(&domain, &masks, &file, BaseflowValues::default()).unwrap();
        assert_eq!(params.dsmax[[0, 0]], 25.0);
        assert_eq!(params.infilt[[0, 0]], 0.10);
        assert_eq!(params.ds[[0, 0]], 0.020);
        assert_eq!(params.dsmax[[0, 1]], 12.0);
        assert_eq!(params.ws[[0, 2]], 0.60);
    }
}
