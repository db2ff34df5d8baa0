//! NetCDF I/O operations
//!
//! Reading gridded inputs into `f64` arrays with fill values turned into NaN,
//! and writing the parameter file and other grid-shaped products with proper
//! metadata.

use crate::domain::Domain;
use crate::errors::{Result, VicParamsError};
use crate::params::{ParamArray, ParameterSet};
use crate::schema::{self, StorageKind, VarSpec};
use chrono::Utc;
use ndarray::{Array2, ArrayD, IxDyn};
use netcdf::{create, open, AttributeValue, File, FileMut, Variable, VariableMut};
use std::{fs, path::Path};
use tracing::{debug, info, warn};

/// NetCDF default fill value for doubles
pub const FILL_F64: f64 = 9.969_209_968_386_869e36;

/// NetCDF default fill value for 32-bit integers
pub const FILL_I32: i32 = -2_147_483_647;

/// Values at or beyond this magnitude are treated as fill
const FILL_THRESHOLD: f64 = 1.0e36;

fn attribute_as_f64(var: &Variable, name: &str) -> Option<f64> {
    var.attribute(name)
        .and_then(|attr| match attr.value().ok()? {
            AttributeValue::Double(v) => Some(v),
            AttributeValue::Float(v) => Some(f64::from(v)),
            AttributeValue::Int(v) => Some(f64::from(v)),
            AttributeValue::Short(v) => Some(f64::from(v)),
            AttributeValue::Schar(v) => Some(f64::from(v)),
            AttributeValue::Uchar(v) => Some(f64::from(v)),
            AttributeValue::Ushort(v) => Some(f64::from(v)),
            AttributeValue::Uint(v) => Some(f64::from(v)),
            _ => None,
        })
}

/// Fill sentinels declared on a variable
fn fill_values(var: &Variable) -> Vec<f64> {
    ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| attribute_as_f64(var, name))
        .collect()
}

/// Read a whole variable as `f64`, converting fill values to NaN
pub fn read_variable(file: &File, path: &Path, name: &str) -> Result<ArrayD<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| VicParamsError::VariableNotFound {
            var: name.to_string(),
            file: path.to_path_buf(),
        })?;
    variable_to_array(&var)
}

/// Like [`read_variable`], `None` when the variable is absent
pub fn read_variable_opt(file: &File, name: &str) -> Result<Option<ArrayD<f64>>> {
    match file.variable(name) {
        Some(var) => Ok(Some(variable_to_array(&var)?)),
        None => Ok(None),
    }
}

fn variable_to_array(var: &Variable) -> Result<ArrayD<f64>> {
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let fills = fill_values(var);

    let mut data: Vec<f64> = var.get_values::<f64, _>(..)?;
    for value in data.iter_mut() {
        if value.abs() >= FILL_THRESHOLD || fills.iter().any(|f| f == value) {
            *value = f64::NAN;
        }
    }

    debug!(var = %var.name(), shape = ?shape, "read variable");
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

/// Open `path` and read `name`, requiring the trailing axes to be `(nj, ni)`
pub fn read_grid(path: &Path, name: &str, grid_shape: (usize, usize)) -> Result<ArrayD<f64>> {
    let file = open(path)?;
    let data = read_variable(&file, path, name)?;
    check_trailing(name, data.shape(), grid_shape)?;
    Ok(data)
}

/// Require the trailing axes of `shape` to be `(nj, ni)`
pub fn check_trailing(name: &str, shape: &[usize], grid_shape: (usize, usize)) -> Result<()> {
    let nd = shape.len();
    if nd < 2 || shape[nd - 2] != grid_shape.0 || shape[nd - 1] != grid_shape.1 {
        let mut expected = shape.to_vec();
        if nd >= 2 {
            expected[nd - 2] = grid_shape.0;
            expected[nd - 1] = grid_shape.1;
        } else {
            expected = vec![grid_shape.0, grid_shape.1];
        }
        return Err(VicParamsError::ShapeMismatch {
            var: name.to_string(),
            expected,
            found: shape.to_vec(),
        });
    }
    Ok(())
}

/// Copy all attributes except `_FillValue` from one variable to another
pub fn copy_attributes(source: &Variable, target: &mut VariableMut) -> Result<()> {
    for attr in source.attributes().filter(|a| a.name() != "_FillValue") {
        match attr.value()? {
            AttributeValue::Str(val) => {
                target.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Strs(vals) => {
                target.put_attribute(attr.name(), vals)?;
            }
            AttributeValue::Float(val) => {
                target.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Floats(vals) => {
                target.put_attribute(attr.name(), vals)?;
            }
            AttributeValue::Double(val) => {
                target.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Doubles(vals) => {
                target.put_attribute(attr.name(), vals)?;
            }
            AttributeValue::Int(val) => {
                target.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Ints(vals) => {
                target.put_attribute(attr.name(), vals)?;
            }
            AttributeValue::Short(val) => {
                target.put_attribute(attr.name(), val)?;
            }
            AttributeValue::Shorts(vals) => {
                target.put_attribute(attr.name(), vals)?;
            }
            _ => {
                warn!(attribute = %attr.name(), "skipped unsupported attribute type");
            }
        }
    }
    Ok(())
}

/// Create a fresh file holding the `nj`/`ni` dimensions and `xc`/`yc` of the domain
pub fn create_grid_file(path: &Path, domain: &Domain) -> Result<FileMut> {
    if path.exists() {
        fs::remove_file(path)?;
    }

    let mut file = create(path)?;
    let (nj, ni) = domain.shape();
    file.add_dimension("nj", nj)?;
    file.add_dimension("ni", ni)?;

    for (name, data, units, long_name) in [
        ("xc", &domain.xc, "degrees_east", "longitude of grid cell center"),
        ("yc", &domain.yc, "degrees_north", "latitude of grid cell center"),
    ] {
        let mut var = file.add_variable::<f64>(name, &["nj", "ni"])?;
        var.put_attribute("units", units)?;
        var.put_attribute("long_name", long_name)?;
        var.put_values(&to_vec_filled(data.iter().copied()), ..)?;
    }

    Ok(file)
}

/// Writes integer mask layers on the domain grid
pub struct MaskWriter {
    file: FileMut,
    path: std::path::PathBuf,
    count: usize,
}

impl MaskWriter {
    pub fn create(path: &Path, domain: &Domain) -> Result<Self> {
        Ok(Self {
            file: create_grid_file(path, domain)?,
            path: path.to_path_buf(),
            count: 0,
        })
    }

    /// Add one `(nj, ni)` layer with fill value and descriptive attributes
    pub fn add_mask(
        &mut self,
        name: &str,
        data: &Array2<i32>,
        description: &str,
        long_name: &str,
    ) -> Result<()> {
        let mut var = self.file.add_variable::<i32>(name, &["nj", "ni"])?;
        var.put_attribute("_FillValue", FILL_I32)?;
        var.put_attribute("description", description)?;
        var.put_attribute("units", "N/A")?;
        var.put_attribute("long_name", long_name)?;
        var.put_attribute("coordinates", "xc yc")?;
        let values: Vec<i32> = data.iter().copied().collect();
        var.put_values(&values, ..)?;
        self.count += 1;
        Ok(())
    }

    pub fn finish(mut self, title: &str) -> Result<()> {
        self.file.add_attribute("title", title)?;
        self.file.add_attribute(
            "history",
            format!("Created by vic_params on {}", Utc::now().to_rfc3339()),
        )?;
        info!(path = %self.path.display(), layers = self.count, "wrote mask file");
        Ok(())
    }
}

fn to_vec_filled(values: impl Iterator<Item = f64>) -> Vec<f64> {
    values
        .map(|v| if v.is_nan() { FILL_F64 } else { v })
        .collect()
}

/// Writes a [`ParameterSet`] as a parameter file
pub struct ParameterWriter<'a> {
    output_path: &'a Path,
    title: String,
}

impl<'a> ParameterWriter<'a> {
    /// Create a new parameter writer
    pub fn new(output_path: &'a Path) -> Self {
        Self {
            output_path,
            title: "VIC parameters".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Write all parameters together with the domain geometry
    pub fn write(&self, domain: &Domain, params: &ParameterSet) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;
        let grid_shape = domain.shape();

        for &name in schema::DIMENSIONS {
            let len = schema::dimension_len(name, grid_shape).ok_or_else(|| {
                VicParamsError::Generic(format!("unknown dimension '{}'", name))
            })?;
            file.add_dimension(name, len)?;
        }

        for (name, array) in params.iter() {
            let spec = schema::find(name).ok_or_else(|| {
                VicParamsError::Generic(format!("'{}' is not a parameter file variable", name))
            })?;
            let expected = schema::expected_shape(spec, grid_shape);
            if array.shape() != expected.as_slice() {
                return Err(VicParamsError::ShapeMismatch {
                    var: name.to_string(),
                    expected,
                    found: array.shape().to_vec(),
                });
            }

            match (array, spec.kind) {
                (ParamArray::Float(data), StorageKind::Float) => {
                    let mut var = file.add_variable::<f64>(spec.name, spec.dims)?;
                    if spec.has_fill {
                        var.put_attribute("_FillValue", FILL_F64)?;
                    }
                    put_spec_attributes(&mut var, spec)?;
                    var.put_values(&to_vec_filled(data.iter().copied()), ..)?;
                }
                (ParamArray::Int(data), StorageKind::Int) => {
                    let mut var = file.add_variable::<i32>(spec.name, spec.dims)?;
                    if spec.has_fill {
                        var.put_attribute("_FillValue", FILL_I32)?;
                    }
                    put_spec_attributes(&mut var, spec)?;
                    let values: Vec<i32> = data.iter().copied().collect();
                    var.put_values(&values, ..)?;
                }
                _ => {
                    return Err(VicParamsError::Generic(format!(
                        "'{}' must be stored as {:?}",
                        name, spec.kind
                    )))
                }
            }
            debug!(var = name, "wrote parameter");
        }

        file.add_attribute("title", self.title.as_str())?;
        file.add_attribute(
            "source",
            format!("derived from domain {}", domain.path.display()),
        )?;
        file.add_attribute(
            "history",
            format!("Created by vic_params on {}", Utc::now().to_rfc3339()),
        )?;

        info!(
            path = %self.output_path.display(),
            variables = params.len(),
            "wrote parameter file"
        );
        Ok(())
    }
}

fn put_spec_attributes(var: &mut VariableMut, spec: &VarSpec) -> Result<()> {
    if !spec.description.is_empty() {
        var.put_attribute("description", spec.description)?;
    }
    if !spec.units.is_empty() {
        var.put_attribute("units", spec.units)?;
    }
    var.put_attribute("long_name", spec.long_name)?;
    if spec.on_grid() && spec.name != "xc" && spec.name != "yc" {
        var.put_attribute("coordinates", "xc yc")?;
    }
    Ok(())
}
