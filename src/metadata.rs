//! NetCDF metadata inspection and parameter file validation
//!
//! Functions for examining the structure of input and output files, listing
//! variables and dimensions, describing single variables, and checking a
//! written parameter file against the expected layout.

use crate::errors::{Result, VicParamsError};
use crate::netcdf_io::read_variable;
use crate::schema::{self, StorageKind};
use crate::statistics::{summarize, Summary};
use netcdf::{AttributeValue, File, Variable};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Structured metadata for a NetCDF variable
#[derive(Debug, Clone)]
pub struct VariableMetadata {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<DimensionInfo>,
    pub attributes: HashMap<String, AttributeValue>,
    pub total_elements: usize,
    pub estimated_size_bytes: usize,
}

/// Information about a dimension
#[derive(Debug, Clone)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

fn find_variable<'f>(file: &'f File, path: &Path, var_name: &str) -> Result<Variable<'f>> {
    file.variable(var_name)
        .ok_or_else(|| VicParamsError::VariableNotFound {
            var: var_name.to_string(),
            file: path.to_path_buf(),
        })
}

fn data_type(var: &Variable) -> String {
    format!("{:?}", var.vartype()).to_lowercase()
}

/// Storage kind from the lowercased debug name of a NetCDF type
fn storage_kind(data_type: &str) -> Option<StorageKind> {
    if data_type.contains("float") || data_type.contains("double") {
        Some(StorageKind::Float)
    } else if data_type.contains("int") {
        Some(StorageKind::Int)
    } else {
        None
    }
}

fn element_size(data_type: &str) -> usize {
    if data_type.contains("double") || data_type.contains("64") {
        8
    } else if data_type.contains("short") || data_type.contains("16") {
        2
    } else if data_type.contains("char") || data_type.contains("8") {
        1
    } else {
        4
    }
}

fn format_attribute(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => format!("\"{}\"", s),
        AttributeValue::Double(d) => d.to_string(),
        AttributeValue::Float(f) => f.to_string(),
        AttributeValue::Int(i) => i.to_string(),
        AttributeValue::Short(s) => s.to_string(),
        other => format!("{:?}", other),
    }
}

fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KB {
        format!("{} bytes", bytes)
    } else if bytes_f < KB * KB {
        format!("{:.2} KB", bytes_f / KB)
    } else if bytes_f < KB * KB * KB {
        format!("{:.2} MB", bytes_f / (KB * KB))
    } else {
        format!("{:.2} GB", bytes_f / (KB * KB * KB))
    }
}

/// Prints global attributes and variables of a NetCDF file
pub fn print_metadata(file: &File) -> Result<()> {
    println!("\n===== Global Attributes =====");
    for attr in file.attributes() {
        println!("- {}: {}", attr.name(), format_attribute(&attr.value()?));
    }

    println!("\n===== Variables =====");
    for var in file.variables() {
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| format!("{}[{}]", d.name(), d.len()))
            .collect();
        println!("- {} ({})", var.name(), dims.join(", "));
    }

    Ok(())
}

/// Computes min/mean/max/std over the valid values of a variable
///
/// Fill values are excluded and counted separately.
pub fn compute_variable_summary(file: &File, path: &Path, var_name: &str) -> Result<Summary> {
    let data = read_variable(file, path, var_name)?;
    Ok(summarize(data.iter()))
}

/// Lists all variables and dimensions, sorted by name
pub fn list_variables_and_dimensions(file: &File) -> Result<()> {
    println!("\nDimensions");
    println!("==========");

    let mut dimensions: Vec<_> = file.dimensions().collect();
    dimensions.sort_by_key(|d| d.name());

    if dimensions.is_empty() {
        println!("   (no dimensions)");
    }
    for dim in dimensions {
        let unlimited = if dim.is_unlimited() { " (unlimited)" } else { "" };
        println!("    {} = {}{}", dim.name(), dim.len(), unlimited);
    }

    println!("\nVariables");
    println!("=========");

    let mut variables: Vec<_> = file.variables().collect();
    variables.sort_by_key(|v| v.name());

    if variables.is_empty() {
        println!("   (no variables)");
    }
    for var in variables {
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<String> = var.dimensions().iter().map(|d| d.len().to_string()).collect();

        if dims.is_empty() {
            println!("    {} ({}): scalar", var.name(), data_type(&var));
        } else {
            println!(
                "    {} ({}): [{}] = ({})",
                var.name(),
                data_type(&var),
                dims.join(", "),
                shape.join(" x ")
            );
        }

        let key_attrs: Vec<String> = ["units", "long_name", "_FillValue"]
            .iter()
            .filter_map(|&name| {
                let value = var.attribute(name)?.value().ok()?;
                Some(format!("{}: {}", name, format_attribute(&value)))
            })
            .collect();
        if !key_attrs.is_empty() {
            println!("      {}", key_attrs.join(", "));
        }
    }

    Ok(())
}

/// Describes a variable: data type, shape, attributes and storage size
pub fn describe_variable(file: &File, path: &Path, var_name: &str) -> Result<()> {
    let metadata = get_variable_metadata(file, path, var_name)?;

    println!("\nVariable: {}", metadata.name);
    println!("{}", "=".repeat(metadata.name.len() + 10));
    println!(" Data type: {}", metadata.data_type);

    if metadata.dimensions.is_empty() {
        println!(" Dimensions: (scalar)");
    } else {
        for dim in &metadata.dimensions {
            let unlimited = if dim.is_unlimited { " (unlimited)" } else { "" };
            println!("    {} = {}{}", dim.name, dim.length, unlimited);
        }
    }

    if metadata.attributes.is_empty() {
        println!("\n Attributes: (none)");
    } else {
        println!("\n Attributes:");
        let mut names: Vec<_> = metadata.attributes.keys().collect();
        names.sort();
        for name in names {
            println!("   - {}: {}", name, format_attribute(&metadata.attributes[name]));
        }
    }

    if let Some(spec) = schema::find(var_name) {
        println!("\n Parameter file variable ({:?}, required: {})", spec.kind, spec.required);
        if !spec.description.is_empty() {
            println!("   {}", spec.description);
        }
    }

    println!("\n Storage:");
    println!("    Total elements: {}", metadata.total_elements);
    println!("    Total size: {}", format_size(metadata.estimated_size_bytes));

    Ok(())
}

/// Get structured metadata for a variable
pub fn get_variable_metadata(file: &File, path: &Path, var_name: &str) -> Result<VariableMetadata> {
    let var = find_variable(file, path, var_name)?;
    let data_type = data_type(&var);

    let dimensions: Vec<DimensionInfo> = var
        .dimensions()
        .iter()
        .map(|d| DimensionInfo {
            name: d.name(),
            length: d.len(),
            is_unlimited: d.is_unlimited(),
        })
        .collect();

    let attributes: HashMap<String, AttributeValue> = var
        .attributes()
        .filter_map(|attr| Some((attr.name().to_string(), attr.value().ok()?)))
        .collect();

    let total_elements: usize = dimensions.iter().map(|d| d.length).product();
    let estimated_size_bytes = total_elements * element_size(&data_type);

    Ok(VariableMetadata {
        name: var_name.to_string(),
        data_type,
        dimensions,
        attributes,
        total_elements,
        estimated_size_bytes,
    })
}

/// One problem found in a parameter file
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    MissingVariable(String),
    MissingDimension(String),
    DimensionLength {
        name: String,
        expected: usize,
        found: usize,
    },
    Dimensions {
        var: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    StorageType {
        var: String,
        expected: StorageKind,
        found: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingVariable(name) => write!(f, "missing variable '{}'", name),
            ValidationIssue::MissingDimension(name) => write!(f, "missing dimension '{}'", name),
            ValidationIssue::DimensionLength {
                name,
                expected,
                found,
            } => write!(f, "dimension '{}' has length {}, expected {}", name, found, expected),
            ValidationIssue::Dimensions {
                var,
                expected,
                found,
            } => write!(
                f,
                "'{}' has dimensions ({}), expected ({})",
                var,
                found.join(", "),
                expected.join(", ")
            ),
            ValidationIssue::StorageType {
                var,
                expected,
                found,
            } => write!(f, "'{}' is stored as {}, expected {:?}", var, found, expected),
        }
    }
}

/// Outcome of [`validate_parameter_file`]
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub grid_shape: (usize, usize),
    /// Known parameter variables found in the file
    pub checked: usize,
    /// Variables not part of the parameter file layout
    pub unknown: Vec<String>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "grid {} x {}, {} parameter variables checked",
            self.grid_shape.0, self.grid_shape.1, self.checked
        )?;
        if !self.unknown.is_empty() {
            writeln!(f, "extra variables: {}", self.unknown.join(", "))?;
        }
        if self.is_valid() {
            write!(f, "no problems found")
        } else {
            for issue in &self.issues {
                writeln!(f, "  - {}", issue)?;
            }
            write!(f, "{} problem(s) found", self.issues.len())
        }
    }
}

/// Check a parameter file against the expected dimensions and variables
///
/// The grid size is taken from the file's own `nj`/`ni` dimensions.
pub fn validate_parameter_file(file: &File) -> Result<ValidationReport> {
    let dim_len = |name: &str| file.dimension(name).map(|d| d.len());
    let (Some(nj), Some(ni)) = (dim_len("nj"), dim_len("ni")) else {
        return Err(VicParamsError::Generic(
            "parameter file has no nj/ni grid dimensions".to_string(),
        ));
    };
    let grid_shape = (nj, ni);
    let mut report = ValidationReport {
        grid_shape,
        ..Default::default()
    };

    for &name in schema::DIMENSIONS {
        let expected = schema::dimension_len(name, grid_shape).unwrap_or(0);
        match dim_len(name) {
            None => report.issues.push(ValidationIssue::MissingDimension(name.to_string())),
            Some(found) if found != expected => report.issues.push(ValidationIssue::DimensionLength {
                name: name.to_string(),
                expected,
                found,
            }),
            Some(_) => {}
        }
    }

    for spec in schema::required() {
        if file.variable(spec.name).is_none() {
            report
                .issues
                .push(ValidationIssue::MissingVariable(spec.name.to_string()));
        }
    }

    for var in file.variables() {
        let name = var.name();
        let Some(spec) = schema::find(&name) else {
            report.unknown.push(name);
            continue;
        };
        report.checked += 1;

        let found: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        if found.iter().map(String::as_str).ne(spec.dims.iter().copied()) {
            report.issues.push(ValidationIssue::Dimensions {
                var: name.clone(),
                expected: spec.dims.iter().map(|d| d.to_string()).collect(),
                found,
            });
        }

        let data_type = data_type(&var);
        if storage_kind(&data_type) != Some(spec.kind) {
            report.issues.push(ValidationIssue::StorageType {
                var: name,
                expected: spec.kind,
                found: data_type,
            });
        }
    }

    report.unknown.sort();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kind_from_type_names() {
        assert_eq!(storage_kind("float(f64)"), Some(StorageKind::Float));
        assert_eq!(storage_kind("double"), Some(StorageKind::Float));
        assert_eq!(storage_kind("int(i32)"), Some(StorageKind::Int));
        assert_eq!(storage_kind("string"), None);
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(element_size("float(f64)"), 8);
        assert_eq!(element_size("int(i32)"), 4);
    }

    #[test]
    fn issue_messages() {
        let issue = ValidationIssue::DimensionLength {
            name: "veg_class".to_string(),
            expected: 17,
            found: 16,
        };
        assert_eq!(issue.to_string(), "dimension 'veg_class' has length 16, expected 17");
    }
}
