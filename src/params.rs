//! In-memory parameter collection
//!
//! [`ParameterSet`] holds the arrays destined for the parameter file, keyed
//! by variable name. Every insert is checked against the parameter schema so
//! the writer never sees a variable of the wrong rank or storage type.

use crate::errors::{Result, VicParamsError};
use crate::schema::{self, StorageKind};
use ndarray::{Array, ArrayD, Dimension};
use std::collections::BTreeMap;

/// A parameter array in its on-disk storage type
#[derive(Debug, Clone, PartialEq)]
pub enum ParamArray {
    Float(ArrayD<f64>),
    Int(ArrayD<i32>),
}

impl ParamArray {
    pub fn shape(&self) -> &[usize] {
        match self {
            ParamArray::Float(a) => a.shape(),
            ParamArray::Int(a) => a.shape(),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            ParamArray::Float(_) => StorageKind::Float,
            ParamArray::Int(_) => StorageKind::Int,
        }
    }

    pub fn as_float(&self) -> Option<&ArrayD<f64>> {
        match self {
            ParamArray::Float(a) => Some(a),
            ParamArray::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<&ArrayD<i32>> {
        match self {
            ParamArray::Int(a) => Some(a),
            ParamArray::Float(_) => None,
        }
    }
}

/// Named parameter arrays, in schema order when iterated
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    arrays: BTreeMap<usize, (&'static str, ParamArray)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a float variable, replacing any previous value
    pub fn insert_float<D: Dimension>(&mut self, name: &str, array: Array<f64, D>) -> Result<()> {
        self.insert(name, ParamArray::Float(array.into_dyn()))
    }

    /// Insert an integer variable, replacing any previous value
    pub fn insert_int<D: Dimension>(&mut self, name: &str, array: Array<i32, D>) -> Result<()> {
        self.insert(name, ParamArray::Int(array.into_dyn()))
    }

    pub fn insert(&mut self, name: &str, array: ParamArray) -> Result<()> {
        let (position, spec) = schema::VARIABLES
            .iter()
            .enumerate()
            .find(|(_, v)| v.name == name)
            .ok_or_else(|| {
                VicParamsError::Generic(format!("'{}' is not a parameter file variable", name))
            })?;

        if array.shape().len() != spec.dims.len() {
            return Err(VicParamsError::ShapeMismatch {
                var: name.to_string(),
                expected: vec![0; spec.dims.len()],
                found: array.shape().to_vec(),
            });
        }
        if array.kind() != spec.kind {
            return Err(VicParamsError::Generic(format!(
                "'{}' must be stored as {:?}, got {:?}",
                name,
                spec.kind,
                array.kind()
            )));
        }

        self.arrays.insert(position, (spec.name, array));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParamArray> {
        self.arrays
            .values()
            .find(|(n, _)| *n == name)
            .map(|(_, a)| a)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Variables in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamArray)> {
        self.arrays.values().map(|(n, a)| (*n, a))
    }

    /// Names of required schema variables that are not present
    pub fn missing_required(&self) -> Vec<&'static str> {
        schema::required()
            .filter(|v| !self.contains(v.name))
            .map(|v| v.name)
            .collect()
    }

    /// Move every entry of `other` into this set
    pub fn extend(&mut self, other: ParameterSet) {
        self.arrays.extend(other.arrays);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn rejects_wrong_rank_and_kind() {
        let mut set = ParameterSet::new();
        assert!(set.insert_float("Ksat", Array2::<f64>::zeros((2, 2))).is_err());
        assert!(set.insert_float("Nveg", Array2::<f64>::zeros((2, 2))).is_err());
        assert!(set.insert_float("not_a_variable", Array2::<f64>::zeros((2, 2))).is_err());
        assert!(set.insert_float("Ksat", Array3::<f64>::zeros((3, 2, 2))).is_ok());
        assert!(set.insert_int("Nveg", Array2::<i32>::zeros((2, 2))).is_ok());
    }

    #[test]
    fn iterates_in_schema_order() {
        let mut set = ParameterSet::new();
        set.insert_float("Ksat", Array3::<f64>::zeros((3, 1, 1))).unwrap();
        set.insert_float("xc", Array2::<f64>::zeros((1, 1))).unwrap();
        let names: Vec<_> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["xc", "Ksat"]);
        assert!(set.missing_required().contains(&"Cv"));
    }
}
