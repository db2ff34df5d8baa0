//! Core statistical operations and traits
//!
//! This module defines the reduction kinds used for monthly climatologies and
//! the summary statistics reported when inspecting parameter files.

use crate::errors::{Result, VicParamsError};
use ndarray::ArrayD;
use std::fmt;

/// Supported statistical operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOperation {
    /// Arithmetic mean
    Mean,
    /// Sum of values
    Sum,
}

impl StatOperation {
    /// Get the string representation of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
        }
    }
}

/// Trait for types that can perform statistical reductions along an axis
pub trait StatisticalReduction<T> {
    /// Perform a NaN-skipping reduction along the specified axis
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is out of bounds for the array.
    fn reduce_along_axis(&self, axis: usize, operation: StatOperation) -> Result<ArrayD<T>>;
}

impl StatisticalReduction<f64> for ArrayD<f64> {
    fn reduce_along_axis(&self, axis: usize, operation: StatOperation) -> Result<ArrayD<f64>> {
        if axis >= self.ndim() {
            return Err(VicParamsError::Generic(format!(
                "Axis {axis} is out of bounds for array with {} dimensions",
                self.ndim()
            )));
        }

        match operation {
            StatOperation::Mean => super::parallel::parallel_mean_axis(self, axis),
            StatOperation::Sum => super::parallel::parallel_sum_axis(self, axis),
        }
    }
}

/// Summary statistics over the finite values of an array
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    /// Number of finite values
    pub valid: usize,
    /// Number of values including fill
    pub total: usize,
}

/// Summarize the finite values; NaN statistics when there are none
pub fn summarize<'a, I>(values: I) -> Summary
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut total = 0usize;
    let mut finite = Vec::new();
    for &v in values {
        total += 1;
        if v.is_finite() {
            finite.push(v);
        }
    }

    if finite.is_empty() {
        return Summary {
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
            std: f64::NAN,
            valid: 0,
            total,
        };
    }

    let n = finite.len() as f64;
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = finite.iter().sum::<f64>() / n;
    let std = (finite.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();

    Summary {
        min,
        max,
        mean,
        std,
        valid: finite.len(),
        total,
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   Min: {}", self.min)?;
        writeln!(f, "   Max: {}", self.max)?;
        writeln!(f, "   Mean: {:.4}", self.mean)?;
        writeln!(f, "   Std Dev: {:.4}", self.std)?;
        write!(f, "   Valid: {} of {}", self.valid, self.total)
    }
}
