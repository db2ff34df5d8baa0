//! Statistical computations and parallel reduction operations
//!
//! NaN-skipping mean and sum reductions along one axis of an
//! `f64` array, used for monthly climatologies, plus summary statistics for
//! inspecting parameter files.
//!
//! # Organization
//!
//! - [`operations`]: Core statistical operations, traits and summaries
//! - [`parallel`]: Parallel computation implementations

pub mod operations;
pub mod parallel;

// Re-export the main types and functions for convenience
pub use operations::{summarize, StatOperation, StatisticalReduction, Summary};
pub use parallel::{parallel_mean_axis, parallel_sum_axis};
