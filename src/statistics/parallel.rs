//! Parallel NaN-skipping reductions along one array axis
//!
//! Each output element reduces one lane of the input. Lanes are processed on
//! the rayon pool; a lane with no finite value yields NaN.

use crate::errors::Result;
use ndarray::{ArrayD, ArrayView1, Axis, Zip};
use tracing::debug;

/// Sum and count of the finite values in a lane
fn finite_sum(lane: ArrayView1<'_, f64>) -> (f64, usize) {
    lane.iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0), |(sum, n), &v| (sum + v, n + 1))
}

fn reduce_lanes(
    data: &ArrayD<f64>,
    axis: usize,
    finish: impl Fn(f64, usize) -> f64 + Sync,
) -> ArrayD<f64> {
    debug!(
        elements = data.len(),
        axis_len = data.len_of(Axis(axis)),
        threads = rayon::current_num_threads(),
        "parallel reduction"
    );
    Zip::from(data.lanes(Axis(axis))).par_map_collect(|lane| {
        let (sum, n) = finite_sum(lane);
        if n == 0 {
            f64::NAN
        } else {
            finish(sum, n)
        }
    })
}

/// Mean of the finite values along `axis`
///
/// # Errors
///
/// Currently infallible; the signature matches [`parallel_sum_axis`].
pub fn parallel_mean_axis(data: &ArrayD<f64>, axis: usize) -> Result<ArrayD<f64>> {
    Ok(reduce_lanes(data, axis, |sum, n| sum / n as f64))
}

/// Sum of the finite values along `axis`
///
/// # Errors
///
/// Currently infallible; the signature matches [`parallel_mean_axis`].
pub fn parallel_sum_axis(data: &ArrayD<f64>, axis: usize) -> Result<ArrayD<f64>> {
    Ok(reduce_lanes(data, axis, |sum, _| sum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn reductions_drop_the_axis_and_skip_nan() {
        let mut data = Array3::<f64>::from_shape_fn((3, 2, 2), |(m, j, i)| (m + j + i) as f64).into_dyn();
        data[[1, 0, 1]] = f64::NAN;
        for m in 0..3 {
            data[[m, 1, 1]] = f64::NAN;
        }

        let mean = parallel_mean_axis(&data, 0).unwrap();
        assert_eq!(mean.shape(), &[2, 2]);
        assert_eq!(mean[[0, 0]], 1.0);
        assert_eq!(mean[[0, 1]], 2.0);
        assert!(mean[[1, 1]].is_nan());

        let sum = parallel_sum_axis(&data, 0).unwrap();
        assert_eq!(sum[[1, 0]], 6.0);
        assert_eq!(sum[[0, 1]], 4.0);
        assert!(sum[[1, 1]].is_nan());
    }
}
