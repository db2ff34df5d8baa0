//! Climatological parameters from WorldClim monthly fields

use crate::errors::{Result, VicParamsError};
use crate::statistics::{StatOperation, StatisticalReduction};
use ndarray::{Array2, Array3, Ix2};

fn reduce_months(monthly: &Array3<f64>, operation: StatOperation) -> Result<Array2<f64>> {
    if monthly.shape()[0] != 12 {
        return Err(VicParamsError::ShapeMismatch {
            var: "monthly climatology".to_string(),
            expected: vec![12, monthly.shape()[1], monthly.shape()[2]],
            found: monthly.shape().to_vec(),
        });
    }
    let reduced = monthly
        .clone()
        .into_dyn()
        .reduce_along_axis(0, operation)?;
    Ok(reduced.into_dimensionality::<Ix2>()?)
}

/// Mean of the twelve monthly temperatures (C), skipping missing months
pub fn avg_temperature(monthly: &Array3<f64>) -> Result<Array2<f64>> {
    reduce_months(monthly, StatOperation::Mean)
}

/// Sum of the twelve monthly precipitation totals (mm), skipping missing months
pub fn annual_precipitation(monthly: &Array3<f64>) -> Result<Array2<f64>> {
    reduce_months(monthly, StatOperation::Sum)
}

/// Time zone offset (hours) from longitude, wrapped to `[-12, 12]`
pub fn off_gmt_from_longitude(xc: &Array2<f64>) -> Array2<f64> {
    xc.mapv(|lon| {
        let mut hours = lon * 24.0 / 360.0;
        if hours > 12.0 {
            hours -= 24.0;
        } else if hours < -12.0 {
            hours += 24.0;
        }
        hours
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn monthly_reductions_skip_missing() {
        let mut monthly = Array3::<f64>::zeros((12, 1, 2));
        for m in 0..12 {
            monthly[[m, 0, 0]] = m as f64;
            monthly[[m, 0, 1]] = f64::NAN;
        }
        monthly[[0, 0, 0]] = f64::NAN;

        let mean = avg_temperature(&monthly).unwrap();
        assert_relative_eq!(mean[[0, 0]], 6.0);
        assert!(mean[[0, 1]].is_nan());

        let total = annual_precipitation(&monthly).unwrap();
        assert_relative_eq!(total[[0, 0]], 66.0);
        assert!(total[[0, 1]].is_nan());
    }

    #[test]
    fn rejects_wrong_month_count() {
        assert!(avg_temperature(&Array3::zeros((11, 1, 1))).is_err());
    }

    #[test]
    fn offsets_from_longitude() {
        let off = off_gmt_from_longitude(&array![[0.0, 90.0, 270.0, -150.0]]);
        assert_relative_eq!(off[[0, 0]], 0.0);
        assert_relative_eq!(off[[0, 1]], 6.0);
        assert_relative_eq!(off[[0, 2]], -6.0);
        assert_relative_eq!(off[[0, 3]], -10.0);
    }
}
