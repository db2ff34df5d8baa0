//! Aggregation of SoilGrids depth nodes onto the three model layers
//!
//! SoilGrids reports properties at seven depths (0, 0.05, 0.15, 0.3, 0.6, 1
//! and 2 m). The model column has a 0.1 m top layer, a 0.5 m bottom layer and
//! a middle layer taking up the rest of the total depth. Each model layer
//! takes the mean of the nodes it covers.

use crate::errors::{Result, VicParamsError};

/// Number of SoilGrids depth nodes
pub const N_NODES: usize = 7;

/// Depth of each node (m)
pub const NODE_DEPTHS: [f64; N_NODES] = [0.0, 0.05, 0.15, 0.3, 0.6, 1.0, 2.0];

/// Top layer thickness (m)
pub const FIRST_LAYER_DEPTH: f64 = 0.1;

/// Bottom layer thickness (m)
pub const THIRD_LAYER_DEPTH: f64 = 0.5;

/// How node values are combined within a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mean {
    Arithmetic,
    /// Used for conductivities
    Harmonic,
}

impl Mean {
    pub fn of(self, values: &[f64]) -> f64 {
        match self {
            Mean::Arithmetic => arithmetic_mean(values),
            Mean::Harmonic => harmonic_mean(values),
        }
    }
}

pub fn arithmetic_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Harmonic mean; NaN propagates and any zero gives zero
pub fn harmonic_mean(values: &[f64]) -> f64 {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    if values.iter().any(|&v| v == 0.0) {
        return 0.0;
    }
    values.len() as f64 / values.iter().map(|v| 1.0 / v).sum::<f64>()
}

/// Depth rounded to the nanometre so band edges such as 0.3 m compare exactly
fn snap(depth: f64) -> f64 {
    (depth * 1e9).round() / 1e9
}

/// Thickness of the three model layers for a column of `total_depth` metres
pub fn layer_depths(total_depth: f64) -> [f64; 3] {
    [
        FIRST_LAYER_DEPTH,
        snap(total_depth - (FIRST_LAYER_DEPTH + THIRD_LAYER_DEPTH)),
        THIRD_LAYER_DEPTH,
    ]
}

/// Top layer from nodes sl1 and sl2
pub fn first_layer(sl1: f64, sl2: f64, mean: Mean) -> f64 {
    mean.of(&[sl1, sl2])
}

/// Middle layer from nodes sl3..=sl7
pub fn second_layer(deep: &[f64; 5], total_depth: f64, mean: Mean) -> Result<f64> {
    let [sl3, sl4, sl5, sl6, _sl7] = *deep;
    let thickness = layer_depths(total_depth)[1];

    if thickness < 0.3 {
        Ok(sl3)
    } else if (0.3..0.6).contains(&thickness) {
        Ok(mean.of(&[sl3, sl4]))
    } else if (0.6..=2.0).contains(&thickness) {
        Ok(mean.of(&[sl5, sl6]))
    } else if thickness > 2.0 {
        Ok(sl6)
    } else {
        Err(VicParamsError::LayerAssignment {
            layer: 2,
            total_depth,
        })
    }
}

/// Bottom layer from nodes sl3..=sl7, chosen by the depth of the middle layer's base
pub fn third_layer(deep: &[f64; 5], total_depth: f64, mean: Mean) -> Result<f64> {
    let [_sl3, sl4, sl5, sl6, sl7] = *deep;
    let base = snap(FIRST_LAYER_DEPTH + layer_depths(total_depth)[1]);

    if base >= 0.1 && total_depth <= 1.0 {
        Ok(sl4)
    } else if base >= 0.3 && total_depth <= 1.5 {
        Ok(mean.of(&[sl4, sl5, sl6]))
    } else if (1.0..1.5).contains(&base) {
        Ok(sl6)
    } else if base >= 1.5 {
        Ok(sl7)
    } else {
        Err(VicParamsError::LayerAssignment {
            layer: 3,
            total_depth,
        })
    }
}

/// All three layers for one property at one cell
pub fn aggregate(nodes: &[f64; N_NODES], total_depth: f64, mean: Mean) -> Result<[f64; 3]> {
    let deep = [nodes[2], nodes[3], nodes[4], nodes[5], nodes[6]];
    Ok([
        first_layer(nodes[0], nodes[1], mean),
        second_layer(&deep, total_depth, mean)?,
        third_layer(&deep, total_depth, mean)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const NODES: [f64; N_NODES] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];

    #[test]
    fn harmonic_mean_edge_cases() {
        assert_relative_eq!(harmonic_mean(&[1.0, 4.0]), 1.6);
        assert_eq!(harmonic_mean(&[0.0, 4.0]), 0.0);
        assert!(harmonic_mean(&[f64::NAN, 4.0]).is_nan());
        assert!(harmonic_mean(&[]).is_nan());
    }

    #[test]
    fn two_metre_column() {
        let layers = aggregate(&NODES, 2.0, Mean::Arithmetic).unwrap();
        assert_relative_eq!(layers[0], 1.5);
        // middle layer 1.4 m thick
        assert_relative_eq!(layers[1], 5.5);
        // middle layer base at 1.5 m
        assert_relative_eq!(layers[2], 7.0);
        assert_relative_eq!(layer_depths(2.0)[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn shallow_columns() {
        let layers = aggregate(&NODES, 0.7, Mean::Arithmetic).unwrap();
        assert_eq!(layers[1], 3.0);
        assert_eq!(layers[2], 4.0);

        let layers = aggregate(&NODES, 1.0, Mean::Harmonic).unwrap();
        assert_relative_eq!(layers[1], harmonic_mean(&[3.0, 4.0]));
        assert_eq!(layers[2], 4.0);

        // smallest column with a middle layer
        let layers = aggregate(&NODES, 0.6, Mean::Arithmetic).unwrap();
        assert_eq!(layers[2], 4.0);
    }

    #[test]
    fn intermediate_and_deep_columns() {
        let layers = aggregate(&NODES, 1.2, Mean::Arithmetic).unwrap();
        assert_relative_eq!(layers[2], 5.0);

        let layers = aggregate(&NODES, 1.7, Mean::Arithmetic).unwrap();
        assert_eq!(layers[2], 6.0);

        let layers = aggregate(&NODES, 3.0, Mean::Arithmetic).unwrap();
        assert_eq!(layers[1], 6.0);
        assert_eq!(layers[2], 7.0);
    }

    #[test]
    fn second_layer_band_edges() {
        let deep = [3.0, 4.0, 5.0, 6.0, 7.0];
        // middle layer exactly 0.3 m and 0.6 m thick
        assert_eq!(layer_depths(0.9)[1], 0.3);
        assert_eq!(second_layer(&deep, 0.9, Mean::Arithmetic).unwrap(), 3.5);
        assert_eq!(layer_depths(1.2)[1], 0.6);
        assert_eq!(second_layer(&deep, 1.2, Mean::Arithmetic).unwrap(), 5.5);
        assert_relative_eq!(
            second_layer(&deep, 1.2, Mean::Harmonic).unwrap(),
            harmonic_mean(&[5.0, 6.0])
        );
        // just below each edge
        assert_eq!(second_layer(&deep, 0.899, Mean::Arithmetic).unwrap(), 3.0);
        assert_eq!(second_layer(&deep, 1.199, Mean::Arithmetic).unwrap(), 3.5);
    }

    #[test]
    fn harmonic_third_layer_at_base_of_one_and_a_half_metres() {
        let deep = [3.0, 4.0, 5.0, 6.0, 7.0];
        // total depth 2 m puts the middle layer base exactly at 1.5 m
        assert_eq!(third_layer(&deep, 2.0, Mean::Harmonic).unwrap(), 7.0);
        assert_eq!(third_layer(&deep, 2.0, Mean::Arithmetic).unwrap(), 7.0);
        assert_eq!(third_layer(&deep, 1.999, Mean::Harmonic).unwrap(), 6.0);
    }

    #[test]
    fn unassignable_depths_error() {
        assert!(matches!(
            aggregate(&NODES, f64::NAN, Mean::Arithmetic),
            Err(VicParamsError::LayerAssignment { layer: 2, .. })
        ));
        assert!(matches!(
            aggregate(&NODES, 0.4, Mean::Harmonic),
            Err(VicParamsError::LayerAssignment { layer: 3, .. })
        ));
    }
}
