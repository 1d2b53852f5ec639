//! Sensitivity analysis: sweep one uncertainty parameter, measure elasticity
//!
//! ## Table of Contents
//! - **SensitivityResult / VariationPoint**: Sweep output
//! - **default_variation_levels**: The -30%..+30% default sweep
//! - **least_squares_slope**: Elasticity fit across variation points
//!
//! The analyzer re-executes the full generation + evaluation pipeline once
//! per variation level, holding every other parameter at its nominal
//! uncertainty and reusing the same base seed so runs are paired. Elasticity
//! is the least-squares slope of cost impact (percent) against parameter
//! variation (percent).

use serde::{Deserialize, Serialize};

use crate::uncertainty::UncertaintyParameter;

/// Default variation levels, in percent around nominal
pub fn default_variation_levels() -> Vec<f64> {
    vec![-30.0, -15.0, 0.0, 15.0, 30.0]
}

/// Output impact at one variation level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationPoint {
    /// Parameter variation in percent (0 = nominal)
    pub level_pct: f64,
    /// Parameter value after scaling
    pub parameter_value: f64,
    /// Average cost at this level
    pub avg_cost: f64,
    /// Percent change in average cost vs the 0% baseline
    pub cost_impact_pct: f64,
    /// Percent change in average utilization vs the baseline
    pub utilization_impact_pct: f64,
    /// Percent change in average SLA compliance vs the baseline
    pub sla_impact_pct: f64,
}

/// Result of a sensitivity sweep over one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    /// The swept parameter
    pub parameter: UncertaintyParameter,
    /// Average cost of the 0% baseline run
    pub baseline_cost: f64,
    /// Average utilization of the baseline run
    pub baseline_utilization: f64,
    /// Average SLA compliance of the baseline run
    pub baseline_sla: f64,
    /// One point per variation level, in sweep order
    pub points: Vec<VariationPoint>,
    /// Percent change in cost per percent change in the parameter
    pub elasticity: f64,
}

/// Least-squares slope of `y` against `x` over the given points
///
/// Falls back to 0 when the x values are degenerate (fewer than two distinct
/// levels).
pub fn least_squares_slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_x: f64 = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y: f64 = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return 0.0;
    }
    let sxy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    sxy / sxx
}

/// Percent change of `value` relative to `baseline`, guarding zero baselines
pub(crate) fn impact_pct(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        (value - baseline) / baseline * 100.0
    }
}
