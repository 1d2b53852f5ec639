//! Risk metrics derived from the aggregated trial distribution
//!
//! ## Table of Contents
//! - **RiskMetrics**: Cost/delay/capacity risks plus the weighted overall score
//! - **RiskWeights**: Weighting of the three sub-risks
//! - **RiskThresholds**: Configurable thresholds feeding the calculator
//!
//! Everything here is a deterministic pure function of the aggregated
//! distribution; no randomness re-enters after aggregation. The default
//! weights and thresholds are configurable, not fixed business rules.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::stats::TrialAccumulator;

/// Weighting of the three sub-risks in the overall score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    /// Weight on cost risk
    pub cost: f64,
    /// Weight on delay risk
    pub delay: f64,
    /// Weight on capacity risk
    pub capacity: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            cost: 0.4,
            delay: 0.4,
            capacity: 0.2,
        }
    }
}

impl RiskWeights {
    /// Validate that weights are non-negative and not all zero
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("cost", self.cost),
            ("delay", self.delay),
            ("capacity", self.capacity),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(SimulationError::config(format!(
                    "risk weight '{name}' must be non-negative, got {w}"
                )));
            }
        }
        if self.cost + self.delay + self.capacity <= 0.0 {
            return Err(SimulationError::config(
                "risk weights must not all be zero",
            ));
        }
        Ok(())
    }
}

/// Thresholds the risk calculator measures exceedance against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Budget ceiling override; falls back to the scenario budget, then to
    /// `avg_cost * 1.1` when neither is set
    pub budget: Option<f64>,
    /// SLA compliance floor (percent) below which a trial counts as delayed
    pub sla_floor: f64,
    /// Utilization ceiling (percent) above which a trial is over capacity
    pub utilization_ceiling: f64,
    /// Utilization floor (percent) below which a trial is under-utilized
    pub utilization_floor: f64,
    /// Sub-risk weighting
    pub weights: RiskWeights,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            budget: None,
            sla_floor: 90.0,
            utilization_ceiling: 95.0,
            utilization_floor: 30.0,
            weights: RiskWeights::default(),
        }
    }
}

impl RiskThresholds {
    /// Set the budget ceiling
    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Set the SLA compliance floor
    pub fn with_sla_floor(mut self, pct: f64) -> Self {
        self.sla_floor = pct;
        self
    }

    /// Set the utilization band (floor, ceiling)
    pub fn with_utilization_band(mut self, floor: f64, ceiling: f64) -> Self {
        self.utilization_floor = floor;
        self.utilization_ceiling = ceiling;
        self
    }

    /// Set the sub-risk weights
    pub fn with_weights(mut self, weights: RiskWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Validate thresholds and weights
    pub fn validate(&self) -> Result<()> {
        if self.utilization_floor > self.utilization_ceiling {
            return Err(SimulationError::config(format!(
                "utilization floor {} exceeds ceiling {}",
                self.utilization_floor, self.utilization_ceiling
            )));
        }
        if !(0.0..=100.0).contains(&self.sla_floor) {
            return Err(SimulationError::config(format!(
                "sla_floor must be in [0, 100], got {}",
                self.sla_floor
            )));
        }
        self.weights.validate()
    }
}

/// Probability-style risk scores derived from the trial distribution
///
/// Every component is a percentage in [0, 100]; `overall_risk` is the
/// weighted combination of the three sub-risks, clamped to the same range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Percentage of trials whose cost exceeded the budget
    pub cost_risk: f64,
    /// Percentage of trials whose SLA compliance fell below the floor
    pub delay_risk: f64,
    /// Percentage of trials outside the utilization band
    pub capacity_risk: f64,
    /// Weighted combination of the three sub-risks
    pub overall_risk: f64,
}

impl RiskMetrics {
    /// Compute risk metrics from a finalized accumulator
    ///
    /// When no budget was tracked during accumulation, cost exceedance is
    /// estimated from the reservoir against `avg_cost * 1.1`.
    pub fn compute(acc: &TrialAccumulator, thresholds: &RiskThresholds) -> Self {
        let n = acc.successful;
        if n == 0 {
            return Self {
                cost_risk: 0.0,
                delay_risk: 0.0,
                capacity_risk: 0.0,
                overall_risk: 0.0,
            };
        }
        let pct = |count: u64| count as f64 / n as f64 * 100.0;

        let cost_risk = if acc.budget().is_some() {
            pct(acc.cost_over_budget)
        } else {
            let cutoff = acc.cost.mean() * 1.1;
            let samples = acc.samples();
            if samples.is_empty() {
                0.0
            } else {
                samples.iter().filter(|s| s.cost > cutoff).count() as f64
                    / samples.len() as f64
                    * 100.0
            }
        };
        let delay_risk = pct(acc.sla_below_floor);
        let capacity_risk = pct(acc.util_over_ceiling + acc.util_under_floor);

        let w = &thresholds.weights;
        let total_weight = w.cost + w.delay + w.capacity;
        let overall_risk = ((cost_risk * w.cost
            + delay_risk * w.delay
            + capacity_risk * w.capacity)
            / total_weight)
            .clamp(0.0, 100.0);

        Self {
            cost_risk: cost_risk.clamp(0.0, 100.0),
            delay_risk: delay_risk.clamp(0.0, 100.0),
            capacity_risk: capacity_risk.clamp(0.0, 100.0),
            overall_risk,
        }
    }
}
