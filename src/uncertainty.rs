//! Uncertainty model: validated parameters and seedable sampling primitives
//!
//! ## Table of Contents
//! - **UncertaintyParameters**: Validated per-input uncertainty levels
//! - **UncertaintyParameter**: Named handle for sensitivity sweeps
//! - **UncertaintySampler**: Seedable random source for all perturbations
//!
//! Every sampling call is driven by an injected, seeded generator. Nothing in
//! the engine touches a global RNG, so a given seed reproduces an identical
//! sequence of scenarios.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SimulationError};

/// Standard-deviation / probability levels for each uncertain input
///
/// Percentages are std-dev as a percent of the nominal value; the transport
/// delay is an absolute std-dev in hours; the equipment failure probability
/// is per unit and per trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyParameters {
    /// Material availability std-dev, percent of nominal
    pub material_availability_pct: f64,
    /// Order arrival variance, percent of the order's SLA window
    pub order_arrival_pct: f64,
    /// Transport delay std-dev in hours
    pub transport_delay_std_hours: f64,
    /// Cost variation std-dev, percent of nominal
    pub cost_variation_pct: f64,
    /// Per-unit equipment failure probability, in [0, 1]
    pub equipment_failure_probability: f64,
    /// Demand variability std-dev, percent of nominal
    pub demand_variability_pct: f64,
}

impl Default for UncertaintyParameters {
    fn default() -> Self {
        Self {
            material_availability_pct: 10.0,
            order_arrival_pct: 15.0,
            transport_delay_std_hours: 4.0,
            cost_variation_pct: 8.0,
            equipment_failure_probability: 0.02,
            demand_variability_pct: 12.0,
        }
    }
}

impl UncertaintyParameters {
    /// Validate the parameter set
    ///
    /// Rejects negative std-devs and probabilities outside [0, 1]. The engine
    /// never substitutes defaults for invalid values; callers get a
    /// [`SimulationError::Config`] before any trial work begins.
    pub fn validate(&self) -> Result<()> {
        let pcts = [
            ("material_availability_pct", self.material_availability_pct),
            ("order_arrival_pct", self.order_arrival_pct),
            ("transport_delay_std_hours", self.transport_delay_std_hours),
            ("cost_variation_pct", self.cost_variation_pct),
            ("demand_variability_pct", self.demand_variability_pct),
        ];
        for (name, value) in pcts {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::config(format!(
                    "{name} must be a non-negative finite number, got {value}"
                )));
            }
        }
        let p = self.equipment_failure_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(SimulationError::config(format!(
                "equipment_failure_probability must be in [0, 1], got {p}"
            )));
        }
        Ok(())
    }

    /// Set material availability uncertainty (percent)
    pub fn with_material_availability(mut self, pct: f64) -> Self {
        self.material_availability_pct = pct;
        self
    }

    /// Set order arrival variance (percent)
    pub fn with_order_arrival(mut self, pct: f64) -> Self {
        self.order_arrival_pct = pct;
        self
    }

    /// Set transport delay std-dev (hours)
    pub fn with_transport_delay(mut self, hours: f64) -> Self {
        self.transport_delay_std_hours = hours;
        self
    }

    /// Set cost variation uncertainty (percent)
    pub fn with_cost_variation(mut self, pct: f64) -> Self {
        self.cost_variation_pct = pct;
        self
    }

    /// Set per-unit equipment failure probability
    pub fn with_equipment_failure(mut self, probability: f64) -> Self {
        self.equipment_failure_probability = probability;
        self
    }

    /// Set demand variability (percent)
    pub fn with_demand_variability(mut self, pct: f64) -> Self {
        self.demand_variability_pct = pct;
        self
    }
}

/// Named handle for one uncertain input, used by the sensitivity analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UncertaintyParameter {
    /// Material availability uncertainty
    MaterialAvailability,
    /// Order arrival variance
    OrderArrival,
    /// Transport delay std-dev
    TransportDelay,
    /// Cost variation uncertainty
    CostVariation,
    /// Equipment failure probability
    EquipmentFailure,
    /// Demand variability
    DemandVariability,
}

impl UncertaintyParameter {
    /// All known parameters, in declaration order
    pub fn all() -> [UncertaintyParameter; 6] {
        [
            Self::MaterialAvailability,
            Self::OrderArrival,
            Self::TransportDelay,
            Self::CostVariation,
            Self::EquipmentFailure,
            Self::DemandVariability,
        ]
    }

    /// Canonical name used in external interfaces
    pub fn name(&self) -> &'static str {
        match self {
            Self::MaterialAvailability => "material_availability",
            Self::OrderArrival => "order_arrival",
            Self::TransportDelay => "transport_delay",
            Self::CostVariation => "cost_variation",
            Self::EquipmentFailure => "equipment_failure",
            Self::DemandVariability => "demand_variability",
        }
    }

    /// Read this parameter's current value from a parameter set
    pub fn value_of(&self, params: &UncertaintyParameters) -> f64 {
        match self {
            Self::MaterialAvailability => params.material_availability_pct,
            Self::OrderArrival => params.order_arrival_pct,
            Self::TransportDelay => params.transport_delay_std_hours,
            Self::CostVariation => params.cost_variation_pct,
            Self::EquipmentFailure => params.equipment_failure_probability,
            Self::DemandVariability => params.demand_variability_pct,
        }
    }

    /// Return a copy of `params` with this parameter scaled by `factor`
    ///
    /// Probabilities stay clamped to [0, 1] so a scaled set always passes
    /// validation.
    pub fn scaled(&self, params: &UncertaintyParameters, factor: f64) -> UncertaintyParameters {
        let mut out = params.clone();
        match self {
            Self::MaterialAvailability => out.material_availability_pct *= factor,
            Self::OrderArrival => out.order_arrival_pct *= factor,
            Self::TransportDelay => out.transport_delay_std_hours *= factor,
            Self::CostVariation => out.cost_variation_pct *= factor,
            Self::EquipmentFailure => {
                out.equipment_failure_probability =
                    (out.equipment_failure_probability * factor).clamp(0.0, 1.0);
            }
            Self::DemandVariability => out.demand_variability_pct *= factor,
        }
        out
    }
}

impl fmt::Display for UncertaintyParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UncertaintyParameter {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                SimulationError::invalid_parameter(format!(
                    "unknown uncertainty parameter '{s}' (expected one of: {})",
                    Self::all()
                        .iter()
                        .map(|p| p.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Seedable random source driving all scenario perturbations
///
/// Wraps a ChaCha8 stream so substreams can be derived per trial
/// (`seed + trial_index`) and results are reproducible regardless of worker
/// scheduling.
#[derive(Debug, Clone)]
pub struct UncertaintySampler {
    rng: ChaCha8Rng,
}

impl UncertaintySampler {
    /// Create a sampler from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draw from a normal distribution via Box-Muller
    pub fn sample_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if std_dev <= 0.0 {
            return mean;
        }
        // u1 in (0, 1] so the log is finite
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Perturb a nominal value with a std-dev given as a percent of nominal
    pub fn sample_pct(&mut self, nominal: f64, std_dev_pct: f64) -> f64 {
        self.sample_normal(nominal, nominal.abs() * std_dev_pct / 100.0)
    }

    /// Draw a Bernoulli outcome
    ///
    /// `probability` must already be validated into [0, 1].
    pub fn sample_bernoulli(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_validate() {
        assert!(UncertaintyParameters::default().validate().is_ok());
    }

    #[test]
    fn test_negative_std_dev_rejected() {
        let params = UncertaintyParameters::default().with_cost_variation(-5.0);
        assert!(matches!(
            params.validate(),
            Err(SimulationError::Config(_))
        ));
    }

    #[test]
    fn test_probability_above_one_rejected() {
        let params = UncertaintyParameters::default().with_equipment_failure(1.5);
        assert!(matches!(
            params.validate(),
            Err(SimulationError::Config(_))
        ));
    }

    #[test]
    fn test_parameter_parse_roundtrip() {
        for p in UncertaintyParameter::all() {
            assert_eq!(p.name().parse::<UncertaintyParameter>().unwrap(), p);
        }
        assert!(matches!(
            "weather".parse::<UncertaintyParameter>(),
            Err(SimulationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_scaled_clamps_probability() {
        let params = UncertaintyParameters::default().with_equipment_failure(0.8);
        let scaled = UncertaintyParameter::EquipmentFailure.scaled(&params, 2.0);
        assert_eq!(scaled.equipment_failure_probability, 1.0);
        assert!(scaled.validate().is_ok());
    }

    #[test]
    fn test_sampler_is_deterministic() {
        let mut a = UncertaintySampler::new(42);
        let mut b = UncertaintySampler::new(42);
        for _ in 0..100 {
            assert_eq!(a.sample_normal(100.0, 15.0), b.sample_normal(100.0, 15.0));
            assert_eq!(a.sample_bernoulli(0.3), b.sample_bernoulli(0.3));
        }
    }

    #[test]
    fn test_zero_std_dev_returns_mean() {
        let mut sampler = UncertaintySampler::new(7);
        assert_eq!(sampler.sample_normal(50.0, 0.0), 50.0);
        assert_eq!(sampler.sample_pct(50.0, 0.0), 50.0);
    }

    #[test]
    fn test_sample_mean_converges() {
        let mut sampler = UncertaintySampler::new(1);
        let n = 20_000;
        let sum: f64 = (0..n).map(|_| sampler.sample_normal(100.0, 10.0)).sum();
        let mean = sum / n as f64;
        assert!((mean - 100.0).abs() < 0.5, "mean was {mean}");
    }
}
