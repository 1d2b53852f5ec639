//! Plan evaluator contract and the default tariff-table cost model
//!
//! ## Table of Contents
//! - **PlanEvaluator**: Trait for pluggable plan evaluation strategies
//! - **TrialOutcome**: Feasibility flag plus cost/utilization/SLA figures
//! - **TariffCostModel**: Default parametric cost model
//!
//! The evaluator is the seam between the simulation core and whatever
//! allocation heuristic or external optimizer prices a plan. Alternative
//! cost models substitute here without touching the simulation core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::{BaseScenario, SimulationScenario};

/// Outcome of evaluating one perturbed scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Whether the perturbed plan was feasible at all
    pub feasible: bool,
    /// Total plan cost for this trial
    pub cost: f64,
    /// Equipment utilization percentage, in [0, 100]
    pub utilization: f64,
    /// SLA compliance percentage, in [0, 100]
    pub sla_compliance: f64,
}

impl TrialOutcome {
    /// A feasible outcome with the given figures
    pub fn feasible(cost: f64, utilization: f64, sla_compliance: f64) -> Self {
        Self {
            feasible: true,
            cost,
            utilization: utilization.clamp(0.0, 100.0),
            sla_compliance: sla_compliance.clamp(0.0, 100.0),
        }
    }

    /// An infeasible outcome; excluded from distribution statistics
    pub fn infeasible() -> Self {
        Self {
            feasible: false,
            cost: 0.0,
            utilization: 0.0,
            sla_compliance: 0.0,
        }
    }
}

/// Trait for plan evaluation strategies
///
/// Given a perturbed scenario, return a feasibility flag plus cost,
/// utilization and SLA-compliance figures. Evaluation may be I/O-bound if it
/// delegates to an external optimizer, hence the async boundary.
///
/// # Example
///
/// ```rust,ignore
/// use dispatch_simulation::evaluator::{PlanEvaluator, TrialOutcome};
/// use async_trait::async_trait;
///
/// struct FlatRateModel;
///
/// #[async_trait]
/// impl PlanEvaluator for FlatRateModel {
///     async fn evaluate(&self, base: &BaseScenario, trial: &SimulationScenario) -> TrialOutcome {
///         let tonnes: f64 = trial.order_quantities.values().sum();
///         TrialOutcome::feasible(tonnes * 100.0 * trial.cost_factor, 80.0, 95.0)
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanEvaluator: Send + Sync {
    /// Evaluate one perturbed scenario against the baseline plan
    async fn evaluate(&self, base: &BaseScenario, trial: &SimulationScenario) -> TrialOutcome;

    /// Evaluator name for logging
    fn name(&self) -> &str {
        "custom"
    }
}

/// Shared, type-erased evaluator handle
pub type BoxedPlanEvaluator = Arc<dyn PlanEvaluator>;

/// Default parametric cost model backed by the route tariff table
///
/// Cost is a lookup-table multiplication, not a learned model: freight is
/// tariff x perturbed tonnage per destination, any supply shortfall is
/// covered by emergency procurement at a premium over the route tariff, and
/// SLA overruns accrue a per-hour delay penalty. The whole sum scales with
/// the trial's cost factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffCostModel {
    /// Tariff applied when a destination has no configured route
    pub default_tariff_per_tonne: f64,
    /// Penalty per hour of SLA overrun, per order
    pub delay_penalty_per_hour: f64,
    /// Premium multiplier on tariff for shortfall tonnage
    pub shortfall_premium: f64,
    /// Shortfall fraction above which the plan is declared infeasible
    pub max_shortfall_fraction: f64,
}

impl Default for TariffCostModel {
    fn default() -> Self {
        Self {
            default_tariff_per_tonne: 100.0,
            delay_penalty_per_hour: 250.0,
            shortfall_premium: 2.5,
            max_shortfall_fraction: 0.4,
        }
    }
}

impl TariffCostModel {
    /// Create a model with the default tariffs and penalties
    pub fn new() -> Self {
        Self::default()
    }

    fn tariff_for(&self, base: &BaseScenario, destination: &str) -> f64 {
        base.route_for(destination)
            .map(|r| r.tariff_per_tonne)
            .unwrap_or(self.default_tariff_per_tonne)
    }
}

#[async_trait]
impl PlanEvaluator for TariffCostModel {
    async fn evaluate(&self, base: &BaseScenario, trial: &SimulationScenario) -> TrialOutcome {
        if trial.operational_equipment == 0 {
            return TrialOutcome::infeasible();
        }

        // Demand per material under this trial's perturbations
        let mut total_demand = 0.0;
        let mut shortfall_tonnes = 0.0;
        for material in &base.materials {
            let available = trial
                .material_availability
                .get(&material.id)
                .copied()
                .unwrap_or(material.available_tonnes);
            let demand: f64 = base
                .orders
                .iter()
                .filter(|o| o.material_id == material.id)
                .map(|o| {
                    trial
                        .order_quantities
                        .get(&o.id)
                        .copied()
                        .unwrap_or(o.quantity_tonnes)
                        * trial.demand_factor
                })
                .sum();
            total_demand += demand;
            shortfall_tonnes += (demand - available).max(0.0);
        }

        if total_demand > 0.0 && shortfall_tonnes / total_demand > self.max_shortfall_fraction {
            return TrialOutcome::infeasible();
        }

        let mut freight = 0.0;
        let mut delay_cost = 0.0;
        let mut orders_on_time = 0usize;
        for order in &base.orders {
            let tonnes = trial
                .order_quantities
                .get(&order.id)
                .copied()
                .unwrap_or(order.quantity_tonnes)
                * trial.demand_factor;
            freight += self.tariff_for(base, &order.destination) * tonnes;

            let delay = trial
                .transport_delays
                .get(&order.destination)
                .copied()
                .unwrap_or_else(|| {
                    base.route_for(&order.destination)
                        .map(|r| r.nominal_delay_hours)
                        .unwrap_or(0.0)
                });
            let arrival_offset = trial
                .order_arrival_offsets
                .get(&order.id)
                .copied()
                .unwrap_or(0.0);
            // A late arrival shrinks the remaining delivery window
            let window = (order.sla_hours - arrival_offset).max(0.0);
            if delay <= window {
                orders_on_time += 1;
            } else {
                delay_cost += (delay - window) * self.delay_penalty_per_hour;
            }
        }

        // Shortfall tonnage is procured at a premium over the default tariff
        let shortfall_cost =
            shortfall_tonnes * self.default_tariff_per_tonne * self.shortfall_premium;

        let cost = (base.nominal_cost + freight + delay_cost + shortfall_cost)
            * trial.cost_factor;

        let capacity =
            trial.operational_equipment as f64 * base.equipment_capacity_tonnes;
        let utilization = if capacity > 0.0 {
            total_demand / capacity * 100.0
        } else {
            0.0
        };
        let sla_compliance = if base.orders.is_empty() {
            100.0
        } else {
            orders_on_time as f64 / base.orders.len() as f64 * 100.0
        };

        TrialOutcome::feasible(cost, utilization, sla_compliance)
    }

    fn name(&self) -> &str {
        "tariff-cost-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioGenerator;
    use crate::types::{Material, Order, TransportRoute};
    use crate::uncertainty::{UncertaintyParameters, UncertaintySampler};
    use uuid::Uuid;

    fn base() -> BaseScenario {
        BaseScenario::new("eval-test")
            .with_material(Material::new("HR-COIL", 1_000.0))
            .with_order(Order::new("O1", "HR-COIL", 400.0, "Bhilai", 48.0))
            .with_order(Order::new("O2", "HR-COIL", 300.0, "Durgapur", 72.0))
            .with_route(TransportRoute::new("Bhilai", 36.0, 110.0))
            .with_route(TransportRoute::new("Durgapur", 60.0, 95.0))
            .with_equipment(3, 500.0)
            .with_nominal_cost(10_000.0)
    }

    fn nominal_trial(base: &BaseScenario) -> SimulationScenario {
        // Zero uncertainty reproduces the baseline exactly
        let params = UncertaintyParameters {
            material_availability_pct: 0.0,
            order_arrival_pct: 0.0,
            transport_delay_std_hours: 0.0,
            cost_variation_pct: 0.0,
            equipment_failure_probability: 0.0,
            demand_variability_pct: 0.0,
        };
        ScenarioGenerator::new(base, &params).generate(
            Uuid::nil(),
            0,
            &mut UncertaintySampler::new(0),
        )
    }

    #[tokio::test]
    async fn test_nominal_scenario_cost() {
        let base = base();
        let trial = nominal_trial(&base);
        let outcome = TariffCostModel::new().evaluate(&base, &trial).await;

        assert!(outcome.feasible);
        // nominal_cost + 400 * 110 + 300 * 95, no delays, no shortfall
        let expected = 10_000.0 + 400.0 * 110.0 + 300.0 * 95.0;
        assert!((outcome.cost - expected).abs() < 1e-9, "cost {}", outcome.cost);
        // All delays within SLA windows at nominal
        assert_eq!(outcome.sla_compliance, 100.0);
        // 700 tonnes over 3 * 500 capacity
        assert!((outcome.utilization - 700.0 / 1500.0 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_equipment_is_infeasible() {
        let base = base();
        let mut trial = nominal_trial(&base);
        trial.operational_equipment = 0;
        let outcome = TariffCostModel::new().evaluate(&base, &trial).await;
        assert!(!outcome.feasible);
    }

    #[tokio::test]
    async fn test_deep_shortfall_is_infeasible() {
        let base = base();
        let mut trial = nominal_trial(&base);
        trial
            .material_availability
            .insert("HR-COIL".to_string(), 100.0);
        let outcome = TariffCostModel::new().evaluate(&base, &trial).await;
        assert!(!outcome.feasible);
    }

    #[tokio::test]
    async fn test_moderate_shortfall_costs_premium() {
        let base = base();
        let mut trial = nominal_trial(&base);
        // 100 tonnes short out of 700: feasible but pricier
        trial
            .material_availability
            .insert("HR-COIL".to_string(), 600.0);
        let model = TariffCostModel::new();
        let short = model.evaluate(&base, &trial).await;
        let nominal = model.evaluate(&base, &nominal_trial(&base)).await;
        assert!(short.feasible);
        assert!(short.cost > nominal.cost);
    }

    #[tokio::test]
    async fn test_late_delivery_penalized() {
        let base = base();
        let mut trial = nominal_trial(&base);
        trial.transport_delays.insert("Bhilai".to_string(), 60.0);
        let outcome = TariffCostModel::new().evaluate(&base, &trial).await;
        assert!(outcome.feasible);
        assert_eq!(outcome.sla_compliance, 50.0);
    }

    #[tokio::test]
    async fn test_mock_evaluator() {
        let mut mock = MockPlanEvaluator::new();
        mock.expect_evaluate()
            .returning(|_, _| TrialOutcome::feasible(1_234.0, 50.0, 99.0));
        let base = base();
        let trial = nominal_trial(&base);
        let outcome = mock.evaluate(&base, &trial).await;
        assert_eq!(outcome.cost, 1_234.0);
    }
}
