//! Core domain types for dispatch simulation
//!
//! ## Table of Contents
//! - **BaseScenario**: Immutable baseline planning instance (caller-owned)
//! - **Material / Order / TransportRoute**: Scenario building blocks
//! - **SimulationScenario**: One randomized trial perturbation
//! - **MonteCarloResult**: Aggregate output of a simulation run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::recommend::Recommendation;
use crate::risk::RiskMetrics;
use crate::stats::{ConfidenceInterval, CostStatistics, HistogramBucket};

/// A stockyard material with its nominal available quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Material identifier (e.g. "HR-COIL")
    pub id: String,
    /// Nominal available quantity in tonnes
    pub available_tonnes: f64,
}

impl Material {
    /// Create a new material
    pub fn new(id: impl Into<String>, available_tonnes: f64) -> Self {
        Self {
            id: id.into(),
            available_tonnes,
        }
    }
}

/// A customer order against the dispatch plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: String,
    /// Material this order draws from
    pub material_id: String,
    /// Ordered quantity in tonnes
    pub quantity_tonnes: f64,
    /// Destination the order ships to
    pub destination: String,
    /// Delivery commitment window in hours
    pub sla_hours: f64,
}

impl Order {
    /// Create a new order
    pub fn new(
        id: impl Into<String>,
        material_id: impl Into<String>,
        quantity_tonnes: f64,
        destination: impl Into<String>,
        sla_hours: f64,
    ) -> Self {
        Self {
            id: id.into(),
            material_id: material_id.into(),
            quantity_tonnes,
            destination: destination.into(),
            sla_hours,
        }
    }
}

/// A transport route to a destination with its nominal delay and tariff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRoute {
    /// Destination served by this route
    pub destination: String,
    /// Nominal transit delay in hours
    pub nominal_delay_hours: f64,
    /// Freight tariff per tonne
    pub tariff_per_tonne: f64,
}

impl TransportRoute {
    /// Create a new route
    pub fn new(
        destination: impl Into<String>,
        nominal_delay_hours: f64,
        tariff_per_tonne: f64,
    ) -> Self {
        Self {
            destination: destination.into(),
            nominal_delay_hours,
            tariff_per_tonne,
        }
    }
}

/// Immutable description of one planning instance
///
/// Owned exclusively by the caller; the engine only reads it. Built with
/// `with_*` methods:
///
/// ```rust
/// use dispatch_simulation::types::{BaseScenario, Material, Order, TransportRoute};
///
/// let scenario = BaseScenario::new("q3-dispatch")
///     .with_material(Material::new("HR-COIL", 3_000.0))
///     .with_order(Order::new("ORD-1", "HR-COIL", 450.0, "Bhilai", 48.0))
///     .with_route(TransportRoute::new("Bhilai", 36.0, 110.0))
///     .with_equipment(6, 600.0)
///     .with_budget(500_000.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseScenario {
    /// Human-readable scenario name
    pub name: String,
    /// Materials available at the stockyard
    pub materials: Vec<Material>,
    /// Orders the plan must serve
    pub orders: Vec<Order>,
    /// Transport routes keyed by destination
    pub routes: Vec<TransportRoute>,
    /// Number of equipment units (rakes/vehicles) in the fleet
    pub equipment_units: u32,
    /// Carrying capacity per equipment unit in tonnes
    pub equipment_capacity_tonnes: f64,
    /// Budget ceiling for the plan, if one is set
    pub budget: Option<f64>,
    /// Nominal fixed cost basis (handling, demurrage provisions)
    pub nominal_cost: f64,
}

impl BaseScenario {
    /// Create an empty scenario with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            materials: Vec::new(),
            orders: Vec::new(),
            routes: Vec::new(),
            equipment_units: 1,
            equipment_capacity_tonnes: 500.0,
            budget: None,
            nominal_cost: 0.0,
        }
    }

    /// Add a material
    pub fn with_material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    /// Add an order
    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// Add a transport route
    pub fn with_route(mut self, route: TransportRoute) -> Self {
        self.routes.push(route);
        self
    }

    /// Set the equipment fleet (unit count and per-unit capacity in tonnes)
    pub fn with_equipment(mut self, units: u32, capacity_tonnes: f64) -> Self {
        self.equipment_units = units;
        self.equipment_capacity_tonnes = capacity_tonnes;
        self
    }

    /// Set the budget ceiling
    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Set the nominal fixed cost basis
    pub fn with_nominal_cost(mut self, cost: f64) -> Self {
        self.nominal_cost = cost;
        self
    }

    /// Total ordered tonnage across all orders
    pub fn total_order_tonnes(&self) -> f64 {
        self.orders.iter().map(|o| o.quantity_tonnes).sum()
    }

    /// Look up the route serving a destination
    pub fn route_for(&self, destination: &str) -> Option<&TransportRoute> {
        self.routes.iter().find(|r| r.destination == destination)
    }
}

/// One randomized trial: every uncertain input perturbed around its nominal
///
/// Created by the scenario generator, consumed once by the plan evaluator,
/// then discarded. Maps are `BTreeMap` so that iteration order (and therefore
/// floating-point accumulation order downstream) is stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationScenario {
    /// Run this trial belongs to
    pub run_id: Uuid,
    /// Zero-based trial index within the run
    pub trial_index: u64,
    /// Perturbed material availability in tonnes, clamped to >= 0
    pub material_availability: BTreeMap<String, f64>,
    /// Perturbed order quantities in tonnes, clamped to >= 0
    pub order_quantities: BTreeMap<String, f64>,
    /// Order arrival offsets in hours (positive = later than planned)
    pub order_arrival_offsets: BTreeMap<String, f64>,
    /// Perturbed transit delay per destination in hours, clamped to >= 0
    pub transport_delays: BTreeMap<String, f64>,
    /// Multiplier applied to all cost components, clamped to >= 0
    pub cost_factor: f64,
    /// Equipment units that survived the failure draw
    pub operational_equipment: u32,
    /// Global demand multiplier, clamped to >= 0
    pub demand_factor: f64,
    /// When the trial was generated
    pub generated_at: DateTime<Utc>,
}

/// Aggregate output of one Monte Carlo simulation run
///
/// Constructed once per run and immutable after construction. `run_id` and
/// `completed_at` are run metadata; every statistical field is a
/// deterministic function of (scenario, parameters, trial count, seed,
/// evaluator, engine config).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Unique identifier for this run
    pub run_id: Uuid,
    /// Base seed the run was driven by
    pub seed: u64,
    /// Total trials executed
    pub total_scenarios: u64,
    /// Trials with a feasible plan, included in distribution statistics
    pub successful_scenarios: u64,
    /// Trials with an infeasible plan, excluded from distribution statistics
    pub failed_scenarios: u64,
    /// Cost distribution statistics over successful trials
    pub cost: CostStatistics,
    /// Fixed-bucket cost histogram
    pub cost_histogram: Vec<HistogramBucket>,
    /// Average equipment utilization percentage
    pub avg_utilization: f64,
    /// Average SLA compliance percentage
    pub avg_sla_compliance: f64,
    /// Derived risk metrics
    pub risk: RiskMetrics,
    /// 95% confidence interval for trial cost
    pub cost_interval: ConfidenceInterval,
    /// 95% confidence interval for utilization
    pub utilization_interval: ConfidenceInterval,
    /// 95% confidence interval for SLA compliance
    pub sla_interval: ConfidenceInterval,
    /// Qualitative guidance, critical-severity rules first
    pub recommendations: Vec<Recommendation>,
    /// Advisory warnings (e.g. trial count outside the recommended range)
    pub warnings: Vec<String>,
    /// When the run completed
    pub completed_at: DateTime<Utc>,
}

impl MonteCarloResult {
    /// Fraction of trials that were infeasible, as a percentage
    pub fn failure_rate(&self) -> f64 {
        if self.total_scenarios == 0 {
            0.0
        } else {
            self.failed_scenarios as f64 / self.total_scenarios as f64 * 100.0
        }
    }

    /// Flatten the key output metrics into a labeled map for comparison
    pub fn metric_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("avg_cost".to_string(), self.cost.avg);
        map.insert("p95_cost".to_string(), self.cost.p95);
        map.insert("cost_std_dev".to_string(), self.cost.std_dev);
        map.insert("avg_utilization".to_string(), self.avg_utilization);
        map.insert("avg_sla_compliance".to_string(), self.avg_sla_compliance);
        map.insert("overall_risk".to_string(), self.risk.overall_risk);
        map.insert("cost_risk".to_string(), self.risk.cost_risk);
        map.insert("delay_risk".to_string(), self.risk.delay_risk);
        map.insert("capacity_risk".to_string(), self.risk.capacity_risk);
        map.insert("failure_rate".to_string(), self.failure_rate());
        map
    }
}
