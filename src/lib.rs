//! # Dispatch Simulation
//!
//! A Monte Carlo scenario-simulation and risk-analytics engine for evaluating
//! logistics dispatch plans under uncertainty.
//!
//! ## Features
//!
//! - **Scenario Generation**: Seeded, reproducible perturbation of material
//!   availability, order volumes, transport delays, costs, and equipment
//! - **Parallel Trials**: Trials partitioned across a tokio worker pool with
//!   order-independent statistics
//! - **Risk Analytics**: Cost/delay/capacity risk scores, empirical confidence
//!   intervals, and a cost histogram
//! - **Sensitivity Analysis**: Per-parameter sweeps with cost elasticity
//! - **Recommendations**: Rule-based qualitative guidance on the plan
//! - **Metrics**: Prometheus-compatible metrics export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dispatch_simulation::{
//!     BaseScenario, Material, Order, SimulationBuilder, TransportRoute,
//!     UncertaintyParameters,
//! };
//!
//! #[tokio::main]
//! async fn main() -> dispatch_simulation::Result<()> {
//!     let engine = SimulationBuilder::new().build()?;
//!
//!     let scenario = BaseScenario::new("q3-dispatch")
//!         .with_material(Material::new("HR-COIL", 3_000.0))
//!         .with_order(Order::new("ORD-1", "HR-COIL", 450.0, "Bhilai", 48.0))
//!         .with_route(TransportRoute::new("Bhilai", 36.0, 110.0))
//!         .with_equipment(6, 600.0)
//!         .with_budget(500_000.0);
//!
//!     let result = engine
//!         .run_simulation(&scenario, &UncertaintyParameters::default(), 10_000, 42)
//!         .await?;
//!
//!     println!("avg cost {:.0}, overall risk {:.0}%",
//!         result.cost.avg, result.risk.overall_risk);
//!     for rec in &result.recommendations {
//!         println!("- {}", rec.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Sensitivity Sweeps
//!
//! ```rust,no_run
//! use dispatch_simulation::{BaseScenario, SimulationBuilder, UncertaintyParameters};
//!
//! #[tokio::main]
//! async fn main() -> dispatch_simulation::Result<()> {
//!     let engine = SimulationBuilder::new().build()?;
//!     let scenario = BaseScenario::new("q3-dispatch");
//!     let sweep = engine
//!         .run_sensitivity(
//!             &scenario,
//!             &UncertaintyParameters::default(),
//!             "transport_delay",
//!             None,
//!             5_000,
//!             42,
//!         )
//!         .await?;
//!     println!("cost elasticity: {:.3}", sweep.elasticity);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod compare;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod recommend;
pub mod risk;
pub mod scenario;
pub mod sensitivity;
pub mod stats;
pub mod types;
pub mod uncertainty;

// Re-exports for ergonomic API
pub use builder::{init_tracing, SimulationBuilder, SimulationConfig, RECOMMENDED_MAX_TRIALS, RECOMMENDED_MIN_TRIALS};
pub use compare::{compare_results, default_directions, ComparisonResult, MetricComparison, MetricDirection};
pub use engine::SimulationEngine;
pub use error::{Result, SimulationError};
pub use evaluator::{BoxedPlanEvaluator, PlanEvaluator, TariffCostModel, TrialOutcome};
pub use metrics::EngineMetrics;
pub use recommend::{Recommendation, RecommendationThresholds, Severity};
pub use risk::{RiskMetrics, RiskThresholds, RiskWeights};
pub use scenario::ScenarioGenerator;
pub use sensitivity::{SensitivityResult, VariationPoint};
pub use stats::{ConfidenceInterval, CostStatistics, HistogramBucket};
pub use types::{BaseScenario, Material, MonteCarloResult, Order, SimulationScenario, TransportRoute};
pub use uncertainty::{UncertaintyParameter, UncertaintyParameters, UncertaintySampler};
