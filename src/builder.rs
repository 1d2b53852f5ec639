//! SimulationBuilder for configuring and constructing engine instances
//!
//! ## Table of Contents
//! - **SimulationBuilder**: Builder pattern for engine configuration
//! - **SimulationConfig**: Complete configuration struct

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::engine::SimulationEngine;
use crate::error::Result;
use crate::evaluator::{BoxedPlanEvaluator, PlanEvaluator, TariffCostModel};
use crate::metrics::EngineMetrics;
use crate::recommend::RecommendationThresholds;
use crate::risk::RiskThresholds;
use crate::SimulationError;

/// Install a global tracing subscriber honoring `RUST_LOG`
///
/// Convenience for binaries and tests; embedders that already configure
/// tracing should skip this. Calling it twice is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Recommended lower bound on trial counts; below this confidence intervals
/// are statistically unreliable
pub const RECOMMENDED_MIN_TRIALS: u64 = 1_000;
/// Recommended upper bound on trial counts; above this marginal precision
/// gain is negligible
pub const RECOMMENDED_MAX_TRIALS: u64 = 50_000;

/// Complete engine configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Worker task count; defaults to available CPU parallelism
    pub workers: usize,
    /// Trials between cancellation checks inside a worker
    pub batch_size: usize,
    /// Cost histogram bucket count
    pub histogram_buckets: usize,
    /// Reservoir capacity for percentile estimation
    pub reservoir_capacity: usize,
    /// Risk thresholds and weights
    pub risk: RiskThresholds,
    /// Recommendation rule thresholds
    pub recommendation: RecommendationThresholds,
    /// Optional wall-clock timeout per run; behaves like cancellation
    pub timeout: Option<Duration>,
    /// Enable Prometheus instrumentation
    pub metrics_enabled: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            batch_size: 256,
            histogram_buckets: 12,
            reservoir_capacity: 10_000,
            risk: RiskThresholds::default(),
            recommendation: RecommendationThresholds::default(),
            timeout: None,
            metrics_enabled: false,
        }
    }
}

impl SimulationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SimulationError::config("workers must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(SimulationError::config("batch_size must be at least 1"));
        }
        if self.histogram_buckets == 0 {
            return Err(SimulationError::config(
                "histogram_buckets must be at least 1",
            ));
        }
        if self.reservoir_capacity == 0 {
            return Err(SimulationError::config(
                "reservoir_capacity must be at least 1",
            ));
        }
        self.risk.validate()
    }
}

/// Builder for constructing [`SimulationEngine`] instances
pub struct SimulationBuilder {
    config: SimulationConfig,
    evaluator: Option<BoxedPlanEvaluator>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
            evaluator: None,
        }
    }

    /// Set the worker task count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the cancellation check batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set the cost histogram bucket count
    pub fn with_histogram_buckets(mut self, buckets: usize) -> Self {
        self.config.histogram_buckets = buckets;
        self
    }

    /// Set the reservoir capacity used for percentile estimation
    pub fn with_reservoir_capacity(mut self, capacity: usize) -> Self {
        self.config.reservoir_capacity = capacity;
        self
    }

    /// Set risk thresholds and weights
    pub fn with_risk_thresholds(mut self, risk: RiskThresholds) -> Self {
        self.config.risk = risk;
        self
    }

    /// Set recommendation rule thresholds
    pub fn with_recommendation_thresholds(
        mut self,
        thresholds: RecommendationThresholds,
    ) -> Self {
        self.config.recommendation = thresholds;
        self
    }

    /// Set a per-run timeout; an elapsed timeout behaves like cancellation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Enable Prometheus instrumentation
    pub fn with_metrics(mut self) -> Self {
        self.config.metrics_enabled = true;
        self
    }

    /// Set the plan evaluator strategy
    pub fn with_evaluator<E: PlanEvaluator + 'static>(mut self, evaluator: E) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Validate the configuration and build the engine
    ///
    /// Falls back to the default [`TariffCostModel`] when no evaluator is
    /// supplied.
    pub fn build(self) -> Result<SimulationEngine> {
        self.config.validate()?;

        let evaluator = self
            .evaluator
            .unwrap_or_else(|| Arc::new(TariffCostModel::default()));

        let metrics = if self.config.metrics_enabled {
            Some(Arc::new(EngineMetrics::new()?))
        } else {
            None
        };

        info!(
            workers = self.config.workers,
            evaluator = evaluator.name(),
            metrics = self.config.metrics_enabled,
            "Simulation engine built"
        );

        Ok(SimulationEngine::new(self.config, evaluator, metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskWeights;

    #[test]
    fn test_default_build() {
        let engine = SimulationBuilder::new().build().unwrap();
        assert!(engine.metrics().is_none());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = SimulationBuilder::new().with_workers(0).build();
        assert!(matches!(result, Err(SimulationError::Config(_))));
    }

    #[test]
    fn test_invalid_risk_weights_rejected() {
        let risk = RiskThresholds::default().with_weights(RiskWeights {
            cost: 0.0,
            delay: 0.0,
            capacity: 0.0,
        });
        let result = SimulationBuilder::new().with_risk_thresholds(risk).build();
        assert!(matches!(result, Err(SimulationError::Config(_))));
    }

    #[test]
    fn test_metrics_enabled() {
        let engine = SimulationBuilder::new().with_metrics().build().unwrap();
        assert!(engine.metrics().is_some());
    }
}
