//! Prometheus instrumentation for the simulation engine
//!
//! ## Table of Contents
//! - **EngineMetrics**: Counters and histograms over engine activity

use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry};

use crate::error::Result;

/// Core metrics for the simulation engine
pub struct EngineMetrics {
    registry: Registry,

    /// Completed simulation runs by terminal status
    pub simulations_completed: CounterVec,
    /// Total trials evaluated across all runs
    pub trials_evaluated: Counter,
    /// Trials whose plan was infeasible
    pub trials_infeasible: Counter,
    /// Wall-clock duration of simulation runs
    pub simulation_duration: Histogram,
    /// Sensitivity sweeps started
    pub sensitivity_sweeps: Counter,
}

impl EngineMetrics {
    /// Create a new metrics instance with its own registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let simulations_completed = CounterVec::new(
            Opts::new(
                "dispatch_simulations_completed_total",
                "Completed simulation runs by status",
            ),
            &["status"],
        )?;
        let trials_evaluated = Counter::new(
            "dispatch_trials_evaluated_total",
            "Total trials evaluated",
        )?;
        let trials_infeasible = Counter::new(
            "dispatch_trials_infeasible_total",
            "Trials with an infeasible plan",
        )?;
        let simulation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "dispatch_simulation_duration_seconds",
                "Simulation run duration",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        let sensitivity_sweeps = Counter::new(
            "dispatch_sensitivity_sweeps_total",
            "Sensitivity sweeps started",
        )?;

        registry.register(Box::new(simulations_completed.clone()))?;
        registry.register(Box::new(trials_evaluated.clone()))?;
        registry.register(Box::new(trials_infeasible.clone()))?;
        registry.register(Box::new(simulation_duration.clone()))?;
        registry.register(Box::new(sensitivity_sweeps.clone()))?;

        Ok(Self {
            registry,
            simulations_completed,
            trials_evaluated,
            trials_infeasible,
            simulation_duration,
            sensitivity_sweeps,
        })
    }

    /// Get the Prometheus registry for export
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_count() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.trials_evaluated.inc_by(100.0);
        metrics.trials_infeasible.inc_by(3.0);
        metrics
            .simulations_completed
            .with_label_values(&["ok"])
            .inc();

        let families = metrics.registry().gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "dispatch_trials_evaluated_total"));
    }
}
