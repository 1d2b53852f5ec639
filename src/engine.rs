//! Simulation engine: parallel Monte Carlo runs over a worker pool
//!
//! ## Table of Contents
//! - **SimulationEngine**: Main engine struct (build via `SimulationBuilder`)
//! - **run_simulation**: Execute one Monte Carlo run
//! - **run_sensitivity**: Sweep one uncertainty parameter
//!
//! Trials are embarrassingly parallel: indices are partitioned into
//! contiguous chunks across worker tasks, each worker owns a private
//! accumulator and derives a per-trial RNG substream from
//! `seed + trial_index`, and partial accumulators merge in worker order.
//! Statistics are therefore reproducible for a fixed configuration no matter
//! how the scheduler interleaves workers. Workers poll a watch channel
//! between batches for cooperative cancellation; a cancelled run discards
//! its partial accumulators and returns `Cancelled`, never a partial result.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::builder::{SimulationConfig, RECOMMENDED_MAX_TRIALS, RECOMMENDED_MIN_TRIALS};
use crate::error::{Result, SimulationError};
use crate::evaluator::BoxedPlanEvaluator;
use crate::metrics::EngineMetrics;
use crate::recommend::{RecommendationEngine, RunSummary};
use crate::risk::{RiskMetrics, RiskThresholds};
use crate::scenario::ScenarioGenerator;
use crate::sensitivity::{
    default_variation_levels, impact_pct, least_squares_slope, SensitivityResult, VariationPoint,
};
use crate::stats::TrialAccumulator;
use crate::types::{BaseScenario, MonteCarloResult};
use crate::uncertainty::{UncertaintyParameter, UncertaintyParameters, UncertaintySampler};

/// Seed spacing between worker reservoir substreams
const WORKER_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Monte Carlo simulation engine
///
/// Create with [`crate::builder::SimulationBuilder`]. The engine is cheap to
/// share behind an `Arc`; runs do not mutate the caller's scenario and
/// completed results are archived for later inspection.
pub struct SimulationEngine {
    config: SimulationConfig,
    evaluator: BoxedPlanEvaluator,
    metrics: Option<Arc<EngineMetrics>>,
    archive: DashMap<Uuid, MonteCarloResult>,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl SimulationEngine {
    pub(crate) fn new(
        config: SimulationConfig,
        evaluator: BoxedPlanEvaluator,
        metrics: Option<Arc<EngineMetrics>>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            config,
            evaluator,
            metrics,
            archive: DashMap::new(),
            cancel_tx,
            cancel_rx,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Metrics instance, when instrumentation is enabled
    pub fn metrics(&self) -> Option<&Arc<EngineMetrics>> {
        self.metrics.as_ref()
    }

    /// Request cooperative cancellation of in-flight runs
    ///
    /// Workers observe the flag between trial batches; cancelled runs return
    /// [`SimulationError::Cancelled`] and discard partial accumulators. The
    /// flag stays set until [`SimulationEngine::reset`] is called.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Clear a previous cancellation so the engine can run again
    pub fn reset(&self) {
        let _ = self.cancel_tx.send(false);
    }

    /// Whether cancellation is currently requested
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Fetch an archived run result by id
    pub fn archived_result(&self, run_id: &Uuid) -> Option<MonteCarloResult> {
        self.archive.get(run_id).map(|r| r.clone())
    }

    /// Ids of all archived runs
    pub fn archived_run_ids(&self) -> Vec<Uuid> {
        self.archive.iter().map(|entry| *entry.key()).collect()
    }

    /// Execute one Monte Carlo simulation run
    ///
    /// Rejects `trial_count == 0` and invalid parameters synchronously,
    /// before any trial work begins. Trial counts outside the recommended
    /// 1,000-50,000 band are warned about (in the log and on the result),
    /// never blocked. Identical inputs and configuration produce identical
    /// statistics.
    pub async fn run_simulation(
        &self,
        base: &BaseScenario,
        params: &UncertaintyParameters,
        trial_count: u64,
        seed: u64,
    ) -> Result<MonteCarloResult> {
        if trial_count == 0 {
            return Err(SimulationError::config(
                "trial_count must be a positive integer",
            ));
        }
        params.validate()?;
        if self.is_cancelled() {
            return Err(SimulationError::cancelled("cancellation requested"));
        }

        let mut warnings = Vec::new();
        if trial_count < RECOMMENDED_MIN_TRIALS {
            let msg = format!(
                "trial_count {trial_count} is below the recommended minimum of \
                 {RECOMMENDED_MIN_TRIALS}; confidence intervals will be unreliable"
            );
            warn!(scenario = %base.name, "{msg}");
            warnings.push(msg);
        } else if trial_count > RECOMMENDED_MAX_TRIALS {
            let msg = format!(
                "trial_count {trial_count} exceeds the recommended maximum of \
                 {RECOMMENDED_MAX_TRIALS}; marginal precision gain is negligible"
            );
            warn!(scenario = %base.name, "{msg}");
            warnings.push(msg);
        }

        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let budget = self.config.risk.budget.or(base.budget);

        info!(
            run_id = %run_id,
            scenario = %base.name,
            trials = trial_count,
            seed,
            evaluator = self.evaluator.name(),
            "Starting simulation run"
        );

        let merged = self.execute_trials(base, params, trial_count, seed, run_id, budget).await?;

        let cost = merged.cost_statistics()?;
        let cost_histogram = merged.cost_histogram(self.config.histogram_buckets);
        let cost_interval = merged.confidence_interval(|s| s.cost, 0.95);
        let utilization_interval = merged.confidence_interval(|s| s.utilization, 0.95);
        let sla_interval = merged.confidence_interval(|s| s.sla_compliance, 0.95);

        let effective_thresholds = match budget {
            Some(b) => self.config.risk.clone().with_budget(b),
            None => RiskThresholds {
                budget: None,
                ..self.config.risk.clone()
            },
        };
        let risk = RiskMetrics::compute(&merged, &effective_thresholds);

        let failure_rate = merged.failed as f64 / merged.total() as f64 * 100.0;
        let summary = RunSummary {
            cost: cost.clone(),
            avg_utilization: merged.utilization.mean(),
            failure_rate,
        };
        let recommendations = RecommendationEngine::new(self.config.recommendation.clone())
            .evaluate(&risk, &summary);

        let result = MonteCarloResult {
            run_id,
            seed,
            total_scenarios: merged.total(),
            successful_scenarios: merged.successful,
            failed_scenarios: merged.failed,
            cost,
            cost_histogram,
            avg_utilization: merged.utilization.mean(),
            avg_sla_compliance: merged.sla.mean(),
            risk,
            cost_interval,
            utilization_interval,
            sla_interval,
            recommendations,
            warnings,
            completed_at: Utc::now(),
        };

        if let Some(metrics) = &self.metrics {
            metrics
                .simulations_completed
                .with_label_values(&["ok"])
                .inc();
            metrics.trials_evaluated.inc_by(result.total_scenarios as f64);
            metrics
                .trials_infeasible
                .inc_by(result.failed_scenarios as f64);
            metrics
                .simulation_duration
                .observe(start.elapsed().as_secs_f64());
        }

        info!(
            run_id = %run_id,
            successful = result.successful_scenarios,
            failed = result.failed_scenarios,
            avg_cost = result.cost.avg,
            overall_risk = result.risk.overall_risk,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Simulation run complete"
        );

        self.archive.insert(run_id, result.clone());
        Ok(result)
    }

    /// Partition trials across workers, evaluate, and merge in worker order
    async fn execute_trials(
        &self,
        base: &BaseScenario,
        params: &UncertaintyParameters,
        trial_count: u64,
        seed: u64,
        run_id: Uuid,
        budget: Option<f64>,
    ) -> Result<TrialAccumulator> {
        let workers = (self.config.workers as u64).min(trial_count).max(1);
        let chunk = trial_count / workers;
        let remainder = trial_count % workers;

        let base = Arc::new(base.clone());
        let params = Arc::new(params.clone());
        let risk = &self.config.risk;
        let (sla_floor, util_ceiling, util_floor) = (
            risk.sla_floor,
            risk.utilization_ceiling,
            risk.utilization_floor,
        );
        let reservoir_capacity = self.config.reservoir_capacity;
        let batch_size = self.config.batch_size as u64;

        let mut handles = Vec::with_capacity(workers as usize);
        let mut next_start = 0u64;
        for w in 0..workers {
            let len = chunk + u64::from(w < remainder);
            let range = next_start..next_start + len;
            next_start = range.end;

            let base = Arc::clone(&base);
            let params = Arc::clone(&params);
            let evaluator = Arc::clone(&self.evaluator);
            let cancel = self.cancel_rx.clone();
            let reservoir_seed = seed ^ (w + 1).wrapping_mul(WORKER_SEED_STRIDE);

            handles.push(tokio::spawn(async move {
                let generator = ScenarioGenerator::new(&base, &params);
                let mut acc = TrialAccumulator::new(
                    budget,
                    sla_floor,
                    util_ceiling,
                    util_floor,
                    reservoir_capacity,
                    reservoir_seed,
                );
                for (processed, trial_index) in range.enumerate() {
                    if processed as u64 % batch_size == 0 {
                        // Evaluators without internal awaits complete on the
                        // first poll, so yield here to give timers and the
                        // cancellation flag a chance to be observed.
                        tokio::task::yield_now().await;
                        if *cancel.borrow() {
                            return Err(SimulationError::cancelled(format!(
                                "worker {w} stopped after {processed} trials"
                            )));
                        }
                    }
                    let mut sampler =
                        UncertaintySampler::new(seed.wrapping_add(trial_index));
                    let trial = generator.generate(run_id, trial_index, &mut sampler);
                    let outcome = evaluator.evaluate(&base, &trial).await;
                    acc.record(&outcome);
                }
                Ok(acc)
            }));
        }

        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let join = futures::future::join_all(handles);
        let outputs = match self.config.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, join).await {
                Ok(outputs) => outputs,
                Err(_) => {
                    // Partial accumulators are discarded, same contract as
                    // an explicit cancellation.
                    for abort in abort_handles {
                        abort.abort();
                    }
                    if let Some(metrics) = &self.metrics {
                        metrics
                            .simulations_completed
                            .with_label_values(&["timeout"])
                            .inc();
                    }
                    return Err(SimulationError::cancelled(format!(
                        "run exceeded the configured timeout of {timeout:?}"
                    )));
                }
            },
            None => join.await,
        };

        let mut merged: Option<TrialAccumulator> = None;
        for output in outputs {
            let acc = output
                .map_err(|e| SimulationError::internal(format!("worker panicked: {e}")))?
                .map_err(|e| {
                    if let Some(metrics) = &self.metrics {
                        metrics
                            .simulations_completed
                            .with_label_values(&["cancelled"])
                            .inc();
                    }
                    e
                })?;
            match merged.as_mut() {
                Some(m) => m.merge(&acc),
                None => merged = Some(acc),
            }
        }
        merged.ok_or_else(|| SimulationError::internal("no worker produced an accumulator"))
    }

    /// Sweep one uncertainty parameter and measure output elasticity
    ///
    /// Re-executes the full pipeline once per variation level (default
    /// -30%..+30%), holding all other parameters at their nominal
    /// uncertainty and reusing `seed` so runs are paired. Each level's full
    /// result is archived as it completes, so cancelling the sweep leaves
    /// already-finished variation points reportable.
    pub async fn run_sensitivity(
        &self,
        base: &BaseScenario,
        params: &UncertaintyParameters,
        parameter_name: &str,
        variation_levels: Option<Vec<f64>>,
        trial_count: u64,
        seed: u64,
    ) -> Result<SensitivityResult> {
        let parameter: UncertaintyParameter = parameter_name.parse()?;
        params.validate()?;

        let levels = variation_levels.unwrap_or_else(default_variation_levels);
        if levels.is_empty() {
            return Err(SimulationError::config(
                "variation_levels must not be empty",
            ));
        }
        for level in &levels {
            if !level.is_finite() || *level <= -100.0 {
                return Err(SimulationError::config(format!(
                    "variation level {level} is out of range (must be > -100%)"
                )));
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.sensitivity_sweeps.inc();
        }
        info!(
            parameter = %parameter,
            levels = levels.len(),
            trials = trial_count,
            "Starting sensitivity sweep"
        );

        let baseline = self.run_simulation(base, params, trial_count, seed).await?;

        let mut points = Vec::with_capacity(levels.len());
        for &level in &levels {
            // The scaled set is what actually runs (probabilities clamped to
            // [0, 1]), so report the parameter value from it, not the raw
            // nominal-times-factor product.
            let varied = parameter.scaled(params, 1.0 + level / 100.0);
            let result = if level == 0.0 {
                baseline.clone()
            } else {
                self.run_simulation(base, &varied, trial_count, seed).await?
            };
            points.push(VariationPoint {
                level_pct: level,
                parameter_value: parameter.value_of(&varied),
                avg_cost: result.cost.avg,
                cost_impact_pct: impact_pct(result.cost.avg, baseline.cost.avg),
                utilization_impact_pct: impact_pct(
                    result.avg_utilization,
                    baseline.avg_utilization,
                ),
                sla_impact_pct: impact_pct(
                    result.avg_sla_compliance,
                    baseline.avg_sla_compliance,
                ),
            });
        }

        let elasticity = least_squares_slope(
            &points
                .iter()
                .map(|p| (p.level_pct, p.cost_impact_pct))
                .collect::<Vec<_>>(),
        );

        Ok(SensitivityResult {
            parameter,
            baseline_cost: baseline.cost.avg,
            baseline_utilization: baseline.avg_utilization,
            baseline_sla: baseline.avg_sla_compliance,
            points,
            elasticity,
        })
    }
}
