//! Streaming statistics aggregation for trial outcomes
//!
//! ## Table of Contents
//! - **RunningStats**: Welford accumulator with a parallel merge
//! - **Reservoir**: Fixed-size uniform sample for percentile estimation
//! - **TrialAccumulator**: Per-worker accumulator over trial outcomes
//! - **CostStatistics / HistogramBucket / ConfidenceInterval**: Result types
//!
//! The aggregator consumes a stream of per-trial outcomes without retaining
//! every trial in memory: exact mean/variance/min/max come from Welford
//! accumulators, percentiles and the histogram come from a bounded reservoir
//! sample. Merging is commutative and associative in the counts it tracks, so
//! final statistics do not depend on trial completion order; workers merge in
//! a fixed order to keep floating-point rounding reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::slice::ParallelSliceMut;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::evaluator::TrialOutcome;

/// Streaming mean/variance/min/max over one metric (Welford's method)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStats {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Record one observation
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Merge another accumulator (Chan et al. parallel update)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let total = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / total as f64;
        self.m2 += other.m2
            + delta * delta * self.count as f64 * other.count as f64 / total as f64;
        self.count = total;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Number of observations
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean, or 0 when empty
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance (n - 1 denominator), or 0 below two observations
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Sample standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum observed value, or 0 when empty
    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    /// Maximum observed value, or 0 when empty
    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }
}

/// One retained trial sample (cost, utilization, SLA triple)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialSample {
    /// Trial cost
    pub cost: f64,
    /// Trial utilization percentage
    pub utilization: f64,
    /// Trial SLA compliance percentage
    pub sla_compliance: f64,
}

/// Fixed-capacity uniform reservoir sample over the trial stream
///
/// Owns its RNG so replacement decisions are reproducible; merging two
/// reservoirs weights each side by how many stream items it has seen.
#[derive(Debug, Clone)]
pub struct Reservoir {
    capacity: usize,
    seen: u64,
    samples: Vec<TrialSample>,
    rng: ChaCha8Rng,
}

impl Reservoir {
    /// Create a reservoir with the given capacity and replacement seed
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: 0,
            samples: Vec::with_capacity(capacity.min(4096)),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Offer one sample to the reservoir (Algorithm R)
    pub fn record(&mut self, sample: TrialSample) {
        self.seen += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            let j = self.rng.gen_range(0..self.seen);
            if (j as usize) < self.capacity {
                self.samples[j as usize] = sample;
            }
        }
    }

    /// Merge another reservoir, weighting each side by its stream length
    pub fn merge(&mut self, other: &Reservoir) {
        let total = self.seen + other.seen;
        if other.samples.is_empty() {
            self.seen = total;
            return;
        }
        if self.samples.len() + other.samples.len() <= self.capacity {
            self.samples.extend_from_slice(&other.samples);
            self.seen = total;
            return;
        }

        let mut a = std::mem::take(&mut self.samples);
        let mut b = other.samples.clone();
        let mut wa = self.seen as f64;
        let mut wb = other.seen as f64;
        let mut merged = Vec::with_capacity(self.capacity);
        while merged.len() < self.capacity && (!a.is_empty() || !b.is_empty()) {
            let pick_a = if a.is_empty() {
                false
            } else if b.is_empty() {
                true
            } else {
                self.rng.gen::<f64>() * (wa + wb) < wa
            };
            if pick_a {
                let i = self.rng.gen_range(0..a.len());
                merged.push(a.swap_remove(i));
                wa -= wa / (a.len() + 1) as f64;
            } else {
                let i = self.rng.gen_range(0..b.len());
                merged.push(b.swap_remove(i));
                wb -= wb / (b.len() + 1) as f64;
            }
        }
        self.samples = merged;
        self.seen = total;
    }

    /// Retained samples
    pub fn samples(&self) -> &[TrialSample] {
        &self.samples
    }

    /// Stream items seen so far
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

/// Cost distribution statistics over successful trials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostStatistics {
    /// Mean trial cost
    pub avg: f64,
    /// Minimum trial cost
    pub min: f64,
    /// Maximum trial cost
    pub max: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    /// 5th percentile (from the reservoir sample)
    pub p5: f64,
    /// Median (from the reservoir sample)
    pub p50: f64,
    /// 95th percentile (from the reservoir sample)
    pub p95: f64,
}

/// One fixed-width histogram bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Inclusive lower bound
    pub lower: f64,
    /// Exclusive upper bound (inclusive for the last bucket)
    pub upper: f64,
    /// Samples falling in this bucket
    pub count: u64,
}

/// Empirical confidence interval (percentile method)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound (e.g. 2.5th percentile for a 95% interval)
    pub lower: f64,
    /// Upper bound (e.g. 97.5th percentile)
    pub upper: f64,
    /// Confidence level, e.g. 0.95
    pub level: f64,
}

/// Empirical percentile with linear interpolation over a sorted slice
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

/// Build a fixed-bucket histogram over `[min, max]` from raw values
pub fn histogram(values: &[f64], min: f64, max: f64, buckets: usize) -> Vec<HistogramBucket> {
    let buckets = buckets.max(1);
    if values.is_empty() {
        return Vec::new();
    }
    if max <= min {
        // Degenerate distribution: everything lands in one bucket
        return vec![HistogramBucket {
            lower: min,
            upper: max,
            count: values.len() as u64,
        }];
    }
    let width = (max - min) / buckets as f64;
    let mut counts = vec![0u64; buckets];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(buckets - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBucket {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

/// Per-worker accumulator over a stream of trial outcomes
///
/// Tracks Welford statistics per metric, exact threshold-exceedance counters
/// for the risk calculator, and a reservoir for percentile estimation. Each
/// worker owns one; the engine merges them in worker order.
#[derive(Debug, Clone)]
pub struct TrialAccumulator {
    /// Cost statistics over feasible trials
    pub cost: RunningStats,
    /// Utilization statistics over feasible trials
    pub utilization: RunningStats,
    /// SLA compliance statistics over feasible trials
    pub sla: RunningStats,
    /// Feasible trial count
    pub successful: u64,
    /// Infeasible trial count
    pub failed: u64,
    /// Trials whose cost exceeded the budget (when a budget is set)
    pub cost_over_budget: u64,
    /// Trials whose SLA compliance fell below the floor
    pub sla_below_floor: u64,
    /// Trials whose utilization exceeded the over-capacity ceiling
    pub util_over_ceiling: u64,
    /// Trials whose utilization fell below the under-utilization floor
    pub util_under_floor: u64,
    reservoir: Reservoir,
    budget: Option<f64>,
    sla_floor: f64,
    util_ceiling: f64,
    util_floor: f64,
}

impl TrialAccumulator {
    /// Create an accumulator with the given thresholds and reservoir setup
    pub fn new(
        budget: Option<f64>,
        sla_floor: f64,
        util_ceiling: f64,
        util_floor: f64,
        reservoir_capacity: usize,
        reservoir_seed: u64,
    ) -> Self {
        Self {
            cost: RunningStats::new(),
            utilization: RunningStats::new(),
            sla: RunningStats::new(),
            successful: 0,
            failed: 0,
            cost_over_budget: 0,
            sla_below_floor: 0,
            util_over_ceiling: 0,
            util_under_floor: 0,
            reservoir: Reservoir::new(reservoir_capacity, reservoir_seed),
            budget,
            sla_floor,
            util_ceiling,
            util_floor,
        }
    }

    /// Consume one trial outcome
    pub fn record(&mut self, outcome: &TrialOutcome) {
        if !outcome.feasible {
            self.failed += 1;
            return;
        }
        self.successful += 1;
        self.cost.record(outcome.cost);
        self.utilization.record(outcome.utilization);
        self.sla.record(outcome.sla_compliance);

        if let Some(budget) = self.budget {
            if outcome.cost > budget {
                self.cost_over_budget += 1;
            }
        }
        if outcome.sla_compliance < self.sla_floor {
            self.sla_below_floor += 1;
        }
        if outcome.utilization > self.util_ceiling {
            self.util_over_ceiling += 1;
        } else if outcome.utilization < self.util_floor {
            self.util_under_floor += 1;
        }

        self.reservoir.record(TrialSample {
            cost: outcome.cost,
            utilization: outcome.utilization,
            sla_compliance: outcome.sla_compliance,
        });
    }

    /// Merge another worker's accumulator
    pub fn merge(&mut self, other: &TrialAccumulator) {
        self.cost.merge(&other.cost);
        self.utilization.merge(&other.utilization);
        self.sla.merge(&other.sla);
        self.successful += other.successful;
        self.failed += other.failed;
        self.cost_over_budget += other.cost_over_budget;
        self.sla_below_floor += other.sla_below_floor;
        self.util_over_ceiling += other.util_over_ceiling;
        self.util_under_floor += other.util_under_floor;
        self.reservoir.merge(&other.reservoir);
    }

    /// Total trials consumed
    pub fn total(&self) -> u64 {
        self.successful + self.failed
    }

    /// Budget threshold the exceedance counter was tracked against
    pub fn budget(&self) -> Option<f64> {
        self.budget
    }

    /// Retained reservoir samples
    pub fn samples(&self) -> &[TrialSample] {
        self.reservoir.samples()
    }

    /// Sorted copy of one metric from the reservoir
    pub fn sorted_metric(&self, extract: impl Fn(&TrialSample) -> f64 + Sync) -> Vec<f64> {
        let mut values: Vec<f64> = self.reservoir.samples().iter().map(extract).collect();
        values.par_sort_unstable_by(|a, b| a.total_cmp(b));
        values
    }

    /// Empirical confidence interval for one metric at the given level
    pub fn confidence_interval(
        &self,
        extract: impl Fn(&TrialSample) -> f64 + Sync,
        level: f64,
    ) -> ConfidenceInterval {
        let sorted = self.sorted_metric(extract);
        let tail = (1.0 - level) / 2.0 * 100.0;
        ConfidenceInterval {
            lower: percentile(&sorted, tail),
            upper: percentile(&sorted, 100.0 - tail),
            level,
        }
    }

    /// Finalize cost statistics, failing when no trial succeeded
    pub fn cost_statistics(&self) -> Result<CostStatistics> {
        if self.successful == 0 {
            return Err(SimulationError::insufficient_data(format!(
                "all {} trials were infeasible; no cost distribution exists",
                self.total()
            )));
        }
        let sorted = self.sorted_metric(|s| s.cost);
        Ok(CostStatistics {
            avg: self.cost.mean(),
            min: self.cost.min(),
            max: self.cost.max(),
            std_dev: self.cost.std_dev(),
            p5: percentile(&sorted, 5.0),
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
        })
    }

    /// Fixed-bucket cost histogram over the exact observed range
    pub fn cost_histogram(&self, buckets: usize) -> Vec<HistogramBucket> {
        let costs: Vec<f64> = self.reservoir.samples().iter().map(|s| s.cost).collect();
        histogram(&costs, self.cost.min(), self.cost.max(), buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feasible(cost: f64) -> TrialOutcome {
        TrialOutcome::feasible(cost, 70.0, 95.0)
    }

    #[test]
    fn test_welford_matches_naive() {
        let values = [12.0, 15.5, 9.25, 30.0, 22.5, 18.0, 11.0];
        let mut stats = RunningStats::new();
        for v in values {
            stats.record(v);
        }
        let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
        let var: f64 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (values.len() - 1) as f64;

        assert!((stats.mean() - mean).abs() < 1e-12);
        assert!((stats.variance() - var).abs() < 1e-12);
        assert_eq!(stats.min(), 9.25);
        assert_eq!(stats.max(), 30.0);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let values: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.73).sin() * 50.0 + 100.0).collect();

        let mut whole = RunningStats::new();
        for &v in &values {
            whole.record(v);
        }

        let mut left = RunningStats::new();
        let mut right = RunningStats::new();
        for &v in &values[..400] {
            left.record(v);
        }
        for &v in &values[400..] {
            right.record(v);
        }
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert!((left.mean() - whole.mean()).abs() < 1e-9);
        assert!((left.variance() - whole.variance()).abs() < 1e-6);
    }

    #[test]
    fn test_merge_is_commutative_in_counts() {
        let mut a = RunningStats::new();
        let mut b = RunningStats::new();
        for v in [1.0, 2.0, 3.0] {
            a.record(v);
        }
        for v in [10.0, 20.0] {
            b.record(v);
        }
        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab.count(), ba.count());
        assert!((ab.mean() - ba.mean()).abs() < 1e-12);
        assert!((ab.variance() - ba.variance()).abs() < 1e-9);
    }

    #[test]
    fn test_reservoir_bounded() {
        let mut reservoir = Reservoir::new(100, 7);
        for i in 0..10_000 {
            reservoir.record(TrialSample {
                cost: i as f64,
                utilization: 50.0,
                sla_compliance: 90.0,
            });
        }
        assert_eq!(reservoir.samples().len(), 100);
        assert_eq!(reservoir.seen(), 10_000);
    }

    #[test]
    fn test_reservoir_merge_preserves_counts() {
        let mut a = Reservoir::new(50, 1);
        let mut b = Reservoir::new(50, 2);
        for i in 0..500 {
            a.record(TrialSample {
                cost: i as f64,
                utilization: 0.0,
                sla_compliance: 0.0,
            });
            b.record(TrialSample {
                cost: 1_000.0 + i as f64,
                utilization: 0.0,
                sla_compliance: 0.0,
            });
        }
        a.merge(&b);
        assert_eq!(a.seen(), 1_000);
        assert_eq!(a.samples().len(), 50);
        // Both sides should be represented after a weighted merge
        assert!(a.samples().iter().any(|s| s.cost < 1_000.0));
        assert!(a.samples().iter().any(|s| s.cost >= 1_000.0));
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 100.0);
        assert!((percentile(&sorted, 50.0) - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_buckets() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let hist = histogram(&values, 0.0, 99.0, 10);
        assert_eq!(hist.len(), 10);
        assert_eq!(hist.iter().map(|b| b.count).sum::<u64>(), 100);
        assert_eq!(hist[0].lower, 0.0);
        assert!((hist[9].upper - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let values = vec![5.0; 20];
        let hist = histogram(&values, 5.0, 5.0, 10);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].count, 20);
    }

    #[test]
    fn test_accumulator_counts_and_exceedances() {
        let mut acc = TrialAccumulator::new(Some(100.0), 90.0, 95.0, 30.0, 1_000, 3);
        acc.record(&TrialOutcome::feasible(80.0, 50.0, 95.0));
        acc.record(&TrialOutcome::feasible(120.0, 97.0, 85.0));
        acc.record(&TrialOutcome::feasible(90.0, 20.0, 92.0));
        acc.record(&TrialOutcome::infeasible());

        assert_eq!(acc.total(), 4);
        assert_eq!(acc.successful, 3);
        assert_eq!(acc.failed, 1);
        assert_eq!(acc.cost_over_budget, 1);
        assert_eq!(acc.sla_below_floor, 1);
        assert_eq!(acc.util_over_ceiling, 1);
        assert_eq!(acc.util_under_floor, 1);
    }

    #[test]
    fn test_zero_success_is_insufficient_data() {
        let mut acc = TrialAccumulator::new(None, 90.0, 95.0, 30.0, 100, 0);
        for _ in 0..10 {
            acc.record(&TrialOutcome::infeasible());
        }
        assert!(matches!(
            acc.cost_statistics(),
            Err(SimulationError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_cost_statistics_bounds() {
        let mut acc = TrialAccumulator::new(None, 90.0, 95.0, 30.0, 10_000, 11);
        for i in 0..5_000 {
            acc.record(&feasible(100.0 + (i as f64 * 0.37).sin() * 25.0));
        }
        let stats = acc.cost_statistics().unwrap();
        assert!(stats.min <= stats.avg && stats.avg <= stats.max);
        assert!(stats.p5 <= stats.p50 && stats.p50 <= stats.p95);
        assert!(stats.std_dev >= 0.0);
    }

    #[test]
    fn test_confidence_interval_covers_bulk() {
        let mut acc = TrialAccumulator::new(None, 90.0, 95.0, 30.0, 10_000, 5);
        let values: Vec<f64> = (0..5_000)
            .map(|i| 100.0 + (i as f64 * 0.911).sin() * 30.0)
            .collect();
        for &v in &values {
            acc.record(&feasible(v));
        }
        let interval = acc.confidence_interval(|s| s.cost, 0.95);
        let inside = values
            .iter()
            .filter(|v| **v >= interval.lower && **v <= interval.upper)
            .count() as f64
            / values.len() as f64;
        assert!((0.93..=0.97).contains(&inside), "coverage {inside}");
    }
}
