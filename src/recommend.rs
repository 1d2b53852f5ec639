//! Rule-based recommendation engine
//!
//! Stateless: given the computed risk metrics and run summary, an ordered
//! list of threshold rules emits qualitative guidance, critical-severity
//! rules first. No rule mutates input state.

use serde::{Deserialize, Serialize};

use crate::risk::RiskMetrics;
use crate::stats::CostStatistics;

/// Severity of a recommendation, ordered most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Plan should not ship as-is
    Critical,
    /// Plan needs a mitigation before dispatch
    Warning,
    /// Worth considering, not blocking
    Advisory,
}

/// One piece of qualitative guidance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// How urgent the guidance is
    pub severity: Severity,
    /// Human-readable guidance text
    pub message: String,
}

impl Recommendation {
    fn new(severity: Severity, message: String) -> Self {
        Self { severity, message }
    }
}

/// Thresholds that trigger each recommendation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationThresholds {
    /// Overall risk above which the plan should be deferred
    pub overall_risk: f64,
    /// Cost risk above which a budget contingency is recommended
    pub cost_risk: f64,
    /// Delay risk above which route diversification is recommended
    pub delay_risk: f64,
    /// Average utilization below which load consolidation is recommended
    pub under_utilization: f64,
    /// Infeasibility rate (percent) above which material coverage is flagged
    pub failure_rate: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            overall_risk: 60.0,
            cost_risk: 40.0,
            delay_risk: 20.0,
            under_utilization: 50.0,
            failure_rate: 10.0,
        }
    }
}

/// Summary inputs the rules read alongside the risk metrics
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Cost statistics of the run
    pub cost: CostStatistics,
    /// Average utilization percentage
    pub avg_utilization: f64,
    /// Infeasible trial percentage
    pub failure_rate: f64,
}

/// Rule-based recommendation engine
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    thresholds: RecommendationThresholds,
}

impl RecommendationEngine {
    /// Create an engine with the given thresholds
    pub fn new(thresholds: RecommendationThresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate all rules, returning matches ordered critical-first
    pub fn evaluate(&self, risk: &RiskMetrics, summary: &RunSummary) -> Vec<Recommendation> {
        let t = &self.thresholds;
        let mut out = Vec::new();

        if risk.overall_risk > t.overall_risk {
            out.push(Recommendation::new(
                Severity::Critical,
                format!(
                    "Overall dispatch risk is {:.0}%; defer the plan or rework allocations before committing",
                    risk.overall_risk
                ),
            ));
        }
        if summary.failure_rate > t.failure_rate {
            out.push(Recommendation::new(
                Severity::Warning,
                format!(
                    "{:.1}% of trials were infeasible; revisit material coverage against order volume",
                    summary.failure_rate
                ),
            ));
        }
        if risk.cost_risk > t.cost_risk {
            let contingency = (summary.cost.p95 - summary.cost.avg).max(0.0);
            out.push(Recommendation::new(
                Severity::Warning,
                format!(
                    "Cost exceeds budget in {:.0}% of trials; hold a contingency of {:.0} (p95 minus average cost)",
                    risk.cost_risk, contingency
                ),
            ));
        }
        if risk.delay_risk > t.delay_risk {
            out.push(Recommendation::new(
                Severity::Warning,
                format!(
                    "SLA compliance falls below target in {:.0}% of trials; diversify routes for delay-prone destinations",
                    risk.delay_risk
                ),
            ));
        }
        if summary.avg_utilization < t.under_utilization {
            out.push(Recommendation::new(
                Severity::Advisory,
                format!(
                    "Average equipment utilization is {:.0}%; consolidate loads to free rakes",
                    summary.avg_utilization
                ),
            ));
        }

        if out.is_empty() {
            out.push(Recommendation::new(
                Severity::Advisory,
                "All risk metrics are within configured tolerances; plan is dispatch-ready"
                    .to_string(),
            ));
        }

        // Stable: rules keep their declaration order within a severity
        out.sort_by_key(|r| r.severity);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(avg_utilization: f64, failure_rate: f64) -> RunSummary {
        RunSummary {
            cost: CostStatistics {
                avg: 100_000.0,
                min: 80_000.0,
                max: 150_000.0,
                std_dev: 12_000.0,
                p5: 85_000.0,
                p50: 99_000.0,
                p95: 128_000.0,
            },
            avg_utilization,
            failure_rate,
        }
    }

    fn risk(cost: f64, delay: f64, capacity: f64, overall: f64) -> RiskMetrics {
        RiskMetrics {
            cost_risk: cost,
            delay_risk: delay,
            capacity_risk: capacity,
            overall_risk: overall,
        }
    }

    #[test]
    fn test_quiet_run_gets_dispatch_ready() {
        let engine = RecommendationEngine::default();
        let recs = engine.evaluate(&risk(5.0, 5.0, 5.0, 5.0), &summary(75.0, 1.0));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].severity, Severity::Advisory);
        assert!(recs[0].message.contains("dispatch-ready"));
    }

    #[test]
    fn test_cost_rule_includes_contingency() {
        let engine = RecommendationEngine::default();
        let recs = engine.evaluate(&risk(55.0, 0.0, 0.0, 25.0), &summary(75.0, 1.0));
        let cost_rec = recs
            .iter()
            .find(|r| r.message.contains("contingency"))
            .unwrap();
        // p95 - avg = 28,000
        assert!(cost_rec.message.contains("28000"));
    }

    #[test]
    fn test_critical_rules_come_first() {
        let engine = RecommendationEngine::default();
        let recs = engine.evaluate(&risk(55.0, 35.0, 10.0, 70.0), &summary(30.0, 15.0));
        assert!(recs.len() >= 4);
        assert_eq!(recs[0].severity, Severity::Critical);
        for pair in recs.windows(2) {
            assert!(pair[0].severity <= pair[1].severity);
        }
    }

    #[test]
    fn test_under_utilization_rule() {
        let engine = RecommendationEngine::default();
        let recs = engine.evaluate(&risk(0.0, 0.0, 40.0, 10.0), &summary(35.0, 0.0));
        assert!(recs.iter().any(|r| r.message.contains("consolidate")));
    }
}
