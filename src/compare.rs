//! Side-by-side comparison of two labeled result metric maps
//!
//! The sign convention per metric is explicit, never inferred: a metric with
//! no configured [`MetricDirection`] gets values and a delta but no winner.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which direction is better for a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricDirection {
    /// Lower values win (costs, risks, failure rates)
    LowerIsBetter,
    /// Higher values win (utilization, SLA compliance)
    HigherIsBetter,
}

/// Comparison of one shared metric key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    /// Metric key
    pub metric: String,
    /// Value on side A
    pub value_a: f64,
    /// Value on side B
    pub value_b: f64,
    /// Signed difference, `value_b - value_a`
    pub delta: f64,
    /// Winning label, `None` on ties or when no direction is configured
    pub winner: Option<String>,
}

/// Result of comparing two labeled metric maps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Label of side A
    pub label_a: String,
    /// Label of side B
    pub label_b: String,
    /// Per-metric comparisons over the shared keys, in key order
    pub metrics: Vec<MetricComparison>,
    /// Label with the most metric wins, `None` on a tie
    pub overall_winner: Option<String>,
}

/// Default direction map covering [`crate::types::MonteCarloResult::metric_map`] keys
pub fn default_directions() -> BTreeMap<String, MetricDirection> {
    let mut map = BTreeMap::new();
    for key in [
        "avg_cost",
        "p95_cost",
        "cost_std_dev",
        "overall_risk",
        "cost_risk",
        "delay_risk",
        "capacity_risk",
        "failure_rate",
    ] {
        map.insert(key.to_string(), MetricDirection::LowerIsBetter);
    }
    for key in ["avg_utilization", "avg_sla_compliance"] {
        map.insert(key.to_string(), MetricDirection::HigherIsBetter);
    }
    map
}

/// Compare two labeled metric maps over their shared keys
pub fn compare_results(
    label_a: impl Into<String>,
    metrics_a: &BTreeMap<String, f64>,
    label_b: impl Into<String>,
    metrics_b: &BTreeMap<String, f64>,
    directions: &BTreeMap<String, MetricDirection>,
) -> ComparisonResult {
    let label_a = label_a.into();
    let label_b = label_b.into();

    let mut metrics = Vec::new();
    let mut wins_a = 0usize;
    let mut wins_b = 0usize;

    for (key, &value_a) in metrics_a {
        let Some(&value_b) = metrics_b.get(key) else {
            continue;
        };
        let winner = directions.get(key).and_then(|direction| {
            if value_a == value_b {
                return None;
            }
            let a_wins = match direction {
                MetricDirection::LowerIsBetter => value_a < value_b,
                MetricDirection::HigherIsBetter => value_a > value_b,
            };
            if a_wins {
                wins_a += 1;
                Some(label_a.clone())
            } else {
                wins_b += 1;
                Some(label_b.clone())
            }
        });
        metrics.push(MetricComparison {
            metric: key.clone(),
            value_a,
            value_b,
            delta: value_b - value_a,
            winner,
        });
    }

    let overall_winner = match wins_a.cmp(&wins_b) {
        std::cmp::Ordering::Greater => Some(label_a.clone()),
        std::cmp::Ordering::Less => Some(label_b.clone()),
        std::cmp::Ordering::Equal => None,
    };

    ComparisonResult {
        label_a,
        label_b,
        metrics,
        overall_winner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_lower_is_better_winner() {
        let a = map(&[("avg_cost", 100.0)]);
        let b = map(&[("avg_cost", 120.0)]);
        let result = compare_results("plan-a", &a, "plan-b", &b, &default_directions());

        assert_eq!(result.metrics.len(), 1);
        assert_eq!(result.metrics[0].delta, 20.0);
        assert_eq!(result.metrics[0].winner.as_deref(), Some("plan-a"));
        assert_eq!(result.overall_winner.as_deref(), Some("plan-a"));
    }

    #[test]
    fn test_higher_is_better_winner() {
        let a = map(&[("avg_sla_compliance", 88.0)]);
        let b = map(&[("avg_sla_compliance", 94.0)]);
        let result = compare_results("plan-a", &a, "plan-b", &b, &default_directions());
        assert_eq!(result.metrics[0].winner.as_deref(), Some("plan-b"));
    }

    #[test]
    fn test_unshared_keys_skipped() {
        let a = map(&[("avg_cost", 100.0), ("only_a", 1.0)]);
        let b = map(&[("avg_cost", 90.0), ("only_b", 2.0)]);
        let result = compare_results("a", &a, "b", &b, &default_directions());
        assert_eq!(result.metrics.len(), 1);
        assert_eq!(result.metrics[0].metric, "avg_cost");
    }

    #[test]
    fn test_unconfigured_direction_has_no_winner() {
        let a = map(&[("custom_metric", 5.0)]);
        let b = map(&[("custom_metric", 9.0)]);
        let result = compare_results("a", &a, "b", &b, &BTreeMap::new());
        assert_eq!(result.metrics[0].winner, None);
        assert_eq!(result.overall_winner, None);
        assert_eq!(result.metrics[0].delta, 4.0);
    }

    #[test]
    fn test_tie_has_no_overall_winner() {
        let a = map(&[("avg_cost", 90.0), ("avg_sla_compliance", 85.0)]);
        let b = map(&[("avg_cost", 100.0), ("avg_sla_compliance", 95.0)]);
        let result = compare_results("a", &a, "b", &b, &default_directions());
        assert_eq!(result.overall_winner, None);
    }

    #[test]
    fn test_equal_values_are_a_tie() {
        let a = map(&[("avg_cost", 100.0)]);
        let b = map(&[("avg_cost", 100.0)]);
        let result = compare_results("a", &a, "b", &b, &default_directions());
        assert_eq!(result.metrics[0].winner, None);
    }
}
