//! Cohort statistics engine.
//!
//! Pure functions over in-memory numeric samples; no I/O and no caching.
//! Reports are regenerated from a fresh cohort snapshot on every request,
//! so everything here is referentially transparent and safe to call
//! concurrently. Percentile ranking and z-scores are undefined below a
//! cohort of two; a degenerate cohort (zero spread) pins the z-score at 0.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Minimum number of valid values for relative statistics to be meaningful.
const MIN_COHORT: usize = 2;

/// Five-number-plus-mean summary of one metric across the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; 0 for a single-value sample.
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    pub count: usize,
}

/// Comparison payload consumed by downstream report rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortComparison {
    pub value: f64,
    pub percentile: Option<f64>,
    pub z_score: Option<f64>,
    pub distribution: Option<DistributionSummary>,
}

impl CohortComparison {
    pub fn compute(value: f64, sample: &[f64]) -> Self {
        Self {
            value,
            percentile: percentile_rank(value, sample),
            z_score: z_score(value, sample),
            distribution: distribution(sample),
        }
    }
}

/// Strict percentile rank of `value` within `sample`: the share of valid
/// values strictly below it, clamped to [0, 100]. `None` when fewer than
/// two valid values remain.
pub fn percentile_rank(value: f64, sample: &[f64]) -> Option<f64> {
    let values = valid(sample);
    if values.len() < MIN_COHORT || !value.is_finite() {
        return None;
    }
    let below = values.iter().filter(|v| **v < value).count();
    let rank = below as f64 / values.len() as f64 * 100.0;
    Some(rank.clamp(0.0, 100.0))
}

/// `(value - mean) / stdev` over the valid sample. 0 when the cohort has no
/// spread; `None` when fewer than two valid values remain.
pub fn z_score(value: f64, sample: &[f64]) -> Option<f64> {
    let values = valid(sample);
    if values.len() < MIN_COHORT || !value.is_finite() {
        return None;
    }
    let mean = mean(&values);
    let stdev = sample_stdev(&values, mean);
    if stdev == 0.0 {
        return Some(0.0);
    }
    Some((value - mean) / stdev)
}

/// Distribution summary over valid values only. `None` for an empty sample
/// rather than fabricated zeros.
pub fn distribution(sample: &[f64]) -> Option<DistributionSummary> {
    let mut values = valid(sample);
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mean = mean(&values);
    let stdev = if values.len() > 1 {
        sample_stdev(&values, mean)
    } else {
        0.0
    };

    Some(DistributionSummary {
        mean,
        median: interpolated_percentile(&values, 50.0),
        stdev,
        min: values[0],
        max: values[values.len() - 1],
        q1: interpolated_percentile(&values, 25.0),
        q3: interpolated_percentile(&values, 75.0),
        count: values.len(),
    })
}

fn valid(sample: &[f64]) -> Vec<f64> {
    sample.iter().copied().filter(|v| v.is_finite()).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_stdev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Linear-interpolation percentile over a sorted sample.
fn interpolated_percentile(sorted: &[f64], p: f64) -> f64 {
    let position = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = position - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Read a nested value by dot-notation path, e.g.
/// `level4_Result.composite_score`.
pub fn nested_value<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Collect one metric across a cohort of evaluation documents, excluding
/// absent and non-numeric entries.
pub fn metric_values(cohort: &[Value], path: &str) -> Vec<f64> {
    cohort
        .iter()
        .filter_map(|document| nested_value(document, path))
        .filter_map(Value::as_f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percentile_is_strict_and_bounded() {
        let sample = [60.0, 70.0, 80.0, 90.0];
        assert_eq!(percentile_rank(85.0, &sample), Some(75.0));
        assert_eq!(percentile_rank(60.0, &sample), Some(0.0));
        assert_eq!(percentile_rank(95.0, &sample), Some(100.0));

        for value in [55.0, 70.0, 99.0] {
            let rank = percentile_rank(value, &sample).expect("cohort large enough");
            assert!((0.0..=100.0).contains(&rank));
        }
    }

    #[test]
    fn percentile_is_undefined_below_two_valid_values() {
        assert_eq!(percentile_rank(80.0, &[]), None);
        assert_eq!(percentile_rank(80.0, &[75.0]), None);
        // Non-finite entries do not count toward the minimum.
        assert_eq!(percentile_rank(80.0, &[75.0, f64::NAN]), None);
    }

    #[test]
    fn z_score_matches_sample_standard_deviation() {
        let sample = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // mean 5, sample stdev ~2.138
        let z = z_score(9.0, &sample).expect("defined");
        assert!((z - 1.8708).abs() < 1e-3);
    }

    #[test]
    fn z_score_is_zero_for_a_degenerate_cohort() {
        assert_eq!(z_score(42.0, &[80.0, 80.0, 80.0]), Some(0.0));
    }

    #[test]
    fn z_score_is_undefined_below_two_valid_values() {
        assert_eq!(z_score(42.0, &[80.0]), None);
    }

    #[test]
    fn distribution_uses_linear_interpolation_quartiles() {
        let summary = distribution(&[1.0, 2.0, 3.0, 4.0]).expect("non-empty");
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.q1, 1.75);
        assert_eq!(summary.q3, 3.25);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
    }

    #[test]
    fn distribution_of_one_value_has_zero_spread() {
        let summary = distribution(&[7.0]).expect("single value still summarized");
        assert_eq!(summary.stdev, 0.0);
        assert_eq!(summary.median, 7.0);
        assert_eq!(summary.q1, 7.0);
        assert_eq!(summary.q3, 7.0);
    }

    #[test]
    fn distribution_of_nothing_is_none() {
        assert_eq!(distribution(&[]), None);
        assert_eq!(distribution(&[f64::NAN]), None);
    }

    #[test]
    fn nested_lookup_follows_dot_paths() {
        let evaluation = json!({
            "level4_Result": { "composite_score": 87.5, "final_decision": "ADMIT" }
        });
        assert_eq!(
            nested_value(&evaluation, "level4_Result.composite_score"),
            Some(&json!(87.5))
        );
        assert_eq!(nested_value(&evaluation, "level4_Result.missing"), None);
        assert_eq!(nested_value(&evaluation, "level1_Result.score"), None);
    }

    #[test]
    fn metric_collection_excludes_absent_and_non_numeric_entries() {
        let cohort = vec![
            json!({ "level4_Result": { "composite_score": 91.0 } }),
            json!({ "level4_Result": { "composite_score": "N/A" } }),
            json!({ "level4_Result": {} }),
            json!({ "level4_Result": { "composite_score": 78.5 } }),
        ];
        assert_eq!(
            metric_values(&cohort, "level4_Result.composite_score"),
            vec![91.0, 78.5]
        );
    }

    #[test]
    fn comparison_bundles_all_three_statistics() {
        let sample = [60.0, 70.0, 80.0, 90.0];
        let comparison = CohortComparison::compute(85.0, &sample);
        assert_eq!(comparison.percentile, Some(75.0));
        assert!(comparison.z_score.is_some());

        // Referential transparency: same inputs, same outputs.
        assert_eq!(comparison, CohortComparison::compute(85.0, &sample));

        assert_eq!(comparison.distribution.expect("non-empty").count, 4);
    }
}
