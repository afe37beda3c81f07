//! Summary figures over resolved comparisons

use crate::model::{ComparisonResult, Statistics};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates similarity figures; an empty result set yields zeros
pub fn summarize(results: &[ComparisonResult], total_submissions: usize) -> Statistics {
    if results.is_empty() {
        return Statistics {
            total_submissions,
            ..Statistics::default()
        };
    }

    let mut sum = 0.0;
    let mut max = f64::MIN;
    let mut min = f64::MAX;
    for result in results {
        sum += result.similarity;
        max = max.max(result.similarity);
        min = min.min(result.similarity);
    }

    Statistics {
        total_submissions,
        total_comparisons: results.len(),
        average_similarity: round2(sum / results.len() as f64),
        max_similarity: round2(max),
        min_similarity: round2(min),
    }
}
