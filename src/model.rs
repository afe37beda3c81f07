//! Request, response and result types exchanged with callers
//!
//! All caller-facing types serialize in camelCase to match the JSON contract of the
//! detection endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One submission to compare, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: i64,
    pub team_id: i64,
    pub team_name: String,
    pub repository_url: String,
    #[serde(default)]
    pub member_names: Vec<String>,
}

impl Submission {
    pub fn new(
        submission_id: i64,
        team_id: i64,
        team_name: impl Into<String>,
        repository_url: impl Into<String>,
    ) -> Self {
        Self {
            submission_id,
            team_id,
            team_name: team_name.into(),
            repository_url: repository_url.into(),
            member_names: Vec::new(),
        }
    }

    pub fn with_members(mut self, members: Vec<String>) -> Self {
        self.member_names = members;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub assignment_id: i64,
    pub assignment_title: String,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

/// Inclusive line span inside a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// A matched region between two files of a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRegion {
    pub first_file: String,
    pub second_file: String,
    pub first_range: LineRange,
    pub second_range: LineRange,
    pub tokens: u32,
}

/// Engine output for one unordered pair of staged directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairwiseResult {
    /// Directory name as reported by the engine
    pub first_dir: String,
    pub second_dir: String,
    /// Full metric set keyed by metric name (e.g. `AVG`, `MAX`)
    pub similarities: BTreeMap<String, f64>,
    pub matched_token_count: u64,
    #[serde(default)]
    pub matches: Vec<MatchedRegion>,
}

/// Name of the metric used as the primary similarity score
pub const PRIMARY_METRIC: &str = "AVG";

impl PairwiseResult {
    pub fn new(first_dir: impl Into<String>, second_dir: impl Into<String>, similarity: f64) -> Self {
        let mut similarities = BTreeMap::new();
        similarities.insert(PRIMARY_METRIC.to_string(), similarity);
        Self {
            first_dir: first_dir.into(),
            second_dir: second_dir.into(),
            similarities,
            matched_token_count: 0,
            matches: Vec::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.similarities.insert(name.into(), value);
        self
    }

    pub fn with_match(mut self, region: MatchedRegion) -> Self {
        self.matched_token_count += u64::from(region.tokens);
        self.matches.push(region);
        self
    }

    /// Primary similarity in 0..=1
    ///
    /// Uses `AVG` when present, otherwise the largest metric that is a fraction.
    pub fn similarity(&self) -> f64 {
        if let Some(avg) = self.similarities.get(PRIMARY_METRIC) {
            return *avg;
        }
        self.similarities
            .values()
            .copied()
            .filter(|v| (0.0..=1.0).contains(v))
            .fold(0.0, f64::max)
    }
}

/// Whether a comparison's identities were resolved strictly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Completed,
    /// At least one side was mapped through a fallback heuristic
    Degraded,
}

/// Caller-facing projection of a pairwise result after identity resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub submission_id1: i64,
    pub submission_id2: i64,
    /// Engine-reported directory names, kept for diagnostics
    pub submission1: String,
    pub submission2: String,
    pub team_name1: String,
    pub team_name2: String,
    pub similarity: f64,
    pub matched_tokens: u64,
    pub status: ComparisonStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_artifact_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_submissions: usize,
    pub total_comparisons: usize,
    pub average_similarity: f64,
    pub max_similarity: f64,
    pub min_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub assignment_id: i64,
    pub assignment_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub success: bool,
    pub message: String,
    pub comparisons: Vec<ComparisonResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

impl AnalysisResponse {
    /// A failed response carrying no results
    pub fn failure(request: &AnalysisRequest, message: impl Into<String>) -> Self {
        Self {
            assignment_id: request.assignment_id,
            assignment_title: request.assignment_title.clone(),
            session_id: None,
            success: false,
            message: message.into(),
            comparisons: Vec::new(),
            statistics: None,
            report_url: None,
        }
    }

    pub fn degraded_count(&self) -> usize {
        self.comparisons
            .iter()
            .filter(|c| c.status == ComparisonStatus::Degraded)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "assignmentId": 7,
            "assignmentTitle": "Linked lists",
            "submissions": [
                {"submissionId": 19, "teamId": 17, "teamName": "Alpha",
                 "repositoryUrl": "https://github.com/a/b", "memberNames": ["ana"]},
                {"submissionId": 20, "teamId": 18, "teamName": "Beta",
                 "repositoryUrl": "https://gitlab.com/c/d"}
            ]
        }"#;

        let request: AnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.assignment_id, 7);
        assert_eq!(request.submissions.len(), 2);
        assert_eq!(request.submissions[0].member_names, vec!["ana"]);
        assert!(request.submissions[1].member_names.is_empty());
    }

    #[test]
    fn test_request_missing_required_field_fails() {
        let json = r#"{"assignmentId": 1, "assignmentTitle": "t",
            "submissions": [{"teamId": 1, "teamName": "x", "repositoryUrl": "u"}]}"#;
        assert!(serde_json::from_str::<AnalysisRequest>(json).is_err());
    }

    #[test]
    fn test_similarity_prefers_avg() {
        let pair = PairwiseResult::new("a", "b", 0.42).with_metric("MAX", 0.9);
        assert_eq!(pair.similarity(), 0.42);
    }

    #[test]
    fn test_similarity_falls_back_to_fractional_max() {
        let mut pair = PairwiseResult::new("a", "b", 0.0);
        pair.similarities.clear();
        pair.similarities.insert("MAX".to_string(), 0.7);
        pair.similarities.insert("LONGEST_MATCH".to_string(), 57.0);
        assert_eq!(pair.similarity(), 0.7);
    }

    #[test]
    fn test_with_match_accumulates_tokens() {
        let region = MatchedRegion {
            first_file: "A.java".to_string(),
            second_file: "B.java".to_string(),
            first_range: LineRange::new(1, 10),
            second_range: LineRange::new(3, 12),
            tokens: 15,
        };
        let pair = PairwiseResult::new("a", "b", 0.5)
            .with_match(region.clone())
            .with_match(region);
        assert_eq!(pair.matched_token_count, 30);
        assert_eq!(pair.matches.len(), 2);
    }

    #[test]
    fn test_response_serializes_camel_case_and_skips_empty() {
        let request = AnalysisRequest {
            assignment_id: 3,
            assignment_title: "Sorting".to_string(),
            submissions: vec![],
        };
        let response = AnalysisResponse::failure(&request, "nope");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["assignmentId"], 3);
        assert_eq!(value["success"], false);
        assert!(value.get("reportUrl").is_none());
        assert!(value.get("statistics").is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let value = serde_json::to_value(ComparisonStatus::Degraded).unwrap();
        assert_eq!(value, "degraded");
    }
}
