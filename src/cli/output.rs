//! Output formatting for multiple formats
//!
//! Formatters for JSON, YAML and human-readable text. JSON and YAML carry the same
//! camelCase shape callers receive from the service.

use anyhow::{Context, Result};
use std::collections::BTreeMap;

use crate::config::SimcheckConfig;
use crate::model::{AnalysisResponse, ComparisonStatus};
use crate::report::{ExtractionSummary, RiskLevel};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Output formatter for analysis responses
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an analysis response according to the configured format
    pub fn format(&self, response: &AnalysisResponse) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(response)
                .context("Failed to serialize analysis response to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(response)
                .context("Failed to serialize analysis response to YAML"),
            OutputFormat::Human => Ok(self.format_human(response)),
        }
    }

    /// Formats configuration display
    pub fn format_config(&self, config: &SimcheckConfig) -> Result<String> {
        let config_map: BTreeMap<String, String> = config.to_display_map().into_iter().collect();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    /// One-line summary of a bundle extraction
    pub fn format_extraction(&self, summary: &ExtractionSummary) -> String {
        format!(
            "\u{2713} Extracted {} files and {} directories ({} bytes)",
            summary.files, summary.directories, summary.bytes
        )
    }

    fn format_human(&self, response: &AnalysisResponse) -> String {
        let mut output = String::new();

        if response.success {
            output.push_str("\u{2713} Similarity Analysis Result\n");
        } else {
            output.push_str("\u{2717} Similarity Analysis Failed\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!(
            "Assignment:  {} ({})\n",
            response.assignment_title, response.assignment_id
        ));
        if let Some(ref session_id) = response.session_id {
            output.push_str(&format!("Session:     {}\n", session_id));
        }
        output.push_str(&format!("Message:     {}\n\n", response.message));

        if !response.success {
            return output;
        }

        if let Some(ref stats) = response.statistics {
            output.push_str("Statistics:\n");
            output.push_str(&format!(
                "\u{251C}\u{2500} Submissions:  {}\n",
                stats.total_submissions
            ));
            output.push_str(&format!(
                "\u{251C}\u{2500} Comparisons:  {}\n",
                stats.total_comparisons
            ));
            output.push_str(&format!(
                "\u{251C}\u{2500} Average:      {:.2}\n",
                stats.average_similarity
            ));
            output.push_str(&format!(
                "\u{251C}\u{2500} Max:          {:.2}\n",
                stats.max_similarity
            ));
            output.push_str(&format!(
                "\u{2514}\u{2500} Min:          {:.2}\n\n",
                stats.min_similarity
            ));
        }

        if response.comparisons.is_empty() {
            output.push_str("No comparisons above the similarity threshold.\n");
        } else {
            output.push_str("Comparisons:\n");
            for comparison in &response.comparisons {
                let marker = match comparison.status {
                    ComparisonStatus::Completed => "",
                    ComparisonStatus::Degraded => " \u{26A0} degraded",
                };
                output.push_str(&format!(
                    "  {:>5.1}%  {} ({}) \u{2194} {} ({})  [{}]{}\n",
                    comparison.similarity * 100.0,
                    comparison.team_name1,
                    comparison.submission_id1,
                    comparison.team_name2,
                    comparison.submission_id2,
                    RiskLevel::from_similarity(comparison.similarity).label(),
                    marker
                ));
            }
        }

        if let Some(ref url) = response.report_url {
            output.push_str(&format!("\nReport: {}\n", url));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComparisonResult, Statistics};

    fn create_test_response() -> AnalysisResponse {
        AnalysisResponse {
            assignment_id: 7,
            assignment_title: "Linked lists".to_string(),
            session_id: Some("3f2b8c1e-9a4d-4e6f-8b7a-1c2d3e4f5a6b".to_string()),
            success: true,
            message: "Plagiarism analysis completed successfully".to_string(),
            comparisons: vec![ComparisonResult {
                submission_id1: 19,
                submission_id2: 20,
                submission1: "submission_19_team_17".to_string(),
                submission2: "submission_20_team_18".to_string(),
                team_name1: "Alpha".to_string(),
                team_name2: "Beta".to_string(),
                similarity: 0.85,
                matched_tokens: 120,
                status: ComparisonStatus::Degraded,
                comparison_artifact_url: Some("/reports/comparison/s/19-20.html".to_string()),
            }],
            statistics: Some(Statistics {
                total_submissions: 2,
                total_comparisons: 1,
                average_similarity: 0.85,
                max_similarity: 0.85,
                min_similarity: 0.85,
            }),
            report_url: Some("/reports/viewer/s".to_string()),
        }
    }

    #[test]
    fn test_json_format() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format(&create_test_response()).unwrap();

        assert!(output.contains("\"assignmentId\": 7"));
        assert!(output.contains("\"status\": \"degraded\""));

        let parsed: AnalysisResponse = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, create_test_response());
    }

    #[test]
    fn test_yaml_format() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format(&create_test_response()).unwrap();

        assert!(output.contains("teamName1: Alpha"));
        let parsed: AnalysisResponse = serde_yaml::from_str(&output).unwrap();
        assert_eq!(parsed.comparisons.len(), 1);
    }

    #[test]
    fn test_human_format() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format(&create_test_response()).unwrap();

        assert!(output.contains("Similarity Analysis Result"));
        assert!(output.contains("Linked lists (7)"));
        assert!(output.contains("Comparisons:  1"));
        assert!(output.contains("85.0%"));
        assert!(output.contains("Alpha (19)"));
        assert!(output.contains("High risk"));
        assert!(output.contains("degraded"));
        assert!(output.contains("Report: /reports/viewer/s"));
    }

    #[test]
    fn test_human_format_failure() {
        let mut response = create_test_response();
        response.success = false;
        response.message = "At least 2 submissions are required".to_string();
        response.comparisons.clear();
        response.statistics = None;

        let output = OutputFormatter::new(OutputFormat::Human)
            .format(&response)
            .unwrap();

        assert!(output.contains("Similarity Analysis Failed"));
        assert!(output.contains("At least 2 submissions are required"));
        assert!(!output.contains("Statistics:"));
    }

    #[test]
    fn test_config_json_is_sorted() {
        let config = SimcheckConfig::default();
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_config(&config)
            .unwrap();

        let parsed: BTreeMap<String, String> = serde_json::from_str(&output).unwrap();
        assert!(parsed.contains_key("engine_command"));
        assert!(output.find("clone_timeout_secs") < output.find("temp_dir"));
    }
}
