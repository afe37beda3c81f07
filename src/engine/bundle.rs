//! Reading pairwise results out of an engine report bundle
//!
//! Each pair is one `comparisons/<a>-<b>.json` document:
//!
//! ```json
//! {
//!   "firstSubmissionId": "submission_19_team_17",
//!   "secondSubmissionId": "submission_20_team_18",
//!   "similarities": { "AVG": 0.42, "MAX": 0.61, "MAXIMUM_LENGTH": 80, "LONGEST_MATCH": 37 },
//!   "matches": [{
//!     "firstFileName": "src/App.java", "secondFileName": "src/Main.java",
//!     "startInFirst": { "line": 10 }, "endInFirst": { "line": 24 },
//!     "startInSecond": { "line": 3 }, "endInSecond": { "line": 17 },
//!     "tokens": 37
//!   }]
//! }
//! ```

use super::EngineError;
use crate::model::{LineRange, MatchedRegion, PairwiseResult};
use crate::report::{normalize_entry_name, ArchiveReader, ExtractionError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;

const COMPARISONS_DIR: &str = "comparisons";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireComparison {
    first_submission_id: String,
    second_submission_id: String,
    #[serde(default)]
    similarities: BTreeMap<String, f64>,
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMatch {
    first_file_name: String,
    second_file_name: String,
    start_in_first: WirePosition,
    end_in_first: WirePosition,
    start_in_second: WirePosition,
    end_in_second: WirePosition,
    #[serde(default)]
    tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WirePosition {
    line: u32,
}

/// Parses one comparison document
pub fn parse_comparison(json: &[u8]) -> Result<PairwiseResult, serde_json::Error> {
    let wire: WireComparison = serde_json::from_slice(json)?;

    let matches: Vec<MatchedRegion> = wire
        .matches
        .into_iter()
        .map(|m| MatchedRegion {
            first_file: m.first_file_name,
            second_file: m.second_file_name,
            first_range: LineRange::new(m.start_in_first.line, m.end_in_first.line),
            second_range: LineRange::new(m.start_in_second.line, m.end_in_second.line),
            tokens: m.tokens,
        })
        .collect();

    Ok(PairwiseResult {
        first_dir: wire.first_submission_id,
        second_dir: wire.second_submission_id,
        similarities: wire.similarities,
        matched_token_count: matches.iter().map(|m| u64::from(m.tokens)).sum(),
        matches,
    })
}

/// Serializes a result in the engine's comparison document format
pub fn comparison_json(result: &PairwiseResult) -> serde_json::Value {
    let matches: Vec<serde_json::Value> = result
        .matches
        .iter()
        .map(|m| {
            serde_json::json!({
                "firstFileName": m.first_file,
                "secondFileName": m.second_file,
                "startInFirst": { "line": m.first_range.start },
                "endInFirst": { "line": m.first_range.end },
                "startInSecond": { "line": m.second_range.start },
                "endInSecond": { "line": m.second_range.end },
                "tokens": m.tokens,
            })
        })
        .collect();

    serde_json::json!({
        "firstSubmissionId": result.first_dir,
        "secondSubmissionId": result.second_dir,
        "similarities": result.similarities,
        "matches": matches,
    })
}

fn is_comparison_entry(name: &str) -> bool {
    let Ok(Some(path)) = normalize_entry_name(name) else {
        return false;
    };
    let mut components = path.components();
    let in_dir = components
        .next()
        .map(|c| c.as_os_str() == COMPARISONS_DIR)
        .unwrap_or(false);
    in_dir
        && components.count() == 1
        && path.extension().map(|e| e == "json").unwrap_or(false)
}

/// Collects every pairwise result stored in a bundle, in archive order
pub fn read_bundle_results(
    archive: &mut dyn ArchiveReader,
) -> Result<Vec<PairwiseResult>, EngineError> {
    let mut results = Vec::new();
    let mut parse_error: Option<EngineError> = None;

    let read = archive.for_each_entry(&mut |entry| {
        if entry.is_dir || !is_comparison_entry(&entry.name) {
            return Ok(());
        }
        let mut body = Vec::new();
        entry
            .content
            .read_to_end(&mut body)
            .map_err(ExtractionError::Read)?;
        match parse_comparison(&body) {
            Ok(result) => {
                debug!(entry = %entry.name, "Parsed comparison");
                results.push(result);
                Ok(())
            }
            Err(e) => {
                parse_error = Some(EngineError::Bundle(format!("{}: {}", entry.name, e)));
                Err(ExtractionError::UnsupportedEntry {
                    name: entry.name,
                    kind: "malformed comparison".to_string(),
                })
            }
        }
    });

    if let Some(error) = parse_error {
        return Err(error);
    }
    read.map_err(|e| EngineError::Bundle(e.to_string()))?;
    Ok(results)
}
