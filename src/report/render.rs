//! Stand-alone comparison documents
//!
//! One HTML page per analyzed pair, named `<lowId>-<highId>.html` after the resolved
//! submission ids so callers can address it without knowing engine directory names.

use super::ReportError;
use crate::identity::ResolvedIdentity;
use crate::model::{LineRange, MatchedRegion, PairwiseResult};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Similarity bands shown on a comparison document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    None,
}

impl RiskLevel {
    pub fn from_similarity(similarity: f64) -> Self {
        if similarity >= 0.8 {
            RiskLevel::High
        } else if similarity >= 0.5 {
            RiskLevel::Medium
        } else if similarity >= 0.3 {
            RiskLevel::Low
        } else {
            RiskLevel::None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::High => "High risk",
            RiskLevel::Medium => "Medium risk",
            RiskLevel::Low => "Low risk",
            RiskLevel::None => "No risk",
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
            RiskLevel::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub path: PathBuf,
}

/// Writes comparison documents under `<root>/<sessionId>/`
#[derive(Debug, Clone)]
pub struct ComparisonRenderer {
    root: PathBuf,
    max_matches: usize,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_range(range: &LineRange) -> String {
    format!("{}-{}", range.start, range.end)
}

/// Orders a pair so the lower submission id comes first
fn canonical<'a>(
    pair: &PairwiseResult,
    first: &'a ResolvedIdentity,
    second: &'a ResolvedIdentity,
) -> (&'a ResolvedIdentity, &'a ResolvedIdentity, Vec<MatchedRegion>) {
    if first.submission_id <= second.submission_id {
        (first, second, pair.matches.clone())
    } else {
        let swapped = pair
            .matches
            .iter()
            .map(|m| MatchedRegion {
                first_file: m.second_file.clone(),
                second_file: m.first_file.clone(),
                first_range: m.second_range,
                second_range: m.first_range,
                tokens: m.tokens,
            })
            .collect();
        (second, first, swapped)
    }
}

impl ComparisonRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_matches: 100,
        }
    }

    pub fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = max_matches;
        self
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    /// Deterministic document name for a pair of submission ids
    pub fn file_name(id1: i64, id2: i64) -> String {
        format!("{}-{}.html", id1.min(id2), id1.max(id2))
    }

    /// Renders and writes the document for one pair
    pub fn render(
        &self,
        session_id: &str,
        pair: &PairwiseResult,
        first: &ResolvedIdentity,
        second: &ResolvedIdentity,
    ) -> Result<RenderedDocument, ReportError> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).map_err(|source| ReportError::Write {
            path: dir.clone(),
            source,
        })?;

        let file_name = Self::file_name(first.submission_id, second.submission_id);
        let path = dir.join(&file_name);
        let html = self.document(session_id, pair, first, second);

        write_atomically(&path, &html)?;
        debug!(session_id, document = %file_name, "Rendered comparison document");

        Ok(RenderedDocument { file_name, path })
    }

    /// Renders every pair; a failure is logged and reported in place, never fatal
    pub fn render_all<'a, I>(
        &self,
        session_id: &str,
        pairs: I,
    ) -> Vec<Result<RenderedDocument, ReportError>>
    where
        I: IntoIterator<Item = (&'a PairwiseResult, &'a ResolvedIdentity, &'a ResolvedIdentity)>,
    {
        pairs
            .into_iter()
            .map(|(pair, first, second)| {
                let result = self.render(session_id, pair, first, second);
                if let Err(ref e) = result {
                    warn!(
                        session_id,
                        first = first.submission_id,
                        second = second.submission_id,
                        error = %e,
                        "Failed to render comparison document"
                    );
                }
                result
            })
            .collect()
    }

    fn document(
        &self,
        session_id: &str,
        pair: &PairwiseResult,
        first: &ResolvedIdentity,
        second: &ResolvedIdentity,
    ) -> String {
        let (left, right, mut matches) = canonical(pair, first, second);
        matches.sort_by(|a, b| {
            (&a.first_file, &a.second_file, a.first_range, a.second_range).cmp(&(
                &b.first_file,
                &b.second_file,
                b.first_range,
                b.second_range,
            ))
        });
        let total_matches = matches.len();
        matches.truncate(self.max_matches);

        let similarity = pair.similarity();
        let risk = RiskLevel::from_similarity(similarity);
        let title = format!(
            "Comparison {} vs {}",
            left.submission_id, right.submission_id
        );

        let mut html = String::new();
        let _ = writeln!(html, "<!DOCTYPE html>");
        let _ = writeln!(html, "<html lang=\"en\">");
        let _ = writeln!(html, "<head>");
        let _ = writeln!(html, "<meta charset=\"utf-8\">");
        let _ = writeln!(html, "<title>{}</title>", escape_html(&title));
        let _ = writeln!(html, "<style>{}</style>", STYLE);
        let _ = writeln!(html, "</head>");
        let _ = writeln!(html, "<body>");
        let _ = writeln!(html, "<h1>{}</h1>", escape_html(&title));
        let _ = writeln!(
            html,
            "<p class=\"session\">Session {}</p>",
            escape_html(session_id)
        );

        let _ = writeln!(html, "<section class=\"identities\">");
        for identity in [left, right] {
            let _ = writeln!(html, "<div class=\"identity\">");
            let _ = writeln!(
                html,
                "<h2>Submission {}</h2>",
                identity.submission_id
            );
            let _ = writeln!(
                html,
                "<p><strong>Team:</strong> {}</p>",
                escape_html(&identity.team_name)
            );
            if let Some(team_id) = identity.team_id {
                let _ = writeln!(html, "<p><strong>Team id:</strong> {}</p>", team_id);
            }
            let _ = writeln!(
                html,
                "<p><strong>Directory:</strong> <code>{}</code></p>",
                escape_html(&identity.reported_name)
            );
            if identity.is_degraded() {
                let _ = writeln!(
                    html,
                    "<p class=\"degraded\">Identity recovered heuristically ({:?})</p>",
                    identity.resolution
                );
            }
            let _ = writeln!(html, "</div>");
        }
        let _ = writeln!(html, "</section>");

        let _ = writeln!(
            html,
            "<section class=\"metrics risk-{}\">",
            risk.css_class()
        );
        let _ = writeln!(
            html,
            "<h2>Similarity {:.1}% <span class=\"badge\">{}</span></h2>",
            similarity * 100.0,
            risk.label()
        );
        let _ = writeln!(html, "<table><thead><tr><th>Metric</th><th>Value</th></tr></thead><tbody>");
        for (name, value) in &pair.similarities {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(name),
                format_metric(*value)
            );
        }
        let _ = writeln!(
            html,
            "<tr><td>Matched tokens</td><td>{}</td></tr>",
            pair.matched_token_count
        );
        let _ = writeln!(html, "</tbody></table>");
        let _ = writeln!(html, "</section>");

        let _ = writeln!(html, "<section class=\"matches\">");
        let _ = writeln!(html, "<h2>Matches ({})</h2>", total_matches);
        if matches.is_empty() {
            let _ = writeln!(html, "<p class=\"empty\">No matches found.</p>");
        }

        let mut current: Option<(&str, &str)> = None;
        for region in &matches {
            let files = (region.first_file.as_str(), region.second_file.as_str());
            if current != Some(files) {
                if current.is_some() {
                    let _ = writeln!(html, "</tbody></table>");
                }
                let _ = writeln!(
                    html,
                    "<h3><code>{}</code> &harr; <code>{}</code></h3>",
                    escape_html(files.0),
                    escape_html(files.1)
                );
                let _ = writeln!(
                    html,
                    "<table><thead><tr><th>Lines {}</th><th>Lines {}</th><th>Tokens</th></tr></thead><tbody>",
                    left.submission_id, right.submission_id
                );
                current = Some(files);
            }
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                format_range(&region.first_range),
                format_range(&region.second_range),
                region.tokens
            );
        }
        if current.is_some() {
            let _ = writeln!(html, "</tbody></table>");
        }
        if total_matches > matches.len() {
            let _ = writeln!(
                html,
                "<p class=\"truncated\">{} more matches not shown.</p>",
                total_matches - matches.len()
            );
        }
        let _ = writeln!(html, "</section>");
        let _ = writeln!(html, "</body>");
        let _ = writeln!(html, "</html>");
        html
    }
}

/// Fractions as percentages, token counts as integers
fn format_metric(value: f64) -> String {
    if (0.0..=1.0).contains(&value) {
        format!("{:.1}%", value * 100.0)
    } else {
        format!("{:.0}", value)
    }
}

fn write_atomically(path: &Path, content: &str) -> Result<(), ReportError> {
    let tmp = path.with_extension("html.tmp");
    fs::write(&tmp, content).map_err(|source| ReportError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
.identities{display:flex;gap:2em}\
.identity{background:#f6f8fa;border-radius:8px;padding:1em;flex:1}\
.degraded{color:#b35c00}\
table{border-collapse:collapse;margin-bottom:1em}\
td,th{border:1px solid #ddd;padding:4px 10px;text-align:left}\
.badge{font-size:.6em;padding:2px 8px;border-radius:8px;background:#eee}\
.risk-high h2{color:#c0392b}.risk-medium h2{color:#d68910}\
.risk-low h2{color:#2874a6}.risk-none h2{color:#1e8449}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Resolution;
    use tempfile::TempDir;

    fn identity(id: i64, team: &str, resolution: Resolution) -> ResolvedIdentity {
        ResolvedIdentity {
            submission_id: id,
            team_id: Some(id + 100),
            team_name: team.to_string(),
            reported_name: format!("submission_{}_team_{}", id, id + 100),
            resolution,
        }
    }

    fn region(first: &str, second: &str, start: u32, tokens: u32) -> MatchedRegion {
        MatchedRegion {
            first_file: first.to_string(),
            second_file: second.to_string(),
            first_range: LineRange::new(start, start + 5),
            second_range: LineRange::new(start + 1, start + 6),
            tokens,
        }
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_similarity(0.95), RiskLevel::High);
        assert_eq!(RiskLevel::from_similarity(0.8), RiskLevel::High);
        assert_eq!(RiskLevel::from_similarity(0.5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_similarity(0.3), RiskLevel::Low);
        assert_eq!(RiskLevel::from_similarity(0.1), RiskLevel::None);
    }

    #[test]
    fn test_file_name_is_canonical() {
        assert_eq!(ComparisonRenderer::file_name(20, 19), "19-20.html");
        assert_eq!(ComparisonRenderer::file_name(19, 20), "19-20.html");
    }

    #[test]
    fn test_render_writes_document() {
        let temp = TempDir::new().unwrap();
        let renderer = ComparisonRenderer::new(temp.path());
        let pair = PairwiseResult::new("submission_20_team_120", "submission_19_team_119", 0.42)
            .with_metric("MAX", 0.61)
            .with_metric("LONGEST_MATCH", 37.0)
            .with_match(region("B.java", "A.java", 10, 20));

        let doc = renderer
            .render(
                "session-1",
                &pair,
                &identity(20, "Beta <b>", Resolution::Exact),
                &identity(19, "Alpha", Resolution::StrippedPath),
            )
            .unwrap();

        assert_eq!(doc.file_name, "19-20.html");
        assert_eq!(doc.path, temp.path().join("session-1/19-20.html"));
        let html = fs::read_to_string(&doc.path).unwrap();
        assert!(html.contains("Submission 19"));
        assert!(html.contains("Beta &lt;b&gt;"));
        assert!(!html.contains("Beta <b>"));
        assert!(html.contains("LONGEST_MATCH"));
        assert!(html.contains("61.0%"));
        assert!(html.contains("42.0%"));
        assert!(html.contains("Identity recovered heuristically"));
        // sides are swapped so the lower id comes first
        assert!(html.contains("<code>A.java</code> &harr; <code>B.java</code>"));
        assert!(html.contains("<td>11-16</td><td>10-15</td><td>20</td>"));
        assert!(!temp.path().join("session-1/19-20.html.tmp").exists());
    }

    #[test]
    fn test_matches_are_sorted_grouped_and_bounded() {
        let temp = TempDir::new().unwrap();
        let renderer = ComparisonRenderer::new(temp.path()).with_max_matches(3);
        let pair = PairwiseResult::new("a", "b", 0.9)
            .with_match(region("Z.java", "Z.java", 50, 12))
            .with_match(region("A.java", "A.java", 40, 12))
            .with_match(region("A.java", "A.java", 5, 12))
            .with_match(region("M.java", "M.java", 1, 12));

        let doc = renderer
            .render(
                "s",
                &pair,
                &identity(1, "One", Resolution::Exact),
                &identity(2, "Two", Resolution::Exact),
            )
            .unwrap();
        let html = fs::read_to_string(doc.path).unwrap();

        let a = html.find("<code>A.java</code>").unwrap();
        let m = html.find("<code>M.java</code>").unwrap();
        assert!(a < m);
        assert!(!html.contains("<code>Z.java</code>"));
        assert!(html.find("<td>5-10</td>").unwrap() < html.find("<td>40-45</td>").unwrap());
        assert_eq!(html.matches("<code>A.java</code> &harr;").count(), 1);
        assert!(html.contains("1 more matches not shown."));
        assert!(html.contains("Matches (4)"));
    }

    #[test]
    fn test_render_all_continues_past_failures() {
        let temp = TempDir::new().unwrap();
        // A file where the session directory should be makes that session unwritable
        fs::write(temp.path().join("blocked"), "x").unwrap();
        let renderer = ComparisonRenderer::new(temp.path());
        let pair = PairwiseResult::new("a", "b", 0.5);
        let one = identity(1, "One", Resolution::Exact);
        let two = identity(2, "Two", Resolution::Exact);

        let blocked = renderer.render_all("blocked", vec![(&pair, &one, &two)]);
        let fine = renderer.render_all("open", vec![(&pair, &one, &two), (&pair, &two, &one)]);

        assert!(blocked[0].is_err());
        assert_eq!(fine.len(), 2);
        assert!(fine.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_empty_matches_message() {
        let temp = TempDir::new().unwrap();
        let renderer = ComparisonRenderer::new(temp.path());
        let pair = PairwiseResult::new("a", "b", 0.0);
        let doc = renderer
            .render(
                "s",
                &pair,
                &identity(3, "Three", Resolution::Exact),
                &identity(4, "Four", Resolution::Exact),
            )
            .unwrap();
        let html = fs::read_to_string(doc.path).unwrap();
        assert!(html.contains("No matches found."));
    }
}
