//! Mapping engine-reported directory names back to caller identities
//!
//! The engine only knows the staged directory names (`submission_<id>_team_<team>`).
//! Resolution tries, in order:
//!
//! 1. the whole name: exact equality, then a delimited occurrence of a staged name
//! 2. the part before the first `/` or `\`, with the same rules
//! 3. the first number embedded anywhere in the name, taken as a submission id
//!
//! Steps 2 and 3 are degraded: the comparison is still reported but flagged, since the
//! numeric fallback can mis-map names carrying several numbers.

use crate::model::{PairwiseResult, Submission};
use crate::staging::staged_dir_name;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

pub const UNKNOWN_TEAM: &str = "Unknown Team";

/// How an identity was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Exact,
    /// A staged name occurs inside the reported name, delimited by non-alphanumerics
    Substring,
    /// Matched after dropping everything from the first path separator
    StrippedPath,
    /// Best-effort guess from the first embedded number
    NumericToken,
}

impl Resolution {
    pub fn is_degraded(self) -> bool {
        matches!(self, Resolution::StrippedPath | Resolution::NumericToken)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub submission_id: i64,
    pub team_id: Option<i64>,
    pub team_name: String,
    /// Directory name as the engine reported it
    pub reported_name: String,
    pub resolution: Resolution,
}

impl ResolvedIdentity {
    pub fn is_degraded(&self) -> bool {
        self.resolution.is_degraded()
    }
}

#[derive(Debug, Clone)]
struct KnownSubmission {
    name: String,
    submission_id: i64,
    team_id: i64,
    team_name: String,
}

/// Resolves directory names for one request's submissions
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    known: Vec<KnownSubmission>,
}

fn numeric_token_regex() -> &'static Regex {
    static NUMERIC_TOKEN: OnceLock<Regex> = OnceLock::new();
    NUMERIC_TOKEN.get_or_init(|| Regex::new(r"\d+").expect("Invalid numeric token regex"))
}

/// True when `name` occurs in `haystack` with no alphanumeric neighbour on either side
fn contains_delimited(haystack: &str, name: &str) -> bool {
    haystack.match_indices(name).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.map_or(false, |c| c.is_ascii_alphanumeric())
            && !after.map_or(false, |c| c.is_ascii_alphanumeric())
    })
}

impl IdentityResolver {
    pub fn new(submissions: &[Submission]) -> Self {
        let known = submissions
            .iter()
            .map(|s| KnownSubmission {
                name: staged_dir_name(s.submission_id, s.team_id),
                submission_id: s.submission_id,
                team_id: s.team_id,
                team_name: s.team_name.clone(),
            })
            .collect();
        Self { known }
    }

    fn identity(&self, known: &KnownSubmission, reported: &str, resolution: Resolution) -> ResolvedIdentity {
        ResolvedIdentity {
            submission_id: known.submission_id,
            team_id: Some(known.team_id),
            team_name: known.team_name.clone(),
            reported_name: reported.to_string(),
            resolution,
        }
    }

    /// Strict match of a name without path separators
    fn match_primary(&self, candidate: &str) -> Option<(&KnownSubmission, Resolution)> {
        if let Some(known) = self.known.iter().find(|k| k.name == candidate) {
            return Some((known, Resolution::Exact));
        }
        if candidate.contains(['/', '\\']) {
            return None;
        }
        self.known
            .iter()
            .find(|k| contains_delimited(candidate, &k.name))
            .map(|k| (k, Resolution::Substring))
    }

    /// Maps a reported directory name to a caller identity
    pub fn resolve(&self, reported: &str) -> Option<ResolvedIdentity> {
        let trimmed = reported.trim();

        if let Some((known, resolution)) = self.match_primary(trimmed) {
            return Some(self.identity(known, reported, resolution));
        }

        if let Some(separator) = trimmed.find(['/', '\\']) {
            let head = &trimmed[..separator];
            if let Some((known, _)) = self.match_primary(head) {
                warn!(
                    reported,
                    submission_id = known.submission_id,
                    "Resolved identity after stripping path suffix"
                );
                return Some(self.identity(known, reported, Resolution::StrippedPath));
            }
        }

        let token = numeric_token_regex().find(trimmed)?;
        let submission_id = match token.as_str().parse::<i64>() {
            Ok(id) => id,
            Err(_) => {
                warn!(reported, "Embedded number does not fit a submission id");
                return None;
            }
        };
        let known = self.known.iter().find(|k| k.submission_id == submission_id);

        warn!(
            reported,
            submission_id,
            known = known.is_some(),
            "Resolved identity from embedded number; mapping may be ambiguous"
        );

        Some(ResolvedIdentity {
            submission_id,
            team_id: known.map(|k| k.team_id),
            team_name: known
                .map(|k| k.team_name.clone())
                .unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
            reported_name: reported.to_string(),
            resolution: Resolution::NumericToken,
        })
    }

    /// Resolves both sides of a pair; `None` (with a warning) if either side fails
    pub fn resolve_pair(&self, pair: &PairwiseResult) -> Option<(ResolvedIdentity, ResolvedIdentity)> {
        let first = self.resolve(&pair.first_dir);
        let second = self.resolve(&pair.second_dir);

        match (first, second) {
            (Some(first), Some(second)) => Some((first, second)),
            (first, second) => {
                warn!(
                    first = %pair.first_dir,
                    second = %pair.second_dir,
                    first_resolved = first.is_some(),
                    second_resolved = second.is_some(),
                    "Dropping comparison with unresolvable submission"
                );
                None
            }
        }
    }
}
