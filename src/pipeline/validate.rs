//! Request checks that run before any disk or network I/O

use crate::model::AnalysisRequest;
use std::collections::HashMap;
use thiserror::Error;

pub const MIN_SUBMISSIONS: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least 2 submissions are required")]
    TooFewSubmissions(usize),
    #[error("Too many submissions: {count} (maximum {max})")]
    TooManySubmissions { count: usize, max: usize },
    #[error("Submission {0} has a blank team name")]
    BlankTeamName(i64),
    /// Submission ids must be unique within a request, whatever the team
    #[error("Duplicate submission {submission_id} (teams {first_team_id} and {team_id})")]
    DuplicateSubmissionId {
        submission_id: i64,
        first_team_id: i64,
        team_id: i64,
    },
}

/// Rejects requests the pipeline cannot run
///
/// Repository URLs are not checked here; a bad URL only fails its own submission.
pub fn validate_request(
    request: &AnalysisRequest,
    max_submissions: usize,
) -> Result<(), ValidationError> {
    let count = request.submissions.len();
    if count < MIN_SUBMISSIONS {
        return Err(ValidationError::TooFewSubmissions(count));
    }
    if count > max_submissions {
        return Err(ValidationError::TooManySubmissions {
            count,
            max: max_submissions,
        });
    }

    let mut seen: HashMap<i64, i64> = HashMap::new();
    for submission in &request.submissions {
        if submission.team_name.trim().is_empty() {
            return Err(ValidationError::BlankTeamName(submission.submission_id));
        }
        if let Some(&first_team_id) = seen.get(&submission.submission_id) {
            return Err(ValidationError::DuplicateSubmissionId {
                submission_id: submission.submission_id,
                first_team_id,
                team_id: submission.team_id,
            });
        }
        seen.insert(submission.submission_id, submission.team_id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Submission;

    fn request(submissions: Vec<Submission>) -> AnalysisRequest {
        AnalysisRequest {
            assignment_id: 1,
            assignment_title: "Sorting".to_string(),
            submissions,
        }
    }

    fn submission(id: i64, team: &str) -> Submission {
        Submission::new(id, id + 100, team, "https://github.com/org/repo")
    }

    #[test]
    fn test_accepts_valid_request() {
        let req = request(vec![submission(1, "A"), submission(2, "B")]);
        assert_eq!(validate_request(&req, 10), Ok(()));
    }

    #[test]
    fn test_too_few() {
        let req = request(vec![submission(1, "A")]);
        let err = validate_request(&req, 10).unwrap_err();
        assert_eq!(err, ValidationError::TooFewSubmissions(1));
        assert_eq!(err.to_string(), "At least 2 submissions are required");
    }

    #[test]
    fn test_too_many() {
        let req = request(vec![submission(1, "A"), submission(2, "B"), submission(3, "C")]);
        assert_eq!(
            validate_request(&req, 2),
            Err(ValidationError::TooManySubmissions { count: 3, max: 2 })
        );
    }

    #[test]
    fn test_blank_team_name() {
        let req = request(vec![submission(1, "A"), submission(2, "  ")]);
        assert_eq!(
            validate_request(&req, 10),
            Err(ValidationError::BlankTeamName(2))
        );
    }

    #[test]
    fn test_duplicate_identity() {
        let req = request(vec![submission(1, "A"), submission(1, "A again")]);
        assert_eq!(
            validate_request(&req, 10),
            Err(ValidationError::DuplicateSubmissionId {
                submission_id: 1,
                first_team_id: 101,
                team_id: 101
            })
        );
    }

    #[test]
    fn test_shared_submission_id_across_teams() {
        let req = request(vec![
            Submission::new(5, 1, "TeamOne", "https://github.com/org/one"),
            Submission::new(5, 2, "TeamTwo", "https://github.com/org/two"),
            Submission::new(6, 3, "TeamThree", "https://github.com/org/three"),
        ]);
        let err = validate_request(&req, 10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateSubmissionId {
                submission_id: 5,
                first_team_id: 1,
                team_id: 2
            }
        );
        assert_eq!(err.to_string(), "Duplicate submission 5 (teams 1 and 2)");
    }

    #[test]
    fn test_same_team_with_distinct_submissions_is_valid() {
        let req = request(vec![
            Submission::new(5, 1, "TeamOne", "https://github.com/org/one"),
            Submission::new(6, 1, "TeamOne", "https://github.com/org/one-b"),
        ]);
        assert_eq!(validate_request(&req, 10), Ok(()));
    }
}
