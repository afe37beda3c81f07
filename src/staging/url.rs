//! Repository URL allow-list

use super::StagingError;
use regex::Regex;
use std::sync::OnceLock;

/// Hosting prefixes accepted without further suffix requirements
const KNOWN_HOSTS: &[&str] = &[
    "https://github.com/",
    "https://gitlab.com/",
    "https://bitbucket.org/",
];

/// Archive suffixes accepted on any HTTPS host
const ARCHIVE_SUFFIXES: &[&str] = &[".zip", ".tar.gz", ".tgz", ".tar"];

fn https_url_regex() -> &'static Regex {
    static HTTPS_URL: OnceLock<Regex> = OnceLock::new();
    HTTPS_URL.get_or_init(|| {
        Regex::new(r"^https://[a-z0-9]([a-z0-9.-]*[a-z0-9])?(:[0-9]{1,5})?/[^\s]+$")
            .expect("Invalid HTTPS URL regex")
    })
}

/// Checks a repository URL against the allow-list without touching the network
///
/// Accepted forms (case-insensitive, surrounding whitespace ignored):
/// - `https://github.com/...`, `https://gitlab.com/...`, `https://bitbucket.org/...`
/// - any HTTPS URL ending in `.git`
/// - any HTTPS URL ending in `.zip`, `.tar.gz`, `.tgz` or `.tar`
pub fn validate_repository_url(url: &str) -> Result<(), StagingError> {
    let normalized = url.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(invalid(url, "URL is empty"));
    }

    if !https_url_regex().is_match(&normalized) {
        return Err(invalid(url, "not a well-formed HTTPS URL"));
    }

    if let Some(host) = KNOWN_HOSTS.iter().find(|h| normalized.starts_with(*h)) {
        let path = normalized[host.len()..].trim_matches('/');
        if path.is_empty() {
            return Err(invalid(url, "missing repository path"));
        }
        return Ok(());
    }

    if normalized.ends_with(".git") {
        return Ok(());
    }

    if ARCHIVE_SUFFIXES.iter().any(|s| normalized.ends_with(s)) {
        return Ok(());
    }

    Err(invalid(
        url,
        "not a recognized hosting URL, .git URL or archive",
    ))
}

fn invalid(url: &str, reason: &str) -> StagingError {
    StagingError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}
