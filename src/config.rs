//! Configuration management for simcheck
//!
//! Settings are loaded from environment variables with sensible defaults. They cover
//! where sessions and reports live on disk, how the similarity engine is invoked, and
//! the limits applied to incoming requests.
//!
//! # Environment Variables
//!
//! ## Storage
//! - `SIMCHECK_TEMP_DIR`: Root for per-session workspaces - default: system temp dir + "simcheck"
//! - `SIMCHECK_REPORTS_DIR`: Where unpacked report bundles are kept - default: "reports"
//! - `SIMCHECK_COMPARISONS_DIR`: Where per-pair comparison documents are kept - default: "comparisons"
//! - `SIMCHECK_PUBLIC_BASE_URL`: Prefix for report URLs handed to callers - default: "/reports"
//!
//! ## Engine
//! - `SIMCHECK_ENGINE_COMMAND`: Program that runs the similarity pass - default: "jplag"
//! - `SIMCHECK_ENGINE_ARGS`: Extra whitespace-separated arguments - default: none
//! - `SIMCHECK_MIN_TOKEN_MATCH`: Minimum token run length for a match - default: "12"
//! - `SIMCHECK_SIMILARITY_THRESHOLD`: Reporting floor in 0..=1 - default: "0.0"
//! - `SIMCHECK_MAX_COMPARISONS`: Comparison cap, negative for unbounded - default: "-1"
//! - `SIMCHECK_FILE_SUFFIXES`: Comma-separated source suffixes - default: ".java"
//! - `SIMCHECK_ENGINE_TIMEOUT`: Engine timeout in seconds - default: "600"
//!
//! ## Staging and requests
//! - `SIMCHECK_CLONE_TIMEOUT`: Per-repository clone timeout in seconds - default: "120"
//! - `SIMCHECK_STAGING_CONCURRENCY`: Parallel clones per session - default: "4"
//! - `SIMCHECK_MAX_SUBMISSIONS`: Submissions accepted per request - default: "100"
//! - `SIMCHECK_MAX_MATCHES_PER_DOCUMENT`: Match rows per comparison document - default: "100"
//! - `SIMCHECK_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use simcheck::SimcheckConfig;
//!
//! let config = SimcheckConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::engine::EngineConfig;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_REPORTS_DIR: &str = "reports";
const DEFAULT_COMPARISONS_DIR: &str = "comparisons";
const DEFAULT_PUBLIC_BASE_URL: &str = "/reports";
const DEFAULT_ENGINE_COMMAND: &str = "jplag";
const DEFAULT_MIN_TOKEN_MATCH: u32 = 12;
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.0;
const DEFAULT_FILE_SUFFIXES: &str = ".java";
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_STAGING_CONCURRENCY: usize = 4;
const DEFAULT_MAX_SUBMISSIONS: usize = 100;
const DEFAULT_MAX_MATCHES_PER_DOCUMENT: usize = 100;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Main configuration structure for simcheck
///
/// `Default::default()` reads `SIMCHECK_*` environment variables and falls back to
/// built-in defaults for anything missing or unparsable.
#[derive(Debug, Clone)]
pub struct SimcheckConfig {
    /// Root under which each session allocates its private directory
    pub temp_dir: PathBuf,

    /// Directory holding unpacked report bundles, one per session
    pub reports_dir: PathBuf,

    /// Directory holding rendered comparison documents, one folder per session
    pub comparisons_dir: PathBuf,

    /// URL prefix used for report and comparison links
    pub public_base_url: String,

    /// External program implementing the similarity pass
    pub engine_command: String,

    /// Arguments passed to the engine before the generated ones
    pub engine_args: Vec<String>,

    pub min_token_match: u32,

    /// Pairs below this similarity are not reported (0 reports everything)
    pub similarity_threshold: f64,

    /// `None` means unbounded
    pub max_comparisons: Option<u32>,

    /// Source file suffixes kept during staging and handed to the engine
    pub file_suffixes: Vec<String>,

    pub engine_timeout_secs: u64,

    pub clone_timeout_secs: u64,

    /// Upper bound on concurrent clones within one session
    pub staging_concurrency: usize,

    /// Upper bound on submissions per request
    pub max_submissions: usize,

    /// Upper bound on match rows rendered in one comparison document
    pub max_matches_per_document: usize,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for SimcheckConfig {
    fn default() -> Self {
        let temp_dir = env::var("SIMCHECK_TEMP_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("simcheck"));

        let reports_dir = env::var("SIMCHECK_REPORTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORTS_DIR));

        let comparisons_dir = env::var("SIMCHECK_COMPARISONS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_COMPARISONS_DIR));

        let public_base_url = env::var("SIMCHECK_PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string());

        let engine_command = env::var("SIMCHECK_ENGINE_COMMAND")
            .unwrap_or_else(|_| DEFAULT_ENGINE_COMMAND.to_string());

        let engine_args = env::var("SIMCHECK_ENGINE_ARGS")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let min_token_match = env::var("SIMCHECK_MIN_TOKEN_MATCH")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MIN_TOKEN_MATCH);

        let similarity_threshold = env::var("SIMCHECK_SIMILARITY_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);

        // Negative values (the conventional -1) mean no cap
        let max_comparisons = env::var("SIMCHECK_MAX_COMPARISONS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|v| u32::try_from(v).ok());

        let file_suffixes = parse_suffixes(
            &env::var("SIMCHECK_FILE_SUFFIXES")
                .unwrap_or_else(|_| DEFAULT_FILE_SUFFIXES.to_string()),
        );

        let engine_timeout_secs = env::var("SIMCHECK_ENGINE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_ENGINE_TIMEOUT_SECS);

        let clone_timeout_secs = env::var("SIMCHECK_CLONE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CLONE_TIMEOUT_SECS);

        let staging_concurrency = env::var("SIMCHECK_STAGING_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_STAGING_CONCURRENCY);

        let max_submissions = env::var("SIMCHECK_MAX_SUBMISSIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_SUBMISSIONS);

        let max_matches_per_document = env::var("SIMCHECK_MAX_MATCHES_PER_DOCUMENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_MATCHES_PER_DOCUMENT);

        let log_level = env::var("SIMCHECK_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            temp_dir,
            reports_dir,
            comparisons_dir,
            public_base_url,
            engine_command,
            engine_args,
            min_token_match,
            similarity_threshold,
            max_comparisons,
            file_suffixes,
            engine_timeout_secs,
            clone_timeout_secs,
            staging_concurrency,
            max_submissions,
            max_matches_per_document,
            log_level,
        }
    }
}

/// Splits a comma-separated suffix list, normalizing each entry to `.ext` lowercase
fn parse_suffixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .map(|s| if s.starts_with('.') { s } else { format!(".{}", s) })
        .collect()
}

impl SimcheckConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` describing the first invalid value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::ValidationFailed(format!(
                "Similarity threshold must be between 0 and 1, got {}",
                self.similarity_threshold
            )));
        }

        if self.file_suffixes.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "At least one file suffix is required".to_string(),
            ));
        }

        if self.engine_command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Engine command cannot be empty".to_string(),
            ));
        }

        if self.engine_timeout_secs == 0 || self.clone_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Timeouts must be at least 1 second".to_string(),
            ));
        }

        if self.staging_concurrency == 0 {
            return Err(ConfigError::ValidationFailed(
                "Staging concurrency must be at least 1".to_string(),
            ));
        }

        if self.max_submissions < 2 {
            return Err(ConfigError::ValidationFailed(
                "Max submissions must allow at least 2 submissions".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Engine options derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_token_match: self.min_token_match,
            similarity_threshold: self.similarity_threshold,
            max_comparisons: self.max_comparisons,
            file_suffixes: self.file_suffixes.clone(),
        }
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("temp_dir".to_string(), self.temp_dir.display().to_string());
        map.insert(
            "reports_dir".to_string(),
            self.reports_dir.display().to_string(),
        );
        map.insert(
            "comparisons_dir".to_string(),
            self.comparisons_dir.display().to_string(),
        );
        map.insert("public_base_url".to_string(), self.public_base_url.clone());
        map.insert("engine_command".to_string(), self.engine_command.clone());
        map.insert("engine_args".to_string(), self.engine_args.join(" "));
        map.insert(
            "min_token_match".to_string(),
            self.min_token_match.to_string(),
        );
        map.insert(
            "similarity_threshold".to_string(),
            self.similarity_threshold.to_string(),
        );
        map.insert(
            "max_comparisons".to_string(),
            self.max_comparisons
                .map(|m| m.to_string())
                .unwrap_or_else(|| "unbounded".to_string()),
        );
        map.insert("file_suffixes".to_string(), self.file_suffixes.join(","));
        map.insert(
            "engine_timeout_secs".to_string(),
            self.engine_timeout_secs.to_string(),
        );
        map.insert(
            "clone_timeout_secs".to_string(),
            self.clone_timeout_secs.to_string(),
        );
        map.insert(
            "staging_concurrency".to_string(),
            self.staging_concurrency.to_string(),
        );
        map.insert(
            "max_submissions".to_string(),
            self.max_submissions.to_string(),
        );
        map.insert(
            "max_matches_per_document".to_string(),
            self.max_matches_per_document.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for SimcheckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simcheck Configuration:")?;
        writeln!(f, "  Temp Dir: {}", self.temp_dir.display())?;
        writeln!(f, "  Reports Dir: {}", self.reports_dir.display())?;
        writeln!(f, "  Comparisons Dir: {}", self.comparisons_dir.display())?;
        writeln!(f, "  Public Base URL: {}", self.public_base_url)?;
        writeln!(
            f,
            "  Engine: {} {}",
            self.engine_command,
            self.engine_args.join(" ")
        )?;
        writeln!(f, "  Min Token Match: {}", self.min_token_match)?;
        writeln!(f, "  Similarity Threshold: {}", self.similarity_threshold)?;
        match self.max_comparisons {
            Some(max) => writeln!(f, "  Max Comparisons: {}", max)?,
            None => writeln!(f, "  Max Comparisons: unbounded")?,
        }
        writeln!(f, "  File Suffixes: {}", self.file_suffixes.join(", "))?;
        writeln!(f, "  Engine Timeout: {}s", self.engine_timeout_secs)?;
        writeln!(f, "  Clone Timeout: {}s", self.clone_timeout_secs)?;
        writeln!(f, "  Staging Concurrency: {}", self.staging_concurrency)?;
        writeln!(f, "  Max Submissions: {}", self.max_submissions)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn remove(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::remove("SIMCHECK_REPORTS_DIR"),
            EnvGuard::remove("SIMCHECK_MIN_TOKEN_MATCH"),
            EnvGuard::remove("SIMCHECK_SIMILARITY_THRESHOLD"),
            EnvGuard::remove("SIMCHECK_MAX_COMPARISONS"),
            EnvGuard::remove("SIMCHECK_FILE_SUFFIXES"),
            EnvGuard::remove("SIMCHECK_MAX_SUBMISSIONS"),
            EnvGuard::remove("SIMCHECK_PUBLIC_BASE_URL"),
            EnvGuard::set("SIMCHECK_LOG_LEVEL", DEFAULT_LOG_LEVEL),
        ];

        let config = SimcheckConfig::default();

        assert_eq!(config.reports_dir, PathBuf::from(DEFAULT_REPORTS_DIR));
        assert_eq!(config.min_token_match, DEFAULT_MIN_TOKEN_MATCH);
        assert_eq!(config.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(config.max_comparisons, None);
        assert_eq!(config.file_suffixes, vec![".java".to_string()]);
        assert_eq!(config.max_submissions, DEFAULT_MAX_SUBMISSIONS);
        assert_eq!(config.public_base_url, DEFAULT_PUBLIC_BASE_URL);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("SIMCHECK_TEMP_DIR", "/var/tmp/sessions"),
            EnvGuard::set("SIMCHECK_MIN_TOKEN_MATCH", "9"),
            EnvGuard::set("SIMCHECK_SIMILARITY_THRESHOLD", "0.25"),
            EnvGuard::set("SIMCHECK_MAX_COMPARISONS", "500"),
            EnvGuard::set("SIMCHECK_FILE_SUFFIXES", "java, .KT"),
            EnvGuard::set("SIMCHECK_ENGINE_ARGS", "-jar  /opt/jplag.jar"),
            EnvGuard::set("SIMCHECK_PUBLIC_BASE_URL", "https://host/reports/"),
            EnvGuard::set("SIMCHECK_LOG_LEVEL", "DEBUG"),
        ];

        let config = SimcheckConfig::default();

        assert_eq!(config.temp_dir, PathBuf::from("/var/tmp/sessions"));
        assert_eq!(config.min_token_match, 9);
        assert_eq!(config.similarity_threshold, 0.25);
        assert_eq!(config.max_comparisons, Some(500));
        assert_eq!(
            config.file_suffixes,
            vec![".java".to_string(), ".kt".to_string()]
        );
        assert_eq!(config.engine_args, vec!["-jar", "/opt/jplag.jar"]);
        assert_eq!(config.public_base_url, "https://host/reports");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_negative_max_comparisons_is_unbounded() {
        let _guard = EnvGuard::set("SIMCHECK_MAX_COMPARISONS", "-1");
        let config = SimcheckConfig::default();
        assert_eq!(config.max_comparisons, None);
        assert_eq!(config.engine_config().max_comparisons, None);
    }

    #[test]
    #[serial]
    fn test_unparsable_values_fall_back_to_defaults() {
        let _guards = vec![
            EnvGuard::set("SIMCHECK_MIN_TOKEN_MATCH", "twelve"),
            EnvGuard::set("SIMCHECK_STAGING_CONCURRENCY", "-3"),
        ];
        let config = SimcheckConfig::default();
        assert_eq!(config.min_token_match, DEFAULT_MIN_TOKEN_MATCH);
        assert_eq!(config.staging_concurrency, DEFAULT_STAGING_CONCURRENCY);
    }

    #[test]
    fn test_configuration_validation_invalid_threshold() {
        let mut config = SimcheckConfig::default();
        config.similarity_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_configuration_validation_zero_token_match() {
        let mut config = SimcheckConfig::default();
        config.min_token_match = 0;
        assert!(config.validate().is_ok());
        assert_eq!(config.engine_config().min_token_match, 0);
    }

    #[test]
    fn test_configuration_validation_invalid_log_level() {
        let mut config = SimcheckConfig::default();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_validation_max_submissions() {
        let mut config = SimcheckConfig::default();
        config.max_submissions = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_suffixes(".java"), vec![".java"]);
        assert_eq!(parse_suffixes("java,,py "), vec![".java", ".py"]);
        assert!(parse_suffixes(" , ").is_empty());
    }

    #[test]
    fn test_engine_config_mirrors_settings() {
        let mut config = SimcheckConfig::default();
        config.min_token_match = 20;
        config.similarity_threshold = 0.1;
        config.max_comparisons = Some(10);

        let engine = config.engine_config();
        assert_eq!(engine.min_token_match, 20);
        assert_eq!(engine.similarity_threshold, 0.1);
        assert_eq!(engine.max_comparisons, Some(10));
        assert_eq!(engine.file_suffixes, config.file_suffixes);
    }

    #[test]
    fn test_config_display() {
        let config = SimcheckConfig::default();
        let display = format!("{}", config);
        assert!(display.contains("Simcheck Configuration:"));
        assert!(display.contains("Min Token Match:"));
    }

    #[test]
    fn test_display_map_keys() {
        let map = SimcheckConfig::default().to_display_map();
        assert!(map.contains_key("reports_dir"));
        assert!(map.contains_key("max_comparisons"));
        assert!(map.contains_key("log_level"));
    }
}
