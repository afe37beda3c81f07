//! Logging setup for the simcheck binary
//!
//! Everything is written to stderr; stdout is reserved for the JSON, YAML or human
//! response so it can be piped. The level comes from the command line when given,
//! then `SIMCHECK_LOG_LEVEL`. `SIMCHECK_LOG_JSON=true` switches to one JSON object per
//! line with source locations and thread ids. A set `RUST_LOG` replaces the level
//! directives entirely.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const LEVEL_ENV: &str = "SIMCHECK_LOG_LEVEL";
const JSON_ENV: &str = "SIMCHECK_LOG_JSON";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    pub use_json: bool,
    /// Adds file, line and thread metadata to every event
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Machine-readable output for log shippers
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_location: true,
        }
    }

    /// Resolves the configuration from the global CLI flags and the environment
    ///
    /// An explicit `--log-level` wins over `-v`/`-q`, which win over
    /// `SIMCHECK_LOG_LEVEL`.
    pub fn from_cli(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = match log_level {
            Some(explicit) => parse_level(explicit),
            None if verbose => Level::DEBUG,
            None if quiet => Level::ERROR,
            None => env::var(LEVEL_ENV)
                .map(|raw| parse_level(&raw))
                .unwrap_or(Level::INFO),
        };

        let base = if json_from_env() {
            Self::production()
        } else {
            Self::default()
        };
        Self { level, ..base }
    }
}

/// Parses a level name case-insensitively, falling back to `INFO`
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// True when `SIMCHECK_LOG_JSON` parses as `true`
pub fn json_from_env() -> bool {
    env::var(JSON_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(false)
}

/// Level directives for this crate, with the directory walker capped at warn
fn build_filter(level: Level) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let mut filter = EnvFilter::new(format!("simcheck={}", level));
    for directive in ["ignore=warn", "globset=warn"] {
        if let Ok(parsed) = directive.parse() {
            filter = filter.add_directive(parsed);
        }
    }
    filter
}

/// Installs the global subscriber; later calls are no-ops
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_location);

        // try_init: an embedding application may already own the global subscriber
        if config.use_json {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .try_init();
        } else {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
    });
}
