//! Command handlers; each returns the process exit code

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::commands::{AnalyzeArgs, ConfigArgs, ExtractArgs, ReportArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::SimcheckConfig;
use crate::model::AnalysisRequest;
use crate::pipeline::DetectionService;
use crate::progress::LoggingHandler;
use crate::report::{extract_bundle, open_bundle, ReportStore};

fn load_config() -> Result<SimcheckConfig> {
    let config = SimcheckConfig::default();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_request(path: &Path) -> Result<AnalysisRequest> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse request {}", path.display()))
}

fn write_output(output: &str, target: Option<&Path>) -> Result<()> {
    match target {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => println!("{}", output),
    }
    Ok(())
}

pub async fn handle_analyze(args: &AnalyzeArgs, quiet: bool) -> i32 {
    match run_analyze(args, quiet).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run_analyze(args: &AnalyzeArgs, quiet: bool) -> Result<bool> {
    let config = load_config()?;
    let request = read_request(&args.request)?;
    debug!(
        assignment_id = request.assignment_id,
        submissions = request.submissions.len(),
        "Request loaded"
    );

    let mut service = DetectionService::from_config(config);
    if !quiet {
        service = service.with_progress(Arc::new(LoggingHandler));
    }

    let response = service.detect(&request).await;
    let formatter = OutputFormatter::new(args.format.into());
    let output = formatter.format(&response)?;
    write_output(&output, args.output.as_deref())?;

    Ok(response.success)
}

pub fn handle_extract(args: &ExtractArgs) -> i32 {
    let result = (|| -> Result<String> {
        let mut archive = open_bundle(&args.archive)
            .with_context(|| format!("Failed to open {}", args.archive.display()))?;
        let summary = extract_bundle(archive.as_mut(), &args.destination)
            .with_context(|| format!("Failed to extract {}", args.archive.display()))?;
        Ok(OutputFormatter::new(OutputFormat::Human).format_extraction(&summary))
    })();

    match result {
        Ok(line) => {
            println!("{}", line);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub fn handle_report(args: &ReportArgs) -> i32 {
    let result = (|| -> Result<String> {
        let config = load_config()?;
        let store = ReportStore::new(
            config.reports_dir,
            config.comparisons_dir,
            config.public_base_url,
        );
        match &args.file {
            Some(file) => {
                let path = store.resolve_file(&args.session_id, file)?;
                Ok(path.display().to_string())
            }
            None => Ok(store.entry_point(&args.session_id)?),
        }
    })();

    match result {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = SimcheckConfig::default();
    let formatter = OutputFormatter::new(args.format.into());

    match formatter.format_config(&config) {
        Ok(output) => {
            println!("{}", output);
            match config.validate() {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("Warning: {}", e);
                    1
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}
