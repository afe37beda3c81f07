use super::{read_bundle_results, EngineConfig, EngineError, EngineRun, SimilarityEngine};
use crate::report::open_bundle;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

const BUNDLE_NAME: &str = "report.zip";

/// Runs an external similarity engine and reads its report bundle
///
/// The program is invoked as
/// `<command> <args..> --min-tokens N --similarity-threshold X [--max-comparisons M]
/// --suffixes .a,.b --result <output_dir>/report.zip <dir>..`
/// and must exit zero after writing the bundle. The bundle may be a zip or a
/// gzip-compressed tar whatever its name; the format is read from its first bytes.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    command: String,
    args: Vec<String>,
}

impl ProcessEngine {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    fn build_args(&self, corpus: &[PathBuf], config: &EngineConfig, bundle: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("--min-tokens".to_string());
        args.push(config.min_token_match.to_string());
        args.push("--similarity-threshold".to_string());
        args.push(config.similarity_threshold.to_string());
        if let Some(max) = config.max_comparisons {
            args.push("--max-comparisons".to_string());
            args.push(max.to_string());
        }
        if !config.file_suffixes.is_empty() {
            args.push("--suffixes".to_string());
            args.push(config.file_suffixes.join(","));
        }
        args.push("--result".to_string());
        args.push(bundle.display().to_string());
        args.extend(corpus.iter().map(|dir| dir.display().to_string()));
        args
    }
}

#[async_trait]
impl SimilarityEngine for ProcessEngine {
    async fn run(
        &self,
        corpus: &[PathBuf],
        config: &EngineConfig,
        output_dir: &Path,
    ) -> Result<EngineRun, EngineError> {
        let bundle = output_dir.join(BUNDLE_NAME);
        let args = self.build_args(corpus, config, &bundle);
        debug!(command = %self.command, ?args, "Starting engine");

        let output = Command::new(&self.command)
            .args(&args)
            .current_dir(output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineError::Launch(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !bundle.is_file() {
            return Err(EngineError::MissingBundle(bundle));
        }

        let path = bundle.clone();
        let results = tokio::task::spawn_blocking(move || {
            let mut archive =
                open_bundle(&path).map_err(|e| EngineError::Bundle(e.to_string()))?;
            read_bundle_results(archive.as_mut())
        })
        .await
        .map_err(|e| EngineError::Other(format!("bundle reader panicked: {}", e)))??;

        info!(pairs = results.len(), "Engine run finished");
        Ok(EngineRun {
            results,
            bundle: Some(bundle),
        })
    }

    fn name(&self) -> &str {
        &self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::comparison_json;
    use crate::model::PairwiseResult;
    use crate::report::write_zip;
    use tempfile::TempDir;

    #[test]
    fn test_build_args() {
        let engine = ProcessEngine::new("engine", vec!["-jar".to_string(), "e.jar".to_string()]);
        let config = EngineConfig {
            min_token_match: 9,
            similarity_threshold: 0.25,
            max_comparisons: Some(50),
            file_suffixes: vec![".java".to_string(), ".kt".to_string()],
        };
        let args = engine.build_args(
            &[PathBuf::from("/c/a"), PathBuf::from("/c/b")],
            &config,
            Path::new("/out/report.zip"),
        );

        assert_eq!(
            args,
            vec![
                "-jar",
                "e.jar",
                "--min-tokens",
                "9",
                "--similarity-threshold",
                "0.25",
                "--max-comparisons",
                "50",
                "--suffixes",
                ".java,.kt",
                "--result",
                "/out/report.zip",
                "/c/a",
                "/c/b",
            ]
        );
    }

    #[test]
    fn test_build_args_without_cap() {
        let engine = ProcessEngine::new("engine", Vec::new());
        let args = engine.build_args(&[], &EngineConfig::default(), Path::new("r.zip"));
        assert!(!args.contains(&"--max-comparisons".to_string()));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let temp = TempDir::new().unwrap();
        let engine = ProcessEngine::new("simcheck-no-such-engine", Vec::new());

        let result = engine
            .run(&[], &EngineConfig::default(), temp.path())
            .await;

        assert!(matches!(result, Err(EngineError::Launch(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let temp = TempDir::new().unwrap();
        let engine = ProcessEngine::new(
            "sh",
            vec!["-c".to_string(), "echo broken >&2; exit 3".to_string()],
        );

        let result = engine
            .run(&[], &EngineConfig::default(), temp.path())
            .await;

        match result {
            Err(EngineError::Failed { stderr, .. }) => assert_eq!(stderr, "broken"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_bundle() {
        let temp = TempDir::new().unwrap();
        let engine = ProcessEngine::new("sh", vec!["-c".to_string(), "exit 0".to_string()]);

        let result = engine
            .run(&[], &EngineConfig::default(), temp.path())
            .await;

        assert!(matches!(result, Err(EngineError::MissingBundle(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reads_zip_bundle_written_by_engine() {
        let temp = TempDir::new().unwrap();
        let prepared = temp.path().join("prepared.zip");
        let comparison = PairwiseResult::new("submission_1_team_1", "submission_2_team_2", 0.61);
        write_zip(
            &prepared,
            &[(
                "comparisons/0.json".to_string(),
                serde_json::to_vec(&comparison_json(&comparison)).unwrap(),
            )],
        )
        .unwrap();

        let output_dir = temp.path().join("out");
        std::fs::create_dir_all(&output_dir).unwrap();
        let script = format!("cp '{}' report.zip", prepared.display());
        let engine = ProcessEngine::new("sh", vec!["-c".to_string(), script]);

        let run = engine
            .run(&[], &EngineConfig::default(), &output_dir)
            .await
            .unwrap();

        assert_eq!(run.bundle, Some(output_dir.join("report.zip")));
        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].first_dir, "submission_1_team_1");
        assert!((run.results[0].similarity() - 0.61).abs() < 1e-9);
    }
}
