use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Code similarity analysis across repository submissions
#[derive(Parser, Debug)]
#[command(
    name = "simcheck",
    about = "Code similarity analysis across repository submissions",
    version,
    author,
    long_about = "simcheck stages every submission of an assignment into an isolated \
                  workspace, runs a similarity engine across all pairs and publishes \
                  per-pair scores together with browsable comparison reports."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Analyze the submissions of an assignment",
        long_about = "Reads an analysis request (JSON), clones every submission, runs the \
                      similarity engine and prints the response.\n\n\
                      Examples:\n  \
                      simcheck analyze request.json\n  \
                      simcheck analyze request.json --format json -o response.json"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Safely extract a report bundle",
        long_about = "Unpacks a gzip-compressed tar report bundle into a directory. \
                      Entries that would land outside the destination are rejected.\n\n\
                      Examples:\n  \
                      simcheck extract report.tar.gz ./reports/session"
    )]
    Extract(ExtractArgs),

    #[command(
        about = "Show a materialized report",
        long_about = "Prints the entry point of a session's report with asset links \
                      rewritten to the public base URL, or resolves one file inside it.\n\n\
                      Examples:\n  \
                      simcheck report 3f2b8c1e-9a4d-4e6f-8b7a-1c2d3e4f5a6b\n  \
                      simcheck report 3f2b8c1e-9a4d-4e6f-8b7a-1c2d3e4f5a6b --file style.css"
    )]
    Report(ReportArgs),

    #[command(about = "Print the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "REQUEST", help = "Path to the analysis request JSON")]
    pub request: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(value_name = "ARCHIVE", help = "Report bundle (.zip or .tar.gz)")]
    pub archive: PathBuf,

    #[arg(value_name = "DEST", help = "Destination directory")]
    pub destination: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct ReportArgs {
    #[arg(value_name = "SESSION_ID", help = "Session id returned by analyze")]
    pub session_id: String,

    #[arg(long, value_name = "PATH", help = "Resolve a file inside the report")]
    pub file: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
