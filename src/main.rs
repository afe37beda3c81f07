use simcheck::cli::commands::{CliArgs, Commands};
use simcheck::cli::handlers::{handle_analyze, handle_config, handle_extract, handle_report};
use simcheck::util::logging::{init_logging, LoggingConfig};
use simcheck::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("simcheck v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, args.quiet).await,
        Commands::Extract(extract_args) => handle_extract(extract_args),
        Commands::Report(report_args) => handle_report(report_args),
        Commands::Config(config_args) => handle_config(config_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));
}
