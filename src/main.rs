use pindrift::cli::commands::{CliArgs, Commands};
use pindrift::cli::handlers::{handle_scan, handle_serve, handle_snapshot};
use pindrift::util::logging::{self, LoggingConfig};
use pindrift::VERSION;

use clap::error::ErrorKind;
use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    // Help and version exit 0; every usage error exits 1
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging_from_args(&args);

    debug!("pindrift v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Scan(scan_args) => handle_scan(scan_args, args.quiet).await,
        Commands::Snapshot(snapshot_args) => handle_snapshot(snapshot_args, args.quiet).await,
        Commands::Serve(serve_args) => handle_serve(serve_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        logging::parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("PINDRIFT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        logging::parse_level(&level_str)
    };

    let use_json = env::var("PINDRIFT_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    logging::init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
