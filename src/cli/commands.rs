use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AI-assisted reproducibility scanner for Python dependency manifests
#[derive(Parser, Debug)]
#[command(
    name = "pindrift",
    about = "AI-assisted reproducibility scanner for Python dependency manifests",
    version,
    long_about = "pindrift inspects the dependency manifests of a Python project \
                  (requirements.txt, pyproject.toml, Pipfile, setup.py), sends them to an \
                  OpenAI-compatible model for analysis, checks pinned packages against \
                  OSV.dev, and reports issues together with a reproducibility score. \
                  The scan and snapshot commands are thin clients of a pindrift server; \
                  run one locally with `pindrift serve`."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity (can be used multiple times)"
    )]
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
        about = "Analyze a repository for dependency issues",
        long_about = "Analyzes the Python dependency manifests of a GitHub repository or a \
                      local directory and reports issues, vulnerabilities, and a \
                      reproducibility score.\n\n\
                      Examples:\n  \
                      pindrift scan https://github.com/pallets/flask\n  \
                      pindrift scan https://github.com/pallets/flask --json\n  \
                      pindrift scan ./my-project"
    )]
    Scan(ScanArgs),

    #[command(
        about = "Generate a corrected dependency snapshot (.zfix)",
        long_about = "Analyzes a GitHub repository and asks the model for a corrected \
                      dependency file, then writes the snapshot document to disk.\n\n\
                      Examples:\n  \
                      pindrift snapshot https://github.com/pallets/flask\n  \
                      pindrift snapshot https://github.com/pallets/flask -o flask.zfix"
    )]
    Snapshot(SnapshotArgs),

    #[command(
        about = "Run the pindrift HTTP API server",
        long_about = "Starts the analysis server that the scan and snapshot commands (and \
                      the web UI) talk to.\n\n\
                      Examples:\n  \
                      pindrift serve\n  \
                      pindrift serve --bind 0.0.0.0:8787\n  \
                      pindrift serve --memory"
    )]
    Serve(ServeArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    #[arg(
        value_name = "TARGET",
        help = "GitHub repository URL or local project directory"
    )]
    pub target: String,

    #[arg(long, help = "Output the raw analysis response as JSON")]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SnapshotArgs {
    #[arg(value_name = "URL", help = "GitHub repository URL")]
    pub url: String,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the snapshot to this file (defaults to environment.zfix)"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(
        long,
        value_name = "ADDR",
        help = "Bind address (overrides PINDRIFT_BIND_ADDR)"
    )]
    pub bind: Option<String>,

    #[arg(long, help = "Use a volatile in-memory store instead of the database")]
    pub memory: bool,
}
