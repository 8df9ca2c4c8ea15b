use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use structura::core::{AnalyzerConfig, FileAnalyzer, FolderAnalyzer};
use structura::formatters::JsonFormatter;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "structura",
    version,
    about = "Structural code analyzer for Python, Java, Go, C and C++"
)]
struct Cli {
    /// File or directory to analyze
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Analysis root for single-file input (defaults to the file's parent)
    #[arg(long, value_name = "PATH")]
    root: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Additional directory name to skip; repeatable
    #[arg(short, long, value_name = "NAME")]
    exclude: Vec<String>,

    /// Walk into directories and files whose names start with `.`
    #[arg(long)]
    include_hidden: bool,

    /// Number of files analyzed concurrently
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Single-line JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

    /// Extract files with syntax errors and report the error on the file
    #[arg(long)]
    tolerate_syntax_errors: bool,

    /// Log level for stderr output (RUST_LOG overrides)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);
    run(cli)
}

fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default()
        .with_ignored_dirs(cli.exclude.iter().cloned())
        .with_hidden(cli.include_hidden)
        .with_tolerate_syntax_errors(cli.tolerate_syntax_errors);
    if let Some(jobs) = cli.jobs {
        config = config.with_concurrency(jobs);
    }
    config
}

fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();
    let config = build_config(&cli);
    let formatter = JsonFormatter::new().with_pretty(!cli.compact);

    let metadata = std::fs::metadata(&cli.input)
        .with_context(|| format!("cannot access input {}", cli.input.display()))?;

    if metadata.is_dir() {
        if let Some(root) = &cli.root {
            if !same_path(root, &cli.input) {
                bail!("--root only applies to single-file input; analyze the root folder instead");
            }
        }
        let report = FolderAnalyzer::new(&config)
            .analyze(&cli.input)
            .with_context(|| format!("failed to analyze {}", cli.input.display()))?;
        emit(&formatter, &report, cli.output.as_deref())?;
        info!(
            files = report.summary_counts.files_analyzed,
            errors = report.errors.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "done"
        );
    } else {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => cli
                .input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let report = FileAnalyzer::new(&config, &root)
            .analyze(&cli.input)
            .with_context(|| format!("failed to analyze {}", cli.input.display()))?;
        emit(&formatter, &report, cli.output.as_deref())?;
        info!(
            functions = report.functions.len(),
            classes = report.classes.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "done"
        );
    }
    Ok(())
}

fn emit<T: serde::Serialize>(
    formatter: &JsonFormatter,
    report: &T,
    output: Option<&Path>,
) -> Result<()> {
    match output {
        Some(path) => formatter.format_to_file(report, path),
        None => formatter.write(report, io::stdout().lock()),
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
