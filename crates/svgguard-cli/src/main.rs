use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use svgguard::xml::Config as ParseConfig;
use svgguard::{
    Catalog, Checker, DirPackage, Outcome, PolicySanitizer, ScanConfig, ValidationError,
};

#[derive(Debug, Parser)]
#[command(
    name = "svgguard",
    version,
    about = "Screen the SVG files of an app package and sanitise unsafe markup"
)]
struct Args {
    /// Package directory to scan
    #[arg(value_name = "DIR")]
    dir: PathBuf,
    /// Report files that would be sanitised without rewriting them
    #[arg(long)]
    check: bool,
    /// Worker threads (defaults to available parallelism, at most 8)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,
    /// Maximum element nesting depth per file (0 means unlimited)
    #[arg(long, value_name = "N")]
    max_depth: Option<u16>,
    /// Maximum file size in bytes (0 means unlimited)
    #[arg(long, value_name = "BYTES")]
    max_size: Option<usize>,
    /// Flat JSON message catalog; the file stem names the locale
    #[arg(long, value_name = "PATH")]
    locale_file: Option<PathBuf>,
    /// Print validation errors as a JSON array
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(2)
        }
    }
}

/// Scan the package; `Ok(false)` means at least one file failed
fn run(args: &Args) -> Result<bool> {
    if !args.dir.is_dir() {
        bail!("{} is not a directory", args.dir.display());
    }
    let catalog = load_catalog(args.locale_file.as_deref())?;
    let sanitizer = PolicySanitizer::default();
    let checker = Checker::new(&sanitizer).with_config(scan_config(args));
    let package = DirPackage::new(&args.dir);

    // keep stdout parseable when it carries JSON
    let mut notes: Box<dyn Write> = if args.json {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };

    let (errors, pending) = if args.check {
        let mut errors = Vec::new();
        let mut pending = false;
        for (file, outcome) in checker.scan(&package) {
            match outcome {
                Outcome::Accepted => {}
                Outcome::Remediated { .. } => {
                    pending = true;
                    writeln!(notes, "would sanitise {}", file.relative_path())?;
                }
                Outcome::Rejected(reason) => {
                    errors.push(reason.to_validation_error(file.relative_path()));
                }
            }
        }
        (errors, pending)
    } else {
        let errors = checker.validate(&package, &catalog);
        for warning in package.warnings() {
            writeln!(notes, "warning: {warning}")?;
        }
        (errors, false)
    };

    report(&errors, &catalog, args.json)?;
    Ok(errors.is_empty() && !pending)
}

fn scan_config(args: &Args) -> ScanConfig {
    let defaults = ParseConfig::default();
    let parse = ParseConfig::new(
        args.max_depth.unwrap_or(defaults.max_depth),
        args.max_size.unwrap_or(defaults.max_size),
    );
    let mut config = ScanConfig::default()
        .with_parse(parse)
        .with_dry_run(args.check);
    if let Some(jobs) = args.jobs {
        config = config.with_jobs(jobs.max(1));
    }
    config
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::english());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read locale file {}", path.display()))?;
    let locale = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("en");
    Catalog::from_json_str(locale, &json)
        .with_context(|| format!("invalid locale file {}", path.display()))
}

fn report(errors: &[ValidationError], catalog: &Catalog, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, errors).context("failed to encode errors")?;
        writeln!(stdout)?;
    } else {
        for err in errors {
            writeln!(stdout, "error: {}", err.message(catalog))?;
        }
    }
    Ok(())
}
