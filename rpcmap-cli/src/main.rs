//! rpcmap CLI - maps which service calls which over RPC.
//!
//! Reads `.proto` schemas and `.cs` sources under one or more roots and
//! writes the inter-service call graph as a Graphviz diagram, an indented
//! CSV table, or JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use rpcmap_core::{
    init_logging, load_config, load_config_file, render, write_output, LogFormat, OutputMode,
    Rpcmap, RpcmapConfig, ScanConfig, DEFAULT_RADIUS,
};

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Inter-service RPC call graph extractor")]
pub struct Cli {
    /// Root directories to scan (overrides `roots` in rpcmap.toml)
    roots: Vec<PathBuf>,

    /// Output mode: draw, table or json
    #[arg(long)]
    mode: Option<String>,

    /// Output file, `-` for stdout (default depends on the mode)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of source scanning workers
    #[arg(long)]
    workers: Option<usize>,

    /// Directory name patterns to prune (substring match, or exact name with a
    /// trailing `/`; replaces the defaults)
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,

    /// Extension of interface-definition files
    #[arg(long, value_name = "EXT")]
    schema_ext: Option<String>,

    /// Extension of application source files
    #[arg(long, value_name = "EXT")]
    source_ext: Option<String>,

    /// Radius of the circular diagram layout
    #[arg(long)]
    radius: Option<f64>,

    /// Path to a config file (default: ./rpcmap.toml if present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log line format: json or text
    #[arg(long)]
    log_format: Option<LogFormat>,
}

/// Everything a run needs after CLI flags and the config file are merged.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    scan: ScanConfig,
    mode: String,
    output: Option<PathBuf>,
    radius: f64,
    log_format: LogFormat,
}

/// Loads the config file named by `--config`, or `rpcmap.toml` in `dir`.
fn read_config(explicit: Option<&Path>, dir: &Path) -> Result<Option<RpcmapConfig>> {
    match explicit {
        Some(path) => load_config_file(path).map(Some),
        None => load_config(dir),
    }
}

/// Merges settings with precedence CLI flag > config file > default.
fn merge_settings(cli: &Cli, file: Option<RpcmapConfig>) -> Settings {
    let file = file.unwrap_or_default();
    let mut scan = ScanConfig::from_file(&file);
    let output = file.output.unwrap_or_default();

    if !cli.roots.is_empty() {
        scan.roots = cli.roots.clone();
    }
    if !cli.exclude.is_empty() {
        scan.exclude = cli.exclude.clone();
    }
    if let Some(workers) = cli.workers {
        scan.workers = workers;
    }
    if let Some(ext) = &cli.schema_ext {
        scan.schema_extension = ext.clone();
    }
    if let Some(ext) = &cli.source_ext {
        scan.source_extension = ext.clone();
    }

    Settings {
        scan,
        mode: cli
            .mode
            .clone()
            .or(output.mode)
            .unwrap_or_else(|| "draw".to_string()),
        output: cli.output.clone().or(output.file),
        radius: cli.radius.or(output.radius).unwrap_or(DEFAULT_RADIUS),
        log_format: cli.log_format.or(output.log_format).unwrap_or_default(),
    }
}

fn output_path(settings: &Settings, mode: OutputMode) -> PathBuf {
    settings
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(mode.default_file_name()))
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] rpcmap internal error: {}", info);
        eprintln!("[PANIC] No output was written.");
    }));

    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let file = read_config(cli.config.as_deref(), &cwd)?;
    let settings = merge_settings(&cli, file);

    init_logging(settings.log_format);

    if settings.scan.roots.is_empty() {
        bail!("no root directories given (pass ROOTS or set `roots` in rpcmap.toml)");
    }
    if settings.radius <= 0.0 || !settings.radius.is_finite() {
        bail!("radius must be a positive number, got {}", settings.radius);
    }

    let result = Rpcmap::new(settings.scan.clone())
        .analyze()
        .context("Scan failed")?;

    let mode = match settings.mode.parse::<OutputMode>() {
        Ok(mode) => mode,
        Err(e) => {
            error!(error = %e, "no output written");
            return Ok(());
        }
    };

    if result.graph.services.is_empty() {
        warn!("no inter-service calls found");
    }

    let target = output_path(&settings, mode);
    let content = render(mode, &result, settings.radius);
    write_output(&target, &content)
        .with_context(|| format!("Failed to write output to {}", target.display()))?;

    info!(
        mode = ?mode,
        services = result.stats.services,
        edges = result.stats.edges,
        "done"
    );
    Ok(())
}
