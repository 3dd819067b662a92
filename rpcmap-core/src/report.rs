//! Output formatting - indented table (CSV) and JSON, plus mode selection.

use serde_json::json;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info};

use crate::aggregate::ServiceGraph;
use crate::error::{IoResultExt, RpcmapError, RpcmapResult};
use crate::pipeline::{ScanResult, ScanStats};
use crate::visualize::generate_dot;

/// What to produce from a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Graphviz diagram
    Draw,
    /// Indented CSV hierarchy
    Table,
    /// Machine-readable JSON
    Json,
}

impl OutputMode {
    /// File written when no output path is given.
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Draw => "services.dot",
            Self::Table => "services.csv",
            Self::Json => "services.json",
        }
    }
}

impl FromStr for OutputMode {
    type Err = RpcmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draw" => Ok(Self::Draw),
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(RpcmapError::UnknownOutputMode {
                mode: s.to_string(),
            }),
        }
    }
}

/// Quotes a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders the graph as a three-level hierarchy in CSV columns:
///
/// ```text
/// Billing,,
/// ,Orders,
/// ,,.Create
/// ```
///
/// Every service gets a row, including those that only receive calls.
pub fn render_table(graph: &ServiceGraph) -> String {
    let mut out = String::with_capacity(graph.services.len() * 32 + graph.links.len() * 64);
    for service in &graph.services {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{},,", csv_field(service));
        for target in graph.links.callees_of(service) {
            let _ = writeln!(out, ",{},", csv_field(target));
            for method in graph.links.methods(service, target).into_iter().flatten() {
                let _ = writeln!(out, ",,{}", csv_field(method));
            }
        }
    }
    out
}

/// Builds the JSON document for a scan result.
pub fn to_json(graph: &ServiceGraph, stats: &ScanStats) -> serde_json::Value {
    let edges: Vec<serde_json::Value> = graph
        .links
        .edges()
        .map(|(key, methods)| {
            json!({
                "source": key.source,
                "target": key.target,
                "weight": methods.len(),
                "methods": methods,
            })
        })
        .collect();

    json!({
        "services": graph.services,
        "edges": edges,
        "stats": stats,
    })
}

/// Renders a scan result in the requested mode.
pub fn render(mode: OutputMode, result: &ScanResult, radius: f64) -> String {
    match mode {
        OutputMode::Draw => generate_dot(&result.graph, radius),
        OutputMode::Table => render_table(&result.graph),
        OutputMode::Json => match serde_json::to_string_pretty(&to_json(&result.graph, &result.stats)) {
            Ok(json) => json + "\n",
            Err(e) => {
                // Fallback keeps the output parseable
                error!(error = %e, "JSON serialization failed");
                "{}\n".to_string()
            }
        },
    }
}

/// Writes `content` to `target`, or to stdout when `target` is `-`.
pub fn write_output(target: &Path, content: &str) -> RpcmapResult<()> {
    if target == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content.as_bytes()).with_path("<stdout>")?;
        return stdout.flush().with_path("<stdout>");
    }
    fs::write(target, content).with_path(target)?;
    info!(path = %target.display(), bytes = content.len(), "output written");
    Ok(())
}
