//! Configuration loading from rpcmap.toml and the in-memory scan settings.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{RpcmapError, RpcmapResult};
use crate::logging::LogFormat;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "rpcmap.toml";

/// Directory name patterns pruned by default.
///
/// `bin/` and `obj/` only prune directories named exactly that, so
/// `Cabinet.Api` or `Orders.Objects` are still scanned.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".Tests", "bin/", "obj/"];

/// Worker count used by the reference deployment.
pub const DEFAULT_WORKERS: usize = 10;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Main configuration structure for rpcmap.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RpcmapConfig {
    /// Root directories to scan.
    pub roots: Option<Vec<PathBuf>>,
    /// Extension of interface-definition files, e.g. ".proto".
    pub schema_extension: Option<String>,
    /// Extension of application source files, e.g. ".cs".
    pub source_extension: Option<String>,
    /// Directory name patterns to prune: substring match, or exact name when
    /// the pattern ends in `/`.
    pub exclude: Option<Vec<String>>,
    /// Size of the source worker pool.
    pub workers: Option<usize>,
    /// Capacity of the path and record queues.
    pub queue_capacity: Option<usize>,
    /// Suffix appended to a service name to form its client type name.
    pub client_suffix: Option<String>,
    /// Suffix of the asynchronous variant of a generated method.
    pub async_suffix: Option<String>,
    /// Output configuration.
    pub output: Option<OutputConfig>,
}

/// Output configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output mode: "draw", "table" or "json".
    pub mode: Option<String>,
    /// Output file path ("-" for stdout).
    pub file: Option<PathBuf>,
    /// Radius of the circular diagram layout.
    pub radius: Option<f64>,
    /// Log line format.
    pub log_format: Option<LogFormat>,
}

/// Loads configuration from `rpcmap.toml` in `dir` if it exists.
pub fn load_config(dir: &Path) -> Result<Option<RpcmapConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Loads configuration from an explicit file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<RpcmapConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let cfg = toml::from_str(&content)
        .map_err(|e| RpcmapError::config(path, e.to_string()))
        .context("Invalid rpcmap.toml")?;
    Ok(cfg)
}

/// Settings handed to each pipeline component at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub roots: Vec<PathBuf>,
    pub schema_extension: String,
    pub source_extension: String,
    pub exclude: Vec<String>,
    pub workers: usize,
    pub queue_capacity: usize,
    pub client_suffix: String,
    pub async_suffix: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            schema_extension: ".proto".to_string(),
            source_extension: ".cs".to_string(),
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            client_suffix: "Client".to_string(),
            async_suffix: "Async".to_string(),
        }
    }
}

impl ScanConfig {
    /// Overlay the values present in a config file onto the defaults.
    pub fn from_file(cfg: &RpcmapConfig) -> Self {
        let mut scan = Self::default();
        if let Some(roots) = &cfg.roots {
            scan.roots = roots.clone();
        }
        if let Some(ext) = &cfg.schema_extension {
            scan.schema_extension = ext.clone();
        }
        if let Some(ext) = &cfg.source_extension {
            scan.source_extension = ext.clone();
        }
        if let Some(exclude) = &cfg.exclude {
            scan.exclude = exclude.clone();
        }
        if let Some(workers) = cfg.workers {
            scan.workers = workers;
        }
        if let Some(cap) = cfg.queue_capacity {
            scan.queue_capacity = cap;
        }
        if let Some(suffix) = &cfg.client_suffix {
            scan.client_suffix = suffix.clone();
        }
        if let Some(suffix) = &cfg.async_suffix {
            scan.async_suffix = suffix.clone();
        }
        scan
    }

    /// Rejects settings the pipeline cannot start with.
    pub fn validate(&self) -> RpcmapResult<()> {
        if self.roots.is_empty() {
            return Err(RpcmapError::NoRoots);
        }
        if self.workers == 0 {
            return Err(RpcmapError::invalid_argument("workers must be at least 1"));
        }
        if self.schema_extension.is_empty() || self.source_extension.is_empty() {
            return Err(RpcmapError::invalid_argument("file extensions must not be empty"));
        }
        if self.client_suffix.is_empty() {
            return Err(RpcmapError::invalid_argument("client suffix must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn create_temp_dir(name: &str) -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir()
            .join("rpcmap_config_test")
            .join(format!("{}_{}_{}", name, std::process::id(), id));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_config_missing_is_none() {
        let dir = create_temp_dir("missing");
        assert!(load_config(&dir).unwrap().is_none());
    }

    #[test]
    fn test_load_config_full() {
        let dir = create_temp_dir("full");
        fs::write(
            dir.join(CONFIG_FILE_NAME),
            r#"
roots = ["server", "shared"]
source_extension = ".cs"
exclude = [".git", "Tests"]
workers = 4

[output]
mode = "table"
file = "out.csv"
log_format = "text"
"#,
        )
        .unwrap();

        let cfg = load_config(&dir).unwrap().unwrap();
        let scan = ScanConfig::from_file(&cfg);
        assert_eq!(scan.roots, vec![PathBuf::from("server"), PathBuf::from("shared")]);
        assert_eq!(scan.workers, 4);
        assert_eq!(scan.exclude, vec![".git".to_string(), "Tests".to_string()]);
        // untouched keys keep their defaults
        assert_eq!(scan.schema_extension, ".proto");
        assert_eq!(scan.client_suffix, "Client");

        let output = cfg.output.unwrap();
        assert_eq!(output.mode.as_deref(), Some("table"));
        assert_eq!(output.log_format, Some(LogFormat::Text));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = create_temp_dir("invalid");
        fs::write(dir.join(CONFIG_FILE_NAME), "workers = \"many\"").unwrap();
        assert!(load_config(&dir).is_err());
    }

    #[test]
    fn test_validate_requires_roots() {
        let scan = ScanConfig::default();
        assert!(matches!(scan.validate(), Err(RpcmapError::NoRoots)));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let scan = ScanConfig {
            roots: vec![PathBuf::from(".")],
            workers: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(
            scan.validate(),
            Err(RpcmapError::InvalidArgument { .. })
        ));
    }
}
