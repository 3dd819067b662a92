//! Typed error handling for rpcmap.
//!
//! Almost every failure during a scan is local: a directory that cannot be
//! read, a schema file that does not parse, a source file that vanished, a
//! namespace with too few segments. Those are logged and skipped. Only a
//! failure to start (no roots, bad configuration) ends the run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rpcmap operations.
#[derive(Error, Debug)]
pub enum RpcmapError {
    /// I/O error when reading/writing files
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A directory could not be walked
    #[error("Traversal error at {path}: {message}")]
    Traversal { path: PathBuf, message: String },

    /// Interface-definition file could not be parsed
    #[error("Schema parse error in {path}: {message}")]
    SchemaParse {
        path: PathBuf,
        message: String,
        /// Line number (1-indexed) if available
        line: Option<usize>,
    },

    /// A namespace lacks the segment a link endpoint is taken from
    #[error("Malformed namespace '{namespace}': expected at least {required_segments} segment(s)")]
    MalformedNamespace {
        namespace: String,
        required_segments: usize,
    },

    /// Configuration file errors
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Output mode not one of draw/table/json
    #[error("Unknown output mode '{mode}' (expected draw, table or json)")]
    UnknownOutputMode { mode: String },

    /// Nothing to scan
    #[error("No root directories given")]
    NoRoots,

    /// Invalid argument provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The source worker pool could not be started
    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },
}

impl RpcmapError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a traversal error.
    pub fn traversal(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Traversal {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a schema parse error without location.
    pub fn schema(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SchemaParse {
            path: path.into(),
            message: message.into(),
            line: None,
        }
    }

    /// Create a schema parse error pointing at a line.
    pub fn schema_at(path: impl Into<PathBuf>, message: impl Into<String>, line: usize) -> Self {
        Self::SchemaParse {
            path: path.into(),
            message: message.into(),
            line: Some(line),
        }
    }

    /// Create a malformed namespace error.
    pub fn malformed_namespace(namespace: impl Into<String>, required_segments: usize) -> Self {
        Self::MalformedNamespace {
            namespace: namespace.into(),
            required_segments,
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error (the scan can continue without
    /// the contribution of whatever failed).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Traversal { .. }
                | Self::SchemaParse { .. }
                | Self::MalformedNamespace { .. }
                | Self::UnknownOutputMode { .. }
        )
    }
}

/// Convenience type alias for rpcmap results.
pub type RpcmapResult<T> = Result<T, RpcmapError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> RpcmapResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> RpcmapResult<T> {
        self.map_err(|e| RpcmapError::io(path, e))
    }
}
