//! rpcmap-core: inter-service RPC call graph extraction
//!
//! This library reconstructs which service calls which other service, via
//! which RPC method, by correlating method declarations in interface
//! definition files (`.proto`) with call sites in application sources
//! (`.cs`). Source files are never parsed; a token-stream heuristic finds
//! variables typed with a generated client and calls made through them.
//!
//! # Quick Start
//!
//! Use the [`prelude`] module for convenient imports:
//!
//! ```rust,ignore
//! use rpcmap_core::prelude::*;
//!
//! let config = ScanConfig { roots: vec!["/path/to/server".into()], ..ScanConfig::default() };
//! let result = Rpcmap::new(config).analyze()?;
//!
//! print!("{}", render_table(&result.graph));
//! ```
//!
//! # Module Organization
//!
//! - [`locate`]: streaming directory walk with pruning
//! - [`schema`]: interface-definition parsing seam and `.proto` reader
//! - [`catalog`]: method catalog built from schema files
//! - [`tokenize`]: heuristic source tokenizer
//! - [`resolve`]: client variable and namespace resolution
//! - [`matcher`]: call-site matching into link records
//! - [`aggregate`]: single-writer link aggregation
//! - [`pipeline`]: two-phase worker pool driver and builder API
//! - [`visualize`]: circular-layout Graphviz diagram
//! - [`report`]: table and JSON output
//! - [`config`]: `rpcmap.toml` and scan settings
//! - [`error`]: typed error handling

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod locate;
pub mod logging;
pub mod matcher;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod tokenize;
pub mod visualize;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{IoResultExt, RpcmapError, RpcmapResult};

// Configuration
pub use config::{
    load_config, load_config_file, OutputConfig, RpcmapConfig, ScanConfig, CONFIG_FILE_NAME,
    DEFAULT_EXCLUDES, DEFAULT_WORKERS,
};

// Logging
pub use logging::{init_logging, LogFormat};

// File discovery
pub use locate::{locate, locate_into, matches_exclude};

// Schema parsing and method catalog
pub use catalog::{
    build_catalog, namespace_segment, CatalogStats, MethodCatalog, MethodDescriptor,
};
pub use schema::{parse_proto, MethodDecl, ProtoParser, SchemaFile, SchemaParser, ServiceDecl};

// Source scanning
pub use matcher::{is_call_of, match_call_sites, CallSites};
pub use resolve::{resolve_clients, ClientBindings};
pub use tokenize::tokenize;

// Aggregation
pub use aggregate::{
    LinkAggregator, LinkGraph, LinkRecord, ServiceGraph, ServiceLinkKey, ServiceSet,
};

// Pipeline
pub use pipeline::{scan_file, scan_source, Rpcmap, ScanResult, ScanStats, SourceStats};

// Output
pub use report::{render, render_table, to_json, write_output, OutputMode};
pub use visualize::{circular_layout, generate_dot, NodePosition, DEFAULT_RADIUS};

#[cfg(test)]
mod tests;
