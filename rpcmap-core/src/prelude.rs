//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use rpcmap_core::prelude::*;
//! ```

// Core types
pub use crate::error::{RpcmapError, RpcmapResult};
pub use crate::aggregate::{LinkGraph, LinkRecord, ServiceGraph, ServiceLinkKey, ServiceSet};
pub use crate::catalog::{MethodCatalog, MethodDescriptor};

// Running a scan
pub use crate::config::{load_config, ScanConfig};
pub use crate::pipeline::{Rpcmap, ScanResult, ScanStats};
pub use crate::schema::{ProtoParser, SchemaParser};

// Output
pub use crate::report::{render, render_table, write_output, OutputMode};
pub use crate::visualize::generate_dot;
