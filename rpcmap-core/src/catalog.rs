//! Method catalog: every RPC method declared across all schema files.
//!
//! The catalog is built once, before any source file is scanned, and is
//! immutable afterwards. Workers borrow it for the whole scan and read it
//! without synchronization.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{RpcmapError, RpcmapResult};
use crate::schema::{SchemaFile, SchemaParser};

/// Prefix stored in front of every method name. Call sites are matched as
/// `<variable><method_name>`, i.e. `client` + `.Create`.
pub const METHOD_SEPARATOR: char = '.';

/// A single RPC method as seen by the call-site matcher.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MethodDescriptor {
    /// Package of the declaring schema file, e.g. `acme.Orders.v1`.
    pub namespace: String,
    /// Generated client type name, e.g. `OrdersClient`.
    pub client_name: String,
    /// Method name with leading separator, e.g. `.Create`.
    pub method_name: String,
}

impl MethodDescriptor {
    pub fn new(namespace: &str, service: &str, method: &str, client_suffix: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            client_name: format!("{}{}", service, client_suffix),
            method_name: format!("{}{}", METHOD_SEPARATOR, method),
        }
    }

    /// The service owning this method: the second segment of its namespace.
    pub fn target_service(&self) -> RpcmapResult<&str> {
        namespace_segment(&self.namespace, 1)
    }
}

/// Returns the `index`-th dot-separated segment of `namespace`.
///
/// A missing or empty segment is a [`RpcmapError::MalformedNamespace`]; link
/// endpoints are never allowed to be empty strings.
pub fn namespace_segment(namespace: &str, index: usize) -> RpcmapResult<&str> {
    match namespace.split('.').nth(index) {
        Some(segment) if !segment.is_empty() => Ok(segment),
        _ => Err(RpcmapError::malformed_namespace(namespace, index + 1)),
    }
}

/// Counters from one catalog build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub files_parsed: usize,
    pub files_failed: usize,
    pub methods: usize,
}

/// Read-only, ordered collection of [`MethodDescriptor`]s.
#[derive(Debug, Clone, Default)]
pub struct MethodCatalog {
    methods: Vec<MethodDescriptor>,
    client_names: HashSet<String>,
}

impl MethodCatalog {
    /// Flattens parsed schema files into descriptors.
    ///
    /// Descriptors are sorted so the catalog is identical no matter in which
    /// order the files were parsed.
    pub fn from_schema_files<'a>(
        files: impl IntoIterator<Item = &'a SchemaFile>,
        client_suffix: &str,
    ) -> Self {
        let mut methods: Vec<MethodDescriptor> = files
            .into_iter()
            .flat_map(|file| {
                file.services.iter().flat_map(move |service| {
                    service.methods.iter().map(move |method| {
                        MethodDescriptor::new(
                            &file.package,
                            &service.name,
                            &method.name,
                            client_suffix,
                        )
                    })
                })
            })
            .collect();
        methods.sort();

        let client_names = methods.iter().map(|m| m.client_name.clone()).collect();
        Self {
            methods,
            client_names,
        }
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Whether `name` is the client type of some catalogued service.
    pub fn is_client_name(&self, name: &str) -> bool {
        self.client_names.contains(name)
    }
}

/// Parses every schema path and builds the catalog.
///
/// Paths are pulled from `paths` as they arrive (it may be the receiving end
/// of the locator queue) and parsed in parallel. A file that fails to parse
/// is logged and contributes nothing. The function returns only after the
/// input is exhausted, so the result holds the complete method universe.
pub fn build_catalog<I>(
    paths: I,
    parser: &dyn SchemaParser,
    client_suffix: &str,
) -> (MethodCatalog, CatalogStats)
where
    I: Iterator<Item = PathBuf> + Send,
{
    let results: Vec<RpcmapResult<Vec<SchemaFile>>> = paths
        .par_bridge()
        .map(|path| {
            parser
                .parse(&path)
                .inspect(|parsed| {
                    debug!(
                        path = %path.display(),
                        methods = parsed.iter().map(SchemaFile::method_count).sum::<usize>(),
                        "schema parsed"
                    );
                })
                .inspect_err(|e| {
                    warn!(path = %path.display(), error = %e, "skipping unparsable schema file");
                })
        })
        .collect();

    let mut stats = CatalogStats::default();
    let mut files = Vec::new();
    for result in results {
        match result {
            Ok(parsed) => {
                stats.files_parsed += 1;
                files.extend(parsed);
            }
            Err(_) => stats.files_failed += 1,
        }
    }

    let catalog = MethodCatalog::from_schema_files(&files, client_suffix);
    stats.methods = catalog.len();
    info!(
        files = stats.files_parsed,
        failed = stats.files_failed,
        methods = stats.methods,
        "method catalog built"
    );
    (catalog, stats)
}
