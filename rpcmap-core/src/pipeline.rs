//! Two-phase scan driver.
//!
//! ```text
//!  phase 1                              phase 2
//!  locate(*.proto) ──► build_catalog    locate(*.cs) ──► [path queue]
//!                          │                                │
//!                          ▼                     ┌──────────┼──────────┐
//!                    MethodCatalog ─────────────►│ worker × N (rayon)  │
//!                    (read-only)                 └──────────┼──────────┘
//!                                                           ▼
//!                                               [link queue] ──► LinkAggregator
//! ```
//!
//! Phase 2 starts only after phase 1 has returned, so every worker sees the
//! complete method universe. Both queues are bounded `crossbeam` channels:
//! the walker blocks when workers fall behind and workers block when the
//! aggregator does. Shutdown is driven by channel closure alone. The walker
//! drops its sender when the walk is exhausted, each worker leaves its loop
//! once the path queue is drained and closed, and the last link sender is
//! dropped only after the worker pool scope has joined every worker.
//!
//! ```rust,ignore
//! use rpcmap_core::prelude::*;
//!
//! let config = ScanConfig { roots: vec!["../server".into()], ..ScanConfig::default() };
//! let result = Rpcmap::new(config).analyze()?;
//! for (edge, methods) in result.graph.links.edges() {
//!     println!("{} -> {}: {:?}", edge.source, edge.target, methods);
//! }
//! ```

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

use crate::aggregate::{LinkAggregator, LinkRecord, ServiceGraph};
use crate::catalog::{build_catalog, CatalogStats, MethodCatalog};
use crate::config::ScanConfig;
use crate::error::{IoResultExt, RpcmapError, RpcmapResult};
use crate::locate::locate_into;
use crate::matcher::{match_call_sites, CallSites};
use crate::resolve::resolve_clients;
use crate::schema::{ProtoParser, SchemaParser};
use crate::tokenize::tokenize;

/// Counters from the source scan phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub files_scanned: usize,
    pub files_failed: usize,
    /// Files that produced at least one link record.
    pub files_with_calls: usize,
    pub link_records: usize,
    pub dropped_records: usize,
}

#[derive(Debug, Default)]
struct SourceCounters {
    files_scanned: AtomicUsize,
    files_failed: AtomicUsize,
    files_with_calls: AtomicUsize,
    link_records: AtomicUsize,
    dropped_records: AtomicUsize,
}

impl SourceCounters {
    fn snapshot(&self) -> SourceStats {
        SourceStats {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            files_with_calls: self.files_with_calls.load(Ordering::Relaxed),
            link_records: self.link_records.load(Ordering::Relaxed),
            dropped_records: self.dropped_records.load(Ordering::Relaxed),
        }
    }
}

/// Statistics for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub schema: CatalogStats,
    pub sources: SourceStats,
    pub edges: usize,
    pub services: usize,
}

/// Result of a complete scan.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub graph: ServiceGraph,
    pub stats: ScanStats,
}

/// Tokenizes, resolves and matches one source text.
pub fn scan_source(source: &str, catalog: &MethodCatalog, async_suffix: &str) -> CallSites {
    let tokens = tokenize(source);
    let bindings = resolve_clients(&tokens, catalog);
    if bindings.is_empty() {
        return CallSites::default();
    }
    match_call_sites(
        &tokens,
        &bindings.clients,
        catalog,
        bindings.namespace,
        async_suffix,
    )
}

/// Reads one source file and scans it.
///
/// Invalid UTF-8 is replaced rather than rejected; only I/O failures error.
pub fn scan_file(path: &Path, catalog: &MethodCatalog, async_suffix: &str) -> RpcmapResult<CallSites> {
    let bytes = fs::read(path).with_path(path)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(scan_source(&text, catalog, async_suffix))
}

/// One pool worker: pull paths until the queue is drained and closed.
fn run_worker(
    id: usize,
    paths: Receiver<PathBuf>,
    links: Sender<LinkRecord>,
    catalog: &MethodCatalog,
    async_suffix: &str,
    counters: &SourceCounters,
) {
    for path in paths {
        let sites = match scan_file(&path, catalog, async_suffix) {
            Ok(sites) => sites,
            Err(e) => {
                warn!(worker = id, error = %e, "skipping unreadable source file");
                counters.files_failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        counters.files_scanned.fetch_add(1, Ordering::Relaxed);
        counters
            .dropped_records
            .fetch_add(sites.dropped, Ordering::Relaxed);
        if sites.records.is_empty() {
            continue;
        }
        counters.files_with_calls.fetch_add(1, Ordering::Relaxed);
        debug!(
            worker = id,
            path = %path.display(),
            records = sites.records.len(),
            "matched call sites"
        );
        for record in sites.records {
            if links.send(record).is_err() {
                warn!(worker = id, "link queue closed early, worker exiting");
                return;
            }
            counters.link_records.fetch_add(1, Ordering::Relaxed);
        }
    }
    debug!(worker = id, "path queue drained");
}

/// Builder for configuring and running a scan.
#[derive(Clone)]
pub struct Rpcmap {
    config: ScanConfig,
    parser: Arc<dyn SchemaParser>,
}

impl std::fmt::Debug for Rpcmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rpcmap")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Rpcmap {
    /// Create a scan with the bundled `.proto` parser.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            parser: Arc::new(ProtoParser),
        }
    }

    /// Use a different schema parser.
    pub fn with_parser(mut self, parser: impl SchemaParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn exclude_dirs(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Phase 1: stream schema paths from the walker into the catalog builder.
    ///
    /// Returns once the walk is exhausted and every file has been parsed.
    pub fn build_catalog(&self) -> (MethodCatalog, CatalogStats) {
        let cfg = &self.config;
        let (tx, rx) = bounded::<PathBuf>(cfg.queue_capacity);

        thread::scope(|s| {
            s.spawn(move || {
                let found = locate_into(&cfg.roots, &cfg.schema_extension, &cfg.exclude, &tx);
                debug!(found, "schema walk finished");
            });
            build_catalog(rx.into_iter(), self.parser.as_ref(), &cfg.client_suffix)
        })
    }

    /// Phase 2: fan source paths out over the worker pool and fan link
    /// records back into a single aggregator.
    ///
    /// The settings are validated first; zero workers would leave nothing to
    /// drain the path queue.
    pub fn scan_sources(&self, catalog: &MethodCatalog) -> RpcmapResult<(ServiceGraph, SourceStats)> {
        self.config.validate()?;
        let cfg = &self.config;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.workers)
            .thread_name(|i| format!("rpcmap-worker-{}", i))
            .build()
            .map_err(|e| RpcmapError::WorkerPool {
                message: e.to_string(),
            })?;

        let (path_tx, path_rx) = bounded::<PathBuf>(cfg.queue_capacity);
        let (link_tx, link_rx) = bounded::<LinkRecord>(cfg.queue_capacity);
        let counters = SourceCounters::default();

        // Workers own the only receivers, so the walker stops instead of
        // blocking if they all exit.
        let worker_paths: Vec<Receiver<PathBuf>> =
            (0..cfg.workers).map(|_| path_rx.clone()).collect();
        drop(path_rx);

        let graph = thread::scope(|s| {
            s.spawn(move || {
                let found = locate_into(&cfg.roots, &cfg.source_extension, &cfg.exclude, &path_tx);
                debug!(found, "source walk finished");
            });
            let aggregator = s.spawn(move || LinkAggregator::new().consume(link_rx));

            pool.scope(|ps| {
                for (id, paths) in worker_paths.into_iter().enumerate() {
                    let links = link_tx.clone();
                    let counters = &counters;
                    ps.spawn(move |_| {
                        run_worker(id, paths, links, catalog, &cfg.async_suffix, counters)
                    });
                }
            });
            // Every worker has returned; closing the last sender lets the
            // aggregator finish.
            drop(link_tx);

            match aggregator.join() {
                Ok((graph, _)) => graph,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        });

        Ok((graph, counters.snapshot()))
    }

    /// Runs both phases and collects statistics.
    pub fn analyze(&self) -> RpcmapResult<ScanResult> {
        self.config.validate()?;
        info!(
            roots = ?self.config.roots,
            workers = self.config.workers,
            "scan started"
        );

        let (catalog, schema) = self.build_catalog();
        if catalog.is_empty() {
            warn!("method catalog is empty, no call sites can match");
        }

        let (graph, sources) = self.scan_sources(&catalog)?;
        let stats = ScanStats {
            schema,
            sources,
            edges: graph.links.len(),
            services: graph.services.len(),
        };
        info!(
            source_files = stats.sources.files_scanned,
            failed = stats.sources.files_failed,
            records = stats.sources.link_records,
            dropped = stats.sources.dropped_records,
            edges = stats.edges,
            services = stats.services,
            "scan finished"
        );

        Ok(ScanResult { graph, stats })
    }
}
