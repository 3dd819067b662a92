//! Link aggregation: folds per-call-site records into a deduplicated
//! service graph.
//!
//! Single-writer discipline: workers only *send* [`LinkRecord`]s; the one
//! [`LinkAggregator`] that owns the graph is the only code that mutates it.
//! Union into ordered sets is commutative, so the arrival order of records
//! never changes the result, and iteration order is stable for rendering.

use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// One observed call site: `source_service` calls `method_name` on
/// `target_service`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LinkRecord {
    pub source_service: String,
    pub target_service: String,
    pub method_name: String,
}

impl LinkRecord {
    pub fn new(source: &str, target: &str, method: &str) -> Self {
        Self {
            source_service: source.to_string(),
            target_service: target.to_string(),
            method_name: method.to_string(),
        }
    }

    pub fn key(&self) -> ServiceLinkKey {
        ServiceLinkKey {
            source: self.source_service.clone(),
            target: self.target_service.clone(),
        }
    }
}

/// Directed edge caller -> callee.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ServiceLinkKey {
    pub source: String,
    pub target: String,
}

impl ServiceLinkKey {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// All distinct service names appearing on either end of a link.
pub type ServiceSet = BTreeSet<String>;

/// Edge -> set of distinct method names invoked across that edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkGraph {
    links: BTreeMap<ServiceLinkKey, BTreeSet<String>>,
}

impl LinkGraph {
    /// Adds a record; returns `true` if the method was new for its edge.
    pub fn insert(&mut self, record: &LinkRecord) -> bool {
        self.links
            .entry(record.key())
            .or_default()
            .insert(record.method_name.clone())
    }

    /// Distinct methods seen on `source -> target`.
    pub fn methods(&self, source: &str, target: &str) -> Option<&BTreeSet<String>> {
        self.links.get(&ServiceLinkKey::new(source, target))
    }

    /// Edge weight: number of distinct methods, 0 for an absent edge.
    pub fn weight(&self, source: &str, target: &str) -> usize {
        self.methods(source, target).map_or(0, BTreeSet::len)
    }

    /// Edges in (source, target) order.
    pub fn edges(&self) -> impl Iterator<Item = (&ServiceLinkKey, &BTreeSet<String>)> {
        self.links.iter()
    }

    /// Number of distinct edges.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Services called by `service`, sorted.
    pub fn callees_of<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.links
            .keys()
            .filter(move |k| k.source == service)
            .map(|k| k.target.as_str())
    }

    /// Services calling `service`, sorted.
    pub fn callers_of<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.links
            .keys()
            .filter(move |k| k.target == service)
            .map(|k| k.source.as_str())
    }

    /// Converts to a petgraph map with edge weight = distinct method count.
    pub fn to_digraph(&self) -> DiGraphMap<&str, usize> {
        let mut g = DiGraphMap::new();
        for (key, methods) in &self.links {
            g.add_edge(key.source.as_str(), key.target.as_str(), methods.len());
        }
        g
    }
}

/// Finalized output of a scan: the link graph and its participating
/// services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceGraph {
    pub links: LinkGraph,
    pub services: ServiceSet,
}

/// Sole owner and mutator of a [`ServiceGraph`] under construction.
#[derive(Debug, Default)]
pub struct LinkAggregator {
    graph: ServiceGraph,
    records: usize,
}

impl LinkAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one record into the graph.
    ///
    /// A record with an empty endpoint is rejected; empty service names are
    /// never allowed into the graph.
    pub fn add(&mut self, record: LinkRecord) {
        if record.source_service.is_empty() || record.target_service.is_empty() {
            warn!(?record, "rejecting link record with empty service name");
            return;
        }
        self.records += 1;
        self.graph.links.insert(&record);
        self.graph.services.insert(record.source_service);
        self.graph.services.insert(record.target_service);
    }

    /// Drains `input` until it is closed and every sender is gone.
    ///
    /// With a channel receiver this blocks while the queue is empty but still
    /// open, and returns once all producers have dropped their senders.
    pub fn consume(mut self, input: impl IntoIterator<Item = LinkRecord>) -> (ServiceGraph, usize) {
        for record in input {
            self.add(record);
        }
        debug!(
            records = self.records,
            edges = self.graph.links.len(),
            "link queue closed"
        );
        self.finish()
    }

    /// Number of records accepted so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Hands over the finished, now read-only graph.
    pub fn finish(self) -> (ServiceGraph, usize) {
        (self.graph, self.records)
    }
}
