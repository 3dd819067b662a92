//! Graphviz DOT diagram of the service graph.
//!
//! Services are pinned on a circle (see [`circular_layout`]) so the picture
//! is stable between runs; render with `neato -n2 -Tsvg services.dot`.
//! Edge weight is the number of distinct methods called across the edge.

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::f64::consts::TAU;
use std::fmt::Write;
use tracing::error;

use crate::aggregate::ServiceGraph;

/// Radius used when none is configured.
pub const DEFAULT_RADIUS: f64 = 400.0;

/// Position of one service node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePosition<'a> {
    pub name: &'a str,
    pub x: f64,
    pub y: f64,
}

/// Spaces services evenly on a circle of `radius` centred at the origin,
/// the first one at angle zero, in the order given.
pub fn circular_layout<'a>(
    services: impl IntoIterator<Item = &'a str>,
    radius: f64,
) -> Vec<NodePosition<'a>> {
    let names: Vec<&str> = services.into_iter().collect();
    let n = names.len();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let angle = TAU * i as f64 / n as f64;
            NodePosition {
                name,
                x: radius * angle.cos(),
                y: radius * angle.sin(),
            }
        })
        .collect()
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Generate a Graphviz DOT representation of the service graph.
///
/// - nodes are pinned at their circular-layout position
/// - node labels carry outgoing/incoming edge counts
/// - edge `penwidth` and label are the edge weight, the tooltip lists methods
pub fn generate_dot(graph: &ServiceGraph, radius: f64) -> String {
    // ~90 bytes/node + ~120 bytes/edge + header/footer
    let estimated_capacity = graph.services.len() * 90 + graph.links.len() * 120 + 200;
    let mut dot = String::with_capacity(estimated_capacity);

    if let Err(e) = write_dot_content(&mut dot, graph, radius) {
        error!(error = %e, "failed to generate DOT string");
        return "digraph rpcmap {\n}\n".to_string();
    }

    dot
}

fn write_dot_content(dot: &mut String, graph: &ServiceGraph, radius: f64) -> std::fmt::Result {
    let g: DiGraphMap<&str, usize> = graph.links.to_digraph();

    writeln!(dot, "digraph rpcmap {{")?;
    writeln!(dot, "  layout=neato;")?;
    writeln!(dot, "  inputscale=72;")?;
    writeln!(dot, "  overlap=false;")?;
    writeln!(dot, "  splines=true;")?;
    writeln!(
        dot,
        "  node [shape=box, style=\"rounded,filled\", fillcolor=lightblue, fontname=\"JetBrains Mono\"];"
    )?;
    writeln!(dot, "  edge [color=gray40, fontname=\"JetBrains Mono\"];")?;
    writeln!(dot)?;

    for node in circular_layout(graph.services.iter().map(String::as_str), radius) {
        let out = g.neighbors_directed(node.name, Direction::Outgoing).count();
        let inc = g.neighbors_directed(node.name, Direction::Incoming).count();
        let name = escape(node.name);
        writeln!(
            dot,
            "  \"{}\" [label=\"{}\\nout {} / in {}\", pos=\"{:.2},{:.2}!\"];",
            name, name, out, inc, node.x, node.y
        )?;
    }

    writeln!(dot)?;

    for (source, target, &weight) in g.all_edges() {
        let tooltip = graph
            .links
            .methods(source, target)
            .map(|methods| {
                methods
                    .iter()
                    .map(|m| escape(m))
                    .collect::<Vec<_>>()
                    .join("\\n")
            })
            .unwrap_or_default();
        writeln!(
            dot,
            "  \"{}\" -> \"{}\" [penwidth={}, label=\"{}\", tooltip=\"{}\"];",
            escape(source),
            escape(target),
            weight,
            weight,
            tooltip
        )?;
    }

    writeln!(dot, "}}")?;
    Ok(())
}
