use crate::tree::{GlmTree, Leaf};
use anyhow::{anyhow, Result};
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Edge type used for `parent` relationships.
pub const PARENT_CHILD: &str = "parentChild";

/// Node type for names that are only referenced, never defined.
pub const UNKNOWN_TYPE: &str = "unknown";

/// A named object that is not a link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub name: String,
    /// Object class, or [`UNKNOWN_TYPE`]
    pub kind: String,
    /// Carries a `bustype` attribute
    pub substation: bool,
    pub attributes: BTreeMap<String, String>,
    /// `(latitude, longitude)`, own or inherited
    pub pos: Option<(f64, f64)>,
}

impl GraphNode {
    fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: UNKNOWN_TYPE.to_string(),
            substation: false,
            attributes: BTreeMap::new(),
            pos: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.name
    }
}

/// A `from`/`to` link object or a `parent` relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    /// Link class (`overhead_line`, `transformer`, ...) or [`PARENT_CHILD`]
    pub kind: String,
    /// Name of the link object; empty for parent edges and unnamed links
    pub name: String,
    /// Number of A/B/C phases
    pub phases: usize,
}

/// Undirected topology view of a feeder tree. Only top-level leaves take
/// part; de-embed first to see nested objects.
#[derive(Debug, Clone, Default)]
pub struct FeederGraph {
    pub graph: UnGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
}

impl FeederGraph {
    pub fn from_tree(tree: &GlmTree) -> Self {
        let mut feeder = FeederGraph::default();
        // child name -> name to inherit coordinates from
        let mut upstream: HashMap<String, String> = HashMap::new();

        for leaf in tree.leaves() {
            let Some(class) = leaf.class() else {
                continue;
            };
            if let (Some(from), Some(to)) = (leaf.attr("from"), leaf.attr("to")) {
                let edge = GraphEdge {
                    kind: class.to_string(),
                    name: leaf.name().unwrap_or_default().to_string(),
                    phases: phase_count(leaf.attr("phases").unwrap_or("AN")),
                };
                let a = feeder.node_index(from);
                let b = feeder.node_index(to);
                feeder.graph.add_edge(a, b, edge);
                upstream.entry(to.to_string()).or_insert_with(|| from.to_string());
                continue;
            }
            let Some(name) = leaf.name() else {
                continue;
            };
            let idx = feeder.node_index(name);
            feeder.describe_node(idx, class, leaf);
            if let Some(parent) = leaf.attr("parent") {
                let parent_idx = feeder.node_index(parent);
                feeder.graph.add_edge(
                    idx,
                    parent_idx,
                    GraphEdge {
                        kind: PARENT_CHILD.to_string(),
                        name: String::new(),
                        phases: 1,
                    },
                );
                upstream.insert(name.to_string(), parent.to_string());
            }
        }

        feeder.inherit_positions(&upstream);
        feeder
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    fn node_index(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode::placeholder(name));
        self.index.insert(name.to_string(), idx);
        idx
    }

    fn describe_node(&mut self, idx: NodeIndex, class: &str, leaf: &Leaf) {
        let node = &mut self.graph[idx];
        node.kind = class.to_string();
        node.substation = leaf.attr("bustype").is_some();
        node.attributes = leaf
            .attributes()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let (Some(lat), Some(lon)) = (leaf.attr("latitude"), leaf.attr("longitude")) {
            node.pos = Some(match (lat.parse::<f64>(), lon.parse::<f64>()) {
                (Ok(lat), Ok(lon)) => (lat, lon),
                _ => (0.0, 0.0),
            });
        }
    }

    /// Nodes without coordinates take the nearest upstream node's, else a
    /// default corner of the map: (max latitude, min longitude).
    fn inherit_positions(&mut self, upstream: &HashMap<String, String>) {
        let located: Vec<(f64, f64)> = self
            .graph
            .node_weights()
            .filter_map(|node| node.pos)
            .collect();
        if located.is_empty() {
            return;
        }
        let default = (
            located.iter().map(|p| p.0).fold(f64::MIN, f64::max),
            located.iter().map(|p| p.1).fold(f64::MAX, f64::min),
        );

        let missing: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph[idx].pos.is_none())
            .collect();
        for idx in missing {
            let mut seen = HashSet::new();
            let mut current = self.graph[idx].name.clone();
            let mut found = None;
            while let Some(next) = upstream.get(&current) {
                if !seen.insert(next.clone()) {
                    break;
                }
                if let Some(pos) = self.node(next).and_then(|node| node.pos) {
                    found = Some(pos);
                    break;
                }
                current = next.clone();
            }
            self.graph[idx].pos = Some(found.unwrap_or(default));
        }
    }
}

/// Number of phases in a `phases` value, neutrals excluded.
pub fn phase_count(phases: &str) -> usize {
    phases
        .chars()
        .filter(|c| matches!(c.to_ascii_lowercase(), 'a' | 'b' | 'c'))
        .count()
}

/// Summary statistics produced by `graph stats`.
#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// One connected component.
#[derive(Debug, Serialize)]
pub struct IslandSummary {
    pub island_id: usize,
    pub node_count: usize,
}

/// Which island a node ended up in.
#[derive(Debug, Serialize)]
pub struct NodeAssignment {
    pub node_index: usize,
    pub label: String,
    pub island_id: usize,
}

#[derive(Debug, Serialize)]
pub struct IslandAnalysis {
    pub islands: Vec<IslandSummary>,
    pub assignments: Vec<NodeAssignment>,
}

pub fn graph_stats(feeder: &FeederGraph) -> Result<GraphStats> {
    let graph = &feeder.graph;
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();
    let degrees: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.neighbors(node).count())
        .collect();
    let min_degree = degrees.iter().copied().min().unwrap_or(0);
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        2.0 * edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    Ok(GraphStats {
        node_count,
        edge_count,
        connected_components: connected_components(graph),
        min_degree,
        avg_degree,
        max_degree,
        density,
    })
}

/// Breadth-first labelling of connected components.
pub fn find_islands(feeder: &FeederGraph) -> Result<IslandAnalysis> {
    let graph = &feeder.graph;
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    let mut assignments = Vec::new();
    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let island_id = islands.len();
        let mut queue = VecDeque::from([start]);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node);
            queue.extend(graph.neighbors(node).filter(|n| !visited.contains(n)));
        }
        islands.push(IslandSummary {
            island_id,
            node_count: members.len(),
        });
        assignments.extend(members.into_iter().map(|node| NodeAssignment {
            node_index: node.index(),
            label: graph[node].label().to_string(),
            island_id,
        }));
    }
    assignments.sort_by_key(|assignment| assignment.node_index);
    Ok(IslandAnalysis {
        islands,
        assignments,
    })
}

pub fn export_graph(feeder: &FeederGraph, format: &str) -> Result<String> {
    match format.to_ascii_lowercase().as_str() {
        "graphviz" | "dot" => Ok(render_dot(feeder)),
        "d3" | "json" => Ok(serde_json::to_string_pretty(&to_d3_json(feeder))?),
        other => Err(anyhow!("unsupported graph export format '{other}'")),
    }
}

fn render_dot(feeder: &FeederGraph) -> String {
    let graph = &feeder.graph;
    let mut buffer = String::from("graph glm_feeder {\n");
    for node in graph.node_indices() {
        let label = sanitize_label(graph[node].label());
        buffer.push_str(&format!("  n{} [label=\"{}\"];\n", node.index(), label));
    }
    for edge in graph.edge_references() {
        let source = edge.source().index();
        let target = edge.target().index();
        if edge.weight().kind == PARENT_CHILD {
            buffer.push_str(&format!("  n{source} -- n{target} [style=dotted];\n"));
        } else {
            buffer.push_str(&format!("  n{source} -- n{target};\n"));
        }
    }
    buffer.push('}');
    buffer
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}

/// Force-layout JSON: `{"nodes": [...], "links": [...]}`. Node groups are
/// numbered per object class in first-seen order, `unknown` being 0; every
/// attribute is copied with a leading underscore.
pub fn to_d3_json(feeder: &FeederGraph) -> Value {
    let graph = &feeder.graph;
    let mut groups: Vec<&str> = vec![UNKNOWN_TYPE];
    let mut nodes = Vec::with_capacity(graph.node_count());
    for idx in graph.node_indices() {
        let node = &graph[idx];
        let group = match groups.iter().position(|g| *g == node.kind) {
            Some(group) => group,
            None => {
                groups.push(&node.kind);
                groups.len() - 1
            }
        };
        let mut entry = Map::new();
        entry.insert("name".into(), json!(node.name));
        entry.insert("group".into(), json!(group));
        entry.insert("_type".into(), json!(node.kind));
        for (key, value) in &node.attributes {
            if key != "name" {
                entry.insert(format!("_{key}"), json!(value));
            }
        }
        nodes.push(Value::Object(entry));
    }
    let links: Vec<Value> = graph
        .edge_references()
        .map(|edge| {
            json!({
                "source": edge.source().index(),
                "target": edge.target().index(),
                "value": 1,
            })
        })
        .collect();
    json!({ "nodes": nodes, "links": links })
}
