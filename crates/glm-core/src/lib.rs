//! # glm-core: GridLAB-D model trees
//!
//! Parses GLM (GridLAB-D Model) text into an ordered tree of blocks and
//! writes it back out.
//!
//! ## Design
//!
//! A GLM file is a sequence of brace-delimited blocks and top-level
//! directives. The tree mirrors that shape:
//! - [`GlmTree`]: ordered top-level leaves plus a tree-wide id counter
//! - [`Leaf`]: one block or directive, tagged with a [`LeafKind`]
//! - [`Entry`]: an attribute (`key value;`) or a nested block, in source order
//!
//! Relationships (`parent`, `from`, `to`) stay plain strings naming another
//! object. [`validate::validate_references`] checks them after the fact, and
//! [`graph_utils::FeederGraph`] projects them into a petgraph graph.
//!
//! ## Quick Start
//!
//! ```rust
//! use glm_core::GlmTree;
//!
//! let mut tree = GlmTree::parse("object house { name h1; floor_area 1500; };").unwrap();
//! let house = tree.find_by_name_mut("h1").unwrap();
//! house.set_attr("floor_area", "1800");
//!
//! let text = tree.to_glm_string().unwrap();
//! assert!(text.contains("floor_area 1800;"));
//! ```
//!
//! ## Modules
//!
//! - [`token`] - Tokenizer
//! - [`parser`] - Stack-based tree builder
//! - [`writer`] - Serializer and [`WriteOptions`]
//! - [`graph_utils`] - Topology view (stats, islands, DOT, D3 JSON)
//! - [`validate`] - Dangling reference and duplicate name checks
//! - [`diagnostics`] - Non-fatal issue reporting

pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod parser;
pub mod token;
pub mod tree;
pub mod validate;
pub mod writer;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GlmError, GlmResult};
pub use graph_utils::{
    export_graph, find_islands, graph_stats, to_d3_json, FeederGraph, GraphEdge, GraphNode,
    GraphStats, IslandAnalysis,
};
pub use parser::parse;
pub use token::{tokenize, Token, TokenKind};
pub use tree::{BlockCounts, Entry, GlmTree, Leaf, LeafId, LeafKind};
pub use validate::validate_references;
pub use writer::{write, write_lenient, write_sorted, write_with, WriteOptions};
