//! The parsed GLM tree.
//!
//! A [`GlmTree`] is an ordered list of top-level [`Leaf`] blocks. Each leaf is
//! tagged with a [`LeafKind`] (object, clock, module, directive, ...) and holds
//! an ordered list of [`Entry`] values, so attributes and nested blocks keep
//! the interleaving they had in the source text.
//!
//! Every leaf carries a [`LeafId`]. Ids are handed out by a tree-wide counter
//! in parse order, are unique across all nesting levels, and are never reused:
//! leaves added after parsing (recorders, collectors, hoisted children) draw
//! fresh ids from the same counter. Ids carry no meaning beyond identity and
//! ordering.
//!
//! Relationships between objects (`parent`, `from`, `to`) are plain string
//! attributes naming another leaf's `name`. Nothing here checks that the
//! target exists; see [`crate::validate`] for that.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GlmError, GlmResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeafId(usize);

impl LeafId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LeafId(value)
    }

    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Block category of a leaf, taken from its header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeafKind {
    /// Top-level statement such as `#include "x.glm";`, `#set a=b;` or `module tape;`
    Directive { keyword: String, argument: String },
    /// `module NAME { ... }`
    Module { name: String },
    /// `clock { ... }`
    Clock,
    /// `object CLASS { ... }`
    Object { class: String },
    /// Embedded configuration block, e.g. `configuration object line_configuration { ... }`
    EmbeddedConfig { header: String },
    /// `schedule NAME { ... }` with its cron-style body kept as text
    Schedule { name: String, body: String },
    /// `class NAME { ... }` with its declarations kept as text
    Class { name: String, body: String },
    /// Block whose keyword the writer does not know (`instance { ... }` etc.)
    Other { keyword: String, value: String },
    /// Bare `{ ... }` with no header at all
    Anonymous,
}

impl LeafKind {
    /// Classify a short (one or two word) block header.
    pub fn from_header(keyword: &str, value: &str) -> Self {
        match keyword {
            "clock" => LeafKind::Clock,
            "object" => LeafKind::Object {
                class: value.to_string(),
            },
            "module" => LeafKind::Module {
                name: value.to_string(),
            },
            _ => LeafKind::Other {
                keyword: keyword.to_string(),
                value: value.to_string(),
            },
        }
    }

    /// Header text as it appears before the `{` (or the directive statement).
    pub fn describe(&self) -> String {
        match self {
            LeafKind::Directive { keyword, argument } if argument.is_empty() => keyword.clone(),
            LeafKind::Directive { keyword, argument } => format!("{keyword} {argument}"),
            LeafKind::Module { name } => format!("module {name}"),
            LeafKind::Clock => "clock".to_string(),
            LeafKind::Object { class } => format!("object {class}"),
            LeafKind::EmbeddedConfig { header } => header.clone(),
            LeafKind::Schedule { name, .. } => format!("schedule {name}"),
            LeafKind::Class { name, .. } => format!("class {name}"),
            LeafKind::Other { keyword, value } if keyword == value => keyword.clone(),
            LeafKind::Other { keyword, value } => format!("{keyword} {value}"),
            LeafKind::Anonymous => "anonymous block".to_string(),
        }
    }
}

/// One line of a block body: an attribute or a nested block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Attribute { key: String, value: String },
    Child(Leaf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    id: LeafId,
    kind: LeafKind,
    entries: Vec<Entry>,
}

impl Leaf {
    pub fn new(id: LeafId, kind: LeafKind) -> Self {
        Self {
            id,
            kind,
            entries: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn id(&self) -> LeafId {
        self.id
    }

    pub fn kind(&self) -> &LeafKind {
        &self.kind
    }

    pub fn set_kind(&mut self, kind: LeafKind) {
        self.kind = kind;
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Direct access for edits that need to keep entry positions, such as
    /// replacing a nested block with a reference attribute.
    pub fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Attribute { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Attribute lookup that also answers for the header markers, so
    /// `field("object")` on `object house { ... }` yields `house`.
    pub fn field(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.attr(key) {
            return Some(value);
        }
        match (&self.kind, key) {
            (LeafKind::Object { class }, "object") => Some(class),
            (LeafKind::Module { name }, "module") => Some(name),
            (LeafKind::Schedule { name, .. }, "name") => Some(name),
            _ => None,
        }
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        for entry in &mut self.entries {
            if let Entry::Attribute { key: k, value: v } = entry {
                if *k == key {
                    *v = value;
                    return;
                }
            }
        }
        self.entries.push(Entry::Attribute { key, value });
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let index = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Attribute { key: k, .. } if k == key))?;
        match self.entries.remove(index) {
            Entry::Attribute { value, .. } => Some(value),
            Entry::Child(_) => None,
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Attribute { key, value } => Some((key.as_str(), value.as_str())),
            Entry::Child(_) => None,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = &Leaf> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Child(child) => Some(child),
            Entry::Attribute { .. } => None,
        })
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Leaf> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            Entry::Child(child) => Some(child),
            Entry::Attribute { .. } => None,
        })
    }

    pub fn has_children(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, Entry::Child(_)))
    }

    pub fn push_child(&mut self, child: Leaf) {
        self.entries.push(Entry::Child(child));
    }

    /// Detach all nested blocks, leaving only attributes behind.
    pub fn take_children(&mut self) -> Vec<Leaf> {
        let (children, attributes): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| matches!(entry, Entry::Child(_)));
        self.entries = attributes;
        children
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Child(child) => Some(child),
                Entry::Attribute { .. } => None,
            })
            .collect()
    }

    pub fn name(&self) -> Option<&str> {
        self.field("name")
    }

    /// Object class for `object CLASS { ... }` leaves.
    pub fn class(&self) -> Option<&str> {
        match &self.kind {
            LeafKind::Object { class } => Some(class),
            _ => None,
        }
    }

    pub fn is_object(&self, class: &str) -> bool {
        self.class() == Some(class)
    }

    /// Depth-first search among this leaf's descendants.
    pub fn find(&self, id: LeafId) -> Option<&Leaf> {
        for child in self.children() {
            if child.id == id {
                return Some(child);
            }
            if let Some(found) = child.find(id) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, id: LeafId) -> Option<&mut Leaf> {
        for child in self.children_mut() {
            if child.id == id {
                return Some(child);
            }
            if let Some(found) = child.find_mut(id) {
                return Some(found);
            }
        }
        None
    }

    /// Structural equality that ignores ids at every level.
    pub fn same_shape(&self, other: &Leaf) -> bool {
        self.kind == other.kind
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|pair| match pair {
                    (
                        Entry::Attribute { key: k1, value: v1 },
                        Entry::Attribute { key: k2, value: v2 },
                    ) => k1 == k2 && v1 == v2,
                    (Entry::Child(a), Entry::Child(b)) => a.same_shape(b),
                    _ => false,
                })
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        out.push(self);
        for child in self.children() {
            child.collect_into(out);
        }
    }

    fn renumber(&mut self, counter: &mut usize) {
        self.id = LeafId(*counter);
        *counter += 1;
        for child in self.children_mut() {
            child.renumber(counter);
        }
    }
}

/// Block tallies used by `inspect` and by round-trip checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockCounts {
    pub directives: usize,
    pub modules: usize,
    pub clocks: usize,
    pub objects: usize,
    pub embedded_configs: usize,
    pub schedules: usize,
    pub classes: usize,
    pub unrecognized: usize,
    pub attributes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlmTree {
    leaves: Vec<Leaf>,
    next_id: usize,
}

impl GlmTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize and parse GLM text.
    pub fn parse(text: &str) -> GlmResult<Self> {
        crate::parser::parse(text)
    }

    pub(crate) fn from_parts(leaves: Vec<Leaf>, next_id: usize) -> Self {
        Self { leaves, next_id }
    }

    /// Serialize with default [`crate::writer::WriteOptions`].
    pub fn to_glm_string(&self) -> GlmResult<String> {
        crate::writer::write(self)
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn leaves_mut(&mut self) -> &mut [Leaf] {
        &mut self.leaves
    }

    /// Every leaf at every depth, parents before their children.
    pub fn iter_all(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        for leaf in &self.leaves {
            leaf.collect_into(&mut out);
        }
        out
    }

    pub fn get(&self, id: LeafId) -> Option<&Leaf> {
        for leaf in &self.leaves {
            if leaf.id == id {
                return Some(leaf);
            }
            if let Some(found) = leaf.find(id) {
                return Some(found);
            }
        }
        None
    }

    pub fn get_mut(&mut self, id: LeafId) -> Option<&mut Leaf> {
        for leaf in self.leaves.iter_mut() {
            if leaf.id == id {
                return Some(leaf);
            }
            if let Some(found) = leaf.find_mut(id) {
                return Some(found);
            }
        }
        None
    }

    /// Index of a top-level leaf.
    pub fn position(&self, id: LeafId) -> Option<usize> {
        self.leaves.iter().position(|leaf| leaf.id == id)
    }

    /// Allocate a fresh id.
    pub fn next_id(&mut self) -> LeafId {
        let id = LeafId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a new top-level leaf and return its id.
    pub fn push<I, K, V>(&mut self, kind: LeafKind, attrs: I) -> LeafId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let index = self.leaves.len();
        self.insert_at(index, kind, attrs)
    }

    /// Insert a new top-level leaf at `index` (clamped to the end).
    pub fn insert_at<I, K, V>(&mut self, index: usize, kind: LeafKind, attrs: I) -> LeafId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let id = self.next_id();
        let mut leaf = Leaf::new(id, kind);
        for (key, value) in attrs {
            leaf.set_attr(key, value);
        }
        let index = index.min(self.leaves.len());
        self.leaves.insert(index, leaf);
        id
    }

    /// Append an already-built leaf, keeping its ids. The id counter is
    /// advanced past every id inside it.
    pub fn push_leaf(&mut self, leaf: Leaf) {
        let mut all = Vec::new();
        leaf.collect_into(&mut all);
        if let Some(max) = all.iter().map(|l| l.id.0).max() {
            self.next_id = self.next_id.max(max + 1);
        }
        self.leaves.push(leaf);
    }

    /// Remove a top-level leaf.
    pub fn remove(&mut self, id: LeafId) -> Option<Leaf> {
        let index = self.position(id)?;
        Some(self.leaves.remove(index))
    }

    pub fn retain(&mut self, keep: impl FnMut(&Leaf) -> bool) {
        self.leaves.retain(keep);
    }

    pub fn max_id(&self) -> Option<LeafId> {
        self.iter_all().into_iter().map(Leaf::id).max()
    }

    /// Map of top-level object names to their ids.
    pub fn name_index(&self) -> HashMap<String, LeafId> {
        self.leaves
            .iter()
            .filter_map(|leaf| leaf.name().map(|name| (name.to_string(), leaf.id)))
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Leaf> {
        self.leaves.iter().find(|leaf| leaf.name() == Some(name))
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Leaf> {
        self.leaves.iter_mut().find(|leaf| leaf.name() == Some(name))
    }

    /// Stable reorder of the top level by id.
    pub fn sort_by_id(&mut self) {
        self.leaves.sort_by_key(Leaf::id);
    }

    /// Renumber every leaf contiguously from zero, depth-first in current order.
    pub fn rekey(&mut self) {
        let mut counter = 0;
        for leaf in &mut self.leaves {
            leaf.renumber(&mut counter);
        }
        self.next_id = counter;
    }

    pub fn eq_ignoring_ids(&self, other: &GlmTree) -> bool {
        self.leaves.len() == other.leaves.len()
            && self
                .leaves
                .iter()
                .zip(&other.leaves)
                .all(|(a, b)| a.same_shape(b))
    }

    pub fn counts(&self) -> BlockCounts {
        let mut counts = BlockCounts::default();
        for leaf in self.iter_all() {
            match leaf.kind() {
                LeafKind::Directive { .. } => counts.directives += 1,
                LeafKind::Module { .. } => counts.modules += 1,
                LeafKind::Clock => counts.clocks += 1,
                LeafKind::Object { .. } => counts.objects += 1,
                LeafKind::EmbeddedConfig { .. } => counts.embedded_configs += 1,
                LeafKind::Schedule { .. } => counts.schedules += 1,
                LeafKind::Class { .. } => counts.classes += 1,
                LeafKind::Other { .. } | LeafKind::Anonymous => counts.unrecognized += 1,
            }
            counts.attributes += leaf.attributes().count();
        }
        counts
    }

    /// Number of objects per class, at every depth.
    pub fn class_histogram(&self) -> BTreeMap<String, usize> {
        let mut histogram = BTreeMap::new();
        for leaf in self.iter_all() {
            if let Some(class) = leaf.class() {
                *histogram.entry(class.to_string()).or_insert(0) += 1;
            }
        }
        histogram
    }
}

impl FromStr for GlmTree {
    type Err = GlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GlmTree::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn house(id: usize) -> Leaf {
        Leaf::new(
            LeafId::new(id),
            LeafKind::Object {
                class: "house".into(),
            },
        )
        .with_attr("name", format!("h{id}"))
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let mut leaf = house(0).with_attr("floor_area", "1500");
        leaf.set_attr("name", "renamed");
        let keys: Vec<&str> = leaf.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["name", "floor_area"]);
        assert_eq!(leaf.attr("name"), Some("renamed"));
    }

    #[test]
    fn field_answers_for_header_markers() {
        let leaf = house(0);
        assert_eq!(leaf.field("object"), Some("house"));
        assert_eq!(leaf.attr("object"), None);
        assert_eq!(leaf.name(), Some("h0"));
    }

    #[test]
    fn push_assigns_fresh_monotonic_ids() {
        let mut tree = GlmTree::new();
        let a = tree.push(LeafKind::Clock, [("timezone", "EST+5EDT")]);
        let b = tree.push(
            LeafKind::Object {
                class: "node".into(),
            },
            [("name", "n1")],
        );
        assert!(b > a);
        assert_eq!(tree.max_id(), Some(b));
        assert_eq!(tree.find_by_name("n1").map(Leaf::id), Some(b));
    }

    #[test]
    fn push_leaf_advances_counter_past_nested_ids() {
        let mut tree = GlmTree::new();
        let mut outer = house(3);
        outer.push_child(house(9));
        tree.push_leaf(outer);
        let fresh = tree.next_id();
        assert_eq!(fresh, LeafId::new(10));
    }

    #[test]
    fn get_mut_finds_nested_leaf() {
        let mut outer = house(0);
        let mut middle = house(1);
        middle.push_child(house(2));
        outer.push_child(middle);
        let mut tree = GlmTree::from_parts(vec![outer], 3);

        tree.get_mut(LeafId::new(2))
            .expect("nested leaf")
            .set_attr("floor_area", "900");
        assert_eq!(
            tree.get(LeafId::new(2)).and_then(|l| l.attr("floor_area")),
            Some("900")
        );
        assert_eq!(tree.iter_all().len(), 3);
    }

    #[test]
    fn take_children_keeps_attribute_order() {
        let mut outer = house(0).with_attr("a", "1");
        outer.push_child(house(1));
        outer.set_attr("b", "2");
        let children = outer.take_children();
        assert_eq!(children.len(), 1);
        let keys: Vec<&str> = outer.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["name", "a", "b"]);
        assert!(!outer.has_children());
    }

    #[test]
    fn rekey_renumbers_depth_first() {
        let mut outer = house(4);
        outer.push_child(house(8));
        let mut tree = GlmTree::from_parts(vec![house(10), outer], 11);
        tree.rekey();
        let ids: Vec<usize> = tree.iter_all().iter().map(|l| l.id().value()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(tree.next_id(), LeafId::new(3));
    }

    #[test]
    fn sort_and_remove() {
        let mut tree = GlmTree::from_parts(vec![house(5), house(2)], 6);
        tree.sort_by_id();
        assert_eq!(tree.leaves()[0].id(), LeafId::new(2));
        let removed = tree.remove(LeafId::new(5)).expect("removed");
        assert_eq!(removed.name(), Some("h5"));
        assert_eq!(tree.len(), 1);
        assert!(tree.remove(LeafId::new(5)).is_none());
    }

    #[test]
    fn eq_ignoring_ids_compares_shape_only() {
        let a = GlmTree::from_parts(vec![house(0)], 1);
        let mut b = GlmTree::from_parts(vec![house(0)], 1);
        b.rekey();
        b.leaves_mut()[0] = Leaf::new(
            LeafId::new(42),
            LeafKind::Object {
                class: "house".into(),
            },
        )
        .with_attr("name", "h0");
        assert!(a.eq_ignoring_ids(&b));
        b.leaves_mut()[0].set_attr("name", "other");
        assert!(!a.eq_ignoring_ids(&b));
    }

    #[test]
    fn describe_headers() {
        assert_eq!(LeafKind::from_header("clock", "clock"), LeafKind::Clock);
        assert_eq!(
            LeafKind::from_header("module", "powerflow").describe(),
            "module powerflow"
        );
        assert_eq!(
            LeafKind::from_header("instance", "instance").describe(),
            "instance"
        );
        assert_eq!(LeafId::new(7).to_string(), "#7");
    }
}
