//! Documents: a tree plus the registry of anchored values it references.
//!
//! Anchored values live only in [`Document::anchors`]; the tree refers to them
//! by name through [`Node::Alias`]. Renaming or repointing an anchor is a
//! registry update plus a rewrite of alias names, never a pointer rewrite.
//!
//! # Examples
//!
//! ```
//! use ymerge::{Document, Node};
//! use ymerge::tree::Mapping;
//!
//! let mut doc = Document::default();
//! let alias = doc.anchor("shared", Node::from("Shared Value"));
//!
//! let mut root = Mapping::new();
//! root.insert("first".to_string(), alias.clone());
//! root.insert("second".to_string(), alias);
//! doc.root = Node::Mapping(root);
//!
//! let plain = doc.expand().unwrap();
//! assert_eq!(
//!     plain.as_mapping().unwrap().get("second"),
//!     Some(&Node::from("Shared Value"))
//! );
//! ```

use crate::coords::{Location, ParentRef};
use crate::error::MergeError;
use crate::tree::{Mapping, Node};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Anchor name → anchored value.
pub type AnchorRegistry = IndexMap<String, Node>;

/// Recursion ceiling for alias-aware comparisons.
const MAX_COMPARE_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub root: Node,
    pub anchors: AnchorRegistry,
}

/// Where a location starts after aliases along the way are followed.
struct Slot {
    anchor: Option<String>,
    steps: Vec<ParentRef>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            anchors: AnchorRegistry::new(),
        }
    }

    pub fn with_anchors(root: Node, anchors: AnchorRegistry) -> Self {
        Self { root, anchors }
    }

    /// True for a document with no content at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_null() && self.anchors.is_empty()
    }

    /// Registers (or replaces) an anchored value and returns an alias to it.
    pub fn anchor(&mut self, name: impl Into<String>, value: Node) -> Node {
        let name = name.into();
        self.anchors.insert(name.clone(), value);
        Node::Alias(name)
    }

    /// Follows an alias chain to the anchored value.
    pub fn resolve<'a>(&'a self, node: &'a Node) -> Result<&'a Node, MergeError> {
        resolve_in(&self.anchors, node)
    }

    /// Immutable access to the node stored at `location`.
    ///
    /// Aliases encountered before the last step are followed; the node
    /// returned for the final step is the slot itself and may be an alias.
    pub fn get(&self, location: &[ParentRef]) -> Option<&Node> {
        let mut current = &self.root;
        for step in location {
            current = self.resolve(current).ok()?;
            current = match (current, step) {
                (Node::Mapping(map), ParentRef::Key(key)) => map.get(key)?,
                (Node::Sequence(seq), ParentRef::Index(index)) => seq.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Like [`get`](Self::get), but also follows an alias in the final slot.
    pub fn get_resolved(&self, location: &[ParentRef]) -> Option<&Node> {
        self.get(location)
            .and_then(|node| self.resolve(node).ok())
    }

    /// Mutable access to the slot at `location`, suitable for replacing the
    /// value stored there.
    pub fn get_mut(&mut self, location: &[ParentRef]) -> Option<&mut Node> {
        let slot = self.locate(location, false)?;
        self.walk_mut(slot)
    }

    /// Mutable access to the value at `location`, following a final alias into
    /// the registry so that in-place edits reach the anchored value.
    pub fn get_resolved_mut(&mut self, location: &[ParentRef]) -> Option<&mut Node> {
        let slot = self.locate(location, true)?;
        self.walk_mut(slot)
    }

    /// Replaces the value stored at `location`, returning the previous value.
    pub fn replace(&mut self, location: &[ParentRef], value: Node) -> Option<Node> {
        self.get_mut(location)
            .map(|slot| std::mem::replace(slot, value))
    }

    fn locate(&self, location: &[ParentRef], resolve_last: bool) -> Option<Slot> {
        let mut slot = Slot {
            anchor: None,
            steps: Vec::new(),
        };
        let mut current = &self.root;
        for (i, step) in location.iter().enumerate() {
            let mut hops = 0;
            while let Node::Alias(name) = current {
                hops += 1;
                if hops > self.anchors.len() {
                    return None;
                }
                current = self.anchors.get(name)?;
                slot.anchor = Some(name.clone());
                slot.steps.clear();
            }
            current = match (current, step) {
                (Node::Mapping(map), ParentRef::Key(key)) => map.get(key)?,
                (Node::Sequence(seq), ParentRef::Index(index)) => seq.get(*index)?,
                _ => return None,
            };
            slot.steps.push(location[i].clone());
        }
        if resolve_last {
            let mut hops = 0;
            while let Node::Alias(name) = current {
                hops += 1;
                if hops > self.anchors.len() {
                    return None;
                }
                current = self.anchors.get(name)?;
                slot.anchor = Some(name.clone());
                slot.steps.clear();
            }
        }
        Some(slot)
    }

    fn walk_mut(&mut self, slot: Slot) -> Option<&mut Node> {
        let mut current = match &slot.anchor {
            Some(name) => self.anchors.get_mut(name)?,
            None => &mut self.root,
        };
        for step in &slot.steps {
            current = match (current, step) {
                (Node::Mapping(map), ParentRef::Key(key)) => map.get_mut(key)?,
                (Node::Sequence(seq), ParentRef::Index(index)) => seq.get_mut(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Inserts `value` under `key` in the Mapping at `location`, converting a
    /// Null at that location into an empty Mapping first.
    ///
    /// Returns `false` when the location holds neither a Mapping nor Null.
    pub fn insert_key(&mut self, location: &[ParentRef], key: &str, value: Node) -> bool {
        let Some(target) = self.get_resolved_mut(location) else {
            return false;
        };
        if target.is_null() {
            *target = Node::Mapping(Mapping::new());
        }
        match target {
            Node::Mapping(map) => {
                map.insert(key.to_string(), value);
                true
            }
            _ => false,
        }
    }

    /// Compares two values through their respective documents' anchors.
    pub fn values_equal(&self, a: &Node, other: &Document, b: &Node) -> bool {
        values_equal_in(&self.anchors, a, &other.anchors, b, 0)
    }

    /// Produces the plain tree with every alias replaced by its value.
    pub fn expand(&self) -> Result<Node, MergeError> {
        let mut active = Vec::new();
        self.expand_node(&self.root, &mut active)
    }

    fn expand_node(&self, node: &Node, active: &mut Vec<String>) -> Result<Node, MergeError> {
        match node {
            Node::Alias(name) => {
                if active.iter().any(|a| a == name) {
                    return Err(MergeError::CyclicAlias { name: name.clone() });
                }
                let value = self
                    .anchors
                    .get(name)
                    .ok_or_else(|| MergeError::UnknownAnchor { name: name.clone() })?;
                active.push(name.clone());
                let expanded = self.expand_node(value, active);
                active.pop();
                expanded
            }
            Node::Mapping(map) => {
                let mut expanded = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    expanded.insert(key.clone(), self.expand_node(value, active)?);
                }
                Ok(Node::Mapping(expanded))
            }
            Node::Sequence(seq) => seq
                .iter()
                .map(|item| self.expand_node(item, active))
                .collect::<Result<Vec<_>, _>>()
                .map(Node::Sequence),
            scalar => Ok(scalar.clone()),
        }
    }

    /// Renames an anchor, repointing every alias in this document to the new name.
    pub fn rename_anchor(&mut self, from: &str, to: &str) {
        if let Some(index) = self.anchors.get_index_of(from) {
            if let Some((_, value)) = self.anchors.shift_remove_index(index) {
                self.anchors.shift_insert(index, to.to_string(), value);
            }
        }
        self.root.rename_aliases(from, to);
        for value in self.anchors.values_mut() {
            value.rename_aliases(from, to);
        }
    }

    /// Anchor names referenced from the tree, in first-use order.
    pub fn referenced_anchors(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        collect_aliases(&self.root, &mut seen, &mut names);
        names
    }
}

fn collect_aliases(node: &Node, seen: &mut HashSet<String>, names: &mut Vec<String>) {
    match node {
        Node::Alias(name) => {
            if seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
        Node::Mapping(map) => map.values().for_each(|v| collect_aliases(v, seen, names)),
        Node::Sequence(seq) => seq.iter().for_each(|v| collect_aliases(v, seen, names)),
        _ => {}
    }
}

/// Follows an alias chain within `anchors`.
pub(crate) fn resolve_in<'a>(
    anchors: &'a AnchorRegistry,
    node: &'a Node,
) -> Result<&'a Node, MergeError> {
    let mut current = node;
    let mut hops = 0;
    while let Node::Alias(name) = current {
        hops += 1;
        if hops > anchors.len() {
            return Err(MergeError::CyclicAlias { name: name.clone() });
        }
        current = anchors
            .get(name)
            .ok_or_else(|| MergeError::UnknownAnchor { name: name.clone() })?;
    }
    Ok(current)
}

/// Alias-aware value equality across two registries.
pub(crate) fn values_equal_in(
    left_anchors: &AnchorRegistry,
    a: &Node,
    right_anchors: &AnchorRegistry,
    b: &Node,
    depth: usize,
) -> bool {
    if depth > MAX_COMPARE_DEPTH {
        return false;
    }
    let (Ok(a), Ok(b)) = (resolve_in(left_anchors, a), resolve_in(right_anchors, b)) else {
        return false;
    };
    match (a, b) {
        (Node::Mapping(left), Node::Mapping(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, value)| {
                    right.get(key).is_some_and(|other| {
                        values_equal_in(left_anchors, value, right_anchors, other, depth + 1)
                    })
                })
        }
        (Node::Sequence(left), Node::Sequence(right)) => {
            left.len() == right.len()
                && left.iter().zip(right.iter()).all(|(x, y)| {
                    values_equal_in(left_anchors, x, right_anchors, y, depth + 1)
                })
        }
        (left, right) => left.semantic_equals(right),
    }
}
