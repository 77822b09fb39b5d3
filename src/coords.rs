//! Node coordinates: a node together with where it lives in its document.
//!
//! Tree nodes have no stable identity, so a matched node cannot be replaced
//! through the node itself. A [`NodeCoordinate`] records the position of the
//! node inside its parent (`parentref`) and the chain of positions leading
//! from the document root to that parent (`ancestry`). Together these form a
//! [`Location`] that [`Document`](crate::document::Document) can walk to write
//! a new value into the parent.
//!
//! While a path is being resolved, matches are [`NodeRef`]s that borrow from
//! the document; only the final matches are copied out as coordinates.

use crate::path::{escape_key, YamlPath};
use crate::tree::Node;
use std::borrow::Cow;
use std::fmt;

/// Position of a node within its immediate parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentRef {
    /// Key within a Mapping
    Key(String),
    /// Index within a Sequence
    Index(usize),
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRef::Key(key) => write!(f, "{}", key),
            ParentRef::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Ordered steps from a document root to a node. Empty means the root.
pub type Location = Vec<ParentRef>;

/// Renders a location in forward-slash YAML Path notation.
///
/// - `[]` → `"/"`
/// - `[Key("hash"), Key("subkey")]` → `"/hash/subkey"`
/// - `[Key("list"), Index(0), Key("id")]` → `"/list[0]/id"`
pub fn format_location(location: &[ParentRef]) -> String {
    if location.is_empty() {
        return "/".to_string();
    }

    let mut result = String::new();
    for step in location {
        match step {
            ParentRef::Key(key) => {
                result.push('/');
                result.push_str(&escape_key(key, '/'));
            }
            ParentRef::Index(index) => result.push_str(&format!("[{}]", index)),
        }
    }
    result
}

/// A node, its parent, and its position within that parent.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCoordinate {
    /// Snapshot of the node's value; may be an `Alias`.
    pub node: Node,
    /// Key or index of the node within its parent; `None` for the document root.
    pub parentref: Option<ParentRef>,
    /// Steps from the document root to the parent of this node.
    pub ancestry: Location,
    /// The YAML Path query that produced this coordinate, if any.
    pub path: Option<YamlPath>,
    /// Set for synthesized values (such as `name()` results) that do not
    /// exist in the document and therefore cannot be written back.
    pub detached: bool,
}

impl NodeCoordinate {
    /// Coordinate of a document root.
    pub fn root(node: Node) -> Self {
        Self {
            node,
            parentref: None,
            ancestry: Vec::new(),
            path: None,
            detached: false,
        }
    }

    /// Coordinate of `node` living at `parentref` inside the node at `ancestry`.
    pub fn child(node: Node, ancestry: Location, parentref: ParentRef) -> Self {
        Self {
            node,
            parentref: Some(parentref),
            ancestry,
            path: None,
            detached: false,
        }
    }

    /// Coordinate for a synthesized value derived from the node at `location`.
    pub fn detached(node: Node, location: Location) -> Self {
        Self {
            node,
            parentref: None,
            ancestry: location,
            path: None,
            detached: true,
        }
    }

    pub fn with_path(mut self, path: &YamlPath) -> Self {
        self.path = Some(path.clone());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parentref.is_none() && !self.detached
    }

    /// Full location of this node: ancestry followed by `parentref`.
    pub fn location(&self) -> Location {
        let mut location = self.ancestry.clone();
        if let Some(parentref) = &self.parentref {
            location.push(parentref.clone());
        }
        location
    }

    /// Location of the immediate parent, or `None` for the root.
    pub fn parent_location(&self) -> Option<&[ParentRef]> {
        self.parentref.as_ref().map(|_| self.ancestry.as_slice())
    }

    /// Discards the coordinate metadata.
    pub fn unwrap(self) -> Node {
        self.node
    }
}

impl fmt::Display for NodeCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node.preview(usize::MAX))
    }
}

/// A match borrowed from the document being searched.
///
/// Synthesized values are owned and `detached`; everything else borrows the
/// slot it was found in, which may hold an alias.
#[derive(Debug, Clone)]
pub struct NodeRef<'a> {
    pub node: Cow<'a, Node>,
    pub parentref: Option<ParentRef>,
    pub ancestry: Location,
    pub detached: bool,
}

impl<'a> NodeRef<'a> {
    pub fn root(node: &'a Node) -> Self {
        Self {
            node: Cow::Borrowed(node),
            parentref: None,
            ancestry: Vec::new(),
            detached: false,
        }
    }

    pub fn child(node: &'a Node, ancestry: Location, parentref: ParentRef) -> Self {
        Self {
            node: Cow::Borrowed(node),
            parentref: Some(parentref),
            ancestry,
            detached: false,
        }
    }

    /// The node stored at `location`.
    pub fn at(node: &'a Node, mut location: Location) -> Self {
        match location.pop() {
            Some(parentref) => Self::child(node, location, parentref),
            None => Self::root(node),
        }
    }

    pub fn detached(node: Node, location: Location) -> Self {
        Self {
            node: Cow::Owned(node),
            parentref: None,
            ancestry: location,
            detached: true,
        }
    }

    pub fn location(&self) -> Location {
        let mut location = self.ancestry.clone();
        if let Some(parentref) = &self.parentref {
            location.push(parentref.clone());
        }
        location
    }

    /// The document node this refers to; `None` when detached.
    pub fn borrowed(&self) -> Option<&'a Node> {
        match &self.node {
            Cow::Borrowed(node) => Some(*node),
            Cow::Owned(_) => None,
        }
    }

    /// Copies the match out of the document.
    pub fn into_coordinate(self, path: &YamlPath) -> NodeCoordinate {
        NodeCoordinate {
            node: self.node.into_owned(),
            parentref: self.parentref,
            ancestry: self.ancestry,
            path: Some(path.clone()),
            detached: self.detached,
        }
    }
}

/// Anything that can be reduced to a plain [`Node`].
pub trait IntoPlainNode {
    fn into_plain_node(self) -> Node;
}

impl IntoPlainNode for Node {
    fn into_plain_node(self) -> Node {
        self
    }
}

impl IntoPlainNode for NodeCoordinate {
    fn into_plain_node(self) -> Node {
        self.node
    }
}

impl<T: IntoPlainNode> IntoPlainNode for Vec<T> {
    fn into_plain_node(self) -> Node {
        Node::Sequence(self.into_iter().map(IntoPlainNode::into_plain_node).collect())
    }
}

/// Recursively strips coordinate wrappers, leaving the plain tree.
///
/// A single coordinate yields its node; a (possibly nested) list of
/// coordinates yields a Sequence of their nodes.
pub fn unwrap_node_coords<T: IntoPlainNode>(data: T) -> Node {
    data.into_plain_node()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_location() {
        assert_eq!(format_location(&[]), "/");
        assert_eq!(
            format_location(&[
                ParentRef::Key("list".to_string()),
                ParentRef::Index(2),
                ParentRef::Key("id".to_string()),
            ]),
            "/list[2]/id"
        );
    }

    #[test]
    fn test_format_location_escapes_separator() {
        assert_eq!(
            format_location(&[ParentRef::Key("a/b".to_string())]),
            "/a\\/b"
        );
    }

    #[test]
    fn test_location_appends_parentref() {
        let coord = NodeCoordinate::child(
            Node::Integer(1),
            vec![ParentRef::Key("list".to_string())],
            ParentRef::Index(0),
        );
        assert_eq!(
            coord.location(),
            vec![ParentRef::Key("list".to_string()), ParentRef::Index(0)]
        );
        assert_eq!(
            coord.parent_location(),
            Some(&[ParentRef::Key("list".to_string())][..])
        );
        assert!(!coord.is_root());
    }

    #[test]
    fn test_root_has_no_parent() {
        let coord = NodeCoordinate::root(Node::Null);
        assert!(coord.is_root());
        assert_eq!(coord.parent_location(), None);
        assert!(coord.location().is_empty());
    }

    #[test]
    fn test_node_ref_at_splits_location() {
        let node = Node::Integer(1);
        let found = NodeRef::at(&node, vec![ParentRef::Key("list".to_string()), ParentRef::Index(0)]);
        assert_eq!(found.parentref, Some(ParentRef::Index(0)));
        assert_eq!(found.ancestry, vec![ParentRef::Key("list".to_string())]);
        assert!(std::ptr::eq(found.borrowed().unwrap(), &node));

        let coord = found.into_coordinate(&YamlPath::root());
        assert_eq!(coord.node, Node::Integer(1));
        assert_eq!(coord.location().len(), 2);
    }

    #[test]
    fn test_detached_node_ref_is_not_borrowed() {
        let found = NodeRef::detached(Node::from("name"), vec![ParentRef::Index(3)]);
        assert!(found.borrowed().is_none());
        assert_eq!(found.location(), vec![ParentRef::Index(3)]);
    }

    #[test]
    fn test_unwrap_nested_coordinates() {
        let a = NodeCoordinate::root(Node::Integer(1));
        let b = NodeCoordinate::root(Node::from("two"));
        let plain = unwrap_node_coords(vec![vec![a], vec![b]]);
        assert_eq!(
            plain,
            Node::Sequence(vec![
                Node::Sequence(vec![Node::Integer(1)]),
                Node::Sequence(vec![Node::from("two")]),
            ])
        );
    }
}
