//! Tree representation for YAML/JSON-compatible documents.

use indexmap::IndexMap;

/// Ordered mapping; insertion order is the output order.
pub type Mapping = IndexMap<String, Node>;

/// A node in a structured document.
///
/// `Alias` is a reference to a named anchor held in the owning
/// [`Document`](crate::document::Document)'s registry. Every occurrence of an
/// anchored value, including the first one, is stored as an `Alias`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Mapping(Mapping),
    Sequence(Vec<Node>),
    Alias(String),
}

impl Node {
    pub fn type_name(&self) -> &str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Integer(_) => "integer",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Mapping(_) => "hash",
            Node::Sequence(_) => "array",
            Node::Alias(_) => "alias",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// True for every variant that is neither a collection nor an alias.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Node::Mapping(_) | Node::Sequence(_) | Node::Alias(_))
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Text form of a scalar, used by path searches and identity matching.
    ///
    /// Returns `None` for collections and aliases.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Node::Null => Some(String::new()),
            Node::Bool(b) => Some(b.to_string()),
            Node::Integer(i) => Some(i.to_string()),
            Node::Float(f) => Some(f.to_string()),
            Node::String(s) => Some(s.clone()),
            Node::Mapping(_) | Node::Sequence(_) | Node::Alias(_) => None,
        }
    }

    /// Numeric value of a scalar, if it is a number or a string that parses as one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Integer(i) => Some(*i as f64),
            Node::Float(f) => Some(*f),
            Node::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Checks if two nodes hold the same value.
    ///
    /// Mapping key order is ignored, integers and floats compare numerically
    /// (epsilon for floats), and aliases compare by anchor name only. Use
    /// [`Document::values_equal`](crate::document::Document::values_equal)
    /// to compare through aliases.
    pub fn semantic_equals(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::String(a), Node::String(b)) => a == b,
            (Node::Integer(a), Node::Integer(b)) => a == b,
            (Node::Integer(_) | Node::Float(_), Node::Integer(_) | Node::Float(_)) => {
                const EPSILON: f64 = 1e-10;
                match (self.as_f64(), other.as_f64()) {
                    (Some(a), Some(b)) => (a - b).abs() < EPSILON,
                    _ => false,
                }
            }
            (Node::Mapping(a), Node::Mapping(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|v| value.semantic_equals(v)))
            }
            (Node::Sequence(a), Node::Sequence(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(item_a, item_b)| item_a.semantic_equals(item_b))
            }
            (Node::Alias(a), Node::Alias(b)) => a == b,
            _ => false,
        }
    }

    /// Returns a short preview of the node's value, truncated to max_len.
    pub fn preview(&self, max_len: usize) -> String {
        let preview = match self {
            Node::Null => "null".to_string(),
            Node::Bool(b) => b.to_string(),
            Node::Integer(i) => i.to_string(),
            Node::Float(f) => f.to_string(),
            Node::String(s) => s.clone(),
            Node::Alias(name) => format!("*{}", name),
            Node::Mapping(map) => {
                let count = map.len();
                if count == 0 {
                    "{}".to_string()
                } else if count == 1 {
                    format!("{{ {} key }}", count)
                } else {
                    format!("{{ {} keys }}", count)
                }
            }
            Node::Sequence(seq) => {
                let count = seq.len();
                if count == 0 {
                    "[]".to_string()
                } else if count == 1 {
                    format!("[ {} item ]", count)
                } else {
                    format!("[ {} items ]", count)
                }
            }
        };

        if preview.chars().count() > max_len {
            let kept: String = preview.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            preview
        }
    }

    /// Rewrites every `Alias(from)` in this subtree to `Alias(to)`.
    pub fn rename_aliases(&mut self, from: &str, to: &str) {
        match self {
            Node::Alias(name) if name == from => *name = to.to_string(),
            Node::Mapping(map) => map.values_mut().for_each(|v| v.rename_aliases(from, to)),
            Node::Sequence(seq) => seq.iter_mut().for_each(|v| v.rename_aliases(from, to)),
            _ => {}
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Integer(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<Mapping> for Node {
    fn from(value: Mapping) -> Self {
        Node::Mapping(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::Sequence(value)
    }
}
