//! Keyword searches: `[has_child(x)]`, `[name()]`, `[max(attr)]`, `[min(attr)]`
//! and `[parent(n)]`.

use crate::coords::{NodeRef, ParentRef};
use crate::document::Document;
use crate::error::PathError;
use crate::path::{KeywordTerms, YamlPath};
use crate::tree::{Mapping, Node};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSearchKeyword {
    HasChild,
    Name,
    Max,
    Min,
    Parent,
}

impl PathSearchKeyword {
    /// Accepted parameter counts, inclusive.
    pub fn arity(self) -> (usize, usize) {
        match self {
            PathSearchKeyword::HasChild => (1, 1),
            PathSearchKeyword::Name => (0, 0),
            PathSearchKeyword::Max | PathSearchKeyword::Min | PathSearchKeyword::Parent => (0, 1),
        }
    }

    pub fn names() -> &'static [&'static str] {
        &["has_child", "name", "max", "min", "parent"]
    }
}

impl FromStr for PathSearchKeyword {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "has_child" => Ok(PathSearchKeyword::HasChild),
            "name" => Ok(PathSearchKeyword::Name),
            "max" => Ok(PathSearchKeyword::Max),
            "min" => Ok(PathSearchKeyword::Min),
            "parent" => Ok(PathSearchKeyword::Parent),
            other => Err(format!(
                "unknown keyword {}; expected one of {}",
                other,
                Self::names().join(", ")
            )),
        }
    }
}

impl fmt::Display for PathSearchKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PathSearchKeyword::HasChild => "has_child",
            PathSearchKeyword::Name => "name",
            PathSearchKeyword::Max => "max",
            PathSearchKeyword::Min => "min",
            PathSearchKeyword::Parent => "parent",
        };
        write!(f, "{}", name)
    }
}

/// Applies a keyword search to one candidate node.
///
/// # Arguments
///
/// * `terms` - The parsed keyword, its parameters and inversion flag
/// * `doc` - Document the candidate belongs to, used to follow aliases
/// * `candidate` - The node being searched
/// * `path` - The full YAML Path, for error reporting
///
/// # Returns
///
/// The matching nodes, each with enough location data to be written back,
/// or a `PathError` when the keyword is misused.
pub fn search_matches<'a>(
    terms: &KeywordTerms,
    doc: &'a Document,
    candidate: &NodeRef<'a>,
    path: &YamlPath,
) -> Result<Vec<NodeRef<'a>>, PathError> {
    let (min, max) = terms.keyword.arity();
    let count = terms.parameters.len();
    if count < min || count > max {
        let expected = if min == max {
            format!("exactly {}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(PathError::KeywordArity {
            keyword: terms.keyword.to_string(),
            expected,
            actual: count,
            path: path.to_string(),
        });
    }

    let Some(node) = candidate.borrowed().and_then(|slot| doc.resolve(slot).ok()) else {
        return Ok(Vec::new());
    };

    match terms.keyword {
        PathSearchKeyword::HasChild => Ok(has_child(terms, doc, node, candidate)),
        PathSearchKeyword::Name => name(terms, candidate, path),
        PathSearchKeyword::Max => extremum(terms, doc, node, candidate, path, Ordering::Greater),
        PathSearchKeyword::Min => extremum(terms, doc, node, candidate, path, Ordering::Less),
        PathSearchKeyword::Parent => parent(terms, doc, candidate, path),
    }
}

fn usage(terms: &KeywordTerms, reason: impl Into<String>, path: &YamlPath) -> PathError {
    PathError::KeywordUsage {
        keyword: terms.keyword.to_string(),
        reason: reason.into(),
        path: path.to_string(),
    }
}

/// Aliased records and elements are matched through their anchored values.
fn has_child<'a>(
    terms: &KeywordTerms,
    doc: &'a Document,
    node: &'a Node,
    candidate: &NodeRef<'a>,
) -> Vec<NodeRef<'a>> {
    let wanted = &terms.parameters[0];
    match node {
        Node::Mapping(map) => {
            if map.contains_key(wanted) != terms.inverted {
                vec![candidate.clone()]
            } else {
                Vec::new()
            }
        }
        Node::Sequence(seq) => {
            let records: Option<Vec<&Mapping>> = seq
                .iter()
                .map(|element| doc.resolve(element).ok().and_then(Node::as_mapping))
                .collect();
            match records {
                Some(records) if !records.is_empty() => {
                    let location = candidate.location();
                    seq.iter()
                        .zip(records)
                        .enumerate()
                        .filter(|(_, (_, record))| record.contains_key(wanted) != terms.inverted)
                        .map(|(i, (slot, _))| NodeRef::child(slot, location.clone(), ParentRef::Index(i)))
                        .collect()
                }
                _ => {
                    let present = seq.iter().any(|element| {
                        doc.resolve(element)
                            .ok()
                            .and_then(Node::scalar_text)
                            .is_some_and(|text| &text == wanted)
                    });
                    if present != terms.inverted {
                        vec![candidate.clone()]
                    } else {
                        Vec::new()
                    }
                }
            }
        }
        _ if terms.inverted => vec![candidate.clone()],
        _ => Vec::new(),
    }
}

fn name<'a>(
    terms: &KeywordTerms,
    candidate: &NodeRef<'a>,
    path: &YamlPath,
) -> Result<Vec<NodeRef<'a>>, PathError> {
    if terms.inverted {
        return Err(usage(terms, "there is no inverse of a node's name", path));
    }
    let value = match &candidate.parentref {
        Some(ParentRef::Key(key)) => Node::String(key.clone()),
        Some(ParentRef::Index(index)) => Node::Integer(*index as i64),
        None => return Ok(Vec::new()),
    };
    Ok(vec![NodeRef::detached(value, candidate.location())])
}

fn parent<'a>(
    terms: &KeywordTerms,
    doc: &'a Document,
    candidate: &NodeRef<'a>,
    path: &YamlPath,
) -> Result<Vec<NodeRef<'a>>, PathError> {
    if terms.inverted {
        return Err(usage(terms, "there is no inverse of a node's parent", path));
    }
    let steps = match terms.parameters.first() {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| usage(terms, format!("{} is not a number of steps", raw), path))?,
        None => 1,
    };

    let location = candidate.location();
    if steps > location.len() {
        return Err(usage(
            terms,
            format!("cannot ascend {} levels from a node {} deep", steps, location.len()),
            path,
        ));
    }

    let target = &location[..location.len() - steps];
    Ok(doc
        .get(target)
        .map(|node| NodeRef::at(node, target.to_vec()))
        .into_iter()
        .collect())
}

/// Orders two scalars numerically when both are numbers, else textually.
fn compare_scalars(a: &Node, b: &Node) -> Option<Ordering> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => Some(a.scalar_text()?.cmp(&b.scalar_text()?)),
    }
}

fn extremum<'a>(
    terms: &KeywordTerms,
    doc: &'a Document,
    node: &'a Node,
    candidate: &NodeRef<'a>,
    path: &YamlPath,
    wanted: Ordering,
) -> Result<Vec<NodeRef<'a>>, PathError> {
    let attribute = terms.parameters.first();
    let location = candidate.location();

    let children: Vec<(ParentRef, &'a Node)> = match node {
        Node::Mapping(map) => map
            .iter()
            .map(|(k, v)| (ParentRef::Key(k.clone()), v))
            .collect(),
        Node::Sequence(seq) => seq
            .iter()
            .enumerate()
            .map(|(i, v)| (ParentRef::Index(i), v))
            .collect(),
        _ => return Ok(Vec::new()),
    };

    // Each child paired with the value it is compared by, if it has one.
    let mut scored: Vec<(ParentRef, &'a Node, Option<&'a Node>)> =
        Vec::with_capacity(children.len());
    for (parentref, child) in children {
        let resolved = doc.resolve(child).unwrap_or(child);
        let score = match (attribute, resolved) {
            (Some(attr), Node::Mapping(record)) => record
                .get(attr)
                .and_then(|v| doc.resolve(v).ok())
                .filter(|v| v.is_scalar()),
            (Some(_), _) => None,
            (None, Node::Mapping(_)) if matches!(node, Node::Sequence(_)) => {
                return Err(usage(
                    terms,
                    "an attribute name is required when searching an Array of Hashes",
                    path,
                ));
            }
            (None, value) if value.is_scalar() => Some(value),
            (None, _) => None,
        };
        scored.push((parentref, child, score));
    }

    let mut best: Option<&Node> = None;
    for (_, _, score) in &scored {
        if let Some(value) = score {
            best = match best {
                Some(current) if compare_scalars(value, current) != Some(wanted) => Some(current),
                _ => Some(*value),
            };
        }
    }

    let is_best = |score: &Option<&Node>| match (score, best) {
        (Some(value), Some(best)) => compare_scalars(value, best) == Some(Ordering::Equal),
        _ => false,
    };

    Ok(scored
        .iter()
        .filter(|(_, _, score)| is_best(score) != terms.inverted)
        .map(|(parentref, child, _)| NodeRef::child(child, location.clone(), parentref.clone()))
        .collect())
}
