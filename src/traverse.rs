//! Resolves YAML Paths against documents.
//!
//! Matches borrow from the document while segments are applied; results are
//! [`NodeCoordinate`]s carrying full locations, so callers can write through
//! them with [`Document::get_mut`].

use crate::coords::{Location, NodeCoordinate, NodeRef, ParentRef};
use crate::document::Document;
use crate::error::PathError;
use crate::keywords;
use crate::path::{PathSegment, SearchTerms, YamlPath};
use crate::tree::{Mapping, Node};
use regex::Regex;
use std::collections::HashSet;
use tracing::trace;

/// Finds every node matching `path`.
///
/// # Arguments
///
/// * `doc` - The document to search
/// * `path` - A parsed YAML Path
///
/// # Returns
///
/// Matching coordinates in document order; empty when nothing matches.
pub fn get_nodes(doc: &Document, path: &YamlPath) -> Result<Vec<NodeCoordinate>, PathError> {
    Ok(resolve(doc, path)?
        .into_iter()
        .map(|found| found.into_coordinate(path))
        .collect())
}

/// Locations of every node matching `path`, without copying any node.
///
/// Synthesized matches have no location of their own and are skipped.
pub fn get_locations(doc: &Document, path: &YamlPath) -> Result<Vec<Location>, PathError> {
    Ok(resolve(doc, path)?
        .iter()
        .filter(|found| !found.detached)
        .map(NodeRef::location)
        .collect())
}

fn resolve<'a>(doc: &'a Document, path: &YamlPath) -> Result<Vec<NodeRef<'a>>, PathError> {
    let mut current = vec![NodeRef::root(&doc.root)];
    for segment in path.segments() {
        let mut next = Vec::new();
        for candidate in &current {
            next.extend(step(doc, candidate, segment, path)?);
        }
        current = dedup(next);
        if current.is_empty() {
            break;
        }
    }
    trace!(path = %path, matches = current.len(), "resolved path");
    Ok(current)
}

/// A match kept across document edits: where it is, or its value when it
/// was synthesized.
struct Position {
    location: Location,
    detached: Option<Node>,
}

impl Position {
    fn from_ref(found: NodeRef<'_>) -> Self {
        let location = found.location();
        let detached = if found.detached {
            Some(found.node.into_owned())
        } else {
            None
        };
        Self { location, detached }
    }
}

/// Like [`get_nodes`], but creates missing Hash keys along the way.
///
/// Intermediate keys are created as empty Hashes and the final key receives a
/// copy of `leaf`. A Null node met along the path becomes a Hash. Segments
/// other than plain keys are matched but never create anything.
pub fn get_or_create_nodes(
    doc: &mut Document,
    path: &YamlPath,
    leaf: &Node,
) -> Result<Vec<NodeCoordinate>, PathError> {
    let positions = create_positions(doc, path, leaf)?;
    Ok(positions
        .into_iter()
        .filter_map(|position| match position.detached {
            Some(node) => Some(NodeCoordinate::detached(node, position.location)),
            None => doc
                .get(&position.location)
                .map(|node| NodeRef::at(node, position.location).into_coordinate(path)),
        })
        .map(|coord| coord.with_path(path))
        .collect())
}

/// Like [`get_locations`], creating missing Hash keys as
/// [`get_or_create_nodes`] does.
pub fn get_or_create_locations(
    doc: &mut Document,
    path: &YamlPath,
    leaf: &Node,
) -> Result<Vec<Location>, PathError> {
    Ok(create_positions(doc, path, leaf)?
        .into_iter()
        .filter(|position| position.detached.is_none())
        .map(|position| position.location)
        .collect())
}

fn create_positions(
    doc: &mut Document,
    path: &YamlPath,
    leaf: &Node,
) -> Result<Vec<Position>, PathError> {
    let segments = path.segments();
    let mut current = vec![Position {
        location: Vec::new(),
        detached: None,
    }];

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i + 1 == segments.len();
        let mut next = Vec::new();
        // Synthesized values cannot be stepped into.
        for position in current.iter().filter(|p| p.detached.is_none()) {
            let location = &position.location;
            if let PathSegment::Key(key) = segment {
                let missing = match doc.get_resolved(location) {
                    Some(Node::Null) => true,
                    Some(Node::Mapping(map)) => !map.contains_key(key),
                    _ => false,
                };
                if missing {
                    let value = if is_last {
                        leaf.clone()
                    } else {
                        Node::Mapping(Mapping::new())
                    };
                    trace!(key = %key, "creating missing key");
                    if doc.insert_key(location, key, value) {
                        let mut created = location.clone();
                        created.push(ParentRef::Key(key.clone()));
                        next.push(Position {
                            location: created,
                            detached: None,
                        });
                        continue;
                    }
                }
            }
            let shared: &Document = doc;
            let Some(node) = shared.get(location) else {
                continue;
            };
            let candidate = NodeRef::at(node, location.clone());
            next.extend(
                step(shared, &candidate, segment, path)?
                    .into_iter()
                    .map(Position::from_ref),
            );
        }
        let mut seen: HashSet<Location> = HashSet::new();
        current = next
            .into_iter()
            .filter(|p| p.detached.is_some() || seen.insert(p.location.clone()))
            .collect();
        if current.is_empty() {
            break;
        }
    }
    Ok(current)
}

fn dedup(found: Vec<NodeRef<'_>>) -> Vec<NodeRef<'_>> {
    let mut seen: HashSet<Location> = HashSet::new();
    found
        .into_iter()
        .filter(|c| c.detached || seen.insert(c.location()))
        .collect()
}

fn children(node: &Node) -> Vec<(ParentRef, &Node)> {
    match node {
        Node::Mapping(map) => map
            .iter()
            .map(|(k, v)| (ParentRef::Key(k.clone()), v))
            .collect(),
        Node::Sequence(seq) => seq
            .iter()
            .enumerate()
            .map(|(i, v)| (ParentRef::Index(i), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Applies one segment to one candidate.
fn step<'a>(
    doc: &'a Document,
    candidate: &NodeRef<'a>,
    segment: &PathSegment,
    path: &YamlPath,
) -> Result<Vec<NodeRef<'a>>, PathError> {
    let Some(slot) = candidate.borrowed() else {
        return Ok(Vec::new());
    };
    let Ok(node) = doc.resolve(slot) else {
        return Ok(Vec::new());
    };
    let location = candidate.location();
    let child = |parentref: ParentRef, value: &'a Node| {
        NodeRef::child(value, location.clone(), parentref)
    };

    let found = match segment {
        PathSegment::Key(key) => match node {
            Node::Mapping(map) => map
                .get(key)
                .map(|v| child(ParentRef::Key(key.clone()), v))
                .into_iter()
                .collect(),
            Node::Sequence(seq) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| seq.get(i).map(|v| child(ParentRef::Index(i), v)))
                .into_iter()
                .collect(),
            _ => Vec::new(),
        },

        PathSegment::KeyGlob { glob, pattern } => {
            let re = Regex::new(pattern).map_err(|e| PathError::Regex {
                path: path.to_string(),
                pattern: glob.clone(),
                reason: e.to_string(),
            })?;
            match node {
                Node::Mapping(map) => map
                    .iter()
                    .filter(|(k, _)| re.is_match(k))
                    .map(|(k, v)| child(ParentRef::Key(k.clone()), v))
                    .collect(),
                _ => Vec::new(),
            }
        }

        PathSegment::Index(index) => match node {
            Node::Sequence(seq) => {
                let resolved = if *index < 0 {
                    seq.len().checked_sub(index.unsigned_abs() as usize)
                } else {
                    Some(*index as usize)
                };
                resolved
                    .and_then(|i| seq.get(i).map(|v| child(ParentRef::Index(i), v)))
                    .into_iter()
                    .collect()
            }
            Node::Mapping(map) => {
                let key = index.to_string();
                map.get(&key)
                    .map(|v| child(ParentRef::Key(key.clone()), v))
                    .into_iter()
                    .collect()
            }
            _ => Vec::new(),
        },

        PathSegment::Anchor(name) => children(node)
            .into_iter()
            .filter(|(_, v)| matches!(v, Node::Alias(a) if a == name))
            .map(|(r, v)| child(r, v))
            .collect(),

        PathSegment::Wildcard => children(node)
            .into_iter()
            .map(|(r, v)| child(r, v))
            .collect(),

        PathSegment::Traverse => {
            let mut found = vec![candidate.clone()];
            let mut active = HashSet::new();
            descendants(doc, slot, &location, &mut active, &mut found);
            found
        }

        PathSegment::Search(terms) => search(doc, node, candidate, terms),

        PathSegment::Keyword(terms) => keywords::search_matches(terms, doc, candidate, path)?,
    };
    Ok(found)
}

fn descendants<'a>(
    doc: &'a Document,
    node: &'a Node,
    location: &Location,
    active: &mut HashSet<String>,
    found: &mut Vec<NodeRef<'a>>,
) {
    let entered = match node {
        Node::Alias(name) => {
            if !active.insert(name.clone()) {
                return;
            }
            Some(name)
        }
        _ => None,
    };
    let node = match entered {
        Some(name) => match doc.anchors.get(name) {
            Some(value) => value,
            None => {
                active.remove(name);
                return;
            }
        },
        None => node,
    };

    for (parentref, value) in children(node) {
        let mut child_location = location.clone();
        child_location.push(parentref.clone());
        found.push(NodeRef::child(value, location.clone(), parentref));
        descendants(doc, value, &child_location, active, found);
    }

    if let Some(name) = entered {
        active.remove(name);
    }
}

fn search<'a>(
    doc: &'a Document,
    node: &'a Node,
    candidate: &NodeRef<'a>,
    terms: &SearchTerms,
) -> Vec<NodeRef<'a>> {
    let location = candidate.location();
    let self_match = terms.attribute == ".";

    match node {
        Node::Mapping(map) if self_match => map
            .iter()
            .filter(|(k, _)| terms.matches_text(k, k.parse().ok()) != terms.inverted)
            .map(|(k, v)| NodeRef::child(v, location.clone(), ParentRef::Key(k.clone())))
            .collect(),

        Node::Mapping(map) => match map.get(&terms.attribute).map(|v| doc.resolve(v)) {
            Some(Ok(value)) if terms.matches_value(value) != terms.inverted => {
                vec![candidate.clone()]
            }
            _ => Vec::new(),
        },

        Node::Sequence(seq) => seq
            .iter()
            .enumerate()
            .filter(|(_, element)| {
                let Ok(element) = doc.resolve(element) else {
                    return false;
                };
                if self_match {
                    return element.is_scalar()
                        && terms.matches_value(element) != terms.inverted;
                }
                match element
                    .as_mapping()
                    .and_then(|record| record.get(&terms.attribute))
                    .map(|v| doc.resolve(v))
                {
                    Some(Ok(value)) => terms.matches_value(value) != terms.inverted,
                    _ => false,
                }
            })
            .map(|(i, v)| NodeRef::child(v, location.clone(), ParentRef::Index(i)))
            .collect(),

        scalar if self_match && terms.matches_value(scalar) != terms.inverted => {
            vec![candidate.clone()]
        }

        _ => Vec::new(),
    }
}
