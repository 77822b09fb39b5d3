//! The merge engine.
//!
//! A [`Merger`] owns the accumulating (LHS) document. Each call to
//! [`Merger::merge_with`] folds one incoming (RHS) document into it at the
//! configured merge target, dispatching on the node types met at every level:
//!
//! | RHS \ LHS        | Null    | Scalar        | Hash             | Array              |
//! |------------------|---------|---------------|------------------|--------------------|
//! | Scalar           | replace | replace       | error (target) / replace (nested) | append (target) / replace (nested) |
//! | Hash             | replace | error         | deep (target) / hash policy (nested) | append (target) / error (nested) |
//! | Array            | replace | error         | error            | array policy       |
//! | Array-of-Hashes  | replace | error         | error            | aoh policy         |
//!
//! Anchors are reconciled before any data moves, according to the run-wide
//! anchor policy.

use crate::config::{
    AnchorConflictResolution, AohMergeOpt, ArrayMergeOpt, HashMergeOpt, MergeConfig,
    ResolvedRules,
};
use crate::coords::{format_location, Location, ParentRef};
use crate::document::{resolve_in, values_equal_in, AnchorRegistry, Document};
use crate::error::MergeError;
use crate::traverse::get_or_create_locations;
use crate::tree::{Mapping, Node};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Merges documents into an accumulating document.
///
/// # Examples
///
/// ```
/// use ymerge::{Document, MergeConfig, Merger, Node};
/// use ymerge::tree::Mapping;
///
/// let mut lhs = Mapping::new();
/// lhs.insert("a".to_string(), Node::Integer(1));
/// let mut rhs = Mapping::new();
/// rhs.insert("b".to_string(), Node::Integer(2));
///
/// let mut merger = Merger::new(Document::new(Node::Mapping(lhs)), MergeConfig::new());
/// merger.merge_with(Document::new(Node::Mapping(rhs))).unwrap();
///
/// let merged = merger.document().root.as_mapping().unwrap();
/// assert_eq!(merged.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Merger {
    document: Document,
    config: MergeConfig,
}

impl Merger {
    pub fn new(document: Document, config: MergeConfig) -> Self {
        Self { document, config }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Folds `rhs` into the accumulating document.
    ///
    /// # Arguments
    ///
    /// * `rhs` - The incoming document; its anchors join the LHS registry
    ///
    /// # Returns
    ///
    /// `Ok(())` once every merge target has received the RHS content, or the
    /// first `MergeError` met. The LHS may be partially modified on error.
    pub fn merge_with(&mut self, rhs: Document) -> Result<(), MergeError> {
        if rhs.root.is_null() {
            debug!("incoming document is empty; nothing to merge");
            return Ok(());
        }
        let mut rhs = rhs;

        let rules = self.config.prepare(&self.document, &rhs)?;
        reconcile_anchors(&mut self.document, &mut rhs, self.config.anchor_merge_opt())?;

        let mergeat = self.config.mergeat();
        let targets = get_or_create_locations(&mut self.document, mergeat, &Node::Null)?;
        if targets.is_empty() {
            return Err(MergeError::NotPerformed {
                path: mergeat.to_string(),
            });
        }
        debug!(mergeat = %mergeat, targets = targets.len(), "merging document");

        let mut ctx = MergeContext {
            rules: &rules,
            anchors: std::mem::take(&mut self.document.anchors),
            active: HashSet::new(),
        };
        let result = targets.iter().try_for_each(|location| {
            let cursor = Cursor {
                lhs: Vec::new(),
                rhs: Some(Vec::new()),
            };
            ctx.descend(&mut self.document.root, location, rhs.root.clone(), cursor)
        });
        self.document.anchors = ctx.anchors;
        result
    }
}

/// Folds the RHS anchor registry into the LHS registry.
///
/// After this runs the RHS registry is empty and every RHS alias names an
/// anchor in the LHS registry.
fn reconcile_anchors(
    lhs: &mut Document,
    rhs: &mut Document,
    policy: AnchorConflictResolution,
) -> Result<(), MergeError> {
    let incoming = std::mem::take(&mut rhs.anchors);
    let mut renames: Vec<(String, String)> = Vec::new();
    let mut adopted: Vec<(String, Node)> = Vec::new();

    for (name, value) in &incoming {
        let Some(existing) = lhs.anchors.get(name) else {
            adopted.push((name.clone(), value.clone()));
            continue;
        };
        if values_equal_in(&lhs.anchors, existing, &incoming, value, 0) {
            trace!(anchor = %name, "anchor defined identically on both sides");
            continue;
        }
        match policy {
            AnchorConflictResolution::Stop => {
                return Err(MergeError::AnchorConflict {
                    anchor: name.clone(),
                });
            }
            AnchorConflictResolution::Left => {
                debug!(anchor = %name, "anchor conflict; keeping the LHS value");
            }
            AnchorConflictResolution::Right => {
                debug!(anchor = %name, "anchor conflict; taking the RHS value");
                adopted.push((name.clone(), value.clone()));
            }
            AnchorConflictResolution::Rename => {
                let renamed = free_anchor_name(name, &lhs.anchors, &incoming, &renames);
                debug!(anchor = %name, renamed = %renamed, "anchor conflict; renaming RHS anchor");
                renames.push((name.clone(), renamed.clone()));
                adopted.push((renamed, value.clone()));
            }
        }
    }

    for (from, to) in &renames {
        rhs.root.rename_aliases(from, to);
        for (_, value) in adopted.iter_mut() {
            value.rename_aliases(from, to);
        }
    }
    for (name, value) in adopted {
        lhs.anchors.insert(name, value);
    }
    Ok(())
}

/// First `name_N` (N = 1, 2, ...) used by neither side nor an earlier rename.
fn free_anchor_name(
    name: &str,
    lhs: &AnchorRegistry,
    rhs: &AnchorRegistry,
    renames: &[(String, String)],
) -> String {
    let mut suffix = 1;
    loop {
        let candidate = format!("{}_{}", name, suffix);
        let taken = lhs.contains_key(&candidate)
            || rhs.contains_key(&candidate)
            || renames.iter().any(|(_, to)| to == &candidate);
        if !taken {
            return candidate;
        }
        suffix += 1;
    }
}

/// LHS location of the node being merged, and the RHS location it came from
/// when it has one.
#[derive(Debug, Clone)]
struct Cursor {
    lhs: Location,
    rhs: Option<Location>,
}

impl Cursor {
    fn child(&self, lhs: ParentRef, rhs: Option<ParentRef>) -> Cursor {
        let mut lhs_location = self.lhs.clone();
        lhs_location.push(lhs);
        let rhs_location = match (&self.rhs, rhs) {
            (Some(base), Some(step)) => {
                let mut location = base.clone();
                location.push(step);
                Some(location)
            }
            _ => None,
        };
        Cursor {
            lhs: lhs_location,
            rhs: rhs_location,
        }
    }

    fn rhs(&self) -> Option<&[ParentRef]> {
        self.rhs.as_deref()
    }

    fn path(&self) -> String {
        format_location(&self.lhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Scalar,
    Hash,
    Array,
    ArrayOfHashes,
}

struct MergeContext<'r, 'c> {
    rules: &'r ResolvedRules<'c>,
    anchors: AnchorRegistry,
    /// Anchors whose values are currently checked out for editing.
    active: HashSet<String>,
}

impl<'r, 'c> MergeContext<'r, 'c> {
    fn resolve<'n>(&'n self, node: &'n Node) -> Result<&'n Node, MergeError> {
        if let Node::Alias(name) = node {
            // A checked-out anchor is being edited further up the stack.
            if self.active.contains(name) {
                return Err(MergeError::CyclicAlias { name: name.clone() });
            }
        }
        resolve_in(&self.anchors, node)
    }

    fn kind(&self, node: &Node) -> Result<Kind, MergeError> {
        Ok(match self.resolve(node)? {
            Node::Mapping(_) => Kind::Hash,
            Node::Sequence(seq) => {
                let mut records = !seq.is_empty();
                for element in seq {
                    if !matches!(self.resolve(element)?, Node::Mapping(_)) {
                        records = false;
                        break;
                    }
                }
                if records {
                    Kind::ArrayOfHashes
                } else {
                    Kind::Array
                }
            }
            _ => Kind::Scalar,
        })
    }

    /// Replaces an alias by a copy of its value so the value can be merged.
    fn owned(&self, node: Node) -> Result<Node, MergeError> {
        match node {
            Node::Alias(_) => self.resolve(&node).cloned(),
            other => Ok(other),
        }
    }

    fn values_equal(&self, a: &Node, b: &Node) -> bool {
        values_equal_in(&self.anchors, a, &self.anchors, b, 0)
    }

    /// Runs `f` against the value of anchor `name`, which is checked out of
    /// the registry for the duration.
    fn within_anchor<F>(&mut self, name: &str, f: F) -> Result<(), MergeError>
    where
        F: FnOnce(&mut Self, &mut Node) -> Result<(), MergeError>,
    {
        if !self.active.insert(name.to_string()) {
            return Err(MergeError::CyclicAlias {
                name: name.to_string(),
            });
        }
        let mut value = match self.anchors.get_mut(name) {
            Some(slot) => std::mem::take(slot),
            None => {
                self.active.remove(name);
                return Err(MergeError::UnknownAnchor {
                    name: name.to_string(),
                });
            }
        };
        let result = f(self, &mut value);
        if let Some(slot) = self.anchors.get_mut(name) {
            *slot = value;
        }
        self.active.remove(name);
        result
    }

    /// Walks from `node` to the merge target at `remaining`, following aliases.
    fn descend(
        &mut self,
        node: &mut Node,
        remaining: &[ParentRef],
        rhs: Node,
        cursor: Cursor,
    ) -> Result<(), MergeError> {
        let Some((step, rest)) = remaining.split_first() else {
            return self.merge_target(node, rhs, &cursor);
        };
        if let Node::Alias(name) = node {
            let name = name.clone();
            return self.within_anchor(&name, |ctx, value| ctx.descend(value, remaining, rhs, cursor));
        }
        let next = match (node, step) {
            (Node::Mapping(map), ParentRef::Key(key)) => map.get_mut(key),
            (Node::Sequence(seq), ParentRef::Index(index)) => seq.get_mut(*index),
            _ => None,
        };
        let Some(next) = next else {
            return Err(MergeError::NotPerformed {
                path: format_location(&cursor.lhs),
            });
        };
        let mut lhs = cursor.lhs;
        lhs.push(step.clone());
        self.descend(next, rest, rhs, Cursor { lhs, rhs: cursor.rhs })
    }

    /// Merges the whole RHS document into one merge target.
    fn merge_target(&mut self, lhs: &mut Node, rhs: Node, at: &Cursor) -> Result<(), MergeError> {
        if lhs.is_null() {
            *lhs = rhs;
            return Ok(());
        }
        if let Node::Alias(name) = &*lhs {
            if matches!(&rhs, Node::Alias(other) if other == name) {
                return Ok(());
            }
            let name = name.clone();
            if !self.resolve(lhs)?.is_scalar() {
                return self.within_anchor(&name, |ctx, value| ctx.merge_target(value, rhs, at));
            }
        }

        let kind = self.kind(&rhs)?;
        trace!(path = %at.path(), rhs = ?kind, lhs = lhs.type_name(), "merge target");
        match (kind, lhs) {
            (Kind::Hash, Node::Mapping(map)) => {
                let Node::Mapping(incoming) = self.owned(rhs)? else {
                    return Err(MergeError::HashToNonHash { path: at.path() });
                };
                // The target's own keys always combine; the hash policy
                // applies to Hashes nested below it.
                self.merge_hashes(map, incoming, at, Some(HashMergeOpt::Deep))
            }
            (Kind::Hash, Node::Sequence(seq)) => {
                warn!(path = %at.path(), "appending a Hash to an Array; check the merge target");
                seq.push(rhs);
                Ok(())
            }
            (Kind::Hash, _) => Err(MergeError::HashToNonHash { path: at.path() }),
            (Kind::Array | Kind::ArrayOfHashes, Node::Sequence(seq)) => {
                let Node::Sequence(incoming) = self.owned(rhs)? else {
                    return Err(MergeError::ArrayToNonArray { path: at.path() });
                };
                self.merge_sequences(seq, incoming, kind, at)
            }
            (Kind::Array, _) => Err(MergeError::ArrayToNonArray { path: at.path() }),
            (Kind::ArrayOfHashes, _) => Err(MergeError::AohToNonArray { path: at.path() }),
            (Kind::Scalar, Node::Sequence(seq)) => {
                seq.push(rhs);
                Ok(())
            }
            (Kind::Scalar, Node::Mapping(_)) => Err(MergeError::ScalarToHash {
                value: self.resolve(&rhs)?.preview(usize::MAX),
                path: at.path(),
            }),
            (Kind::Scalar, slot) => {
                *slot = rhs;
                Ok(())
            }
        }
    }

    /// Merges one RHS value into an existing LHS value below the merge target.
    fn merge_node(&mut self, lhs: &mut Node, rhs: Node, at: &Cursor) -> Result<(), MergeError> {
        if let (Node::Alias(a), Node::Alias(b)) = (&*lhs, &rhs) {
            if a == b {
                return Ok(());
            }
        }
        let kind = self.kind(&rhs)?;
        trace!(path = %at.path(), rhs = ?kind, lhs = lhs.type_name(), "merge node");
        if lhs.is_null() || kind == Kind::Scalar {
            *lhs = rhs;
            return Ok(());
        }

        if let Node::Alias(name) = &*lhs {
            let name = name.clone();
            if !self.resolve(lhs)?.is_scalar() {
                return self.within_anchor(&name, |ctx, value| ctx.merge_node(value, rhs, at));
            }
        }

        match (kind, lhs) {
            (Kind::Hash, Node::Mapping(map)) => {
                let Node::Mapping(incoming) = self.owned(rhs)? else {
                    return Err(MergeError::HashToNonHash { path: at.path() });
                };
                self.merge_hashes(map, incoming, at, None)
            }
            (Kind::Hash, _) => Err(MergeError::HashToNonHash { path: at.path() }),
            (Kind::Array | Kind::ArrayOfHashes, Node::Sequence(seq)) => {
                let Node::Sequence(incoming) = self.owned(rhs)? else {
                    return Err(MergeError::ArrayToNonArray { path: at.path() });
                };
                self.merge_sequences(seq, incoming, kind, at)
            }
            (Kind::Array, _) => Err(MergeError::ArrayToNonArray { path: at.path() }),
            (Kind::ArrayOfHashes, _) => Err(MergeError::AohToNonArray { path: at.path() }),
            (Kind::Scalar, slot) => {
                *slot = rhs;
                Ok(())
            }
        }
    }

    fn merge_hashes(
        &mut self,
        lhs: &mut Mapping,
        rhs: Mapping,
        at: &Cursor,
        forced: Option<HashMergeOpt>,
    ) -> Result<(), MergeError> {
        let opt = forced.unwrap_or_else(|| self.rules.hash_merge_opt(&at.lhs, at.rhs()));
        debug!(path = %at.path(), option = %opt, "merging Hash");

        if rhs.is_empty() {
            return Ok(());
        }
        if lhs.is_empty() {
            *lhs = rhs;
            return Ok(());
        }

        match opt {
            HashMergeOpt::Stop => Err(MergeError::Stopped {
                kind: "hash".to_string(),
                path: at.path(),
            }),
            HashMergeOpt::Left => Ok(()),
            HashMergeOpt::Right => {
                *lhs = rhs;
                Ok(())
            }
            HashMergeOpt::Deep => {
                for (key, value) in rhs {
                    let child = at.child(ParentRef::Key(key.clone()), Some(ParentRef::Key(key.clone())));
                    match lhs.get_mut(&key) {
                        Some(existing) => self.merge_node(existing, value, &child)?,
                        None => {
                            lhs.insert(key, value);
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn merge_sequences(
        &mut self,
        lhs: &mut Vec<Node>,
        rhs: Vec<Node>,
        kind: Kind,
        at: &Cursor,
    ) -> Result<(), MergeError> {
        let array_opt = if kind == Kind::ArrayOfHashes {
            let opt = self.rules.aoh_merge_opt(&at.lhs, at.rhs());
            debug!(path = %at.path(), option = %opt, "merging Array-of-Hashes");
            match opt {
                AohMergeOpt::Deep => return self.merge_aoh_deep(lhs, rhs, at),
                AohMergeOpt::Stop => ArrayMergeOpt::Stop,
                AohMergeOpt::Left => ArrayMergeOpt::Left,
                AohMergeOpt::Right => ArrayMergeOpt::Right,
                AohMergeOpt::All => ArrayMergeOpt::All,
                AohMergeOpt::Unique => ArrayMergeOpt::Unique,
            }
        } else {
            let opt = self.rules.array_merge_opt(&at.lhs, at.rhs());
            debug!(path = %at.path(), option = %opt, "merging Array");
            opt
        };

        if rhs.is_empty() {
            return Ok(());
        }
        if lhs.is_empty() {
            *lhs = rhs;
            return Ok(());
        }

        match array_opt {
            ArrayMergeOpt::Stop => Err(MergeError::Stopped {
                kind: if kind == Kind::ArrayOfHashes { "aoh" } else { "array" }.to_string(),
                path: at.path(),
            }),
            ArrayMergeOpt::Left => Ok(()),
            ArrayMergeOpt::Right => {
                *lhs = rhs;
                Ok(())
            }
            ArrayMergeOpt::All => {
                lhs.extend(rhs);
                Ok(())
            }
            ArrayMergeOpt::Unique => {
                for element in rhs {
                    if !lhs.iter().any(|existing| self.values_equal(existing, &element)) {
                        lhs.push(element);
                    }
                }
                Ok(())
            }
        }
    }

    /// The identity key configured for this location, else the first key of
    /// the first LHS record, else the first key of the first RHS record.
    fn identity_key(&self, lhs: &[Node], rhs: &[Node], at: &Cursor) -> Option<String> {
        if let Some(key) = self.rules.identity_key(&at.lhs, at.rhs()) {
            return Some(key.to_string());
        }
        let first_key = |nodes: &[Node]| {
            nodes.iter().find_map(|node| {
                self.resolve(node)
                    .ok()
                    .and_then(Node::as_mapping)
                    .and_then(|record| record.keys().next().cloned())
            })
        };
        first_key(lhs).or_else(|| first_key(rhs))
    }

    fn merge_aoh_deep(
        &mut self,
        lhs: &mut Vec<Node>,
        rhs: Vec<Node>,
        at: &Cursor,
    ) -> Result<(), MergeError> {
        let Some(key) = self.identity_key(lhs, &rhs, at) else {
            lhs.extend(rhs);
            return Ok(());
        };
        debug!(path = %at.path(), identity_key = %key, "deep merging Array-of-Hashes");

        let mut records = Vec::with_capacity(rhs.len());
        for element in rhs {
            let Node::Mapping(record) = self.owned(element)? else {
                return Err(MergeError::AohToNonArray { path: at.path() });
            };
            if !record.contains_key(&key) {
                return Err(MergeError::MissingIdentityKey {
                    key,
                    keys: record.keys().cloned().collect::<Vec<_>>().join(", "),
                    path: at.path(),
                });
            }
            records.push(record);
        }

        let original_len = lhs.len();
        let mut unmatched = Vec::new();
        for (rhs_index, record) in records.into_iter().enumerate() {
            let identity = record.get(&key).cloned().unwrap_or_default();
            let matched = (0..original_len).find(|&i| {
                self.resolve(&lhs[i])
                    .ok()
                    .and_then(Node::as_mapping)
                    .and_then(|existing| existing.get(&key))
                    .is_some_and(|value| self.values_equal(value, &identity))
            });
            match matched {
                Some(lhs_index) => {
                    trace!(path = %at.path(), index = lhs_index, "matched record");
                    let child = at.child(ParentRef::Index(lhs_index), Some(ParentRef::Index(rhs_index)));
                    self.merge_record(&mut lhs[lhs_index], record, &child)?;
                }
                None => unmatched.push(Node::Mapping(record)),
            }
        }
        lhs.extend(unmatched);
        Ok(())
    }

    /// Deep-merges a matched record regardless of the configured hash option.
    fn merge_record(&mut self, lhs: &mut Node, rhs: Mapping, at: &Cursor) -> Result<(), MergeError> {
        match lhs {
            Node::Alias(name) => {
                let name = name.clone();
                self.within_anchor(&name, |ctx, value| ctx.merge_record(value, rhs, at))
            }
            Node::Mapping(map) => self.merge_hashes(map, rhs, at, Some(HashMergeOpt::Deep)),
            _ => Err(MergeError::HashToNonHash { path: at.path() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::YamlPath;

    fn map(entries: &[(&str, Node)]) -> Node {
        let mut mapping = Mapping::new();
        for (k, v) in entries {
            mapping.insert(k.to_string(), v.clone());
        }
        Node::Mapping(mapping)
    }

    fn merge(lhs: Node, rhs: Node, config: MergeConfig) -> Result<Document, MergeError> {
        let mut merger = Merger::new(Document::new(lhs), config);
        merger.merge_with(Document::new(rhs))?;
        Ok(merger.into_document())
    }

    #[test]
    fn test_same_alias_on_both_sides_is_a_no_op() {
        let mut lhs = Document::default();
        let alias = lhs.anchor("a", Node::from("value"));
        lhs.root = map(&[("k", alias.clone())]);
        let mut rhs = Document::default();
        let rhs_alias = rhs.anchor("a", Node::from("value"));
        rhs.root = map(&[("k", rhs_alias)]);

        let mut merger = Merger::new(lhs, MergeConfig::new());
        merger.merge_with(rhs).unwrap();
        assert_eq!(merger.document().root, map(&[("k", alias)]));
    }

    #[test]
    fn test_deep_hash_merge_edits_anchored_value() {
        let mut lhs = Document::default();
        let alias = lhs.anchor("base", map(&[("x", Node::Integer(1))]));
        lhs.root = map(&[("first", alias.clone()), ("second", alias)]);
        let rhs = Document::new(map(&[("first", map(&[("y", Node::Integer(2))]))]));

        let mut merger = Merger::new(lhs, MergeConfig::new());
        merger.merge_with(rhs).unwrap();
        let expanded = merger.document().expand().unwrap();
        let second = expanded.as_mapping().and_then(|m| m.get("second")).cloned();
        assert_eq!(
            second,
            Some(map(&[("x", Node::Integer(1)), ("y", Node::Integer(2))]))
        );
    }

    #[test]
    fn test_cyclic_alias_is_reported() {
        let mut lhs = Document::default();
        let alias = lhs.anchor("loop", Node::Null);
        lhs.anchors
            .insert("loop".to_string(), map(&[("again", alias.clone())]));
        lhs.root = alias;
        let rhs = Document::new(map(&[("again", map(&[("again", map(&[("x", Node::Integer(1))]))]))]));

        let mut merger = Merger::new(lhs, MergeConfig::new());
        let result = merger.merge_with(rhs);
        assert!(matches!(result, Err(MergeError::CyclicAlias { .. })));
        // The checked-out anchor value is restored after the failure.
        assert!(merger.document().anchors["loop"].as_mapping().is_some());
    }

    #[test]
    fn test_stop_hash_only_fails_when_both_sides_have_content() {
        let config = MergeConfig::new().with_rule("/hash", "stop").unwrap();
        let merged = merge(
            map(&[("hash", map(&[]))]),
            map(&[("hash", map(&[("a", Node::Integer(1))]))]),
            config.clone(),
        )
        .unwrap();
        assert_eq!(
            merged.root,
            map(&[("hash", map(&[("a", Node::Integer(1))]))])
        );

        let result = merge(
            map(&[("hash", map(&[("a", Node::Integer(1))]))]),
            map(&[("hash", map(&[("b", Node::Integer(2))]))]),
            config,
        );
        assert!(matches!(result, Err(MergeError::Stopped { .. })));
    }

    #[test]
    fn test_rule_matching_only_rhs_applies() {
        // Only the RHS list holds a 2, so only the RHS location matches.
        let config = MergeConfig::new()
            .with_rule("/list[has_child(2)]", "left")
            .unwrap();
        let merged = merge(
            map(&[("list", Node::Sequence(vec![Node::Integer(1)]))]),
            map(&[("list", Node::Sequence(vec![Node::Integer(2)]))]),
            config,
        )
        .unwrap();
        assert_eq!(
            merged.root,
            map(&[("list", Node::Sequence(vec![Node::Integer(1)]))])
        );
    }

    #[test]
    fn test_mergeat_creates_missing_keys() {
        let config = MergeConfig::new().with_mergeat(YamlPath::parse("/new/place").unwrap());
        let merged = merge(map(&[]), map(&[("k", Node::from("v"))]), config).unwrap();
        assert_eq!(
            merged.root,
            map(&[("new", map(&[("place", map(&[("k", Node::from("v"))]))]))])
        );
    }

    #[test]
    fn test_free_anchor_name_skips_taken_names() {
        let mut lhs = AnchorRegistry::new();
        lhs.insert("a".to_string(), Node::Null);
        lhs.insert("a_1".to_string(), Node::Null);
        let rhs = AnchorRegistry::new();
        assert_eq!(free_anchor_name("a", &lhs, &rhs, &[]), "a_2");
    }
}
