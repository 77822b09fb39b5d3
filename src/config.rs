//! Merge policies and their configuration.
//!
//! Options come from four places, highest precedence first:
//!
//! 1. `[rules]` entries whose YAML Path matches the node being merged
//! 2. command-line overrides
//! 3. `[defaults]` in the configuration file
//! 4. built-in defaults (anchors=stop, hashes=deep, arrays=all, aoh=all)
//!
//! Anchor conflict resolution is global only; rules never apply to it.

use crate::coords::{Location, ParentRef};
use crate::document::Document;
use crate::error::{ConfigError, PathError};
use crate::path::YamlPath;
use crate::traverse::get_locations;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// How to resolve two documents defining the same anchor with different values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorConflictResolution {
    /// Abort the merge
    #[default]
    Stop,
    /// Keep the LHS value; RHS aliases refer to it
    Left,
    /// Replace the LHS value; LHS aliases refer to the new value
    Right,
    /// Give the RHS anchor a new, unused name
    Rename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashMergeOpt {
    Stop,
    Left,
    Right,
    #[default]
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayMergeOpt {
    Stop,
    Left,
    Right,
    #[default]
    All,
    Unique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AohMergeOpt {
    Stop,
    Left,
    Right,
    #[default]
    All,
    Unique,
    Deep,
}

fn invalid(kind: &str, value: &str, choices: &[&str]) -> ConfigError {
    ConfigError::InvalidOption {
        kind: kind.to_string(),
        value: value.to_string(),
        choices: choices.join(", "),
    }
}

impl AnchorConflictResolution {
    pub fn names() -> &'static [&'static str] {
        &["stop", "left", "right", "rename"]
    }
}

impl FromStr for AnchorConflictResolution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "rename" => Ok(Self::Rename),
            _ => Err(invalid("anchor", s, Self::names())),
        }
    }
}

impl fmt::Display for AnchorConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stop => "stop",
            Self::Left => "left",
            Self::Right => "right",
            Self::Rename => "rename",
        };
        write!(f, "{}", name)
    }
}

impl HashMergeOpt {
    pub fn names() -> &'static [&'static str] {
        &["stop", "left", "right", "deep"]
    }
}

impl FromStr for HashMergeOpt {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "deep" => Ok(Self::Deep),
            _ => Err(invalid("hash", s, Self::names())),
        }
    }
}

impl fmt::Display for HashMergeOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stop => "stop",
            Self::Left => "left",
            Self::Right => "right",
            Self::Deep => "deep",
        };
        write!(f, "{}", name)
    }
}

impl ArrayMergeOpt {
    pub fn names() -> &'static [&'static str] {
        &["stop", "left", "right", "all", "unique"]
    }
}

impl FromStr for ArrayMergeOpt {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "all" => Ok(Self::All),
            "unique" => Ok(Self::Unique),
            _ => Err(invalid("array", s, Self::names())),
        }
    }
}

impl fmt::Display for ArrayMergeOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stop => "stop",
            Self::Left => "left",
            Self::Right => "right",
            Self::All => "all",
            Self::Unique => "unique",
        };
        write!(f, "{}", name)
    }
}

impl AohMergeOpt {
    pub fn names() -> &'static [&'static str] {
        &["stop", "left", "right", "all", "unique", "deep"]
    }
}

impl FromStr for AohMergeOpt {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "all" => Ok(Self::All),
            "unique" => Ok(Self::Unique),
            "deep" => Ok(Self::Deep),
            _ => Err(invalid("aoh", s, Self::names())),
        }
    }
}

impl fmt::Display for AohMergeOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stop => "stop",
            Self::Left => "left",
            Self::Right => "right",
            Self::All => "all",
            Self::Unique => "unique",
            Self::Deep => "deep",
        };
        write!(f, "{}", name)
    }
}

/// One policy per option kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeDefaults {
    pub anchors: AnchorConflictResolution,
    pub hashes: HashMergeOpt,
    pub arrays: ArrayMergeOpt,
    pub aoh: AohMergeOpt,
}

/// Policies given on the command line; unset entries fall through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOverrides {
    pub anchors: Option<AnchorConflictResolution>,
    pub hashes: Option<HashMergeOpt>,
    pub arrays: Option<ArrayMergeOpt>,
    pub aoh: Option<AohMergeOpt>,
}

/// A `[rules]` entry. The value is kept for every kind it is valid for.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRule {
    pub path: YamlPath,
    pub value: String,
    pub hash: Option<HashMergeOpt>,
    pub array: Option<ArrayMergeOpt>,
    pub aoh: Option<AohMergeOpt>,
}

impl MergeRule {
    pub fn new(path: &str, value: &str) -> Result<Self, ConfigError> {
        let path = YamlPath::parse(path)?;
        let hash = value.parse::<HashMergeOpt>().ok();
        let array = value.parse::<ArrayMergeOpt>().ok();
        let aoh = value.parse::<AohMergeOpt>().ok();
        if hash.is_none() && array.is_none() && aoh.is_none() {
            return Err(invalid("rule", value, AohMergeOpt::names()));
        }
        Ok(Self {
            path,
            value: value.to_string(),
            hash,
            array,
            aoh,
        })
    }
}

/// A `[keys]` entry naming the identity key of an Array-of-Hashes.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityKeyRule {
    pub path: YamlPath,
    pub key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    defaults: MergeDefaults,
    rules: IndexMap<String, String>,
    keys: IndexMap<String, String>,
}

/// Immutable run-wide merge configuration.
#[derive(Debug, Clone, Default)]
pub struct MergeConfig {
    defaults: MergeDefaults,
    overrides: MergeOverrides,
    mergeat: YamlPath,
    rules: Vec<MergeRule>,
    keys: Vec<IdentityKeyRule>,
}

impl MergeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a TOML configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The configuration, or a `ConfigError` when the file cannot be read,
    /// is not valid TOML, names an unknown option, or holds a bad YAML Path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: display.clone(),
            source: e,
        })?;
        Self::from_toml_str(&content, &display)
    }

    /// Parses TOML configuration text; `origin` names it in error messages.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: origin.to_string(),
            source: e,
        })?;

        let mut config = Self {
            defaults: file.defaults,
            ..Self::default()
        };
        for (path, value) in &file.rules {
            config.rules.push(MergeRule::new(path, value)?);
        }
        for (path, key) in &file.keys {
            config.keys.push(IdentityKeyRule {
                path: YamlPath::parse(path)?,
                key: key.clone(),
            });
        }
        debug!(
            origin,
            rules = config.rules.len(),
            keys = config.keys.len(),
            "loaded merge configuration"
        );
        Ok(config)
    }

    pub fn with_defaults(mut self, defaults: MergeDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_overrides(mut self, overrides: MergeOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_anchors(mut self, opt: AnchorConflictResolution) -> Self {
        self.overrides.anchors = Some(opt);
        self
    }

    pub fn with_hashes(mut self, opt: HashMergeOpt) -> Self {
        self.overrides.hashes = Some(opt);
        self
    }

    pub fn with_arrays(mut self, opt: ArrayMergeOpt) -> Self {
        self.overrides.arrays = Some(opt);
        self
    }

    pub fn with_aoh(mut self, opt: AohMergeOpt) -> Self {
        self.overrides.aoh = Some(opt);
        self
    }

    pub fn with_mergeat(mut self, mergeat: YamlPath) -> Self {
        self.mergeat = mergeat;
        self
    }

    /// Appends a path rule; earlier rules take precedence.
    pub fn with_rule(mut self, path: &str, value: &str) -> Result<Self, ConfigError> {
        self.rules.push(MergeRule::new(path, value)?);
        Ok(self)
    }

    pub fn with_identity_key(mut self, path: &str, key: &str) -> Result<Self, ConfigError> {
        self.keys.push(IdentityKeyRule {
            path: YamlPath::parse(path)?,
            key: key.to_string(),
        });
        Ok(self)
    }

    pub fn mergeat(&self) -> &YamlPath {
        &self.mergeat
    }

    pub fn rules(&self) -> &[MergeRule] {
        &self.rules
    }

    /// The run-wide anchor conflict policy.
    pub fn anchor_merge_opt(&self) -> AnchorConflictResolution {
        self.overrides.anchors.unwrap_or(self.defaults.anchors)
    }

    pub fn default_hash_merge_opt(&self) -> HashMergeOpt {
        self.overrides.hashes.unwrap_or(self.defaults.hashes)
    }

    pub fn default_array_merge_opt(&self) -> ArrayMergeOpt {
        self.overrides.arrays.unwrap_or(self.defaults.arrays)
    }

    pub fn default_aoh_merge_opt(&self) -> AohMergeOpt {
        self.overrides.aoh.unwrap_or(self.defaults.aoh)
    }

    /// Resolves every rule and key path against both documents of one merge.
    ///
    /// Must run before the merge mutates the LHS so that rules address the
    /// documents as they were given.
    pub fn prepare(&self, lhs: &Document, rhs: &Document) -> Result<ResolvedRules<'_>, PathError> {
        let mut resolved = ResolvedRules {
            config: self,
            lhs_rules: HashMap::new(),
            rhs_rules: HashMap::new(),
            lhs_keys: HashMap::new(),
            rhs_keys: HashMap::new(),
        };

        for (index, rule) in self.rules.iter().enumerate() {
            for location in get_locations(lhs, &rule.path)? {
                resolved.lhs_rules.entry(location).or_default().push(index);
            }
            for location in get_locations(rhs, &rule.path)? {
                resolved.rhs_rules.entry(location).or_default().push(index);
            }
        }

        for (index, key) in self.keys.iter().enumerate() {
            for location in get_locations(lhs, &key.path)? {
                resolved.lhs_keys.entry(location).or_insert(index);
            }
            for location in get_locations(rhs, &key.path)? {
                resolved.rhs_keys.entry(location).or_insert(index);
            }
        }

        Ok(resolved)
    }
}

/// Rule lookups for one merge, keyed by node location.
#[derive(Debug)]
pub struct ResolvedRules<'a> {
    config: &'a MergeConfig,
    lhs_rules: HashMap<Location, Vec<usize>>,
    rhs_rules: HashMap<Location, Vec<usize>>,
    lhs_keys: HashMap<Location, usize>,
    rhs_keys: HashMap<Location, usize>,
}

impl<'a> ResolvedRules<'a> {
    /// Indexes of the rules matching either location, lowest (first declared) first.
    fn matching(&self, lhs: &[ParentRef], rhs: Option<&[ParentRef]>) -> Vec<usize> {
        let mut indexes: Vec<usize> = self.lhs_rules.get(lhs).cloned().unwrap_or_default();
        if let Some(found) = rhs.and_then(|r| self.rhs_rules.get(r)) {
            indexes.extend(found);
        }
        indexes.sort_unstable();
        indexes.dedup();
        indexes
    }

    fn first_rule<T>(
        &self,
        lhs: &[ParentRef],
        rhs: Option<&[ParentRef]>,
        pick: impl Fn(&MergeRule) -> Option<T>,
    ) -> Option<T> {
        self.matching(lhs, rhs)
            .into_iter()
            .find_map(|index| self.config.rules.get(index).and_then(&pick))
    }

    pub fn hash_merge_opt(&self, lhs: &[ParentRef], rhs: Option<&[ParentRef]>) -> HashMergeOpt {
        self.first_rule(lhs, rhs, |rule| rule.hash)
            .unwrap_or_else(|| self.config.default_hash_merge_opt())
    }

    pub fn array_merge_opt(&self, lhs: &[ParentRef], rhs: Option<&[ParentRef]>) -> ArrayMergeOpt {
        self.first_rule(lhs, rhs, |rule| rule.array)
            .unwrap_or_else(|| self.config.default_array_merge_opt())
    }

    pub fn aoh_merge_opt(&self, lhs: &[ParentRef], rhs: Option<&[ParentRef]>) -> AohMergeOpt {
        self.first_rule(lhs, rhs, |rule| rule.aoh)
            .unwrap_or_else(|| self.config.default_aoh_merge_opt())
    }

    /// Configured identity key for the Array-of-Hashes at either location.
    pub fn identity_key(&self, lhs: &[ParentRef], rhs: Option<&[ParentRef]>) -> Option<&'a str> {
        let left = self.lhs_keys.get(lhs).copied();
        let right = rhs.and_then(|r| self.rhs_keys.get(r).copied());
        let index = match (left, right) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => return None,
        };
        self.config.keys.get(index).map(|rule| rule.key.as_str())
    }
}
