//! Custom error types for ymerge.

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON syntax error in {path}: {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML syntax error in {path}: {source}")]
    YamlError {
        path: String,
        #[source]
        source: YamlLoadError,
    },
}

/// Failures met while turning a YAML event stream into documents.
#[derive(Debug, thiserror::Error)]
pub enum YamlLoadError {
    #[error("{0}")]
    Syntax(#[from] libyaml_safer::Error),

    #[error("found undefined alias, *{name}, on line {line}")]
    UndefinedAlias { name: String, line: u64 },

    #[error("unsupported Hash or Array used as a Hash key on line {line}")]
    ComplexKey { line: u64 },

    #[error("the << merge key on line {line} must refer to a Hash or an Array of Hashes")]
    MergeKey { line: u64 },

    #[error("unexpected {event} event on line {line}")]
    Unexpected { event: String, line: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Output file already exists: {path}")]
    FileExists { path: String },

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to back up {path}: {source}")]
    BackupError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize to JSON: {source}")]
    JsonSerializationError {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize to YAML: {source}")]
    YamlSerializationError {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unable to expand aliases for output: {0}")]
    Alias(#[from] MergeError),
}

/// Malformed YAML Paths and misused search keywords.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Invalid YAML Path, {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Invalid regular expression, {pattern}, in YAML Path {path}: {reason}")]
    Regex {
        path: String,
        pattern: String,
        reason: String,
    },

    #[error("Unknown search keyword, {keyword}, in YAML Path {path}")]
    UnknownKeyword { keyword: String, path: String },

    #[error(
        "Invalid parameter count to {keyword}; {expected} required, got {actual} in YAML Path {path}"
    )]
    KeywordArity {
        keyword: String,
        expected: String,
        actual: usize,
        path: String,
    },

    #[error("Invalid use of {keyword} in YAML Path {path}: {reason}")]
    KeywordUsage {
        keyword: String,
        reason: String,
        path: String,
    },
}

/// Failures raised while merging one document into another.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Unable to resolve merge target, {path}; merge was not performed")]
    NotPerformed { path: String },

    #[error(
        "Impossible to add Scalar value, {value}, to a Hash without a key at {path}.  Change the \
         value to a 'key: value' pair, a '{{key: value}}' Hash, or change the merge target to an \
         Array or other Scalar value."
    )]
    ScalarToHash { value: String, path: String },

    #[error("Impossible to add Hash data to non-Hash destination at {path}")]
    HashToNonHash { path: String },

    #[error("Impossible to add Array data to non-Array destination at {path}")]
    ArrayToNonArray { path: String },

    #[error("Impossible to add Array-of-Hash data to non-Array destination at {path}")]
    AohToNonArray { path: String },

    #[error("Mandatory identity key, {key}, not present in Hash with keys: {keys} at {path}")]
    MissingIdentityKey {
        key: String,
        keys: String,
        path: String,
    },

    #[error("Aborting due to anchor conflict with, {anchor}")]
    AnchorConflict { anchor: String },

    #[error("Aborting merge of {kind} data at {path}; the {kind} merge option is stop")]
    Stopped { kind: String, path: String },

    #[error("Alias refers to an undefined anchor, {name}")]
    UnknownAnchor { name: String },

    #[error("Alias cycle detected through anchor, {name}")]
    CyclicAlias { name: String },

    #[error(transparent)]
    Path(#[from] PathError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file is not readable: {path}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid {kind} merge option, {value}; expected one of: {choices}")]
    InvalidOption {
        kind: String,
        value: String,
        choices: String,
    },

    #[error(transparent)]
    Path(#[from] PathError),
}

#[derive(Debug, thiserror::Error)]
pub enum YmergeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid arguments: {message}")]
    Usage { message: String },
}

impl YmergeError {
    /// Process exit status for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            YmergeError::Usage { .. } | YmergeError::Config(_) => 1,
            YmergeError::Parse(ParseError::FileNotFound { .. } | ParseError::ReadError { .. }) => 2,
            YmergeError::Parse(_) => 3,
            YmergeError::Merge(MergeError::Path(_)) | YmergeError::Path(_) => 5,
            YmergeError::Merge(_) => 4,
            YmergeError::Output(OutputError::FileExists { .. }) => 1,
            YmergeError::Output(_) => 6,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

impl ParseError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub fn json_error(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonError {
            path: path.into(),
            source,
        }
    }

    pub fn yaml_error(path: impl Into<String>, source: YamlLoadError) -> Self {
        Self::YamlError {
            path: path.into(),
            source,
        }
    }
}

impl PathError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::file_not_found("test.yaml");
        assert_eq!(err.to_string(), "File not found: test.yaml");
    }

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        let usage = YmergeError::usage("nope");
        let missing: YmergeError = ParseError::file_not_found("x").into();
        let merge: YmergeError = MergeError::AnchorConflict {
            anchor: "a".to_string(),
        }
        .into();
        let path: YmergeError = PathError::malformed("/[", "unterminated").into();
        assert_eq!(usage.exit_code(), 1);
        assert_eq!(missing.exit_code(), 2);
        assert_eq!(merge.exit_code(), 4);
        assert_eq!(path.exit_code(), 5);
    }

    #[test]
    fn test_path_error_inside_merge_error_keeps_path_exit_code() {
        let err: YmergeError = MergeError::from(PathError::UnknownKeyword {
            keyword: "bogus".to_string(),
            path: "/[bogus()]".to_string(),
        })
        .into();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_scalar_to_hash_message() {
        let err = MergeError::ScalarToHash {
            value: "replacement".to_string(),
            path: "/".to_string(),
        };
        assert!(err
            .to_string()
            .starts_with("Impossible to add Scalar value, replacement,"));
    }
}
