//! YMERGE - Merge engine for YAML and JSON documents.
//!
//! This library merges structured documents into one another. Where a value
//! lands, and how Hashes, Arrays and Arrays-of-Hashes are combined, is steered
//! by [YAML Path](path) expressions and per-path rules. Anchors and aliases are
//! carried through the merge and reconciled by name.
//!
//! # Example
//!
//! ```
//! use ymerge::{parse_content, DocumentFormat, MergeConfig, Merger};
//! use ymerge::{format_document, OutputFormat};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let lhs = parse_content("key: value\narray:\n  - 1\n", DocumentFormat::Yaml, "lhs")?;
//! let rhs = parse_content("{\"array\": [2], \"new\": true}", DocumentFormat::Json, "rhs")?;
//!
//! let mut merger = Merger::new(lhs.documents[0].clone(), MergeConfig::new());
//! for doc in rhs.documents {
//!     merger.merge_with(doc)?;
//! }
//!
//! let output = format_document(merger.document(), OutputFormat::Json)?;
//! assert_eq!(output, "{\"key\": \"value\", \"array\": [1, 2], \"new\": true}\n");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod config;
pub mod coords;
pub mod document;
pub mod error;
pub mod keywords;
pub mod logging;
pub mod merge;
pub mod output;
pub mod parser;
pub mod path;
pub mod traverse;
pub mod tree;

// Re-export commonly used types for convenience
pub use config::{
    AnchorConflictResolution, AohMergeOpt, ArrayMergeOpt, HashMergeOpt, MergeConfig,
    MergeDefaults, MergeOverrides,
};
pub use coords::{NodeCoordinate, NodeRef, ParentRef};
pub use document::Document;
pub use error::{
    ConfigError, MergeError, OutputError, ParseError, PathError, YamlLoadError, YmergeError,
};
pub use keywords::PathSearchKeyword;
pub use merge::Merger;
pub use output::{format_document, infer_output_format, write_output, OutputFormat};
pub use parser::{parse_content, parse_file, parse_json, parse_stdin, parse_yaml, DocumentFormat};
pub use path::{PathSeparator, YamlPath};
pub use traverse::{get_locations, get_nodes, get_or_create_locations, get_or_create_nodes};
pub use tree::Node;
