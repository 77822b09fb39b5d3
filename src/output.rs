//! Serialization of merged documents and writing them out.
//!
//! YAML output keeps anchors: the first occurrence of an anchored value is
//! written as `&name value` and later ones as `*name`. JSON has no anchors,
//! so aliases are expanded into copies of their values.
//!
//! # Examples
//!
//! ```
//! use ymerge::{Document, Node, format_document, OutputFormat};
//! use ymerge::tree::Mapping;
//!
//! let mut map = Mapping::new();
//! map.insert("key".to_string(), Node::from("value"));
//! let doc = Document::new(Node::Mapping(map));
//!
//! assert_eq!(format_document(&doc, OutputFormat::Yaml).unwrap(), "---\nkey: value\n");
//! assert_eq!(format_document(&doc, OutputFormat::Json).unwrap(), "{\"key\": \"value\"}\n");
//! ```

use crate::document::Document;
use crate::error::{MergeError, OutputError};
use crate::parser::DocumentFormat;
use crate::tree::{Mapping, Node};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single-line JSON with a space after each `:` and `,`
    Json,
    /// Block-style YAML starting with `---`
    Yaml,
}

/// Chooses the output syntax.
///
/// # Arguments
///
/// * `forced` - Format requested explicitly, if any
/// * `destination` - Output file, whose extension is consulted next
/// * `first_input` - Format the first input stream was read as
pub fn infer_output_format(
    forced: Option<OutputFormat>,
    destination: Option<&Path>,
    first_input: DocumentFormat,
) -> OutputFormat {
    if let Some(format) = forced {
        return format;
    }
    let from_destination = destination.and_then(DocumentFormat::from_path);
    match from_destination.unwrap_or(first_input) {
        DocumentFormat::Json => OutputFormat::Json,
        DocumentFormat::Yaml | DocumentFormat::Auto => OutputFormat::Yaml,
    }
}

/// Serializes a document.
///
/// # Returns
///
/// The text, always ending in a newline, or an OutputError when an alias
/// names no anchor or serialization fails.
pub fn format_document(doc: &Document, format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Json => {
            let plain = doc.expand()?;
            let mut buffer = Vec::new();
            let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedFormatter);
            node_to_json_value(&plain)
                .serialize(&mut serializer)
                .map_err(|e| OutputError::JsonSerializationError { source: e })?;
            let text = String::from_utf8_lossy(&buffer);
            Ok(format!("{}\n", text))
        }
        OutputFormat::Yaml => YamlEmitter::new(doc).emit(),
    }
}

/// Compact JSON with `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Block-style YAML writer that keeps the document's anchors.
///
/// Mappings nest two spaces deeper than their key; sequences under a key
/// stay at the key's indentation. A collection inside a sequence starts on
/// the `- ` line.
struct YamlEmitter<'d> {
    doc: &'d Document,
    out: String,
    emitted: HashSet<&'d str>,
}

/// How a value starts on its line, and the collection that follows below.
struct Head<'d> {
    inline: String,
    block: Option<&'d Node>,
}

impl<'d> YamlEmitter<'d> {
    fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            out: String::new(),
            emitted: HashSet::new(),
        }
    }

    fn emit(mut self) -> Result<String, OutputError> {
        let doc = self.doc;
        let head = self.head(&doc.root)?;
        self.out.push_str("---");
        if !head.inline.is_empty() {
            self.out.push(' ');
            self.out.push_str(&head.inline);
        }
        self.out.push('\n');
        if let Some(block) = head.block {
            self.block(block, 0, false)?;
        }
        Ok(self.out)
    }

    fn head(&mut self, node: &'d Node) -> Result<Head<'d>, OutputError> {
        match node {
            Node::Alias(name) => {
                if !self.emitted.insert(name.as_str()) {
                    return Ok(Head {
                        inline: format!("*{}", name),
                        block: None,
                    });
                }
                let doc = self.doc;
                let value = doc
                    .anchors
                    .get(name)
                    .ok_or_else(|| MergeError::UnknownAnchor { name: name.clone() })?;
                let inner = self.head(value)?;
                let inline = if inner.inline.is_empty() {
                    format!("&{}", name)
                } else {
                    format!("&{} {}", name, inner.inline)
                };
                Ok(Head {
                    inline,
                    block: inner.block,
                })
            }
            Node::Mapping(map) if map.is_empty() => Ok(Head {
                inline: "{}".to_string(),
                block: None,
            }),
            Node::Sequence(seq) if seq.is_empty() => Ok(Head {
                inline: "[]".to_string(),
                block: None,
            }),
            Node::Mapping(_) | Node::Sequence(_) => Ok(Head {
                inline: String::new(),
                block: Some(node),
            }),
            scalar => Ok(Head {
                inline: yaml_scalar(scalar)?,
                block: None,
            }),
        }
    }

    /// Writes a non-empty collection. With `continued`, the first line goes
    /// straight after text already on the current line.
    fn block(&mut self, node: &'d Node, indent: usize, continued: bool) -> Result<(), OutputError> {
        match node {
            Node::Mapping(map) => self.mapping(map, indent, continued),
            Node::Sequence(seq) => self.sequence(seq, indent, continued),
            _ => Ok(()),
        }
    }

    fn mapping(&mut self, map: &'d Mapping, indent: usize, continued: bool) -> Result<(), OutputError> {
        for (index, (key, value)) in map.iter().enumerate() {
            if index > 0 || !continued {
                self.indent(indent);
            }
            self.out.push_str(&yaml_scalar(&Node::String(key.clone()))?);
            self.out.push(':');
            let head = self.head(value)?;
            self.line_end(&head.inline);
            match head.block {
                Some(Node::Sequence(seq)) => self.sequence(seq, indent, false)?,
                Some(block) => self.block(block, indent + 2, false)?,
                None => {}
            }
        }
        Ok(())
    }

    fn sequence(&mut self, seq: &'d [Node], indent: usize, continued: bool) -> Result<(), OutputError> {
        for (index, item) in seq.iter().enumerate() {
            if index > 0 || !continued {
                self.indent(indent);
            }
            self.out.push('-');
            let head = self.head(item)?;
            match head.block {
                Some(block) if head.inline.is_empty() => {
                    self.out.push(' ');
                    self.block(block, indent + 2, true)?;
                }
                Some(block) => {
                    self.line_end(&head.inline);
                    self.block(block, indent + 2, false)?;
                }
                None => self.line_end(&head.inline),
            }
        }
        Ok(())
    }

    fn indent(&mut self, width: usize) {
        self.out.extend(std::iter::repeat(' ').take(width));
    }

    fn line_end(&mut self, inline: &str) {
        if !inline.is_empty() {
            self.out.push(' ');
            self.out.push_str(inline);
        }
        self.out.push('\n');
    }
}

/// One-line YAML form of a scalar, quoted where a plain scalar would be
/// read back as something else.
fn yaml_scalar(node: &Node) -> Result<String, OutputError> {
    if let Node::String(s) = node {
        if s.contains('\n') {
            return serde_json::to_string(s)
                .map_err(|e| OutputError::JsonSerializationError { source: e });
        }
    }
    let text = serde_yaml::to_string(&node_to_yaml_value(node))
        .map_err(|e| OutputError::YamlSerializationError { source: e })?;
    Ok(text.trim_end_matches('\n').to_string())
}

/// Writes `content` to `destination`, or to standard output when `None`.
///
/// An existing destination is only replaced when `overwrite` is set, after
/// being copied to `<destination>.bak` when `backup` is also set.
pub fn write_output(
    content: &str,
    destination: Option<&Path>,
    overwrite: bool,
    backup: bool,
) -> Result<(), OutputError> {
    let Some(path) = destination else {
        let mut stdout = std::io::stdout().lock();
        return stdout
            .write_all(content.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| OutputError::WriteError {
                path: "STDOUT".to_string(),
                source: e,
            });
    };

    let shown = path.display().to_string();
    if path.exists() {
        if !overwrite {
            return Err(OutputError::FileExists { path: shown });
        }
        if backup {
            let backup_path = backup_path(path);
            debug!(backup = %backup_path.display(), "backing up output file");
            fs::copy(path, &backup_path).map_err(|e| OutputError::BackupError {
                path: backup_path.display().to_string(),
                source: e,
            })?;
        }
    }

    fs::write(path, content).map_err(|e| OutputError::WriteError {
        path: shown.clone(),
        source: e,
    })?;
    info!(path = %shown, "wrote merged document");
    Ok(())
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Non-finite floats have no JSON form and become null.
fn node_to_json_value(node: &Node) -> serde_json::Value {
    use serde_json::json;

    match node {
        Node::Null | Node::Alias(_) => json!(null),
        Node::Bool(b) => json!(b),
        Node::Integer(i) => json!(i),
        Node::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Node::String(s) => json!(s),
        Node::Sequence(seq) => {
            serde_json::Value::Array(seq.iter().map(node_to_json_value).collect())
        }
        Node::Mapping(map) => {
            let obj: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), node_to_json_value(v)))
                .collect();
            serde_json::Value::Object(obj)
        }
    }
}

fn node_to_yaml_value(node: &Node) -> serde_yaml::Value {
    match node {
        Node::Null | Node::Alias(_) => serde_yaml::Value::Null,
        Node::Bool(b) => serde_yaml::Value::Bool(*b),
        Node::Integer(i) => serde_yaml::Value::Number((*i).into()),
        Node::Float(f) => serde_yaml::Value::Number((*f).into()),
        Node::String(s) => serde_yaml::Value::String(s.clone()),
        Node::Sequence(seq) => {
            serde_yaml::Value::Sequence(seq.iter().map(node_to_yaml_value).collect())
        }
        Node::Mapping(map) => {
            let mapping: serde_yaml::Mapping = map
                .iter()
                .map(|(k, v)| (serde_yaml::Value::String(k.clone()), node_to_yaml_value(v)))
                .collect();
            serde_yaml::Value::Mapping(mapping)
        }
    }
}
