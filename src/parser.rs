//! Document stream parsing for JSON and YAML formats.
//!
//! This module loads structured data into [`Document`]s. A single source may
//! hold several documents: YAML streams separated by `---`, or concatenated
//! JSON values. The format is taken from the caller, else from the file
//! extension, else JSON is attempted before YAML.
//!
//! # Examples
//!
//! ```no_run
//! use ymerge::parser::{parse_file, DocumentFormat};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = parse_file(Path::new("config.yaml"), DocumentFormat::Auto)?;
//! println!("{} document(s)", stream.documents.len());
//! # Ok(())
//! # }
//! ```

use crate::document::{resolve_in, AnchorRegistry, Document};
use crate::error::{ParseError, YamlLoadError};
use crate::tree::{Mapping, Node};
use libyaml_safer::{Event, EventData, ScalarStyle};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Syntax of a document source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// Detect from the file extension or the content
    #[default]
    Auto,
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase());
        match extension.as_deref() {
            Some("json") => Some(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }
}

/// All documents read from one source, with the syntax they were read as.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStream {
    pub format: DocumentFormat,
    pub documents: Vec<Document>,
}

/// Parses every document in a file.
///
/// # Arguments
///
/// * `path` - Path to the file to parse
/// * `format` - Forced syntax, or `DocumentFormat::Auto` to detect it
///
/// # Returns
///
/// Returns the parsed stream on success, or a ParseError on failure.
///
/// # Errors
///
/// This function will return an error if:
/// - The file does not exist (`ParseError::FileNotFound`)
/// - The file cannot be read (`ParseError::ReadError`)
/// - The file contains invalid JSON (`ParseError::JsonError`)
/// - The file contains invalid YAML (`ParseError::YamlError`)
pub fn parse_file(path: &Path, format: DocumentFormat) -> Result<ParsedStream, ParseError> {
    let origin = path.to_string_lossy().to_string();
    if !path.exists() {
        return Err(ParseError::file_not_found(origin));
    }

    let content = fs::read_to_string(path).map_err(|e| ParseError::read_error(&origin, e))?;

    let format = match format {
        DocumentFormat::Auto => DocumentFormat::from_path(path).unwrap_or(DocumentFormat::Auto),
        forced => forced,
    };
    parse_content(&content, format, &origin)
}

/// Parses every document read from standard input.
pub fn parse_stdin(format: DocumentFormat) -> Result<ParsedStream, ParseError> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .map_err(|e| ParseError::read_error("STDIN", e))?;
    parse_content(&content, format, "STDIN")
}

/// Parses every document in `content`; `origin` names the source in errors.
///
/// Blank content yields a single empty document.
pub fn parse_content(
    content: &str,
    format: DocumentFormat,
    origin: &str,
) -> Result<ParsedStream, ParseError> {
    let stream = match format {
        DocumentFormat::Json => ParsedStream {
            format,
            documents: parse_json(content).map_err(|e| ParseError::json_error(origin, e))?,
        },
        DocumentFormat::Yaml => ParsedStream {
            format,
            documents: parse_yaml(content).map_err(|e| ParseError::yaml_error(origin, e))?,
        },
        DocumentFormat::Auto if content.trim().is_empty() => ParsedStream {
            format: DocumentFormat::Yaml,
            documents: Vec::new(),
        },
        DocumentFormat::Auto => match parse_json(content) {
            Ok(documents) => ParsedStream {
                format: DocumentFormat::Json,
                documents,
            },
            Err(_) => ParsedStream {
                format: DocumentFormat::Yaml,
                documents: parse_yaml(content).map_err(|e| ParseError::yaml_error(origin, e))?,
            },
        },
    };

    let mut stream = stream;
    if stream.documents.is_empty() {
        stream.documents.push(Document::default());
    }
    debug!(
        origin,
        format = ?stream.format,
        documents = stream.documents.len(),
        "parsed document stream"
    );
    Ok(stream)
}

/// Parses a sequence of JSON values.
///
/// # Examples
///
/// ```
/// use ymerge::parser::parse_json;
///
/// let docs = parse_json(r#"{"name": "Alice"} {"name": "Bob"}"#).unwrap();
/// assert_eq!(docs.len(), 2);
/// ```
pub fn parse_json(content: &str) -> Result<Vec<Document>, serde_json::Error> {
    serde_json::Deserializer::from_str(content)
        .into_iter::<serde_json::Value>()
        .map(|value| value.map(|v| Document::new(json_to_node(v))))
        .collect()
}

/// Parses a YAML stream of one or more documents.
///
/// Anchors survive loading: each anchored node is stored in the document's
/// registry and every occurrence in the tree, the first included, becomes an
/// alias to it. `<<` merge keys are applied while loading.
///
/// # Examples
///
/// ```
/// use ymerge::parser::parse_yaml;
///
/// let docs = parse_yaml("---\nname: Alice\n---\nname: Bob\n").unwrap();
/// assert_eq!(docs.len(), 2);
///
/// let docs = parse_yaml("base: &b value\ncopy: *b\n").unwrap();
/// assert!(docs[0].anchors.contains_key("b"));
/// ```
pub fn parse_yaml(content: &str) -> Result<Vec<Document>, YamlLoadError> {
    let mut input = content.as_bytes();
    let mut parser = libyaml_safer::Parser::new();
    parser.set_input_string(&mut input);
    YamlLoader::new(parser).load_stream()
}

/// Builds documents from the YAML event stream.
struct YamlLoader<'r> {
    parser: libyaml_safer::Parser<'r>,
    /// Anchor name as written in the source → its name in the registry.
    names: HashMap<String, String>,
    anchors: AnchorRegistry,
}

impl<'r> YamlLoader<'r> {
    fn new(parser: libyaml_safer::Parser<'r>) -> Self {
        Self {
            parser,
            names: HashMap::new(),
            anchors: AnchorRegistry::new(),
        }
    }

    fn next_event(&mut self) -> Result<Event, YamlLoadError> {
        Ok(self.parser.parse()?)
    }

    fn load_stream(mut self) -> Result<Vec<Document>, YamlLoadError> {
        let mut documents = Vec::new();
        loop {
            let event = self.next_event()?;
            match event.data {
                EventData::StreamEnd { .. } => break,
                EventData::DocumentStart { .. } => documents.push(self.load_document()?),
                _ => {}
            }
        }
        Ok(documents)
    }

    fn load_document(&mut self) -> Result<Document, YamlLoadError> {
        self.names.clear();
        let event = self.next_event()?;
        let root = if matches!(event.data, EventData::DocumentEnd { .. }) {
            Node::Null
        } else {
            self.load_node(event)?
        };
        let anchors = std::mem::take(&mut self.anchors);
        Ok(Document::with_anchors(root, anchors))
    }

    fn load_node(&mut self, event: Event) -> Result<Node, YamlLoadError> {
        let line = line_of(&event);
        match event.data {
            EventData::Alias { anchor, .. } => match self.names.get(&anchor) {
                Some(name) => Ok(Node::Alias(name.clone())),
                None => Err(YamlLoadError::UndefinedAlias { name: anchor, line }),
            },
            EventData::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                let name = self.reserve(anchor);
                let node = resolve_scalar(value, tag.as_deref(), style);
                Ok(self.bind(name, node))
            }
            EventData::SequenceStart { anchor, .. } => {
                let name = self.reserve(anchor);
                let mut items = Vec::new();
                loop {
                    let event = self.next_event()?;
                    if matches!(event.data, EventData::SequenceEnd { .. }) {
                        break;
                    }
                    items.push(self.load_node(event)?);
                }
                Ok(self.bind(name, Node::Sequence(items)))
            }
            EventData::MappingStart { anchor, .. } => {
                let name = self.reserve(anchor);
                let map = self.load_mapping()?;
                Ok(self.bind(name, Node::Mapping(map)))
            }
            other => Err(YamlLoadError::Unexpected {
                event: event_name(&other).to_string(),
                line,
            }),
        }
    }

    fn load_mapping(&mut self) -> Result<Mapping, YamlLoadError> {
        let mut map = Mapping::new();
        // Where a `<<` key sat among the explicit keys, and what it refers to.
        let mut inherit: Option<(usize, Node, u64)> = None;
        loop {
            let event = self.next_event()?;
            if matches!(event.data, EventData::MappingEnd { .. }) {
                break;
            }
            let line = line_of(&event);
            let merge_key = is_merge_key(&event.data);
            let key = self.load_key(event)?;
            let value_event = self.next_event()?;
            let value = self.load_node(value_event)?;
            if merge_key {
                inherit = Some((map.len(), value, line));
            } else {
                map.insert(key, value);
            }
        }
        match inherit {
            Some((position, sources, line)) => self.apply_merge_key(map, position, &sources, line),
            None => Ok(map),
        }
    }

    /// Keys are kept as written; an aliased key takes its anchor's text.
    fn load_key(&mut self, event: Event) -> Result<String, YamlLoadError> {
        let line = line_of(&event);
        match event.data {
            EventData::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                let name = self.reserve(anchor);
                let node = resolve_scalar(value.clone(), tag.as_deref(), style);
                self.bind(name, node);
                Ok(value)
            }
            EventData::Alias { anchor, .. } => {
                let Some(name) = self.names.get(&anchor) else {
                    return Err(YamlLoadError::UndefinedAlias { name: anchor, line });
                };
                self.anchors
                    .get(name)
                    .and_then(Node::scalar_text)
                    .ok_or(YamlLoadError::ComplexKey { line })
            }
            _ => Err(YamlLoadError::ComplexKey { line }),
        }
    }

    /// Splices the entries inherited through `<<` into `map` at `position`.
    /// Explicit keys win, and earlier sources win over later ones.
    fn apply_merge_key(
        &self,
        map: Mapping,
        position: usize,
        sources: &Node,
        line: u64,
    ) -> Result<Mapping, YamlLoadError> {
        let mut inherited = Mapping::new();
        for source in self.merge_sources(sources, line)? {
            for (key, value) in source {
                if !map.contains_key(key) && !inherited.contains_key(key) {
                    inherited.insert(key.clone(), value.clone());
                }
            }
        }

        let mut merged = Mapping::with_capacity(map.len() + inherited.len());
        let mut pending = Some(inherited);
        for (index, (key, value)) in map.into_iter().enumerate() {
            if index == position {
                if let Some(entries) = pending.take() {
                    merged.extend(entries);
                }
            }
            merged.insert(key, value);
        }
        if let Some(entries) = pending {
            merged.extend(entries);
        }
        Ok(merged)
    }

    fn merge_sources<'s>(&'s self, node: &'s Node, line: u64) -> Result<Vec<&'s Mapping>, YamlLoadError> {
        let resolve = |node: &'s Node| resolve_in(&self.anchors, node).ok();
        match resolve(node) {
            Some(Node::Mapping(map)) => Ok(vec![map]),
            Some(Node::Sequence(items)) => items
                .iter()
                .map(|item| match resolve(item) {
                    Some(Node::Mapping(map)) => Ok(map),
                    _ => Err(YamlLoadError::MergeKey { line }),
                })
                .collect(),
            _ => Err(YamlLoadError::MergeKey { line }),
        }
    }

    /// Claims a registry name for an anchor as its node opens, so aliases
    /// inside that node already resolve. A redefined anchor gets a suffix.
    fn reserve(&mut self, anchor: Option<String>) -> Option<String> {
        let written = anchor?;
        let mut name = written.clone();
        let mut suffix = 0;
        while self.anchors.contains_key(&name) {
            suffix += 1;
            name = format!("{}_{}", written, suffix);
        }
        self.anchors.insert(name.clone(), Node::Null);
        self.names.insert(written, name.clone());
        Some(name)
    }

    fn bind(&mut self, name: Option<String>, node: Node) -> Node {
        match name {
            Some(name) => {
                self.anchors.insert(name.clone(), node);
                Node::Alias(name)
            }
            None => node,
        }
    }
}

fn line_of(event: &Event) -> u64 {
    event.start_mark.line as u64 + 1
}

fn is_merge_key(data: &EventData) -> bool {
    matches!(
        data,
        EventData::Scalar { value, style: ScalarStyle::Plain, tag: None, .. } if value == "<<"
    )
}

fn event_name(data: &EventData) -> &'static str {
    match data {
        EventData::StreamStart { .. } => "stream start",
        EventData::StreamEnd { .. } => "stream end",
        EventData::DocumentStart { .. } => "document start",
        EventData::DocumentEnd { .. } => "document end",
        EventData::SequenceEnd { .. } => "sequence end",
        EventData::MappingEnd { .. } => "mapping end",
        _ => "node",
    }
}

const CORE_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// YAML 1.2 core schema resolution. Quoted and block scalars are strings
/// unless a core tag says otherwise.
fn resolve_scalar(value: String, tag: Option<&str>, style: ScalarStyle) -> Node {
    match tag.and_then(|t| t.strip_prefix(CORE_TAG_PREFIX)) {
        Some("str") => return Node::String(value),
        Some("null" | "bool" | "int" | "float") => return resolve_plain(value),
        _ => {}
    }
    if matches!(style, ScalarStyle::Plain) {
        resolve_plain(value)
    } else {
        Node::String(value)
    }
}

fn resolve_plain(value: String) -> Node {
    match value.as_str() {
        "" | "~" | "null" | "Null" | "NULL" => return Node::Null,
        "true" | "True" | "TRUE" => return Node::Bool(true),
        "false" | "False" | "FALSE" => return Node::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => return Node::Float(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => return Node::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Node::Float(f64::NAN),
        _ => {}
    }
    if let Some(integer) = parse_integer(&value) {
        return Node::Integer(integer);
    }
    let numeric = value.bytes().any(|b| b.is_ascii_digit())
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-' | b'e' | b'E'));
    if numeric {
        if let Ok(float) = value.parse::<f64>() {
            return Node::Float(float);
        }
    }
    Node::String(value)
}

fn parse_integer(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(octal) = text.strip_prefix("0o") {
        return i64::from_str_radix(octal, 8).ok();
    }
    let digits = text.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn json_to_node(value: serde_json::Value) -> Node {
    match value {
        serde_json::Value::Null => Node::Null,
        serde_json::Value::Bool(b) => Node::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Node::Integer(i),
            None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Node::String(s),
        serde_json::Value::Array(arr) => {
            Node::Sequence(arr.into_iter().map(json_to_node).collect())
        }
        serde_json::Value::Object(obj) => {
            let map: Mapping = obj.into_iter().map(|(k, v)| (k, json_to_node(v))).collect();
            Node::Mapping(map)
        }
    }
}
