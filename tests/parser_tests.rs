use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use ymerge::tree::Mapping;
use ymerge::{parse_content, parse_file, parse_json, parse_yaml, DocumentFormat, Node, ParseError};

fn root(content: &str, format: DocumentFormat) -> Node {
    let stream = parse_content(content, format, "test").unwrap();
    stream.documents[0].root.clone()
}

#[test]
fn test_parse_json_primitives() {
    assert_eq!(root("null", DocumentFormat::Json), Node::Null);
    assert_eq!(root("true", DocumentFormat::Json), Node::Bool(true));
    assert_eq!(root("42", DocumentFormat::Json), Node::Integer(42));
    assert_eq!(root("-7", DocumentFormat::Json), Node::Integer(-7));
    assert_eq!(root("3.15", DocumentFormat::Json), Node::Float(3.15));
    assert_eq!(root(r#""hello""#, DocumentFormat::Json), Node::from("hello"));
}

#[test]
fn test_parse_json_object_keeps_order() {
    let node = root(r#"{"name": "Alice", "age": 30, "city": "NYC"}"#, DocumentFormat::Json);
    let keys: Vec<_> = node.as_mapping().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["name", "age", "city"]);
}

#[test]
fn test_parse_yaml_nested() {
    let node = root(
        "user:\n  name: Alice\n  roles:\n    - admin\n    - dev\n",
        DocumentFormat::Yaml,
    );
    let mut user = Mapping::new();
    user.insert("name".to_string(), Node::from("Alice"));
    user.insert(
        "roles".to_string(),
        Node::Sequence(vec![Node::from("admin"), Node::from("dev")]),
    );
    let mut expected = Mapping::new();
    expected.insert("user".to_string(), Node::Mapping(user));
    assert_eq!(node, Node::Mapping(expected));
}

#[test]
fn test_parse_yaml_stream() {
    let docs = parse_yaml("---\na: 1\n---\nb: 2\n---\n- 3\n").unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[2].root, Node::Sequence(vec![Node::Integer(3)]));
}

#[test]
fn test_parse_json_stream() {
    let docs = parse_json("{\"a\": 1}\n{\"b\": 2}\n").unwrap();
    assert_eq!(docs.len(), 2);
}

#[test]
fn test_auto_detects_json_then_yaml() {
    let json = parse_content("{\"a\": 1}", DocumentFormat::Auto, "test").unwrap();
    assert_eq!(json.format, DocumentFormat::Json);
    let yaml = parse_content("a: 1", DocumentFormat::Auto, "test").unwrap();
    assert_eq!(yaml.format, DocumentFormat::Yaml);
}

#[test]
fn test_forced_yaml_accepts_json_text() {
    let stream = parse_content("{\"a\": [1, 2]}", DocumentFormat::Yaml, "test").unwrap();
    assert_eq!(stream.format, DocumentFormat::Yaml);
    assert!(stream.documents[0].root.as_mapping().is_some());
}

#[test]
fn test_parse_file_uses_extension() {
    let stream = parse_file(Path::new("tests/fixtures/settings.json"), DocumentFormat::Auto).unwrap();
    assert_eq!(stream.format, DocumentFormat::Json);

    let stream = parse_file(Path::new("tests/fixtures/multi_doc.yaml"), DocumentFormat::Auto).unwrap();
    assert_eq!(stream.format, DocumentFormat::Yaml);
    assert_eq!(stream.documents.len(), 3);
}

#[test]
fn test_parse_file_without_extension() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "key: value").unwrap();
    let stream = parse_file(file.path(), DocumentFormat::Auto).unwrap();
    assert_eq!(stream.format, DocumentFormat::Yaml);
}

#[test]
fn test_empty_file_is_one_empty_document() {
    let file = NamedTempFile::new().unwrap();
    let stream = parse_file(file.path(), DocumentFormat::Auto).unwrap();
    assert_eq!(stream.documents.len(), 1);
    assert!(stream.documents[0].is_empty());
}

#[test]
fn test_parse_file_not_found() {
    let result = parse_file(Path::new("tests/fixtures/nonexistent.yaml"), DocumentFormat::Auto);
    assert!(matches!(result, Err(ParseError::FileNotFound { .. })));
}

#[test]
fn test_syntax_errors_name_the_source() {
    let yaml = parse_file(Path::new("tests/fixtures/invalid.yaml"), DocumentFormat::Auto);
    let err = yaml.unwrap_err();
    assert!(matches!(err, ParseError::YamlError { .. }));
    assert!(err.to_string().contains("invalid.yaml"));

    let json = parse_file(Path::new("tests/fixtures/invalid.json"), DocumentFormat::Auto);
    assert!(matches!(json, Err(ParseError::JsonError { .. })));
}

#[test]
fn test_document_format_from_path() {
    assert_eq!(DocumentFormat::from_path(Path::new("a.JSON")), Some(DocumentFormat::Json));
    assert_eq!(DocumentFormat::from_path(Path::new("a.yml")), Some(DocumentFormat::Yaml));
    assert_eq!(DocumentFormat::from_path(Path::new("a.toml")), None);
}
