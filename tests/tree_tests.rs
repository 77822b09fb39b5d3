use ymerge::tree::Mapping;
use ymerge::{Document, Node};

#[test]
fn test_type_name() {
    assert_eq!(Node::Null.type_name(), "null");
    assert_eq!(Node::Bool(true).type_name(), "boolean");
    assert_eq!(Node::Integer(42).type_name(), "integer");
    assert_eq!(Node::Float(4.2).type_name(), "float");
    assert_eq!(Node::from("test").type_name(), "string");
    assert_eq!(Node::Mapping(Mapping::new()).type_name(), "hash");
    assert_eq!(Node::Sequence(vec![]).type_name(), "array");
    assert_eq!(Node::Alias("a".to_string()).type_name(), "alias");
}

#[test]
fn test_is_scalar() {
    assert!(Node::Null.is_scalar());
    assert!(Node::from("text").is_scalar());
    assert!(!Node::Sequence(vec![]).is_scalar());
    assert!(!Node::Alias("a".to_string()).is_scalar());
}

#[test]
fn test_semantic_equals_primitives() {
    assert!(Node::Null.semantic_equals(&Node::Null));
    assert!(Node::Bool(true).semantic_equals(&Node::Bool(true)));
    assert!(!Node::Bool(true).semantic_equals(&Node::Bool(false)));
    assert!(Node::from("hello").semantic_equals(&Node::from("hello")));
    assert!(!Node::Null.semantic_equals(&Node::Bool(false)));
    assert!(!Node::Bool(true).semantic_equals(&Node::Integer(1)));
}

#[test]
fn test_semantic_equals_numbers() {
    assert!(Node::Integer(2).semantic_equals(&Node::Float(2.0)));
    assert!(Node::Float(0.1 + 0.2).semantic_equals(&Node::Float(0.3)));
    assert!(!Node::Integer(2).semantic_equals(&Node::Integer(3)));
}

#[test]
fn test_semantic_equals_sequences_respect_order() {
    let a = Node::Sequence(vec![Node::Integer(1), Node::Integer(2)]);
    let b = Node::Sequence(vec![Node::Integer(2), Node::Integer(1)]);
    assert!(!a.semantic_equals(&b));
}

#[test]
fn test_aliases_compare_by_name_or_through_document() {
    let mut left = Document::default();
    let a = left.anchor("a", Node::Integer(1));
    let mut right = Document::default();
    let b = right.anchor("b", Node::Integer(1));

    assert!(!a.semantic_equals(&b));
    assert!(left.values_equal(&a, &right, &b));
    assert!(left.values_equal(&a, &right, &Node::Integer(1)));
}

#[test]
fn test_scalar_text_and_number() {
    assert_eq!(Node::Integer(7).scalar_text().as_deref(), Some("7"));
    assert_eq!(Node::Bool(false).scalar_text().as_deref(), Some("false"));
    assert_eq!(Node::Sequence(vec![]).scalar_text(), None);
    assert_eq!(Node::from(" 12 ").as_f64(), Some(12.0));
    assert_eq!(Node::from("twelve").as_f64(), None);
}

#[test]
fn test_preview() {
    assert_eq!(Node::from("short").preview(10), "short");
    assert_eq!(Node::from("a longer string").preview(8), "a lon...");
    assert_eq!(
        Node::Sequence(vec![Node::Null, Node::Null]).preview(20),
        "[ 2 items ]"
    );
    assert_eq!(Node::Mapping(Mapping::new()).preview(20), "{}");
    assert_eq!(Node::Alias("base".to_string()).preview(20), "*base");
}

#[test]
fn test_rename_aliases_is_recursive() {
    let mut inner = Mapping::new();
    inner.insert("ref".to_string(), Node::Alias("old".to_string()));
    let mut node = Node::Sequence(vec![Node::Mapping(inner), Node::Alias("keep".to_string())]);
    node.rename_aliases("old", "new");

    let mut expected_inner = Mapping::new();
    expected_inner.insert("ref".to_string(), Node::Alias("new".to_string()));
    assert_eq!(
        node,
        Node::Sequence(vec![
            Node::Mapping(expected_inner),
            Node::Alias("keep".to_string())
        ])
    );
}

#[test]
fn test_from_conversions() {
    assert_eq!(Node::from(3_i64), Node::Integer(3));
    assert_eq!(Node::from(true), Node::Bool(true));
    assert_eq!(Node::from(vec![Node::Null]), Node::Sequence(vec![Node::Null]));
}
