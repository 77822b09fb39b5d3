use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use ymerge::config::MergeRule;
use ymerge::{
    parse_yaml, AnchorConflictResolution, AohMergeOpt, ArrayMergeOpt, ConfigError, Document,
    HashMergeOpt, MergeConfig, MergeDefaults, MergeOverrides, ParentRef,
};

fn doc(yaml: &str) -> Document {
    parse_yaml(yaml).unwrap().remove(0)
}

fn key(name: &str) -> ParentRef {
    ParentRef::Key(name.to_string())
}

#[test]
fn test_load_config_file() {
    let config = MergeConfig::from_file(Path::new("tests/fixtures/merge_config.toml")).unwrap();
    assert_eq!(config.default_array_merge_opt(), ArrayMergeOpt::Unique);
    assert_eq!(config.default_hash_merge_opt(), HashMergeOpt::Deep);
    assert_eq!(config.rules().len(), 1);
    assert_eq!(config.rules()[0].value, "deep");
}

#[test]
fn test_missing_config_file() {
    let result = MergeConfig::from_file(Path::new("tests/fixtures/nonexistent.toml"));
    assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
}

#[test]
fn test_unknown_section_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[colors]\nred = \"yes\"").unwrap();
    let result = MergeConfig::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Toml { .. })));
}

#[test]
fn test_invalid_option_value() {
    let result = MergeConfig::from_file(Path::new("tests/fixtures/bad_option.toml"));
    let err = result.unwrap_err();
    assert!(err.to_string().contains("sideways"));
}

#[test]
fn test_precedence_rule_over_override_over_default() {
    let config = MergeConfig::new()
        .with_defaults(MergeDefaults {
            arrays: ArrayMergeOpt::Left,
            ..MergeDefaults::default()
        })
        .with_overrides(MergeOverrides {
            arrays: Some(ArrayMergeOpt::Right),
            ..MergeOverrides::default()
        })
        .with_rule("/pinned", "unique")
        .unwrap();
    assert_eq!(config.default_array_merge_opt(), ArrayMergeOpt::Right);

    let lhs = doc("{pinned: [1], other: [2]}");
    let rules = config.prepare(&lhs, &Document::default()).unwrap();
    assert_eq!(
        rules.array_merge_opt(&[key("pinned")], None),
        ArrayMergeOpt::Unique
    );
    assert_eq!(
        rules.array_merge_opt(&[key("other")], None),
        ArrayMergeOpt::Right
    );
}

#[test]
fn test_rule_value_applies_only_to_kinds_it_names() {
    // `all` is not a hash option, so hashes at the path keep their default.
    let config = MergeConfig::new().with_rule("/data", "all").unwrap();
    let lhs = doc("data: {a: 1}");
    let rules = config.prepare(&lhs, &Document::default()).unwrap();
    assert_eq!(rules.hash_merge_opt(&[key("data")], None), HashMergeOpt::Deep);
    assert_eq!(rules.aoh_merge_opt(&[key("data")], None), AohMergeOpt::All);
}

#[test]
fn test_rule_matching_rhs_location() {
    let config = MergeConfig::new().with_rule("/only_right", "left").unwrap();
    let rules = config
        .prepare(&Document::default(), &doc("only_right: [1]"))
        .unwrap();
    assert_eq!(
        rules.array_merge_opt(&[key("elsewhere")], Some(&[key("only_right")][..])),
        ArrayMergeOpt::Left
    );
    assert_eq!(
        rules.array_merge_opt(&[key("elsewhere")], None),
        ArrayMergeOpt::All
    );
}

#[test]
fn test_identity_key_lookup() {
    let config = MergeConfig::new()
        .with_identity_key("/records", "name")
        .unwrap()
        .with_identity_key("/records", "id")
        .unwrap();
    let lhs = doc("records: [{id: 1, name: a}]");
    let rules = config.prepare(&lhs, &Document::default()).unwrap();
    assert_eq!(rules.identity_key(&[key("records")], None), Some("name"));
    assert_eq!(rules.identity_key(&[key("absent")], None), None);
}

#[test]
fn test_anchor_policy_is_global() {
    let config = MergeConfig::from_toml_str("[defaults]\nanchors = \"rename\"\n", "inline").unwrap();
    assert_eq!(config.anchor_merge_opt(), AnchorConflictResolution::Rename);
    let config = config.with_anchors(AnchorConflictResolution::Left);
    assert_eq!(config.anchor_merge_opt(), AnchorConflictResolution::Left);
}

#[test]
fn test_merge_rule_rejects_unknown_value() {
    let err = MergeRule::new("/a", "sideways").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidOption { .. }));
}

#[test]
fn test_option_names_parse() {
    for name in AohMergeOpt::names() {
        assert!(name.parse::<AohMergeOpt>().is_ok());
    }
    assert!("deep".parse::<ArrayMergeOpt>().is_err());
}
