use daqmx_loader::{
    describe, fingerprint, load_catalog, load_catalog_with_enums, parse_catalog, GeneratorConfig, LoadError,
    SourceFormat, Target,
};
use std::fs;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

fn sample_catalog_path() -> PathBuf {
    workspace_root().join("catalog").join("nidaqmx.catalog.yaml")
}

#[test]
fn sample_catalog_loads() {
    let catalog = load_catalog(&sample_catalog_path()).unwrap();
    assert_eq!(catalog.catalog.package, "nidaqmx");
    assert_eq!(catalog.catalog.symbol_prefix, "DAQmx");
    assert_eq!(catalog.functions.len(), 26);
    assert_eq!(catalog.enums.len(), 9);
    assert!(catalog.enums["PowerUpStates"].contains(10_310));
    assert!(!catalog.enums["PowerUpStates"].contains(1));
}

#[test]
fn description_reloads_to_the_same_catalog() {
    let catalog = load_catalog(&sample_catalog_path()).unwrap();
    let text = describe(&catalog).unwrap();
    let reloaded = parse_catalog(&text, SourceFormat::Yaml, Path::new("description.yaml")).unwrap();
    assert_eq!(reloaded, catalog);
    assert_eq!(describe(&reloaded).unwrap(), text);
    assert_eq!(fingerprint(&reloaded).unwrap(), fingerprint(&catalog).unwrap());
}

#[test]
fn json_and_yaml_sources_agree() {
    let catalog = load_catalog(&sample_catalog_path()).unwrap();
    let json = serde_json::to_string_pretty(&catalog).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nidaqmx.catalog.json");
    fs::write(&path, json).unwrap();
    assert_eq!(load_catalog(&path).unwrap(), catalog);
}

#[test]
fn fingerprint_tracks_content() {
    let mut catalog = load_catalog(&sample_catalog_path()).unwrap();
    let before = fingerprint(&catalog).unwrap();
    assert_eq!(before.len(), 64);

    catalog.catalog.version = "24.0.0".into();
    assert_ne!(fingerprint(&catalog).unwrap(), before);
}

#[test]
fn external_enum_table_merges() {
    let dir = tempfile::tempdir().unwrap();
    let enums = dir.path().join("enums.yaml");
    fs::write(
        &enums,
        "enums:\n  LoggingMode:\n    values:\n      - { name: Off, value: 10231 }\n      - { name: Log, value: 15844 }\n",
    )
    .unwrap();

    let catalog = load_catalog_with_enums(&sample_catalog_path(), Some(&enums)).unwrap();
    assert_eq!(catalog.enums.len(), 10);
    assert!(catalog.enums["LoggingMode"].contains(15_844));
}

#[test]
fn conflicting_enum_table_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let enums = dir.path().join("enums.yaml");
    fs::write(&enums, "Edge1:\n  values:\n    - { name: Rising, value: 1 }\n").unwrap();

    match load_catalog_with_enums(&sample_catalog_path(), Some(&enums)) {
        Err(LoadError::Schema(err)) => {
            assert_eq!(err.field, "enums.Edge1");
            assert_eq!(err.category(), "SchemaError");
        }
        other => panic!("expected a schema error, got {:?}", other),
    }
}

#[test]
fn enum_tags_need_an_enum_table() {
    let mut catalog = load_catalog(&sample_catalog_path()).unwrap();
    catalog.enums.clear();
    let text = describe(&catalog).unwrap();

    match parse_catalog(&text, SourceFormat::Yaml, Path::new("no-enums.yaml")) {
        Err(LoadError::Schema(err)) => {
            assert!(err.field.ends_with(".enum"), "{}", err.field);
            assert!(err.reason.contains("not defined in the enum table"), "{}", err.reason);
        }
        other => panic!("expected a schema error, got {:?}", other),
    }

    let inline = r#"
catalog: { package: p, version: "1" }
enums: {}
functions:
  CfgDigEdgeStartTrig:
    calling_convention: StdCall
    returns: int32
    parameters:
      - { name: triggerEdge, direction: in, type: int32, enum: Edge1 }
"#;
    match parse_catalog(inline, SourceFormat::Yaml, Path::new("inline.yaml")) {
        Err(LoadError::Schema(err)) => {
            assert_eq!(err.function, "CfgDigEdgeStartTrig");
            assert_eq!(err.field, "parameters.triggerEdge.enum");
        }
        other => panic!("expected a schema error, got {:?}", other),
    }
}

#[test]
fn missing_catalog_is_an_io_error() {
    let err = load_catalog(&workspace_root().join("catalog").join("absent.yaml")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }), "{}", err);
}

#[test]
fn workspace_config_rebases_paths() {
    let config = GeneratorConfig::load(&workspace_root().join("daqmx.yaml")).unwrap();
    let catalog = config.catalog.clone().unwrap();
    assert!(catalog.ends_with("catalog/nidaqmx.catalog.yaml"));
    assert!(catalog.exists());
    assert_eq!(config.targets_or_all(), Target::all());
    assert_eq!(config.coercion.len(), 3);
}

#[test]
fn coercion_keys_must_be_integral() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daqmx.yaml");
    fs::write(&path, "coercion:\n  float64: { narrowing: saturate, widening: sign-extend }\n").unwrap();

    match GeneratorConfig::load(&path) {
        Err(LoadError::Schema(err)) => assert_eq!(err.field, "coercion.float64"),
        other => panic!("expected a schema error, got {:?}", other),
    }
}
