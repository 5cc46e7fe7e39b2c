use crate::error::{LoadError, LoadResult, SchemaError, CATALOG_SCOPE};
use crate::validate::validate_catalog;
use daqmx_types::{Catalog, CatalogMetadata, EnumTable, FunctionEntry};
use serde_yml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/* ============================================================================
   Source formats
   ============================================================================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Json,
}

impl SourceFormat {
    /* JSON only when the extension says so; everything else is read as YAML */
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SourceFormat::Json,
            _ => SourceFormat::Yaml,
        }
    }
}

const TOP_LEVEL_KEYS: &[&str] = &["catalog", "enums", "functions"];
const REQUIRED_ENTRY_FIELDS: &[&str] = &["calling_convention", "returns", "parameters"];
const REQUIRED_PARAM_FIELDS: &[&str] = &["name", "direction", "type"];

fn read_source(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })
}

/* Parse either format into a YAML value tree so both share the same checks */
fn parse_document(text: &str, format: SourceFormat, origin: &Path) -> LoadResult<Value> {
    let parse_err = |message: String| LoadError::Parse { path: origin.to_path_buf(), message };
    match format {
        SourceFormat::Yaml => serde_yml::from_str(text).map_err(|e| parse_err(e.to_string())),
        SourceFormat::Json => {
            let json: serde_json::Value = serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?;
            serde_yml::to_value(json).map_err(|e| parse_err(e.to_string()))
        }
    }
}

/* ============================================================================
   Catalog loading
   ============================================================================ */

/// Load and validate a catalog file.
pub fn load_catalog(path: &Path) -> LoadResult<Catalog> {
    load_catalog_with_enums(path, None)
}

/// Load a catalog file, merge an optional external enum table and validate the result.
pub fn load_catalog_with_enums(path: &Path, enums: Option<&Path>) -> LoadResult<Catalog> {
    info!("loading catalog {}", path.display());
    let text = read_source(path)?;
    let mut catalog = parse_catalog_unchecked(&text, SourceFormat::from_path(path), path)?;

    if let Some(enum_path) = enums {
        let table = load_enum_table(enum_path)?;
        merge_enum_table(&mut catalog, table)?;
    }

    validate_catalog(&catalog)?;
    info!(
        "catalog {} {}: {} functions, {} enums",
        catalog.catalog.package,
        catalog.catalog.version,
        catalog.functions.len(),
        catalog.enums.len()
    );
    Ok(catalog)
}

/// Parse and validate catalog text. `origin` only labels errors.
pub fn parse_catalog(text: &str, format: SourceFormat, origin: &Path) -> LoadResult<Catalog> {
    let catalog = parse_catalog_unchecked(text, format, origin)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn parse_catalog_unchecked(text: &str, format: SourceFormat, origin: &Path) -> LoadResult<Catalog> {
    let document = parse_document(text, format, origin)?;
    let root = document
        .as_mapping()
        .ok_or_else(|| SchemaError::new(CATALOG_SCOPE, "", "top level must be a mapping"))?;

    for key in root.keys() {
        let key = key.as_str().unwrap_or_default();
        if !TOP_LEVEL_KEYS.contains(&key) {
            return Err(SchemaError::new(CATALOG_SCOPE, key, "unknown top-level key").into());
        }
    }

    let metadata_value = root
        .get("catalog")
        .ok_or_else(|| SchemaError::new(CATALOG_SCOPE, "catalog", "required section is missing"))?;
    let metadata: CatalogMetadata = serde_yml::from_value(metadata_value.clone())
        .map_err(|e| SchemaError::new(CATALOG_SCOPE, "catalog", e.to_string()))?;

    let enums: EnumTable = match root.get("enums") {
        Some(value) if !value.is_null() => serde_yml::from_value(value.clone())
            .map_err(|e| SchemaError::new(CATALOG_SCOPE, "enums", e.to_string()))?,
        _ => EnumTable::new(),
    };

    let functions_value = root
        .get("functions")
        .ok_or_else(|| SchemaError::new(CATALOG_SCOPE, "functions", "required section is missing"))?;
    let function_map = functions_value
        .as_mapping()
        .ok_or_else(|| SchemaError::new(CATALOG_SCOPE, "functions", "must be a mapping of name to entry"))?;

    let mut functions = BTreeMap::new();
    for (key, value) in function_map.iter() {
        let name = key
            .as_str()
            .ok_or_else(|| SchemaError::new(CATALOG_SCOPE, "functions", "function keys must be strings"))?;
        let entry = parse_function_entry(name, value)?;
        debug!("parsed {} ({} parameters)", name, entry.parameters.len());
        if functions.insert(name.to_string(), entry).is_some() {
            return Err(SchemaError::new(name, "", "duplicate function key").into());
        }
    }

    Ok(Catalog { catalog: metadata, enums, functions })
}

/* Presence checks first so that a missing field is reported by name rather than
 * as a generic deserialization message. */
fn parse_function_entry(name: &str, value: &Value) -> Result<FunctionEntry, SchemaError> {
    let mapping = value
        .as_mapping()
        .ok_or_else(|| SchemaError::new(name, "", "function entry must be a mapping"))?;

    for field in REQUIRED_ENTRY_FIELDS {
        if !mapping.contains_key(*field) {
            return Err(SchemaError::new(name, *field, "required field is missing"));
        }
    }

    let parameters = mapping
        .get("parameters")
        .and_then(|v| v.as_sequence())
        .ok_or_else(|| SchemaError::new(name, "parameters", "must be a list"))?;
    for (idx, param) in parameters.iter().enumerate() {
        let param_map = param
            .as_mapping()
            .ok_or_else(|| SchemaError::new(name, format!("parameters[{}]", idx), "must be a mapping"))?;
        for field in REQUIRED_PARAM_FIELDS {
            if !param_map.contains_key(*field) {
                return Err(SchemaError::new(
                    name,
                    format!("parameters[{}].{}", idx, field),
                    "required field is missing",
                ));
            }
        }
    }

    serde_yml::from_value(value.clone()).map_err(|e| SchemaError::new(name, "", e.to_string()))
}

/* ============================================================================
   Enum tables
   ============================================================================ */

/// Load a standalone enum table. The file may either be the bare table or a
/// document with a top-level `enums:` key.
pub fn load_enum_table(path: &Path) -> LoadResult<EnumTable> {
    let text = read_source(path)?;
    let document = parse_document(&text, SourceFormat::from_path(path), path)?;
    let table_value = match document.get("enums") {
        Some(inner) => inner.clone(),
        None => document,
    };
    let table: EnumTable = serde_yml::from_value(table_value)
        .map_err(|e| SchemaError::new(CATALOG_SCOPE, "enums", e.to_string()))?;
    debug!("loaded {} enums from {}", table.len(), path.display());
    Ok(table)
}

/* An enum may be declared in both places only if the definitions agree */
pub fn merge_enum_table(catalog: &mut Catalog, table: EnumTable) -> Result<(), SchemaError> {
    for (name, def) in table {
        match catalog.enums.get(&name) {
            Some(existing) if *existing != def => {
                return Err(SchemaError::new(
                    CATALOG_SCOPE,
                    format!("enums.{}", name),
                    "conflicting definitions in catalog and enum table",
                ));
            }
            Some(_) => {}
            None => {
                catalog.enums.insert(name, def);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn origin() -> PathBuf {
        PathBuf::from("inline.yaml")
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a/catalog.json")), SourceFormat::Json);
        assert_eq!(SourceFormat::from_path(Path::new("a/catalog.yaml")), SourceFormat::Yaml);
        assert_eq!(SourceFormat::from_path(Path::new("catalog")), SourceFormat::Yaml);
    }

    #[test]
    fn missing_required_field_names_function_and_field() {
        let text = r#"
catalog: { package: nidaqmx, version: "1" }
functions:
  StartTask:
    calling_convention: StdCall
    parameters: []
"#;
        match parse_catalog(text, SourceFormat::Yaml, &origin()) {
            Err(LoadError::Schema(err)) => {
                assert_eq!(err.function, "StartTask");
                assert_eq!(err.field, "returns");
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn missing_parameter_type_is_located() {
        let text = r#"
catalog: { package: nidaqmx, version: "1" }
functions:
  StartTask:
    calling_convention: StdCall
    returns: int32
    parameters:
      - { name: task, direction: in }
"#;
        match parse_catalog(text, SourceFormat::Yaml, &origin()) {
            Err(LoadError::Schema(err)) => assert_eq!(err.field, "parameters[0].type"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_top_level_key_is_fatal() {
        let text = "catalog: { package: p, version: \"1\" }\nfunctions: {}\nextras: 1\n";
        assert!(matches!(
            parse_catalog(text, SourceFormat::Yaml, &origin()),
            Err(LoadError::Schema(SchemaError { field, .. })) if field == "extras"
        ));
    }

    #[test]
    fn json_sources_share_the_yaml_path() {
        let text = r#"{
  "catalog": { "package": "nidaqmx", "version": "1" },
  "functions": {
    "StartTask": {
      "calling_convention": "StdCall",
      "returns": "int32",
      "parameters": [ { "name": "task", "direction": "in", "type": "TaskHandle" } ]
    }
  }
}"#;
        let catalog = parse_catalog(text, SourceFormat::Json, Path::new("inline.json")).unwrap();
        assert_eq!(catalog.functions["StartTask"].parameters[0].name, "task");
    }

    #[test]
    fn conflicting_enum_definitions_are_rejected() {
        let text = r#"
catalog: { package: p, version: "1" }
enums:
  Edge: { values: [ { name: Rising, value: 10280 } ] }
functions: {}
"#;
        let mut catalog = parse_catalog(text, SourceFormat::Yaml, &origin()).unwrap();
        let table: EnumTable = serde_yml::from_str("Edge: { values: [ { name: Rising, value: 1 } ] }").unwrap();
        assert!(merge_enum_table(&mut catalog, table).is_err());
    }
}
