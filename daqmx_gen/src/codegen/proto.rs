/* IPC projection as a proto3 service definition.
 *
 * One rpc per function in name order; stream-response functions return a stream.
 * Only enums referenced by some field are emitted, under their IPC name. */

use crate::codegen::rust::emit_error;
use crate::error::GenResult;
use crate::ipc::IpcField;
use crate::naming::{snake_case, upper_camel};
use crate::surface::{RecordField, SurfaceCatalog};
use daqmx_types::{EnumDef, ScalarType, TypeToken};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROTO_FILE: &str = "ipc.proto";
const SESSION_IMPORT: &str = "session.proto";
const TIMESTAMP_IMPORT: &str = "google/protobuf/timestamp.proto";

pub struct ProtoCodeGenerator {
  options: ProtoCodeGeneratorOptions,
}

pub struct ProtoCodeGeneratorOptions {
  pub output_dir: String,
  /* proto package; defaults to `<package>_grpc` */
  pub package: Option<String>,
}

impl Default for ProtoCodeGeneratorOptions {
  fn default() -> Self {
    Self { output_dir: ".".to_string(), package: None }
  }
}

impl ProtoCodeGenerator {
  pub fn new(options: ProtoCodeGeneratorOptions) -> Self {
    Self { options }
  }

  pub fn render(&self, surface: &SurfaceCatalog) -> String {
    let package = self.options.package.clone().unwrap_or_else(|| format!("{}_grpc", snake_case(&surface.package)));

    let mut enums: BTreeMap<String, String> = BTreeMap::new();
    let mut records: BTreeMap<String, &[RecordField]> = BTreeMap::new();
    let mut proto_types: BTreeSet<String> = BTreeSet::new();
    for function in surface.functions.values() {
      for field in function.ipc.request_fields.iter().chain(&function.ipc.response_fields) {
        proto_types.insert(field.proto_type.clone());
        if let Some(source) = &field.enum_source {
          enums.entry(field.proto_type.clone()).or_insert_with(|| source.clone());
        }
      }
      if let Some(compound) = &function.compound {
        records.insert(compound.record.clone(), &compound.fields);
        for field in &compound.fields {
          if let Some(enum_name) = &field.enum_name {
            enums.entry(enum_name.clone()).or_insert_with(|| enum_name.clone());
          }
          if let Some(element) = field.ty.element() {
            proto_types.insert(element.proto_type().to_string());
          }
        }
      }
    }

    let mut output = String::new();
    output.push_str(&format!(
      "// Generated from {} {} (catalog fingerprint {}). Do not edit.\n\n",
      surface.package, surface.catalog_version, surface.fingerprint
    ));
    output.push_str("syntax = \"proto3\";\n\n");
    output.push_str(&format!("package {};\n\n", package));
    let needs_session = proto_types.iter().any(|t| t.starts_with("nidevice_grpc."));
    let needs_timestamp = proto_types.contains(ScalarType::CviAbsoluteTime.proto_type());
    if needs_session {
      output.push_str(&format!("import \"{}\";\n", SESSION_IMPORT));
    }
    if needs_timestamp {
      output.push_str(&format!("import \"{}\";\n", TIMESTAMP_IMPORT));
    }
    if needs_session || needs_timestamp {
      output.push('\n');
    }

    output.push_str(&format!("service {} {{\n", upper_camel(&surface.package)));
    for function in surface.functions.values() {
      let ipc = &function.ipc;
      let stream = if ipc.streaming { "stream " } else { "" };
      output.push_str(&format!("  rpc {}({}) returns ({}{});\n", ipc.rpc, ipc.request, stream, ipc.response));
    }
    output.push_str("}\n");

    for (proto_name, source) in &enums {
      if let Some(def) = surface.enums.get(source) {
        output.push('\n');
        output.push_str(&emit_enum(proto_name, def));
      }
    }

    for (name, fields) in &records {
      output.push('\n');
      output.push_str(&emit_record(name, fields));
    }

    for function in surface.functions.values() {
      let ipc = &function.ipc;
      output.push('\n');
      output.push_str(&emit_message(&ipc.request, &ipc.request_fields));
      output.push('\n');
      output.push_str(&emit_message(&ipc.response, &ipc.response_fields));
    }

    output
  }

  pub fn emit_code(self, surface: &SurfaceCatalog) -> GenResult<PathBuf> {
    let dir = Path::new(&self.options.output_dir).join("proto");
    fs::create_dir_all(&dir).map_err(|err| emit_error(&dir, err))?;
    let path = dir.join(PROTO_FILE);
    fs::write(&path, self.render(surface)).map_err(|err| emit_error(&path, err))?;
    Ok(path)
  }
}

/// `InputTermCfgWithDefault` -> `INPUT_TERM_CFG_WITH_DEFAULT`
pub fn screaming(name: &str) -> String {
  let mut out = String::new();
  for ch in snake_case(name).chars() {
    if ch == '_' && out.ends_with('_') {
      continue;
    }
    out.push(ch.to_ascii_uppercase());
  }
  out
}

/* Values are prefixed with the enum name; proto3 needs a zero first */
pub fn emit_enum(name: &str, def: &EnumDef) -> String {
  let prefix = screaming(name);
  let mut values: Vec<(String, i64)> =
    def.values.iter().map(|v| (format!("{}_{}", prefix, screaming(&v.name)), v.value)).collect();
  values.retain(|(_, value)| i32::try_from(*value).is_ok());
  if let Some(zero) = values.iter().position(|(_, value)| *value == 0) {
    let first = values.remove(zero);
    values.insert(0, first);
  } else {
    values.insert(0, (format!("{}_UNSPECIFIED", prefix), 0));
  }
  let distinct: BTreeSet<i64> = values.iter().map(|(_, value)| *value).collect();

  let mut output = format!("enum {} {{\n", name);
  if distinct.len() != values.len() {
    output.push_str("  option allow_alias = true;\n");
  }
  for (value_name, value) in &values {
    output.push_str(&format!("  {} = {};\n", value_name, value));
  }
  output.push_str("}\n");
  output
}

fn record_field_type(field: &RecordField) -> (String, bool) {
  if let Some(enum_name) = &field.enum_name {
    return (enum_name.clone(), field.ty.is_buffer());
  }
  match &field.ty {
    TypeToken::Scalar(scalar) => (scalar.proto_type().to_string(), false),
    TypeToken::Buffer { element: ScalarType::Char, .. } => ("string".to_string(), false),
    TypeToken::Buffer { element, .. } | TypeToken::FixedArray { element, .. } => {
      (element.proto_type().to_string(), true)
    }
    _ => ("bytes".to_string(), false),
  }
}

fn emit_record(name: &str, fields: &[RecordField]) -> String {
  let mut output = format!("message {} {{\n", name);
  for (index, field) in fields.iter().enumerate() {
    let (ty, repeated) = record_field_type(field);
    let label = if repeated { "repeated " } else { "" };
    output.push_str(&format!("  {}{} {} = {};\n", label, ty, snake_case(&field.name), index + 1));
  }
  output.push_str("}\n");
  output
}

fn emit_message(name: &str, fields: &[IpcField]) -> String {
  let mut output = format!("message {} {{\n", name);
  for (index, field) in fields.iter().enumerate() {
    let label = if field.repeated { "repeated " } else { "" };
    output.push_str(&format!("  {}{} {} = {};\n", label, field.proto_type, field.name, index + 1));
  }
  output.push_str("}\n");
  output
}

#[cfg(test)]
mod tests {
  use super::*;
  use daqmx_types::EnumValue;

  #[test]
  fn enums_without_zero_gain_unspecified() {
    let def = EnumDef {
      values: vec![
        EnumValue { name: "Cfg_Default".into(), value: -1 },
        EnumValue { name: "RSE".into(), value: 10083 },
      ],
    };
    let proto = emit_enum("InputTermCfgWithDefault", &def);
    assert!(proto.starts_with(
      "enum InputTermCfgWithDefault {\n  INPUT_TERM_CFG_WITH_DEFAULT_UNSPECIFIED = 0;\n  INPUT_TERM_CFG_WITH_DEFAULT_CFG_DEFAULT = -1;\n"
    ));
    assert!(proto.contains("INPUT_TERM_CFG_WITH_DEFAULT_RSE = 10083;"));
    assert!(!proto.contains("allow_alias"));
  }

  #[test]
  fn zero_valued_member_moves_first() {
    let def = EnumDef {
      values: vec![
        EnumValue { name: "GroupByScanNumber".into(), value: 1 },
        EnumValue { name: "GroupByChannel".into(), value: 0 },
      ],
    };
    let proto = emit_enum("GroupBy", &def);
    assert!(proto.contains("{\n  GROUP_BY_GROUP_BY_CHANNEL = 0;\n  GROUP_BY_GROUP_BY_SCAN_NUMBER = 1;\n}"));
  }
}
