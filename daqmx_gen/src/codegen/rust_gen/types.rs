/* Enums, record structs and adaptor types of the emitted surface */

use super::helpers::enum_type_name;
use crate::naming::escape_rust_keyword;
use crate::solver::COALESCE;
use crate::surface::{RecordField, SurfaceCatalog, SurfaceFunction};
use daqmx_types::{AdaptorExpr, EnumDef, ScalarType, TypeToken};
use std::collections::BTreeMap;

pub fn emit_types(surface: &SurfaceCatalog) -> String {
  let mut output = String::new();
  output.push_str("#![allow(non_camel_case_types, unused_imports)]\n\n");
  output.push_str("use super::runtime::{CVIAbsoluteTime, TaskHandle};\n\n");

  for (name, def) in &surface.enums {
    output.push_str(&emit_enum(name, def));
    output.push('\n');
  }

  let mut records: BTreeMap<String, &[RecordField]> = BTreeMap::new();
  for function in surface.functions.values() {
    if let Some(compound) = &function.compound {
      records.insert(compound.record.clone(), &compound.fields);
    }
    if let Some(stream) = &function.stream {
      records.insert(stream.record.clone(), &stream.fields);
    }
  }
  for (name, fields) in &records {
    output.push_str(&emit_record(name, fields));
    output.push('\n');
  }

  for (name, fields) in adaptor_types(surface) {
    output.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    output.push_str(&format!("pub struct {}({});\n\n", name, fields.iter().map(|f| format!("pub {}", f)).collect::<Vec<_>>().join(", ")));
  }

  output.trim_end().to_string() + "\n"
}

/* Discriminants must be unique in Rust; later aliases of a value become consts */
pub fn emit_enum(name: &str, def: &EnumDef) -> String {
  let type_name = enum_type_name(name);
  let repr = if def.values.iter().all(|v| i32::try_from(v.value).is_ok()) { "i32" } else { "i64" };

  let mut seen: BTreeMap<i64, &str> = BTreeMap::new();
  let mut aliases = Vec::new();
  let mut variants = Vec::new();
  for value in &def.values {
    match seen.get(&value.value) {
      Some(first) => aliases.push((value.name.as_str(), *first)),
      None => {
        seen.insert(value.value, value.name.as_str());
        variants.push(value);
      }
    }
  }

  let mut output = String::new();
  output.push_str(&format!("#[repr({})]\n", repr));
  output.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
  output.push_str(&format!("pub enum {} {{\n", type_name));
  for variant in &variants {
    output.push_str(&format!("  {} = {},\n", escape_rust_keyword(&variant.name), variant.value));
  }
  output.push_str("}\n");

  if !aliases.is_empty() {
    output.push_str(&format!("\n#[allow(non_upper_case_globals)]\nimpl {} {{\n", type_name));
    for (alias, first) in &aliases {
      output.push_str(&format!(
        "  pub const {}: Self = {}::{};\n",
        escape_rust_keyword(alias),
        type_name,
        escape_rust_keyword(first)
      ));
    }
    output.push_str("}\n");
  }

  output.push_str(&format!("\nimpl TryFrom<i64> for {} {{\n", type_name));
  output.push_str("  type Error = i64;\n\n");
  output.push_str("  fn try_from(value: i64) -> Result<Self, Self::Error> {\n");
  output.push_str("    match value {\n");
  for variant in &variants {
    output.push_str(&format!("      {} => Ok({}::{}),\n", variant.value, type_name, escape_rust_keyword(&variant.name)));
  }
  output.push_str("      other => Err(other),\n");
  output.push_str("    }\n");
  output.push_str("  }\n");
  output.push_str("}\n");
  output
}

pub fn record_field_type(field: &RecordField) -> String {
  if let (Some(enum_name), TypeToken::Scalar(_)) = (&field.enum_name, &field.ty) {
    return enum_type_name(enum_name);
  }
  match &field.ty {
    TypeToken::Scalar(ScalarType::Bool32) => "bool".to_string(),
    TypeToken::Scalar(scalar) => scalar.rust_type().to_string(),
    TypeToken::Buffer { element: ScalarType::Char, .. } => "String".to_string(),
    TypeToken::Buffer { element, .. } => format!("Vec<{}>", element.rust_type()),
    TypeToken::FixedArray { element, len, .. } => format!("[{}; {}]", element.rust_type(), len),
    _ => "usize".to_string(),
  }
}

fn emit_record(name: &str, fields: &[RecordField]) -> String {
  let mut output = String::new();
  output.push_str("#[derive(Debug, Clone, PartialEq)]\n");
  output.push_str(&format!("pub struct {} {{\n", name));
  for field in fields {
    output.push_str(&format!("  pub {}: {},\n", field.ident, record_field_type(field)));
  }
  output.push_str("}\n");
  output
}

/* Tuple structs for every adaptor constructor; fields follow the call arguments */
pub fn adaptor_types(surface: &SurfaceCatalog) -> BTreeMap<String, Vec<String>> {
  let mut types = BTreeMap::new();
  for function in surface.functions.values() {
    if let Some(adaptor) = &function.adaptor {
      collect_adaptor(function, &adaptor.expression, &mut types);
    }
  }
  types
}

fn collect_adaptor(function: &SurfaceFunction, expr: &AdaptorExpr, types: &mut BTreeMap<String, Vec<String>>) {
  if let AdaptorExpr::Call { callee, args } = expr {
    for arg in args {
      collect_adaptor(function, arg, types);
    }
    if callee != COALESCE {
      let fields = args.iter().map(|a| adaptor_arg_type(function, a)).collect();
      types.entry(callee.clone()).or_insert(fields);
    }
  }
}

fn adaptor_arg_type(function: &SurfaceFunction, expr: &AdaptorExpr) -> String {
  match expr {
    AdaptorExpr::Param(name) => {
      if function.receiver_slot().map(|s| &s.name) == Some(name) {
        return "TaskHandle".to_string();
      }
      match function.input(name).map(|i| &i.ty) {
        Some(ty) if ty.is_string() => "String".to_string(),
        Some(TypeToken::Scalar(ScalarType::Bool32)) => "bool".to_string(),
        Some(TypeToken::Scalar(scalar)) => scalar.rust_type().to_string(),
        _ => "String".to_string(),
      }
    }
    AdaptorExpr::Str(_) => "String".to_string(),
    AdaptorExpr::Call { callee, .. } if callee == COALESCE => "String".to_string(),
    AdaptorExpr::Call { callee, .. } => callee.clone(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use daqmx_types::EnumValue;

  #[test]
  fn duplicate_values_become_aliases() {
    let def = EnumDef {
      values: vec![
        EnumValue { name: "Rising".into(), value: 10280 },
        EnumValue { name: "Falling".into(), value: 10171 },
        EnumValue { name: "Positive".into(), value: 10280 },
      ],
    };
    let code = emit_enum("Edge1", &def);
    assert!(code.contains("#[repr(i32)]"));
    assert!(code.contains("  Rising = 10280,\n  Falling = 10171,\n}"));
    assert!(code.contains("pub const Positive: Self = Edge1::Rising;"));
    assert!(code.contains("10171 => Ok(Edge1::Falling),"));
  }
}
