/* Rust code generation modules */

pub mod ffi;
pub mod functions;
pub mod helpers;
pub mod runtime;
pub mod types;

pub use ffi::emit_ffi;
pub use functions::{emit_function, ERROR_INFO_FN, HANDLE_CLASS};
pub use runtime::RUNTIME_SOURCE;
pub use types::emit_types;

use crate::placement::Placement;
use crate::shards::{AttributeAccess, ShardGroup};
use crate::solver::SizePlan;
use crate::surface::{SlotSource, SurfaceCatalog, SurfaceClass, SurfaceFunction};
use crate::stream::StreamBinding;
use daqmx_types::{ScalarType, TypeToken};
use helpers::{doc_comment, enum_type_name, literal_expr};
use std::collections::BTreeSet;

/* Safe wrappers: owned-handle classes, module functions, attribute accessors
 * and callback trampolines */
pub fn emit_bindings(surface: &SurfaceCatalog) -> String {
  let mut output = String::new();
  output.push_str("#![allow(unused_imports, unused_mut, clippy::too_many_arguments)]\n\n");
  output.push_str("use super::ffi;\n");
  output.push_str("use super::runtime::*;\n");
  output.push_str("use super::types::*;\n");
  output.push_str("use std::os::raw::{c_char, c_void};\n\n");

  let mut class_names: BTreeSet<&str> = surface.classes.keys().map(String::as_str).collect();
  class_names.insert(HANDLE_CLASS);
  for name in class_names {
    let class = surface.classes.get(name);
    output.push_str(&emit_class(surface, name, class));
    output.push('\n');
  }

  for function in surface.module_functions() {
    output.push_str(&emit_function(surface, function, ""));
    output.push('\n');
  }
  for group in surface.shards.values().filter(|g| g.class.is_none()) {
    output.push_str(&emit_shard_accessor(surface, group, ""));
    output.push('\n');
  }

  output.push_str(&emit_error_info(surface));

  for function in surface.functions.values() {
    if let Some(stream) = &function.stream {
      output.push('\n');
      output.push_str(&emit_trampoline(function, stream));
    }
  }

  output
}

fn emit_class(surface: &SurfaceCatalog, name: &str, class: Option<&SurfaceClass>) -> String {
  let mut output = String::new();
  output.push_str(&format!("/// Owned `{}` handle. Not `Clone`: the handle is released exactly once.\n", name));
  output.push_str("#[derive(Debug)]\n");
  output.push_str(&format!("pub struct {} {{\n", name));
  output.push_str("  handle: TaskHandle,\n");
  output.push_str("}\n\n");

  output.push_str(&format!("impl {} {{\n", name));
  output.push_str("  pub fn as_raw(&self) -> TaskHandle {\n");
  output.push_str("    self.handle\n");
  output.push_str("  }\n");

  if let Some(class) = class {
    let members = class.factories.iter().chain(&class.statics).chain(&class.methods);
    for function in members.filter_map(|f| surface.function(f)) {
      output.push('\n');
      output.push_str(&emit_function(surface, function, "  "));
    }
    for group in surface.shards.values().filter(|g| g.class.as_deref() == Some(name)) {
      output.push('\n');
      output.push_str(&emit_shard_accessor(surface, group, "  "));
    }
  }
  output.push_str("}\n");

  let releaser = class.and_then(|c| c.releaser.as_deref()).and_then(|r| surface.function(r));
  if let Some(args) = releaser.and_then(drop_arguments) {
    let releaser = releaser.map(|r| r.native_symbol.as_str()).unwrap_or_default();
    output.push_str(&format!("\nimpl Drop for {} {{\n", name));
    output.push_str("  fn drop(&mut self) {\n");
    output.push_str("    if !self.handle.is_null() {\n");
    output.push_str(&format!("      unsafe {{ ffi::{}({}) }};\n", releaser, args.join(", ")));
    output.push_str("    }\n");
    output.push_str("  }\n");
    output.push_str("}\n");
  }
  output
}

/* Drop can only replay a releaser whose slots need nothing from the caller */
fn drop_arguments(releaser: &SurfaceFunction) -> Option<Vec<String>> {
  releaser
    .slots
    .iter()
    .map(|slot| match &slot.source {
      SlotSource::Receiver => Some("self.handle".to_string()),
      SlotSource::Hardcoded { value } if value.is_null() => Some("std::ptr::null_mut()".to_string()),
      SlotSource::Hardcoded { value } => Some(literal_expr(value, &slot.ty)),
      _ => None,
    })
    .collect()
}

/* One accessor over the whole group, dispatching on the attribute kind */
fn emit_shard_accessor(surface: &SurfaceCatalog, group: &ShardGroup, indent: &str) -> String {
  let members: Vec<(&'static str, &SurfaceFunction)> = group
    .members
    .iter()
    .filter_map(|m| surface.function(&m.function).map(|f| (m.kind.variant_name(), f)))
    .collect();
  let Some((_, first)) = members.first() else {
    return String::new();
  };

  let receiver = matches!(first.placement, Placement::Instance { .. });
  let callee = |function: &SurfaceFunction| {
    if receiver {
      format!("self.{}", function.method_name)
    } else {
      function.method_name.clone()
    }
  };
  let record = first.compound.as_ref().map(|c| c.record.as_str());
  let shared: Vec<_> = first.inputs.iter().filter(|i| i.name != group.value_param).collect();

  let mut params: Vec<String> = if receiver { vec!["&self".to_string()] } else { Vec::new() };
  params.extend(shared.iter().map(|i| format!("{}: {}", i.ident, helpers::param_type(i, record))));

  let mut output = String::new();
  output.push_str(&doc_comment(&format!("Typed `{}` accessor dispatching on the attribute kind.", group.name), indent));
  match group.access {
    AttributeAccess::Get => {
      params.push("kind: AttributeKind".to_string());
      output.push_str(&format!(
        "{}pub fn {}({}) -> Result<Outcome<AttributeValue>, DaqmxError> {{\n",
        indent,
        group.method_name,
        params.join(", ")
      ));
      output.push_str(&format!("{}  match kind {{\n", indent));
      for (variant, function) in &members {
        let args: Vec<&str> = function.inputs.iter().map(|i| i.ident.as_str()).collect();
        output.push_str(&format!(
          "{}    AttributeKind::{} => {}({}).map(|o| o.map(|v| AttributeValue::{}(v.into()))),\n",
          indent,
          variant,
          callee(function),
          args.join(", "),
          variant
        ));
      }
      if members.len() < ATTRIBUTE_KINDS {
        output.push_str(&format!("{}    other => Err(unsupported_kind({:?}, other)),\n", indent, group.name));
      }
    }
    AttributeAccess::Set => {
      params.push("value: AttributeValue".to_string());
      output.push_str(&format!(
        "{}pub fn {}({}) -> Result<Outcome<()>, DaqmxError> {{\n",
        indent,
        group.method_name,
        params.join(", ")
      ));
      output.push_str(&format!("{}  match value {{\n", indent));
      for (variant, function) in &members {
        let args: Vec<String> = function
          .inputs
          .iter()
          .map(|input| {
            if input.name != group.value_param {
              return input.ident.clone();
            }
            match &input.ty {
              TypeToken::Scalar(ScalarType::Int16) | TypeToken::Scalar(ScalarType::UInt16) | TypeToken::Scalar(ScalarType::UInt8) => {
                format!(
                  "{}::try_from(payload).map_err(|_| DaqmxError::InvalidArgument {{ function: {:?}, reason: \"attribute value out of range\".to_string() }})?",
                  input.ty.element().map(|e| e.rust_type()).unwrap_or("i32"),
                  function.name
                )
              }
              TypeToken::Scalar(_) => "payload".to_string(),
              _ => "&payload".to_string(),
            }
          })
          .collect();
        output.push_str(&format!(
          "{}    AttributeValue::{}(payload) => {}({}),\n",
          indent,
          variant,
          callee(function),
          args.join(", ")
        ));
      }
      if members.len() < ATTRIBUTE_KINDS {
        output.push_str(&format!("{}    other => Err(unsupported_kind({:?}, other.kind())),\n", indent, group.name));
      }
    }
  }
  output.push_str(&format!("{}  }}\n", indent));
  output.push_str(&format!("{}}}\n", indent));
  output
}

/* Variants of the emitted `AttributeKind` */
const ATTRIBUTE_KINDS: usize = 11;

/* Error text for failed statuses, fetched with the same two-call protocol as
 * any other discovered-size buffer */
fn emit_error_info(surface: &SurfaceCatalog) -> String {
  let mut output = String::new();
  output.push_str(&format!("fn {}() -> String {{\n", ERROR_INFO_FN));

  let function = surface.error_info.as_deref().and_then(|name| surface.function(name));
  let plan = function.and_then(|f| {
    let (buffer, size) = f.size_plans.iter().find_map(|(buffer, plan)| match plan {
      SizePlan::TwoCall { size_param } => Some((buffer.as_str(), size_param.as_str())),
      _ => None,
    })?;
    let size_type = match f.slot(size).map(|s| &s.ty) {
      Some(TypeToken::Scalar(scalar)) => scalar.rust_type(),
      _ => "u32",
    };
    let mut preflight = Vec::new();
    let mut retrieve = Vec::new();
    for slot in &f.slots {
      let (first, second) = match &slot.source {
        _ if slot.name == buffer => ("std::ptr::null_mut()".to_string(), "buffer.as_mut_ptr()".to_string()),
        _ if slot.name == size => ("0".to_string(), format!("size as {}", size_type)),
        SlotSource::Hardcoded { value } if value.is_null() => ("std::ptr::null_mut()".to_string(), "std::ptr::null_mut()".to_string()),
        SlotSource::Hardcoded { value } => (literal_expr(value, &slot.ty), literal_expr(value, &slot.ty)),
        _ => return None,
      };
      preflight.push(first);
      retrieve.push(second);
    }
    Some((f.native_symbol.clone(), preflight, retrieve))
  });

  match plan {
    Some((symbol, preflight, retrieve)) => {
      output.push_str(&format!("  let size = unsafe {{ ffi::{}({}) }};\n", symbol, preflight.join(", ")));
      output.push_str("  if size <= 0 {\n");
      output.push_str("    return String::new();\n");
      output.push_str("  }\n");
      output.push_str("  let mut buffer: Vec<c_char> = vec![0; size as usize];\n");
      output.push_str(&format!("  unsafe {{ ffi::{}({}) }};\n", symbol, retrieve.join(", ")));
      output.push_str("  from_c_buffer(&buffer)\n");
    }
    None => output.push_str("  String::new()\n"),
  }
  output.push_str("}\n");
  output
}

fn emit_trampoline(function: &SurfaceFunction, stream: &StreamBinding) -> String {
  let mut output = String::new();
  let params: Vec<String> = stream
    .arguments
    .iter()
    .map(|argument| {
      let ty = match &argument.ty {
        TypeToken::Scalar(ScalarType::Void) => "*mut c_void".to_string(),
        TypeToken::Scalar(scalar) => scalar.rust_type().to_string(),
        TypeToken::Buffer { element, .. } => format!("*const {}", element.rust_type()),
        _ => "*mut c_void".to_string(),
      };
      format!("{}: {}", argument.ident, ty)
    })
    .collect();
  let token = stream.arguments.get(stream.token_index).map(|a| a.ident.as_str()).unwrap_or("callback_data");

  output.push_str(&format!(
    "unsafe extern \"C\" fn {}_trampoline({}) -> i32 {{\n",
    function.method_name,
    params.join(", ")
  ));
  output.push_str(&format!("  let sink = sink_from::<{}>({});\n", stream.record, token));
  for field in &stream.fields {
    let ident = &field.ident;
    match (&field.enum_name, &field.ty) {
      (Some(enum_name), TypeToken::Scalar(_)) => {
        output.push_str(&format!(
          "  let {} = match enum_value::<{}>({:?}, {:?}, {} as i64) {{\n",
          ident,
          enum_type_name(enum_name),
          function.name,
          enum_name,
          ident
        ));
        output.push_str("    Ok(value) => value,\n");
        output.push_str("    Err(err) => return sink.fail(err),\n");
        output.push_str("  };\n");
      }
      (_, TypeToken::Scalar(ScalarType::Bool32)) => output.push_str(&format!("  let {} = {} != 0;\n", ident, ident)),
      (_, ty) if ty.is_string() => output.push_str(&format!("  let {} = from_c_str({});\n", ident, ident)),
      _ => {}
    }
  }
  let fields: Vec<&str> = stream.fields.iter().map(|f| f.ident.as_str()).collect();
  output.push_str(&format!("  sink.deliver({} {{ {} }})\n", stream.record, fields.join(", ")));
  output.push_str("}\n");
  output
}
