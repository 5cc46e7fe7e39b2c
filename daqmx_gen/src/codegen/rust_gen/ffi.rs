/* Extern declarations for every native symbol the surface reaches.
 *
 * StdCall entries go into an `extern "system"` block and Cdecl entries into
 * `extern "C"`. Shards share one declaration per native symbol whose value slot
 * is untyped; repeating runs end the fixed part of a variadic declaration. */

use super::helpers::ffi_param_type;
use crate::naming::escape_rust_keyword;
use crate::shards::{AttributeAccess, ShardGroup};
use crate::surface::{NativeSlot, SlotSource, SurfaceCatalog, SurfaceFunction};
use daqmx_types::{CallingConvention, ScalarType, TypeToken};
use std::collections::{BTreeMap, BTreeSet};

pub const LIBRARY_WINDOWS: &str = "nicaiu";
pub const LIBRARY_UNIX: &str = "nidaqmx";

pub fn emit_ffi(surface: &SurfaceCatalog) -> String {
  let mut output = String::new();
  output.push_str("#![allow(non_snake_case, unused_imports)]\n\n");
  output.push_str("use super::runtime::{CVIAbsoluteTime, TaskHandle};\n");
  output.push_str("use std::os::raw::{c_char, c_void};\n\n");

  let callbacks = callback_types(surface);
  for (name, declaration) in &callbacks {
    output.push_str(&format!("pub type {} = {};\n", name, declaration));
  }
  if !callbacks.is_empty() {
    output.push('\n');
  }

  let mut blocks: BTreeMap<CallingConvention, BTreeMap<String, String>> = BTreeMap::new();
  for function in surface.functions.values() {
    if function.shard.is_some() {
      continue;
    }
    blocks
      .entry(function.calling_convention)
      .or_default()
      .insert(function.native_symbol.clone(), declare_function(function));
  }
  for group in surface.shards.values() {
    let Some(first) = group.members.first().and_then(|m| surface.functions.get(&m.function)) else {
      continue;
    };
    blocks
      .entry(group.calling_convention)
      .or_default()
      .insert(group.native_symbol.clone(), declare_shard(group, first));
  }

  for (convention, declarations) in &blocks {
    let abi = match convention {
      CallingConvention::StdCall => "system",
      CallingConvention::Cdecl => "C",
    };
    output.push_str(&format!("#[cfg_attr(windows, link(name = \"{}\"))]\n", LIBRARY_WINDOWS));
    output.push_str(&format!("#[cfg_attr(not(windows), link(name = \"{}\"))]\n", LIBRARY_UNIX));
    output.push_str(&format!("extern \"{}\" {{\n", abi));
    for declaration in declarations.values() {
      output.push_str(&format!("  {}\n", declaration));
    }
    output.push_str("}\n\n");
  }

  output.trim_end().to_string() + "\n"
}

fn parameter(slot: &NativeSlot) -> String {
  format!("{}: {}", escape_rust_keyword(&slot.native_name), ffi_param_type(slot))
}

fn return_type(ty: &TypeToken) -> &'static str {
  match ty {
    TypeToken::Scalar(scalar) => scalar.rust_type(),
    _ => "i32",
  }
}

fn declare_function(function: &SurfaceFunction) -> String {
  let mut params = Vec::new();
  let mut seen = BTreeSet::new();
  let mut variadic = false;
  for slot in &function.slots {
    if let SlotSource::Repeating { field } = &slot.source {
      if !seen.insert(field.clone()) {
        variadic = true;
        continue;
      }
    }
    if variadic {
      continue;
    }
    params.push(parameter(slot));
  }
  if function.compound.is_some() {
    params.push("...".to_string());
  }
  format!("pub fn {}({}) -> {};", function.native_symbol, params.join(", "), return_type(&function.returns))
}

/* Getters keep the value slot as `*mut c_void`; setters pass it through `...`
 * (or by pointer when the convention cannot carry variadics). */
fn declare_shard(group: &ShardGroup, first: &SurfaceFunction) -> String {
  let mut params = Vec::new();
  let mut rest_variadic = false;
  for slot in &first.slots {
    if rest_variadic {
      continue;
    }
    if slot.name != group.value_param {
      params.push(parameter(slot));
      continue;
    }
    match (group.access, group.calling_convention) {
      (AttributeAccess::Get, CallingConvention::Cdecl) => {
        params.push(format!("{}: *mut c_void", escape_rust_keyword(&slot.native_name)));
        params.push("...".to_string());
        rest_variadic = true;
      }
      (AttributeAccess::Get, CallingConvention::StdCall) => {
        params.push(format!("{}: *mut c_void", escape_rust_keyword(&slot.native_name)));
      }
      (AttributeAccess::Set, CallingConvention::Cdecl) => {
        params.push("...".to_string());
        rest_variadic = true;
      }
      (AttributeAccess::Set, CallingConvention::StdCall) => {
        params.push(format!("{}: *const c_void", escape_rust_keyword(&slot.native_name)));
      }
    }
  }
  format!("pub fn {}({}) -> {};", group.native_symbol, params.join(", "), return_type(&first.returns))
}

/* Callback pointer typedefs, keyed by their catalog token */
fn callback_types(surface: &SurfaceCatalog) -> BTreeMap<String, String> {
  let mut callbacks = BTreeMap::new();
  for stream in surface.functions.values().filter_map(|f| f.stream.as_ref()) {
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
        format!("{}: {}", escape_rust_keyword(&argument.name), ty)
      })
      .collect();
    callbacks.insert(
      stream.callback_type.clone(),
      format!("Option<unsafe extern \"C\" fn({}) -> i32>", params.join(", ")),
    );
  }
  callbacks
}
