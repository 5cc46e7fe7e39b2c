/* Wrapper emission: one safe Rust function per surface function.
 *
 * A wrapper walks the native slots in call order and decides, per slot, where the
 * argument comes from (receiver, caller, constant, measured length, preflight
 * discovery, callback plumbing, compound column). Size plans are followed exactly
 * as the solver recorded them; nothing here re-derives a relation. */

use super::helpers::*;
use crate::naming::rust_ident;
use crate::placement::Placement;
use crate::shards::AttributeAccess;
use crate::solver::{SizePlan, COALESCE};
use crate::surface::{NativeSlot, OutputKind, SlotSource, SurfaceCatalog, SurfaceFunction, SurfaceOutput};
use daqmx_types::{AdaptorExpr, CallingConvention, Narrowing, ScalarType, TypeToken};
use std::collections::BTreeSet;

/* Local function in the emitted bindings that fetches the extended error text */
pub const ERROR_INFO_FN: &str = "extended_error_info";

/* Owned-handle type used when a handle crosses the surface outside a class */
pub const HANDLE_CLASS: &str = "Task";

/* Receiver local bound at the top of every instance method */
const HANDLE: &str = "handle";

/* How the value slot of an attribute shard is passed */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShardValue {
  Get,
  SetVariadic,
  SetByPointer,
}

#[derive(Default)]
struct SlotArgs {
  main: String,
  preflight: Option<String>,
  unregister: Option<String>,
}

impl SlotArgs {
  fn plain(main: impl Into<String>) -> Self {
    Self { main: main.into(), ..Self::default() }
  }

  fn main_arg(&self) -> &str {
    &self.main
  }

  fn preflight_arg(&self) -> &str {
    self.preflight.as_deref().unwrap_or(&self.main)
  }

  fn unregister_arg(&self) -> &str {
    self.unregister.as_deref().unwrap_or(&self.main)
  }
}

struct Wrapper<'a> {
  surface: &'a SurfaceCatalog,
  function: &'a SurfaceFunction,
  shard: Option<(String, ShardValue)>,
  setup: Vec<String>,
  deferred: Vec<String>,
  post: Vec<String>,
  raw_optional: BTreeSet<String>,
  two_call: Vec<(String, String)>,
}

pub fn emit_function(surface: &SurfaceCatalog, function: &SurfaceFunction, indent: &str) -> String {
  Wrapper::new(surface, function).emit(indent)
}

impl<'a> Wrapper<'a> {
  fn new(surface: &'a SurfaceCatalog, function: &'a SurfaceFunction) -> Self {
    let shard = function.shard.as_ref().and_then(|membership| surface.shards.get(&membership.group)).map(|group| {
      let mode = match (group.access, group.calling_convention) {
        (AttributeAccess::Get, _) => ShardValue::Get,
        (AttributeAccess::Set, CallingConvention::Cdecl) => ShardValue::SetVariadic,
        (AttributeAccess::Set, CallingConvention::StdCall) => ShardValue::SetByPointer,
      };
      (group.value_param.clone(), mode)
    });
    Self {
      surface,
      function,
      shard,
      setup: Vec::new(),
      deferred: Vec::new(),
      post: Vec::new(),
      raw_optional: BTreeSet::new(),
      two_call: Vec::new(),
    }
  }

  fn name(&self) -> &str {
    &self.function.name
  }

  fn ident_of(&self, name: &str) -> String {
    self
      .function
      .input(name)
      .map(|i| i.ident.clone())
      .or_else(|| self.function.output(name).map(|o| o.ident.clone()))
      .unwrap_or_else(|| rust_ident(name))
  }

  fn emit(mut self, indent: &str) -> String {
    let function = self.function;
    let mut output = String::new();

    if !function.description.is_empty() {
      output.push_str(&doc_comment(&function.description, indent));
    }

    let receiver = match &function.placement {
      Placement::Instance { .. } if function.releases_handle => Some("mut self"),
      Placement::Instance { .. } => Some("&self"),
      _ => None,
    };
    let record = function.compound.as_ref().map(|c| c.record.as_str());
    let mut params: Vec<String> = receiver.map(|r| vec![r.to_string()]).unwrap_or_default();
    params.extend(function.inputs.iter().map(|i| format!("{}: {}", i.ident, param_type(i, record))));

    let returns = self.return_items();
    let return_type = match returns.as_slice() {
      [] => "()".to_string(),
      [(_, ty)] => ty.clone(),
      many => format!("({})", many.iter().map(|(_, ty)| ty.as_str()).collect::<Vec<_>>().join(", ")),
    };
    output.push_str(&format!(
      "{}pub fn {}({}) -> Result<Outcome<{}>, DaqmxError> {{\n",
      indent,
      function.method_name,
      params.join(", "),
      return_type
    ));

    let body = self.body(&returns);
    for line in body {
      if line.is_empty() {
        output.push('\n');
      } else {
        output.push_str(&format!("{}  {}\n", indent, line));
      }
    }
    output.push_str(&format!("{}}}\n", indent));
    output
  }

  /* (expression, type) of every returned value, in surface order */
  fn return_items(&self) -> Vec<(String, String)> {
    let function = self.function;
    let mut items = Vec::new();
    for output in &function.outputs {
      match output.kind {
        OutputKind::Handle => {
          let class = function.placement.class().unwrap_or(HANDLE_CLASS);
          items.push((format!("{} {{ handle: {} }}", class, output.ident), class.to_string()));
        }
        _ => items.push((output.ident.clone(), output_type(output))),
      }
    }
    if let Some(adaptor) = &function.adaptor {
      items.push((self.adaptor_expr(&adaptor.expression), adaptor.data_type.clone()));
    }
    if let Some(stream) = &function.stream {
      items.push(("subscription".to_string(), format!("Subscription<{}>", stream.record)));
    }
    items
  }

  fn body(&mut self, returns: &[(String, String)]) -> Vec<String> {
    let function = self.function;
    let name = self.name().to_string();

    match &function.placement {
      Placement::Instance { .. } if function.releases_handle => {
        self.setup.push(format!("let {} = std::mem::replace(&mut self.handle, std::ptr::null_mut());", HANDLE));
      }
      Placement::Instance { .. } => self.setup.push(format!("let {} = self.handle;", HANDLE)),
      _ => {}
    }

    self.unwrap_optionals();
    self.unpack_compound();

    if let Some(stream) = &function.stream {
      self.setup.push("let (sender, records) = std::sync::mpsc::channel();".to_string());
      self.setup.push(format!("let sink = Box::new(StreamSink::<{}>::new({:?}, sender));", stream.record, name));
    }

    let mut args = Vec::new();
    let mut repeating_done = false;
    for slot in &function.slots {
      if let SlotSource::Repeating { .. } = slot.source {
        if !repeating_done {
          args.extend(self.repeating_args());
          repeating_done = true;
        }
        continue;
      }
      args.push(self.slot_args(slot));
    }

    let mut lines = std::mem::take(&mut self.setup);
    lines.append(&mut self.deferred);

    let call = |pick: &dyn Fn(&SlotArgs) -> &str| {
      format!(
        "unsafe {{ ffi::{}({}) }}",
        function.native_symbol,
        args.iter().map(|a| pick(a).to_string()).collect::<Vec<_>>().join(", ")
      )
    };

    if self.two_call.is_empty() {
      lines.push(format!("let status = {};", call(&SlotArgs::main_arg)));
    } else {
      lines.push(format!("let status = {};", call(&SlotArgs::preflight_arg)));
      let mut lens = Vec::new();
      for (buffer, size) in std::mem::take(&mut self.two_call) {
        let slot = function.slot(&buffer);
        let size_slot = function.slot(&size);
        let buffer_ident = self.ident_of(&buffer);
        let size_ident = rust_ident(&size);
        lines.push(format!("let {}_len = discovered_size({:?}, status, {})?;", buffer_ident, name, ERROR_INFO_FN));
        if let Some(TypeToken::Scalar(scalar)) = size_slot.map(|s| &s.ty) {
          lines.push(format!(
            "let {}: {} = native_size({:?}, {:?}, {}_len)?;",
            size_ident,
            scalar.rust_type(),
            name,
            size,
            buffer_ident
          ));
        }
        if let Some(element) = slot.and_then(|s| s.ty.element()) {
          lines.push(format!(
            "let mut {}: Vec<{}> = vec![{}; {}_len];",
            buffer_ident,
            element.rust_type(),
            zero_value(element),
            buffer_ident
          ));
        }
        lens.push(format!("{}_len == 0", buffer_ident));
      }
      lines.push(format!(
        "let status = if {} {{ status }} else {{ {} }};",
        lens.join(" && "),
        call(&SlotArgs::main_arg)
      ));
    }
    lines.push(format!("let warning = check_status({:?}, status, {})?;", name, ERROR_INFO_FN));
    lines.append(&mut self.post);

    if function.stream.is_some() {
      /* same registration with a null callback and token */
      let unregister = call(&SlotArgs::unregister_arg);
      lines.push(format!(
        "let subscription = Subscription::new(sink, records, {}, Box::new(move || {}));",
        ERROR_INFO_FN,
        unregister
      ));
    }

    let value = match returns {
      [] => "()".to_string(),
      [(expr, _)] => expr.clone(),
      many => format!("({})", many.iter().map(|(expr, _)| expr.as_str()).collect::<Vec<_>>().join(", ")),
    };
    lines.push(format!("Ok(Outcome {{ value: {}, warning }})", value));
    lines
  }

  fn unwrap_optionals(&mut self) {
    for input in self.function.inputs.iter().filter(|i| i.optional) {
      if matches!(input.ty, TypeToken::Compound) {
        continue;
      }
      if input.enum_name.is_some() {
        match default_expr(input, &self.surface.enums) {
          Some(default) if default.contains("::") => {
            self.setup.push(format!("let {} = {}.unwrap_or({});", input.ident, input.ident, default));
          }
          _ => {
            self.raw_optional.insert(input.name.clone());
          }
        }
        continue;
      }
      let default = default_expr(input, &self.surface.enums).unwrap_or_else(|| "Default::default()".to_string());
      self.setup.push(format!("let {} = {}.unwrap_or({});", input.ident, input.ident, default));
    }
  }

  fn unpack_compound(&mut self) {
    let Some(compound) = &self.function.compound else {
      return;
    };
    let name = self.name().to_string();
    let list = rust_ident(&compound.param);
    self.setup.push(format!("check_max_length({:?}, {}, {}.len())?;", name, compound.max_length, list));
    for field in &compound.fields {
      let column = &field.ident;
      if field.ty.is_string() {
        self.setup.push(format!(
          "let {}_c = {}.iter().map(|r| to_cstring({:?}, &r.{})).collect::<Result<Vec<_>, _>>()?;",
          column, list, name, column
        ));
        self.setup.push(format!(
          "let {}_at = |i: usize| {}_c.get(i).map_or(std::ptr::null(), |c| c.as_ptr());",
          column, column
        ));
        continue;
      }
      let scalar = field.ty.element().unwrap_or(ScalarType::Int32);
      let native = variadic_type(scalar);
      self.setup.push(format!(
        "let {}_at = |i: usize| {}.get(i).map_or({}, |r| r.{} as {});",
        column,
        list,
        variadic_zero(scalar),
        column,
        native
      ));
    }
  }

  /* Every column of every record slot, `max_length` groups wide; unused groups
   * carry null strings and zero values */
  fn repeating_args(&self) -> Vec<SlotArgs> {
    let Some(compound) = &self.function.compound else {
      return Vec::new();
    };
    let columns: Vec<&str> = self
      .function
      .slots
      .iter()
      .filter_map(|s| match &s.source {
        SlotSource::Repeating { field } => compound.fields.iter().find(|f| &f.name == field).map(|f| f.ident.as_str()),
        _ => None,
      })
      .collect();
    let mut args = Vec::with_capacity(compound.max_length * columns.len());
    for i in 0..compound.max_length {
      for column in &columns {
        args.push(SlotArgs::plain(format!("{}_at({})", column, i)));
      }
    }
    args
  }

  fn slot_args(&mut self, slot: &NativeSlot) -> SlotArgs {
    match &slot.source {
      SlotSource::Receiver => SlotArgs::plain(HANDLE),
      SlotSource::Argument => self.argument(slot),
      SlotSource::Hardcoded { value } => {
        if value.is_null() {
          let null = if ffi_param_type(slot).starts_with("*const") { "std::ptr::null()" } else { "std::ptr::null_mut()" };
          return SlotArgs::plain(null);
        }
        match (&slot.ty, value) {
          (ty, daqmx_types::Literal::Str(text)) if ty.is_string() => {
            SlotArgs::plain(format!("concat!({:?}, \"\\0\").as_ptr() as *const c_char", text))
          }
          (ty, literal) => SlotArgs::plain(literal_expr(literal, ty)),
        }
      }
      SlotSource::LengthOf { buffers } => self.length_of(slot, buffers),
      SlotSource::DiscoveredSize { buffer } => {
        self.two_call.push((buffer.clone(), slot.name.clone()));
        let ident = rust_ident(&slot.name);
        SlotArgs { main: ident, preflight: Some("0".to_string()), unregister: None }
      }
      SlotSource::Output => self.output(slot),
      SlotSource::Callback => match &self.function.stream {
        Some(_) => SlotArgs {
          main: format!("Some({}_trampoline)", self.function.method_name),
          preflight: None,
          unregister: Some("None".to_string()),
        },
        None => SlotArgs::plain("None"),
      },
      SlotSource::CallbackToken => match &self.function.stream {
        Some(_) => SlotArgs {
          main: "token_of(&*sink)".to_string(),
          preflight: None,
          unregister: Some("std::ptr::null_mut()".to_string()),
        },
        None => SlotArgs::plain("std::ptr::null_mut()"),
      },
      SlotSource::Repeating { .. } => SlotArgs::plain("0"),
    }
  }

  fn argument(&mut self, slot: &NativeSlot) -> SlotArgs {
    let name = self.name().to_string();
    let ident = self.ident_of(&slot.name);
    let shard_mode = self.shard.as_ref().filter(|(value, _)| value == &slot.name).map(|(_, mode)| *mode);

    let value = match &slot.ty {
      TypeToken::Scalar(ScalarType::TaskHandle) => format!("{}.handle", ident),
      TypeToken::Scalar(scalar) if slot.enum_name.is_some() => {
        let native = scalar.rust_type();
        if self.raw_optional.contains(&slot.name) {
          let fallback = self
            .function
            .input(&slot.name)
            .and_then(|i| i.default.as_ref())
            .map(|d| literal_expr(d, &slot.ty))
            .unwrap_or_else(|| format!("0{}", native));
          format!("{}.map_or({}, |v| v as {})", ident, fallback, native)
        } else {
          format!("{} as {}", ident, native)
        }
      }
      TypeToken::Scalar(ScalarType::Bool32) => format!("{} as u32", ident),
      TypeToken::Scalar(_) if slot.pointer => {
        self.setup.push(format!("let mut {}_inout = {};", ident, ident));
        format!("&mut {}_inout", ident)
      }
      TypeToken::Scalar(_) => ident.clone(),
      TypeToken::Buffer { element: ScalarType::Char, .. } => {
        self.setup.push(format!("let {}_c = to_cstring({:?}, {})?;", ident, name, ident));
        format!("{}_c.as_ptr()", ident)
      }
      TypeToken::Buffer { element: ScalarType::Bool32, .. } => {
        self.setup.push(format!("let {}_native: Vec<u32> = {}.iter().map(|&v| v as u32).collect();", ident, ident));
        format!("{}_native.as_ptr()", ident)
      }
      TypeToken::Buffer { element, .. } if slot.coercion.is_some() => {
        let policy = match slot.coercion.map(|c| c.narrowing) {
          Some(Narrowing::Saturate) => "Saturate",
          Some(Narrowing::Wrap) => "Wrap",
          _ => "Reject",
        };
        self.setup.push(format!(
          "let {}_native: Vec<{}> = narrow({:?}, {}, Narrowing::{})?;",
          ident,
          element.rust_type(),
          name,
          ident,
          policy
        ));
        format!("{}_native.as_ptr()", ident)
      }
      TypeToken::Buffer { .. } | TypeToken::FixedArray { .. } => format!("{}.as_ptr()", ident),
      TypeToken::CallbackPtr(_) => ident.clone(),
      TypeToken::Compound => "std::ptr::null()".to_string(),
    };

    let value = match (&slot.ty, shard_mode) {
      (TypeToken::Scalar(scalar), Some(ShardValue::SetVariadic)) => match variadic_promotion(*scalar) {
        Some(promoted) => format!("({}) as {}", value, promoted),
        None => value,
      },
      (TypeToken::Scalar(scalar), Some(ShardValue::SetByPointer)) => {
        self.setup.push(format!("let {}_value: {} = {};", ident, scalar.rust_type(), value));
        format!("&{}_value as *const {} as *const c_void", ident, scalar.rust_type())
      }
      (_, Some(ShardValue::SetByPointer)) => format!("{} as *const c_void", value),
      _ if slot.ty.is_buffer() && !slot.ty.is_const() => format!("{} as *mut _", value),
      _ => value,
    };
    SlotArgs::plain(value)
  }

  fn length_of(&mut self, slot: &NativeSlot, buffers: &[String]) -> SlotArgs {
    let name = self.name().to_string();
    let ident = rust_ident(&slot.name);
    let native = slot.ty.element().map(|e| e.rust_type()).unwrap_or("u32");
    let lengths: Vec<String> = buffers.iter().map(|b| format!("{}.len()", self.ident_of(b))).collect();
    let measured = match lengths.as_slice() {
      [one] => one.clone(),
      many => format!("shared_len({:?}, {:?}, &[{}])?", name, slot.name, many.join(", ")),
    };
    let binding = if slot.pointer { "let mut" } else { "let" };
    self.setup.push(format!(
      "{} {}: {} = native_size({:?}, {:?}, {})?;",
      binding, ident, native, name, slot.name, measured
    ));
    if slot.pointer {
      SlotArgs::plain(format!("&mut {}", ident))
    } else {
      SlotArgs::plain(ident)
    }
  }

  fn output(&mut self, slot: &NativeSlot) -> SlotArgs {
    let name = self.name().to_string();
    let ident = self.ident_of(&slot.name);
    let getter = self.shard.as_ref().filter(|(value, mode)| value == &slot.name && *mode == ShardValue::Get).is_some();
    let output = self.function.output(&slot.name).cloned();

    let args = match &slot.ty {
      TypeToken::Scalar(scalar) => {
        self.setup.push(format!("let mut {}: {} = {};", ident, scalar.rust_type(), zero_value(*scalar)));
        if getter {
          SlotArgs::plain(format!("&mut {} as *mut {} as *mut c_void", ident, scalar.rust_type()))
        } else {
          SlotArgs::plain(format!("&mut {}", ident))
        }
      }
      TypeToken::FixedArray { element, len, .. } => {
        self.setup.push(format!("let mut {} = [{} as {}; {}];", ident, zero_value(*element), element.rust_type(), len));
        SlotArgs::plain(format!("{}.as_mut_ptr()", ident))
      }
      TypeToken::Buffer { element, .. } => {
        let element = *element;
        let pointer = if getter { format!("{}.as_mut_ptr() as *mut c_void", ident) } else { format!("{}.as_mut_ptr()", ident) };
        match self.function.plan(&slot.name) {
          Some(SizePlan::CallerSized { size_param, by_ptr, .. }) => {
            let size = self.ident_of(size_param);
            self.setup.push(format!(
              "let mut {}: Vec<{}> = vec![{}; {} as usize];",
              ident,
              element.rust_type(),
              zero_value(element),
              size
            ));
            if *by_ptr {
              self.post.push(format!("{}.truncate({}_inout as usize);", ident, size));
            }
            SlotArgs::plain(pointer)
          }
          Some(SizePlan::TwoCall { .. }) => SlotArgs { main: pointer, preflight: Some("std::ptr::null_mut()".to_string()), unregister: None },
          Some(SizePlan::ExprComputed { expression, .. }) => {
            let rename = |operand: &str| self.ident_of(operand);
            let computed = expression.to_rust_string(&rename);
            self.deferred.push(format!("let {}_len = computed_size({:?}, {:?}, {})?;", ident, name, slot.name, computed));
            self.deferred.push(format!(
              "let mut {}: Vec<{}> = vec![{}; {}_len];",
              ident,
              element.rust_type(),
              zero_value(element),
              ident
            ));
            SlotArgs::plain(pointer)
          }
          _ => SlotArgs::plain("std::ptr::null_mut()"),
        }
      }
      TypeToken::CallbackPtr(_) | TypeToken::Compound => SlotArgs::plain("std::ptr::null_mut()"),
    };

    if let Some(output) = output {
      self.finish_output(&output, slot);
    }
    args
  }

  /* Convert a native out value to its surface type after the call */
  fn finish_output(&mut self, output: &SurfaceOutput, slot: &NativeSlot) {
    let name = self.name().to_string();
    let ident = &output.ident;
    match (&output.ty, &slot.ty) {
      (_, _) if output.kind == OutputKind::Handle => {}
      (TypeToken::Scalar(_), _) if output.enum_name.is_some() => {
        let enum_name = output.enum_name.as_deref().unwrap_or_default();
        self.post.push(format!(
          "let {}: {} = enum_value({:?}, {:?}, {} as i64)?;",
          ident,
          enum_type_name(enum_name),
          name,
          enum_name,
          ident
        ));
      }
      (TypeToken::Scalar(ScalarType::Bool32), _) => self.post.push(format!("let {} = {} != 0;", ident, ident)),
      (TypeToken::Buffer { element: ScalarType::Char, .. }, _) => {
        self.post.push(format!("let {} = from_c_buffer(&{});", ident, ident));
      }
      (TypeToken::Buffer { element: ScalarType::Bool32, .. }, _) => {
        self.post.push(format!("let {}: Vec<bool> = {}.into_iter().map(|v| v != 0).collect();", ident, ident));
      }
      (TypeToken::Buffer { element: surface, .. }, TypeToken::Buffer { element: native, .. }) if surface != native => {
        self.post.push(format!(
          "let {}: Vec<{}> = {}.into_iter().map({}::from).collect();",
          ident,
          surface.rust_type(),
          ident,
          surface.rust_type()
        ));
      }
      _ => {}
    }
  }

  fn adaptor_expr(&self, expr: &AdaptorExpr) -> String {
    match expr {
      AdaptorExpr::Param(name) => {
        if self.function.receiver_slot().map(|s| &s.name) == Some(name) {
          return HANDLE.to_string();
        }
        match self.function.input(name) {
          Some(input) if input.ty.is_string() => format!("{}.to_string()", input.ident),
          Some(input) => input.ident.clone(),
          None => rust_ident(name),
        }
      }
      AdaptorExpr::Str(text) => format!("{:?}.to_string()", text),
      AdaptorExpr::Call { callee, args } if callee == COALESCE => {
        let args: Vec<String> = args.iter().map(|a| format!("&{}", self.adaptor_expr(a))).collect();
        format!("coalesce({})", args.join(", "))
      }
      AdaptorExpr::Call { callee, args } => {
        let args: Vec<String> = args.iter().map(|a| self.adaptor_expr(a)).collect();
        format!("{}({})", callee, args.join(", "))
      }
    }
  }
}

/* C default argument promotion for values passed through `...` */
pub fn variadic_promotion(scalar: ScalarType) -> Option<&'static str> {
  match scalar {
    ScalarType::Int16 => Some("i32"),
    ScalarType::UInt16 | ScalarType::UInt8 => Some("u32"),
    _ => None,
  }
}

fn variadic_type(scalar: ScalarType) -> &'static str {
  variadic_promotion(scalar).unwrap_or(scalar.rust_type())
}

fn variadic_zero(scalar: ScalarType) -> String {
  match scalar {
    ScalarType::Float64 => "0.0".to_string(),
    other => format!("0{}", variadic_type(other)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::surface::build_surface_from_catalog;
  use daqmx_types::{Catalog, CoercionTable};

  fn surface(functions: &str) -> SurfaceCatalog {
    let catalog: Catalog =
      serde_yml::from_str(&format!("catalog: {{ package: t, version: '1' }}\nfunctions:\n{}", functions)).unwrap();
    build_surface_from_catalog(&catalog, &CoercionTable::new(), "0").unwrap()
  }

  #[test]
  fn len_derived_size_is_measured_not_passed() {
    let surface = surface(
      r#"
  WriteAnalogF64:
    calling_convention: StdCall
    python_class_name: Task
    handle_parameter: { cvi_name: taskHandle, accessor: self._handle }
    returns: int32
    parameters:
      - { name: task, cvi_name: taskHandle, direction: in, type: TaskHandle }
      - { name: numSampsPerChan, direction: in, type: int32 }
      - { name: writeArray, direction: in, type: "const float64[]", size: { mechanism: len, value: numSampsPerChan } }
      - { name: sampsPerChanWritten, direction: out, type: int32 }
"#,
    );
    let code = emit_function(&surface, &surface.functions["WriteAnalogF64"], "  ");
    assert!(code.contains("pub fn write_analog_f64(&self, write_array: &[f64]) -> Result<Outcome<i32>, DaqmxError>"));
    assert!(code.contains("let num_samps_per_chan: i32 = native_size(\"WriteAnalogF64\", \"numSampsPerChan\", write_array.len())?;"));
    assert!(code.contains("ffi::DAQmxWriteAnalogF64(handle, num_samps_per_chan, write_array.as_ptr(), &mut samps_per_chan_written)"));
  }

  #[test]
  fn two_call_preflights_with_null_buffer() {
    let surface = surface(
      r#"
  GetExtendedErrorInfo:
    calling_convention: StdCall
    returns: int32
    parameters:
      - { name: errorString, direction: out, type: "char[]", size: { mechanism: ivi-dance, value: bufferSize } }
      - { name: bufferSize, direction: in, type: uInt32 }
"#,
    );
    let code = emit_function(&surface, &surface.functions["GetExtendedErrorInfo"], "");
    assert!(code.contains("pub fn get_extended_error_info() -> Result<Outcome<String>, DaqmxError>"));
    assert!(code.contains("ffi::DAQmxGetExtendedErrorInfo(std::ptr::null_mut(), 0)"));
    assert!(code.contains("let error_string_len = discovered_size("));
    assert!(code.contains("ffi::DAQmxGetExtendedErrorInfo(error_string.as_mut_ptr(), buffer_size)"));
    assert!(code.contains("let error_string = from_c_buffer(&error_string);"));
  }
}
