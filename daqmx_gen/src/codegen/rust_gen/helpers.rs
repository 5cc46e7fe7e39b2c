/* Helper utilities for Rust code generation */

use crate::naming::upper_camel;
use crate::surface::{NativeSlot, OutputKind, SurfaceInput, SurfaceOutput};
use daqmx_types::{Direction, EnumTable, Literal, ScalarType, TypeToken};

/* Rust type of a native scalar as seen through the FFI */
pub fn scalar_to_ffi_type(scalar: ScalarType) -> &'static str {
  scalar.rust_type()
}

/* Parameter type in the extern declaration */
pub fn ffi_param_type(slot: &NativeSlot) -> String {
  match &slot.ty {
    TypeToken::Scalar(ScalarType::Void) => "*mut c_void".to_string(),
    TypeToken::Scalar(scalar) => {
      if slot.direction == Direction::Out || slot.pointer {
        format!("*mut {}", scalar_to_ffi_type(*scalar))
      } else {
        scalar_to_ffi_type(*scalar).to_string()
      }
    }
    TypeToken::Buffer { element, is_const } | TypeToken::FixedArray { element, is_const, .. } => {
      if *is_const {
        format!("*const {}", scalar_to_ffi_type(*element))
      } else {
        format!("*mut {}", scalar_to_ffi_type(*element))
      }
    }
    TypeToken::CallbackPtr(name) => name.clone(),
    TypeToken::Compound => "*const c_void".to_string(),
  }
}

/* Surface spelling of a scalar input */
pub fn scalar_input_type(scalar: ScalarType) -> &'static str {
  match scalar {
    ScalarType::Bool32 => "bool",
    ScalarType::TaskHandle => "&Task",
    ScalarType::Char => "u8",
    other => other.rust_type(),
  }
}

pub fn enum_type_name(enum_name: &str) -> String {
  upper_camel(enum_name)
}

/* Type of a surface input before optional wrapping */
pub fn input_type(input: &SurfaceInput, record: Option<&str>) -> String {
  if let (Some(enum_name), TypeToken::Scalar(_)) = (&input.enum_name, &input.ty) {
    return enum_type_name(enum_name);
  }
  match &input.ty {
    TypeToken::Scalar(scalar) => scalar_input_type(*scalar).to_string(),
    TypeToken::Buffer { element: ScalarType::Char, .. } => "&str".to_string(),
    TypeToken::Buffer { element: ScalarType::Bool32, .. } => "&[bool]".to_string(),
    TypeToken::Buffer { element, .. } => format!("&[{}]", element.rust_type()),
    TypeToken::FixedArray { element, len, .. } => format!("&[{}; {}]", element.rust_type(), len),
    TypeToken::CallbackPtr(name) => name.clone(),
    TypeToken::Compound => format!("&[{}]", record.unwrap_or("()")),
  }
}

/* Parameter type in a wrapper signature: optional inputs become `Option<T>` */
pub fn param_type(input: &SurfaceInput, record: Option<&str>) -> String {
  let ty = input_type(input, record);
  if input.optional {
    format!("Option<{}>", ty)
  } else {
    ty
  }
}

/* Value type of a surface output */
pub fn output_type(output: &SurfaceOutput) -> String {
  if output.kind == OutputKind::Handle {
    return "Task".to_string();
  }
  if let (Some(enum_name), TypeToken::Scalar(_)) = (&output.enum_name, &output.ty) {
    return enum_type_name(enum_name);
  }
  match &output.ty {
    TypeToken::Scalar(ScalarType::Bool32) => "bool".to_string(),
    TypeToken::Scalar(scalar) => scalar.rust_type().to_string(),
    TypeToken::Buffer { element: ScalarType::Char, .. } => "String".to_string(),
    TypeToken::Buffer { element: ScalarType::Bool32, .. } => "Vec<bool>".to_string(),
    TypeToken::Buffer { element, .. } => format!("Vec<{}>", element.rust_type()),
    TypeToken::FixedArray { element, len, .. } => format!("[{}; {}]", element.rust_type(), len),
    TypeToken::CallbackPtr(name) => name.clone(),
    TypeToken::Compound => "()".to_string(),
  }
}

/* Zero value used to initialize an out slot before the call */
pub fn zero_value(scalar: ScalarType) -> &'static str {
  match scalar {
    ScalarType::Float64 => "0.0",
    ScalarType::TaskHandle => "std::ptr::null_mut()",
    ScalarType::Void => "std::ptr::null_mut()",
    ScalarType::CviAbsoluteTime => "CVIAbsoluteTime::default()",
    ScalarType::Char => "0",
    _ => "0",
  }
}

/* Rust expression for a catalog literal of the given native type */
pub fn literal_expr(literal: &Literal, ty: &TypeToken) -> String {
  if literal.is_null() {
    return "std::ptr::null_mut()".to_string();
  }
  match (literal, ty) {
    (Literal::Str(value), _) => format!("{:?}", value),
    (Literal::Bool(value), _) => (*value as u32).to_string(),
    (Literal::Float(value), _) => format!("{:?}", value),
    (Literal::Int(value), TypeToken::Scalar(ScalarType::Float64)) => format!("{}.0", value),
    (Literal::Int(value), TypeToken::Scalar(scalar)) => format!("{}{}", value, scalar.rust_type()),
    (Literal::Int(value), _) => value.to_string(),
  }
}

/* Default of an optional input, spelled as a surface value. Enum defaults name
 * the matching variant; values outside the enum fall back to the raw integer. */
pub fn default_expr(input: &SurfaceInput, enums: &EnumTable) -> Option<String> {
  let literal = input.default.as_ref()?;
  if let Some(enum_name) = &input.enum_name {
    let variant = literal
      .as_i64()
      .and_then(|value| enums.get(enum_name).and_then(|def| def.values.iter().find(|v| v.value == value)));
    return Some(match variant {
      Some(variant) => format!("{}::{}", enum_type_name(enum_name), variant.name),
      None => literal.to_string(),
    });
  }
  Some(match (&input.ty, literal) {
    (TypeToken::Buffer { element: ScalarType::Char, .. }, Literal::Str(value)) => format!("{:?}", value),
    (TypeToken::Scalar(ScalarType::Bool32), Literal::Bool(value)) => value.to_string(),
    (TypeToken::Scalar(ScalarType::Bool32), Literal::Int(value)) => (*value != 0).to_string(),
    (ty, literal) => literal_expr(literal, ty),
  })
}

/* Doc comment block, preserved verbatim */
pub fn doc_comment(text: &str, indent: &str) -> String {
  let mut output = String::new();
  for line in text.lines().filter(|l| !l.trim().is_empty()) {
    output.push_str(&format!("{}/// {}\n", indent, line.trim_end()));
  }
  output
}
