/* Conversions between surface values and native slots */

use crate::errors::{DaqmxError, DaqmxResult};
use crate::native::{Buffer, Scalar};
use crate::time::CviTime;
use crate::value::{Args, Value};
use daqmx_gen::SurfaceFunction;
use daqmx_types::{CoercionPolicy, EnumTable, Literal, Narrowing, ScalarType, Widening};
use indexmap::IndexMap;

pub fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(v) => Value::Int(*v),
        Literal::Float(v) => Value::Float(*v),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

/// Surface inputs after defaults, keyed by catalog parameter name. Optional
/// inputs without a default stay absent. Enum-tagged inputs are checked here.
pub fn resolve_inputs(function: &SurfaceFunction, enums: &EnumTable, args: &Args) -> DaqmxResult<IndexMap<String, Value>> {
    let name = function.name.as_str();
    if let Some(unknown) = args.keys().find(|key| function.input(key).is_none()) {
        return Err(DaqmxError::invalid_argument(name, format!("unexpected argument '{}'", unknown)));
    }

    let mut resolved = IndexMap::new();
    for input in &function.inputs {
        let value = match args.get(&input.name) {
            Some(value) => value.clone(),
            None => match &input.default {
                Some(default) => literal_value(default),
                None if input.optional => continue,
                None => {
                    return Err(DaqmxError::invalid_argument(
                        name,
                        format!("missing required argument '{}'", input.name),
                    ))
                }
            },
        };
        if let Some(enum_name) = &input.enum_name {
            check_enum(name, enums, enum_name, &value)?;
        }
        resolved.insert(input.name.clone(), value);
    }
    Ok(resolved)
}

/// Integer behind an enum-tagged value; members outside the enum, or of an
/// enum the table does not define, are rejected.
pub fn check_enum(function: &str, enums: &EnumTable, enum_name: &str, value: &Value) -> DaqmxResult<i64> {
    let raw = value.as_i64().ok_or_else(|| {
        DaqmxError::invalid_argument(function, format!("{} value expected for {}", value.kind_name(), enum_name))
    })?;
    if let Value::Enum { enum_name: tagged, .. } = value {
        if tagged != enum_name {
            return Err(DaqmxError::invalid_argument(
                function,
                format!("{} member passed where {} is expected", tagged, enum_name),
            ));
        }
    }
    /* an enum missing from the table has no members */
    match enums.get(enum_name) {
        Some(def) if def.contains(raw) => Ok(raw),
        _ => Err(DaqmxError::InvalidEnumValue {
            function: function.to_string(),
            enum_name: enum_name.to_string(),
            value: raw,
        }),
    }
}

/* Inclusive range of an integral native type */
fn int_range(ty: ScalarType) -> Option<(i64, i64)> {
    let range = match ty {
        ScalarType::Int16 => (i16::MIN as i64, i16::MAX as i64),
        ScalarType::UInt16 => (0, u16::MAX as i64),
        ScalarType::Int32 => (i32::MIN as i64, i32::MAX as i64),
        ScalarType::UInt32 | ScalarType::Bool32 => (0, u32::MAX as i64),
        ScalarType::UInt8 | ScalarType::Char => (0, u8::MAX as i64),
        _ => return None,
    };
    Some(range)
}

/* Two's-complement truncation to the native width */
fn wrap(ty: ScalarType, value: i64) -> i64 {
    match ty {
        ScalarType::Int16 => value as i16 as i64,
        ScalarType::UInt16 => value as u16 as i64,
        ScalarType::Int32 => value as i32 as i64,
        ScalarType::UInt32 | ScalarType::Bool32 => value as u32 as i64,
        ScalarType::UInt8 | ScalarType::Char => value as u8 as i64,
        _ => value,
    }
}

/// Native scalar for a surface value passed in a slot of type `ty`.
pub fn native_scalar(function: &str, parameter: &str, ty: ScalarType, value: &Value) -> DaqmxResult<Scalar> {
    let mismatch = || {
        DaqmxError::invalid_argument(
            function,
            format!("'{}' expects {}, got {}", parameter, ty.token(), value.kind_name()),
        )
    };
    match ty {
        ScalarType::Float64 => value.as_f64().map(Scalar::Float).ok_or_else(mismatch),
        ScalarType::CviAbsoluteTime => value
            .as_time()
            .map(|t| Scalar::Time(CviTime::from_datetime(t)))
            .ok_or_else(mismatch),
        ScalarType::UInt64 | ScalarType::TaskHandle => value.as_u64().map(Scalar::UInt).ok_or_else(mismatch),
        ScalarType::Void => Err(mismatch()),
        _ => {
            let raw = value.as_i64().ok_or_else(mismatch)?;
            match int_range(ty) {
                Some((min, max)) if raw < min || raw > max => Err(DaqmxError::invalid_argument(
                    function,
                    format!("{} does not fit '{}' ({})", raw, parameter, ty.token()),
                )),
                _ => Ok(Scalar::Int(raw)),
            }
        }
    }
}

/// Narrow one coerced element. In-range values pass unchanged.
pub fn narrow(function: &str, parameter: &str, element: ScalarType, policy: Narrowing, value: i64) -> DaqmxResult<i64> {
    let Some((min, max)) = int_range(element) else {
        return Ok(value);
    };
    if (min..=max).contains(&value) {
        return Ok(value);
    }
    match policy {
        Narrowing::Saturate => Ok(value.clamp(min, max)),
        Narrowing::Wrap => Ok(wrap(element, value)),
        Narrowing::Reject => Err(DaqmxError::Coercion {
            function: function.to_string(),
            parameter: parameter.to_string(),
            value,
            element: element.token().to_string(),
        }),
    }
}

/// Native input buffer from a surface list.
pub fn native_buffer(
    function: &str,
    parameter: &str,
    element: ScalarType,
    coercion: Option<CoercionPolicy>,
    items: &[Value],
) -> DaqmxResult<Buffer> {
    let mismatch = |item: &Value| {
        DaqmxError::invalid_argument(
            function,
            format!("'{}' expects {} elements, got {}", parameter, element.token(), item.kind_name()),
        )
    };
    match element {
        ScalarType::Float64 => {
            let values = items.iter().map(|v| v.as_f64().ok_or_else(|| mismatch(v))).collect::<DaqmxResult<_>>()?;
            Ok(Buffer::Float64(values))
        }
        ScalarType::Bool32 => {
            let values = items
                .iter()
                .map(|v| v.as_bool().map(|b| b as u32).ok_or_else(|| mismatch(v)))
                .collect::<DaqmxResult<_>>()?;
            Ok(Buffer::Bool32(values))
        }
        ScalarType::UInt64 => {
            let values = items.iter().map(|v| v.as_u64().ok_or_else(|| mismatch(v))).collect::<DaqmxResult<_>>()?;
            Ok(Buffer::UInt64(values))
        }
        _ => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                let raw = item.as_i64().ok_or_else(|| mismatch(item))?;
                let raw = match coercion {
                    Some(policy) => narrow(function, parameter, element, policy.narrowing, raw)?,
                    None => match native_scalar(function, parameter, element, item)? {
                        Scalar::Int(v) => v,
                        _ => return Err(mismatch(item)),
                    },
                };
                values.push(raw);
            }
            int_buffer(element, &values).ok_or_else(|| {
                DaqmxError::invalid_argument(function, format!("'{}' has no native array form", parameter))
            })
        }
    }
}

/* Values are already within the element range */
fn int_buffer(element: ScalarType, values: &[i64]) -> Option<Buffer> {
    let buffer = match element {
        ScalarType::Int16 => Buffer::Int16(values.iter().map(|&v| v as i16).collect()),
        ScalarType::UInt16 => Buffer::UInt16(values.iter().map(|&v| v as u16).collect()),
        ScalarType::Int32 => Buffer::Int32(values.iter().map(|&v| v as i32).collect()),
        ScalarType::UInt32 => Buffer::UInt32(values.iter().map(|&v| v as u32).collect()),
        ScalarType::UInt8 => Buffer::UInt8(values.iter().map(|&v| v as u8).collect()),
        _ => return None,
    };
    Some(buffer)
}

/// Surface value of a native scalar written by the native side.
pub fn scalar_value(function: &str, ty: ScalarType, enum_name: Option<&str>, scalar: Scalar) -> DaqmxResult<Value> {
    let value = match (scalar, enum_name) {
        (Scalar::Int(v), Some(enum_name)) => Value::Enum {
            enum_name: enum_name.to_string(),
            value: v,
        },
        (Scalar::Int(v), None) if ty == ScalarType::Bool32 => Value::Bool(v != 0),
        (Scalar::Int(v), None) => match ty {
            ScalarType::UInt8 | ScalarType::UInt16 | ScalarType::UInt32 => Value::UInt(v as u64),
            _ => Value::Int(v),
        },
        (Scalar::UInt(v), _) => Value::UInt(v),
        (Scalar::Float(v), _) => Value::Float(v),
        (Scalar::Time(t), _) => Value::Time(t.to_datetime().ok_or_else(|| {
            DaqmxError::invalid_argument(function, format!("native timestamp {:?} is out of range", t))
        })?),
    };
    Ok(value)
}

/// Surface value of a native output buffer. Character buffers become text;
/// coerced elements are widened by their policy.
pub fn buffer_value(buffer: &Buffer, coercion: Option<CoercionPolicy>) -> Value {
    let widening = coercion.map(|c| c.widening);
    let list = match buffer {
        Buffer::Char(_) => return Value::Str(buffer.to_text().unwrap_or_default()),
        Buffer::Int16(v) => match widening {
            Some(Widening::ZeroExtend) => v.iter().map(|&x| Value::Int(x as u16 as i64)).collect(),
            _ => v.iter().map(|&x| Value::Int(x as i64)).collect(),
        },
        Buffer::UInt16(v) => match widening {
            Some(Widening::SignExtend) => v.iter().map(|&x| Value::Int(x as i16 as i64)).collect(),
            _ => v.iter().map(|&x| Value::UInt(x as u64)).collect(),
        },
        Buffer::UInt8(v) => match widening {
            Some(Widening::SignExtend) => v.iter().map(|&x| Value::Int(x as i8 as i64)).collect(),
            _ => v.iter().map(|&x| Value::UInt(x as u64)).collect(),
        },
        Buffer::Int32(v) => v.iter().map(|&x| Value::Int(x as i64)).collect(),
        Buffer::UInt32(v) => v.iter().map(|&x| Value::UInt(x as u64)).collect(),
        Buffer::UInt64(v) => v.iter().map(|&x| Value::UInt(x)).collect(),
        Buffer::Float64(v) => v.iter().map(|&x| Value::Float(x)).collect(),
        Buffer::Bool32(v) => v.iter().map(|&x| Value::Bool(x != 0)).collect(),
    };
    Value::List(list)
}
