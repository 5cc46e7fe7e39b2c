/* Type lexicon - the closed vocabulary of native type tokens used by the catalog */

use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    Int16,
    UInt16,
    Int32,
    UInt32,
    UInt64,
    UInt8,
    Float64,
    Bool32,
    Char,
    TaskHandle,
    CviAbsoluteTime,
    Void,
}

impl ScalarType {
    pub fn token(&self) -> &'static str {
        match self {
            ScalarType::Int16 => "int16",
            ScalarType::UInt16 => "uInt16",
            ScalarType::Int32 => "int32",
            ScalarType::UInt32 => "uInt32",
            ScalarType::UInt64 => "uInt64",
            ScalarType::UInt8 => "uInt8",
            ScalarType::Float64 => "float64",
            ScalarType::Bool32 => "bool32",
            ScalarType::Char => "char",
            ScalarType::TaskHandle => "TaskHandle",
            ScalarType::CviAbsoluteTime => "CVIAbsoluteTime",
            ScalarType::Void => "void",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        let scalar = match token {
            "int16" => ScalarType::Int16,
            "uInt16" => ScalarType::UInt16,
            "int32" => ScalarType::Int32,
            "uInt32" => ScalarType::UInt32,
            "uInt64" => ScalarType::UInt64,
            "uInt8" => ScalarType::UInt8,
            "float64" => ScalarType::Float64,
            "bool32" => ScalarType::Bool32,
            "char" => ScalarType::Char,
            "TaskHandle" => ScalarType::TaskHandle,
            "CVIAbsoluteTime" => ScalarType::CviAbsoluteTime,
            "void" => ScalarType::Void,
            _ => return None,
        };
        Some(scalar)
    }

    /* bool32 counts as integral: the native ABI passes it as a 32-bit unsigned */
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            ScalarType::Int16
                | ScalarType::UInt16
                | ScalarType::Int32
                | ScalarType::UInt32
                | ScalarType::UInt64
                | ScalarType::UInt8
                | ScalarType::Bool32
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, ScalarType::Int16 | ScalarType::Int32)
    }

    /* Width in bytes of one element as seen by the native library */
    pub fn width(&self) -> usize {
        match self {
            ScalarType::UInt8 | ScalarType::Char => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Bool32 => 4,
            ScalarType::UInt64 | ScalarType::Float64 => 8,
            ScalarType::CviAbsoluteTime => 16,
            ScalarType::TaskHandle | ScalarType::Void => std::mem::size_of::<usize>(),
        }
    }

    /* Rust spelling used by emitted bindings */
    pub fn rust_type(&self) -> &'static str {
        match self {
            ScalarType::Int16 => "i16",
            ScalarType::UInt16 => "u16",
            ScalarType::Int32 => "i32",
            ScalarType::UInt32 => "u32",
            ScalarType::UInt64 => "u64",
            ScalarType::UInt8 => "u8",
            ScalarType::Float64 => "f64",
            ScalarType::Bool32 => "u32",
            ScalarType::Char => "c_char",
            ScalarType::TaskHandle => "TaskHandle",
            ScalarType::CviAbsoluteTime => "CVIAbsoluteTime",
            ScalarType::Void => "c_void",
        }
    }

    /* Protobuf spelling used by the IPC projection */
    pub fn proto_type(&self) -> &'static str {
        match self {
            ScalarType::Int16 | ScalarType::Int32 => "sint32",
            ScalarType::UInt16 | ScalarType::UInt32 | ScalarType::UInt8 => "uint32",
            ScalarType::UInt64 => "uint64",
            ScalarType::Float64 => "double",
            ScalarType::Bool32 => "bool",
            ScalarType::Char => "string",
            ScalarType::TaskHandle => "nidevice_grpc.Session",
            ScalarType::CviAbsoluteTime => "google.protobuf.Timestamp",
            ScalarType::Void => "fixed64",
        }
    }
}

/* A parsed type token.
 *
 * Tokens are written as plain strings in the catalog (`int32`, `const float64[]`,
 * `uInt8[16]`, `DAQmxEveryNSamplesEventCallbackPtr`, `compound[]`) and round-trip
 * through `Display`/`FromStr`. */
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeToken {
    Scalar(ScalarType),
    Buffer { element: ScalarType, is_const: bool },
    FixedArray { element: ScalarType, len: u32, is_const: bool },
    CallbackPtr(String),
    Compound,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type token '{token}': {reason}")]
pub struct TypeTokenError {
    pub token: String,
    pub reason: String,
}

impl TypeToken {
    pub fn scalar(scalar: ScalarType) -> Self {
        TypeToken::Scalar(scalar)
    }

    /* True for variable-length buffers and fixed arrays; compounds are lists too */
    pub fn is_buffer(&self) -> bool {
        matches!(self, TypeToken::Buffer { .. } | TypeToken::FixedArray { .. })
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TypeToken::Buffer { element: ScalarType::Char, .. })
    }

    pub fn is_const(&self) -> bool {
        match self {
            TypeToken::Buffer { is_const, .. } | TypeToken::FixedArray { is_const, .. } => *is_const,
            _ => false,
        }
    }

    pub fn is_integral_scalar(&self) -> bool {
        matches!(self, TypeToken::Scalar(s) if s.is_integral())
    }

    /* Size referents must be plain 32-bit integers */
    pub fn is_size_type(&self) -> bool {
        matches!(self, TypeToken::Scalar(ScalarType::UInt32) | TypeToken::Scalar(ScalarType::Int32))
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, TypeToken::Scalar(ScalarType::TaskHandle))
    }

    pub fn element(&self) -> Option<ScalarType> {
        match self {
            TypeToken::Scalar(s) => Some(*s),
            TypeToken::Buffer { element, .. } | TypeToken::FixedArray { element, .. } => Some(*element),
            TypeToken::CallbackPtr(_) | TypeToken::Compound => None,
        }
    }

    pub fn fixed_len(&self) -> Option<u32> {
        match self {
            TypeToken::FixedArray { len, .. } => Some(*len),
            _ => None,
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeToken::Scalar(s) => f.write_str(s.token()),
            TypeToken::Buffer { element, is_const } => {
                if *is_const {
                    f.write_str("const ")?;
                }
                write!(f, "{}[]", element.token())
            }
            TypeToken::FixedArray { element, len, is_const } => {
                if *is_const {
                    f.write_str("const ")?;
                }
                write!(f, "{}[{}]", element.token(), len)
            }
            TypeToken::CallbackPtr(name) => f.write_str(name),
            TypeToken::Compound => f.write_str("compound[]"),
        }
    }
}

impl FromStr for TypeToken {
    type Err = TypeTokenError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = |reason: &str| TypeTokenError { token: raw.to_string(), reason: reason.to_string() };
        let trimmed = raw.trim();

        if trimmed == "compound[]" {
            return Ok(TypeToken::Compound);
        }
        if trimmed.starts_with("DAQmx") && trimmed.ends_with("CallbackPtr") {
            return Ok(TypeToken::CallbackPtr(trimmed.to_string()));
        }

        let (is_const, rest) = match trimmed.strip_prefix("const ") {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        if let Some(open) = rest.find('[') {
            let element_token = &rest[..open];
            let element = ScalarType::from_token(element_token).ok_or_else(|| err("unknown element type"))?;
            if matches!(element, ScalarType::Void | ScalarType::TaskHandle) {
                return Err(err("element type cannot form an array"));
            }
            let bounds = rest[open..]
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .ok_or_else(|| err("malformed array suffix"))?;
            if bounds.is_empty() {
                return Ok(TypeToken::Buffer { element, is_const });
            }
            let len: u32 = bounds.parse().map_err(|_| err("array width must be an unsigned integer"))?;
            if len == 0 {
                return Err(err("fixed array width must be positive"));
            }
            return Ok(TypeToken::FixedArray { element, len, is_const });
        }

        if is_const {
            return Err(err("'const' only qualifies buffers"));
        }
        match ScalarType::from_token(rest) {
            Some(ScalarType::Char) => Err(err("char is only valid as a buffer element")),
            Some(scalar) => Ok(TypeToken::Scalar(scalar)),
            None => Err(err("not part of the lexicon")),
        }
    }
}

impl serde::Serialize for TypeToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TypeToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_and_buffer_tokens() {
        assert_eq!("int32".parse::<TypeToken>().unwrap(), TypeToken::Scalar(ScalarType::Int32));
        assert_eq!(
            "const float64[]".parse::<TypeToken>().unwrap(),
            TypeToken::Buffer { element: ScalarType::Float64, is_const: true }
        );
        assert_eq!(
            "uInt8[16]".parse::<TypeToken>().unwrap(),
            TypeToken::FixedArray { element: ScalarType::UInt8, len: 16, is_const: false }
        );
        assert!("char[]".parse::<TypeToken>().unwrap().is_string());
    }

    #[test]
    fn rejects_tokens_outside_the_lexicon() {
        assert!("int64".parse::<TypeToken>().is_err());
        assert!("char".parse::<TypeToken>().is_err());
        assert!("const int32".parse::<TypeToken>().is_err());
        assert!("float64[0]".parse::<TypeToken>().is_err());
    }

    #[test]
    fn display_matches_catalog_spelling() {
        for token in ["uInt32", "const char[]", "bool32[]", "int16[4]", "CVIAbsoluteTime", "compound[]"] {
            assert_eq!(token.parse::<TypeToken>().unwrap().to_string(), token);
        }
    }

    #[test]
    fn bool32_is_integral_but_float64_is_not() {
        assert!(TypeToken::Scalar(ScalarType::Bool32).is_integral_scalar());
        assert!(!TypeToken::Scalar(ScalarType::Float64).is_integral_scalar());
    }
}
