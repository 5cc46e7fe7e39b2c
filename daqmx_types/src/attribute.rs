use crate::lexicon::{ScalarType, TypeToken};
use serde_derive::{Deserialize, Serialize};

/* Tag of a typed attribute value. Every shard of a polymorphic native function
 * (one `cname`, several typed catalog entries) is keyed by the kind of its value slot. */
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeKind {
    Bool,
    Int32,
    UInt32,
    UInt64,
    Double,
    String,
    Timestamp,
    Int32Array,
    UInt32Array,
    DoubleArray,
    ByteArray,
}

impl AttributeKind {
    pub fn from_token(token: &TypeToken) -> Option<Self> {
        let kind = match token {
            TypeToken::Scalar(ScalarType::Bool32) => AttributeKind::Bool,
            TypeToken::Scalar(ScalarType::Int16) | TypeToken::Scalar(ScalarType::Int32) => AttributeKind::Int32,
            TypeToken::Scalar(ScalarType::UInt8)
            | TypeToken::Scalar(ScalarType::UInt16)
            | TypeToken::Scalar(ScalarType::UInt32) => AttributeKind::UInt32,
            TypeToken::Scalar(ScalarType::UInt64) => AttributeKind::UInt64,
            TypeToken::Scalar(ScalarType::Float64) => AttributeKind::Double,
            TypeToken::Scalar(ScalarType::CviAbsoluteTime) => AttributeKind::Timestamp,
            TypeToken::Buffer { element: ScalarType::Char, .. } => AttributeKind::String,
            TypeToken::Buffer { element, .. } | TypeToken::FixedArray { element, .. } => match element {
                ScalarType::Int16 | ScalarType::Int32 => AttributeKind::Int32Array,
                ScalarType::UInt16 | ScalarType::UInt32 | ScalarType::Bool32 => AttributeKind::UInt32Array,
                ScalarType::Float64 => AttributeKind::DoubleArray,
                ScalarType::UInt8 => AttributeKind::ByteArray,
                _ => return None,
            },
            _ => return None,
        };
        Some(kind)
    }

    /// Name used for the variant in emitted code and proto oneofs.
    pub fn variant_name(&self) -> &'static str {
        match self {
            AttributeKind::Bool => "Bool",
            AttributeKind::Int32 => "Int32",
            AttributeKind::UInt32 => "UInt32",
            AttributeKind::UInt64 => "UInt64",
            AttributeKind::Double => "Double",
            AttributeKind::String => "String",
            AttributeKind::Timestamp => "Timestamp",
            AttributeKind::Int32Array => "Int32Array",
            AttributeKind::UInt32Array => "UInt32Array",
            AttributeKind::DoubleArray => "DoubleArray",
            AttributeKind::ByteArray => "ByteArray",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            AttributeKind::String
                | AttributeKind::Int32Array
                | AttributeKind::UInt32Array
                | AttributeKind::DoubleArray
                | AttributeKind::ByteArray
        )
    }
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.variant_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_value_slot_type() {
        let kind = |s: &str| AttributeKind::from_token(&s.parse().unwrap());
        assert_eq!(kind("bool32"), Some(AttributeKind::Bool));
        assert_eq!(kind("float64"), Some(AttributeKind::Double));
        assert_eq!(kind("char[]"), Some(AttributeKind::String));
        assert_eq!(kind("const char[]"), Some(AttributeKind::String));
        assert_eq!(kind("uInt32[]"), Some(AttributeKind::UInt32Array));
        assert_eq!(kind("TaskHandle"), None);
    }
}
