/* Surface values - what callers pass in and get back from interpreted calls */

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/* Named surface arguments of one call, in any order */
pub type Args = IndexMap<String, Value>;

/* Named outputs of one call, in surface order */
pub type Outputs = IndexMap<String, Value>;

/* One stream record or compound element, fields in declaration order */
pub type Record = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Time(DateTime<Utc>),

    /* Enum-tagged integer, checked against the enum table on the way in */
    Enum { enum_name: String, value: i64 },

    /* Buffers and compound lists */
    List(Vec<Value>),

    Record(Record),
}

impl Value {
    /// Integral view used for enum checks, size arithmetic and native integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Enum { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            other => other.as_i64().map(|v| v != 0),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Time(_) => "time",
            Value::Enum { .. } => "enum",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value as $target)
                }
            }
        )*
    };
}

value_from! {
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f64 => Float as f64,
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// Build an argument or record map from `(name, value)` pairs.
pub fn args<K, V, I>(pairs: I) -> Args
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_views() {
        assert_eq!(Value::from(true).as_i64(), Some(1));
        assert_eq!(Value::from(10_123u32).as_i64(), Some(10_123));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::Enum { enum_name: "Edge1".into(), value: 10_280 }.as_i64(), Some(10_280));
        assert_eq!(Value::from("x").as_i64(), None);
    }

    #[test]
    fn lists_and_records() {
        let list = Value::from(vec![1.0, 2.5]);
        assert_eq!(list.as_list().map(|l| l.len()), Some(2));

        let record = args([("channelNames", Value::from("Dev1/port0/line0")), ("state", Value::from(10_192))]);
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, ["channelNames", "state"]);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Value::Int(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "int", "value": 3 }));
    }
}
