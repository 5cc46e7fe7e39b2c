/* The native side of an interpreted call.
 *
 * The shared library is an external collaborator: the interpreter marshals each
 * surface call into one `NativeArg` per native slot (repeating slots expanded
 * once per compound element), hands the vector to a `NativeLibrary` and reads
 * outputs back from the same vector after the call. */

use crate::time::CviTime;
use daqmx_types::ScalarType;
use std::fmt;
use std::sync::Arc;

/// Opaque native task handle.
pub type RawHandle = u64;

/// Callback the native side invokes with the callback arguments in native order,
/// token included. The returned status goes back to the native caller.
pub type Callback = Arc<dyn Fn(&[NativeArg]) -> i32 + Send + Sync>;

/// Dynamic entry point into the native library.
pub trait NativeLibrary: Send + Sync {
    /// Invoke `symbol` and return its status. Out slots are written in place.
    fn invoke(&self, symbol: &str, args: &mut [NativeArg]) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
    Time(CviTime),
}

impl Scalar {
    /// Zero of the native scalar type.
    pub fn zero(ty: ScalarType) -> Self {
        match ty {
            ScalarType::UInt64 => Scalar::UInt(0),
            ScalarType::Float64 => Scalar::Float(0.0),
            ScalarType::CviAbsoluteTime => Scalar::Time(CviTime::default()),
            _ => Scalar::Int(0),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::UInt(v) => i64::try_from(*v).ok(),
            Scalar::Float(_) | Scalar::Time(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Typed native array, in or out.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    UInt8(Vec<u8>),
    Float64(Vec<f64>),
    Bool32(Vec<u32>),
    Char(Vec<u8>),
}

impl Buffer {
    /// Zero-filled buffer of `len` native elements; None for non-array element types.
    pub fn zeroed(element: ScalarType, len: usize) -> Option<Self> {
        let buffer = match element {
            ScalarType::Int16 => Buffer::Int16(vec![0; len]),
            ScalarType::UInt16 => Buffer::UInt16(vec![0; len]),
            ScalarType::Int32 => Buffer::Int32(vec![0; len]),
            ScalarType::UInt32 => Buffer::UInt32(vec![0; len]),
            ScalarType::UInt64 => Buffer::UInt64(vec![0; len]),
            ScalarType::UInt8 => Buffer::UInt8(vec![0; len]),
            ScalarType::Float64 => Buffer::Float64(vec![0.0; len]),
            ScalarType::Bool32 => Buffer::Bool32(vec![0; len]),
            ScalarType::Char => Buffer::Char(vec![0; len]),
            ScalarType::TaskHandle | ScalarType::CviAbsoluteTime | ScalarType::Void => return None,
        };
        Some(buffer)
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::Int16(v) => v.len(),
            Buffer::UInt16(v) => v.len(),
            Buffer::Int32(v) => v.len(),
            Buffer::UInt32(v) => v.len(),
            Buffer::UInt64(v) => v.len(),
            Buffer::UInt8(v) => v.len(),
            Buffer::Float64(v) => v.len(),
            Buffer::Bool32(v) => v.len(),
            Buffer::Char(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn truncate(&mut self, len: usize) {
        match self {
            Buffer::Int16(v) => v.truncate(len),
            Buffer::UInt16(v) => v.truncate(len),
            Buffer::Int32(v) => v.truncate(len),
            Buffer::UInt32(v) => v.truncate(len),
            Buffer::UInt64(v) => v.truncate(len),
            Buffer::UInt8(v) => v.truncate(len),
            Buffer::Float64(v) => v.truncate(len),
            Buffer::Bool32(v) => v.truncate(len),
            Buffer::Char(v) => v.truncate(len),
        }
    }

    /// Text up to the first NUL of a character buffer.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Buffer::Char(bytes) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            _ => None,
        }
    }

    /// Copy `text` into a character buffer, NUL-terminated when it fits.
    pub fn write_text(&mut self, text: &str) -> bool {
        match self {
            Buffer::Char(bytes) => {
                let len = text.len().min(bytes.len());
                bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
                if len < bytes.len() {
                    bytes[len] = 0;
                }
                true
            }
            _ => false,
        }
    }
}

/// One native argument slot.
#[derive(Clone)]
pub enum NativeArg {
    /// Null pointer: reserved slots, preflight buffers, unregistration callbacks.
    Null,
    Handle(RawHandle),
    /// Out pointer to a task handle.
    HandleOut(RawHandle),
    Scalar(Scalar),
    /// In/out pointer to a scalar; starts at the passed value or zero.
    Out(Scalar),
    /// NUL-terminated UTF-8 text.
    Str(String),
    Buffer(Buffer),
    Callback(Callback),
    /// Opaque callback token, handed back with every callback invocation.
    Token(u64),
}

impl NativeArg {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeArg::Scalar(s) | NativeArg::Out(s) => s.as_i64(),
            NativeArg::Handle(h) | NativeArg::HandleOut(h) => i64::try_from(*h).ok(),
            NativeArg::Token(t) => i64::try_from(*t).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeArg::Scalar(s) | NativeArg::Out(s) => s.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeArg::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            NativeArg::Buffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_buffer_mut(&mut self) -> Option<&mut Buffer> {
        match self {
            NativeArg::Buffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            NativeArg::Callback(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NativeArg::Null)
    }

    /// Write through an out pointer; false when the slot is not one.
    pub fn store(&mut self, value: Scalar) -> bool {
        match self {
            NativeArg::Out(slot) => {
                *slot = value;
                true
            }
            NativeArg::HandleOut(slot) => match value.as_i64().and_then(|v| u64::try_from(v).ok()) {
                Some(raw) => {
                    *slot = raw;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

impl fmt::Debug for NativeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeArg::Null => f.write_str("Null"),
            NativeArg::Handle(h) => write!(f, "Handle({:#x})", h),
            NativeArg::HandleOut(h) => write!(f, "HandleOut({:#x})", h),
            NativeArg::Scalar(s) => write!(f, "Scalar({:?})", s),
            NativeArg::Out(s) => write!(f, "Out({:?})", s),
            NativeArg::Str(s) => write!(f, "Str({:?})", s),
            NativeArg::Buffer(b) => write!(f, "Buffer({:?})", b),
            NativeArg::Callback(_) => f.write_str("Callback(..)"),
            NativeArg::Token(t) => write!(f, "Token({})", t),
        }
    }
}

impl PartialEq for NativeArg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NativeArg::Null, NativeArg::Null) => true,
            (NativeArg::Handle(a), NativeArg::Handle(b)) | (NativeArg::HandleOut(a), NativeArg::HandleOut(b)) => a == b,
            (NativeArg::Scalar(a), NativeArg::Scalar(b)) | (NativeArg::Out(a), NativeArg::Out(b)) => a == b,
            (NativeArg::Str(a), NativeArg::Str(b)) => a == b,
            (NativeArg::Buffer(a), NativeArg::Buffer(b)) => a == b,
            (NativeArg::Callback(a), NativeArg::Callback(b)) => Arc::ptr_eq(a, b),
            (NativeArg::Token(a), NativeArg::Token(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_buffers_hold_nul_terminated_text() {
        let mut buffer = Buffer::zeroed(ScalarType::Char, 8).unwrap();
        assert!(buffer.write_text("Dev1"));
        assert_eq!(buffer.to_text().as_deref(), Some("Dev1"));

        let mut short = Buffer::zeroed(ScalarType::Char, 3).unwrap();
        short.write_text("Dev1");
        assert_eq!(short.to_text().as_deref(), Some("Dev"));
        assert!(Buffer::zeroed(ScalarType::Void, 1).is_none());
    }

    #[test]
    fn out_slots_accept_stores() {
        let mut out = NativeArg::Out(Scalar::zero(ScalarType::Int32));
        assert!(out.store(Scalar::Int(100)));
        assert_eq!(out.as_i64(), Some(100));

        let mut handle = NativeArg::HandleOut(0);
        assert!(handle.store(Scalar::Int(0x2a)));
        assert_eq!(handle, NativeArg::HandleOut(0x2a));

        assert!(!NativeArg::Scalar(Scalar::Int(1)).store(Scalar::Int(2)));
    }
}
