/* Runtime support module shipped next to the emitted bindings.
 *
 * The text is fixed: every emitted wrapper leans on these helpers for status
 * checks, string conversion, coerced buffers, size bookkeeping and stream
 * delivery, so the wrappers themselves stay short and uniform. */

pub const RUNTIME_SOURCE: &str = r#"use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::{c_char, c_void};
use std::sync::mpsc::{Receiver, RecvError, Sender, TryRecvError};
use std::sync::Mutex;

/// Opaque native task handle.
pub type TaskHandle = *mut c_void;

/// Native absolute time: 64.64 fixed-point seconds since 1904-01-01 UTC.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CVIAbsoluteTime {
  pub lsb: u64,
  pub msb: i64,
}

/* Seconds between 1904-01-01 and 1970-01-01 */
pub const SECONDS_1904_TO_1970: i64 = 2_082_844_800;

impl CVIAbsoluteTime {
  pub fn from_unix(seconds: i64, nanos: u32) -> Self {
    /* rounded up so that to_unix returns the same nanoseconds */
    let fraction = (((nanos as u128) << 64) + 999_999_999) / 1_000_000_000u128;
    Self { lsb: fraction as u64, msb: seconds + SECONDS_1904_TO_1970 }
  }

  pub fn to_unix(&self) -> (i64, u32) {
    let nanos = ((self.lsb as u128) * 1_000_000_000u128) >> 64;
    (self.msb - SECONDS_1904_TO_1970, nanos as u32)
  }
}

/// Every failure a binding call can report.
#[derive(Debug, Clone, PartialEq)]
pub enum DaqmxError {
  /// A derived or discovered size is negative or does not fit the native size slot
  InvalidSize { function: &'static str, parameter: &'static str, reason: String },
  /// A compound list is longer than its declared maximum
  TooManyElements { function: &'static str, max: usize, actual: usize },
  /// The native library returned a negative status
  NativeError { function: &'static str, code: i32, message: String },
  /// A positive status promoted to an error
  NativeWarning { function: &'static str, code: i32, message: String },
  /// A stream record could not be delivered
  CallbackDelivery { function: &'static str, reason: String },
  /// An enum-tagged value outside its enum
  InvalidEnumValue { function: &'static str, enum_name: &'static str, value: i64 },
  /// A surface value the native side cannot represent
  InvalidArgument { function: &'static str, reason: String },
}

impl DaqmxError {
  pub fn category(&self) -> &'static str {
    match self {
      DaqmxError::InvalidSize { .. } => "InvalidSize",
      DaqmxError::TooManyElements { .. } => "TooManyElements",
      DaqmxError::NativeError { .. } => "NativeError",
      DaqmxError::NativeWarning { .. } => "NativeWarning",
      DaqmxError::CallbackDelivery { .. } => "CallbackDelivery",
      DaqmxError::InvalidEnumValue { .. } => "InvalidEnumValue",
      DaqmxError::InvalidArgument { .. } => "InvalidArgument",
    }
  }

  pub fn function(&self) -> &'static str {
    match self {
      DaqmxError::InvalidSize { function, .. }
      | DaqmxError::TooManyElements { function, .. }
      | DaqmxError::NativeError { function, .. }
      | DaqmxError::NativeWarning { function, .. }
      | DaqmxError::CallbackDelivery { function, .. }
      | DaqmxError::InvalidEnumValue { function, .. }
      | DaqmxError::InvalidArgument { function, .. } => function,
    }
  }
}

impl fmt::Display for DaqmxError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DaqmxError::InvalidSize { function, parameter, reason } => {
        write!(f, "{}: invalid size for '{}': {}", function, parameter, reason)
      }
      DaqmxError::TooManyElements { function, max, actual } => {
        write!(f, "{}: {} elements exceed the maximum of {}", function, actual, max)
      }
      DaqmxError::NativeError { function, code, message } => write!(f, "{}: error {}: {}", function, code, message),
      DaqmxError::NativeWarning { function, code, message } => write!(f, "{}: warning {}: {}", function, code, message),
      DaqmxError::CallbackDelivery { function, reason } => write!(f, "{}: callback delivery failed: {}", function, reason),
      DaqmxError::InvalidEnumValue { function, enum_name, value } => {
        write!(f, "{}: {} is not a value of {}", function, value, enum_name)
      }
      DaqmxError::InvalidArgument { function, reason } => write!(f, "{}: {}", function, reason),
    }
  }
}

impl std::error::Error for DaqmxError {}

/// Successful result, with the native warning when the status was positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
  pub value: T,
  pub warning: Option<DaqmxError>,
}

impl<T> Outcome<T> {
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
    Outcome { value: f(self.value), warning: self.warning }
  }

  /// Turn a carried warning into an error.
  pub fn strict(self) -> Result<T, DaqmxError> {
    match self.warning {
      Some(warning) => Err(warning),
      None => Ok(self.value),
    }
  }
}

/// Classify a native status. Negative statuses fail the call; positive ones are
/// carried as warnings. The message comes from the extended error info call.
pub fn check_status(function: &'static str, status: i32, error_info: fn() -> String) -> Result<Option<DaqmxError>, DaqmxError> {
  if status < 0 {
    return Err(DaqmxError::NativeError { function, code: status, message: error_info() });
  }
  if status > 0 {
    return Ok(Some(DaqmxError::NativeWarning { function, code: status, message: error_info() }));
  }
  Ok(None)
}

/// Required buffer length reported by a preflight call.
pub fn discovered_size(function: &'static str, status: i32, error_info: fn() -> String) -> Result<usize, DaqmxError> {
  if status < 0 {
    return Err(DaqmxError::NativeError { function, code: status, message: error_info() });
  }
  Ok(status as usize)
}

pub fn to_cstring(function: &'static str, value: &str) -> Result<CString, DaqmxError> {
  CString::new(value).map_err(|_| DaqmxError::InvalidArgument { function, reason: format!("{:?} contains an interior NUL", value) })
}

/// Text up to the first NUL of a native character buffer.
pub fn from_c_buffer(buffer: &[c_char]) -> String {
  let bytes: Vec<u8> = buffer.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
  String::from_utf8_lossy(&bytes).into_owned()
}

/// # Safety
/// `ptr` must be null or point at a NUL-terminated string.
pub unsafe fn from_c_str(ptr: *const c_char) -> String {
  if ptr.is_null() {
    return String::new();
  }
  CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

pub fn coalesce(first: &str, second: &str) -> String {
  if first.is_empty() { second.to_string() } else { first.to_string() }
}

/// Length shared by every buffer sized by the same slot.
pub fn shared_len(function: &'static str, parameter: &'static str, lengths: &[usize]) -> Result<usize, DaqmxError> {
  let first = lengths.first().copied().unwrap_or(0);
  if lengths.iter().any(|&len| len != first) {
    return Err(DaqmxError::InvalidSize { function, parameter, reason: format!("buffers sized together have lengths {:?}", lengths) });
  }
  Ok(first)
}

/// A buffer length expressed in the native size type.
pub fn native_size<T: TryFrom<usize>>(function: &'static str, parameter: &'static str, len: usize) -> Result<T, DaqmxError> {
  T::try_from(len).map_err(|_| DaqmxError::InvalidSize { function, parameter, reason: format!("{} does not fit the size slot", len) })
}

/// Length computed by a size expression.
pub fn computed_size(function: &'static str, parameter: &'static str, value: i64) -> Result<usize, DaqmxError> {
  usize::try_from(value).map_err(|_| DaqmxError::InvalidSize { function, parameter, reason: format!("computed length {} is negative", value) })
}

pub fn check_max_length(function: &'static str, max: usize, actual: usize) -> Result<(), DaqmxError> {
  if actual > max {
    return Err(DaqmxError::TooManyElements { function, max, actual });
  }
  Ok(())
}

pub fn enum_value<E: TryFrom<i64>>(function: &'static str, enum_name: &'static str, value: i64) -> Result<E, DaqmxError> {
  E::try_from(value).map_err(|_| DaqmxError::InvalidEnumValue { function, enum_name, value })
}

/* ---------------------------------------------------------------------------
   Coerced buffers
   --------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowing {
  Saturate,
  Wrap,
  Reject,
}

/// Native element narrower than its 32-bit surface type.
pub trait NarrowElement: Copy {
  const MIN: i64;
  const MAX: i64;
  fn wrap(value: i64) -> Self;
}

macro_rules! narrow_element {
  ($($ty:ty),*) => {
    $(impl NarrowElement for $ty {
      const MIN: i64 = <$ty>::MIN as i64;
      const MAX: i64 = <$ty>::MAX as i64;
      fn wrap(value: i64) -> Self { value as $ty }
    })*
  };
}

narrow_element!(i16, u16, u8);

pub fn narrow<S: Copy + Into<i64>, T: NarrowElement>(function: &'static str, values: &[S], policy: Narrowing) -> Result<Vec<T>, DaqmxError> {
  values
    .iter()
    .map(|&value| {
      let value: i64 = value.into();
      if (T::MIN..=T::MAX).contains(&value) {
        return Ok(T::wrap(value));
      }
      match policy {
        Narrowing::Saturate => Ok(T::wrap(value.clamp(T::MIN, T::MAX))),
        Narrowing::Wrap => Ok(T::wrap(value)),
        Narrowing::Reject => Err(DaqmxError::InvalidArgument { function, reason: format!("{} does not fit the native element type", value) }),
      }
    })
    .collect()
}

/* ---------------------------------------------------------------------------
   Attribute values
   --------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
  Bool(bool),
  Int32(i32),
  UInt32(u32),
  UInt64(u64),
  Double(f64),
  String(String),
  Timestamp(CVIAbsoluteTime),
  Int32Array(Vec<i32>),
  UInt32Array(Vec<u32>),
  DoubleArray(Vec<f64>),
  ByteArray(Vec<u8>),
}

impl AttributeValue {
  pub fn kind(&self) -> AttributeKind {
    match self {
      AttributeValue::Bool(_) => AttributeKind::Bool,
      AttributeValue::Int32(_) => AttributeKind::Int32,
      AttributeValue::UInt32(_) => AttributeKind::UInt32,
      AttributeValue::UInt64(_) => AttributeKind::UInt64,
      AttributeValue::Double(_) => AttributeKind::Double,
      AttributeValue::String(_) => AttributeKind::String,
      AttributeValue::Timestamp(_) => AttributeKind::Timestamp,
      AttributeValue::Int32Array(_) => AttributeKind::Int32Array,
      AttributeValue::UInt32Array(_) => AttributeKind::UInt32Array,
      AttributeValue::DoubleArray(_) => AttributeKind::DoubleArray,
      AttributeValue::ByteArray(_) => AttributeKind::ByteArray,
    }
  }
}

pub fn unsupported_kind(function: &'static str, kind: AttributeKind) -> DaqmxError {
  DaqmxError::InvalidArgument { function, reason: format!("no {:?} variant of this attribute accessor", kind) }
}

/* ---------------------------------------------------------------------------
   Streams
   --------------------------------------------------------------------------- */

/// Receiving end handed to the native library as the callback token. A
/// callback that cannot be delivered closes the sink, ending its stream.
pub struct StreamSink<T> {
  function: &'static str,
  sender: Mutex<Option<Sender<T>>>,
  failure: Mutex<Option<DaqmxError>>,
}

impl<T> StreamSink<T> {
  pub fn new(function: &'static str, sender: Sender<T>) -> Self {
    Self { function, sender: Mutex::new(Some(sender)), failure: Mutex::new(None) }
  }

  /// Status handed back to the native library: zero when the record was
  /// queued or the stream is already closed.
  pub fn deliver(&self, record: T) -> i32 {
    let sent = match self.sender.lock() {
      Ok(guard) => match guard.as_ref() {
        Some(sender) => sender.send(record).is_ok(),
        None => return 0,
      },
      Err(_) => false,
    };
    if sent {
      0
    } else {
      self.fail(DaqmxError::CallbackDelivery { function: self.function, reason: "subscriber is gone".into() })
    }
  }

  /// Record `err` and close the stream. Records already queued stay readable.
  pub fn fail(&self, err: DaqmxError) -> i32 {
    if let Ok(mut failure) = self.failure.lock() {
      failure.get_or_insert(err);
    }
    self.close();
    -1
  }

  fn is_open(&self) -> bool {
    self.sender.lock().map(|guard| guard.is_some()).unwrap_or(false)
  }

  fn close(&self) {
    if let Ok(mut guard) = self.sender.lock() {
      guard.take();
    }
  }
}

/// Records of one registration, in native callback order. Dropping it
/// unregisters the callback before the sink goes away.
pub struct Subscription<T> {
  sink: Box<StreamSink<T>>,
  records: Receiver<T>,
  error_info: fn() -> String,
  unregister: Option<Box<dyn FnMut() -> i32>>,
}

impl<T> Subscription<T> {
  pub fn new(sink: Box<StreamSink<T>>, records: Receiver<T>, error_info: fn() -> String, unregister: Box<dyn FnMut() -> i32>) -> Self {
    Self { sink, records, error_info, unregister: Some(unregister) }
  }

  pub fn is_active(&self) -> bool {
    self.sink.is_open()
  }

  pub fn recv(&self) -> Result<T, RecvError> {
    self.records.recv()
  }

  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.records.try_recv()
  }

  pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
    self.records.iter()
  }

  /// Delivery failure that ended the stream, if any.
  pub fn take_failure(&self) -> Option<DaqmxError> {
    self.sink.failure.lock().ok().and_then(|mut failure| failure.take())
  }

  pub fn unsubscribe(mut self) -> Result<Outcome<()>, DaqmxError> {
    let status = self.stop();
    let warning = check_status(self.sink.function, status, self.error_info)?;
    Ok(Outcome { value: (), warning })
  }

  fn stop(&mut self) -> i32 {
    let status = self.unregister.take().map(|mut unregister| unregister()).unwrap_or(0);
    self.sink.close();
    status
  }
}

impl<T> Drop for Subscription<T> {
  fn drop(&mut self) {
    self.stop();
  }
}

pub fn token_of<T>(sink: &StreamSink<T>) -> *mut c_void {
  sink as *const StreamSink<T> as *mut c_void
}

/// # Safety
/// `token` must come from [`token_of`] on a sink that is still alive.
pub unsafe fn sink_from<'a, T>(token: *mut c_void) -> &'a StreamSink<T> {
  &*(token as *const StreamSink<T>)
}
"#;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn runtime_carries_error_taxonomy() {
    for category in ["InvalidSize", "TooManyElements", "NativeError", "NativeWarning", "CallbackDelivery", "InvalidEnumValue", "InvalidArgument"] {
      assert!(RUNTIME_SOURCE.contains(&format!("\"{}\"", category)), "missing {}", category);
    }
  }
}
