use thiserror::Error;

/// Result alias used across the runtime interpreter.
pub type DaqmxResult<T> = Result<T, DaqmxError>;

/// Every failure a surface call can report. Each variant names the catalog
/// function it came from.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DaqmxError {
    /// A derived, computed or discovered size is negative or does not fit the size slot.
    #[error("{function}: invalid size for '{parameter}': {reason}")]
    InvalidSize {
        function: String,
        parameter: String,
        reason: String,
    },

    /// A compound list is longer than its declared maximum.
    #[error("{function}: {actual} elements exceed the maximum of {max}")]
    TooManyElements {
        function: String,
        max: usize,
        actual: usize,
    },

    /// The native library returned a negative status.
    #[error("{function}: error {code}: {message}")]
    NativeError {
        function: String,
        code: i32,
        message: String,
    },

    /// A positive status, promoted to an error by the warning policy.
    #[error("{function}: warning {code}: {message}")]
    NativeWarning {
        function: String,
        code: i32,
        message: String,
    },

    /// A stream record could not be delivered to its subscriber.
    #[error("{function}: callback delivery failed: {reason}")]
    CallbackDelivery { function: String, reason: String },

    /// An enum-tagged value outside its enum.
    #[error("{function}: {value} is not a member of {enum_name}")]
    InvalidEnumValue {
        function: String,
        enum_name: String,
        value: i64,
    },

    /// A surface value the native side cannot represent, or a missing argument.
    #[error("{function}: {reason}")]
    InvalidArgument { function: String, reason: String },

    /// A coerced buffer element rejected by its narrowing policy.
    #[error("{function}: element {value} of '{parameter}' does not fit {element}")]
    Coercion {
        function: String,
        parameter: String,
        value: i64,
        element: String,
    },

    /// The function or shard group is not in the surface catalog.
    #[error("'{function}' is not in the surface catalog")]
    UnknownFunction { function: String },

    /// The function was invoked through the wrong entry point or on a foreign handle.
    #[error("{function}: expected {expected}, got {actual}")]
    WrongReceiver {
        function: String,
        expected: String,
        actual: String,
    },
}

impl DaqmxError {
    /// Categorical tag, stable across message changes.
    pub fn category(&self) -> &'static str {
        match self {
            DaqmxError::InvalidSize { .. } => "InvalidSize",
            DaqmxError::TooManyElements { .. } => "TooManyElements",
            DaqmxError::NativeError { .. } => "NativeError",
            DaqmxError::NativeWarning { .. } => "NativeWarning",
            DaqmxError::CallbackDelivery { .. } => "CallbackDelivery",
            DaqmxError::InvalidEnumValue { .. } => "InvalidEnumValue",
            DaqmxError::InvalidArgument { .. } => "InvalidArgument",
            DaqmxError::Coercion { .. } => "Coercion",
            DaqmxError::UnknownFunction { .. } => "UnknownFunction",
            DaqmxError::WrongReceiver { .. } => "WrongReceiver",
        }
    }

    pub fn function(&self) -> &str {
        match self {
            DaqmxError::InvalidSize { function, .. }
            | DaqmxError::TooManyElements { function, .. }
            | DaqmxError::NativeError { function, .. }
            | DaqmxError::NativeWarning { function, .. }
            | DaqmxError::CallbackDelivery { function, .. }
            | DaqmxError::InvalidEnumValue { function, .. }
            | DaqmxError::InvalidArgument { function, .. }
            | DaqmxError::Coercion { function, .. }
            | DaqmxError::UnknownFunction { function }
            | DaqmxError::WrongReceiver { function, .. } => function,
        }
    }

    /// Native status code, for native errors and warnings.
    pub fn code(&self) -> Option<i32> {
        match self {
            DaqmxError::NativeError { code, .. } | DaqmxError::NativeWarning { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn invalid_argument(function: &str, reason: impl Into<String>) -> Self {
        DaqmxError::InvalidArgument {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_size(function: &str, parameter: &str, reason: impl Into<String>) -> Self {
        DaqmxError::InvalidSize {
            function: function.to_string(),
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}

/// What to do with a positive native status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningPolicy {
    /// Succeed and carry the warning next to the value.
    #[default]
    Carry,
    /// Fail the call with `NativeWarning`.
    Promote,
}

/// Successful result, with the native warning when the status was positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warning: Option<DaqmxError>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self { value, warning: None }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warning: self.warning,
        }
    }

    /// Turn a carried warning into an error.
    pub fn strict(self) -> DaqmxResult<T> {
        match self.warning {
            Some(warning) => Err(warning),
            None => Ok(self.value),
        }
    }
}
