use daqmx_loader::LoadError;
use thiserror::Error;

/* Generation-time failures. Any of these aborts emission. */
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("{function}: size of '{parameter}' cannot be resolved: {reason}")]
    UnresolvedSize { function: String, parameter: String, reason: String },

    #[error("{function}: sizing cycle {}", cycle.join(" -> "))]
    CyclicSizing { function: String, cycle: Vec<String> },

    #[error("{function}: invalid expression for '{parameter}' ({expression}): {reason}")]
    InvalidExpression { function: String, parameter: String, expression: String, reason: String },

    #[error("{function}: size parameter '{size_param}' is shared by {} under incompatible mechanisms", buffers.join(", "))]
    SharedSizeConflict { function: String, size_param: String, buffers: Vec<String> },

    #[error("{function}: coerced parameter '{parameter}' has no policy for native type '{native_type}'")]
    MissingCoercionPolicy { function: String, parameter: String, native_type: String },

    #[error("{function}: '{parameter}' is visible in the surface but excluded from the IPC projection")]
    VisibilityConflict { function: String, parameter: String },

    #[error("{function}: shard of '{cname}' disagrees with its group: {reason}")]
    ShardMismatch { function: String, cname: String, reason: String },

    #[error("{function}: repeating group cannot be collapsed: {reason}")]
    InvalidRepeatingGroup { function: String, reason: String },

    #[error("{function}: cannot be placed: {reason}")]
    InvalidPlacement { function: String, reason: String },

    #[error("{function}: stream response cannot be projected: {reason}")]
    InvalidStream { function: String, reason: String },

    #[error("{function}: session identity differs across projections: {reason}")]
    SessionParity { function: String, reason: String },
}

impl SolverError {
    pub fn category(&self) -> &'static str {
        "SolverError"
    }

    pub fn function(&self) -> &str {
        match self {
            SolverError::UnresolvedSize { function, .. }
            | SolverError::CyclicSizing { function, .. }
            | SolverError::InvalidExpression { function, .. }
            | SolverError::SharedSizeConflict { function, .. }
            | SolverError::MissingCoercionPolicy { function, .. }
            | SolverError::VisibilityConflict { function, .. }
            | SolverError::ShardMismatch { function, .. }
            | SolverError::InvalidRepeatingGroup { function, .. }
            | SolverError::InvalidPlacement { function, .. }
            | SolverError::InvalidStream { function, .. }
            | SolverError::SessionParity { function, .. } => function,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("failed to write '{path}': {message}")]
    Emit { path: String, message: String },
}

pub type GenResult<T> = Result<T, GenError>;
