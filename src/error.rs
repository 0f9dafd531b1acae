use thiserror::Error;

/// Error types for the dofopt-rs library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DofError {
    /// A dependency path revisits an owner that is still on the traversal stack.
    #[error("Cyclic dependency detected at owner {owner}")]
    CyclicDependency { owner: String },

    /// Registry lookup or deletion with an unknown name or an out-of-range index.
    #[error("DOF {key} is out of range for a registry of length {len}")]
    IndexOutOfRange { key: String, len: usize },

    /// A function produced a different number of values than on its first call.
    #[error("Function '{function}' returned {found} values, expected {expected}")]
    InconsistentOutputLength {
        function: String,
        expected: usize,
        found: usize,
    },

    /// An owner handle does not refer to a live owner.
    #[error("Unknown owner handle: {0}")]
    UnknownOwner(String),

    /// An owner was accessed as a concrete type it does not have.
    #[error("Owner {owner} is not a {expected}")]
    OwnerTypeMismatch { owner: String, expected: String },

    /// A registry already holds an entry with the same owner and name.
    #[error("DOF '{name}' already exists for this owner")]
    DuplicateDof { name: String },

    /// Lower bound above upper bound.
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid differentiation settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error raised by an owner-supplied evaluation function.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),
}

/// Result type alias for dofopt-rs operations.
pub type Result<T> = std::result::Result<T, DofError>;

impl From<String> for DofError {
    fn from(s: String) -> Self {
        DofError::FunctionEvaluation(s)
    }
}

impl From<&str> for DofError {
    fn from(s: &str) -> Self {
        DofError::FunctionEvaluation(s.to_string())
    }
}
