//! Error types for symbolic operations.

use thiserror::Error;

/// Errors raised by the symbolic layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolicError {
    #[error("Division by zero while {context}")]
    DivisionByZero { context: String },

    #[error("Shape mismatch in {operation}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        operation: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Axis {axis} out of range for array of rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },

    #[error("Invalid axis pairing {pairs:?} for array of rank {rank}")]
    InvalidAxisPairs { pairs: Vec<(usize, usize)>, rank: usize },

    #[error("Invalid permutation {perm:?} for array of rank {rank}")]
    InvalidPermutation { perm: Vec<usize>, rank: usize },

    #[error("Expected a square matrix, got shape {shape:?}")]
    NotSquare { shape: Vec<usize> },

    #[error("Matrix is singular")]
    SingularMatrix,

    #[error("Invalid einsum spec '{spec}': {reason}")]
    InvalidEinsumSpec { spec: String, reason: String },

    #[error("Label {label} has conflicting extents {first} and {second}")]
    ExtentMismatch {
        label: String,
        first: usize,
        second: usize,
    },

    #[error("Invalid symbol name '{name}': {reason}")]
    InvalidSymbol { name: String, reason: String },
}

impl SymbolicError {
    pub fn division_by_zero(context: impl Into<String>) -> Self {
        SymbolicError::DivisionByZero {
            context: context.into(),
        }
    }

    pub fn shape_mismatch(
        operation: impl Into<String>,
        expected: &[usize],
        actual: &[usize],
    ) -> Self {
        SymbolicError::ShapeMismatch {
            operation: operation.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    pub fn invalid_einsum(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        SymbolicError::InvalidEinsumSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for symbolic operations.
pub type SymbolicResult<T> = Result<T, SymbolicError>;
