//! Error types for the geometry engine.

use lyra_symbolic::SymbolicError;
use thiserror::Error;

use crate::signature::Variance;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Index {label} appears twice with the same variance ({variance})")]
    RepeatedVariance { label: String, variance: Variance },
    #[error("Index {label} appears {count} times")]
    AmbiguousLabel { label: String, count: usize },
    #[error("Metric is not defined; required for {operation}")]
    MissingMetric { operation: String },
    #[error("Connection is not defined; required for {operation}")]
    MissingConnection { operation: String },
    #[error("Tensor '{name}' belongs to a different TensorSpace")]
    ForeignSpace { name: String },
    #[error("Tensor '{name}' has a fixed index placement and cannot be re-signatured")]
    ImmutableConnection { name: String },
    #[error("Rank mismatch: {0}")]
    RankMismatch(String),
    #[error("Label mismatch: {0}")]
    LabelMismatch(String),
    #[error("Tensor '{0}' is not registered")]
    UnknownTensor(String),
    #[error("Parse error in '{input}': {reason}")]
    Parse { input: String, reason: String },
    #[error("Invalid derivative order {0}; must be at least 1")]
    InvalidOrder(usize),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Symbolic(#[from] SymbolicError),
}

impl GeometryError {
    pub fn missing_metric(operation: impl Into<String>) -> Self {
        GeometryError::MissingMetric {
            operation: operation.into(),
        }
    }

    pub fn missing_connection(operation: impl Into<String>) -> Self {
        GeometryError::MissingConnection {
            operation: operation.into(),
        }
    }

    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        GeometryError::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

pub type GeometryResult<T> = Result<T, GeometryError>;
