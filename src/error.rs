use std::path::PathBuf;

use thiserror::Error;

use crate::solver::SolveStatus;

/// Structural problems with the targets/objects/weights triple.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The weight matrix does not have one row per target.
    #[error("weight row count ({rows}) must equal target count ({targets})")]
    RowCount { rows: usize, targets: usize },

    /// A weight row does not have one column per object.
    #[error("weight column count ({columns}) in row {row} must equal object count ({objects})")]
    ColumnCount {
        row: usize,
        columns: usize,
        objects: usize,
    },

    #[error("weight for target {target}, object {object} is negative ({weight})")]
    NegativeWeight {
        target: usize,
        object: usize,
        weight: f64,
    },

    #[error("weight for target {target}, object {object} is not a finite number")]
    NonFiniteWeight { target: usize, object: usize },
}

impl ValidationError {
    /// Whether the matrix shape, rather than a value, is at fault.
    pub fn is_dimension_error(&self) -> bool {
        matches!(self, Self::RowCount { .. } | Self::ColumnCount { .. })
    }
}

/// Errors that can occur while distributing objects.
#[derive(Error, Debug)]
pub enum DistributionError {
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationError),

    /// The solver itself failed to run. Not retried.
    #[error("solver backend `{backend}` failed: {message}")]
    SolverFault {
        backend: &'static str,
        message: String,
    },

    #[error("no optimal assignment exists (status: {0})")]
    Unsolved(SolveStatus),

    #[error("failed to write LP model to {}: {source}", .path.display())]
    ModelExport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DistributionError>;
