use crate::linprog::LinProgStatus;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinearAlgebraError {
    #[error("Singular {0}x{0} system")]
    Singular(usize),
    #[error("Non-finite solution of {0}x{0} system")]
    NonFinite(usize),
    #[error("Covariance needs at least two samples, got {0}")]
    TooFewSamples(usize),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("Incompatible input size: expected {expected}, got {actual}")]
    InvalidInputSize { expected: usize, actual: usize },
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(#[from] LinearAlgebraError),
    #[error("Linear program did not reach an optimum: {0}")]
    LinearProgram(LinProgStatus),
    #[error("Reference pulse and derivative lengths differ: {g} and {dg}")]
    ReferenceMismatch { g: usize, dg: usize },
    #[error("Training set is empty")]
    EmptyTrainingSet,
}

impl FilterError {
    pub(crate) fn check_size(expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::InvalidInputSize { expected, actual })
        }
    }
}
