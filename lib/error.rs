//! Error taxonomy shared by every operation in the crate.

use thiserror::Error;

/// Why the symmetric eigensolver refused to produce a decomposition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiagonalizationFailure {
    /// `info < 0`: the `-info`-th argument passed to LAPACK was invalid.
    InvalidArgument,
    /// `info > 0`: the QR iteration failed to converge; `info` off-diagonal
    /// elements of the intermediate tridiagonal form did not reach zero.
    NoConvergence,
}

impl std::fmt::Display for DiagonalizationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::NoConvergence => write!(f, "did not converge"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RedfieldError {
    /// Two operands of the same call disagree on the system dimension.
    #[error("{context}: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// A matrix operand that must be square is not.
    #[error("{context}: expected a square matrix, got {rows}×{cols}")]
    NotSquare {
        context: &'static str,
        rows: usize,
        cols: usize,
    },

    /// A state index is not below the system dimension.
    #[error("{context}: state index {index} out of range for dimension {n}")]
    StateOutOfRange {
        context: &'static str,
        index: usize,
        n: usize,
    },

    /// ħ must be finite and positive.
    #[error("invalid unit system: hbar = {hbar}")]
    InvalidUnits {
        hbar: f64,
    },

    /// The external eigensolver reported a non-zero status.
    #[error("diagonalization failed ({kind}): dsyev info = {code}")]
    Diagonalization {
        kind: DiagonalizationFailure,
        code: i32,
    },

    /// A density matrix has drifted from Hermiticity or unit trace.
    ///
    /// Only produced by [`check_density`][crate::density::check_density]; the
    /// RHS evaluation itself never checks for this.
    #[error(
        "density matrix drifted beyond tolerance {tol:e}: \
        hermiticity error {hermiticity:e}, trace error {trace:e}"
    )]
    NumericInstability {
        hermiticity: f64,
        trace: f64,
        tol: f64,
    },
}

impl RedfieldError {
    pub(crate) fn from_dsyev_info(code: i32) -> Self {
        let kind
            = if code < 0 {
                DiagonalizationFailure::InvalidArgument
            } else {
                DiagonalizationFailure::NoConvergence
            };
        Self::Diagonalization { kind, code }
    }
}

pub type RedfieldResult<T> = Result<T, RedfieldError>;
