use entangle_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurveError {
    #[error("curve bracket size must be positive")]
    ZeroBracket,

    #[error("curve scale must be positive")]
    ZeroScale,

    #[error("curve rate is zero in bracket {0}")]
    ZeroRate(u128),

    #[error("arithmetic overflow in curve evaluation")]
    Overflow,
}

impl CurveError {
    /// Curve failures reject the transaction that asked for the conversion.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
